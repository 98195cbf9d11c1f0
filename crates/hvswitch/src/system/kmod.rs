use super::command;
use async_trait::async_trait;
use hvswitch_core::{Error, LoadedModule, ModuleManager, Result};
use std::path::PathBuf;

/// Kernel module control through `modprobe`, with the loaded list read
/// straight from `/proc/modules`.
pub struct Kmod {
    proc_modules: PathBuf,
}

impl Kmod {
    pub fn new(proc_modules: impl Into<PathBuf>) -> Self {
        Self {
            proc_modules: proc_modules.into(),
        }
    }
}

impl Default for Kmod {
    fn default() -> Self {
        Self::new("/proc/modules")
    }
}

#[async_trait]
impl ModuleManager for Kmod {
    async fn load(&self, module: &str) -> Result<()> {
        command::run("modprobe", &[module]).await
    }

    async fn unload(&self, module: &str) -> Result<()> {
        command::run("modprobe", &["-r", module]).await
    }

    async fn loaded(&self) -> Result<Vec<LoadedModule>> {
        let text = tokio::fs::read_to_string(&self.proc_modules)
            .await
            .map_err(|source| Error::ReadFailed {
                path: self.proc_modules.clone(),
                source,
            })?;
        Ok(parse_proc_modules(&text))
    }
}

/// Parses `/proc/modules`.
///
/// Each line reads `name size refcount users state address`, where `users` is
/// a comma-terminated list or `-` when empty. Malformed lines are skipped.
pub(crate) fn parse_proc_modules(text: &str) -> Vec<LoadedModule> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let _size = fields.next()?;
            let refcount = fields.next()?.parse().ok()?;
            let used_by = match fields.next() {
                Some("-") | None => Vec::new(),
                Some(users) => users
                    .split(',')
                    .filter(|u| !u.is_empty())
                    .map(str::to_string)
                    .collect(),
            };
            Some(LoadedModule {
                name: name.to_string(),
                refcount,
                used_by,
            })
        })
        .collect()
}
