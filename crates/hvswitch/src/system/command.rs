use hvswitch_core::{Error, Result};
use std::process::Stdio;
use tokio::process::Command;

/// Runs an external tool to completion, mapping a non-zero exit to
/// [`Error::CommandFailed`] carrying the tool's stderr.
pub(crate) async fn run(program: &str, args: &[&str]) -> Result<()> {
    let path = which::which(program).map_err(|_| Error::ToolNotFound {
        program: program.to_string(),
    })?;
    let command_line = command_line(program, args);
    tracing::debug!(command = %command_line, "Running");

    let output = Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = match stderr.trim() {
        "" => output.status.to_string(),
        msg => msg.to_string(),
    };
    Err(Error::CommandFailed {
        command: command_line,
        detail,
    })
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
