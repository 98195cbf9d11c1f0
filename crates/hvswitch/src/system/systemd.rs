use super::command;
use async_trait::async_trait;
use hvswitch_core::{Result, ServiceManager};

/// Service control through `systemctl`.
pub struct Systemctl;

#[async_trait]
impl ServiceManager for Systemctl {
    async fn stop(&self, service: &str) -> Result<()> {
        command::run("systemctl", &["stop", service]).await
    }
}
