use super::command;
use async_trait::async_trait;
use hvswitch_core::{GroupManager, Result};
use nix::unistd::{Group, User};

/// Group administration via the system account databases and `usermod`.
pub struct SystemGroups;

#[async_trait]
impl GroupManager for SystemGroups {
    async fn group_exists(&self, group: &str) -> bool {
        matches!(Group::from_name(group), Ok(Some(_)))
    }

    async fn is_member(&self, user: &str, group: &str) -> Result<bool> {
        let Some(group) = Group::from_name(group).map_err(std::io::Error::from)? else {
            return Ok(false);
        };
        if group.mem.iter().any(|m| m == user) {
            return Ok(true);
        }
        let primary = User::from_name(user)
            .map_err(std::io::Error::from)?
            .is_some_and(|u| u.gid == group.gid);
        Ok(primary)
    }

    async fn add_member(&self, user: &str, group: &str) -> Result<()> {
        command::run("usermod", &["-aG", group, user]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_group_exists() {
        assert!(SystemGroups.group_exists("root").await);
        assert!(!SystemGroups.group_exists("hvswitch-no-such-group").await);
    }

    #[tokio::test]
    async fn root_is_member_of_its_primary_group() {
        assert!(SystemGroups.is_member("root", "root").await.unwrap());
    }

    #[tokio::test]
    async fn membership_of_missing_group_is_false() {
        assert!(
            !SystemGroups
                .is_member("root", "hvswitch-no-such-group")
                .await
                .unwrap()
        );
    }
}
