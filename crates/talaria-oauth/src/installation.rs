//! Installation persistence.
//!
//! An [`Installation`] records the outcome of one OAuth consent: who
//! installed the app where, and which tokens were granted. The
//! [`InstallationStore`] owns the lifetime of these records; the framework
//! only holds them by `(enterprise_id, team_id, user_id)` key. The bundled
//! [`MemoryInstallationStore`] is the default; production deployments plug
//! in their own backend.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use talaria_core::BoxFuture;

use crate::error::StoreError;

/// A persisted app installation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    /// Slack app id.
    pub app_id: Option<String>,
    /// Enterprise (org) id, for org-wide installs.
    pub enterprise_id: Option<String>,
    /// Workspace id.
    pub team_id: Option<String>,
    /// Installing user's id.
    pub user_id: Option<String>,
    /// Granted bot token (`xoxb-…`).
    pub bot_token: Option<String>,
    /// The bot's user id.
    pub bot_user_id: Option<String>,
    /// The bot's bot id.
    pub bot_id: Option<String>,
    /// Bot scopes granted, comma-separated.
    pub bot_scopes: Option<String>,
    /// Installer's user token (`xoxp-…`), when user scopes were granted.
    pub user_token: Option<String>,
    /// User scopes granted, comma-separated.
    pub user_scopes: Option<String>,
    /// Install time, epoch seconds.
    pub installed_at: u64,
}

/// Persists and looks up installations.
///
/// `find_bot` answers "which bot token serves this workspace" and is on the
/// hot path of every authorized request; `find_installer` recovers the
/// installing user's grant.
pub trait InstallationStore: Send + Sync {
    /// Saves an installation, replacing any previous record for its key.
    fn save(&self, installation: Installation) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Finds the bot installation for a workspace.
    fn find_bot<'a>(
        &'a self,
        enterprise_id: Option<&'a str>,
        team_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<Installation>, StoreError>>;

    /// Finds the installation performed by a specific user.
    fn find_installer<'a>(
        &'a self,
        enterprise_id: Option<&'a str>,
        team_id: Option<&'a str>,
        user_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<Installation>, StoreError>>;

    /// Deletes every record for a workspace.
    fn delete_all<'a>(
        &'a self,
        enterprise_id: Option<&'a str>,
        team_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

fn bot_key(enterprise_id: Option<&str>, team_id: Option<&str>) -> String {
    format!(
        "{}:{}",
        enterprise_id.unwrap_or("none"),
        team_id.unwrap_or("none")
    )
}

fn installer_key(
    enterprise_id: Option<&str>,
    team_id: Option<&str>,
    user_id: Option<&str>,
) -> String {
    format!(
        "{}:{}",
        bot_key(enterprise_id, team_id),
        user_id.unwrap_or("none")
    )
}

/// In-memory installation store, the default.
#[derive(Debug, Default)]
pub struct MemoryInstallationStore {
    bots: RwLock<HashMap<String, Installation>>,
    installers: RwLock<HashMap<String, Installation>>,
}

impl MemoryInstallationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstallationStore for MemoryInstallationStore {
    fn save(&self, installation: Installation) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let bot_key = bot_key(
                installation.enterprise_id.as_deref(),
                installation.team_id.as_deref(),
            );
            let installer_key = installer_key(
                installation.enterprise_id.as_deref(),
                installation.team_id.as_deref(),
                installation.user_id.as_deref(),
            );
            if installation.bot_token.is_some() {
                self.bots.write().insert(bot_key, installation.clone());
            }
            self.installers.write().insert(installer_key, installation);
            Ok(())
        })
    }

    fn find_bot<'a>(
        &'a self,
        enterprise_id: Option<&'a str>,
        team_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<Installation>, StoreError>> {
        Box::pin(async move {
            Ok(self.bots.read().get(&bot_key(enterprise_id, team_id)).cloned())
        })
    }

    fn find_installer<'a>(
        &'a self,
        enterprise_id: Option<&'a str>,
        team_id: Option<&'a str>,
        user_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<Installation>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .installers
                .read()
                .get(&installer_key(enterprise_id, team_id, user_id))
                .cloned())
        })
    }

    fn delete_all<'a>(
        &'a self,
        enterprise_id: Option<&'a str>,
        team_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let key = bot_key(enterprise_id, team_id);
            self.bots.write().remove(&key);
            self.installers
                .write()
                .retain(|installer_key, _| !installer_key.starts_with(&format!("{key}:")));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installation(team: &str, user: &str) -> Installation {
        Installation {
            team_id: Some(team.to_string()),
            user_id: Some(user.to_string()),
            bot_token: Some("xoxb-token".to_string()),
            bot_user_id: Some("U-bot".to_string()),
            installed_at: 1_700_000_000,
            ..Installation::default()
        }
    }

    #[tokio::test]
    async fn save_and_find_bot() {
        let store = MemoryInstallationStore::new();
        store.save(installation("T1", "U1")).await.unwrap();

        let found = store.find_bot(None, Some("T1")).await.unwrap().unwrap();
        assert_eq!(found.bot_token.as_deref(), Some("xoxb-token"));
        assert!(store.find_bot(None, Some("T2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_installer_is_per_user() {
        let store = MemoryInstallationStore::new();
        store.save(installation("T1", "U1")).await.unwrap();
        store.save(installation("T1", "U2")).await.unwrap();

        let u1 = store
            .find_installer(None, Some("T1"), Some("U1"))
            .await
            .unwrap();
        assert_eq!(u1.unwrap().user_id.as_deref(), Some("U1"));
        let u3 = store
            .find_installer(None, Some("T1"), Some("U3"))
            .await
            .unwrap();
        assert!(u3.is_none());
    }

    #[tokio::test]
    async fn delete_all_clears_workspace() {
        let store = MemoryInstallationStore::new();
        store.save(installation("T1", "U1")).await.unwrap();
        store.save(installation("T2", "U1")).await.unwrap();

        store.delete_all(None, Some("T1")).await.unwrap();
        assert!(store.find_bot(None, Some("T1")).await.unwrap().is_none());
        assert!(store
            .find_installer(None, Some("T1"), Some("U1"))
            .await
            .unwrap()
            .is_none());
        assert!(store.find_bot(None, Some("T2")).await.unwrap().is_some());
    }
}
