// service/session.rs
use std::sync::Arc;

use tokio::sync::RwLock;

use super::credential_resolver::CredentialResolver;
use crate::{
    db::{db::DBClient, store::keys},
    error::{PortalError, StoreError},
    models::usermodel::{Role, UserProfile},
};

/// The portal's one signed-in identity.
///
/// Built once at startup and shared through `AppState`. The persisted record
/// under `current_session` is the source of truth across restarts; a restored
/// session is trusted until an explicit logout.
#[derive(Debug)]
pub struct SessionManager {
    db_client: Arc<DBClient>,
    resolver: CredentialResolver,
    current: RwLock<Option<UserProfile>>,
}

impl SessionManager {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        SessionManager {
            resolver: CredentialResolver::new(db_client.clone()),
            db_client,
            current: RwLock::new(None),
        }
    }

    /// Adopts the persisted session, if any. A record that no longer parses
    /// is logged, deleted and treated as "no session".
    pub async fn restore(&self) -> Option<UserProfile> {
        let mut current = self.current.write().await;

        let restored = match self
            .db_client
            .store
            .get_value::<UserProfile>(keys::CURRENT_SESSION)
            .await
        {
            Ok(profile) => profile,
            Err(StoreError::Corruption { key, source }) => {
                tracing::warn!("Discarding corrupted session record `{}`: {}", key, source);
                if let Err(e) = self.db_client.store.remove(keys::CURRENT_SESSION).await {
                    tracing::error!("Failed to remove corrupted session record: {}", e);
                }
                None
            }
            Err(e) => {
                tracing::error!("Failed to read session record: {}", e);
                None
            }
        };

        match &restored {
            Some(profile) => tracing::info!(
                "Restored session for {} ({})",
                profile.id(),
                profile.role().to_str()
            ),
            None => tracing::info!("No session to restore"),
        }

        *current = restored.clone();
        restored
    }

    /// `Ok(false)` for rejected credentials, leaving the current session as it
    /// was. Errors are store failures only.
    pub async fn login(&self, identifier: &str, secret: &str, role: Role) -> Result<bool, PortalError> {
        let profile = match self.resolver.resolve(identifier, secret, role).await {
            Ok(profile) => profile,
            Err(PortalError::InvalidCredentials) => {
                tracing::warn!("Rejected {} sign-in for `{}`", role.to_str(), identifier);
                return Ok(false);
            }
            Err(e) => {
                tracing::error!("Sign-in failed on a store error: {}", e);
                return Err(e);
            }
        };

        let mut current = self.current.write().await;
        self.db_client
            .store
            .put_value(keys::CURRENT_SESSION, &profile)
            .await?;

        tracing::info!("{} {} signed in", role.to_str(), profile.id());
        *current = Some(profile);
        Ok(true)
    }

    /// Safe to call when nobody is signed in.
    pub async fn logout(&self) -> Result<(), PortalError> {
        let mut current = self.current.write().await;
        self.db_client.store.remove(keys::CURRENT_SESSION).await?;

        if let Some(profile) = current.take() {
            tracing::info!("{} {} signed out", profile.role().to_str(), profile.id());
        }
        Ok(())
    }

    pub async fn current(&self) -> Option<UserProfile> {
        self.current.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed::FIXTURE_LOGINS, testutil::seeded_client};

    #[tokio::test]
    async fn fixture_logins_set_current_account() {
        let session = SessionManager::new(seeded_client().await);
        for (owner, role, identifier, secret) in FIXTURE_LOGINS {
            assert!(session.login(identifier, secret, role).await.unwrap());
            let current = session.current().await.unwrap();
            assert_eq!(current.role(), role);
            assert_eq!(current.id(), owner);
        }
    }

    #[tokio::test]
    async fn wrong_secret_leaves_session_unchanged() {
        let session = SessionManager::new(seeded_client().await);

        assert!(!session.login("22-04-0191", "wrong", Role::Student).await.unwrap());
        assert!(session.current().await.is_none());
        assert!(!session.is_authenticated().await);

        assert!(session
            .login("chinedu.okonkwo@aapoly.edu.ng", "supervisor123", Role::Supervisor)
            .await
            .unwrap());
        let before = session.current().await;

        assert!(!session
            .login("funmilayo.adeyemi@aapoly.edu.ng", "wrong", Role::Coordinator)
            .await
            .unwrap());
        assert_eq!(session.current().await, before);
    }

    #[tokio::test]
    async fn session_survives_restart_until_logout() {
        let db = seeded_client().await;

        let first = SessionManager::new(db.clone());
        assert!(first.login("okafor", "okafor", Role::Student).await.unwrap());

        let second = SessionManager::new(db.clone());
        let restored = second.restore().await.unwrap();
        assert_eq!(restored.id(), "2");
        assert!(second.is_authenticated().await);

        second.logout().await.unwrap();
        second.logout().await.unwrap();

        let third = SessionManager::new(db);
        assert!(third.restore().await.is_none());
        assert!(third.current().await.is_none());
    }

    #[tokio::test]
    async fn corrupted_session_restores_as_signed_out() {
        let db = seeded_client().await;
        db.store
            .put_value(keys::CURRENT_SESSION, &"not a profile")
            .await
            .unwrap();

        let session = SessionManager::new(db.clone());
        assert!(session.restore().await.is_none());
        assert_eq!(db.store.raw(keys::CURRENT_SESSION).await.unwrap(), None);
    }
}
