// service/credential_resolver.rs
use std::sync::Arc;

use crate::{
    db::{db::DBClient, userdb::UserExt},
    error::PortalError,
    models::usermodel::{Credential, Role, StudentProfile, UserProfile},
    utils::password,
};

/// Authenticates (identifier, secret, role) triples against the stored
/// credential table.
///
/// Students may sign in with their matric number or with their surname (the
/// last word of their name, any case). Staff sign in with their exact email.
/// Secrets are argon2 hashes and are only ever verified, never compared as
/// text.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    db_client: Arc<DBClient>,
}

impl CredentialResolver {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        CredentialResolver { db_client }
    }

    /// `InvalidCredentials` for every ordinary mismatch; other errors only
    /// when the store cannot be read.
    pub async fn resolve(
        &self,
        identifier: &str,
        secret: &str,
        role: Role,
    ) -> Result<UserProfile, PortalError> {
        let credentials = self.db_client.get_credentials(role).await?;

        let (credential, profile) = match role {
            Role::Student => {
                let students = self.db_client.get_students().await?;
                let Some(student) = match_student(&students, identifier) else {
                    return Err(PortalError::InvalidCredentials);
                };
                let credential = credentials
                    .into_iter()
                    .find(|c| c.owner_account_id == student.account.id)
                    .ok_or(PortalError::InvalidCredentials)?;
                (credential, UserProfile::Student(student.clone()))
            }
            Role::Supervisor | Role::Coordinator => {
                let credential = credentials
                    .into_iter()
                    .find(|c| c.identifier_value == identifier)
                    .ok_or(PortalError::InvalidCredentials)?;
                let profile = self
                    .db_client
                    .get_profile(&credential.owner_account_id)
                    .await?
                    .filter(|p| p.role() == role)
                    .ok_or(PortalError::InvalidCredentials)?;
                (credential, profile)
            }
        };

        if !secret_matches(secret, &credential) {
            return Err(PortalError::InvalidCredentials);
        }

        Ok(profile)
    }
}

/// First student whose matric number equals the identifier or whose surname
/// equals it case-insensitively.
fn match_student<'a>(students: &'a [StudentProfile], identifier: &str) -> Option<&'a StudentProfile> {
    let wanted_surname = identifier.to_lowercase();
    students.iter().find(|s| {
        s.matric_number == identifier || s.account.surname().as_deref() == Some(wanted_surname.as_str())
    })
}

fn secret_matches(secret: &str, credential: &Credential) -> bool {
    match password::compare(secret, &credential.secret_hash) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!(
                "Could not verify secret for account {}: {}",
                credential.owner_account_id,
                e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed::FIXTURE_LOGINS, testutil::seeded_client};

    async fn resolver() -> CredentialResolver {
        CredentialResolver::new(seeded_client().await)
    }

    // Which identifiers are accepted is unchanged; stored secrets are
    // argon2 hashes rather than plaintext.
    #[tokio::test]
    async fn every_fixture_login_resolves_to_its_role() {
        let resolver = resolver().await;
        for (owner, role, identifier, secret) in FIXTURE_LOGINS {
            let profile = resolver.resolve(identifier, secret, role).await.unwrap();
            assert_eq!(profile.id(), owner);
            assert_eq!(profile.role(), role);
        }
    }

    #[tokio::test]
    async fn surname_login_matches_matric_login() {
        let resolver = resolver().await;
        let by_matric = resolver.resolve("22-04-0191", "adebayo", Role::Student).await.unwrap();
        let by_surname = resolver.resolve("adebayo", "adebayo", Role::Student).await.unwrap();
        let shouting = resolver.resolve("ADEBAYO", "adebayo", Role::Student).await.unwrap();

        assert_eq!(by_matric, by_surname);
        assert_eq!(by_surname, shouting);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_credentials() {
        let resolver = resolver().await;
        for (_, role, identifier, _) in FIXTURE_LOGINS {
            let err = resolver.resolve(identifier, "not-the-password", role).await.unwrap_err();
            assert!(matches!(err, PortalError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn staff_email_is_case_sensitive() {
        let resolver = resolver().await;
        assert!(resolver
            .resolve("oluwaseun.adeleke@aapoly.edu.ng", "supervisor123", Role::Supervisor)
            .await
            .is_ok());
        assert!(matches!(
            resolver
                .resolve("Oluwaseun.Adeleke@aapoly.edu.ng", "supervisor123", Role::Supervisor)
                .await,
            Err(PortalError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn identifier_from_another_role_is_rejected() {
        let resolver = resolver().await;
        assert!(matches!(
            resolver
                .resolve("funmilayo.adeyemi@aapoly.edu.ng", "coordinator123", Role::Supervisor)
                .await,
            Err(PortalError::InvalidCredentials)
        ));
        assert!(matches!(
            resolver.resolve("22-04-0191", "adebayo", Role::Coordinator).await,
            Err(PortalError::InvalidCredentials)
        ));
        assert!(matches!(
            resolver.resolve("nobody", "adebayo", Role::Student).await,
            Err(PortalError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn corrupted_credentials_surface_as_store_error() {
        use crate::db::{backend::MemoryBackend, store::RecordStore};

        let store = RecordStore::new(
            Arc::new(MemoryBackend::with_entries([("test:credentials", "[{oops")])),
            "test",
        );
        let resolver = CredentialResolver::new(Arc::new(DBClient::new(store)));
        assert!(matches!(
            resolver.resolve("adebayo", "adebayo", Role::Student).await,
            Err(PortalError::StoreCorruption { .. })
        ));
    }
}
