// db/seed.rs
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;

use super::store::{keys, RecordStore, StoreTransaction};
use crate::{
    error::{PortalError, StoreError},
    models::{
        chatmodels::ChatMessage,
        paymentmodels::{PaymentMethod, PaymentRecord, PaymentRecordStatus},
        reportmodel::{ReportStatus, WeeklyReport},
        usermodel::{
            Account, CoordinatorProfile, Credential, GeoPoint, Organization, Role, StudentProfile,
            SupervisorProfile,
        },
    },
    utils::password,
};

impl RecordStore {
    /// Writes the fixture data for every collection key that is absent or
    /// holds unreadable JSON. Keys with valid data are never touched, so
    /// repeated calls leave the store byte-identical.
    pub async fn seed_if_empty(&self) -> Result<Vec<&'static str>, PortalError> {
        let txn = self.transaction().await;
        let mut seeded = Vec::new();

        for key in keys::COLLECTIONS {
            let needs_seed = match key {
                keys::STUDENTS => needs_seed::<StudentProfile>(&txn, key).await?,
                keys::SUPERVISORS => needs_seed::<SupervisorProfile>(&txn, key).await?,
                keys::COORDINATORS => needs_seed::<CoordinatorProfile>(&txn, key).await?,
                keys::CREDENTIALS => needs_seed::<Credential>(&txn, key).await?,
                keys::REPORTS => needs_seed::<WeeklyReport>(&txn, key).await?,
                keys::CHATS => needs_seed::<ChatMessage>(&txn, key).await?,
                keys::PAYMENTS => needs_seed::<PaymentRecord>(&txn, key).await?,
                _ => false,
            };

            if !needs_seed {
                continue;
            }

            match key {
                keys::STUDENTS => txn.put_collection(key, &fixture_students()).await?,
                keys::SUPERVISORS => txn.put_collection(key, &fixture_supervisors()).await?,
                keys::COORDINATORS => txn.put_collection(key, &fixture_coordinators()).await?,
                keys::CREDENTIALS => txn.put_collection(key, &fixture_credentials()?).await?,
                keys::REPORTS => txn.put_collection(key, &fixture_reports()).await?,
                keys::CHATS => txn.put_collection(key, &fixture_chats()).await?,
                keys::PAYMENTS => txn.put_collection(key, &fixture_payments()).await?,
                _ => {}
            }

            tracing::info!("Seeded collection `{}` with fixture data", key);
            seeded.push(key);
        }

        if seeded.iter().any(|key| IDENTITY_KEYS.contains(key)) {
            drop_orphaned_credentials(&txn).await?;
        }

        Ok(seeded)
    }
}

const IDENTITY_KEYS: [&str; 4] = [
    keys::STUDENTS,
    keys::SUPERVISORS,
    keys::COORDINATORS,
    keys::CREDENTIALS,
];

/// A reseeded profile collection loses accounts registered after the
/// fixtures; their credentials would otherwise block the identifier forever.
async fn drop_orphaned_credentials(txn: &StoreTransaction<'_>) -> Result<(), PortalError> {
    let students: Vec<StudentProfile> = txn.get_collection(keys::STUDENTS).await?;
    let supervisors: Vec<SupervisorProfile> = txn.get_collection(keys::SUPERVISORS).await?;
    let coordinators: Vec<CoordinatorProfile> = txn.get_collection(keys::COORDINATORS).await?;
    let mut credentials: Vec<Credential> = txn.get_collection(keys::CREDENTIALS).await?;

    let owners: Vec<(&str, Role)> = students
        .iter()
        .map(|s| &s.account)
        .chain(supervisors.iter().map(|s| &s.account))
        .chain(coordinators.iter().map(|c| &c.account))
        .map(|a| (a.id.as_str(), a.role))
        .collect();

    let before = credentials.len();
    credentials.retain(|c| {
        owners
            .iter()
            .any(|(id, role)| *id == c.owner_account_id && *role == c.role_scope)
    });

    if credentials.len() != before {
        tracing::warn!(
            "Dropped {} credential(s) whose account was lost with a corrupted collection",
            before - credentials.len()
        );
        txn.put_collection(keys::CREDENTIALS, &credentials).await?;
    }
    Ok(())
}

async fn needs_seed<T: DeserializeOwned>(
    txn: &StoreTransaction<'_>,
    key: &str,
) -> Result<bool, StoreError> {
    if txn.raw(key).await?.is_none() {
        return Ok(true);
    }

    match txn.get_collection::<T>(key).await {
        Ok(_) => Ok(false),
        Err(StoreError::Corruption { .. }) => {
            tracing::warn!("Collection `{}` is corrupted; restoring fixture data", key);
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .unwrap_or_default()
}

fn account(id: &str, name: &str, email: &str, role: Role, created_at: DateTime<Utc>) -> Account {
    Account {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        created_at,
    }
}

fn tech_solutions() -> Organization {
    Organization {
        name: "Tech Solutions Ltd.".to_string(),
        address: "15 Ikeja Industrial Estate, Ikeja".to_string(),
        state: "Lagos".to_string(),
        lga: "Ikeja".to_string(),
        contact_person: "Mr. Adebayo Johnson".to_string(),
        phone_number: "08012345678".to_string(),
        location: Some(GeoPoint {
            lat: 6.6018,
            lng: 3.3515,
        }),
    }
}

pub fn fixture_students() -> Vec<StudentProfile> {
    vec![
        StudentProfile {
            account: account(
                "1",
                "John Adebayo",
                "john.adebayo@student.aapoly.edu.ng",
                Role::Student,
                date(2024, 1, 15),
            ),
            matric_number: "22-04-0191".to_string(),
            department: "Computer Science".to_string(),
            organization: Some(tech_solutions()),
            supervisor_id: Some("sup-1".to_string()),
        },
        StudentProfile {
            account: account(
                "2",
                "Esther Okafor",
                "esther.okafor@student.aapoly.edu.ng",
                Role::Student,
                date(2024, 1, 16),
            ),
            matric_number: "22-04-0192".to_string(),
            department: "Computer Science".to_string(),
            organization: Some(tech_solutions()),
            supervisor_id: Some("sup-1".to_string()),
        },
        StudentProfile {
            account: account(
                "3",
                "Mohammed Ibrahim",
                "mohammed.ibrahim@student.aapoly.edu.ng",
                Role::Student,
                date(2024, 1, 17),
            ),
            matric_number: "22-04-0193".to_string(),
            department: "Electrical Engineering".to_string(),
            organization: None,
            supervisor_id: None,
        },
    ]
}

pub fn fixture_supervisors() -> Vec<SupervisorProfile> {
    vec![
        SupervisorProfile {
            account: account(
                "sup-1",
                "Dr. Oluwaseun Adeleke",
                "oluwaseun.adeleke@aapoly.edu.ng",
                Role::Supervisor,
                date(2024, 1, 1),
            ),
            department: "Computer Science".to_string(),
            phone_number: "08098765432".to_string(),
            assigned_students: vec!["1".to_string(), "2".to_string()],
        },
        SupervisorProfile {
            account: account(
                "sup-2",
                "Prof. Chinedu Okonkwo",
                "chinedu.okonkwo@aapoly.edu.ng",
                Role::Supervisor,
                date(2024, 1, 1),
            ),
            department: "Electrical Engineering".to_string(),
            phone_number: "08087654321".to_string(),
            assigned_students: Vec::new(),
        },
    ]
}

pub fn fixture_coordinators() -> Vec<CoordinatorProfile> {
    vec![CoordinatorProfile {
        account: account(
            "coord-1",
            "Dr. Funmilayo Adeyemi",
            "funmilayo.adeyemi@aapoly.edu.ng",
            Role::Coordinator,
            date(2024, 1, 1),
        ),
        department: "SIWES Coordination Office".to_string(),
        phone_number: "08076543210".to_string(),
    }]
}

/// Fixture sign-ins: (owner, role, identifier, password).
pub const FIXTURE_LOGINS: [(&str, Role, &str, &str); 6] = [
    ("1", Role::Student, "22-04-0191", "adebayo"),
    ("2", Role::Student, "22-04-0192", "okafor"),
    ("3", Role::Student, "22-04-0193", "ibrahim"),
    ("sup-1", Role::Supervisor, "oluwaseun.adeleke@aapoly.edu.ng", "supervisor123"),
    ("sup-2", Role::Supervisor, "chinedu.okonkwo@aapoly.edu.ng", "supervisor123"),
    ("coord-1", Role::Coordinator, "funmilayo.adeyemi@aapoly.edu.ng", "coordinator123"),
];

pub fn fixture_credentials() -> Result<Vec<Credential>, PortalError> {
    FIXTURE_LOGINS
        .iter()
        .map(|(owner, role, identifier, secret)| {
            let secret_hash =
                password::hash(*secret).map_err(|e| PortalError::Hashing(e.to_string()))?;
            Ok(Credential {
                owner_account_id: owner.to_string(),
                role_scope: *role,
                identifier_value: identifier.to_string(),
                secret_hash,
            })
        })
        .collect()
}

pub fn fixture_reports() -> Vec<WeeklyReport> {
    vec![
        WeeklyReport {
            id: "rep-1".to_string(),
            student_id: "1".to_string(),
            week_number: 1,
            title: "Introduction to Company Operations".to_string(),
            description: "Learned about the company structure, met team members, and got familiar with the work environment.".to_string(),
            submission_date: date(2024, 2, 1),
            status: ReportStatus::Reviewed,
            feedback: Some("Good start! Make sure to document specific technical skills you learn.".to_string()),
            file_url: None,
        },
        WeeklyReport {
            id: "rep-2".to_string(),
            student_id: "1".to_string(),
            week_number: 2,
            title: "Frontend Development Training".to_string(),
            description: "Started learning React.js and worked on basic components.".to_string(),
            submission_date: date(2024, 2, 8),
            status: ReportStatus::Pending,
            feedback: None,
            file_url: None,
        },
    ]
}

pub fn fixture_chats() -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            id: "chat-1".to_string(),
            sender_id: "1".to_string(),
            receiver_id: "sup-1".to_string(),
            message: "Good morning sir, I have submitted my week 2 report.".to_string(),
            timestamp: datetime(2024, 2, 8, 9, 30),
            read: true,
        },
        ChatMessage {
            id: "chat-2".to_string(),
            sender_id: "sup-1".to_string(),
            receiver_id: "1".to_string(),
            message: "Good morning John, I will review it shortly.".to_string(),
            timestamp: datetime(2024, 2, 8, 10, 15),
            read: true,
        },
    ]
}

pub fn fixture_payments() -> Vec<PaymentRecord> {
    vec![
        PaymentRecord {
            id: "pay-1".to_string(),
            student_id: "1".to_string(),
            amount: 7000,
            reference_number: "PAY-2024-001".to_string(),
            payment_date: date(2024, 1, 20),
            status: PaymentRecordStatus::Completed,
            payment_method: PaymentMethod::Online,
            evidence: None,
        },
        PaymentRecord {
            id: "pay-2".to_string(),
            student_id: "2".to_string(),
            amount: 7000,
            reference_number: "PAY-2024-002".to_string(),
            payment_date: date(2024, 1, 21),
            status: PaymentRecordStatus::Completed,
            payment_method: PaymentMethod::Online,
            evidence: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::backend::MemoryBackend;

    #[tokio::test]
    async fn seeding_twice_is_byte_identical() {
        let store = RecordStore::new(Arc::new(MemoryBackend::new()), "siwes");

        let first = store.seed_if_empty().await.unwrap();
        assert_eq!(first.len(), keys::COLLECTIONS.len());

        let mut snapshot = Vec::new();
        for key in keys::COLLECTIONS {
            snapshot.push(store.raw(key).await.unwrap());
        }

        let second = store.seed_if_empty().await.unwrap();
        assert!(second.is_empty());

        for (key, before) in keys::COLLECTIONS.iter().zip(snapshot) {
            assert_eq!(store.raw(key).await.unwrap(), before, "collection {} changed", key);
        }

        let students: Vec<StudentProfile> = store.get_collection(keys::STUDENTS).await.unwrap();
        assert_eq!(students.len(), 3);
    }

    #[tokio::test]
    async fn existing_collections_are_left_alone() {
        let backend = MemoryBackend::with_entries([("siwes:reports", "[]")]);
        let store = RecordStore::new(Arc::new(backend), "siwes");

        let seeded = store.seed_if_empty().await.unwrap();
        assert!(!seeded.contains(&keys::REPORTS));

        let reports: Vec<WeeklyReport> = store.get_collection(keys::REPORTS).await.unwrap();
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn corrupted_collection_is_repaired() {
        let backend = MemoryBackend::with_entries([("siwes:chats", "[{\"id\": ")]);
        let store = RecordStore::new(Arc::new(backend), "siwes");

        let seeded = store.seed_if_empty().await.unwrap();
        assert!(seeded.contains(&keys::CHATS));

        let chats: Vec<ChatMessage> = store.get_collection(keys::CHATS).await.unwrap();
        assert_eq!(chats, fixture_chats());
    }

    #[tokio::test]
    async fn reseeded_students_take_their_orphaned_credentials_along() {
        let mut credentials = fixture_credentials().unwrap();
        let secret_hash = credentials[0].secret_hash.clone();
        credentials.push(Credential {
            owner_account_id: "student-late".to_string(),
            role_scope: Role::Student,
            identifier_value: "23-01-0042".to_string(),
            secret_hash: secret_hash.clone(),
        });
        let raw_credentials = serde_json::to_string(&credentials).unwrap();

        let backend = MemoryBackend::with_entries([
            ("siwes:students".to_string(), "[{\"account\": ".to_string()),
            ("siwes:credentials".to_string(), raw_credentials),
        ]);
        let store = RecordStore::new(Arc::new(backend), "siwes");

        let seeded = store.seed_if_empty().await.unwrap();
        assert!(seeded.contains(&keys::STUDENTS));
        assert!(!seeded.contains(&keys::CREDENTIALS));

        let kept: Vec<Credential> = store.get_collection(keys::CREDENTIALS).await.unwrap();
        assert_eq!(kept.len(), FIXTURE_LOGINS.len());
        assert!(kept.iter().all(|c| c.owner_account_id != "student-late"));
    }

    #[tokio::test]
    async fn matric_of_lost_student_can_register_again() {
        use crate::db::{
            db::DBClient,
            userdb::{NewStudent, UserExt},
        };

        let mut credentials = fixture_credentials().unwrap();
        let secret_hash = credentials[0].secret_hash.clone();
        credentials.push(Credential {
            owner_account_id: "student-late".to_string(),
            role_scope: Role::Student,
            identifier_value: "23-01-0042".to_string(),
            secret_hash: secret_hash.clone(),
        });
        let backend = MemoryBackend::with_entries([
            ("siwes:students".to_string(), "not json".to_string()),
            ("siwes:credentials".to_string(), serde_json::to_string(&credentials).unwrap()),
        ]);
        let store = RecordStore::new(Arc::new(backend), "siwes");
        store.seed_if_empty().await.unwrap();

        let db = DBClient::new(store);
        let student = db
            .save_student(NewStudent {
                name: "Grace Eze".to_string(),
                email: "grace.eze@student.aapoly.edu.ng".to_string(),
                matric_number: "23-01-0042".to_string(),
                department: "Statistics".to_string(),
                password_hash: secret_hash,
            })
            .await
            .unwrap();
        assert_eq!(student.matric_number, "23-01-0042");
    }

    #[test]
    fn fixture_credentials_store_hashes_not_plaintext() {
        let credentials = fixture_credentials().unwrap();
        assert_eq!(credentials.len(), FIXTURE_LOGINS.len());
        for (credential, (_, _, _, secret)) in credentials.iter().zip(FIXTURE_LOGINS.iter()) {
            assert_ne!(credential.secret_hash.as_str(), *secret);
            assert!(password::compare(secret, &credential.secret_hash).unwrap());
        }
    }
}
