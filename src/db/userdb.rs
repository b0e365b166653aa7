// db/userdb.rs
use async_trait::async_trait;
use chrono::Utc;

use super::{
    db::DBClient,
    paymentdb::PaymentExt,
    store::{keys, StoreTransaction},
};
use crate::{
    error::{ErrorMessage, PortalError},
    models::{
        rowmodels::{RelationalSnapshot, StaffRow, StudentRow, UserRow},
        usermodel::{
            Account, CoordinatorProfile, Credential, Organization, Role, StudentProfile,
            SupervisorProfile, UserProfile,
        },
    },
    utils::reference::new_record_id,
};

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub department: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewSupervisor {
    pub name: String,
    pub email: String,
    pub department: String,
    pub phone_number: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserExt {
    async fn get_students(&self) -> Result<Vec<StudentProfile>, PortalError>;

    async fn get_student(&self, student_id: &str) -> Result<Option<StudentProfile>, PortalError>;

    async fn get_supervisors(&self) -> Result<Vec<SupervisorProfile>, PortalError>;

    async fn get_supervisor(&self, supervisor_id: &str) -> Result<Option<SupervisorProfile>, PortalError>;

    async fn get_coordinators(&self) -> Result<Vec<CoordinatorProfile>, PortalError>;

    async fn get_credentials(&self, role: Role) -> Result<Vec<Credential>, PortalError>;

    /// Looks the id up in every role collection.
    async fn get_profile(&self, account_id: &str) -> Result<Option<UserProfile>, PortalError>;

    async fn students_supervised_by(&self, supervisor_id: &str) -> Result<Vec<StudentProfile>, PortalError>;

    async fn save_student(&self, new_student: NewStudent) -> Result<StudentProfile, PortalError>;

    async fn save_supervisor(&self, new_supervisor: NewSupervisor) -> Result<SupervisorProfile, PortalError>;

    async fn update_password(
        &self,
        account_id: &str,
        role: Role,
        password_hash: String,
    ) -> Result<(), PortalError>;

    async fn update_student_organization(
        &self,
        student_id: &str,
        organization: Organization,
    ) -> Result<StudentProfile, PortalError>;

    async fn assign_supervisor(
        &self,
        student_id: &str,
        supervisor_id: &str,
    ) -> Result<StudentProfile, PortalError>;

    async fn relational_snapshot(&self) -> Result<RelationalSnapshot, PortalError>;
}

fn email_taken(email: &str, accounts: &[&Account]) -> bool {
    accounts
        .iter()
        .any(|account| account.email.eq_ignore_ascii_case(email.trim()))
}

/// Removes the account written by the first step of a two-step create.
async fn roll_back_account<T>(
    txn: &StoreTransaction<'_>,
    key: &str,
    mut items: Vec<T>,
    account_id: &str,
    account_of: fn(&T) -> &Account,
) -> Result<(), PortalError>
where
    T: serde::Serialize + Send + Sync,
{
    items.retain(|item| account_of(item).id != account_id);
    txn.put_collection(key, &items).await?;
    tracing::warn!(
        "Rolled back account {} in `{}` after its credential write failed",
        account_id,
        key
    );
    Ok(())
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_students(&self) -> Result<Vec<StudentProfile>, PortalError> {
        Ok(self.store.get_collection(keys::STUDENTS).await?)
    }

    async fn get_student(&self, student_id: &str) -> Result<Option<StudentProfile>, PortalError> {
        Ok(self
            .get_students()
            .await?
            .into_iter()
            .find(|s| s.account.id == student_id))
    }

    async fn get_supervisors(&self) -> Result<Vec<SupervisorProfile>, PortalError> {
        Ok(self.store.get_collection(keys::SUPERVISORS).await?)
    }

    async fn get_supervisor(&self, supervisor_id: &str) -> Result<Option<SupervisorProfile>, PortalError> {
        Ok(self
            .get_supervisors()
            .await?
            .into_iter()
            .find(|s| s.account.id == supervisor_id))
    }

    async fn get_coordinators(&self) -> Result<Vec<CoordinatorProfile>, PortalError> {
        Ok(self.store.get_collection(keys::COORDINATORS).await?)
    }

    async fn get_credentials(&self, role: Role) -> Result<Vec<Credential>, PortalError> {
        let credentials: Vec<Credential> = self.store.get_collection(keys::CREDENTIALS).await?;
        Ok(credentials
            .into_iter()
            .filter(|c| c.role_scope == role)
            .collect())
    }

    async fn get_profile(&self, account_id: &str) -> Result<Option<UserProfile>, PortalError> {
        if let Some(student) = self.get_student(account_id).await? {
            return Ok(Some(UserProfile::Student(student)));
        }
        if let Some(supervisor) = self.get_supervisor(account_id).await? {
            return Ok(Some(UserProfile::Supervisor(supervisor)));
        }
        Ok(self
            .get_coordinators()
            .await?
            .into_iter()
            .find(|c| c.account.id == account_id)
            .map(UserProfile::Coordinator))
    }

    async fn students_supervised_by(&self, supervisor_id: &str) -> Result<Vec<StudentProfile>, PortalError> {
        Ok(self
            .get_students()
            .await?
            .into_iter()
            .filter(|s| s.supervisor_id.as_deref() == Some(supervisor_id))
            .collect())
    }

    async fn save_student(&self, new_student: NewStudent) -> Result<StudentProfile, PortalError> {
        let txn = self.store.transaction().await;

        let mut students: Vec<StudentProfile> = txn.get_collection(keys::STUDENTS).await?;
        let supervisors: Vec<SupervisorProfile> = txn.get_collection(keys::SUPERVISORS).await?;
        let coordinators: Vec<CoordinatorProfile> = txn.get_collection(keys::COORDINATORS).await?;
        let mut credentials: Vec<Credential> = txn.get_collection(keys::CREDENTIALS).await?;

        let email_in_use = {
            let accounts: Vec<&Account> = students
                .iter()
                .map(|s| &s.account)
                .chain(supervisors.iter().map(|s| &s.account))
                .chain(coordinators.iter().map(|c| &c.account))
                .collect();
            email_taken(&new_student.email, &accounts)
        };

        if email_in_use {
            return Err(PortalError::DuplicateIdentifier {
                field: "email",
                message: ErrorMessage::EmailExist.to_string(),
            });
        }

        let matric_taken = students
            .iter()
            .any(|s| s.matric_number == new_student.matric_number)
            || credentials.iter().any(|c| {
                c.role_scope == Role::Student && c.identifier_value == new_student.matric_number
            });
        if matric_taken {
            return Err(PortalError::DuplicateIdentifier {
                field: "matricNumber",
                message: ErrorMessage::MatricNumberExist.to_string(),
            });
        }

        let profile = StudentProfile {
            account: Account {
                id: new_record_id(),
                name: new_student.name.trim().to_string(),
                email: new_student.email.trim().to_string(),
                role: Role::Student,
                created_at: Utc::now(),
            },
            matric_number: new_student.matric_number.clone(),
            department: new_student.department,
            organization: None,
            supervisor_id: None,
        };

        // Step one: the profile.
        students.push(profile.clone());
        txn.put_collection(keys::STUDENTS, &students).await?;

        // Step two: the credential, undoing step one when it fails.
        credentials.push(Credential {
            owner_account_id: profile.account.id.clone(),
            role_scope: Role::Student,
            identifier_value: new_student.matric_number,
            secret_hash: new_student.password_hash,
        });
        if let Err(e) = txn.put_collection(keys::CREDENTIALS, &credentials).await {
            roll_back_account(&txn, keys::STUDENTS, students, &profile.account.id, |s| &s.account)
                .await?;
            return Err(e.into());
        }

        tracing::info!("Registered student {} ({})", profile.account.id, profile.matric_number);
        Ok(profile)
    }

    async fn save_supervisor(&self, new_supervisor: NewSupervisor) -> Result<SupervisorProfile, PortalError> {
        let txn = self.store.transaction().await;

        let students: Vec<StudentProfile> = txn.get_collection(keys::STUDENTS).await?;
        let mut supervisors: Vec<SupervisorProfile> = txn.get_collection(keys::SUPERVISORS).await?;
        let coordinators: Vec<CoordinatorProfile> = txn.get_collection(keys::COORDINATORS).await?;
        let mut credentials: Vec<Credential> = txn.get_collection(keys::CREDENTIALS).await?;

        let email_in_use = {
            let accounts: Vec<&Account> = students
                .iter()
                .map(|s| &s.account)
                .chain(supervisors.iter().map(|s| &s.account))
                .chain(coordinators.iter().map(|c| &c.account))
                .collect();
            email_taken(&new_supervisor.email, &accounts)
        };

        let identifier_taken = credentials.iter().any(|c| {
            c.role_scope == Role::Supervisor
                && c.identifier_value.eq_ignore_ascii_case(new_supervisor.email.trim())
        });
        if email_in_use || identifier_taken {
            return Err(PortalError::DuplicateIdentifier {
                field: "email",
                message: ErrorMessage::EmailExist.to_string(),
            });
        }

        let email = new_supervisor.email.trim().to_string();
        let profile = SupervisorProfile {
            account: Account {
                id: new_record_id(),
                name: new_supervisor.name.trim().to_string(),
                email: email.clone(),
                role: Role::Supervisor,
                created_at: Utc::now(),
            },
            department: new_supervisor.department,
            phone_number: new_supervisor.phone_number.trim().to_string(),
            assigned_students: Vec::new(),
        };

        supervisors.push(profile.clone());
        txn.put_collection(keys::SUPERVISORS, &supervisors).await?;

        credentials.push(Credential {
            owner_account_id: profile.account.id.clone(),
            role_scope: Role::Supervisor,
            identifier_value: email,
            secret_hash: new_supervisor.password_hash,
        });
        if let Err(e) = txn.put_collection(keys::CREDENTIALS, &credentials).await {
            roll_back_account(&txn, keys::SUPERVISORS, supervisors, &profile.account.id, |s| &s.account)
                .await?;
            return Err(e.into());
        }

        tracing::info!("Provisioned supervisor {} ({})", profile.account.id, profile.account.email);
        Ok(profile)
    }

    async fn update_password(
        &self,
        account_id: &str,
        role: Role,
        password_hash: String,
    ) -> Result<(), PortalError> {
        self.store
            .update_collection::<Credential, _, PortalError, _>(keys::CREDENTIALS, |credentials| {
                let credential = credentials
                    .iter_mut()
                    .find(|c| c.owner_account_id == account_id && c.role_scope == role)
                    .ok_or_else(|| PortalError::NotFound(ErrorMessage::UserNoLongerExist.to_string()))?;
                credential.secret_hash = password_hash;
                Ok(())
            })
            .await?;

        tracing::info!("Password updated for account {}", account_id);
        Ok(())
    }

    async fn update_student_organization(
        &self,
        student_id: &str,
        organization: Organization,
    ) -> Result<StudentProfile, PortalError> {
        let updated = self
            .store
            .update_collection::<StudentProfile, _, PortalError, _>(keys::STUDENTS, |students| {
                let student = students
                    .iter_mut()
                    .find(|s| s.account.id == student_id)
                    .ok_or_else(|| PortalError::NotFound("Student not found".to_string()))?;
                student.organization = Some(organization);
                Ok(student.clone())
            })
            .await?;

        tracing::info!("Organization details updated for student {}", student_id);
        Ok(updated)
    }

    async fn assign_supervisor(
        &self,
        student_id: &str,
        supervisor_id: &str,
    ) -> Result<StudentProfile, PortalError> {
        let txn = self.store.transaction().await;

        let mut students: Vec<StudentProfile> = txn.get_collection(keys::STUDENTS).await?;
        let mut supervisors: Vec<SupervisorProfile> = txn.get_collection(keys::SUPERVISORS).await?;

        if !supervisors.iter().any(|s| s.account.id == supervisor_id) {
            return Err(PortalError::NotFound("Supervisor not found".to_string()));
        }

        let student = students
            .iter_mut()
            .find(|s| s.account.id == student_id)
            .ok_or_else(|| PortalError::NotFound("Student not found".to_string()))?;
        student.supervisor_id = Some(supervisor_id.to_string());
        let updated = student.clone();

        for supervisor in supervisors.iter_mut() {
            if supervisor.account.id == supervisor_id {
                if !supervisor.assigned_students.iter().any(|id| id == student_id) {
                    supervisor.assigned_students.push(student_id.to_string());
                }
            } else {
                supervisor.assigned_students.retain(|id| id != student_id);
            }
        }

        txn.put_collection(keys::STUDENTS, &students).await?;
        txn.put_collection(keys::SUPERVISORS, &supervisors).await?;

        tracing::info!("Assigned student {} to supervisor {}", student_id, supervisor_id);
        Ok(updated)
    }

    async fn relational_snapshot(&self) -> Result<RelationalSnapshot, PortalError> {
        let credentials: Vec<Credential> = self.store.get_collection(keys::CREDENTIALS).await?;
        let find_credential = |account: &Account| {
            credentials
                .iter()
                .find(|c| c.owner_account_id == account.id && c.role_scope == account.role)
                .cloned()
        };

        let mut snapshot = RelationalSnapshot::default();

        for student in self.get_students().await? {
            let status = self.effective_payment_status(&student.account.id).await?;
            if let Some(credential) = find_credential(&student.account) {
                snapshot.users.push(UserRow::from_account(&student.account, &credential));
            }
            snapshot.students.push(StudentRow::from_profile(&student, status));
        }

        for supervisor in self.get_supervisors().await? {
            if let Some(credential) = find_credential(&supervisor.account) {
                snapshot.users.push(UserRow::from_account(&supervisor.account, &credential));
            }
            snapshot.supervisors.push(StaffRow::from_supervisor(&supervisor));
        }

        for coordinator in self.get_coordinators().await? {
            if let Some(credential) = find_credential(&coordinator.account) {
                snapshot.users.push(UserRow::from_account(&coordinator.account, &credential));
            }
            snapshot.coordinators.push(StaffRow::from_coordinator(&coordinator));
        }

        Ok(snapshot)
    }
}
