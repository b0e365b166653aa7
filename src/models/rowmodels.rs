//! Row shapes of the hosted relational backend (`users`, `students`,
//! `supervisors`, `coordinators`). Columns are the snake_case spelling of the
//! camelCase record fields, linked to `users` through `user_id`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::usermodel::{
    Account, CoordinatorProfile, Credential, PaymentStatus, StudentProfile, SupervisorProfile,
};
#[cfg(test)]
use crate::{
    error::PortalError,
    models::usermodel::{GeoPoint, Organization, Role},
};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    /// Argon2 hash; left out of JSON exports.
    #[serde(default, skip_serializing)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct StudentRow {
    pub id: String,
    pub user_id: String,
    pub matric_number: String,
    pub department: String,
    pub payment_status: String,
    pub organization_name: Option<String>,
    pub organization_address: Option<String>,
    pub organization_state: Option<String>,
    pub organization_lga: Option<String>,
    pub organization_contact_person: Option<String>,
    pub organization_phone_number: Option<String>,
    pub organization_lat: Option<f64>,
    pub organization_lng: Option<f64>,
    pub supervisor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct StaffRow {
    pub id: String,
    pub user_id: String,
    pub department: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Default)]
pub struct RelationalSnapshot {
    pub users: Vec<UserRow>,
    pub students: Vec<StudentRow>,
    pub supervisors: Vec<StaffRow>,
    pub coordinators: Vec<StaffRow>,
}

impl UserRow {
    pub fn from_account(account: &Account, credential: &Credential) -> Self {
        UserRow {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role.to_str().to_string(),
            created_at: account.created_at,
            password: credential.secret_hash.clone(),
        }
    }
}

// Reverse mappings only back the lossless round-trip checks below; nothing
// reads rows back at runtime.
#[cfg(test)]
impl UserRow {
    /// Splits the row back into its account and credential. Students sign in
    /// with their matric number, which lives on the `students` row.
    pub fn into_account(
        self,
        student_matric: Option<&str>,
    ) -> Result<(Account, Credential), PortalError> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            PortalError::Backend(format!("unknown role `{}` on users row {}", self.role, self.id))
        })?;

        let identifier_value = match role {
            Role::Student => student_matric
                .ok_or_else(|| {
                    PortalError::Backend(format!("student {} has no students row", self.id))
                })?
                .to_string(),
            Role::Supervisor | Role::Coordinator => self.email.clone(),
        };

        let credential = Credential {
            owner_account_id: self.id.clone(),
            role_scope: role,
            identifier_value,
            secret_hash: self.password,
        };

        let account = Account {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            created_at: self.created_at,
        };

        Ok((account, credential))
    }
}

impl StudentRow {
    pub fn from_profile(profile: &StudentProfile, payment_status: PaymentStatus) -> Self {
        let org = profile.organization.as_ref();
        StudentRow {
            id: profile.account.id.clone(),
            user_id: profile.account.id.clone(),
            matric_number: profile.matric_number.clone(),
            department: profile.department.clone(),
            payment_status: payment_status.to_str().to_string(),
            organization_name: org.map(|o| o.name.clone()),
            organization_address: org.map(|o| o.address.clone()),
            organization_state: org.map(|o| o.state.clone()),
            organization_lga: org.map(|o| o.lga.clone()),
            organization_contact_person: org.map(|o| o.contact_person.clone()),
            organization_phone_number: org.map(|o| o.phone_number.clone()),
            organization_lat: org.and_then(|o| o.location.as_ref()).map(|p| p.lat),
            organization_lng: org.and_then(|o| o.location.as_ref()).map(|p| p.lng),
            supervisor_id: profile.supervisor_id.clone(),
            created_at: profile.account.created_at,
        }
    }
}

#[cfg(test)]
impl StudentRow {
    /// Rebuilds the profile. The organization is only present when every
    /// text column is filled; its location needs both coordinates.
    pub fn into_profile(self, account: Account) -> StudentProfile {
        let organization = match (
            self.organization_name,
            self.organization_address,
            self.organization_state,
            self.organization_lga,
            self.organization_contact_person,
            self.organization_phone_number,
        ) {
            (Some(name), Some(address), Some(state), Some(lga), Some(contact_person), Some(phone_number)) => {
                let location = match (self.organization_lat, self.organization_lng) {
                    (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
                    _ => None,
                };
                Some(Organization {
                    name,
                    address,
                    state,
                    lga,
                    contact_person,
                    phone_number,
                    location,
                })
            }
            _ => None,
        };

        StudentProfile {
            account,
            matric_number: self.matric_number,
            department: self.department,
            organization,
            supervisor_id: self.supervisor_id,
        }
    }
}

impl StaffRow {
    pub fn from_supervisor(profile: &SupervisorProfile) -> Self {
        StaffRow {
            id: profile.account.id.clone(),
            user_id: profile.account.id.clone(),
            department: profile.department.clone(),
            phone_number: profile.phone_number.clone(),
            created_at: profile.account.created_at,
        }
    }

    pub fn from_coordinator(profile: &CoordinatorProfile) -> Self {
        StaffRow {
            id: profile.account.id.clone(),
            user_id: profile.account.id.clone(),
            department: profile.department.clone(),
            phone_number: profile.phone_number.clone(),
            created_at: profile.account.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn student_account() -> Account {
        Account {
            id: "1".to_string(),
            name: "John Adebayo".to_string(),
            email: "john.adebayo@student.aapoly.edu.ng".to_string(),
            role: Role::Student,
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn student_account_and_credential_survive_users_row() {
        let account = student_account();
        let credential = Credential {
            owner_account_id: "1".to_string(),
            role_scope: Role::Student,
            identifier_value: "22-04-0191".to_string(),
            secret_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        };

        let row = UserRow::from_account(&account, &credential);
        assert_eq!(row.role, "student");
        assert_eq!(row.password, credential.secret_hash);

        let (back_account, back_credential) = row.into_account(Some("22-04-0191")).unwrap();
        assert_eq!(back_account, account);
        assert_eq!(back_credential, credential);
    }

    #[test]
    fn staff_credential_uses_email_identifier() {
        let row = UserRow {
            id: "sup-1".to_string(),
            name: "Dr. Oluwaseun Adeleke".to_string(),
            email: "oluwaseun.adeleke@aapoly.edu.ng".to_string(),
            role: "supervisor".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            password: "hash".to_string(),
        };

        let (account, credential) = row.clone().into_account(None).unwrap();
        assert_eq!(credential.identifier_value, row.email);
        assert_eq!(UserRow::from_account(&account, &credential), row);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let row = UserRow {
            id: "x".to_string(),
            name: "Someone".to_string(),
            email: "someone@aapoly.edu.ng".to_string(),
            role: "admin".to_string(),
            created_at: Utc::now(),
            password: "hash".to_string(),
        };
        assert!(row.into_account(None).is_err());
    }

    #[test]
    fn student_row_keeps_organization_columns() {
        let profile = StudentProfile {
            account: student_account(),
            matric_number: "22-04-0191".to_string(),
            department: "Computer Science".to_string(),
            organization: Some(Organization {
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
            }),
            supervisor_id: Some("sup-1".to_string()),
        };

        let row = StudentRow::from_profile(&profile, PaymentStatus::Paid);
        assert_eq!(row.payment_status, "paid");
        assert_eq!(row.organization_lga.as_deref(), Some("Ikeja"));
        assert_eq!(row.organization_lat, Some(6.6018));
        assert_eq!(row.organization_lng, Some(3.3515));
        assert_eq!(row.into_profile(student_account()), profile);
    }
}
