use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Supervisor,
    Coordinator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Supervisor, Role::Coordinator];

    pub fn to_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Supervisor => "supervisor",
            Role::Coordinator => "coordinator",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.to_str() == value)
    }

    /// Canonical landing route for the role.
    pub fn home_route(&self) -> &'static str {
        match self {
            Role::Student => "/student/dashboard",
            Role::Supervisor => "/supervisor/dashboard",
            Role::Coordinator => "/coordinator/dashboard",
        }
    }
}

pub const PUBLIC_HOME_ROUTE: &str = "/";

/// Home route for a role that may not be recognised.
pub fn home_route_for(role: Option<Role>) -> &'static str {
    role.map(|r| r.home_route()).unwrap_or(PUBLIC_HOME_ROUTE)
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Last whitespace-delimited token of the display name, lowercased.
    pub fn surname(&self) -> Option<String> {
        self.name.split_whitespace().last().map(|s| s.to_lowercase())
    }
}

/// Authentication secret for one account. Identifier values are unique per role scope.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub owner_account_id: String,
    pub role_scope: Role,
    /// Matric number for students, email for staff.
    pub identifier_value: String,
    /// Argon2 PHC string.
    pub secret_hash: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub name: String,
    pub address: String,
    pub state: String,
    pub lga: String,
    pub contact_person: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(flatten)]
    pub account: Account,
    pub matric_number: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorProfile {
    #[serde(flatten)]
    pub account: Account,
    pub department: String,
    pub phone_number: String,
    #[serde(default)]
    pub assigned_students: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorProfile {
    #[serde(flatten)]
    pub account: Account,
    pub department: String,
    pub phone_number: String,
}

/// Profile-joined account, as handed out by the credential resolver.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UserProfile {
    Student(StudentProfile),
    Supervisor(SupervisorProfile),
    Coordinator(CoordinatorProfile),
}

impl UserProfile {
    pub fn account(&self) -> &Account {
        match self {
            UserProfile::Student(p) => &p.account,
            UserProfile::Supervisor(p) => &p.account,
            UserProfile::Coordinator(p) => &p.account,
        }
    }

    pub fn id(&self) -> &str {
        &self.account().id
    }

    pub fn role(&self) -> Role {
        match self {
            UserProfile::Student(_) => Role::Student,
            UserProfile::Supervisor(_) => Role::Supervisor,
            UserProfile::Coordinator(_) => Role::Coordinator,
        }
    }
}
