use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    error::PortalError,
    models::usermodel::{
        GeoPoint, Organization, PaymentStatus, Role, StudentProfile,
        SupervisorProfile, UserProfile,
    },
};

fn matric_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(HND)?[0-9]{2}-[0-9]{2}-[0-9]{4}$").ok())
        .as_ref()
}

/// `22-04-0191` or `HND22-04-0191`.
pub fn validate_matric_number(matric_number: &str) -> Result<(), ValidationError> {
    if matric_pattern().is_some_and(|re| re.is_match(matric_number)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("matric_format");
        err.message = Some("Matric number must look like 22-04-0191 or HND22-04-0191".into());
        Err(err)
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Matric number, surname or email is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Role tab the sign-in was made from.
    pub role: Option<String>,
}

impl LoginUserDto {
    /// `None` when the role is missing or not one the portal knows.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentDto {
    #[validate(length(min = 3, message = "Full name must be at least 3 characters"))]
    pub full_name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(custom = "validate_matric_number")]
    pub matric_number: String,

    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters"),
        length(max = 64, message = "Password must not be more than 64 characters")
    )]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    pub confirm_password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSupervisorDto {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,

    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone_number: String,

    #[validate(
        length(min = 6, message = "Password must be at least 6 characters"),
        length(max = 64, message = "Password must not be more than 64 characters")
    )]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    #[validate(custom = "validate_matric_number")]
    pub matric_number: String,

    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(
        length(min = 1, message = "New password is required."),
        length(min = 6, message = "new password must be at least 6 characters"),
        length(max = 64, message = "new password must not be more than 64 characters")
    )]
    pub new_password: String,

    #[validate(
        length(min = 1, message = "New password confirm is required."),
        must_match(other = "new_password", message = "new passwords do not match")
    )]
    pub new_password_confirm: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationDto {
    #[validate(length(min = 1, message = "Organization name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "LGA is required"))]
    pub lga: String,
    #[validate(length(min = 1, message = "Contact person is required"))]
    pub contact_person: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone_number: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl UpdateOrganizationDto {
    pub fn into_organization(self) -> Result<Organization, PortalError> {
        let location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    return Err(PortalError::Validation(
                        "Coordinates are out of range".to_string(),
                    ));
                }
                Some(GeoPoint { lat, lng })
            }
            (None, None) => None,
            _ => {
                return Err(PortalError::Validation(
                    "Latitude and longitude must be given together".to_string(),
                ))
            }
        };

        Ok(Organization {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            state: self.state.trim().to_string(),
            lga: self.lga.trim().to_string(),
            contact_person: self.contact_person.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            location,
        })
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignSupervisorDto {
    #[validate(length(min = 1, message = "Supervisor is required"))]
    pub supervisor_id: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct LoginPageQueryDto {
    pub from: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct SearchQueryDto {
    pub search: Option<String>,
}

/// Student profile with its derived payment status.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentViewDto {
    #[serde(flatten)]
    pub profile: StudentProfile,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorSummaryDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub phone_number: String,
}

impl SupervisorSummaryDto {
    pub fn from_profile(profile: &SupervisorProfile) -> Self {
        SupervisorSummaryDto {
            id: profile.account.id.clone(),
            name: profile.account.name.clone(),
            email: profile.account.email.clone(),
            department: profile.department.clone(),
            phone_number: profile.phone_number.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorListItemDto {
    #[serde(flatten)]
    pub supervisor: SupervisorSummaryDto,
    pub assigned_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginResponseDto {
    pub status: String,
    pub user: UserProfile,
    pub redirect_to: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponseDto {
    pub status: String,
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
    pub home_route: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto<T> {
    pub status: String,
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponseDto<T> {
    pub status: String,
    pub results: usize,
    pub data: Vec<T>,
}

impl<T> ListResponseDto<T> {
    pub fn new(data: Vec<T>) -> Self {
        ListResponseDto {
            status: "success".to_string(),
            results: data.len(),
            data,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}
