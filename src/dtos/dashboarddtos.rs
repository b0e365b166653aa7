use serde::{Deserialize, Serialize};

use crate::{
    dtos::userdtos::{StudentViewDto, SupervisorSummaryDto},
    models::{reportmodel::WeeklyReport, usermodel::StudentProfile},
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboardDto {
    pub student: StudentViewDto,
    pub next_report_week: u32,
    pub pending_reports: usize,
    pub reviewed_reports: usize,
    pub supervisor: Option<SupervisorSummaryDto>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorDashboardDto {
    pub assigned_students: usize,
    pub pending_reports: usize,
    pub reviewed_reports: usize,
    pub recent_reports: Vec<WeeklyReport>,
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorDashboardDto {
    pub total_students: usize,
    pub total_supervisors: usize,
    pub total_organizations: usize,
    pub pending_reports: usize,
    pub reviewed_reports: usize,
    pub paid_students: usize,
    pub unpaid_students: usize,
    pub pending_manual_payments: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummaryDto {
    pub name: String,
    pub address: String,
    pub state: String,
    pub lga: String,
    pub student_count: usize,
}

impl OrganizationSummaryDto {
    /// One entry per organization name, in first-seen order.
    pub fn group(students: &[StudentProfile]) -> Vec<OrganizationSummaryDto> {
        let mut groups: Vec<OrganizationSummaryDto> = Vec::new();
        for org in students.iter().filter_map(|s| s.organization.as_ref()) {
            match groups.iter_mut().find(|g| g.name.eq_ignore_ascii_case(&org.name)) {
                Some(group) => group.student_count += 1,
                None => groups.push(OrganizationSummaryDto {
                    name: org.name.clone(),
                    address: org.address.clone(),
                    state: org.state.clone(),
                    lga: org.lga.clone(),
                    student_count: 1,
                }),
            }
        }
        groups
    }
}
