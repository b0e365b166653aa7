use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    reportmodel::{ReportStatus, WeeklyReport},
    usermodel::StudentProfile,
};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportDto {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "File reference cannot be empty"))]
    pub file_url: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ReviewReportDto {
    #[validate(length(min = 1, message = "Feedback is required"))]
    pub feedback: String,
}

/// Query filters for the supervisor's report list.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilterDto {
    pub student_id: Option<String>,
    pub status: Option<ReportStatus>,
    pub week: Option<u32>,
    pub search: Option<String>,
}

impl ReportFilterDto {
    pub fn matches(&self, report: &WeeklyReport, student: Option<&StudentProfile>) -> bool {
        if self.student_id.as_deref().is_some_and(|id| id != report.student_id) {
            return false;
        }
        if self.status.is_some_and(|status| status != report.status) {
            return false;
        }
        if self.week.is_some_and(|week| week != report.week_number) {
            return false;
        }

        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                report.title.to_lowercase().contains(&term)
                    || student.is_some_and(|s| {
                        s.account.name.to_lowercase().contains(&term)
                            || s.matric_number.to_lowercase().contains(&term)
                    })
            }
        }
    }
}

/// Report joined with the student who wrote it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupervisedReportDto {
    #[serde(flatten)]
    pub report: WeeklyReport,
    pub student_name: String,
    pub matric_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportsDto {
    pub next_week: u32,
    pub reports: Vec<WeeklyReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::seed::{fixture_reports, fixture_students};

    #[test]
    fn filters_combine() {
        let reports = fixture_reports();
        let students = fixture_students();
        let john = Some(&students[0]);

        let all = ReportFilterDto::default();
        assert!(reports.iter().all(|r| all.matches(r, john)));

        let pending = ReportFilterDto {
            status: Some(ReportStatus::Pending),
            ..Default::default()
        };
        let hits: Vec<&str> = reports
            .iter()
            .filter(|r| pending.matches(r, john))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(hits, vec!["rep-2"]);

        let week_one_other_student = ReportFilterDto {
            student_id: Some("2".to_string()),
            week: Some(1),
            ..Default::default()
        };
        assert!(!reports.iter().any(|r| week_one_other_student.matches(r, john)));
    }

    #[test]
    fn search_covers_title_name_and_matric() {
        let report = fixture_reports().remove(1);
        let students = fixture_students();
        let john = Some(&students[0]);

        for term in ["FRONTEND", "adebayo", "0191", "  react  "] {
            let filter = ReportFilterDto {
                search: Some(term.to_string()),
                ..Default::default()
            };
            let expected = term.trim() != "react";
            assert_eq!(filter.matches(&report, john), expected, "term {:?}", term);
        }
    }
}
