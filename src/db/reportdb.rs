// db/reportdb.rs
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;

use super::{db::DBClient, store::keys, userdb::UserExt};
use crate::{
    error::PortalError,
    models::{
        reportmodel::{ReportStatus, WeeklyReport},
        usermodel::StudentProfile,
    },
    utils::reference::new_record_id,
};

#[derive(Debug, Clone)]
pub struct NewReport {
    pub student_id: String,
    pub title: String,
    pub description: String,
    pub file_url: Option<String>,
}

#[async_trait]
pub trait ReportExt {
    async fn all_reports(&self) -> Result<Vec<WeeklyReport>, PortalError>;

    /// Week number descending, read fresh on every call.
    async fn reports_for(&self, student_id: &str) -> Result<Vec<WeeklyReport>, PortalError>;

    async fn reports_supervised_by(&self, supervisor_id: &str) -> Result<Vec<WeeklyReport>, PortalError>;

    async fn next_report_week(&self, student_id: &str) -> Result<u32, PortalError>;

    async fn save_report(&self, report: NewReport) -> Result<WeeklyReport, PortalError>;

    async fn review_report(
        &self,
        report_id: &str,
        supervisor_id: &str,
        feedback: String,
    ) -> Result<WeeklyReport, PortalError>;
}

fn next_week_in(reports: &[WeeklyReport], student_id: &str) -> u32 {
    reports
        .iter()
        .filter(|r| r.student_id == student_id)
        .map(|r| r.week_number)
        .max()
        .unwrap_or(0)
        + 1
}

#[async_trait]
impl ReportExt for DBClient {
    async fn all_reports(&self) -> Result<Vec<WeeklyReport>, PortalError> {
        Ok(self.store.get_collection(keys::REPORTS).await?)
    }

    async fn reports_for(&self, student_id: &str) -> Result<Vec<WeeklyReport>, PortalError> {
        let reports = self.all_reports().await?;
        let mut reports: Vec<WeeklyReport> = reports
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect();
        reports.sort_by(|a, b| b.week_number.cmp(&a.week_number));
        Ok(reports)
    }

    async fn reports_supervised_by(&self, supervisor_id: &str) -> Result<Vec<WeeklyReport>, PortalError> {
        let student_ids: HashSet<String> = self
            .students_supervised_by(supervisor_id)
            .await?
            .into_iter()
            .map(|s| s.account.id)
            .collect();

        let reports = self.all_reports().await?;
        let mut reports: Vec<WeeklyReport> = reports
            .into_iter()
            .filter(|r| student_ids.contains(&r.student_id))
            .collect();
        reports.sort_by(|a, b| b.submission_date.cmp(&a.submission_date));
        Ok(reports)
    }

    async fn next_report_week(&self, student_id: &str) -> Result<u32, PortalError> {
        let reports = self.all_reports().await?;
        Ok(next_week_in(&reports, student_id))
    }

    async fn save_report(&self, report: NewReport) -> Result<WeeklyReport, PortalError> {
        let saved = self
            .store
            .update_collection::<WeeklyReport, _, PortalError, _>(keys::REPORTS, |reports| {
                // Numbered under the write lock so two submissions never share a week.
                let week_number = next_week_in(reports, &report.student_id);
                let saved = WeeklyReport {
                    id: new_record_id(),
                    student_id: report.student_id,
                    week_number,
                    title: report.title.trim().to_string(),
                    description: report.description.trim().to_string(),
                    submission_date: Utc::now(),
                    status: ReportStatus::Pending,
                    feedback: None,
                    file_url: report.file_url,
                };
                reports.push(saved.clone());
                Ok(saved)
            })
            .await?;

        tracing::info!(
            "Student {} submitted report for week {}",
            saved.student_id,
            saved.week_number
        );
        Ok(saved)
    }

    async fn review_report(
        &self,
        report_id: &str,
        supervisor_id: &str,
        feedback: String,
    ) -> Result<WeeklyReport, PortalError> {
        let txn = self.store.transaction().await;

        let students: Vec<StudentProfile> = txn.get_collection(keys::STUDENTS).await?;
        let mut reports: Vec<WeeklyReport> = txn.get_collection(keys::REPORTS).await?;

        let report = reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| PortalError::NotFound("Report not found".to_string()))?;

        let assigned = students.iter().any(|s| {
            s.account.id == report.student_id && s.supervisor_id.as_deref() == Some(supervisor_id)
        });
        if !assigned {
            tracing::warn!(
                "Supervisor {} tried to review report {} of an unassigned student",
                supervisor_id,
                report_id
            );
            return Err(PortalError::Forbidden(
                "You can only review reports of students assigned to you".to_string(),
            ));
        }

        if report.status == ReportStatus::Reviewed {
            return Err(PortalError::Conflict("Report has already been reviewed".to_string()));
        }

        report.status = ReportStatus::Reviewed;
        report.feedback = Some(feedback.trim().to_string());
        let reviewed = report.clone();

        txn.put_collection(keys::REPORTS, &reports).await?;

        tracing::info!("Supervisor {} reviewed report {}", supervisor_id, report_id);
        Ok(reviewed)
    }
}
