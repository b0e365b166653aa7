use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::{chatdb::ChatExt, paymentdb::PaymentExt, reportdb::ReportExt, userdb::UserExt},
    dtos::{
        chatdtos::{ConversationDto, SendMessageDto},
        dashboarddtos::SupervisorDashboardDto,
        reportdtos::{ReportFilterDto, ReviewReportDto, SupervisedReportDto},
        userdtos::{ListResponseDto, StudentViewDto, UserResponseDto},
    },
    error::HttpError,
    middleware::{role_check, AuthenticatedUser},
    models::{
        reportmodel::ReportStatus,
        usermodel::{Role, StudentProfile},
    },
    AppState,
};

const RECENT_REPORTS: usize = 5;

pub fn supervisor_handler() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/students", get(get_students))
        .route("/reports", get(get_reports))
        .route("/reports/:report_id/review", put(review_report))
        .route("/messages/:student_id", get(get_messages).post(send_message))
        .route_layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![Role::Supervisor])
        }))
}

/// The supervisor's student, or 403 when the student is not assigned to them.
async fn assigned_student(
    app_state: &AppState,
    supervisor_id: &str,
    student_id: &str,
) -> Result<StudentProfile, HttpError> {
    let student = app_state
        .db_client
        .get_student(student_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Student not found"))?;

    if student.supervisor_id.as_deref() != Some(supervisor_id) {
        return Err(HttpError::forbidden("This student is not assigned to you"));
    }
    Ok(student)
}

pub async fn dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let supervisor_id = auth.user.id();
    let students = app_state.db_client.students_supervised_by(supervisor_id).await?;
    let reports = app_state.db_client.reports_supervised_by(supervisor_id).await?;
    let pending_reports = reports.iter().filter(|r| r.status == ReportStatus::Pending).count();

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: SupervisorDashboardDto {
            assigned_students: students.len(),
            pending_reports,
            reviewed_reports: reports.len() - pending_reports,
            recent_reports: reports.into_iter().take(RECENT_REPORTS).collect(),
        },
    }))
}

pub async fn get_students(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let students = app_state.db_client.students_supervised_by(auth.user.id()).await?;

    let mut views = Vec::with_capacity(students.len());
    for profile in students {
        let payment_status = app_state
            .db_client
            .effective_payment_status(&profile.account.id)
            .await?;
        views.push(StudentViewDto {
            profile,
            payment_status,
        });
    }

    Ok(Json(ListResponseDto::new(views)))
}

pub async fn get_reports(
    Query(filter): Query<ReportFilterDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let supervisor_id = auth.user.id();
    let students: HashMap<String, StudentProfile> = app_state
        .db_client
        .students_supervised_by(supervisor_id)
        .await?
        .into_iter()
        .map(|s| (s.account.id.clone(), s))
        .collect();

    let reports: Vec<SupervisedReportDto> = app_state
        .db_client
        .reports_supervised_by(supervisor_id)
        .await?
        .into_iter()
        .filter_map(|report| {
            let student = students.get(&report.student_id)?;
            filter
                .matches(&report, Some(student))
                .then(|| SupervisedReportDto {
                    student_name: student.account.name.clone(),
                    matric_number: student.matric_number.clone(),
                    report,
                })
        })
        .collect();

    Ok(Json(ListResponseDto::new(reports)))
}

pub async fn review_report(
    Path(report_id): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(body): Json<ReviewReportDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let report = app_state
        .db_client
        .review_report(&report_id, auth.user.id(), body.feedback)
        .await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: report,
    }))
}

pub async fn get_messages(
    Path(student_id): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let student = assigned_student(&app_state, auth.user.id(), &student_id).await?;
    let messages = app_state
        .db_client
        .conversation_between(auth.user.id(), &student.account.id)
        .await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: ConversationDto {
            with_account_id: student.account.id,
            with_name: student.account.name,
            messages,
        },
    }))
}

pub async fn send_message(
    Path(student_id): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let message = app_state
        .db_client
        .send_message(auth.user.id(), &student_id, &body.message)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: message,
        }),
    ))
}
