use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::{
        chatdb::ChatExt,
        paymentdb::PaymentExt,
        reportdb::{NewReport, ReportExt},
        userdb::UserExt,
    },
    dtos::{
        chatdtos::{SendMessageDto, StudentConversationDto},
        dashboarddtos::StudentDashboardDto,
        paymentdtos::ManualPaymentDto,
        reportdtos::{StudentReportsDto, SubmitReportDto},
        userdtos::{StudentViewDto, SupervisorSummaryDto, UpdateOrganizationDto, UserResponseDto},
    },
    error::{ErrorMessage, HttpError},
    middleware::{role_check, AuthenticatedUser},
    models::{
        reportmodel::ReportStatus,
        usermodel::{Role, StudentProfile, SupervisorProfile},
    },
    AppState,
};

pub fn student_handler() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/reports", get(get_reports).post(submit_report))
        .route("/organization", get(get_organization).put(update_organization))
        .route("/payments", get(get_payments))
        .route("/payments/online", post(pay_online))
        .route("/payments/manual", post(pay_manual))
        .route("/messages", get(get_messages).post(send_message))
        .route_layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![Role::Student])
        }))
}

/// Fresh copy of the signed-in student's profile.
async fn current_student(
    app_state: &AppState,
    auth: &AuthenticatedUser,
) -> Result<StudentProfile, HttpError> {
    app_state
        .db_client
        .get_student(auth.user.id())
        .await?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))
}

async fn assigned_supervisor(
    app_state: &AppState,
    student: &StudentProfile,
) -> Result<Option<SupervisorProfile>, HttpError> {
    match student.supervisor_id.as_deref() {
        Some(supervisor_id) => Ok(app_state.db_client.get_supervisor(supervisor_id).await?),
        None => Ok(None),
    }
}

pub async fn dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let student = current_student(&app_state, &auth).await?;
    let student_id = student.account.id.clone();

    let reports = app_state.db_client.reports_for(&student_id).await?;
    let pending_reports = reports.iter().filter(|r| r.status == ReportStatus::Pending).count();
    let supervisor = assigned_supervisor(&app_state, &student).await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: StudentDashboardDto {
            next_report_week: app_state.db_client.next_report_week(&student_id).await?,
            pending_reports,
            reviewed_reports: reports.len() - pending_reports,
            supervisor: supervisor.as_ref().map(SupervisorSummaryDto::from_profile),
            student: StudentViewDto {
                payment_status: app_state.db_client.effective_payment_status(&student_id).await?,
                profile: student,
            },
        },
    }))
}

pub async fn get_reports(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let student_id = auth.user.id();

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: StudentReportsDto {
            next_week: app_state.db_client.next_report_week(student_id).await?,
            reports: app_state.db_client.reports_for(student_id).await?,
        },
    }))
}

pub async fn submit_report(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(body): Json<SubmitReportDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;
    let student = current_student(&app_state, &auth).await?;

    let report = app_state
        .db_client
        .save_report(NewReport {
            student_id: student.account.id,
            title: body.title,
            description: body.description,
            file_url: body.file_url,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: report,
        }),
    ))
}

pub async fn get_organization(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let student = current_student(&app_state, &auth).await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: student.organization,
    }))
}

pub async fn update_organization(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateOrganizationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;
    let organization = body.into_organization()?;

    let student = app_state
        .db_client
        .update_student_organization(auth.user.id(), organization)
        .await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: student.organization,
    }))
}

pub async fn get_payments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let summary = app_state.payments.summary(auth.user.id()).await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: summary,
    }))
}

pub async fn pay_online(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let student = current_student(&app_state, &auth).await?;

    // The settlement task is left to finish on its own.
    let pending = app_state
        .payments
        .start_online_payment(&student.account.id)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: pending.record,
        }),
    ))
}

pub async fn pay_manual(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(body): Json<ManualPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;
    let student = current_student(&app_state, &auth).await?;

    let record = app_state
        .payments
        .submit_manual_payment(&student.account.id, &body.evidence, &body.bank_reference)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: record,
        }),
    ))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let student = current_student(&app_state, &auth).await?;
    let supervisor = assigned_supervisor(&app_state, &student)
        .await?
        .ok_or_else(|| HttpError::not_found("No supervisor has been assigned to you yet"))?;

    let messages = app_state
        .db_client
        .conversation_between(&student.account.id, &supervisor.account.id)
        .await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: StudentConversationDto {
            supervisor: SupervisorSummaryDto::from_profile(&supervisor),
            messages,
        },
    }))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;
    let student = current_student(&app_state, &auth).await?;
    let supervisor_id = student
        .supervisor_id
        .ok_or_else(|| HttpError::not_found("No supervisor has been assigned to you yet"))?;

    let message = app_state
        .db_client
        .send_message(&student.account.id, &supervisor_id, &body.message)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: message,
        }),
    ))
}
