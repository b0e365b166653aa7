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
    db::{
        paymentdb::{derive_payment_status, PaymentExt},
        reportdb::ReportExt,
        userdb::{NewSupervisor, UserExt},
    },
    dtos::{
        dashboarddtos::{CoordinatorDashboardDto, OrganizationSummaryDto},
        paymentdtos::{PaymentListItemDto, PaymentQueryDto},
        userdtos::{
            AddSupervisorDto, AssignSupervisorDto, ListResponseDto, SearchQueryDto,
            StudentViewDto, SupervisorListItemDto, SupervisorSummaryDto, UserResponseDto,
        },
    },
    error::HttpError,
    middleware::role_check,
    models::{
        paymentmodels::{PaymentMethod, PaymentRecordStatus},
        reportmodel::ReportStatus,
        usermodel::{PaymentStatus, Role, StudentProfile},
    },
    utils::password,
    AppState,
};

pub fn coordinator_handler() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/students", get(get_students))
        .route("/students/:student_id/supervisor", put(assign_supervisor))
        .route("/organizations", get(get_organizations))
        .route("/supervisors", get(get_supervisors).post(add_supervisor))
        .route("/payments", get(get_payments))
        .route("/payments/:payment_id/confirm", put(confirm_payment))
        .route("/payments/:payment_id/reject", put(reject_payment))
        .route("/export", get(export_records))
        .route_layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![Role::Coordinator])
        }))
}

fn matches_search(student: &StudentProfile, term: &str) -> bool {
    student.account.name.to_lowercase().contains(term)
        || student.matric_number.to_lowercase().contains(term)
        || student
            .organization
            .as_ref()
            .is_some_and(|o| o.name.to_lowercase().contains(term))
}

pub async fn dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;
    let students = db.get_students().await?;
    let payments = db.all_payments().await?;
    let reports = db.all_reports().await?;

    let paid_students = students
        .iter()
        .filter(|s| derive_payment_status(&s.account.id, &payments) == PaymentStatus::Paid)
        .count();
    let pending_reports = reports.iter().filter(|r| r.status == ReportStatus::Pending).count();

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: CoordinatorDashboardDto {
            total_students: students.len(),
            total_supervisors: db.get_supervisors().await?.len(),
            total_organizations: OrganizationSummaryDto::group(&students).len(),
            pending_reports,
            reviewed_reports: reports.len() - pending_reports,
            paid_students,
            unpaid_students: students.len() - paid_students,
            pending_manual_payments: payments
                .iter()
                .filter(|p| {
                    p.payment_method == PaymentMethod::Manual
                        && p.status == PaymentRecordStatus::Pending
                })
                .count(),
        },
    }))
}

pub async fn get_students(
    Query(query): Query<SearchQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let term = query
        .search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let payments = app_state.db_client.all_payments().await?;

    let students: Vec<StudentViewDto> = app_state
        .db_client
        .get_students()
        .await?
        .into_iter()
        .filter(|s| term.as_deref().map_or(true, |t| matches_search(s, t)))
        .map(|profile| StudentViewDto {
            payment_status: derive_payment_status(&profile.account.id, &payments),
            profile,
        })
        .collect();

    Ok(Json(ListResponseDto::new(students)))
}

pub async fn assign_supervisor(
    Path(student_id): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<AssignSupervisorDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let student = app_state
        .db_client
        .assign_supervisor(&student_id, &body.supervisor_id)
        .await?;
    let payment_status = app_state
        .db_client
        .effective_payment_status(&student.account.id)
        .await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: StudentViewDto {
            profile: student,
            payment_status,
        },
    }))
}

pub async fn get_organizations(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let students = app_state.db_client.get_students().await?;
    Ok(Json(ListResponseDto::new(OrganizationSummaryDto::group(&students))))
}

pub async fn get_supervisors(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let supervisors: Vec<SupervisorListItemDto> = app_state
        .db_client
        .get_supervisors()
        .await?
        .iter()
        .map(|s| SupervisorListItemDto {
            supervisor: SupervisorSummaryDto::from_profile(s),
            assigned_count: s.assigned_students.len(),
        })
        .collect();

    Ok(Json(ListResponseDto::new(supervisors)))
}

pub async fn add_supervisor(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<AddSupervisorDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let password_hash = password::hash(&body.password)
        .map_err(|e| HttpError::from_password_error(e, "password"))?;

    let supervisor = app_state
        .db_client
        .save_supervisor(NewSupervisor {
            name: body.name,
            email: body.email,
            department: body.department,
            phone_number: body.phone_number,
            password_hash,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: SupervisorSummaryDto::from_profile(&supervisor),
        }),
    ))
}

pub async fn get_payments(
    Query(query): Query<PaymentQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let students: HashMap<String, StudentProfile> = app_state
        .db_client
        .get_students()
        .await?
        .into_iter()
        .map(|s| (s.account.id.clone(), s))
        .collect();

    let mut payments = app_state.db_client.all_payments().await?;
    payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));

    let payments: Vec<PaymentListItemDto> = payments
        .into_iter()
        .filter(|p| query.status.map_or(true, |status| p.status == status))
        .filter(|p| query.method.map_or(true, |method| p.payment_method == method))
        .map(|payment| {
            let student = students.get(&payment.student_id);
            PaymentListItemDto {
                student_name: student.map(|s| s.account.name.clone()).unwrap_or_default(),
                matric_number: student.map(|s| s.matric_number.clone()).unwrap_or_default(),
                payment,
            }
        })
        .collect();

    Ok(Json(ListResponseDto::new(payments)))
}

pub async fn confirm_payment(
    Path(payment_id): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state.payments.confirm_manual_payment(&payment_id).await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: payment,
    }))
}

pub async fn reject_payment(
    Path(payment_id): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state.payments.reject_manual_payment(&payment_id).await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: payment,
    }))
}

/// Every account in the relational row layout.
pub async fn export_records(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let snapshot = app_state.db_client.relational_snapshot().await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: snapshot,
    }))
}
