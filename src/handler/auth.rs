use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use validator::Validate;

use crate::{
    db::userdb::{NewStudent, UserExt},
    dtos::userdtos::*,
    error::{ErrorMessage, HttpError},
    models::usermodel::{home_route_for, PaymentStatus, Role, UserProfile},
    utils::password,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
        .route("/register/student", post(register_student))
        .route("/reset-password", post(reset_password))
}

pub async fn home(Extension(app_state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let current = app_state.session.current().await;
    Json(json!({
        "status": "success",
        "message": "SIWES Connect portal",
        "isAuthenticated": current.is_some(),
        "homeRoute": home_route_for(current.as_ref().map(UserProfile::role)),
    }))
}

/// Login entry point. Echoes the location the guard captured so the client
/// can offer to return there.
pub async fn login_page(Query(query): Query<LoginPageQueryDto>) -> impl IntoResponse {
    let roles: Vec<&str> = Role::ALL.iter().map(|r| r.to_str()).collect();
    Json(json!({
        "status": "success",
        "from": query.from,
        "roles": roles,
    }))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let Some(role) = body.role() else {
        tracing::debug!("Login attempt with unknown role {:?}", body.role);
        return Err(HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()));
    };
    let signed_in = app_state
        .session
        .login(body.identifier.trim(), &body.password, role)
        .await?;

    if !signed_in {
        return Err(HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()));
    }

    let user = app_state
        .session
        .current()
        .await
        .ok_or_else(|| HttpError::server_error(ErrorMessage::ServerError.to_string()))?;

    Ok(Json(UserLoginResponseDto {
        status: "success".to_string(),
        redirect_to: user.role().home_route().to_string(),
        user,
    }))
}

pub async fn logout(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.session.logout().await?;

    Ok(Json(Response {
        status: "success",
        message: "Logged out".to_string(),
    }))
}

pub async fn session(Extension(app_state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let user = app_state.session.current().await;
    Json(SessionResponseDto {
        status: "success".to_string(),
        is_authenticated: user.is_some(),
        home_route: home_route_for(user.as_ref().map(UserProfile::role)).to_string(),
        user,
    })
}

pub async fn register_student(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterStudentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let password_hash = password::hash(&body.password)
        .map_err(|e| HttpError::from_password_error(e, "password"))?;

    let profile = app_state
        .db_client
        .save_student(NewStudent {
            name: body.full_name,
            email: body.email,
            matric_number: body.matric_number,
            department: body.department,
            password_hash,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: StudentViewDto {
                profile,
                payment_status: PaymentStatus::Pending,
            },
        }),
    ))
}

pub async fn reset_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ResetPasswordDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let student = app_state
        .db_client
        .get_students()
        .await?
        .into_iter()
        .find(|s| {
            s.matric_number == body.matric_number
                && s.account.name == body.full_name.trim()
                && s.account.email.eq_ignore_ascii_case(body.email.trim())
        })
        .ok_or_else(|| HttpError::not_found("No matching student record found"))?;

    let password_hash = password::hash(&body.new_password)
        .map_err(|e| HttpError::from_password_error(e, "new_password"))?;

    app_state
        .db_client
        .update_password(&student.account.id, Role::Student, password_hash)
        .await?;

    Ok(Json(Response {
        status: "success",
        message: "Password reset successfully".to_string(),
    }))
}
