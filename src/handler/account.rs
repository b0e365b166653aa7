use std::sync::Arc;

use axum::{middleware, response::IntoResponse, routing::get, Extension, Json, Router};
use serde_json::json;

use crate::{
    db::{paymentdb::PaymentExt, userdb::UserExt},
    error::{ErrorMessage, HttpError},
    middleware::{role_check, AuthenticatedUser},
    models::usermodel::UserProfile,
    AppState,
};

pub fn account_handler() -> Router {
    Router::new()
        .route("/profile", get(get_profile))
        .route_layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![])
        }))
}

pub async fn get_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .db_client
        .get_profile(auth.user.id())
        .await?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    let payment_status = match &profile {
        UserProfile::Student(student) => Some(
            app_state
                .db_client
                .effective_payment_status(&student.account.id)
                .await?,
        ),
        _ => None,
    };

    Ok(Json(json!({
        "status": "success",
        "data": {
            "user": profile,
            "role": profile.role(),
            "homeRoute": profile.role().home_route(),
            "paymentStatus": payment_status,
        }
    })))
}
