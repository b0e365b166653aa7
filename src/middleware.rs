use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};

use crate::{
    models::usermodel::{Role, UserProfile},
    service::access_guard::{decide, login_location, GuardDecision, RouteRequirement},
    AppState,
};

/// Signed-in profile handed to guarded handlers.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: UserProfile,
}

/// Runs the access guard for a route admitting `allowed_roles` (empty admits
/// any signed-in role).
pub async fn role_check(
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
    allowed_roles: Vec<Role>,
) -> Response {
    // Nested routers strip their prefix from `req.uri()`.
    let requested = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.clone())
        .unwrap_or_else(|| req.uri().clone());
    let requested = requested
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| requested.path().to_string());

    let session = app_state.session.current().await;
    let requirement = RouteRequirement::roles(allowed_roles);

    match decide(session.as_ref(), &requirement, &requested) {
        GuardDecision::Render => {
            if let Some(user) = session {
                req.extensions_mut().insert(AuthenticatedUser { user });
            }
            next.run(req).await
        }
        GuardDecision::RedirectToLogin { from } => {
            tracing::debug!("Guard: {} requires sign-in", from);
            Redirect::to(&login_location(&from)).into_response()
        }
        GuardDecision::RedirectToHome { home } => {
            tracing::debug!("Guard: {} not allowed here, sending to {}", requested, home);
            Redirect::to(home).into_response()
        }
    }
}
