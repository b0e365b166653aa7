// routes.rs
use std::sync::Arc;

use axum::{routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        account::account_handler,
        auth::{auth_handler, home, login_page},
        coordinator::coordinator_handler,
        student::student_handler,
        supervisor::supervisor_handler,
    },
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new().nest("/auth", auth_handler());

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(home))
        .route("/login", get(login_page))
        .nest("/api", api_route)
        .nest("/student", student_handler())
        .nest("/supervisor", supervisor_handler())
        .nest("/coordinator", coordinator_handler())
        .nest("/account", account_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, db::testutil::seeded_client};

    async fn app() -> Router {
        let config = Config {
            payment_delay: Duration::from_millis(10),
            ..Config::default()
        };
        let state = AppState::new(seeded_client().await, config);
        create_router(Arc::new(state))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn login(app: &Router, identifier: &str, password: &str, role: &str) -> Response {
        send(
            app,
            Method::POST,
            "/api/auth/login",
            Some(json!({ "identifier": identifier, "password": password, "role": role })),
        )
        .await
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app().await;
        let response = send(&app, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_request_redirects_to_login_with_origin() {
        let app = app().await;
        let response = send(&app, Method::GET, "/supervisor/reports?week=2", None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/login?from=%2Fsupervisor%2Freports%3Fweek%3D2"
        );

        let page = send(&app, Method::GET, "/login?from=%2Fsupervisor%2Freports", None).await;
        assert_eq!(json_body(page).await["from"], "/supervisor/reports");
    }

    #[tokio::test]
    async fn wrong_password_gets_generic_message() {
        let app = app().await;
        let response = login(&app, "22-04-0191", "nope", "student").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Invalid credentials. Please try again.");

        let session = json_body(send(&app, Method::GET, "/api/auth/session", None).await).await;
        assert_eq!(session["isAuthenticated"], false);
        assert_eq!(session["homeRoute"], "/");
    }

    #[tokio::test]
    async fn unknown_or_missing_role_is_refused() {
        let app = app().await;
        let response = login(&app, "adebayo", "adebayo", "supervisr").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await["message"],
            "Invalid credentials. Please try again."
        );

        let response = send(
            &app,
            Method::POST,
            "/api/auth/login",
            Some(json!({ "identifier": "adebayo", "password": "adebayo" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let session = json_body(send(&app, Method::GET, "/api/auth/session", None).await).await;
        assert_eq!(session["isAuthenticated"], false);
    }

    #[tokio::test]
    async fn overlong_password_is_a_field_error() {
        let app = app().await;
        let long = "p".repeat(65);
        let response = send(
            &app,
            Method::POST,
            "/api/auth/register/student",
            Some(json!({
                "fullName": "Grace Eze",
                "email": "grace.eze@student.aapoly.edu.ng",
                "matricNumber": "HND23-01-0042",
                "department": "Statistics",
                "password": long.clone(),
                "confirmPassword": long
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["field"], "password");
    }

    #[tokio::test]
    async fn student_login_opens_student_routes_only() {
        let app = app().await;
        let response = login(&app, "adebayo", "adebayo", "student").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["redirectTo"], "/student/dashboard");

        let denied = send(&app, Method::GET, "/coordinator/dashboard", None).await;
        assert_eq!(denied.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&denied), "/student/dashboard");

        let dashboard = send(&app, Method::GET, "/student/dashboard", None).await;
        assert_eq!(dashboard.status(), StatusCode::OK);
        let body = json_body(dashboard).await;
        assert_eq!(body["data"]["student"]["paymentStatus"], "paid");
        assert_eq!(body["data"]["nextReportWeek"], 3);
        assert_eq!(body["data"]["supervisor"]["id"], "sup-1");

        let profile = send(&app, Method::GET, "/account/profile", None).await;
        assert_eq!(profile.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_closes_guarded_routes() {
        let app = app().await;
        login(&app, "funmilayo.adeyemi@aapoly.edu.ng", "coordinator123", "coordinator").await;
        assert_eq!(
            send(&app, Method::GET, "/coordinator/students", None).await.status(),
            StatusCode::OK
        );

        let response = send(&app, Method::POST, "/api/auth/logout", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, Method::GET, "/account/profile", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?from=%2Faccount%2Fprofile");
    }

    #[tokio::test]
    async fn registration_reports_duplicate_field() {
        let app = app().await;
        let response = send(
            &app,
            Method::POST,
            "/api/auth/register/student",
            Some(json!({
                "fullName": "Grace Eze",
                "email": "grace.eze@student.aapoly.edu.ng",
                "matricNumber": "22-04-0191",
                "department": "Statistics",
                "password": "secret1",
                "confirmPassword": "secret1"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["field"], "matricNumber");

        let response = send(
            &app,
            Method::POST,
            "/api/auth/register/student",
            Some(json!({
                "fullName": "Grace Eze",
                "email": "grace.eze@student.aapoly.edu.ng",
                "matricNumber": "HND23-01-0042",
                "department": "Statistics",
                "password": "secret1",
                "confirmPassword": "secret1"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = login(&app, "eze", "secret1", "student").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reset_password_then_sign_in() {
        let app = app().await;
        let response = send(
            &app,
            Method::POST,
            "/api/auth/reset-password",
            Some(json!({
                "matricNumber": "22-04-0193",
                "fullName": "Mohammed Ibrahim",
                "email": "mohammed.ibrahim@student.aapoly.edu.ng",
                "newPassword": "fresh-pass",
                "newPasswordConfirm": "fresh-pass"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            login(&app, "22-04-0193", "ibrahim", "student").await.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            login(&app, "22-04-0193", "fresh-pass", "student").await.status(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn supervisor_reviews_and_chats() {
        let app = app().await;
        login(&app, "oluwaseun.adeleke@aapoly.edu.ng", "supervisor123", "supervisor").await;

        let reports = json_body(send(&app, Method::GET, "/supervisor/reports?status=pending", None).await).await;
        assert_eq!(reports["results"], 1);
        assert_eq!(reports["data"][0]["studentName"], "John Adebayo");

        let review = send(
            &app,
            Method::PUT,
            "/supervisor/reports/rep-2/review",
            Some(json!({ "feedback": "Well done." })),
        )
        .await;
        assert_eq!(review.status(), StatusCode::OK);

        let again = send(
            &app,
            Method::PUT,
            "/supervisor/reports/rep-2/review",
            Some(json!({ "feedback": "Again." })),
        )
        .await;
        assert_eq!(again.status(), StatusCode::CONFLICT);

        let sent = send(
            &app,
            Method::POST,
            "/supervisor/messages/1",
            Some(json!({ "message": "Keep it up." })),
        )
        .await;
        assert_eq!(sent.status(), StatusCode::CREATED);

        let conversation = json_body(send(&app, Method::GET, "/supervisor/messages/1", None).await).await;
        assert_eq!(conversation["data"]["messages"].as_array().map(Vec::len), Some(3));

        let foreign = send(&app, Method::GET, "/supervisor/messages/3", None).await;
        assert_eq!(foreign.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn online_payment_is_accepted_then_settles() {
        let app = app().await;
        login(&app, "ibrahim", "ibrahim", "student").await;

        let started = send(&app, Method::POST, "/student/payments/online", None).await;
        assert_eq!(started.status(), StatusCode::ACCEPTED);

        let duplicate = send(&app, Method::POST, "/student/payments/online", None).await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let mut status = Value::Null;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let summary = json_body(send(&app, Method::GET, "/student/payments", None).await).await;
            status = summary["data"]["paymentStatus"].clone();
            if status == "paid" {
                break;
            }
        }
        assert_eq!(status, "paid");
    }
}
