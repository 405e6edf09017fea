//! Router, sessions, and auth redirects.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tower::ServiceExt;

use carelink_admin::db::{Collection, DocumentStore, MessageRepository, Query};
use carelink_admin::services::{AuthService, Registration};
use carelink_core::{RequestStatus, UserRole};
use carelink_integration_tests::{SNAPSHOT_TIMEOUT, TestContext};

const ADMIN_EMAIL: &str = "dana@example.org";
const PASSWORD: &str = "hunter22";

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

async fn register(ctx: &TestContext, email: &str, role: UserRole) {
    AuthService::new(ctx.store())
        .register(&Registration {
            email,
            name: Some("Dana Reyes"),
            password: PASSWORD,
            confirm_password: PASSWORD,
            role,
        })
        .await
        .unwrap();
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "email={}&password={password}",
            email.replace('@', "%40")
        )))
        .unwrap()
}

/// Sign in and return the session cookie.
async fn sign_in(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(login_request(ADMIN_EMAIL, PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, cookie: &str, body: String) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new();
    let response = ctx
        .app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_pages_redirect_to_login_without_session() {
    let ctx = TestContext::new();

    for uri in ["/", "/requests", "/volunteers/pending", "/chat"] {
        let response = ctx
            .app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/login", "{uri}");
    }
}

#[tokio::test]
async fn test_live_feed_is_unauthorized_without_session() {
    let ctx = TestContext::new();
    let response = ctx
        .app()
        .oneshot(
            Request::get("/api/live/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let ctx = TestContext::new();
    register(&ctx, ADMIN_EMAIL, UserRole::Admin).await;

    let response = ctx
        .app()
        .oneshot(login_request(ADMIN_EMAIL, "not-the-password"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_cannot_sign_in() {
    let ctx = TestContext::new();
    register(&ctx, "helper@example.org", UserRole::User).await;

    let response = ctx
        .app()
        .oneshot(login_request("helper@example.org", PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_signed_in_admin_sees_dashboard() {
    let ctx = TestContext::new();
    register(&ctx, ADMIN_EMAIL, UserRole::Admin).await;
    let app = ctx.app();
    let cookie = sign_in(&app).await;

    let response = app.clone().oneshot(get("/", &cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Dana Reyes"));

    let response = app
        .oneshot(
            Request::post("/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_assign_through_the_detail_page() {
    let ctx = TestContext::new();
    register(&ctx, ADMIN_EMAIL, UserRole::Admin).await;
    let request_id = ctx.add_request("Ana Ruiz").await;
    let volunteer_id = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;
    ctx.requests_where(|rs| rs.len() == 1).await;
    ctx.volunteers_where(|vs| vs.len() == 1).await;

    let app = ctx.app();
    let cookie = sign_in(&app).await;

    let detail = app
        .clone()
        .oneshot(get(&format!("/requests/{request_id}"), &cookie))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    assert!(body_text(detail).await.contains("Kim Lee"));

    let response = app
        .clone()
        .oneshot(post_form(
            &format!("/requests/{request_id}/assign"),
            &cookie,
            format!("volunteer_id={volunteer_id}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/requests/{request_id}"));

    let requests = ctx
        .requests_where(|rs| rs.iter().any(|r| r.status == RequestStatus::Assigned))
        .await;
    assert!(requests.iter().all(|r| r.has_volunteer(&volunteer_id)));

    // The flash notice shows once on the next page.
    let page = app
        .oneshot(get(&format!("/requests/{request_id}"), &cookie))
        .await
        .unwrap();
    assert!(body_text(page).await.contains("Kim Lee assigned to Ana Ruiz"));
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let ctx = TestContext::new();
    register(&ctx, ADMIN_EMAIL, UserRole::Admin).await;
    let app = ctx.app();
    let cookie = sign_in(&app).await;

    let response = app
        .oneshot(get("/requests/does-not-exist", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_write_on_garbled_id_falls_back_to_listing() {
    let ctx = TestContext::new();
    register(&ctx, ADMIN_EMAIL, UserRole::Admin).await;
    let app = ctx.app();
    let cookie = sign_in(&app).await;

    for action in ["status", "assign"] {
        let body = if action == "status" {
            "status=Completed".to_string()
        } else {
            "volunteer_id=nobody".to_string()
        };
        let response = app
            .clone()
            .oneshot(post_form(&format!("/requests/x%0Ay/{action}"), &cookie, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{action}");
        assert_eq!(location(&response), "/requests", "{action}");
    }
}

#[tokio::test]
async fn test_blank_message_is_refused() {
    let ctx = TestContext::new();
    register(&ctx, ADMIN_EMAIL, UserRole::Admin).await;
    let volunteer_id = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;
    ctx.volunteers_where(|vs| vs.len() == 1).await;
    let app = ctx.app();
    let cookie = sign_in(&app).await;

    let response = app
        .clone()
        .oneshot(post_form(
            &format!("/chat/{volunteer_id}/messages"),
            &cookie,
            "body=%20%20".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let thread = location(&response).to_string();
    assert_eq!(thread, format!("/chat?volunteer={volunteer_id}"));

    let page = app.oneshot(get(&thread, &cookie)).await.unwrap();
    assert!(body_text(page).await.contains("Message cannot be empty"));

    let messages = ctx
        .store()
        .fetch(&Query::all(Collection::Messages))
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_message_is_signed_with_admin_name() {
    let ctx = TestContext::new();
    register(&ctx, ADMIN_EMAIL, UserRole::Admin).await;
    let volunteer_id = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;
    ctx.volunteers_where(|vs| vs.len() == 1).await;
    let app = ctx.app();
    let cookie = sign_in(&app).await;

    let response = app
        .clone()
        .oneshot(post_form(
            &format!("/chat/{volunteer_id}/messages"),
            &cookie,
            "body=Can+you+take+Tuesday%3F".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let thread = MessageRepository::new(ctx.store())
        .thread(&volunteer_id)
        .await
        .unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].name, "Dana Reyes");
    assert_eq!(thread[0].details, "Can you take Tuesday?");
}

/// Read SSE frames until the next `summary` event and return its payload.
async fn next_summary<S>(frames: &mut S, buffer: &mut String) -> Value
where
    S: Stream<Item = Result<Bytes, axum::Error>> + Unpin,
{
    loop {
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            let mut is_summary = false;
            let mut data = None;
            for line in frame.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    is_summary = name.trim() == "summary";
                } else if let Some(payload) = line.strip_prefix("data:") {
                    data = Some(payload.trim_start().to_string());
                }
            }
            if let (true, Some(data)) = (is_summary, data) {
                return serde_json::from_str(&data).unwrap();
            }
        }

        let chunk = tokio::time::timeout(SNAPSHOT_TIMEOUT, frames.next())
            .await
            .expect("no summary event in time")
            .expect("summary stream ended")
            .unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
}

#[tokio::test]
async fn test_live_feed_pushes_new_summary_on_snapshot() {
    let ctx = TestContext::new();
    register(&ctx, ADMIN_EMAIL, UserRole::Admin).await;
    ctx.add_request("Ana Ruiz").await;
    ctx.requests_where(|rs| rs.len() == 1).await;
    ctx.volunteers_where(|_| true).await;
    let app = ctx.app();
    let cookie = sign_in(&app).await;

    let response = app
        .oneshot(get("/api/live/summary", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let mut frames = Box::pin(response.into_body().into_data_stream());
    let mut buffer = String::new();

    let first = next_summary(&mut frames, &mut buffer).await;
    assert_eq!(first["pending_requests"], 1);

    ctx.add_request("Ben Ortiz").await;
    let second = next_summary(&mut frames, &mut buffer).await;
    assert_eq!(second["pending_requests"], 2);
}
