use std::sync::Arc;

use axum::{
    extract::Path,
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use validator::Validate;

use crate::{
    dtos::referraldtos::{RecordReferralDto, RecordReferralResponseDto, ReferralResponseDto},
    error::{ErrorMessage, HttpError},
    service::{
        background_jobs::spawn_leaderboard_check,
        referral::{normalize_referrer, referral_cookie_name},
    },
    utils::timestamp::parse_event_time,
    AppState,
};

pub fn referrals_handler() -> Router {
    Router::new()
        .route("/", post(record_referral))
        .route("/:referrer", get(get_referral))
}

pub async fn record_referral(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    Json(body): Json<RecordReferralDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let referrer = normalize_referrer(&body.referrer)
        .ok_or_else(|| HttpError::bad_request(ErrorMessage::EmptyReferrer.to_string()))?;

    // Per-device guard only; the store itself accepts every event
    let cookie_name = referral_cookie_name(&referrer);
    if cookie_jar.get(&cookie_name).is_some() {
        tracing::info!("Referral for {} already logged from this device", referrer);
        return Ok((
            HeaderMap::new(),
            Json(RecordReferralResponseDto {
                status: "skipped".to_string(),
                message: "Referral already logged from this device".to_string(),
                data: None,
            }),
        ));
    }

    let event_time = match body.event_time.as_deref() {
        Some(raw) => parse_event_time(raw)
            .ok_or_else(|| HttpError::bad_request(ErrorMessage::InvalidEventTime.to_string()))?,
        None => Utc::now(),
    };

    let outcome = app_state.referral_service
        .record(&referrer, event_time)
        .await?;

    spawn_leaderboard_check(app_state.leaderboard_service.clone());

    let cookie_duration = time::Duration::days(app_state.env.referral_cookie_max_age_days);
    // Sent back on cross-site requests too, which browsers only allow over https
    let cookie = Cookie::build((cookie_name, "true"))
        .path("/")
        .max_age(cookie_duration)
        .http_only(true)
        .same_site(SameSite::None)
        .secure(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie.to_string().parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );

    Ok((
        headers,
        Json(RecordReferralResponseDto {
            status: "success".to_string(),
            message: format!("Referral logged for {}", outcome.referrer),
            data: Some(outcome),
        }),
    ))
}

pub async fn get_referral(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(referrer): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let record = app_state.referral_service
        .get_referral(&referrer)
        .await?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ReferralNotFound.to_string()))?;

    Ok(Json(ReferralResponseDto {
        status: "success".to_string(),
        data: record,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        db::referraldb::ReferralExt,
        routes::create_router,
        test_utils::{memory_state, test_config, RecordingNotifier, UnreachableStore},
    };

    fn post_referral(body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/referrals")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_record_sets_device_flag() {
        let (app_state, store, _) = memory_state();
        let app = create_router(app_state);

        let response = app
            .clone()
            .oneshot(post_referral(json!({ "referrer": "Alice", "event_time": "2024-03-01" }), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
        assert!(set_cookie.starts_with(&format!("{}=true", referral_cookie_name("alice"))));
        // Cross-site callers only keep and resend the flag with these attributes
        assert!(set_cookie.contains("SameSite=None"));
        assert!(set_cookie.contains("Secure"));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Max-Age="));

        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["referrer"], "alice");
        assert_eq!(body["data"]["total"], 1);

        let record = store.get_referral("alice").await.unwrap().unwrap();
        assert_eq!(record.history, vec!["2024-03-01T00:00:00.000Z"]);
    }

    #[tokio::test]
    async fn test_flagged_device_is_not_recorded_again() {
        let (app_state, store, _) = memory_state();
        let app = create_router(app_state);

        let response = app
            .oneshot(post_referral(
                json!({ "referrer": "ALICE" }),
                Some(&format!("{}=true", referral_cookie_name("alice"))),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["status"], "skipped");
        assert!(body.get("data").is_none());
        assert_eq!(store.get_referral("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flag_for_one_referrer_does_not_skip_a_similar_one() {
        let (app_state, store, _) = memory_state();
        let app = create_router(app_state);

        let response = app
            .clone()
            .oneshot(post_referral(json!({ "referrer": "mary.jane" }), None))
            .await
            .unwrap();
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
        let flag = set_cookie.split(';').next().unwrap().to_string();

        // Same device, a referrer differing only in punctuation
        let response = app
            .oneshot(post_referral(json!({ "referrer": "mary_jane" }), Some(&flag)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "success");

        assert_eq!(store.get_referral("mary.jane").await.unwrap().unwrap().total, 1);
        assert_eq!(store.get_referral("mary_jane").await.unwrap().unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_other_devices_keep_counting() {
        let (app_state, store, _) = memory_state();
        let app = create_router(app_state);

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(post_referral(json!({ "referrer": "bob" }), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(store.get_referral("bob").await.unwrap().unwrap().total, 3);
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected() {
        let (app_state, store, _) = memory_state();
        let app = create_router(app_state);

        for body in [
            json!({ "referrer": "" }),
            json!({ "referrer": "   " }),
            json!({ "referrer": "alice", "event_time": "yesterday" }),
        ] {
            let response = app.clone().oneshot(post_referral(body, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        assert!(store.get_referrals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_returns_generic_error() {
        let app_state = Arc::new(AppState::new(
            Arc::new(UnreachableStore),
            Arc::new(RecordingNotifier::default()),
            test_config(),
        ));
        let app = create_router(app_state);

        let response = app
            .oneshot(post_referral(json!({ "referrer": "alice" }), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], ErrorMessage::ServerError.to_string());
    }

    #[tokio::test]
    async fn test_get_referral() {
        let (app_state, store, _) = memory_state();
        let app = create_router(app_state);

        let missing = Request::builder().uri("/api/referrals/alice").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(missing).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        store.record_referral("alice", "2024-03-01T00:00:00.000Z").await.unwrap();
        store.record_referral("alice", "2024-03-02T00:00:00.000Z").await.unwrap();

        let request = Request::builder().uri("/api/referrals/ALICE").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["data"]["id"], "alice");
        assert_eq!(body["data"]["total"], 2);
        assert_eq!(body["data"]["history"].as_array().unwrap().len(), 2);
    }
}
