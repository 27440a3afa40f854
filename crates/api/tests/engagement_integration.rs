//! Integration tests for votes, views and change events.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    create_problem, create_test_app, create_test_pool, empty_request, parse_response_body,
    test_config, unique_marker,
};
use complaint_portal_api::{
    app::{create_router, AppState},
    services::SettingsCache,
};
use domain::models::ProblemEventKind;
use persistence::repositories::SettingRepository;
use tower::ServiceExt;

#[tokio::test]
async fn test_vote_and_view_increment_counters() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let app = create_test_app(pool).await;
    let created = create_problem(&app, &unique_marker()).await;
    let id = created["id"].as_i64().unwrap();

    for expected in 1..=2 {
        let response = app
            .clone()
            .oneshot(empty_request(
                Method::POST,
                &format!("/api/v1/problems/{}/vote", id),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_response_body(response).await;
        assert_eq!(body["votesCount"], expected);
        assert_eq!(body["viewsCount"], 0);
    }

    let response = app
        .clone()
        .oneshot(empty_request(
            Method::POST,
            &format!("/api/v1/problems/{}/view", id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["votesCount"], 2);
    assert_eq!(body["viewsCount"], 1);

    let response = app
        .oneshot(empty_request(Method::GET, &format!("/api/v1/problems/{}", id)))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["votesCount"], 2);
    assert_eq!(body["viewsCount"], 1);
}

#[tokio::test]
async fn test_vote_on_missing_problem() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let app = create_test_app(pool).await;

    let response = app
        .oneshot(empty_request(Method::POST, "/api/v1/problems/999999999/vote"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_stream_for_missing_problem() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let app = create_test_app(pool).await;

    let response = app
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/problems/999999999/events",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_writes_publish_change_events() {
    let Some(pool) = create_test_pool().await else {
        return;
    };
    let settings = SettingsCache::load(&SettingRepository::new(pool.clone()))
        .await
        .unwrap();
    let state = AppState::new(test_config(), pool, settings);
    let mut events = state.events.subscribe();
    let app = create_router(state);

    let created = create_problem(&app, &unique_marker()).await;
    let id = created["id"].as_i64().unwrap();
    let response = app
        .oneshot(empty_request(
            Method::POST,
            &format!("/api/v1/problems/{}/vote", id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let inserted = events.recv().await.unwrap();
    assert_eq!(inserted.problem_id, id);
    assert_eq!(inserted.kind, ProblemEventKind::Inserted);

    let updated = events.recv().await.unwrap();
    assert_eq!(updated.kind, ProblemEventKind::Updated);
    assert_eq!(updated.votes_count, 1);
}
