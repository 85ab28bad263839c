//! Integration tests per gli endpoints delle sessioni di studio
//!
//! Test per:
//! - GET/POST /api/study-sessions
//! - GET/PUT/DELETE /api/study-sessions/{id}
//! - POST /api/study-sessions/{id}/end
//! - GET /api/study-sessions/stats

mod common;

#[cfg(test)]
mod study_session_tests {
    use super::common::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::{DateTime, Duration, Utc};
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    async fn log_session(
        server: &TestServer,
        course_id: Option<i64>,
        started_at: DateTime<Utc>,
        minutes: i64,
    ) -> Value {
        let response = server
            .post("/api/study-sessions")
            .authorization_bearer(alice_token())
            .json(&json!({
                "course_id": course_id,
                "started_at": started_at,
                "ended_at": started_at + Duration::minutes(minutes),
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    // ============================================================
    // Test per POST /api/study-sessions, POST /api/study-sessions/{id}/end
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_live_session_lifecycle(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let token = alice_token();

        let response = server
            .post("/api/study-sessions")
            .authorization_bearer(&token)
            .json(&json!({"course_id": 1}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let session: Value = response.json();
        assert!(session["ended_at"].is_null());
        assert!(session["duration_secs"].is_null());
        let id = session["id"].as_i64().unwrap();

        server
            .post("/api/study-sessions")
            .authorization_bearer(&token)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CONFLICT);

        let ended: Value = server
            .post(&format!("/api/study-sessions/{id}/end"))
            .authorization_bearer(&token)
            .json(&json!({"notes": "Finished chapter 2"}))
            .await
            .json();
        assert!(!ended["ended_at"].is_null());
        assert!(ended["duration_secs"].as_i64().unwrap() >= 0);
        assert_eq!(ended["notes"], "Finished chapter 2");

        server
            .post(&format!("/api/study-sessions/{id}/end"))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post("/api/study-sessions")
            .authorization_bearer(&token)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CREATED);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_end_without_body(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let token = alice_token();

        let session: Value = server
            .post("/api/study-sessions")
            .authorization_bearer(&token)
            .json(&json!({"started_at": Utc::now() - Duration::minutes(10)}))
            .await
            .json();
        let id = session["id"].as_i64().unwrap();

        let ended: Value = server
            .post(&format!("/api/study-sessions/{id}/end"))
            .authorization_bearer(&token)
            .await
            .json();
        assert!(ended["duration_secs"].as_i64().unwrap() >= 600);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_log_finished_session(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let started_at = Utc::now() - Duration::hours(3);

        let session = log_session(&server, Some(1), started_at, 30).await;
        assert_eq!(session["duration_secs"], 1800);
        assert_eq!(session["course_id"], 1);

        server
            .post("/api/study-sessions")
            .authorization_bearer(alice_token())
            .json(&json!({
                "started_at": started_at,
                "ended_at": started_at - Duration::minutes(1),
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // le sessioni concluse non bloccano una sessione live
        server
            .post("/api/study-sessions")
            .authorization_bearer(alice_token())
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CREATED);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_session_for_foreign_course(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .post("/api/study-sessions")
            .authorization_bearer(alice_token())
            .json(&json!({"course_id": 3}))
            .await
            .assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // Test per GET /api/study-sessions
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_list_sessions_filters(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let now = Utc::now();
        log_session(&server, Some(1), now - Duration::days(3), 20).await;
        log_session(&server, Some(2), now - Duration::days(2), 20).await;
        let newest = log_session(&server, Some(1), now - Duration::days(1), 20).await;

        let all: Vec<Value> = server
            .get("/api/study-sessions")
            .authorization_bearer(alice_token())
            .await
            .json();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0]["id"], newest["id"]);

        let for_course: Vec<Value> = server
            .get("/api/study-sessions")
            .add_query_param("course_id", 1)
            .authorization_bearer(alice_token())
            .await
            .json();
        assert_eq!(for_course.len(), 2);

        let limited: Vec<Value> = server
            .get("/api/study-sessions")
            .add_query_param("limit", 2)
            .authorization_bearer(alice_token())
            .await
            .json();
        assert_eq!(limited.len(), 2);

        let recent: Vec<Value> = server
            .get("/api/study-sessions")
            .add_query_param("from", (now - Duration::hours(36)).to_rfc3339())
            .authorization_bearer(alice_token())
            .await
            .json();
        assert_eq!(recent.len(), 1);

        let bobs: Vec<Value> = server
            .get("/api/study-sessions")
            .authorization_bearer(bob_token())
            .await
            .json();
        assert!(bobs.is_empty());
        Ok(())
    }

    // ============================================================
    // Test per GET/PUT/DELETE /api/study-sessions/{id}
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_update_recomputes_duration(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let started_at = Utc::now() - Duration::hours(5);
        let session = log_session(&server, None, started_at, 10).await;
        let id = session["id"].as_i64().unwrap();

        let updated: Value = server
            .put(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(alice_token())
            .json(&json!({
                "course_id": 1,
                "ended_at": started_at + Duration::minutes(45),
                "notes": "Longer than planned"
            }))
            .await
            .json();
        assert_eq!(updated["duration_secs"], 2700);
        assert_eq!(updated["course_id"], 1);
        assert_eq!(updated["notes"], "Longer than planned");

        server
            .put(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(alice_token())
            .json(&json!({"ended_at": started_at - Duration::minutes(1)}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let fetched: Value = server
            .get(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(alice_token())
            .await
            .json();
        assert_eq!(fetched["duration_secs"], 2700);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_update_null_course_detaches(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let started_at = Utc::now() - Duration::hours(3);
        let session = log_session(&server, Some(1), started_at, 20).await;
        let id = session["id"].as_i64().unwrap();

        // senza course_id il collegamento resta
        let kept: Value = server
            .put(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(alice_token())
            .json(&json!({"notes": "still linked"}))
            .await
            .json();
        assert_eq!(kept["course_id"], 1);

        let detached: Value = server
            .put(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(alice_token())
            .json(&json!({"course_id": null}))
            .await
            .json();
        assert!(detached["course_id"].is_null());
        assert_eq!(detached["notes"], "still linked");
        assert_eq!(detached["duration_secs"], 1200);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_delete_session(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let session = log_session(&server, None, Utc::now() - Duration::hours(2), 10).await;
        let id = session["id"].as_i64().unwrap();

        server
            .delete(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(bob_token())
            .await
            .assert_status_not_found();

        server
            .delete(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(alice_token())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(alice_token())
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_deleting_course_detaches_sessions(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let session = log_session(&server, Some(1), Utc::now() - Duration::hours(2), 10).await;
        let id = session["id"].as_i64().unwrap();

        server
            .delete("/api/courses/1")
            .authorization_bearer(alice_token())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let fetched: Value = server
            .get(&format!("/api/study-sessions/{id}"))
            .authorization_bearer(alice_token())
            .await
            .json();
        assert!(fetched["course_id"].is_null());
        Ok(())
    }

    // ============================================================
    // Test per GET /api/study-sessions/stats
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_stats(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let today_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 1)
            .unwrap()
            .and_utc();

        log_session(&server, Some(1), today_start, 30).await;
        log_session(&server, Some(1), today_start - Duration::days(1), 60).await;
        log_session(&server, None, today_start - Duration::days(1), 30).await;
        // fuori da una finestra di 7 giorni
        log_session(&server, Some(1), today_start - Duration::days(20), 90).await;
        // ancora in corso, mai conteggiata
        server
            .post("/api/study-sessions")
            .authorization_bearer(alice_token())
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CREATED);

        let stats: Value = server
            .get("/api/study-sessions/stats")
            .add_query_param("days", 7)
            .authorization_bearer(alice_token())
            .await
            .json();

        assert_eq!(stats["days"], 7);
        assert_eq!(stats["total_sessions"], 3);
        assert_eq!(stats["total_duration_secs"], 7200);
        assert_eq!(stats["average_duration_secs"], 2400);
        assert_eq!(stats["current_streak_days"], 2);

        let by_course = stats["by_course"].as_array().unwrap();
        assert_eq!(by_course.len(), 2);
        assert_eq!(by_course[0]["course_id"], 1);
        assert_eq!(by_course[0]["course_title"], "Rust Fundamentals");
        assert_eq!(by_course[0]["sessions"], 2);
        assert!(by_course[1]["course_id"].is_null());

        assert_eq!(stats["daily"].as_array().unwrap().len(), 2);

        let all_time: Value = server
            .get("/api/study-sessions/stats")
            .add_query_param("days", 10_000)
            .authorization_bearer(alice_token())
            .await
            .json();
        assert_eq!(all_time["days"], 365);
        assert_eq!(all_time["total_sessions"], 4);
        Ok(())
    }
}
