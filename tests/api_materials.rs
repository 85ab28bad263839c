//! Integration tests per gli endpoints dei materiali
//!
//! Test per:
//! - GET/POST /api/materials (multipart upload)
//! - GET/PUT/DELETE /api/materials/{id}
//! - GET /api/materials/{id}/url
//! - GET /api/materials/{id}/download

mod common;

#[cfg(test)]
mod material_tests {
    use super::common::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use axum_test::multipart::{MultipartForm, Part};
    use object_store::path::Path as StoragePath;
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    fn text_upload(course_id: i64, file_name: &str, content: &str) -> MultipartForm {
        MultipartForm::new()
            .add_text("course_id", course_id.to_string())
            .add_part(
                "file",
                Part::bytes(content.as_bytes().to_vec())
                    .file_name(file_name.to_string())
                    .mime_type("text/plain"),
            )
    }

    async fn upload(server: &TestServer, token: &str, form: MultipartForm) -> Value {
        let response = server
            .post("/api/materials")
            .authorization_bearer(token)
            .multipart(form)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    // ============================================================
    // Test per POST /api/materials
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_upload_material(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool.clone());
        let server = create_test_server(state.clone());

        let form = text_upload(1, "notes.txt", "Ownership moves values.")
            .add_text("title", "Lecture notes")
            .add_text("description", "Week 1");
        let material = upload(&server, &alice_token(), form).await;

        assert_eq!(material["course_id"], 1);
        assert_eq!(material["title"], "Lecture notes");
        assert_eq!(material["description"], "Week 1");
        assert_eq!(material["file_name"], "notes.txt");
        assert_eq!(material["content_type"], "text/plain");
        assert_eq!(material["size_bytes"], 23);
        assert!(material.get("storage_key").is_none());

        let (key,): (String,) = sqlx::query_as("SELECT storage_key FROM materials WHERE id = ?")
            .bind(material["id"].as_i64().unwrap())
            .fetch_one(&pool)
            .await?;
        assert!(key.starts_with("users/1/courses/1/"));
        assert!(state.storage.get(&StoragePath::from(key.as_str())).await.is_ok());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_upload_title_defaults_to_file_name(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let material = upload(&server, &alice_token(), text_upload(1, "summary.txt", "hi")).await;
        assert_eq!(material["title"], "summary.txt");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_upload_markdown_sent_as_octet_stream(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let form = MultipartForm::new().add_text("course_id", "1").add_part(
            "file",
            Part::bytes(b"# Title".to_vec())
                .file_name("readme.md")
                .mime_type("application/octet-stream"),
        );
        let material = upload(&server, &alice_token(), form).await;
        assert_eq!(material["content_type"], "text/markdown");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_upload_rejections(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let token = alice_token();

        // corso di un altro utente
        server
            .post("/api/materials")
            .authorization_bearer(&token)
            .multipart(text_upload(3, "a.txt", "x"))
            .await
            .assert_status_not_found();

        // file vuoto
        server
            .post("/api/materials")
            .authorization_bearer(&token)
            .multipart(text_upload(1, "a.txt", ""))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // course_id mancante
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"x".to_vec()).file_name("a.txt").mime_type("text/plain"),
        );
        server
            .post("/api/materials")
            .authorization_bearer(&token)
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // tipo non consentito
        let form = MultipartForm::new().add_text("course_id", "1").add_part(
            "file",
            Part::bytes(b"MZ".to_vec())
                .file_name("setup.exe")
                .mime_type("application/x-msdownload"),
        );
        server
            .post("/api/materials")
            .authorization_bearer(&token)
            .multipart(form)
            .await
            .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_upload_too_large(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let just_over = "a".repeat(MAX_UPLOAD_BYTES + 1);
        server
            .post("/api/materials")
            .authorization_bearer(alice_token())
            .multipart(text_upload(1, "big.txt", &just_over))
            .await
            .assert_status(StatusCode::PAYLOAD_TOO_LARGE);

        let far_over = "a".repeat(MAX_UPLOAD_BYTES + 256 * 1024);
        server
            .post("/api/materials")
            .authorization_bearer(alice_token())
            .multipart(text_upload(1, "huge.txt", &far_over))
            .await
            .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        Ok(())
    }

    // ============================================================
    // Test per GET /api/materials, GET/PUT /api/materials/{id}
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_list_and_get_materials(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let token = alice_token();

        let first = upload(&server, &token, text_upload(1, "one.txt", "1")).await;
        upload(&server, &token, text_upload(2, "two.txt", "2")).await;

        let all: Vec<Value> = server
            .get("/api/materials")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(all.len(), 2);

        let for_course: Vec<Value> = server
            .get("/api/materials")
            .add_query_param("course_id", 1)
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(for_course.len(), 1);
        assert_eq!(for_course[0]["file_name"], "one.txt");

        let id = first["id"].as_i64().unwrap();
        server
            .get(&format!("/api/materials/{id}"))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let bobs: Vec<Value> = server
            .get("/api/materials")
            .authorization_bearer(bob_token())
            .await
            .json();
        assert!(bobs.is_empty());

        server
            .get(&format!("/api/materials/{id}"))
            .authorization_bearer(bob_token())
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_update_material(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let token = alice_token();
        let material = upload(&server, &token, text_upload(1, "one.txt", "1")).await;
        let id = material["id"].as_i64().unwrap();

        let updated: Value = server
            .put(&format!("/api/materials/{id}"))
            .authorization_bearer(&token)
            .json(&json!({"title": "Renamed", "description": "Now described"}))
            .await
            .json();
        assert_eq!(updated["title"], "Renamed");
        assert_eq!(updated["description"], "Now described");
        assert_eq!(updated["file_name"], "one.txt");

        server
            .put(&format!("/api/materials/{id}"))
            .authorization_bearer(&token)
            .json(&json!({"title": ""}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        Ok(())
    }

    // ============================================================
    // Test per GET /api/materials/{id}/url, GET /api/materials/{id}/download
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_url_falls_back_to_download_route(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let token = alice_token();
        let material = upload(&server, &token, text_upload(1, "one.txt", "1")).await;
        let id = material["id"].as_i64().unwrap();

        let body: Value = server
            .get(&format!("/api/materials/{id}/url"))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(body["url"], format!("/api/materials/{id}/download"));
        assert_eq!(body["expires_in_secs"], 3600);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_download_streams_content(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let token = alice_token();
        let material = upload(
            &server,
            &token,
            text_upload(1, "my notes.txt", "Borrowing is temporary access."),
        )
        .await;
        let id = material["id"].as_i64().unwrap();

        let response = server
            .get(&format!("/api/materials/{id}/download"))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        assert_eq!(response.text(), "Borrowing is temporary access.");
        let headers = response.headers();
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
        assert_eq!(
            headers.get("content-disposition").unwrap(),
            "attachment; filename=\"my_notes.txt\""
        );
        Ok(())
    }

    // ============================================================
    // Test per DELETE /api/materials/{id} e l'eliminazione del corso
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_delete_material_removes_blob(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool.clone());
        let server = create_test_server(state.clone());
        let token = alice_token();
        let material = upload(&server, &token, text_upload(1, "one.txt", "1")).await;
        let id = material["id"].as_i64().unwrap();
        let (key,): (String,) = sqlx::query_as("SELECT storage_key FROM materials WHERE id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await?;

        server
            .delete(&format!("/api/materials/{id}"))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/materials/{id}"))
            .authorization_bearer(&token)
            .await
            .assert_status_not_found();
        assert!(state.storage.get(&StoragePath::from(key.as_str())).await.is_err());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "courses")))]
    async fn test_deleting_course_removes_its_materials(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool.clone());
        let server = create_test_server(state.clone());
        let token = alice_token();
        let material = upload(&server, &token, text_upload(1, "one.txt", "1")).await;
        let kept = upload(&server, &token, text_upload(2, "two.txt", "2")).await;
        let (key,): (String,) = sqlx::query_as("SELECT storage_key FROM materials WHERE id = ?")
            .bind(material["id"].as_i64().unwrap())
            .fetch_one(&pool)
            .await?;

        server
            .delete("/api/courses/1")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let remaining: Vec<Value> = server
            .get("/api/materials")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["id"], kept["id"]);
        assert!(state.storage.get(&StoragePath::from(key.as_str())).await.is_err());
        Ok(())
    }
}
