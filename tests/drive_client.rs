// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! REST client behaviour against a mock Drive API

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gesture_drive::auth::{ClientSecrets, StoredToken, TokenProvider};
use gesture_drive::config::DriveConfig;
use gesture_drive::drive::{DriveClient, DriveStore, FileQuery, FOLDER_MIME_TYPE};
use gesture_drive::GestureDriveError;

fn drive_config(server: &MockServer) -> DriveConfig {
    DriveConfig {
        api_url: format!("{}/drive/v3", server.uri()),
        upload_url: format!("{}/upload/drive/v3", server.uri()),
        timeout_secs: 5,
    }
}

fn client(server: &MockServer) -> DriveClient {
    DriveClient::new(&drive_config(server), Client::new(), TokenProvider::fixed("test-token"))
}

#[tokio::test]
async fn search_follows_pagination() {
    let server = MockServer::start().await;
    let query = FileQuery::new().in_folder("root-id").folders_only();

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", query.to_drive_query().as_str()))
        .and(query_param("pageToken", "page-2"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{ "id": "b", "name": "Beta", "mimeType": FOLDER_MIME_TYPE }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", query.to_drive_query().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{
                "id": "a",
                "name": "Alpha",
                "mimeType": FOLDER_MIME_TYPE,
                "modifiedTime": "2024-03-01T10:00:00.000Z",
                "parents": ["root-id"]
            }],
            "nextPageToken": "page-2"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let files = client(&server).search_files(&query).await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "Alpha");
    assert!(files[0].modified_time.is_some());
    assert_eq!(files[0].parents, vec!["root-id"]);
    assert_eq!(files[1].id, "b");
    assert!(files[1].is_folder());
}

#[tokio::test]
async fn create_folder_sends_folder_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(body_json(json!({
            "name": "GestureSets",
            "mimeType": FOLDER_MIME_TYPE,
            "parents": ["parent-id"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-id",
            "name": "GestureSets",
            "mimeType": FOLDER_MIME_TYPE,
            "parents": ["parent-id"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = client(&server)
        .create_folder("GestureSets", Some("parent-id"))
        .await
        .unwrap();

    assert_eq!(folder.id, "new-id");
}

#[tokio::test]
async fn copy_and_delete_use_file_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files/src-1/copy"))
        .and(body_json(json!({ "name": "a.pkl", "parents": ["dest"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "copy-1", "name": "a.pkl", "parents": ["dest"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/old-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let drive = client(&server);
    let copy = drive.copy_file("src-1", "a.pkl", "dest").await.unwrap();
    drive.delete_file("old-1").await.unwrap();

    assert_eq!(copy.id, "copy-1");
}

#[tokio::test]
async fn move_without_old_parent_looks_parents_up() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/set-1"))
        .and(query_param("fields", "parents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "parents": ["active"] })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/drive/v3/files/set-1"))
        .and(query_param("addParents", "sets"))
        .and(query_param("removeParents", "active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "set-1", "name": "Alpha", "parents": ["sets"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let moved = client(&server).move_file("set-1", "sets", None).await.unwrap();
    assert_eq!(moved.parents, vec!["sets"]);
}

#[tokio::test]
async fn upload_and_download_round_the_content() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let local = dir.path().join("model.pkl");
    std::fs::write(&local, b"weights-bytes").unwrap();

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains(r#""parents":["folder-9"]"#))
        .and(body_string_contains("weights-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "up-1", "name": "model.pkl", "parents": ["folder-9"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/up-1"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"weights-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let drive = client(&server);
    let uploaded = drive.upload_file(&local, "model.pkl", "folder-9").await.unwrap();
    let target = dir.path().join("downloaded.pkl");
    drive.download_file(&uploaded.id, &target).await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"weights-bytes");
}

#[tokio::test]
async fn error_status_becomes_drive_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found: missing"))
        .mount(&server)
        .await;

    let err = client(&server).delete_file("missing").await.unwrap_err();

    match err {
        GestureDriveError::Drive { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("missing"));
        }
        other => panic!("Expected Drive error, got {:?}", other),
    }
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let token_path = dir.path().join("token.json");

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/x"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let token = StoredToken {
        token: Some("stale-token".to_string()),
        refresh_token: Some("rt-1".to_string()),
        expiry: Some(Utc::now() - Duration::minutes(5)),
        ..StoredToken::default()
    };
    let secrets = ClientSecrets {
        client_id: "cid".to_string(),
        client_secret: "secret".to_string(),
        token_uri: format!("{}/token", server.uri()),
    };
    let tokens = TokenProvider::new(Client::new(), token, Some(secrets), Some(token_path.clone()));
    let drive = DriveClient::new(&drive_config(&server), Client::new(), tokens);

    // second call reuses the refreshed token
    drive.delete_file("x").await.unwrap();
    drive.delete_file("x").await.unwrap();

    let saved = StoredToken::load(&token_path).unwrap();
    assert_eq!(saved.token.as_deref(), Some("fresh-token"));
    assert_eq!(saved.refresh_token.as_deref(), Some("rt-1"));
    assert!(!saved.is_expired(Utc::now()));
}

#[tokio::test]
async fn rejected_refresh_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let token = StoredToken {
        token: None,
        refresh_token: Some("revoked".to_string()),
        client_id: Some("cid".to_string()),
        client_secret: Some("secret".to_string()),
        token_uri: Some(format!("{}/token", server.uri())),
        ..StoredToken::default()
    };
    let tokens = TokenProvider::new(Client::new(), token, None, None);

    let err = tokens.access_token().await.unwrap_err();
    match err {
        GestureDriveError::Auth(message) => assert!(message.contains("invalid_grant")),
        other => panic!("Expected Auth error, got {:?}", other),
    }
}
