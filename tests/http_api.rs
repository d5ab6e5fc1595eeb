// HTTP smoke tests for the courtside CMS backend.
//
// Each test binds an ephemeral port, serves the real router on it, and
// drives it with an HTTP client, so routing, body extraction, multipart
// reading, and status mapping are exercised the way a browser hits them.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;

use courtside_cms::config::{Config, ServerConfig, TierScoringConfig, UploadsConfig};
use courtside_cms::db::Database;
use courtside_cms::server::{build_router, AppState};
use serde_json::json;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Serve the router on an ephemeral port over a fresh in-memory database.
/// Hands back the base URL and the state behind it. `tag` keeps each test's
/// uploads directory separate.
async fn spawn_server(tag: &str) -> (String, Arc<AppState>) {
    let uploads_dir = std::env::temp_dir().join(format!("courtside_http_{tag}"));
    let _ = fs::remove_dir_all(&uploads_dir);
    fs::create_dir_all(&uploads_dir).expect("uploads dir should be creatable");

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5101,
        },
        uploads: UploadsConfig {
            dir: uploads_dir.to_string_lossy().into_owned(),
            max_file_mb: 10,
        },
        tiers: TierScoringConfig {
            base_score: 85.0,
            gen_step: 5.0,
            min_score: 60.0,
            max_score: 100.0,
            adjustments: HashMap::new(),
        },
        seed_on_start: false,
        db_path: ":memory:".to_string(),
    };

    let db = Arc::new(Database::open(":memory:").expect("in-memory database should open"));
    let state = Arc::new(AppState::new(db, config));
    let app = build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("test listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server");
    });

    (format!("http://{addr}"), state)
}

/// Build a single-file multipart body by hand. The boundary must not occur
/// in the payload.
fn multipart_file(boundary: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Encode a small in-memory PNG for upload tests.
fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(64, 48, image::Rgb([20, 90, 200]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("png encoding should succeed");
    bytes
}

// ===========================================================================
// Survey endpoints
// ===========================================================================

#[tokio::test]
async fn submit_then_duplicate_maps_to_200_and_403() {
    let (base, _state) = spawn_server("submit_duplicate").await;
    let client = reqwest::Client::new();

    let ballot = json!({
        "clientId": "smoke-1",
        "rankings": { "PG": [{ "id": 1, "name": "Kirin", "gen": 3.0 }] },
        "feedback": "great cast"
    });

    let first = client
        .post(format!("{base}/api/survey/submit"))
        .json(&ballot)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    let body: serde_json::Value = first.json().await.unwrap();
    assert_eq!(body["success"], json!(true));

    let second = client
        .post(format!("{base}/api/survey/submit"))
        .json(&ballot)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 403);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["success"], json!(false));

    let voted = client
        .post(format!("{base}/api/survey/check-voted"))
        .json(&json!({ "clientId": "smoke-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(voted.status(), 200);
    let body: serde_json::Value = voted.json().await.unwrap();
    assert_eq!(body["hasVoted"], json!(true));

    // A body that is not JSON maps to a 400, not a 500.
    let malformed = client
        .post(format!("{base}/api/survey/submit"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);
}

#[tokio::test]
async fn anonymous_identity_comes_from_forwarded_header() {
    let (base, _state) = spawn_server("forwarded_identity").await;
    let client = reqwest::Client::new();

    let ballot = json!({
        "rankings": { "C": [{ "id": 7, "name": "Volton", "gen": 2.0 }] }
    });
    let response = client
        .post(format!("{base}/api/survey/submit"))
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .json(&ballot)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The ballot was recorded under the first forwarded entry.
    let voted = client
        .post(format!("{base}/api/survey/check-voted"))
        .json(&json!({ "clientId": "ip_203.0.113.9" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = voted.json().await.unwrap();
    assert_eq!(body["hasVoted"], json!(true));

    // Without the header the peer address synthesizes a different identity.
    let voted = client
        .post(format!("{base}/api/survey/check-voted"))
        .send()
        .await
        .unwrap();
    assert_eq!(voted.status(), 200);
    let body: serde_json::Value = voted.json().await.unwrap();
    assert_eq!(body["hasVoted"], json!(false));
}

// ===========================================================================
// Image upload and listing
// ===========================================================================

#[tokio::test]
async fn image_upload_and_listing_survive_extreme_pages() {
    let (base, state) = spawn_server("image_pages").await;
    let client = reqwest::Client::new();

    let boundary = "courtside-test-boundary";
    let upload = client
        .post(format!("{base}/api/upload-image"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(multipart_file(boundary, "court.png", &sample_png()))
        .send()
        .await
        .unwrap();
    assert_eq!(upload.status(), 200);
    let body: serde_json::Value = upload.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert!(body["urls"]["original"].as_str().is_some());

    let listed = client
        .get(format!("{base}/api/images"))
        .send()
        .await
        .unwrap();
    assert_eq!(listed.status(), 200);
    let body: serde_json::Value = listed.json().await.unwrap();
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    // A page number large enough to overflow a naive offset computation
    // still answers 200 with an empty page.
    let far_out = client
        .get(format!(
            "{base}/api/images?page=922337203685477581&page_size=100"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(far_out.status(), 200);
    let body: serde_json::Value = far_out.json().await.unwrap();
    assert_eq!(body["total"], json!(1));
    assert!(body["items"].as_array().unwrap().is_empty());

    let _ = fs::remove_dir_all(state.uploads_dir());
}
