//! API integration tests
//!
//! Exercise a running server against live catalog and circulation
//! backends.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8090/api/v1";

/// Put the engine back into SEARCH mode, discarding any session
async fn reset_to_search(client: &Client) {
    let _ = client
        .put(format!("{}/scanner/mode", BASE_URL))
        .json(&json!({ "mode": "SEARCH", "confirm": true }))
        .send()
        .await;
    let _ = client
        .post(format!("{}/scanner/reset", BASE_URL))
        .send()
        .await;
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_initial_state() {
    let client = Client::new();
    reset_to_search(&client).await;

    let response = client
        .get(format!("{}/scanner/state", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["mode"], "SEARCH");
    assert_eq!(body["is_scanning"], true);
}

#[tokio::test]
#[ignore]
async fn test_manual_entry_empty_code_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/scanner/manual", BASE_URL))
        .json(&json!({ "code": "   " }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "EmptyCode");
}

#[tokio::test]
#[ignore]
async fn test_mode_round_trip() {
    let client = Client::new();
    reset_to_search(&client).await;

    let response = client
        .put(format!("{}/scanner/mode", BASE_URL))
        .json(&json!({ "mode": "INVENTORY" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["mode"], "INVENTORY");
    assert!(body["session"]["entries"].as_array().expect("entries").is_empty());

    reset_to_search(&client).await;
}

#[tokio::test]
#[ignore]
async fn test_loan_requires_subject_first() {
    let client = Client::new();
    reset_to_search(&client).await;

    let response = client
        .put(format!("{}/scanner/mode", BASE_URL))
        .json(&json!({ "mode": "LOAN" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Completing with no subject is a user error
    let response = client
        .post(format!("{}/scanner/loan/complete", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // A non-numeric code is rejected as a subject card
    let response = client
        .post(format!("{}/scanner/scan", BASE_URL))
        .json(&json!({ "code": "not-a-card" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["outcome"]["outcome"], "INVALID_SUBJECT_CODE");

    reset_to_search(&client).await;
}

#[tokio::test]
#[ignore]
async fn test_camera_registry_round_trip() {
    let client = Client::new();

    let response = client
        .post(format!("{}/camera/devices", BASE_URL))
        .json(&json!({
            "devices": [
                { "id": "cam-front", "label": "Front camera" },
                { "id": "cam-rear", "label": "Rear camera" }
            ],
            "permission_granted": true
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], true);

    let response = client
        .put(format!("{}/camera/selected", BASE_URL))
        .json(&json!({ "device_id": "cam-rear" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["selected"]["id"], "cam-rear");
}

#[tokio::test]
#[ignore]
async fn test_unknown_camera_rejected() {
    let client = Client::new();

    let response = client
        .put(format!("{}/camera/selected", BASE_URL))
        .json(&json!({ "device_id": "no-such-camera" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}
