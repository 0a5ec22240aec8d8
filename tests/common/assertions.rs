//! Assertion helpers for tests.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use super::app::TestResponse;

/// Assert response has expected status code
pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status, expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );
}

/// Assert response is OK (200)
pub fn assert_ok(response: &TestResponse) {
    assert_status(response, StatusCode::OK);
}

/// Assert an error response with the `{"status", "error"}` body
pub fn assert_api_error(response: &TestResponse, expected: StatusCode) {
    assert_status(response, expected);
    let json: serde_json::Value = response.json();
    assert_eq!(
        json["status"].as_u64(),
        Some(expected.as_u16() as u64),
        "Expected JSON status {}, got {:?}. Full response: {}",
        expected.as_u16(),
        json["status"],
        serde_json::to_string_pretty(&json).unwrap()
    );
    assert!(json["error"].is_string(), "Expected error message");
}

/// Assert a recipe record carries the documented fields and sums to 100
pub fn assert_valid_recipe(recipe: &serde_json::Value) {
    for field in ["target", "inks", "mixed", "deltaE", "method", "optimization"] {
        assert!(!recipe[field].is_null(), "Recipe missing {field}: {recipe}");
    }
    let inks = recipe["inks"].as_array().expect("inks array");
    assert!(!inks.is_empty());

    let total: f64 = inks.iter().map(|i| i["ratio"].as_f64().unwrap()).sum();
    assert!((total - 100.0).abs() <= 0.1, "Ratios sum to {total}");
    for ink in inks {
        assert!(ink["inkId"].is_string());
        assert!(ink["concentration"].is_u64());
    }
}

/// Lab object as an array
pub fn lab_of(value: &serde_json::Value) -> [f64; 3] {
    [
        value["L"].as_f64().unwrap(),
        value["a"].as_f64().unwrap(),
        value["b"].as_f64().unwrap(),
    ]
}
