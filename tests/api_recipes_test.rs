//! Integration tests for recipe search endpoints.

mod common;

use axum::http::StatusCode;
use common::{assert_api_error, assert_ok, assert_valid_recipe, lab_of, process_ink, TestApp};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

#[tokio::test]
async fn test_calculate_red_target() {
    let app = TestApp::new();

    let response = app
        .calculate(
            [50.0, 60.0, 40.0],
            &["cyan", "magenta", "yellow", "black"],
            json!({"maxInkCount": 4}),
        )
        .await;

    assert_ok(&response);
    let json: serde_json::Value = response.json();
    let recipes = json["recipes"].as_array().unwrap();
    assert!(!recipes.is_empty());
    assert!(json.get("reason").is_none());
    assert_eq!(json["cancelled"], false);

    for recipe in recipes {
        assert_valid_recipe(recipe);
        assert_eq!(recipe["status"], "draft");
        assert!(recipe["createdAt"].is_string());
        assert_eq!(lab_of(&recipe["target"]), [50.0, 60.0, 40.0]);
    }

    // Best first
    let scores: Vec<f64> = recipes
        .iter()
        .map(|r| r["deltaE"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] <= w[1] + 1e-9));
    assert!(scores[0] < 10.0, "best deltaE {}", scores[0]);
}

#[tokio::test]
async fn test_calculate_uses_configured_defaults() {
    let app = TestApp::new();

    let response = app
        .calculate([40.0, 0.0, 0.0], &["black", "opaque-white"], Value::Null)
        .await;

    assert_ok(&response);
    // White is excluded by default, leaving black alone
    let recipes = response.recipe_inks();
    assert!(!recipes.is_empty());
    for ids in recipes {
        assert!(!ids.iter().any(|id| id == "opaque-white"));
    }
}

#[tokio::test]
async fn test_calculate_repeated_request_hits_cache() {
    let app = TestApp::new();
    let body = json!({
        "target": {"L": 60, "a": -30, "b": -20},
        "inkIds": ["cyan", "black"],
        "constraints": {"maxInkCount": 2}
    });

    let first: serde_json::Value = app.post_json("/api/recipes/calculate", &body).await.json();
    let second: serde_json::Value = app.post_json("/api/recipes/calculate", &body).await.json();

    assert_eq!(first["stats"]["cacheHit"], false);
    assert_eq!(second["stats"]["cacheHit"], true);
    assert_eq!(first["recipes"][0]["inks"], second["recipes"][0]["inks"]);
}

#[tokio::test]
async fn test_calculate_tac_impossible() {
    let app = TestApp::new();

    let response = app
        .calculate([50.0, 0.0, 0.0], &["black", "cyan"], json!({"tacLimit": 10}))
        .await;

    assert_ok(&response);
    let json: serde_json::Value = response.json();
    assert_eq!(json["recipes"], json!([]));
    assert_eq!(json["reason"], "TAC_IMPOSSIBLE");
}

#[tokio::test]
async fn test_calculate_tac_limit_respected() {
    let app = TestApp::new();

    let response = app
        .calculate(
            [65.0, 0.0, -1.0],
            &["black"],
            json!({"allowedTiers": [25, 50, 100], "tacLimit": 60}),
        )
        .await;

    assert_ok(&response);
    let json: serde_json::Value = response.json();
    for recipe in json["recipes"].as_array().unwrap() {
        let coverage: f64 = recipe["inks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["ratio"].as_f64().unwrap() * i["concentration"].as_f64().unwrap() / 100.0)
            .sum();
        assert!(coverage <= 60.0 + 1e-6, "coverage {coverage}");
    }
}

#[tokio::test]
async fn test_calculate_unknown_ink() {
    let app = TestApp::new();

    let response = app.calculate([50.0, 0.0, 0.0], &["teal"], Value::Null).await;

    assert_api_error(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calculate_empty_ink_list() {
    let app = TestApp::new();

    let response = app.calculate([50.0, 0.0, 0.0], &[], Value::Null).await;

    assert_api_error(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_calculate_rejects_out_of_range_target() {
    let app = TestApp::new();

    let response = app.calculate([150.0, 0.0, 0.0], &["black"], Value::Null).await;

    assert_api_error(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_calculate_rejects_invalid_constraints() {
    let app = TestApp::new();

    let response = app
        .calculate([50.0, 0.0, 0.0], &["black"], json!({"costWeight": 2.0}))
        .await;

    assert_api_error(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json() {
    let app = TestApp::new();

    let response = app.post_raw("/api/recipes/calculate", "{not json").await;

    assert_api_error(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_optimize_whole_catalog() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/api/recipes/optimize",
            &json!({
                "target": {"L": 45, "a": -50, "b": 10},
                "constraints": {"maxInkCount": 2}
            }),
        )
        .await;

    assert_ok(&response);
    let json: serde_json::Value = response.json();
    let recipes = json["recipes"].as_array().unwrap();
    assert!(!recipes.is_empty());
    for recipe in recipes {
        assert_valid_recipe(recipe);
        assert!(recipe["inks"].as_array().unwrap().len() <= 2);
    }
    assert!(json["stats"]["branches"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_optimize_crowded_hue_keeps_black() {
    let optimize = |reds: usize| async move {
        let mut inks: Vec<_> = (0..reds)
            .map(|i| process_ink(&format!("red-{i}"), 45.0 + i as f64, 60.0, 30.0))
            .collect();
        inks.push(process_ink("black", 16.0, 0.0, 0.0));
        let app = TestApp::with_inks(inks);
        let response = app
            .post_json(
                "/api/recipes/optimize",
                &json!({"target": {"L": 25, "a": 30, "b": 15}, "constraints": {"maxInkCount": 2}}),
            )
            .await;
        assert_ok(&response);
        let json: Value = response.json();
        let best = json["recipes"][0]["deltaE"].as_f64().unwrap();
        (best, response.recipe_inks())
    };

    let (nine, _) = optimize(9).await;
    let (ten, recipes) = optimize(10).await;
    assert!(recipes[0].iter().any(|id| id == "black"), "{recipes:?}");
    assert!(ten <= nine + 1e-9, "{ten} > {nine}");
}
