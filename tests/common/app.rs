//! In-process inkmatch service for integration tests.
//!
//! Requests go straight through the router with `oneshot`, no socket.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use ink_recipe::{Ink, InkSet, InkType, LabColor};
use inkmatch::assets::AssetLoader;
use inkmatch::models::{AppConfig, InkCatalogFile};
use inkmatch::server::{build_router, create_app_state_from, AppState};

pub struct TestApp {
    router: axum::Router,
    pub state: AppState,
}

impl TestApp {
    /// Embedded ink catalog with [`TestApp::fast_config`].
    pub fn new() -> Self {
        let inks = InkCatalogFile::load_from_assets(&AssetLoader::default());
        Self::build(Self::fast_config(), inks)
    }

    /// Service over a hand-picked catalog.
    pub fn with_inks(inks: Vec<Ink>) -> Self {
        let inks = InkSet::new(inks).expect("test catalog has duplicate ids");
        Self::build(Self::fast_config(), inks)
    }

    fn build(config: AppConfig, inks: InkSet) -> Self {
        let state = create_app_state_from(config, inks).expect("Failed to create app state");
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// Embedded configuration with a search budget small enough for
    /// debug builds.
    pub fn fast_config() -> AppConfig {
        let mut config = AppConfig::load_from_assets(&AssetLoader::default());
        config.search.iterations = 80;
        config.search.population = 8;
        config.search.patience = 20;
        config.search.max_branches = 400;
        config
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::get(path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> TestResponse {
        self.post_raw(path, &body.to_string()).await
    }

    /// POST a body labelled as JSON without checking that it is.
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();
        self.send(request).await
    }

    /// Recipe search for `target` over the given ink ids.
    pub async fn calculate(&self, target: [f64; 3], ink_ids: &[&str], constraints: Value) -> TestResponse {
        let [l, a, b] = target;
        let body = json!({
            "target": {"L": l, "a": a, "b": b},
            "inkIds": ink_ids,
            "constraints": constraints,
        });
        self.post_json("/api/recipes/calculate", &body).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        TestResponse::read(response).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Full-strength process ink for custom catalogs.
pub fn process_ink(id: &str, l: f64, a: f64, b: f64) -> Ink {
    Ink::full_strength(id, id, InkType::Process, LabColor::new(l, a, b)).unwrap()
}

/// Buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    async fn read(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.expect("body stream failed").to_bytes();
        Self {
            status: parts.status,
            headers: parts.headers,
            body: bytes.to_vec(),
        }
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Ink ids of each returned recipe, best first.
    pub fn recipe_inks(&self) -> Vec<Vec<String>> {
        let json: Value = self.json();
        json["recipes"]
            .as_array()
            .map(|recipes| {
                recipes
                    .iter()
                    .map(|r| {
                        r["inks"]
                            .as_array()
                            .into_iter()
                            .flatten()
                            .filter_map(|i| i["inkId"].as_str().map(str::to_owned))
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
