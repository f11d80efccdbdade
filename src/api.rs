use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::constants::{CHAT_DEFAULT_LAT, CHAT_DEFAULT_LON};
use crate::dashboard::{build_payload, chat_messages, collect_reading, fallback_answer};
use crate::pages;
use crate::types::{AppState, DashboardPayload};
use crate::utils::{normalize_lat, normalize_lon, request_rng};

const INVALID_COORDINATES: &str = "Valid lat/lon query params are required.";

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatResponse {
    answer: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/alerts", get(alerts))
        .route("/about", get(about))
        .route("/share-with-us", get(share_with_us))
        .route("/dashboard", get(dashboard))
        .route("/api/dashboard", get(dashboard_json))
        .route("/chat", post(chat))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn index() -> Html<String> {
    Html(pages::landing())
}

pub async fn alerts() -> Html<String> {
    Html(pages::alerts())
}

pub async fn about() -> Html<String> {
    Html(pages::about())
}

pub async fn share_with_us() -> Html<String> {
    Html(pages::share_with_us())
}

fn coordinates(params: &HashMap<String, String>) -> Option<(f64, f64)> {
    let lat = normalize_lat(params.get("lat").map(String::as_str))?;
    let lon = normalize_lon(params.get("lon").map(String::as_str))?;
    Some((lat, lon))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let payload = ErrorResponse {
        error: message.to_string(),
    };
    (status, Json(payload)).into_response()
}

async fn dashboard_payload(state: &AppState, lat: f64, lon: f64) -> DashboardPayload {
    let mut rng = request_rng(state.cfg.rng_seed);
    let reading = collect_reading(&state.sources, lat, lon, &mut rng).await;
    build_payload(&reading, &mut rng)
}

pub async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some((lat, lon)) = coordinates(&params) else {
        return error_response(StatusCode::BAD_REQUEST, INVALID_COORDINATES);
    };
    let payload = dashboard_payload(&state, lat, lon).await;
    match pages::dashboard(&payload) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!("Dashboard render failed: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Dashboard render failed.")
        }
    }
}

pub async fn dashboard_json(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some((lat, lon)) = coordinates(&params) else {
        return error_response(StatusCode::BAD_REQUEST, INVALID_COORDINATES);
    };
    let payload = dashboard_payload(&state, lat, lon).await;
    (StatusCode::OK, Json(payload)).into_response()
}

/// `question` from a JSON body; anything unreadable counts as an empty question.
fn question_from_body(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("question")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default()
}

pub async fn chat(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<ChatResponse> {
    let (lat, lon) = match (
        normalize_lat(params.get("lat").map(String::as_str)),
        normalize_lon(params.get("lon").map(String::as_str)),
    ) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => (CHAT_DEFAULT_LAT, CHAT_DEFAULT_LON),
    };
    let question = question_from_body(&body);

    let mut rng = request_rng(state.cfg.rng_seed);
    let reading = collect_reading(&state.sources, lat, lon, &mut rng).await;

    let raw = match state.chat.complete(&chat_messages(&reading, &question)).await {
        Ok(answer) => answer,
        Err(err) => {
            warn!("Chat completion unavailable, answering from the reading: {err:#}");
            fallback_answer(&reading)
        }
    };

    Json(ChatResponse {
        answer: state.formatter.format(&raw),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use tokio::net::TcpListener;

    use super::*;
    use crate::chat::{ChatCompletion, ChatMessage, ResponseFormatter};
    use crate::config::Config;
    use crate::sources::testing::{lagos, offline};
    use crate::sources::Sources;

    #[derive(Default)]
    struct RecordingChat {
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatCompletion for RecordingChat {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok("Air is fine. You should still carry water.".to_string())
        }
    }

    struct DownChat;

    #[async_trait]
    impl ChatCompletion for DownChat {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            bail!("503 Service Unavailable")
        }
    }

    fn state(sources: Sources, chat: Arc<dyn ChatCompletion>) -> AppState {
        AppState {
            cfg: Arc::new(Config {
                rng_seed: Some(7),
                ..Config::default()
            }),
            sources: Arc::new(sources),
            chat,
            formatter: Arc::new(ResponseFormatter::new().unwrap()),
        }
    }

    async fn spawn_server(state: AppState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn params(pairs: &[(&str, &str)]) -> Query<HashMap<String, String>> {
        Query(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_dashboard_schema(json: &Value) {
        for field in [
            "lat",
            "lon",
            "city",
            "aqi",
            "classification",
            "advisory",
            "tempo",
            "tempo_chart",
            "ground",
            "ground_chart",
            "weather",
            "weather_chart",
            "forecast",
            "alerts",
            "summary",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        let aqi = json["aqi"].as_i64().unwrap();
        assert!((0..=500).contains(&aqi));
        assert!(json["tempo"]["no2"].is_number());
        assert!(json["tempo"]["source"].is_string());
        assert_eq!(json["tempo_chart"].as_array().unwrap().len(), 5);
        assert!(json["ground"]["pm25"].is_number());
        assert!(json["ground"]["station"].is_string());
        assert_eq!(json["ground_chart"].as_array().unwrap().len(), 5);
        for field in ["temp", "humidity", "wind", "rainfall", "icon"] {
            assert!(json["weather"].get(field).is_some(), "missing weather.{field}");
        }
        for field in ["temp", "humidity", "wind"] {
            assert_eq!(json["weather_chart"][field].as_array().unwrap().len(), 5);
        }
        let forecast = json["forecast"].as_array().unwrap();
        assert_eq!(forecast.len(), 4);
        for day in forecast {
            for field in ["day", "aqi", "status", "colorClass"] {
                assert!(day.get(field).is_some(), "missing forecast.{field}");
            }
        }
    }

    #[tokio::test]
    async fn dashboard_json_handler_returns_full_payload_for_lagos() {
        let state = state(lagos(), Arc::new(RecordingChat::default()));
        let response = dashboard_json(
            State(state),
            params(&[("lat", "6.5244"), ("lon", "3.3792")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_dashboard_schema(&json);
        assert_eq!(json["city"], "Lagos, Nigeria");
        assert_eq!(json["aqi"], 120);
        assert_eq!(json["classification"], "Unhealthy for Sensitive Groups");
    }

    #[tokio::test]
    async fn dashboard_over_socket_with_offline_sources() {
        let base = spawn_server(state(offline(), Arc::new(DownChat))).await;

        let json: Value = reqwest::get(format!("{base}/api/dashboard?lat=6.5244&lon=3.3792"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_dashboard_schema(&json);
        assert_eq!(json["tempo"]["source"], "TEMPO Estimated");
        assert_eq!(json["ground"]["station"], "Fallback");

        let page = reqwest::get(format!("{base}/dashboard?lat=6.5244&lon=3.3792"))
            .await
            .unwrap();
        assert_eq!(page.status(), reqwest::StatusCode::OK);
        let html = page.text().await.unwrap();
        assert!(html.contains("Unknown Location"));
        assert!(html.contains(r#"id="dashboard-data""#));
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let base = spawn_server(state(offline(), Arc::new(DownChat))).await;
        for query in ["lat=abc&lon=3", "lat=91&lon=3", "lat=6&lon=-181", "lon=3", ""] {
            for route in ["dashboard", "api/dashboard"] {
                let response = reqwest::get(format!("{base}/{route}?{query}"))
                    .await
                    .unwrap();
                assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
                let json: Value = response.json().await.unwrap();
                assert_eq!(json["error"], INVALID_COORDINATES);
            }
        }
    }

    #[tokio::test]
    async fn static_pages_and_health_are_served() {
        let base = spawn_server(state(offline(), Arc::new(DownChat))).await;
        for route in ["", "alerts", "about", "share-with-us"] {
            let response = reqwest::get(format!("{base}/{route}")).await.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK, "/{route}");
            assert!(response.text().await.unwrap().contains("<!DOCTYPE html>"));
        }
        let health = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn chat_without_question_sends_empty_prompt() {
        let recorder = Arc::new(RecordingChat::default());
        let base = spawn_server(state(lagos(), recorder.clone())).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let json: Value = response.json().await.unwrap();
        assert_eq!(
            json["answer"],
            "Air is fine.\n\nYou **should** still carry water."
        );

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].role, "system");
        assert!(calls[0][0].content.contains("COORDINATES: 6.5244, 3.3792"));
        assert_eq!(calls[0][1], ChatMessage::user(""));
    }

    #[tokio::test]
    async fn chat_tolerates_malformed_bodies() {
        let recorder = Arc::new(RecordingChat::default());
        let state = state(lagos(), recorder.clone());
        for body in ["not json", r#"{"question": 42}"#, ""] {
            let Json(response) = chat(
                State(state.clone()),
                params(&[]),
                Bytes::from_static(body.as_bytes()),
            )
            .await;
            assert!(!response.answer.is_empty());
        }
        let calls = recorder.calls.lock().unwrap();
        assert!(calls.iter().all(|messages| messages[1].content.is_empty()));
    }

    #[tokio::test]
    async fn chat_passes_question_and_coordinates() {
        let recorder = Arc::new(RecordingChat::default());
        let state = state(lagos(), recorder.clone());
        let _ = chat(
            State(state),
            params(&[("lat", "59.91"), ("lon", "10.75")]),
            Bytes::from_static(br#"{"question": "Can I cycle to work?"}"#),
        )
        .await;
        let calls = recorder.calls.lock().unwrap();
        assert!(calls[0][0].content.contains("COORDINATES: 59.91, 10.75"));
        assert_eq!(calls[0][1].content, "Can I cycle to work?");
    }

    #[tokio::test]
    async fn chat_replaces_a_half_valid_pair_with_the_default_site() {
        for query in [
            [("lat", "abc"), ("lon", "10.75")],
            [("lat", "59.91"), ("lon", "999")],
        ] {
            let recorder = Arc::new(RecordingChat::default());
            let state = state(lagos(), recorder.clone());
            let _ = chat(State(state), params(&query), Bytes::new()).await;
            let calls = recorder.calls.lock().unwrap();
            assert!(
                calls[0][0].content.contains("COORDINATES: 6.5244, 3.3792"),
                "{query:?}"
            );
        }
    }

    #[tokio::test]
    async fn chat_falls_back_to_reading_when_completion_fails() {
        let state = state(lagos(), Arc::new(DownChat));
        let Json(response) = chat(
            State(state),
            params(&[]),
            Bytes::from_static(br#"{"question": "Is it safe?"}"#),
        )
        .await;
        assert!(response
            .answer
            .contains("The current AQI in Lagos, Nigeria is 120 (Unhealthy for Sensitive Groups)."));
        assert!(response.answer.contains("\n\nLimit outdoor exertion"));
    }

    #[test]
    fn question_extraction_is_lenient() {
        assert_eq!(question_from_body(br#"{"question": "hi"}"#), "hi");
        assert_eq!(question_from_body(br#"{"question": null}"#), "");
        assert_eq!(question_from_body(br#"["question"]"#), "");
        assert_eq!(question_from_body(b"{"), "");
    }
}
