use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use crate::player::{HandState, PlayerStore};
use crate::storage::{JsonFileStore, StoreError};
use crate::utils::normalize_username;

#[derive(Clone)]
pub struct AppState {
    players: Arc<Mutex<PlayerStore<JsonFileStore>>>,
    banner: Arc<str>,
}

impl AppState {
    pub fn new<B: Into<Arc<str>>>(players: PlayerStore<JsonFileStore>, banner: B) -> Self {
        Self {
            players: Arc::new(Mutex::new(players)),
            banner: banner.into(),
        }
    }

    /// Runs one store operation at a time on the blocking pool, since each one rewrites the file.
    async fn with_players<F>(&self, operation: F) -> Result<HandState, ApiError>
    where
        F: FnOnce(&mut PlayerStore<JsonFileStore>) -> Result<HandState, StoreError> + Send + 'static,
    {
        let players = Arc::clone(&self.players);
        let state = tokio::task::spawn_blocking(move || {
            let mut players = players.lock().unwrap_or_else(PoisonError::into_inner);
            operation(&mut *players)
        })
        .await??;
        Ok(state)
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct HandResponse {
    pub message: String,
    pub hand: Option<HandState>,
}

impl HandResponse {
    fn ok(hand: HandState) -> Self {
        Self {
            message: "OK".to_string(),
            hand: Some(hand),
        }
    }

    fn invalid(username: &str) -> Self {
        Self {
            message: format!("Player {} has an invalid hand or deck.", username),
            hand: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Player store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {}", self);
        let body = HandResponse {
            message: self.to_string(),
            hand: None,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

type HandResult = Result<Json<HandResponse>, ApiError>;

fn hand_response(username: &str, result: Result<HandState, ApiError>) -> HandResult {
    match result {
        Ok(state) => {
            log::debug!(
                "{} holds {} cards with {} left in deck",
                username,
                state.hand().len(),
                state.deck_size()
            );
            Ok(Json(HandResponse::ok(state)))
        }
        Err(ApiError::Store(StoreError::NotFound(_))) => Ok(Json(HandResponse::invalid(username))),
        Err(e) => Err(e),
    }
}

async fn reset(State(state): State<AppState>, Path(username): Path<String>) -> HandResult {
    let username = normalize_username(&username).into_owned();
    let name = username.clone();
    let result = state
        .with_players(move |players| players.reset_player(&name))
        .await;
    hand_response(&username, result)
}

async fn draw(State(state): State<AppState>, Path(username): Path<String>) -> HandResult {
    let username = normalize_username(&username).into_owned();
    let name = username.clone();
    let result = state
        .with_players(move |players| players.draw_card(&name))
        .await;
    hand_response(&username, result)
}

async fn discard(
    State(state): State<AppState>,
    Path((username, card_id)): Path<(String, i64)>,
) -> HandResult {
    let username = normalize_username(&username).into_owned();
    let name = username.clone();
    let result = state
        .with_players(move |players| players.discard_card(&name, card_id))
        .await;
    hand_response(&username, result)
}

async fn hello(State(state): State<AppState>, Path(username): Path<String>) -> HandResult {
    let username = normalize_username(&username).into_owned();
    let name = username.clone();
    let result = state
        .with_players(move |players| players.get_or_init_hand(&name))
        .await;
    hand_response(&username, result)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

async fn banner(State(state): State<AppState>) -> Json<String> {
    Json(state.banner.to_string())
}

/// Browsers may only call the API from `origins`, with credentials.
pub fn cors_layer<S: AsRef<str>>(origins: &[S]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.as_ref())
                .with_context(|| format!("invalid allowed origin {:?}", origin.as_ref()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/hider/:username/reset", get(reset))
        .route("/hider/:username/draw", get(draw))
        .route("/hider/:username/discard/:card_id", get(discard))
        .route("/hider/:username/hello", get(hello))
        .layer(cors)
        .with_state(state)
}
