use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anniversary_core::{
    apply_action, card_for, group_rewards, Catalog, FileStore, Game, GameAction, GameError,
    GameEvent, GameKind, GameView, Ledger, LedgerState, Outcome, RewardCard, RewardGroups,
    RewardId, RewardStatus, StatusResolver,
};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

pub mod config;

pub use config::{Config, Settings, StartupError};

pub const SESSION_HEADER: &str = "x-session-token";

/// Unfinished games kept at once; starting another drops the oldest.
pub const MAX_SESSIONS: usize = 32;

#[derive(Clone)]
pub struct AppState {
    ledger: Arc<RwLock<Ledger>>,
    catalog: Arc<Catalog>,
    resolver: Arc<StatusResolver>,
    sessions: Arc<RwLock<HashMap<String, GameSession>>>,
    tokens: Arc<RwLock<HashSet<String>>>,
    started: Arc<AtomicU64>,
    updates: broadcast::Sender<LedgerView>,
    settings: Arc<Settings>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            Ledger::in_memory(),
            Catalog::builtin(),
            StatusResolver::default(),
            Settings::default(),
        )
    }
}

impl AppState {
    pub fn new(ledger: Ledger, catalog: Catalog, resolver: StatusResolver, settings: Settings) -> Self {
        let (updates, _) = broadcast::channel(32);
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            catalog: Arc::new(catalog),
            resolver: Arc::new(resolver),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            tokens: Arc::new(RwLock::new(HashSet::new())),
            started: Arc::new(AtomicU64::new(0)),
            updates,
            settings: Arc::new(settings),
        }
    }

    /// Loads the ledger from the data directory and applies the configured
    /// catalog and overrides.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let store = FileStore::in_dir(&config.data_dir);
        info!(path = %store.path().display(), "loading ledger");
        Ok(Self::new(
            Ledger::load(store),
            config.catalog()?,
            config.resolver(),
            config.settings(),
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerView> {
        self.updates.subscribe()
    }

    fn publish(&self, state: &LedgerState) -> LedgerView {
        let view = LedgerView::from(state);
        // Nobody listening is fine.
        let _ = self.updates.send(view.clone());
        view
    }
}

/// One play-through of a mini-game, tied to the coupon it can win.
pub struct GameSession {
    pub id: String,
    pub reward_id: RewardId,
    pub game: Game,
    /// Start order, oldest lowest.
    started: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerView {
    pub total_points: i64,
    pub won: Vec<RewardId>,
}

impl From<&LedgerState> for LedgerView {
    fn from(state: &LedgerState) -> Self {
        Self {
            total_points: state.total_points,
            won: state.won_rewards.iter().copied().collect(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/unlock", post(unlock))
        .route("/coupons", get(list_coupons))
        .route("/coupons/:id", get(get_coupon))
        .route("/coupons/:id/won", post(mark_won))
        .route("/points", post(add_points))
        .route("/points/spend", post(spend_points))
        .route("/games", post(start_game))
        .route("/games/:id", get(get_session))
        .route("/games/:id/action", post(play))
        .route("/ws/ledger", get(ws_handler))
        .route("/api/claim", get(claim))
        .with_state(state)
}

async fn authorized(state: &AppState, token: Option<&str>) -> bool {
    match token {
        Some(token) => state.tokens.read().await.contains(token),
        None => false,
    }
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

#[derive(Deserialize)]
struct UnlockRequest {
    passphrase: String,
    #[serde(default)]
    confirmed: bool,
}

#[derive(Serialize)]
struct UnlockResponse {
    token: String,
}

async fn unlock(State(state): State<AppState>, Json(payload): Json<UnlockRequest>) -> impl IntoResponse {
    if !payload.confirmed {
        return (StatusCode::BAD_REQUEST, "confirmation required").into_response();
    }
    if payload.passphrase.trim().to_lowercase() != state.settings.passphrase.to_lowercase() {
        warn!("rejected passphrase");
        return (StatusCode::UNAUTHORIZED, "wrong passphrase").into_response();
    }

    let token = Uuid::new_v4().to_string();
    state.tokens.write().await.insert(token.clone());
    info!("gate unlocked");
    (StatusCode::OK, Json(UnlockResponse { token })).into_response()
}

#[derive(Serialize)]
struct CouponsResponse {
    today: NaiveDate,
    total_points: i64,
    #[serde(flatten)]
    groups: RewardGroups,
}

async fn list_coupons(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&state, session_token(&headers)).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }

    let ledger = state.ledger.read().await;
    let response = CouponsResponse {
        today: state.resolver.today(),
        total_points: ledger.state().total_points,
        groups: group_rewards(&state.catalog, &state.resolver, ledger.state()),
    };
    (StatusCode::OK, Json(response)).into_response()
}

async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<RewardId>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorized(&state, session_token(&headers)).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }
    let Some(reward) = state.catalog.get(id) else {
        return (StatusCode::NOT_FOUND, "coupon not found").into_response();
    };

    let ledger = state.ledger.read().await;
    let card: RewardCard = card_for(reward, &state.resolver, ledger.state());
    (StatusCode::OK, Json(card)).into_response()
}

#[derive(Deserialize)]
struct WonRequest {
    /// Defaults to the coupon's catalog value.
    #[serde(default)]
    points: Option<u32>,
}

async fn mark_won(
    State(state): State<AppState>,
    Path(id): Path<RewardId>,
    headers: HeaderMap,
    Json(payload): Json<WonRequest>,
) -> impl IntoResponse {
    if !authorized(&state, session_token(&headers)).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }
    let Some(reward) = state.catalog.get(id) else {
        return (StatusCode::NOT_FOUND, "coupon not found").into_response();
    };

    let points = payload.points.unwrap_or(reward.points);
    let mut ledger = state.ledger.write().await;
    let view = state.publish(ledger.mark_won(id, points));
    drop(ledger);
    info!(coupon = id, points, "coupon won");

    (StatusCode::OK, Json(view)).into_response()
}

#[derive(Deserialize)]
struct PointsRequest {
    points: i64,
}

async fn add_points(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PointsRequest>,
) -> impl IntoResponse {
    if !authorized(&state, session_token(&headers)).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }

    let mut ledger = state.ledger.write().await;
    let view = state.publish(ledger.add_points(payload.points));
    (StatusCode::OK, Json(view)).into_response()
}

async fn spend_points(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PointsRequest>,
) -> impl IntoResponse {
    if !authorized(&state, session_token(&headers)).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }

    let mut ledger = state.ledger.write().await;
    let view = state.publish(ledger.subtract_points(payload.points));
    (StatusCode::OK, Json(view)).into_response()
}

#[derive(Deserialize)]
struct StartRequest {
    game: GameKind,
    seed: Option<u64>,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: String,
    reward_id: RewardId,
    outcome: Option<Outcome>,
    view: GameView,
}

impl From<&GameSession> for SessionResponse {
    fn from(session: &GameSession) -> Self {
        Self {
            session_id: session.id.clone(),
            reward_id: session.reward_id,
            outcome: session.game.outcome(),
            view: session.game.view(),
        }
    }
}

async fn start_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartRequest>,
) -> impl IntoResponse {
    if !authorized(&state, session_token(&headers)).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }
    let Some(reward) = state.catalog.for_game(payload.game) else {
        return (StatusCode::NOT_FOUND, "no coupon for this game").into_response();
    };
    if state.resolver.status_of(reward) != RewardStatus::Available {
        return (StatusCode::CONFLICT, "coupon not available").into_response();
    }

    let session = GameSession {
        id: Uuid::new_v4().to_string(),
        reward_id: reward.id,
        game: Game::new(payload.game, reward.points, payload.seed),
        started: state.started.fetch_add(1, Ordering::Relaxed),
    };
    let response = SessionResponse::from(&session);
    info!(session = %session.id, coupon = reward.id, game = ?payload.game, "game started");

    let mut sessions = state.sessions.write().await;
    while sessions.len() >= MAX_SESSIONS {
        let Some(oldest) = sessions
            .values()
            .min_by_key(|s| s.started)
            .map(|s| s.id.clone())
        else {
            break;
        };
        sessions.remove(&oldest);
        info!(session = %oldest, "abandoned game dropped");
    }
    sessions.insert(session.id.clone(), session);

    (StatusCode::CREATED, Json(response)).into_response()
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorized(&state, session_token(&headers)).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }

    let sessions = state.sessions.read().await;
    let Some(session) = sessions.get(&session_id) else {
        return (StatusCode::NOT_FOUND, "game not found").into_response();
    };
    (StatusCode::OK, Json(SessionResponse::from(session))).into_response()
}

#[derive(Serialize)]
struct PlayResponse {
    events: Vec<GameEvent>,
    #[serde(flatten)]
    session: SessionResponse,
    /// Present when this action credited the coupon.
    ledger: Option<LedgerView>,
}

#[derive(Debug, thiserror::Error)]
enum PlayError {
    #[error("game not found")]
    GameNotFound,
    #[error(transparent)]
    Rules(#[from] GameError),
}

impl IntoResponse for PlayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            PlayError::GameNotFound => StatusCode::NOT_FOUND,
            PlayError::Rules(GameError::Finished) => StatusCode::CONFLICT,
            PlayError::Rules(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

async fn play(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(action): Json<GameAction>,
) -> impl IntoResponse {
    if !authorized(&state, session_token(&headers)).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }

    match process_action(&state, &session_id, action).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn process_action(
    state: &AppState,
    session_id: &str,
    action: GameAction,
) -> Result<PlayResponse, PlayError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(session_id).ok_or(PlayError::GameNotFound)?;
    let events = apply_action(&mut session.game, action)?;

    let Some(outcome) = session.game.outcome() else {
        return Ok(PlayResponse {
            events,
            session: SessionResponse::from(&*session),
            ledger: None,
        });
    };

    // A settled game leaves the table; its last view goes out with this response.
    let Some(session) = sessions.remove(session_id) else {
        return Err(PlayError::GameNotFound);
    };
    drop(sessions);
    info!(session = %session.id, ?outcome, "game finished");

    let mut ledger_view = None;
    if let Outcome::Won { points } = outcome {
        let mut ledger = state.ledger.write().await;
        ledger_view = Some(state.publish(ledger.mark_won(session.reward_id, points)));
        info!(coupon = session.reward_id, points, "coupon won");
    }

    Ok(PlayResponse {
        events,
        session: SessionResponse::from(&session),
        ledger: ledger_view,
    })
}

#[derive(Deserialize)]
struct WsParams {
    token: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> impl IntoResponse {
    if !authorized(&state, params.token.as_deref()).await {
        return (StatusCode::UNAUTHORIZED, "session token required").into_response();
    }
    ws.on_upgrade(move |socket| handle_ledger_socket(socket, state))
}

/// Sends the current ledger, then every change until the client goes away.
async fn handle_ledger_socket(stream: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = stream.split();
    let mut updates = state.subscribe();

    let snapshot = LedgerView::from(state.ledger.read().await.state());
    let Ok(text) = serde_json::to_string(&snapshot) else {
        return;
    };
    if sender.send(Message::Text(text)).await.is_err() {
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let view = match updates.recv().await {
                Ok(view) => view,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "ledger subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Ok(text) = serde_json::to_string(&view) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

#[derive(Deserialize)]
struct ClaimParams {
    message: Option<String>,
}

/// Redirects to a WhatsApp chat pre-filled with `message`.
async fn claim(State(state): State<AppState>, Query(params): Query<ClaimParams>) -> impl IntoResponse {
    let Some(phone) = state.settings.whatsapp_phone.as_deref() else {
        warn!("claim requested but no phone configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Whatsapp phone is not set" })),
        )
            .into_response();
    };
    let Some(message) = params.message.filter(|m| !m.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Message is required" })),
        )
            .into_response();
    };

    match claim_url(phone, &message) {
        Ok(url) => Redirect::temporary(url.as_str()).into_response(),
        Err(err) => {
            warn!("bad claim url: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Whatsapp phone is invalid" })),
            )
                .into_response()
        }
    }
}

fn claim_url(phone: &str, message: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse("https://wa.me/")?.join(phone)?;
    url.query_pairs_mut().append_pair("text", message);
    Ok(url)
}
