use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use hilo_protocol::*;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

mod config;
mod game;
mod gateway;
mod reward;
mod scheduler;

use config::{GameConfig, ServerConfig};
use game::{Game, SharedGame};
use reward::RewardNotifier;

#[derive(Clone)]
struct AppState {
    game: SharedGame,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let server_config = ServerConfig::from_env();
    let game = Arc::new(Mutex::new(Game::new(
        GameConfig::default(),
        RewardNotifier::new(&server_config.reward_base_url),
    )));
    let app = router(AppState { game });

    let addr = format!("0.0.0.0:{}", server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "hilo server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    // A wrong method on a known path answers 404 like any other miss.
    Router::new()
        .route("/ws", get(ws_handler).fallback(fallback_404))
        .route("/notify", post(notify_handler).fallback(fallback_404))
        .fallback(fallback_404)
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (tx_out, mut rx_out) = mpsc::unbounded_channel::<ServerToClient>();

    let write_task = tokio::spawn(async move {
        while let Some(msg) = rx_out.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let session_id = Uuid::new_v4();
    {
        let mut g = state.game.lock();
        g.gateway.attach(session_id, tx_out.clone());
    }
    debug!(%session_id, "client connected");

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientToServer>(&text) {
                Ok(cmd) => route_cmd(cmd, &state, session_id),
                Err(err) => debug!(%session_id, %err, "unreadable frame"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    drop_session(&state, session_id);
    write_task.abort();
}

fn route_cmd(cmd: ClientToServer, state: &AppState, session_id: Uuid) {
    match cmd {
        ClientToServer::Identify { user_id } => handle_identify(state, session_id, user_id),
        ClientToServer::Bet { bet, amount } => handle_bet(state, session_id, bet, amount),
    }
}

fn handle_identify(state: &AppState, session_id: Uuid, user_id: String) {
    let mut g = state.game.lock();

    // A session re-identifying under a new name gives up the old one, unless
    // another session still claims it.
    if let Some(previous) = g.gateway.identify(session_id, &user_id) {
        if previous != user_id && !g.gateway.has_player(&previous) {
            g.registry.leave(&previous);
        }
    }
    g.registry.join(&user_id);
    info!(%session_id, %user_id, players = g.registry.count(), "player identified");

    let count = g.registry.count();
    g.gateway.publish(ServerToClient::PlayerCount { count });

    let snapshot = g.snapshot();
    g.gateway.send_to_session(session_id, snapshot);
    g.gateway.send_to_session(
        session_id,
        ServerToClient::History(g.ledger.history_tail(g.config.history_broadcast)),
    );
    g.gateway.send_to_session(
        session_id,
        ServerToClient::Leaderboard {
            entries: g.ledger.top_streaks(g.config.leaderboard_cap),
        },
    );

    scheduler::maybe_start(&state.game, &mut g);
}

fn handle_bet(state: &AppState, session_id: Uuid, bet: String, amount: u64) {
    let mut g = state.game.lock();
    let Some(player_id) = g.gateway.player_of(session_id) else {
        debug!(%session_id, "bet from unidentified session");
        return;
    };
    match g.accept_bet(&player_id, &bet, amount) {
        Ok(accepted) => {
            debug!(%player_id, side = %accepted.side, amount, "bet placed");
            g.gateway
                .send_to_session(session_id, ServerToClient::BetOk { bet, amount });
        }
        Err(reason) => debug!(%player_id, %reason, "bet rejected"),
    }
}

fn drop_session(state: &AppState, session_id: Uuid) {
    let mut g = state.game.lock();
    if let Some(session) = g.gateway.detach(session_id) {
        if let Some(player_id) = session.player_id {
            // The player only leaves with their last session.
            if !g.gateway.has_player(&player_id) && g.registry.leave(&player_id) {
                info!(%player_id, players = g.registry.count(), "player disconnected");
                let count = g.registry.count();
                g.gateway.publish(ServerToClient::PlayerCount { count });
            }
        }
    }
    debug!(%session_id, "client disconnected");
}

#[derive(Debug, Deserialize)]
struct NotifyBody {
    #[serde(rename = "userId")]
    user_id: String,
    message: String,
    #[serde(rename = "newScore")]
    new_score: i64,
}

/// Relay endpoint for the score service: forwards a message to every session
/// of one player. Always answers ok, whether or not the player is connected.
async fn notify_handler(
    State(state): State<AppState>,
    Json(body): Json<NotifyBody>,
) -> impl IntoResponse {
    {
        let g = state.game.lock();
        g.gateway.send_to_player(
            &body.user_id,
            ServerToClient::Notify {
                message: body.message,
                new_score: body.new_score,
            },
        );
    }
    Json(json!({ "ok": true }))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
