//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, Stream, StreamExt,
};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Broadcaster, MatchCommand, MatchHandle, SessionId};
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::scheduler;
use crate::ws::protocol::{ClientMsg, ServerMsg};
use crate::ws::sessions::{OutboundRx, SessionRegistry};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session: SessionId = Uuid::new_v4();
    info!(session_id = %session, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    // Register before anything can be queued for this session
    let outbound = state.sessions.register(session);

    run_session(session, &state, ws_sink, ws_stream, outbound).await;

    // Cleanup on disconnect
    state.sessions.unregister(session);
    if !state.game.send(MatchCommand::Disconnect { session }).await {
        debug!(session_id = %session, "Match loop gone, skipping disconnect");
    }

    info!(session_id = %session, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session: SessionId,
    state: &AppState,
    mut ws_sink: SplitSink<WebSocket, Message>,
    ws_stream: SplitStream<WebSocket>,
    mut outbound: OutboundRx,
) {
    let rate_limiter = SessionRateLimiter::new(state.config.input_rate_limit);

    // Spawn writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(frame)).await {
                debug!(session_id = %session, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let end = read_frames(
        session,
        ws_stream,
        &state.sessions,
        &state.game,
        &rate_limiter,
        state.config.join_timeout,
    )
    .await;
    debug!(session_id = %session, reason = ?end, "Reader loop finished");

    // Abort writer task
    writer_handle.abort();
}

/// Why the reader loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Socket closed or errored
    Closed,
    /// No join before the deadline
    JoinTimeout,
    /// Match task is gone
    MatchGone,
}

/// Reader loop: WebSocket -> match loop
async fn read_frames<S>(
    session: SessionId,
    mut frames: S,
    sessions: &SessionRegistry,
    game: &MatchHandle,
    rate_limiter: &SessionRateLimiter,
    join_timeout: Duration,
) -> SessionEnd
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    // Connections that never join are closed after the deadline
    let (expired_tx, mut expired_rx) = oneshot::channel::<()>();
    let join_deadline = scheduler::after(join_timeout, move || {
        let _ = expired_tx.send(());
    });
    let mut joined = false;

    loop {
        tokio::select! {
            _ = &mut expired_rx, if !joined => {
                warn!(session_id = %session, "No join before deadline, closing");
                return SessionEnd::JoinTimeout;
            }
            next = frames.next() => {
                let Some(result) = next else { return SessionEnd::Closed };

                match result {
                    Ok(Message::Text(text)) => match route(session, &text, rate_limiter) {
                        Inbound::Forward(cmd) => {
                            if matches!(cmd, MatchCommand::Join { .. }) && !joined {
                                joined = true;
                                join_deadline.cancel();
                            }
                            if !game.send(cmd).await {
                                debug!(session_id = %session, "Match loop closed");
                                return SessionEnd::MatchGone;
                            }
                        }
                        Inbound::Reply(msg) => sessions.send_to(session, msg),
                        Inbound::Dropped => {}
                    },
                    Ok(Message::Binary(_)) => {
                        warn!(session_id = %session, "Received binary message, ignoring");
                    }
                    Ok(Message::Ping(_)) => {
                        debug!(session_id = %session, "Received ping");
                    }
                    Ok(Message::Pong(_)) => {
                        debug!(session_id = %session, "Received pong");
                    }
                    Ok(Message::Close(_)) => {
                        info!(session_id = %session, "Client initiated close");
                        return SessionEnd::Closed;
                    }
                    Err(e) => {
                        error!(session_id = %session, error = %e, "WebSocket error");
                        return SessionEnd::Closed;
                    }
                }
            }
        }
    }
}

/// What to do with one inbound text frame
#[derive(Debug)]
enum Inbound {
    /// Queue for the match loop
    Forward(MatchCommand),
    /// Answer the sender directly, the match never sees it
    Reply(ServerMsg),
    /// Over the rate limit
    Dropped,
}

fn route(session: SessionId, text: &str, rate_limiter: &SessionRateLimiter) -> Inbound {
    if !rate_limiter.check_input() {
        warn!(session_id = %session, "Rate limited input message");
        return Inbound::Dropped;
    }

    match serde_json::from_str::<ClientMsg>(text) {
        Ok(ClientMsg::Join { name }) => Inbound::Forward(MatchCommand::Join { session, name }),
        Ok(ClientMsg::Move { x, y }) if x.is_finite() && y.is_finite() => {
            Inbound::Forward(MatchCommand::Move { session, x, y })
        }
        Ok(ClientMsg::Move { .. }) => Inbound::Reply(ServerMsg::error(
            "bad_position",
            "coordinates must be finite",
        )),
        Ok(ClientMsg::Ping { t }) => Inbound::Reply(ServerMsg::Pong { t }),
        Err(e) => {
            warn!(session_id = %session, error = %e, "Failed to parse client message");
            Inbound::Reply(ServerMsg::error("bad_message", e.to_string()))
        }
    }
}
