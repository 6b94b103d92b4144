//! Websocket transport for the agent server
//!
//! Each accepted websocket runs [`serve_connection`] as its own task. The
//! loop suspends only while waiting for the next frame or while writing a
//! reply; messages of one connection are handled strictly in order.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use tracing::{error, info, instrument, warn};

use crate::agents::AgentFactory;
use crate::config::Config;
use crate::protocol::{Connection, ProtocolError};
use crate::session::SessionRegistry;

/// Transport-independent view of an inbound websocket frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close,
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::Text(text),
            Message::Binary(bytes) => Frame::Binary(bytes),
            Message::Ping(_) => Frame::Ping,
            Message::Pong(_) => Frame::Pong,
            Message::Close(_) => Frame::Close,
        }
    }
}

/// State shared by every connection of one server
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub agents: Arc<AgentFactory>,
}

impl AppState {
    pub fn new(agents: AgentFactory) -> Self {
        Self { registry: Arc::new(SessionRegistry::new()), agents: Arc::new(agents) }
    }

    pub fn connection(&self) -> Connection {
        Connection::new(Arc::clone(&self.registry), Arc::clone(&self.agents))
    }
}

/// Drive one connection until the peer closes it or the transport fails
///
/// Messages that cannot be handled are logged and dropped; the loop keeps
/// going. Sessions started through the connection are removed on exit.
#[instrument(skip_all, fields(connection = %connection.id()))]
pub async fn serve_connection<S, E, K>(mut connection: Connection, inbound: S, outbound: K)
where
    S: Stream<Item = Result<Frame, E>>,
    E: std::fmt::Display,
    K: Sink<String>,
    K::Error: std::fmt::Display,
{
    info!("Start listening");
    let mut inbound = std::pin::pin!(inbound);
    let mut outbound = std::pin::pin!(outbound);

    while let Some(frame) = inbound.next().await {
        let text = match frame {
            Ok(Frame::Text(text)) => text,
            Ok(Frame::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => {
                    error!("Binary frame is not UTF-8, closing: {}", err);
                    break;
                }
            },
            Ok(Frame::Ping | Frame::Pong) => continue,
            Ok(Frame::Close) => {
                info!("Connection closed");
                break;
            }
            Err(err) => {
                warn!("Transport error, closing: {}", err);
                break;
            }
        };

        info!("< {}", text);
        match connection.handle_text(&text) {
            Ok(Some(reply)) => {
                if let Err(err) = outbound.send(reply.clone()).await {
                    warn!("Failed to send reply, closing: {}", err);
                    break;
                }
                info!("> {}", reply);
            }
            Ok(None) => {}
            Err(err @ (ProtocolError::Json(_) | ProtocolError::UnknownType(_) | ProtocolError::Syntax(_))) => {
                error!("{}", err);
            }
            Err(err) => warn!("Message rejected: {}", err),
        }
    }

    connection.close();
    info!("Exit handler");
}

/// Build the router serving the websocket endpoint at `/`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    let inbound = stream.map(|message| message.map(Frame::from));
    let outbound = sink.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text))));

    serve_connection(state.connection(), inbound, outbound).await;
}

/// Bind the listen address and serve until ctrl+c
///
/// # Errors
///
/// Returns an error if the address cannot be parsed or bound.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let addr: SocketAddr = config.listen_addr.parse()?;
    let agents = AgentFactory::new(config.agent, config.exhaustive_limit, config.seed);
    let state = AppState::new(agents);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Running on ws://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl+c: {}", err);
        future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use futures::channel::mpsc;
    use futures::stream;
    use games_dotsboxes::{Coordinate, DotsAndBoxes, Orientation};
    use serde_json::Value;

    fn state() -> AppState {
        AppState::new(AgentFactory::new(AgentKind::Minimax, 8, Some(9)))
    }

    fn text(message: &str) -> Result<Frame, std::io::Error> {
        Ok(Frame::Text(message.to_string()))
    }

    async fn run_frames(state: &AppState, frames: Vec<Result<Frame, std::io::Error>>) -> Vec<String> {
        let (tx, rx) = mpsc::unbounded::<String>();
        serve_connection(state.connection(), stream::iter(frames), tx).await;
        rx.collect().await
    }

    #[tokio::test]
    async fn test_opening_exchange() {
        let state = state();
        let replies = run_frames(
            &state,
            vec![
                text(r#"{"type":"start","game":"g","player":2,"grid":[2,2],"timelimit":0.5}"#),
                text(r#"{"type":"action","game":"g","location":[0,0],"orientation":"h","player":1,"nextplayer":2}"#),
            ],
        )
        .await;

        assert_eq!(replies.len(), 1);
        let reply: Value = serde_json::from_str(&replies[0]).unwrap();
        let orientation: Orientation = serde_json::from_value(reply["orientation"].clone()).unwrap();
        let coordinate = Coordinate::new(
            reply["location"][0].as_u64().unwrap() as usize,
            reply["location"][1].as_u64().unwrap() as usize,
            orientation,
        );
        let action = DotsAndBoxes::new(2, 2).unwrap().encode(coordinate).unwrap();
        assert_ne!(action, 0);

        // The stream ended, so the session went away with the connection.
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_bad_messages_are_dropped() {
        let state = state();
        let replies = run_frames(
            &state,
            vec![
                text("{not json"),
                text(r#"{"type":"chat","game":"g"}"#),
                text(r#"{"type":"action","game":"unknown","location":[0,0],"orientation":"h","player":1,"nextplayer":2}"#),
                Ok(Frame::Ping),
                text(r#"{"type":"start","game":"g","player":1,"grid":[1,1],"timelimit":0.5}"#),
            ],
        )
        .await;

        // Only the start as first player produces a reply.
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with(r#"{"type":"action""#));
    }

    #[tokio::test]
    async fn test_binary_text_is_accepted() {
        let state = state();
        let start = r#"{"type":"start","game":"g","player":1,"grid":[1,1],"timelimit":0.5}"#;
        let replies = run_frames(&state, vec![Ok(Frame::Binary(start.as_bytes().to_vec()))]).await;

        assert_eq!(replies.len(), 1);
    }

    #[tokio::test]
    async fn test_loop_stops_on_close_and_errors() {
        let state = state();
        let start = r#"{"type":"start","game":"g","player":1,"grid":[1,1],"timelimit":0.5}"#;

        let replies = run_frames(&state, vec![Ok(Frame::Close), text(start)]).await;
        assert!(replies.is_empty());

        let broken = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let replies = run_frames(&state, vec![Err(broken), text(start)]).await;
        assert!(replies.is_empty());

        let replies = run_frames(&state, vec![Ok(Frame::Binary(vec![0xff, 0xfe])), text(start)]).await;
        assert!(replies.is_empty());

        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_shared_across_connections() {
        let state = state();
        let mut other = state.connection();
        other
            .handle_text(r#"{"type":"start","game":"g","player":2,"grid":[2,2],"timelimit":0.5}"#)
            .unwrap();

        // A second connection cannot start the same game.
        let replies = run_frames(
            &state,
            vec![text(r#"{"type":"start","game":"g","player":1,"grid":[2,2],"timelimit":0.5}"#)],
        )
        .await;

        assert!(replies.is_empty());
        assert!(state.registry.contains("g"));
    }
}
