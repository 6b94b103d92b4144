//! JSON message protocol of the dots and boxes web interface
//!
//! Each inbound text message is one JSON object whose `type` is `start`,
//! `action` or `end`. The only reply this side ever sends is an `action`
//! carrying our move, and at most one reply is produced per inbound message.
//!
//! ```text
//! < {"type":"start","game":"g1","player":2,"grid":[2,2],"timelimit":0.5}
//! < {"type":"action","game":"g1","location":[0,0],"orientation":"h","player":1,"nextplayer":2}
//! > {"type":"action","location":[0,1],"orientation":"h"}
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use games_dotsboxes::{Coordinate, DotsAndBoxes, Orientation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::agents::AgentFactory;
use crate::session::{SessionConfig, SessionError, SessionHandle, SessionRegistry, FIRST_PLAYER};

/// Messages sent by the game server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inbound {
    Start {
        game: String,
        player: u8,
        grid: (usize, usize),
        timelimit: f64,
    },
    Action {
        game: String,
        location: (usize, usize),
        orientation: Orientation,
        player: u8,
        nextplayer: u8,
    },
    End {
        game: String,
        location: Option<(usize, usize)>,
        orientation: Option<Orientation>,
        player: Option<u8>,
    },
}

impl Inbound {
    /// Session key the message refers to
    pub fn game(&self) -> &str {
        match self {
            Inbound::Start { game, .. } | Inbound::Action { game, .. } | Inbound::End { game, .. } => game,
        }
    }
}

/// Messages sent back to the game server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Action {
        location: (usize, usize),
        orientation: Orientation,
    },
}

impl From<Coordinate> for Outbound {
    fn from(coordinate: Coordinate) -> Self {
        Outbound::Action {
            location: (coordinate.row, coordinate.col),
            orientation: coordinate.orientation,
        }
    }
}

/// Reasons an inbound message was dropped without a reply
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("Unknown message type {0:?}")]
    UnknownType(String),
    #[error("Malformed message: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Parse one inbound text message
///
/// # Errors
///
/// Returns `ProtocolError::Json` for text that is not JSON,
/// `ProtocolError::UnknownType` for a missing or unrecognized `type`, and
/// `ProtocolError::Syntax` when a known message lacks fields or has the
/// wrong field types.
pub fn parse_message(text: &str) -> Result<Inbound, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Json)?;

    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
    if !matches!(kind, "start" | "action" | "end") {
        return Err(ProtocolError::UnknownType(kind.to_string()));
    }

    serde_json::from_value(value).map_err(ProtocolError::Syntax)
}

/// Per-connection protocol state machine
///
/// Sessions started through a connection belong to it: only that connection
/// may send them moves or end them, and they are removed from the shared
/// registry when the connection closes.
pub struct Connection {
    id: Uuid,
    registry: Arc<SessionRegistry>,
    agents: Arc<AgentFactory>,
    owned: BTreeSet<String>,
}

impl Connection {
    pub fn new(registry: Arc<SessionRegistry>, agents: Arc<AgentFactory>) -> Self {
        Self { id: Uuid::new_v4(), registry, agents, owned: BTreeSet::new() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Session keys started through this connection and still running
    pub fn owned_sessions(&self) -> impl Iterator<Item = &str> {
        self.owned.iter().map(String::as_str)
    }

    /// Handle one raw text message, returning the serialized reply if any
    ///
    /// # Errors
    ///
    /// Any error means the message was dropped; the connection stays usable.
    pub fn handle_text(&mut self, text: &str) -> Result<Option<String>, ProtocolError> {
        let message = parse_message(text)?;
        match self.handle(message)? {
            Some(reply) => Ok(Some(serde_json::to_string(&reply).map_err(ProtocolError::Json)?)),
            None => Ok(None),
        }
    }

    /// Handle one parsed message
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Session` when the session layer rejects the
    /// message; no session changes state in that case.
    pub fn handle(&mut self, message: Inbound) -> Result<Option<Outbound>, ProtocolError> {
        match message {
            Inbound::Start { game, player, grid, timelimit } => {
                let config = SessionConfig { player, num_rows: grid.0, num_cols: grid.1, time_limit: timelimit };
                self.on_start(game, config)
            }
            Inbound::Action { game, location, orientation, player, nextplayer } => {
                let coordinate = Coordinate::new(location.0, location.1, orientation);
                self.on_action(&game, coordinate, player, nextplayer)
            }
            Inbound::End { game, location, orientation, player } => {
                let last_move = match (location, orientation, player) {
                    (Some((row, col)), Some(orientation), Some(player)) => {
                        Some((Coordinate::new(row, col, orientation), player))
                    }
                    _ => None,
                };
                self.on_end(&game, last_move)
            }
        }
    }

    /// Remove every session this connection started
    pub fn close(&mut self) {
        for key in std::mem::take(&mut self.owned) {
            if self.registry.remove(&key) {
                info!(game = %key, "Dropping session of closed connection");
            }
        }
    }

    fn on_start(&mut self, key: String, config: SessionConfig) -> Result<Option<Outbound>, ProtocolError> {
        config.validate()?;
        let we_start = config.player == FIRST_PLAYER;

        let agent = self.agents.create::<DotsAndBoxes>();
        let handle = self.registry.create(&key, config, agent)?;
        self.owned.insert(key);

        if !we_start {
            debug!("Waiting for the opponent");
            return Ok(None);
        }

        let mut session = handle.lock().unwrap();
        let coordinate = session.next_action()?;
        Ok(Some(coordinate.into()))
    }

    fn on_action(
        &mut self,
        key: &str,
        coordinate: Coordinate,
        player: u8,
        nextplayer: u8,
    ) -> Result<Option<Outbound>, ProtocolError> {
        let handle = self.owned_session(key)?;
        let mut session = handle.lock().unwrap();

        session.register_action(coordinate, player)?;
        if nextplayer != session.config().player {
            return Ok(None);
        }
        if session.is_over() {
            info!(game = %key, "Game over");
            return Ok(None);
        }

        let coordinate = session.next_action()?;
        Ok(Some(coordinate.into()))
    }

    fn on_end(
        &mut self,
        key: &str,
        last_move: Option<(Coordinate, u8)>,
    ) -> Result<Option<Outbound>, ProtocolError> {
        let handle = self.owned_session(key)?;
        handle.lock().unwrap().end_game(last_move)?;

        self.registry.remove(key);
        self.owned.remove(key);
        Ok(None)
    }
}

impl Connection {
    /// Look up a session started through this connection
    fn owned_session(&self, key: &str) -> Result<SessionHandle, SessionError> {
        if self.owned.contains(key) {
            return self.registry.get(key);
        }
        if self.registry.contains(key) {
            return Err(SessionError::NotOwner(key.to_string()));
        }
        Err(SessionError::Unknown(key.to_string()))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use engine_core::Game;

    fn connection(registry: &Arc<SessionRegistry>) -> Connection {
        let agents = Arc::new(AgentFactory::new(AgentKind::Random, 8, Some(5)));
        Connection::new(Arc::clone(registry), agents)
    }

    fn reply_coordinate(reply: &Outbound) -> Coordinate {
        match reply {
            Outbound::Action { location, orientation } => Coordinate::new(location.0, location.1, *orientation),
        }
    }

    #[test]
    fn test_parse_messages() {
        let start = parse_message(r#"{"type":"start","game":"g","player":1,"grid":[2,3],"timelimit":1}"#).unwrap();
        assert_eq!(
            start,
            Inbound::Start { game: "g".to_string(), player: 1, grid: (2, 3), timelimit: 1.0 }
        );

        let end = parse_message(r#"{"type":"end","game":"g"}"#).unwrap();
        assert_eq!(end.game(), "g");
        assert_eq!(
            end,
            Inbound::End { game: "g".to_string(), location: None, orientation: None, player: None }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_message("not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(
            parse_message(r#"{"type":"resign","game":"g"}"#),
            Err(ProtocolError::UnknownType(kind)) if kind == "resign"
        ));
        assert!(matches!(parse_message(r#"{"game":"g"}"#), Err(ProtocolError::UnknownType(_))));
        assert!(matches!(
            parse_message(r#"{"type":"action","game":"g","location":[0,0],"orientation":"d","player":1,"nextplayer":2}"#),
            Err(ProtocolError::Syntax(_))
        ));
        assert!(matches!(parse_message(r#"{"type":"start","game":"g"}"#), Err(ProtocolError::Syntax(_))));
    }

    #[test]
    fn test_outbound_wire_format() {
        let reply = Outbound::from(Coordinate::new(1, 2, Orientation::Vertical));
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"type":"action","location":[1,2],"orientation":"v"}"#
        );
    }

    #[test]
    fn test_second_player_replies_once_with_legal_move() {
        let registry = Arc::new(SessionRegistry::new());
        let mut conn = connection(&registry);

        let start = conn
            .handle_text(r#"{"type":"start","game":"g","player":2,"grid":[2,2],"timelimit":0.5}"#)
            .unwrap();
        assert_eq!(start, None);

        let reply = conn
            .handle_text(r#"{"type":"action","game":"g","location":[0,0],"orientation":"h","player":1,"nextplayer":2}"#)
            .unwrap()
            .unwrap();
        let reply: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply["type"], "action");

        let row = reply["location"][0].as_u64().unwrap() as usize;
        let col = reply["location"][1].as_u64().unwrap() as usize;
        let orientation: Orientation = serde_json::from_value(reply["orientation"].clone()).unwrap();
        let game = DotsAndBoxes::new(2, 2).unwrap();
        let action = game.encode(Coordinate::new(row, col, orientation)).unwrap();

        // Legal in the position after the opponent's opening, and now applied.
        assert_ne!(action, 0);
        let handle = registry.get("g").unwrap();
        let session = handle.lock().unwrap();
        assert!(session.state().is_drawn(action));
        assert_eq!(game.legal_actions(session.state()).len(), 10);
    }

    #[test]
    fn test_first_player_moves_on_start() {
        let registry = Arc::new(SessionRegistry::new());
        let mut conn = connection(&registry);

        let reply = conn
            .handle(Inbound::Start { game: "g".to_string(), player: 1, grid: (1, 1), timelimit: 0.5 })
            .unwrap()
            .unwrap();

        let coordinate = reply_coordinate(&reply);
        let handle = registry.get("g").unwrap();
        let session = handle.lock().unwrap();
        let action = session.game().encode(coordinate).unwrap();
        assert!(session.state().is_drawn(action));
        assert!(!session.is_our_turn());
    }

    #[test]
    fn test_no_reply_when_opponent_moves_again() {
        let registry = Arc::new(SessionRegistry::new());
        let mut conn = connection(&registry);
        conn.handle_text(r#"{"type":"start","game":"g","player":2,"grid":[1,1],"timelimit":0.5}"#)
            .unwrap();

        let reply = conn
            .handle_text(r#"{"type":"action","game":"g","location":[0,0],"orientation":"h","player":1,"nextplayer":1}"#)
            .unwrap();

        assert_eq!(reply, None);
    }

    #[test]
    fn test_duplicate_start_rejected() {
        let registry = Arc::new(SessionRegistry::new());
        let mut first = connection(&registry);
        let mut second = connection(&registry);
        let start = r#"{"type":"start","game":"g","player":2,"grid":[2,2],"timelimit":0.5}"#;

        first.handle_text(start).unwrap();
        let result = second.handle_text(start);

        assert!(matches!(result, Err(ProtocolError::Session(SessionError::Duplicate(_)))));
        assert_eq!(second.owned_sessions().count(), 0);
        assert_eq!(first.owned_sessions().collect::<Vec<_>>(), vec!["g"]);
    }

    #[test]
    fn test_action_before_start_rejected() {
        let registry = Arc::new(SessionRegistry::new());
        let mut conn = connection(&registry);

        let result = conn.handle_text(
            r#"{"type":"action","game":"nope","location":[0,0],"orientation":"h","player":1,"nextplayer":2}"#,
        );

        assert!(matches!(result, Err(ProtocolError::Session(SessionError::Unknown(_)))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_start_creates_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let mut conn = connection(&registry);

        let result = conn.handle_text(r#"{"type":"start","game":"g","player":3,"grid":[2,2],"timelimit":0.5}"#);

        assert!(matches!(result, Err(ProtocolError::Session(SessionError::Configuration(_)))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_end_on_non_terminal_state() {
        let registry = Arc::new(SessionRegistry::new());
        let mut conn = connection(&registry);
        conn.handle_text(r#"{"type":"start","game":"g","player":2,"grid":[2,2],"timelimit":0.5}"#)
            .unwrap();

        let result = conn.handle_text(r#"{"type":"end","game":"g","location":[0,0],"orientation":"h","player":1}"#);

        assert!(matches!(result, Err(ProtocolError::Session(SessionError::NotTerminal(_)))));
        assert!(registry.contains("g"));
    }

    #[test]
    fn test_full_game_ends_session() {
        let registry = Arc::new(SessionRegistry::new());
        let mut conn = connection(&registry);

        // 1x1 board, we are player 1: we draw two of the four lines.
        let first = conn
            .handle(Inbound::Start { game: "g".to_string(), player: 1, grid: (1, 1), timelimit: 0.5 })
            .unwrap()
            .unwrap();
        let first = reply_coordinate(&first);

        let game = DotsAndBoxes::new(1, 1).unwrap();
        let free = |drawn: &[Coordinate]| {
            (0..4)
                .map(|action| game.decode(action).unwrap())
                .find(|coordinate| !drawn.contains(coordinate))
                .unwrap()
        };

        let theirs = free(&[first]);
        let second = conn
            .handle(Inbound::Action {
                game: "g".to_string(),
                location: (theirs.row, theirs.col),
                orientation: theirs.orientation,
                player: 2,
                nextplayer: 1,
            })
            .unwrap()
            .unwrap();
        let second = reply_coordinate(&second);

        let last = free(&[first, theirs, second]);
        let reply = conn
            .handle(Inbound::End {
                game: "g".to_string(),
                location: Some((last.row, last.col)),
                orientation: Some(last.orientation),
                player: Some(2),
            })
            .unwrap();

        assert_eq!(reply, None);
        assert!(registry.is_empty());
        assert_eq!(conn.owned_sessions().count(), 0);
    }

    #[test]
    fn test_foreign_session_is_off_limits() {
        let registry = Arc::new(SessionRegistry::new());
        let mut owner = connection(&registry);
        let mut intruder = connection(&registry);
        owner
            .handle_text(r#"{"type":"start","game":"g","player":2,"grid":[1,1],"timelimit":0.5}"#)
            .unwrap();

        let result = intruder.handle_text(
            r#"{"type":"action","game":"g","location":[0,0],"orientation":"h","player":1,"nextplayer":2}"#,
        );
        assert!(matches!(result, Err(ProtocolError::Session(SessionError::NotOwner(key))) if key == "g"));

        let result = intruder.handle_text(r#"{"type":"end","game":"g"}"#);
        assert!(matches!(result, Err(ProtocolError::Session(SessionError::NotOwner(_)))));

        // Nothing moved and the session is still there for its owner.
        let handle = registry.get("g").unwrap();
        assert!(!handle.lock().unwrap().state().is_drawn(0));
        let reply = owner
            .handle_text(r#"{"type":"action","game":"g","location":[0,0],"orientation":"h","player":1,"nextplayer":2}"#)
            .unwrap();
        assert!(reply.is_some());

        drop(intruder);
        assert!(registry.contains("g"));
    }

    #[test]
    fn test_close_removes_owned_sessions() {
        let registry = Arc::new(SessionRegistry::new());
        let mut owner = connection(&registry);
        let mut other = connection(&registry);

        owner
            .handle_text(r#"{"type":"start","game":"a","player":2,"grid":[2,2],"timelimit":0.5}"#)
            .unwrap();
        other
            .handle_text(r#"{"type":"start","game":"b","player":2,"grid":[2,2],"timelimit":0.5}"#)
            .unwrap();
        assert_eq!(registry.len(), 2);

        drop(owner);

        assert!(!registry.contains("a"));
        assert!(registry.contains("b"));
        other.close();
        assert!(registry.is_empty());
    }
}
