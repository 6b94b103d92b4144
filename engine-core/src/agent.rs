//! Agent capability interface
//!
//! An agent is whatever decides moves for one seat at the table. The session
//! layer only ever asks it for a move or tells it about a move someone else
//! made; how it decides is its own business.

use crate::typed::{Action, Game, Player};

/// Move-selection capability bound to one player of a game
pub trait Agent<G: Game>: Send {
    /// Compute this agent's next action in `state`
    ///
    /// Called only when it is this agent's turn. The returned action is
    /// applied by the caller, not by the agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent cannot produce a move.
    fn step(&mut self, game: &G, state: &G::State) -> anyhow::Result<Action>;

    /// Notification that `player` applied `action`, producing `state`
    ///
    /// Purely informational; the default ignores it.
    fn inform_action(&mut self, _game: &G, _state: &G::State, _player: Player, _action: Action) {}
}

impl<G: Game, A: Agent<G> + ?Sized> Agent<G> for Box<A> {
    fn step(&mut self, game: &G, state: &G::State) -> anyhow::Result<Action> {
        (**self).step(game, state)
    }

    fn inform_action(&mut self, game: &G, state: &G::State, player: Player, action: Action) {
        (**self).inform_action(game, state, player, action)
    }
}
