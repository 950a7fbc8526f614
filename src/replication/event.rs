//! Channel message types between the coordinator and the presentation layer

use crate::engine::{Move, Player};

/// Player actions delivered to the coordinator's run loop. Pointer-move
/// preview is presentation-only and never reaches the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// The local player selected a column.
    ColumnSelected(usize),
    /// The drop animation for the most recent move finished playing.
    AnimationComplete,
    /// Replay requested from the game-over screen.
    Reset,
}

/// Events the coordinator emits for the presentation layer. Each
/// `AnimateDrop` is emitted exactly once per distinct move; the receiver
/// owes an [`PlayerInput::AnimationComplete`] once the effect resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    AnimateDrop(Move),
    TurnChanged(Player),
    GameOver { winner: Option<Player> },
}
