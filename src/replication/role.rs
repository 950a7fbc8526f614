//! Session roles

use crate::engine::Player;

/// Which side of the session this process plays. Fixed for the lifetime of
/// a session: the Host owns every authoritative field of the replicated
/// snapshot, the Guest may only ever fill in `move_request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    /// Fixed player assignment: Host is player one, Guest is player two.
    pub fn player(self) -> Player {
        match self {
            Role::Host => Player::One,
            Role::Guest => Player::Two,
        }
    }

    pub fn is_host(self) -> bool {
        matches!(self, Role::Host)
    }
}
