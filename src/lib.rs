pub mod config;
pub mod engine;
pub mod error;
pub mod replication;
pub mod store;

pub use config::AppConfig;
pub use engine::{Board, BoardState, GameEngine, Move, Player, Slot};
pub use error::{DropfourError, Result};
pub use replication::{GameSnapshot, PlayerInput, ReplicationCoordinator, Role, UiEvent};
pub use store::{MemoryStore, SharedStore};
