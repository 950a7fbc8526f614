//! Replication layer — Host-authoritative sync over a polled shared store
//!
//! One process is the Host and owns every authoritative field of the
//! replicated [`GameSnapshot`]; the Guest's only write is the
//! `move_request` field. Convergence comes from polling and last-write
//! wins, not from store-side ordering guarantees.

pub mod coordinator;
pub mod event;
pub mod role;
pub mod snapshot;

pub use coordinator::ReplicationCoordinator;
pub use event::{PlayerInput, UiEvent};
pub use role::Role;
pub use snapshot::GameSnapshot;
