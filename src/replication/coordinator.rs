//! Replication Coordinator — host-authoritative state sync over a polled store
//!
//! Reconciles one Host-owned `GameSnapshot` across two independently
//! polling processes with no transactional guarantees from the store.
//! The `run()` loop is a `tokio::select!` over the poll tick, the local
//! player-input channel and a shutdown signal; every operation completes
//! within one tick, so there are no internal suspension points to cancel.
//!
//! Per tick: read the shared snapshot; a Host holding a pending
//! `move_request` consumes it (clear first, then apply and publish) and
//! exits the tick early; otherwise the snapshot is adopted into the local
//! engine and a changed `last_move` triggers exactly one animation event.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::config::AppConfig;
use crate::engine::{GameEngine, Move, Player, Slot};
use crate::error::{DropfourError, Result};
use crate::store::SharedStore;

use super::event::{PlayerInput, UiEvent};
use super::role::Role;
use super::snapshot::GameSnapshot;

pub struct ReplicationCoordinator {
    engine: GameEngine,
    role: Role,
    store: Arc<dyn SharedStore>,
    store_key: String,
    poll_interval: Duration,
    events_tx: mpsc::Sender<UiEvent>,
    /// Animation dedup key — not game state.
    last_animated_move: Option<Move>,
    /// Gates the end-of-game transition to fire once, even though
    /// `game_ended` stays true across every subsequent poll.
    game_over_handled: bool,
    /// Last turn announced to the UI, so a steady state does not spam
    /// `TurnChanged` every tick.
    last_turn_emitted: Option<Player>,
    /// Guest-side guard: a move request is in the store awaiting the Host.
    pending_request: bool,
}

impl ReplicationCoordinator {
    pub fn new(
        role: Role,
        store: Arc<dyn SharedStore>,
        config: &AppConfig,
        events_tx: mpsc::Sender<UiEvent>,
    ) -> Self {
        Self {
            engine: GameEngine::new(config.board.cols, config.board.rows),
            role,
            store,
            store_key: config.replication.store_key.clone(),
            // tokio intervals reject a zero period, clamp misconfiguration
            // to the fastest sane cadence instead of panicking in run().
            poll_interval: Duration::from_millis(config.replication.poll_interval_ms.max(1)),
            events_tx,
            last_animated_move: None,
            game_over_handled: false,
            last_turn_emitted: None,
            pending_request: false,
        }
    }

    /// Session start. The Host seeds the store with an initial snapshot
    /// using create-if-absent semantics; a Guest adopts whatever snapshot
    /// is already published (or waits for the first poll if none is).
    pub async fn start_session(&mut self) -> Result<()> {
        match self.role {
            Role::Host => {
                let snapshot = GameSnapshot {
                    state: self.engine.state(),
                    last_move: None,
                    move_request: None,
                };
                self.store
                    .write(&self.store_key, snapshot.to_value()?, true)
                    .await?;
                info!(key = %self.store_key, "host seeded session snapshot");
            }
            Role::Guest => {
                if let Some(snapshot) = self.read_snapshot().await? {
                    self.engine.restore(snapshot.state);
                    info!(key = %self.store_key, "guest adopted existing session snapshot");
                }
            }
        }
        Ok(())
    }

    /// Main loop — polls the store on a fixed cadence and services local
    /// player input until shutdown.
    pub async fn run(
        mut self,
        mut input_rx: mpsc::Receiver<PlayerInput>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(role = ?self.role, "replication loop started");
        loop {
            tokio::select! {
                Some(input) = input_rx.recv() => {
                    let outcome = match input {
                        PlayerInput::ColumnSelected(col) => self.handle_column_select(col).await,
                        PlayerInput::AnimationComplete => self.handle_animation_complete().await,
                        PlayerInput::Reset => self.handle_reset().await,
                    };
                    if let Err(e) = outcome {
                        warn!(role = ?self.role, error = %e, "player input handling failed");
                    }
                }

                _ = tick.tick() => {
                    // A failed read degrades to "wait for the next tick";
                    // mutations are idempotent to re-observe.
                    if let Err(e) = self.poll_tick().await {
                        warn!(role = ?self.role, error = %e, "poll tick failed");
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!(role = ?self.role, "replication loop shutting down");
                    break;
                }
            }
        }
    }

    /// One poll of the shared store. Public so tests and cooperative
    /// schedulers can drive the protocol tick by tick.
    pub async fn poll_tick(&mut self) -> Result<()> {
        let Some(snapshot) = self.read_snapshot().await? else {
            trace!(role = ?self.role, "shared snapshot absent, skipping tick");
            return Ok(());
        };

        if self.role.is_host() {
            if let Some(col) = snapshot.move_request {
                // Consume and exit early: the host's local state is already
                // authoritative, adopting the stale snapshot on top of the
                // fresh placement would tear it.
                return self.consume_move_request(snapshot, col).await;
            }
        }

        self.adopt(snapshot).await
    }

    /// Host-only: apply a pending Guest move request. The request slot is
    /// cleared in the store *before* processing so a slow tick can never
    /// consume the same request twice.
    async fn consume_move_request(&mut self, mut snapshot: GameSnapshot, col: usize) -> Result<()> {
        debug!(col, "host consuming move request");
        snapshot.move_request = None;
        self.publish(&snapshot).await?;

        // Re-validate turn ownership: the request's presence alone proves
        // nothing, a desynchronized guest cannot move out of turn.
        if self.engine.current_player() != Role::Guest.player() {
            debug!(col, "move request dropped: not the guest's turn");
            return Ok(());
        }

        match self.engine.place_token(col) {
            Some(mv) => {
                let published = GameSnapshot {
                    state: self.engine.state(),
                    last_move: Some(mv),
                    move_request: None,
                };
                self.publish(&published).await?;
                debug!(col = mv.col, row = mv.row, "host applied guest move");
            }
            None => {
                debug!(col, "move request dropped: engine rejected placement");
            }
        }
        Ok(())
    }

    /// Import the published snapshot into the local engine and derive the
    /// UI-facing effects: at most one animation per distinct move, turn
    /// announcements, and a once-only game-over transition.
    async fn adopt(&mut self, snapshot: GameSnapshot) -> Result<()> {
        // A snapshot with no last move is a fresh session (initial seed or
        // a host replay reset): drop the per-session locals so the next
        // game animates and announces from scratch.
        if snapshot.last_move.is_none() && self.last_animated_move.is_some() {
            debug!(role = ?self.role, "fresh session snapshot observed, clearing locals");
            self.last_animated_move = None;
            self.game_over_handled = false;
            self.last_turn_emitted = None;
        }

        if snapshot.move_request.is_none() {
            self.pending_request = false;
        }

        self.engine.restore(snapshot.state);

        if let Some(mv) = snapshot.last_move {
            if self.last_animated_move != Some(mv) {
                self.engine.begin_animation();
                self.last_animated_move = Some(mv);
                self.send_event(UiEvent::AnimateDrop(mv)).await?;
            }
        }

        if !self.engine.is_animating() && !self.engine.game_ended() {
            let player = self.engine.current_player();
            if self.last_turn_emitted != Some(player) {
                self.last_turn_emitted = Some(player);
                self.send_event(UiEvent::TurnChanged(player)).await?;
            }
        }

        if self.engine.game_ended() && !self.engine.is_animating() && !self.game_over_handled {
            self.game_over_handled = true;
            let winner = if self.engine.win_line().is_empty() {
                None
            } else {
                Some(self.engine.current_player())
            };
            info!(role = ?self.role, ?winner, "game over");
            self.send_event(UiEvent::GameOver { winner }).await?;
        }

        Ok(())
    }

    /// Local column selection. Turn ownership is decided from the *shared*
    /// snapshot, never from a local assumption; everything invalid is a
    /// silent no-op.
    pub async fn handle_column_select(&mut self, col: usize) -> Result<()> {
        if self.engine.game_ended() || self.engine.is_animating() {
            return Ok(());
        }
        let Some(snapshot) = self.read_snapshot().await? else {
            return Ok(());
        };
        if snapshot.state.current_player != self.my_player() {
            debug!(role = ?self.role, col, "column select ignored: not this player's turn");
            return Ok(());
        }

        match self.role {
            Role::Host => {
                if let Some(mv) = self.engine.place_token(col) {
                    let published = GameSnapshot {
                        state: self.engine.state(),
                        last_move: Some(mv),
                        move_request: None,
                    };
                    self.publish(&published).await?;
                    debug!(col = mv.col, row = mv.row, "host placed and published");
                }
            }
            Role::Guest => {
                if self.pending_request {
                    debug!(col, "column select ignored: move request already outstanding");
                    return Ok(());
                }
                // Merge the request into the snapshot just read; the board
                // and turn fields pass through untouched — the guest never
                // writes authoritative state.
                let requested = GameSnapshot {
                    move_request: Some(col),
                    ..snapshot
                };
                self.publish(&requested).await?;
                self.pending_request = true;
                debug!(col, "guest published move request");
            }
        }
        Ok(())
    }

    /// The drop animation finished: release the engine lock, and as Host
    /// republish so the turn fields the UI derives from are current.
    pub async fn handle_animation_complete(&mut self) -> Result<()> {
        self.engine.finish_animation();
        if self.role.is_host() {
            let published = GameSnapshot {
                state: self.engine.state(),
                last_move: self.last_animated_move,
                move_request: None,
            };
            self.publish(&published).await?;
        }
        Ok(())
    }

    /// Replay from the game-over screen. Only the Host publishes the fresh
    /// snapshot; the Guest clears its per-session locals and adopts the
    /// reset on a later poll.
    pub async fn handle_reset(&mut self) -> Result<()> {
        self.last_animated_move = None;
        self.game_over_handled = false;
        self.last_turn_emitted = None;
        self.pending_request = false;

        if self.role.is_host() {
            self.engine.reset();
            let snapshot = GameSnapshot {
                state: self.engine.state(),
                last_move: None,
                move_request: None,
            };
            self.publish(&snapshot).await?;
            info!("host reset session");
        }
        Ok(())
    }

    async fn read_snapshot(&self) -> Result<Option<GameSnapshot>> {
        let Some(value) = self.store.read(&self.store_key).await? else {
            return Ok(None);
        };
        match GameSnapshot::from_value(&value) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                // Malformed value: tolerated like an absent one, the next
                // poll re-reads whatever the writer publishes next.
                warn!(key = %self.store_key, error = %e, "discarding malformed snapshot");
                Ok(None)
            }
        }
    }

    async fn publish(&self, snapshot: &GameSnapshot) -> Result<()> {
        self.store
            .write(&self.store_key, snapshot.to_value()?, false)
            .await
    }

    async fn send_event(&self, event: UiEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| DropfourError::Internal("ui event channel closed".into()))
    }

    // Read-only observers for the presentation layer.

    pub fn my_player(&self) -> Player {
        self.role.player()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn slot(&self, col: usize, row: usize) -> Option<Slot> {
        self.engine.slot(col, row)
    }

    pub fn current_player(&self) -> Player {
        self.engine.current_player()
    }

    pub fn game_ended(&self) -> bool {
        self.engine.game_ended()
    }

    pub fn win_line(&self) -> &[(usize, usize)] {
        self.engine.win_line()
    }

    pub fn is_animating(&self) -> bool {
        self.engine.is_animating()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tokio_test::assert_ok;

    fn test_config() -> AppConfig {
        AppConfig::default()
    }

    fn coordinator(
        role: Role,
        store: Arc<MemoryStore>,
    ) -> (ReplicationCoordinator, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (
            ReplicationCoordinator::new(role, store, &test_config(), tx),
            rx,
        )
    }

    fn drain(rx: &mut mpsc::Receiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn animations(events: &[UiEvent]) -> Vec<Move> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::AnimateDrop(mv) => Some(*mv),
                _ => None,
            })
            .collect()
    }

    async fn stored_snapshot(store: &MemoryStore) -> Option<GameSnapshot> {
        let value = store.read("game").await.unwrap()?;
        Some(GameSnapshot::from_value(&value).unwrap())
    }

    #[tokio::test]
    async fn tick_on_an_uninitialized_store_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let (mut guest, mut rx) = coordinator(Role::Guest, store);
        assert_ok!(guest.poll_tick().await);
        assert!(drain(&mut rx).is_empty());
        assert!(!guest.game_ended());
    }

    #[tokio::test]
    async fn host_seed_is_create_if_absent() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, _rx) = coordinator(Role::Host, store.clone());
        host.start_session().await.unwrap();
        host.handle_column_select(3).await.unwrap();
        assert!(stored_snapshot(&store).await.unwrap().last_move.is_some());

        // A second host starting against the same key must not wipe the
        // live game.
        let (mut late_host, _rx2) = coordinator(Role::Host, store.clone());
        late_host.start_session().await.unwrap();
        assert!(stored_snapshot(&store).await.unwrap().last_move.is_some());
    }

    #[tokio::test]
    async fn guest_adopts_existing_snapshot_on_start() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, _hrx) = coordinator(Role::Host, store.clone());
        host.start_session().await.unwrap();
        host.handle_column_select(3).await.unwrap();

        let (mut guest, _grx) = coordinator(Role::Guest, store);
        guest.start_session().await.unwrap();
        assert_eq!(guest.slot(3, 5), Some(Slot::P1));
        assert_eq!(guest.current_player(), Player::Two);
    }

    #[tokio::test]
    async fn host_move_animates_once_on_both_sides() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, mut hrx) = coordinator(Role::Host, store.clone());
        let (mut guest, mut grx) = coordinator(Role::Guest, store);
        host.start_session().await.unwrap();
        guest.start_session().await.unwrap();

        host.handle_column_select(3).await.unwrap();
        host.poll_tick().await.unwrap();
        guest.poll_tick().await.unwrap();

        let expected = Move {
            col: 3,
            row: 5,
            player: Player::One,
        };
        assert_eq!(animations(&drain(&mut hrx)), vec![expected]);
        assert_eq!(animations(&drain(&mut grx)), vec![expected]);

        // Repeated ticks with an unchanged last_move never re-animate.
        host.handle_animation_complete().await.unwrap();
        guest.handle_animation_complete().await.unwrap();
        host.poll_tick().await.unwrap();
        guest.poll_tick().await.unwrap();
        guest.poll_tick().await.unwrap();
        assert!(animations(&drain(&mut hrx)).is_empty());
        assert!(animations(&drain(&mut grx)).is_empty());
    }

    #[tokio::test]
    async fn guest_request_is_consumed_and_applied_by_host() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, mut hrx) = coordinator(Role::Host, store.clone());
        let (mut guest, mut grx) = coordinator(Role::Guest, store.clone());
        host.start_session().await.unwrap();
        guest.start_session().await.unwrap();

        // Host plays first so it becomes the guest's turn.
        host.handle_column_select(3).await.unwrap();
        host.poll_tick().await.unwrap();
        host.handle_animation_complete().await.unwrap();
        guest.poll_tick().await.unwrap();
        guest.handle_animation_complete().await.unwrap();
        drain(&mut hrx);
        drain(&mut grx);

        guest.handle_column_select(4).await.unwrap();
        assert_eq!(stored_snapshot(&store).await.unwrap().move_request, Some(4));

        // Consumption tick: request cleared, move applied and published,
        // no adoption in the same tick.
        host.poll_tick().await.unwrap();
        let published = stored_snapshot(&store).await.unwrap();
        assert_eq!(published.move_request, None);
        let guest_move = Move {
            col: 4,
            row: 5,
            player: Player::Two,
        };
        assert_eq!(published.last_move, Some(guest_move));
        assert!(animations(&drain(&mut hrx)).is_empty());

        // Following ticks animate it on both sides, exactly once.
        host.poll_tick().await.unwrap();
        guest.poll_tick().await.unwrap();
        assert_eq!(animations(&drain(&mut hrx)), vec![guest_move]);
        assert_eq!(animations(&drain(&mut grx)), vec![guest_move]);
    }

    #[tokio::test]
    async fn guest_cannot_request_out_of_turn() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, _hrx) = coordinator(Role::Host, store.clone());
        let (mut guest, _grx) = coordinator(Role::Guest, store.clone());
        host.start_session().await.unwrap();
        guest.start_session().await.unwrap();

        // Player one is to move; the guest's click goes nowhere.
        guest.handle_column_select(4).await.unwrap();
        assert_eq!(stored_snapshot(&store).await.unwrap().move_request, None);
    }

    #[tokio::test]
    async fn host_revalidates_turn_before_applying_a_request() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, mut hrx) = coordinator(Role::Host, store.clone());
        host.start_session().await.unwrap();

        // A tampering guest writes a request although it is player one's
        // turn. The host clears it without touching the board.
        let mut forged = stored_snapshot(&store).await.unwrap();
        forged.move_request = Some(2);
        store.write("game", forged.to_value().unwrap(), false).await.unwrap();

        host.poll_tick().await.unwrap();
        let snapshot = stored_snapshot(&store).await.unwrap();
        assert_eq!(snapshot.move_request, None);
        assert_eq!(snapshot.last_move, None);
        assert_eq!(host.slot(2, 5), Some(Slot::Empty));
        assert!(animations(&drain(&mut hrx)).is_empty());
    }

    #[tokio::test]
    async fn pending_request_blocks_further_guest_clicks() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, mut hrx) = coordinator(Role::Host, store.clone());
        let (mut guest, mut grx) = coordinator(Role::Guest, store.clone());
        host.start_session().await.unwrap();
        guest.start_session().await.unwrap();

        host.handle_column_select(3).await.unwrap();
        host.poll_tick().await.unwrap();
        host.handle_animation_complete().await.unwrap();
        guest.poll_tick().await.unwrap();
        guest.handle_animation_complete().await.unwrap();
        drain(&mut hrx);
        drain(&mut grx);

        guest.handle_column_select(4).await.unwrap();
        guest.handle_column_select(5).await.unwrap();
        // The second click must not replace the outstanding request.
        assert_eq!(stored_snapshot(&store).await.unwrap().move_request, Some(4));
    }

    #[tokio::test]
    async fn turn_changes_are_announced_once() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, mut hrx) = coordinator(Role::Host, store);
        host.start_session().await.unwrap();

        host.poll_tick().await.unwrap();
        host.poll_tick().await.unwrap();
        let events = drain(&mut hrx);
        assert_eq!(events, vec![UiEvent::TurnChanged(Player::One)]);
    }

    #[tokio::test]
    async fn game_over_fires_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let (mut host, mut hrx) = coordinator(Role::Host, store.clone());
        let (mut guest, mut grx) = coordinator(Role::Guest, store.clone());
        host.start_session().await.unwrap();
        guest.start_session().await.unwrap();

        // Host stacks column 3, guest answers in column 4.
        for round in 0..4 {
            host.handle_column_select(3).await.unwrap();
            host.poll_tick().await.unwrap();
            host.handle_animation_complete().await.unwrap();
            guest.poll_tick().await.unwrap();
            guest.handle_animation_complete().await.unwrap();

            if round < 3 {
                guest.handle_column_select(4).await.unwrap();
                host.poll_tick().await.unwrap(); // consume
                host.poll_tick().await.unwrap(); // adopt + animate
                host.handle_animation_complete().await.unwrap();
                guest.poll_tick().await.unwrap();
                guest.handle_animation_complete().await.unwrap();
            }
        }

        // The winning drop has animated and completed; the next ticks
        // drive the end-of-game transition exactly once per side.
        host.poll_tick().await.unwrap();
        host.poll_tick().await.unwrap();
        guest.poll_tick().await.unwrap();
        guest.poll_tick().await.unwrap();

        let winner = Some(Player::One);
        let host_game_overs: Vec<_> = drain(&mut hrx)
            .into_iter()
            .filter(|e| matches!(e, UiEvent::GameOver { .. }))
            .collect();
        let guest_game_overs: Vec<_> = drain(&mut grx)
            .into_iter()
            .filter(|e| matches!(e, UiEvent::GameOver { .. }))
            .collect();
        assert_eq!(host_game_overs, vec![UiEvent::GameOver { winner }]);
        assert_eq!(guest_game_overs, vec![UiEvent::GameOver { winner }]);

        assert!(host.game_ended());
        assert!(guest.game_ended());
        assert_eq!(host.win_line(), guest.win_line());
        assert_eq!(host.win_line(), &[(3, 2), (3, 3), (3, 4), (3, 5)]);
    }

    #[tokio::test]
    async fn malformed_snapshot_is_tolerated() {
        let store = Arc::new(MemoryStore::new());
        store
            .write("game", serde_json::json!({"not": "a snapshot"}), false)
            .await
            .unwrap();
        let (mut guest, mut rx) = coordinator(Role::Guest, store);
        assert_ok!(guest.poll_tick().await);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn zero_poll_interval_is_clamped_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let mut config = test_config();
        config.replication.poll_interval_ms = 0;
        let (events_tx, _events_rx) = mpsc::channel(64);
        let mut host = ReplicationCoordinator::new(Role::Host, store, &config, events_tx);
        assert_ok!(host.start_session().await);

        // run() builds its interval from the configured period; with the
        // clamp in place the loop starts and shuts down cleanly.
        let (_input_tx, input_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(host.run(input_rx, shutdown_rx));
        shutdown_tx.send(()).unwrap();
        assert_ok!(handle.await);
    }
}
