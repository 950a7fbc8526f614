use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dropfour::config::AppConfig;
use dropfour::engine::{GameEngine, Player, Slot};
use dropfour::error::Result;
use dropfour::replication::{PlayerInput, ReplicationCoordinator, Role, UiEvent};
use dropfour::store::{MemoryStore, SharedStore};

#[derive(Parser)]
#[command(name = "dropfour", about = "Two-player connect-four over a polled shared store")]
struct Cli {
    /// Path to a config file (defaults to ./dropfour.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the shared-store poll cadence
    #[arg(long, global = true, env = "DROPFOUR_POLL_MS")]
    poll_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hot-seat game on one terminal, no replication
    Solo,
    /// Host and Guest coordinators playing a scripted game over an
    /// in-process store, tracing the full replication protocol
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(poll_ms) = cli.poll_ms {
        config.replication.poll_interval_ms = poll_ms;
    }

    match cli.command {
        Commands::Solo => run_solo(&config),
        Commands::Demo => run_demo(&config).await,
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Both players share the keyboard; the engine is driven directly and the
/// animation lock is released immediately after each placement.
fn run_solo(config: &AppConfig) -> Result<()> {
    let mut engine = GameEngine::new(config.board.cols, config.board.rows);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("{}", render_board(&engine, config));
    loop {
        if engine.game_ended() {
            let verdict = if engine.win_line().is_empty() {
                "Draw.".to_string()
            } else {
                format!("{} wins!", player_label(engine.current_player()))
            };
            println!("{} Type r to replay, q to quit.", verdict);
        } else {
            print!("{} > ", player_label(engine.current_player()));
            stdout.flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        match line.trim() {
            "q" => return Ok(()),
            "r" => {
                engine.reset();
                println!("{}", render_board(&engine, config));
            }
            input => match input.parse::<usize>() {
                Ok(col) => {
                    if engine.place_token(col).is_some() {
                        engine.finish_animation();
                        println!("{}", render_board(&engine, config));
                    } else {
                        println!("Column {} is not playable.", col);
                    }
                }
                Err(_) => println!("Enter a column number, r or q."),
            },
        }
    }
}

fn player_label(player: Player) -> &'static str {
    match player {
        Player::One => "Red",
        Player::Two => "Black",
    }
}

fn render_board(engine: &GameEngine, config: &AppConfig) -> String {
    let mut out = String::new();
    for row in 0..config.board.rows {
        for col in 0..config.board.cols {
            out.push(match engine.slot(col, row) {
                Some(Slot::P1) => 'X',
                Some(Slot::P2) => 'O',
                _ => '.',
            });
            out.push(' ');
        }
        out.push('\n');
    }
    for col in 0..config.board.cols {
        out.push_str(&format!("{} ", col));
    }
    out
}

/// Two coordinators, one in-process store, a scripted vertical-win game.
/// Each side runs its real `run()` loop; a pump per side answers
/// `AnimateDrop` with `AnimationComplete` and feeds the next scripted
/// column when its own turn is announced.
async fn run_demo(config: &AppConfig) -> Result<()> {
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let (shutdown_tx, _) = broadcast::channel(1);

    let (host_events_tx, host_events_rx) = mpsc::channel(config.replication.input_buffer);
    let (host_input_tx, host_input_rx) = mpsc::channel(config.replication.input_buffer);
    let (guest_events_tx, guest_events_rx) = mpsc::channel(config.replication.input_buffer);
    let (guest_input_tx, guest_input_rx) = mpsc::channel(config.replication.input_buffer);

    let mut host = ReplicationCoordinator::new(Role::Host, store.clone(), config, host_events_tx);
    host.start_session().await?;
    let mut guest = ReplicationCoordinator::new(Role::Guest, store, config, guest_events_tx);
    guest.start_session().await?;

    let host_loop = tokio::spawn(host.run(host_input_rx, shutdown_tx.subscribe()));
    let guest_loop = tokio::spawn(guest.run(guest_input_rx, shutdown_tx.subscribe()));

    let host_pump = tokio::spawn(pump(
        "host",
        Player::One,
        vec![3, 3, 3, 3],
        host_events_rx,
        host_input_tx,
        shutdown_tx.clone(),
    ));
    let guest_pump = tokio::spawn(pump(
        "guest",
        Player::Two,
        vec![4, 4, 4],
        guest_events_rx,
        guest_input_tx,
        shutdown_tx.clone(),
    ));

    let _ = tokio::join!(host_loop, guest_loop, host_pump, guest_pump);
    info!("demo finished");
    Ok(())
}

async fn pump(
    side: &'static str,
    me: Player,
    script: Vec<usize>,
    mut events_rx: mpsc::Receiver<UiEvent>,
    input_tx: mpsc::Sender<PlayerInput>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut script = script.into_iter();
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        let event = tokio::select! {
            Some(event) = events_rx.recv() => event,
            _ = shutdown_rx.recv() => return,
            else => return,
        };
        match event {
            UiEvent::AnimateDrop(mv) => {
                info!(side, col = mv.col, row = mv.row, player = ?mv.player, "drop");
                tokio::time::sleep(Duration::from_millis(20)).await;
                if input_tx.send(PlayerInput::AnimationComplete).await.is_err() {
                    return;
                }
            }
            UiEvent::TurnChanged(player) if player == me => {
                if let Some(col) = script.next() {
                    info!(side, col, "playing scripted column");
                    if input_tx.send(PlayerInput::ColumnSelected(col)).await.is_err() {
                        return;
                    }
                }
            }
            UiEvent::TurnChanged(_) => {}
            UiEvent::GameOver { winner } => {
                match winner {
                    Some(player) => info!(side, winner = ?player, "game over"),
                    None => info!(side, "game over: draw"),
                }
                // One shutdown is enough; the send fails harmlessly if the
                // other side already announced.
                if shutdown_tx.send(()).is_err() {
                    warn!(side, "shutdown receivers already gone");
                }
                return;
            }
        }
    }
}
