//! # rtbridge CLI
//!
//! Drives the observable adapters against the in-memory backend and prints
//! what a host application would be notified of.

use anyhow::{Context, Result};
use rtbridge_core::{MapChange, StringChange, StringChangeKind};
use rtbridge_memory::{MemoryBackend, MemorySession};
use rtbridge_observable::{
    BridgeConfig, CollaboratorRoster, Disposable, ObservableString, RosterChange,
};
use std::env;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

const DEFAULT_DEMO_SESSIONS: usize = 2;
const COLORS: [&str; 4] = ["#4285f4", "#db4437", "#f4b400", "#0f9d58"];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "demo" => run_demo().await?,
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn demo_sessions() -> Result<usize> {
    let Ok(raw) = env::var("RTBRIDGE_DEMO_SESSIONS") else {
        return Ok(DEFAULT_DEMO_SESSIONS);
    };
    let sessions: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("RTBRIDGE_DEMO_SESSIONS: invalid count '{raw}'"))?;
    anyhow::ensure!(sessions > 0, "RTBRIDGE_DEMO_SESSIONS must be at least 1");
    Ok(sessions)
}

async fn run_demo() -> Result<()> {
    let config = BridgeConfig::from_env().context("Invalid bridge configuration")?;
    let sessions = demo_sessions()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        sessions,
        map_id = %config.roster_map_id,
        "Starting rtbridge demo"
    );

    let backend = MemoryBackend::new();

    // A client that wrote itself into the roster and then vanished.
    let ghost = backend.join_as("ghost", "Ghost", "#9e9e9e");
    let ghost_roster = CollaboratorRoster::new(ghost.clone(), config.clone())
        .context("Failed to attach ghost roster")?;
    ghost_roster.ready().await.context("Ghost roster never became ready")?;
    backend.crash(ghost.session_id());

    let peers: Vec<MemorySession> = (0..sessions)
        .map(|i| {
            backend.join_as(
                format!("user-{i}"),
                format!("Peer {i}"),
                COLORS[i % COLORS.len()],
            )
        })
        .collect();
    let host = &peers[0];

    let roster = CollaboratorRoster::new(host.clone(), config.clone())
        .context("Failed to attach collaborator roster")?;
    let mut roster_rx = roster.subscribe();
    roster.ready().await.context("Collaborator roster never became ready")?;

    println!("Roster after reconciliation:");
    print_roster(&roster)?;

    let notes = ObservableString::new(host.text("notes"));
    let mut notes_rx = notes.subscribe();

    notes.set_text("hello world")?;
    notes.insert(5, ",")?;
    notes.remove(0, 1)?;
    notes.insert(0, "H")?;
    if let Some(peer) = peers.get(1) {
        let remote = ObservableString::new(peer.text("notes"));
        let end = remote.len()?;
        remote.insert(end, "!")?;
        remote.dispose();
    }

    let late = backend.join_as("late", "Late Peer", "#ab47bc");
    if let Some(last) = peers.last().filter(|last| last.session_id() != host.session_id()) {
        last.leave();
    }

    println!();
    println!("Text notifications:");
    for change in drain(&mut notes_rx) {
        println!("  {}", describe_text(&change));
    }
    println!("Final text: {:?}", notes.text()?);

    println!();
    println!("Roster notifications:");
    for change in drain(&mut roster_rx) {
        println!("  {}", describe_roster(&change));
    }

    println!();
    println!("Final roster:");
    print_roster(&roster)?;

    notes.dispose();
    roster.dispose();
    late.leave();

    tracing::info!("Demo finished");
    Ok(())
}

fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

fn print_roster(roster: &CollaboratorRoster<MemorySession>) -> Result<()> {
    let local = roster.local_collaborator();
    for (_, record) in roster.entries()? {
        let marker = if local.as_ref() == Some(&record) { "*" } else { " " };
        println!(" {marker} {record} {}", record.color());
    }
    Ok(())
}

fn describe_text(change: &StringChange) -> String {
    let kind = match change.kind {
        StringChangeKind::Insert => "insert",
        StringChangeKind::Remove => "remove",
        StringChangeKind::Set => "set",
    };
    format!("{kind:<6} [{}, {}) {:?}", change.start, change.end, change.value)
}

fn describe_roster(change: &RosterChange) -> String {
    match change {
        MapChange::Add { key, value } => format!("add    {key} -> {value}"),
        MapChange::Remove { key, old_value } => format!("remove {key} (was {old_value})"),
        MapChange::Change {
            key,
            old_value,
            new_value,
        } => format!("change {key}: {old_value} -> {new_value}"),
    }
}

fn print_help() {
    println!(
        r#"rtbridge CLI

USAGE:
    rtbridge <COMMAND>

COMMANDS:
    demo    Run a scripted collaboration session against the in-memory backend
    help    Show this help message

ENVIRONMENT:
    RTBRIDGE_DEMO_SESSIONS      Number of peer sessions (default: 2)
    RTBRIDGE_ROSTER_MAP_ID      Root id of the collaborator map (default: collaborators)
    RTBRIDGE_CLEAR_ON_DISPOSE   Clear the collaborator map on dispose (default: true)
    RUST_LOG                    Log filter (default: info)

EXAMPLES:
    rtbridge demo
    RTBRIDGE_DEMO_SESSIONS=4 RUST_LOG=debug rtbridge demo
"#
    );
}
