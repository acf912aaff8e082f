//! Roomkey binary.
//!
//! # Usage
//!
//! ```bash
//! # Produce a room key event and encrypted events for a fresh session
//! roomkey demo --room '!r:x' --session s1 --sender curve1 --shared-history true hi > demo.json
//!
//! # Import a JSON array of to-device events
//! roomkey --db keys.redb import room_keys.json
//!
//! # Ask whether a stored session was shared for history
//! roomkey --db keys.redb has-shared-history --room '!r:x' --session s1 --sender curve1
//!
//! # Decrypt one encrypted room event
//! roomkey --db keys.redb decrypt event.json
//! ```

use std::{io, path::PathBuf};

use clap::{Parser, Subcommand};
use roomkey_cli::DemoOptions;
use roomkey_core::CoreConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Room key session store tool
#[derive(Parser, Debug)]
#[command(name = "roomkey")]
#[command(about = "Import room keys, answer shared-history queries and decrypt room events")]
#[command(version)]
struct Args {
    /// Path to the session database
    #[arg(long, default_value = "roomkey.redb")]
    db: PathBuf,

    /// Record the shared-history flag carried by imported room keys
    #[arg(long)]
    honor_shared_history_hints: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a JSON array of to-device events
    Import {
        /// Event file
        file: PathBuf,
    },

    /// Report the shared-history flag of a stored session
    HasSharedHistory {
        /// Room identifier
        #[arg(long)]
        room: String,
        /// Session identifier
        #[arg(long)]
        session: String,
        /// Sender curve25519 key
        #[arg(long)]
        sender: String,
    },

    /// Decrypt an encrypted room event
    Decrypt {
        /// Encrypted event file
        file: PathBuf,
    },

    /// Start a fresh outbound session and print its key and messages
    Demo {
        /// Room identifier
        #[arg(long)]
        room: String,
        /// Session identifier
        #[arg(long)]
        session: String,
        /// Sender curve25519 key
        #[arg(long)]
        sender: String,
        /// Shared-history flag on the room key event
        #[arg(long)]
        shared_history: Option<bool>,
        /// Messages to encrypt
        messages: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let config = CoreConfig {
        honor_shared_history_hints: args.honor_shared_history_hints,
        ..CoreConfig::default()
    };
    let mut out = io::stdout().lock();

    match args.command {
        Command::Import { file } => {
            let sessions = roomkey_cli::open(&args.db, config)?;
            roomkey_cli::import(&sessions, &file, &mut out)?;
        },
        Command::HasSharedHistory { room, session, sender } => {
            let sessions = roomkey_cli::open(&args.db, config)?;
            roomkey_cli::has_shared_history(&sessions, &room, &session, &sender, &mut out)?;
        },
        Command::Decrypt { file } => {
            let sessions = roomkey_cli::open(&args.db, config)?;
            roomkey_cli::decrypt(&sessions, &file, &mut out)?;
        },
        Command::Demo { room, session, sender, shared_history, messages } => {
            let options = DemoOptions {
                room_id: &room,
                session_id: &session,
                sender_key: &sender,
                shared_history,
                messages: &messages,
            };
            roomkey_cli::demo(&options, &mut out)?;
        },
    }

    Ok(())
}
