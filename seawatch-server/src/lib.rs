//! # SeaWatch Server
//!
//! SignalK host for the [`seawatch_core`] contact tracker.
//!
//! Reads a stream of SignalK delta messages (one JSON object per line) from
//! a file or stdin, keeps the latest navigation values per vessel and runs a
//! tracking cycle whenever new data arrives.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                seawatch-server                │
//! │  ┌──────────────┐      ┌────────────────────┐ │
//! │  │ Feed         │─────▶│ SignalKStore       │ │
//! │  │ (subsystem)  │      │ impl Telemetry-    │ │
//! │  └──────┬───────┘      │ Service            │ │
//! │         │              └─────────┬──────────┘ │
//! │         ▼                        ▼            │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │      seawatch_core::ContactTracker      │  │
//! │  └─────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use seawatch_server::{Cli, Config, Feed};
//! use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let args = Cli::parse_from(["seawatch-server", "-i", "deltas.jsonl"]);
//!     let feed = Feed::new(&Config::default(), args.clock, true);
//!
//!     Toplevel::new(|s| async move {
//!         s.start(SubsystemBuilder::new("Feed", move |subsys| {
//!             feed.run(subsys, args.input)
//!         }));
//!     })
//!     .catch_signals()
//!     .handle_shutdown_requests(Duration::from_secs(1))
//!     .await
//!     .unwrap();
//! }
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all options. Key options:
//!
//! - `-i, --input` - File with SignalK deltas (default: stdin)
//! - `-c, --config` - Configuration file
//! - `--clock data` - Age contacts against the newest timestamp in the data,
//!   for replaying recordings
//! - `--output` - Write the tracked contacts to stdout after every cycle

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

pub mod config;
pub mod feed;
pub mod signalk;

pub use config::Config;
pub use feed::Feed;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Which clock contact ages are measured against
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, PartialEq)]
pub enum ClockMode {
    /// System time
    #[default]
    Wall,
    /// Newest timestamp seen in the input
    Data,
}

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read SignalK deltas from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Clock used to age contacts
    #[arg(long, default_value_t, value_enum)]
    pub clock: ClockMode,

    /// Minimum time between tracking cycles, in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Drop contacts not heard from for this many minutes
    #[arg(long)]
    pub prune_minutes: Option<f64>,

    /// SignalK context of own ship, e.g. `vessels.urn:mrn:imo:mmsi:244123456`
    #[arg(long)]
    pub self_context: Option<String>,

    /// Write tracked contacts to stdout as JSON after every cycle
    #[arg(long, default_value_t = false)]
    pub output: bool,
}
