//! SignalK feed subsystem.
//!
//! Reads line-delimited SignalK deltas, applies them to the store and runs a
//! tracking cycle after each one. The tracker's own throttle decides whether
//! the cycle actually runs.

use log::{debug, info, warn};
use seawatch_core::{ContactTracker, CycleSummary};
use std::borrow::Cow;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_graceful_shutdown::SubsystemHandle;

use crate::config::Config;
use crate::signalk::SignalKStore;
use crate::ClockMode;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot write output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Wall clock in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Owns the SignalK store (inside the tracker) and the tracker itself
pub struct Feed {
    tracker: ContactTracker<SignalKStore>,
    clock: ClockMode,
    output: bool,
    lines: u64,
    rejected: u64,
}

impl Feed {
    pub fn new(config: &Config, clock: ClockMode, output: bool) -> Self {
        let store = SignalKStore::new(config.self_context.as_deref());
        Feed {
            tracker: ContactTracker::new(store, config.tracker.clone()),
            clock,
            output,
            lines: 0,
            rejected: 0,
        }
    }

    pub fn tracker(&self) -> &ContactTracker<SignalKStore> {
        &self.tracker
    }

    /// Time used for ageing contacts
    fn now(&self, wall_now: u64) -> u64 {
        match self.clock {
            ClockMode::Wall => wall_now,
            ClockMode::Data => self
                .tracker
                .service()
                .latest_timestamp()
                .unwrap_or(wall_now),
        }
    }

    /// Apply one input line and run a tracking cycle
    ///
    /// # Returns
    ///
    /// The cycle summary, or `None` when the line was rejected or the cycle
    /// was throttled
    pub fn handle_line(&mut self, line: &str, wall_now: u64) -> Option<CycleSummary> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.lines += 1;

        let previous_self = self.tracker.service().self_context().to_string();
        if let Err(e) = self.tracker.service_mut().apply_line(line) {
            warn!("Skipping line {}: {}", self.lines, e);
            self.rejected += 1;
            return None;
        }

        // New own ship identity, cached risk belongs to the old one
        if self.tracker.service().self_context() != previous_self {
            self.tracker.reset_cache();
        }

        let now = self.now(wall_now);
        self.tracker.on_telemetry_update(now)
    }

    /// Apply one raw input line, which may not be valid UTF-8
    pub fn handle_bytes(&mut self, raw: &[u8], wall_now: u64) -> Option<CycleSummary> {
        let line = String::from_utf8_lossy(raw);
        if let Cow::Owned(_) = line {
            debug!("Line {} is not valid UTF-8", self.lines + 1);
        }
        self.handle_line(&line, wall_now)
    }

    /// Write the tracked contacts, nearest first, as one JSON line
    pub fn write_contacts<W: Write>(&self, out: &mut W) -> Result<(), FeedError> {
        serde_json::to_writer(&mut *out, &self.tracker.tracked_by_distance())?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }

    async fn open(
        input: Option<PathBuf>,
    ) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, FeedError> {
        Ok(match input {
            Some(path) => {
                info!("Reading SignalK deltas from {}", path.display());
                Box::new(BufReader::new(tokio::fs::File::open(path).await?))
            }
            None => {
                info!("Reading SignalK deltas from stdin");
                Box::new(BufReader::new(tokio::io::stdin()))
            }
        })
    }

    /// Run until the input ends or shutdown is requested
    pub async fn run(
        mut self,
        subsys: SubsystemHandle,
        input: Option<PathBuf>,
    ) -> Result<(), FeedError> {
        let mut reader = Self::open(input).await?;
        let mut buf = Vec::new();

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    debug!("Feed shutting down");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        info!(
                            "End of input after {} lines ({} rejected)",
                            self.lines, self.rejected
                        );
                        subsys.request_shutdown();
                        break;
                    }
                    let summary = self.handle_bytes(&buf, now_millis());
                    buf.clear();
                    if let Some(summary) = summary {
                        if summary.own_position_missing {
                            debug!("Waiting for own position");
                        }
                        if self.output {
                            self.write_contacts(&mut std::io::stdout().lock())?;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
