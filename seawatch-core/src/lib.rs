//! # SeaWatch Core
//!
//! Platform-independent AIS contact tracking and collision-risk library for
//! boat instrumentation displays.
//!
//! This crate contains pure tracking and geometry logic with **zero I/O
//! dependencies**, so the same code drives a native host or a WASM plugin.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  seawatch-core (platform-independent, no tokio/async deps)  │
//! │  ├── geodesy/      (great-circle bearing & distance)        │
//! │  ├── ais/cpa       (CPA/TCPA engine)                        │
//! │  ├── ais/tracker   (contact tracker, CPA cache)             │
//! │  └── TelemetryService (abstracts the SignalK data source)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  seawatch-server        │
//!                 │  (SignalKStore)         │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`geodesy`] - Bearing and haversine distance on a spherical earth
//! - [`ais`] - CPA/TCPA engine and contact tracker
//! - [`telemetry`] - Pull-based telemetry trait ([`TelemetryService`])
//! - [`error`] - Why a contact has no CPA or was left out
//!
//! ## Example: CPA of a head-on contact
//!
//! ```rust
//! use seawatch_core::ais::{calculate_cpa_tcpa, CpaInput, Kinematics};
//!
//! let result = calculate_cpa_tcpa(&CpaInput {
//!     bearing: 0.0,
//!     distance: 1000.0,
//!     own: Kinematics::new(Some(0.0), Some(5.0)),
//!     target: Kinematics::new(Some(180.0), Some(5.0)),
//! })
//! .unwrap();
//!
//! assert!((result.tcpa - 100.0).abs() < 1e-6);
//! assert!(result.cpa < 1e-6);
//! ```

pub mod ais;
pub mod error;
pub mod geodesy;
pub mod telemetry;

// Re-export commonly used types
pub use ais::{ContactTracker, CycleSummary, Freshness, TrackedContact, TrackerSettings};
pub use error::{CpaError, SkipReason};
pub use telemetry::{Position, RawContact, TelemetryService, TelemetrySnapshot};
