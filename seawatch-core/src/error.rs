//! Error types for contact tracking
//!
//! None of these abort a tracking cycle. They describe why a contact has no
//! CPA/TCPA or did not make it into the tracked list.

use thiserror::Error;

/// Errors from the CPA/TCPA engine
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpaError {
    /// Own ship is moving but its course over ground is unknown
    #[error("CPA undetermined: own ship is moving without course over ground")]
    UndeterminedOwnCourse,
}

/// Reasons a raw contact is left out of a tracking cycle
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Own latitude/longitude unknown (e.g. no GPS fix yet)
    #[error("own position unavailable")]
    MissingOwnPosition,

    /// The contact has no latitude/longitude
    #[error("contact has no position")]
    MissingContactPosition,

    /// The contact was last observed longer ago than the prune threshold,
    /// or carries no timestamp at all
    #[error("contact expired")]
    ExpiredContact,
}
