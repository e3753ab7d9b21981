//! Simulation error definitions.
//!
//! This module defines the fatal conditions of a simulated run. Admission
//! rejections (queue full, MSHR full) are not errors: they are reported with a
//! `bool` and retried by the caller. What remains is:
//! 1. **Deadlock:** A head-of-line entry made no progress within the threshold.
//! 2. **Invariant Violations:** A plug-in or the engine broke a structural contract.
//! 3. **Wiring Errors:** A component addressed a node that does not exist or itself.
//! 4. **Configuration Errors:** Invalid geometry, unreadable files, malformed JSON.

use std::path::PathBuf;

use thiserror::Error;

use crate::common::constants::Cycle;
use crate::soc::interconnect::NodeId;

/// Errors that terminate a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// A structure's head-of-line entry stalled past the deadlock threshold.
    ///
    /// `report` holds the component's queue and MSHR dump.
    #[error("deadlock detected in {component} at cycle {cycle}\n{report}")]
    Deadlock {
        /// Name of the stalled component.
        component: String,
        /// Cycle at which the stall was detected.
        cycle: Cycle,
        /// Diagnostic dump of the component's internal state.
        report: String,
    },

    /// A structural contract was broken (bad victim way, orphan fill, duplicate MSHR entry).
    #[error("invariant violation in {component}: {detail}")]
    InvariantViolation {
        /// Name of the component that observed the violation.
        component: String,
        /// What went wrong.
        detail: String,
    },

    /// A component tried to reach itself through the fabric.
    #[error("component {0} addressed itself through the fabric")]
    SelfAccess(NodeId),

    /// A packet or link named a node outside the hierarchy.
    #[error("no component registered as {0}")]
    UnknownNode(NodeId),

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be read.
    #[error("failed to read configuration {path}")]
    ConfigIo {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid JSON for the configuration schema.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl SimError {
    /// Builds an [`SimError::InvariantViolation`] for `component`.
    pub fn invariant(component: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvariantViolation { component: component.into(), detail: detail.into() }
    }
}
