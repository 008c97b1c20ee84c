use serde::{Deserialize, Serialize};
use std::fmt;

use super::reference::{ReferenceConfig, ReferenceParams};
use crate::config::{available_cpus, parse_max_workers};
use crate::error::{LastrxError, Result};

/// One batch run: origin, destination, and worker count.
///
/// Immutable once built; cloned into every worker task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransformConfig")]
pub struct TransformConfig {
    pub origin: ReferenceConfig,
    pub destination: ReferenceConfig,
    pub max_workers: usize,
}

impl TransformConfig {
    pub fn new(
        origin: ReferenceConfig,
        destination: ReferenceConfig,
        max_workers: usize,
    ) -> Result<Self> {
        if max_workers < 1 {
            return Err(LastrxError::ConfigInvalid {
                key: "max_workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            origin,
            destination,
            max_workers,
        })
    }

    /// Use one worker per available CPU
    pub fn with_default_workers(origin: ReferenceConfig, destination: ReferenceConfig) -> Self {
        Self {
            origin,
            destination,
            max_workers: available_cpus(),
        }
    }

    /// Origin and destination agree on frame, epoch, vertical datum, and coordinate type
    pub fn is_identity(&self) -> bool {
        self.origin == self.destination
    }

    /// Parameters for the coordinate transformer, epochs as decimal years
    pub fn to_params(&self) -> TransformParams {
        TransformParams {
            origin: self.origin.to_params(),
            destination: self.destination.to_params(),
        }
    }

    /// Non-fatal observations about this configuration
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.is_identity() {
            issues.push(ConfigIssue::IdenticalReferences);
        }

        if self.max_workers > available_cpus() {
            issues.push(ConfigIssue::WorkersExceedCpus {
                requested: self.max_workers,
                available: available_cpus(),
            });
        }

        issues
    }
}

impl fmt::Display for TransformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}

/// Warning-level finding from [`TransformConfig::issues`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    IdenticalReferences,
    WorkersExceedCpus { requested: usize, available: usize },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::IdenticalReferences => f.write_str(
                "Origin and destination configurations are identical - no transformation needed",
            ),
            ConfigIssue::WorkersExceedCpus {
                requested,
                available,
            } => write!(
                f,
                "Worker count {} exceeds the {} available CPUs and will be clamped",
                requested, available
            ),
        }
    }
}

#[derive(Deserialize)]
struct RawTransformConfig {
    origin: ReferenceConfig,
    destination: ReferenceConfig,
    #[serde(default)]
    max_workers: Option<i64>,
}

impl TryFrom<RawTransformConfig> for TransformConfig {
    type Error = LastrxError;

    fn try_from(raw: RawTransformConfig) -> Result<Self> {
        let max_workers = match raw.max_workers {
            Some(n) => parse_max_workers(n)?,
            None => available_cpus(),
        };
        TransformConfig::new(raw.origin, raw.destination, max_workers)
    }
}

/// Transformer input: both sides with decimal-year epochs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    pub origin: ReferenceParams,
    pub destination: ReferenceParams,
}

impl TransformParams {
    pub fn is_identity(&self) -> bool {
        self.origin == self.destination
    }
}
