//! Per-package aggregation and deterministic trust scoring.
//!
//! Scoring is a pure function over the signal buffer: signals are
//! grouped by package identity, each signal subtracts its type's
//! weight from a starting score of 100, and the result is floored at
//! zero. The score maps to a risk tier through configurable
//! thresholds. Same buffer and same weights always yield the same
//! scores, in any signal order.

use crate::signal::{PackageIdentity, Signal, SignalType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Starting trust score for every package.
pub const BASE_SCORE: u32 = 100;

/// Weight table mapping signal types to score penalties.
///
/// Deserialization overlays the provided entries onto the default
/// table, so a config that sets one weight keeps the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RiskWeights {
    weights: HashMap<SignalType, u32>,
}

impl<'de> Deserialize<'de> for RiskWeights {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let overrides = HashMap::<SignalType, u32>::deserialize(deserializer)?;
        let mut weights = Self::default();
        for (signal_type, weight) in overrides {
            weights.set(signal_type, weight);
        }
        Ok(weights)
    }
}

impl RiskWeights {
    /// Penalty for a signal type; unlisted types cost nothing.
    pub fn weight(&self, signal_type: SignalType) -> u32 {
        self.weights.get(&signal_type).copied().unwrap_or(0)
    }

    /// Set the penalty for a signal type.
    pub fn set(&mut self, signal_type: SignalType, weight: u32) {
        self.weights.insert(signal_type, weight);
    }

    /// Iterate the configured weights.
    pub fn iter(&self) -> impl Iterator<Item = (SignalType, u32)> + '_ {
        self.weights.iter().map(|(t, w)| (*t, *w))
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(SignalType::ShellExec, 20);
        weights.insert(SignalType::FsWrite, 10);
        weights.insert(SignalType::HttpRequest, 10);
        weights.insert(SignalType::NetConnect, 8);
        weights.insert(SignalType::HttpsRequest, 8);
        weights.insert(SignalType::EnvAccess, 5);
        weights.insert(SignalType::FsRead, 3);
        Self { weights }
    }
}

impl From<HashMap<SignalType, u32>> for RiskWeights {
    fn from(weights: HashMap<SignalType, u32>) -> Self {
        Self { weights }
    }
}

/// Score thresholds acting as lower bounds of the better tiers.
///
/// A score below `critical` is CRITICAL, below `high` is HIGH, below
/// `medium` is MEDIUM, and anything at or above `medium` is LOW.
/// Validation requires `critical < high < medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "RiskThresholds::default_critical")]
    pub critical: u32,
    #[serde(default = "RiskThresholds::default_high")]
    pub high: u32,
    #[serde(default = "RiskThresholds::default_medium")]
    pub medium: u32,
}

impl RiskThresholds {
    fn default_critical() -> u32 {
        30
    }

    fn default_high() -> u32 {
        60
    }

    fn default_medium() -> u32 {
        80
    }

    /// Whether the thresholds are strictly ordered and in range.
    pub fn is_valid(&self) -> bool {
        self.critical < self.high && self.high < self.medium && self.medium <= 100
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: Self::default_critical(),
            high: Self::default_high(),
            medium: Self::default_medium(),
        }
    }
}

/// Risk tier derived from a trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a score against a threshold table.
    pub fn classify(score: u32, thresholds: &RiskThresholds) -> Self {
        if score < thresholds.critical {
            RiskLevel::Critical
        } else if score < thresholds.high {
            RiskLevel::High
        } else if score < thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Scored view of one package's observed behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageScore {
    /// Package this score belongs to
    pub package: PackageIdentity,
    /// Trust score in `[0, 100]`; higher is safer
    pub score: u32,
    /// Risk tier for the score
    pub risk_level: RiskLevel,
    /// Number of signals attributed to the package
    pub signal_count: usize,
    /// Signal count per type
    pub stats: HashMap<SignalType, usize>,
}

/// Score every package present in the signal buffer.
///
/// Pure and deterministic: grouping ignores buffer order, and the
/// floor-at-zero short circuit cannot change the final value.
pub fn score_packages(
    signals: &[Signal],
    weights: &RiskWeights,
    thresholds: &RiskThresholds,
) -> HashMap<String, PackageScore> {
    let mut groups: HashMap<String, (PackageIdentity, Vec<SignalType>)> = HashMap::new();
    for signal in signals {
        let entry = groups
            .entry(signal.package().key())
            .or_insert_with(|| (signal.package().clone(), Vec::new()));
        entry.1.push(signal.signal_type());
    }

    groups
        .into_iter()
        .map(|(key, (package, types))| {
            let mut score = BASE_SCORE;
            for t in &types {
                score = score.saturating_sub(weights.weight(*t));
                if score == 0 {
                    break;
                }
            }

            let mut stats: HashMap<SignalType, usize> = HashMap::new();
            for t in &types {
                *stats.entry(*t).or_insert(0) += 1;
            }

            let scored = PackageScore {
                risk_level: RiskLevel::classify(score, thresholds),
                signal_count: types.len(),
                package,
                score,
                stats,
            };
            (key, scored)
        })
        .collect()
}
