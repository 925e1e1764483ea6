//! Signature- and correlation-based threat detection.
//!
//! The analyzer turns a signal buffer into named [`ThreatFinding`]s
//! across four detector families:
//!
//! - **Crypto miner**: miner processes, mining pool requests, mining
//!   environment variables
//! - **Data exfiltration**: paste/webhook sinks, plus the correlation
//!   of sensitive file reads with any outbound HTTP(S) request
//! - **Backdoor**: reverse-shell fragments, tunnel tools, suspicious
//!   connection ports
//! - **Credential theft**: secret environment variables and
//!   credential file reads
//!
//! Analysis is a pure function over the buffer; a failure to match
//! one signal never affects the rest.

pub mod signatures;

use crate::config::PatternConfig;
use crate::signal::{PackageIdentity, Signal, SignalMetadata, SignalType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detector family a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThreatCategory {
    CryptoMiner,
    DataExfiltration,
    Backdoor,
    CredentialTheft,
}

/// Specific kind of threat finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThreatKind {
    /// Known miner process name in a command
    MinerProcess,
    /// Request to a known mining pool
    MiningPoolRequest,
    /// Mining-related environment variable access
    MiningEnvAccess,
    /// Request to a known exfiltration sink
    ExfiltrationService,
    /// Sensitive file read correlated with outbound HTTP(S)
    SensitiveFilePlusHttp,
    /// Reverse-shell fragment in a command
    ReverseShell,
    /// Remote-access tunnel tool in a command
    RemoteAccessTool,
    /// Connection to a known backdoor port
    SuspiciousPort,
    /// Read of a secret-bearing environment variable
    SecretEnvRead,
    /// Read of a credential file
    CredentialFileRead,
}

impl ThreatKind {
    /// Detector family this kind belongs to.
    pub fn category(&self) -> ThreatCategory {
        match self {
            Self::MinerProcess | Self::MiningPoolRequest | Self::MiningEnvAccess => {
                ThreatCategory::CryptoMiner
            }
            Self::ExfiltrationService | Self::SensitiveFilePlusHttp => {
                ThreatCategory::DataExfiltration
            }
            Self::ReverseShell | Self::RemoteAccessTool | Self::SuspiciousPort => {
                ThreatCategory::Backdoor
            }
            Self::SecretEnvRead | Self::CredentialFileRead => ThreatCategory::CredentialTheft,
        }
    }

    /// Severity assigned to findings of this kind.
    pub fn severity(&self) -> ThreatSeverity {
        match self {
            Self::MinerProcess
            | Self::MiningPoolRequest
            | Self::ExfiltrationService
            | Self::SensitiveFilePlusHttp
            | Self::ReverseShell => ThreatSeverity::Critical,
            Self::MiningEnvAccess
            | Self::RemoteAccessTool
            | Self::SuspiciousPort
            | Self::SecretEnvRead
            | Self::CredentialFileRead => ThreatSeverity::High,
        }
    }
}

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatSeverity {
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ThreatSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Highest-severity label for a whole analysis run.
///
/// `critical` when any crypto-miner or backdoor finding exists, else
/// `high` when any exfiltration or credential finding exists, else
/// `medium` when any finding exists at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallSeverity {
    None,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for OverallSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A named, severity-tagged detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatFinding {
    pub kind: ThreatKind,
    pub severity: ThreatSeverity,
    pub package: PackageIdentity,
    /// What matched, in human-readable form
    pub indicator: String,
    /// Index of the triggering signal in the analyzed buffer, when
    /// the finding stems from a single signal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_index: Option<usize>,
}

impl ThreatFinding {
    fn new(
        kind: ThreatKind,
        package: &PackageIdentity,
        indicator: impl Into<String>,
        signal_index: Option<usize>,
    ) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            package: package.clone(),
            indicator: indicator.into(),
            signal_index,
        }
    }
}

/// Result of a pattern analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatReport {
    pub findings: Vec<ThreatFinding>,
    pub total: usize,
    pub overall_severity: OverallSeverity,
}

impl ThreatReport {
    fn from_findings(findings: Vec<ThreatFinding>) -> Self {
        Self {
            total: findings.len(),
            overall_severity: overall_severity(&findings),
            findings,
        }
    }

    /// Whether the analysis produced no findings.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

impl Default for ThreatReport {
    fn default() -> Self {
        Self {
            findings: Vec::new(),
            total: 0,
            overall_severity: OverallSeverity::None,
        }
    }
}

fn overall_severity(findings: &[ThreatFinding]) -> OverallSeverity {
    if findings.is_empty() {
        return OverallSeverity::None;
    }
    let has_category = |category: ThreatCategory| {
        findings.iter().any(|f| f.kind.category() == category)
    };
    if has_category(ThreatCategory::CryptoMiner) || has_category(ThreatCategory::Backdoor) {
        OverallSeverity::Critical
    } else if has_category(ThreatCategory::DataExfiltration)
        || has_category(ThreatCategory::CredentialTheft)
    {
        OverallSeverity::High
    } else {
        OverallSeverity::Medium
    }
}

/// Analyze a signal buffer for threat patterns.
pub fn analyze_patterns(signals: &[Signal], config: &PatternConfig) -> ThreatReport {
    if !config.enabled {
        return ThreatReport {
            overall_severity: OverallSeverity::None,
            ..ThreatReport::default()
        };
    }

    let mut findings = Vec::new();
    if config.detect_crypto_miners {
        detect_crypto_miners(signals, &mut findings);
    }
    if config.detect_data_exfiltration {
        detect_data_exfiltration(signals, &mut findings);
    }
    if config.detect_backdoors {
        detect_backdoors(signals, &mut findings);
    }
    // No schema flag exists for credential theft; the analyzer-wide
    // switch governs it.
    detect_credential_theft(signals, &mut findings);

    ThreatReport::from_findings(findings)
}

fn is_http(signal: &Signal) -> bool {
    matches!(
        signal.signal_type(),
        SignalType::HttpRequest | SignalType::HttpsRequest
    )
}

fn detect_crypto_miners(signals: &[Signal], findings: &mut Vec<ThreatFinding>) {
    for (index, signal) in signals.iter().enumerate() {
        match signal.metadata() {
            SignalMetadata::ShellExec { command, .. } => {
                let lowered = command.to_lowercase();
                for name in signatures::MINER_PROCESSES {
                    if lowered.contains(name) {
                        findings.push(ThreatFinding::new(
                            ThreatKind::MinerProcess,
                            signal.package(),
                            format!("miner process '{name}' in command"),
                            Some(index),
                        ));
                    }
                }
            }
            SignalMetadata::Http(http) if is_http(signal) => {
                let url = http.url.to_lowercase();
                for pool in signatures::MINING_POOLS {
                    if url.contains(pool) {
                        findings.push(ThreatFinding::new(
                            ThreatKind::MiningPoolRequest,
                            signal.package(),
                            format!("request to mining pool '{pool}'"),
                            Some(index),
                        ));
                    }
                }
            }
            SignalMetadata::Env { variable } => {
                let upper = variable.to_uppercase();
                for marker in signatures::MINING_ENV_MARKERS {
                    if upper.contains(marker) {
                        findings.push(ThreatFinding::new(
                            ThreatKind::MiningEnvAccess,
                            signal.package(),
                            format!("mining environment variable '{variable}'"),
                            Some(index),
                        ));
                        break;
                    }
                }
            }
            _ => {}
        }
    }
}

fn detect_data_exfiltration(signals: &[Signal], findings: &mut Vec<ThreatFinding>) {
    // Per-package tally of sensitive reads and outbound requests for
    // the correlation rule. BTreeMap keeps finding order stable.
    let mut sensitive_reads: BTreeMap<String, (PackageIdentity, Vec<String>)> = BTreeMap::new();
    let mut http_packages: BTreeMap<String, usize> = BTreeMap::new();

    for (index, signal) in signals.iter().enumerate() {
        match signal.metadata() {
            SignalMetadata::FsRead { path, .. } => {
                let path_str = path.to_string_lossy();
                if signatures::SENSITIVE_FILES
                    .iter()
                    .any(|s| path_str.contains(s))
                {
                    sensitive_reads
                        .entry(signal.package().key())
                        .or_insert_with(|| (signal.package().clone(), Vec::new()))
                        .1
                        .push(path_str.into_owned());
                }
            }
            SignalMetadata::Http(http) if is_http(signal) => {
                http_packages
                    .entry(signal.package().key())
                    .or_insert(index);
                let url = http.url.to_lowercase();
                for service in signatures::EXFIL_SERVICES {
                    if url.contains(service) {
                        findings.push(ThreatFinding::new(
                            ThreatKind::ExfiltrationService,
                            signal.package(),
                            format!("request to exfiltration service '{service}'"),
                            Some(index),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    for (key, (package, files)) in &sensitive_reads {
        if http_packages.contains_key(key) {
            findings.push(ThreatFinding::new(
                ThreatKind::SensitiveFilePlusHttp,
                package,
                format!(
                    "sensitive file(s) read before outbound request: {}",
                    files.join(", ")
                ),
                None,
            ));
        }
    }
}

fn detect_backdoors(signals: &[Signal], findings: &mut Vec<ThreatFinding>) {
    for (index, signal) in signals.iter().enumerate() {
        match signal.metadata() {
            SignalMetadata::ShellExec { command, .. } => {
                for pattern in signatures::REVERSE_SHELL_PATTERNS {
                    if command.contains(pattern) {
                        findings.push(ThreatFinding::new(
                            ThreatKind::ReverseShell,
                            signal.package(),
                            format!("reverse shell pattern '{pattern}'"),
                            Some(index),
                        ));
                    }
                }
                for tool in signatures::RAT_TOOLS {
                    if command.contains(tool) {
                        findings.push(ThreatFinding::new(
                            ThreatKind::RemoteAccessTool,
                            signal.package(),
                            format!("remote access tool '{tool}'"),
                            Some(index),
                        ));
                    }
                }
            }
            SignalMetadata::NetConnect { host, port, .. } => {
                if signatures::SUSPICIOUS_PORTS.contains(port) {
                    findings.push(ThreatFinding::new(
                        ThreatKind::SuspiciousPort,
                        signal.package(),
                        format!("connection to suspicious port {host}:{port}"),
                        Some(index),
                    ));
                }
            }
            _ => {}
        }
    }
}

fn detect_credential_theft(signals: &[Signal], findings: &mut Vec<ThreatFinding>) {
    for (index, signal) in signals.iter().enumerate() {
        match signal.metadata() {
            SignalMetadata::Env { variable } => {
                if signatures::SECRET_ENV_VARS.contains(&variable.as_str()) {
                    findings.push(ThreatFinding::new(
                        ThreatKind::SecretEnvRead,
                        signal.package(),
                        format!("secret environment variable '{variable}'"),
                        Some(index),
                    ));
                }
            }
            SignalMetadata::FsRead { path, .. } => {
                let path_str = path.to_string_lossy();
                for file in signatures::CREDENTIAL_FILES {
                    if path_str.contains(file) {
                        findings.push(ThreatFinding::new(
                            ThreatKind::CredentialFileRead,
                            signal.package(),
                            format!("credential file read: {path_str}"),
                            Some(index),
                        ));
                        break;
                    }
                }
            }
            _ => {}
        }
    }
}
