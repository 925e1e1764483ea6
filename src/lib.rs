//! # bheeshma
//!
//! A runtime dependency behavior monitor for dynamically loaded
//! (npm-style) module ecosystems. It observes the side effects of
//! third-party code (environment reads, filesystem I/O, outbound
//! connections, HTTP(S) requests, child processes), attributes each
//! observation to the package that caused it, scores packages for
//! risk, and detects named threat patterns.
//!
//! ## Core Components
//!
//! - **Signal**: Immutable, metadata-only observations of behavior
//! - **Attribution**: Stack → package identity via `node_modules`
//!   manifests, cached per package directory
//! - **Hooks**: Value-transparent facades over env, fs, net, http,
//!   and child-process APIs
//! - **Scoring**: Deterministic trust scores and risk tiers
//! - **Patterns**: Miner, exfiltration, backdoor, and credential
//!   theft detectors
//! - **Report**: Structured (JSON v1.0) and text report views
//!
//! ## Example
//!
//! ```rust,ignore
//! use bheeshma::{install, uninstall, generate_report, ReportFormat};
//!
//! install(None);
//! // ... host loads and runs third-party modules through the facades ...
//! println!("{}", generate_report(ReportFormat::Cli));
//! uninstall();
//! ```
//!
//! Monitor failures degrade coverage, never the host: every wrapped
//! operation behaves exactly as the unwrapped API on success and
//! failure paths alike.

pub mod attribution;
pub mod config;
pub mod error;
pub mod hooks;
pub mod monitor;
mod paths;
pub mod patterns;
pub mod report;
pub mod scoring;
pub mod signal;

// Re-exports for convenience
pub use attribution::{
    Attribution, AttributionEngine, CallStack, NullStackProvider, ScriptFrame,
    ScriptStackProvider, StackFrame, StackProvider,
};
pub use config::{
    load_config, load_config_from, ConfigSource, HookConfig, LoadedConfig, MonitorConfig,
    OutputConfig, PatternConfig, PerformanceConfig, Verbosity, CONFIG_FILE_NAMES,
};
pub use error::{Error, Result};
pub use hooks::{
    assess_request, redact_headers, sanitize_command, ConnectOptions, ConnectTarget, EnvView,
    FsApi, HookFailure, HookKind, HttpApi, InstallResult, NetApi, PathValue, ProcessApi,
    RequestOptions, RequestTarget, UninstallResult,
};
pub use monitor::{
    default_monitor, generate_report, get_scores, get_signals, install, monitor, uninstall,
    Monitor, MonitorOptions, MonitorRun, MonitorStats,
};
pub use patterns::{
    analyze_patterns, OverallSeverity, ThreatCategory, ThreatFinding, ThreatKind, ThreatReport,
    ThreatSeverity,
};
pub use report::{
    PackageReportEntry, Report, ReportFormat, ReportSummary, RiskDistribution,
};
pub use scoring::{
    score_packages, PackageScore, RiskLevel, RiskThresholds, RiskWeights, BASE_SCORE,
};
pub use signal::{
    HttpMetadata, PackageIdentity, Protocol, Signal, SignalMetadata, SignalType, SignalView,
    SuspiciousRequest,
};
