//! Configuration schema, defaults, validation, and discovery.
//!
//! Configuration arrives either as a caller-provided JSON object
//! (fatal on invalid input) or from a config file discovered in the
//! working directory (invalid input falls back to the defaults and
//! the error list is preserved for the caller). Discovery never
//! traverses upward and refuses directories under `node_modules`.

use crate::error::{Error, Result};
use crate::scoring::{RiskThresholds, RiskWeights};
use crate::signal::SignalType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Config file names probed in the working directory, in priority order.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    ".bheeshmarc.json",
    ".bheeshmarc",
    "bheeshma.config.json",
    "bheeshma.config.js",
];

fn default_true() -> bool {
    true
}

fn default_max_signals() -> usize {
    10_000
}

fn default_formats() -> Vec<String> {
    vec!["cli".to_string()]
}

/// Per-hook enable flags. Every hook defaults to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookConfig {
    #[serde(default = "default_true")]
    pub env: bool,
    #[serde(default = "default_true")]
    pub fs: bool,
    #[serde(default = "default_true")]
    pub net: bool,
    #[serde(default = "default_true")]
    pub child_process: bool,
    /// Covers both HTTP and HTTPS requests
    #[serde(default = "default_true")]
    pub http: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            env: true,
            fs: true,
            net: true,
            child_process: true,
            http: true,
        }
    }
}

/// Per-detector enable flags for the pattern analyzer.
///
/// Credential theft detection has no individual flag and runs
/// whenever the analyzer is enabled; `detect_obfuscation` is part of
/// the on-disk schema but gates no detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub detect_crypto_miners: bool,
    #[serde(default = "default_true")]
    pub detect_data_exfiltration: bool,
    #[serde(default = "default_true")]
    pub detect_backdoors: bool,
    #[serde(default = "default_true")]
    pub detect_obfuscation: bool,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detect_crypto_miners: true,
            detect_data_exfiltration: true,
            detect_backdoors: true,
            detect_obfuscation: true,
        }
    }
}

/// Buffer limits and overhead tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceConfig {
    #[serde(default = "default_true")]
    pub track: bool,
    /// Hard cap on buffered signals; further signals are dropped
    #[serde(default = "default_max_signals")]
    pub max_signals: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            track: true,
            max_signals: default_max_signals(),
        }
    }
}

/// Report rendering verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Normal
    }
}

/// Output shaping for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    #[serde(default)]
    pub verbosity: Verbosity,
    #[serde(default)]
    pub include_stack_traces: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            verbosity: Verbosity::Normal,
            include_stack_traces: false,
        }
    }
}

/// Complete monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    #[serde(default)]
    pub hooks: HookConfig,
    #[serde(default)]
    pub risk_weights: RiskWeights,
    #[serde(default)]
    pub thresholds: RiskThresholds,
    /// Package glob patterns whose signals are suppressed
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Package glob patterns always recorded, overriding the whitelist
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl MonitorConfig {
    /// Build a configuration from a raw JSON object.
    ///
    /// This is the direct-API path: any validation issue is fatal.
    pub fn from_value(value: Value) -> Result<Self> {
        let errors = validate_value(&value);
        if !errors.is_empty() {
            return Err(Error::ConfigValidation(errors));
        }
        serde_json::from_value(value).map_err(Error::from)
    }

    /// Validate an already-typed configuration.
    ///
    /// Typed configs can still carry out-of-range weights, unordered
    /// thresholds, or a zero signal cap.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (signal_type, weight) in self.risk_weights.iter() {
            if weight > 100 {
                errors.push(format!(
                    "riskWeights.{} must be in [0, 100], got {}",
                    signal_type, weight
                ));
            }
        }
        if !self.thresholds.is_valid() {
            errors.push(format!(
                "thresholds must satisfy critical < high < medium <= 100, got {}/{}/{}",
                self.thresholds.critical, self.thresholds.high, self.thresholds.medium
            ));
        }
        if self.performance.max_signals == 0 {
            errors.push("performance.maxSignals must be at least 1".to_string());
        }
        errors
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in defaults
    Defaults,
    /// A discovered config file
    File(PathBuf),
    /// A caller-provided object
    Object,
}

/// Result of configuration loading.
///
/// `errors` is non-empty when the source was rejected and `config`
/// fell back to the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: MonitorConfig,
    pub source: ConfigSource,
    pub errors: Vec<String>,
}

impl LoadedConfig {
    fn defaults(source: ConfigSource, errors: Vec<String>) -> Self {
        Self {
            config: MonitorConfig::default(),
            source,
            errors,
        }
    }
}

/// Load configuration from the current working directory.
pub fn load_config() -> LoadedConfig {
    match std::env::current_dir() {
        Ok(cwd) => load_config_from(&cwd),
        Err(err) => LoadedConfig::defaults(
            ConfigSource::Defaults,
            vec![format!("working directory unavailable: {err}")],
        ),
    }
}

/// Load configuration from a specific directory.
///
/// Probes [`CONFIG_FILE_NAMES`] in order; no upward traversal.
/// Directories under `node_modules` are refused. Any parse or
/// validation failure yields the defaults plus the error list.
pub fn load_config_from(dir: &Path) -> LoadedConfig {
    if dir.components().any(|c| c.as_os_str() == "node_modules") {
        return LoadedConfig::defaults(
            ConfigSource::Defaults,
            vec![format!(
                "refusing configuration under node_modules: {}",
                dir.display()
            )],
        );
    }

    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        let source = ConfigSource::File(path.clone());

        if name.ends_with(".js") {
            warn!(path = %path.display(), "JavaScript config files are not supported");
            return LoadedConfig::defaults(
                source,
                vec![format!(
                    "unsupported configuration source (JavaScript): {}",
                    path.display()
                )],
            );
        }

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                return LoadedConfig::defaults(
                    source,
                    vec![format!("failed to read {}: {err}", path.display())],
                );
            }
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %path.display(), %err, "config parse failed, using defaults");
                return LoadedConfig::defaults(
                    source,
                    vec![format!("failed to parse {}: {err}", path.display())],
                );
            }
        };
        return match MonitorConfig::from_value(value) {
            Ok(config) => LoadedConfig {
                config,
                source,
                errors: Vec::new(),
            },
            Err(Error::ConfigValidation(errors)) => {
                warn!(path = %path.display(), "config validation failed, using defaults");
                LoadedConfig::defaults(source, errors)
            }
            Err(err) => LoadedConfig::defaults(source, vec![err.to_string()]),
        };
    }

    LoadedConfig::defaults(ConfigSource::Defaults, Vec::new())
}

const HOOK_KEYS: [&str; 5] = ["env", "fs", "net", "childProcess", "http"];
const VERBOSITY_VALUES: [&str; 3] = ["quiet", "normal", "verbose"];

/// Validate a raw configuration object field by field.
///
/// Returns every issue found; an empty list means the object merges
/// cleanly over the defaults.
pub fn validate_value(value: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let Some(root) = value.as_object() else {
        return vec!["configuration must be a JSON object".to_string()];
    };

    if let Some(hooks) = root.get("hooks") {
        match hooks.as_object() {
            Some(hooks) => {
                for (key, flag) in hooks {
                    if !HOOK_KEYS.contains(&key.as_str()) {
                        errors.push(format!("unknown hook name: {key}"));
                    } else if !flag.is_boolean() {
                        errors.push(format!("hooks.{key} must be a boolean"));
                    }
                }
            }
            None => errors.push("hooks must be an object".to_string()),
        }
    }

    if let Some(weights) = root.get("riskWeights") {
        match weights.as_object() {
            Some(weights) => {
                for (key, weight) in weights {
                    if SignalType::from_str_opt(key).is_none() {
                        errors.push(format!("unknown signal type in riskWeights: {key}"));
                        continue;
                    }
                    match weight.as_u64() {
                        Some(w) if w <= 100 => {}
                        _ => errors.push(format!("riskWeights.{key} must be in [0, 100]")),
                    }
                }
            }
            None => errors.push("riskWeights must be an object".to_string()),
        }
    }

    if let Some(thresholds) = root.get("thresholds") {
        match thresholds.as_object() {
            Some(map) => {
                let mut bounds = RiskThresholds::default();
                let mut well_typed = true;
                for (key, slot) in [
                    ("critical", &mut bounds.critical),
                    ("high", &mut bounds.high),
                    ("medium", &mut bounds.medium),
                ] {
                    if let Some(v) = map.get(key) {
                        match v.as_u64() {
                            Some(v) if v <= 100 => *slot = v as u32,
                            _ => {
                                well_typed = false;
                                errors.push(format!("thresholds.{key} must be in [0, 100]"));
                            }
                        }
                    }
                }
                if well_typed && !bounds.is_valid() {
                    errors.push(format!(
                        "thresholds must satisfy critical < high < medium, got {}/{}/{}",
                        bounds.critical, bounds.high, bounds.medium
                    ));
                }
            }
            None => errors.push("thresholds must be an object".to_string()),
        }
    }

    for key in ["whitelist", "blacklist"] {
        if let Some(list) = root.get(key) {
            match list.as_array() {
                Some(items) => {
                    if items.iter().any(|item| !item.is_string()) {
                        errors.push(format!("{key} entries must be strings"));
                    }
                }
                None => errors.push(format!("{key} must be an array")),
            }
        }
    }

    if let Some(patterns) = root.get("patterns") {
        match patterns.as_object() {
            Some(patterns) => {
                for (key, flag) in patterns {
                    if !flag.is_boolean() {
                        errors.push(format!("patterns.{key} must be a boolean"));
                    }
                }
            }
            None => errors.push("patterns must be an object".to_string()),
        }
    }

    if let Some(performance) = root.get("performance") {
        match performance.as_object() {
            Some(performance) => {
                if let Some(track) = performance.get("track") {
                    if !track.is_boolean() {
                        errors.push("performance.track must be a boolean".to_string());
                    }
                }
                if let Some(max) = performance.get("maxSignals") {
                    match max.as_u64() {
                        Some(m) if m >= 1 => {}
                        _ => errors.push("performance.maxSignals must be at least 1".to_string()),
                    }
                }
            }
            None => errors.push("performance must be an object".to_string()),
        }
    }

    if let Some(output) = root.get("output") {
        match output.as_object() {
            Some(output) => {
                if let Some(formats) = output.get("formats") {
                    if !formats.is_array() {
                        errors.push("output.formats must be an array".to_string());
                    }
                }
                if let Some(verbosity) = output.get("verbosity") {
                    match verbosity.as_str() {
                        Some(v) if VERBOSITY_VALUES.contains(&v) => {}
                        _ => errors.push(
                            "output.verbosity must be one of quiet, normal, verbose".to_string(),
                        ),
                    }
                }
                if let Some(include) = output.get("includeStackTraces") {
                    if !include.is_boolean() {
                        errors.push("output.includeStackTraces must be a boolean".to_string());
                    }
                }
            }
            None => errors.push("output must be an object".to_string()),
        }
    }

    errors
}
