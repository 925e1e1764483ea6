//! Monitor context and public surface.
//!
//! A [`Monitor`] owns the signal buffer, the attribution engine, the
//! active configuration, and the installed hook set; the facades
//! close over a clone of it. A process-wide default monitor backs
//! the top-level [`install`]/[`uninstall`]/[`get_signals`] functions
//! for drop-in use.
//!
//! The observation pipeline is fail-safe by construction: a hook
//! that is not installed, a stack that cannot be attributed, a
//! poisoned lock, or a full buffer all drop the observation and
//! never the delegated operation.

use crate::attribution::{AttributionEngine, ScriptStackProvider, StackProvider};
use crate::config::{load_config, MonitorConfig};
use crate::error::{Error, Result};
use crate::hooks::{
    EnvView, FsApi, HookFailure, HookKind, HttpApi, InstallResult, NetApi, ProcessApi,
    UninstallResult,
};
use crate::patterns::{analyze_patterns, ThreatReport};
use crate::report::{Report, ReportFormat};
use crate::scoring::{score_packages, PackageScore};
use crate::signal::{Signal, SignalMetadata, SignalType};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock, Mutex};
use tracing::{debug, warn};

/// Counters kept while `performance.track` is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    /// Signals appended to the buffer
    pub emitted: u64,
    /// Observations dropped for lack of attribution
    pub unattributed: u64,
    /// Observations suppressed by the whitelist
    pub suppressed: u64,
    /// Observations dropped at the buffer capacity limit
    pub dropped_capacity: u64,
}

/// Runtime dependency behavior monitor.
///
/// Cheap to clone; clones share the same buffer, cache, and state.
#[derive(Clone)]
pub struct Monitor {
    signals: Arc<Mutex<Vec<Signal>>>,
    attribution: Arc<AttributionEngine>,
    config: Arc<Mutex<MonitorConfig>>,
    active: Arc<Mutex<BTreeSet<HookKind>>>,
    installed: Arc<Mutex<bool>>,
    http_client: Arc<Mutex<Option<Client>>>,
    stack: Arc<dyn StackProvider>,
    stats: Arc<Mutex<MonitorStats>>,
}

impl Monitor {
    /// Create a monitor with the default stack provider.
    pub fn new() -> Self {
        Self::with_stack_provider(Arc::new(ScriptStackProvider::new()))
    }

    /// Create a monitor with a custom stack provider.
    pub fn with_stack_provider(stack: Arc<dyn StackProvider>) -> Self {
        Self {
            signals: Arc::new(Mutex::new(Vec::new())),
            attribution: Arc::new(AttributionEngine::new()),
            config: Arc::new(Mutex::new(MonitorConfig::default())),
            active: Arc::new(Mutex::new(BTreeSet::new())),
            installed: Arc::new(Mutex::new(false)),
            http_client: Arc::new(Mutex::new(None)),
            stack,
            stats: Arc::new(Mutex::new(MonitorStats::default())),
        }
    }

    // ==================== Lifecycle ====================

    /// Install the configured hooks.
    ///
    /// With no configuration, discovery runs in the working
    /// directory. An invalid configuration falls back to the
    /// defaults, with the error list reported in the result.
    /// Re-installing without an uninstall is a no-op success.
    pub fn install(&self, config: Option<MonitorConfig>) -> InstallResult {
        let Ok(mut installed) = self.installed.lock() else {
            return InstallResult {
                success: false,
                installed: Vec::new(),
                failed: Vec::new(),
                config_errors: vec!["monitor state unavailable".to_string()],
            };
        };
        if *installed {
            let active = self
                .active
                .lock()
                .map(|a| a.iter().copied().collect())
                .unwrap_or_default();
            return InstallResult {
                success: true,
                installed: active,
                failed: Vec::new(),
                config_errors: Vec::new(),
            };
        }

        let (config, config_errors) = match config {
            Some(config) => {
                let errors = config.validate();
                if errors.is_empty() {
                    (config, Vec::new())
                } else {
                    warn!(?errors, "invalid configuration, using defaults");
                    (MonitorConfig::default(), errors)
                }
            }
            None => {
                let loaded = load_config();
                if !loaded.errors.is_empty() {
                    warn!(errors = ?loaded.errors, "config discovery failed, using defaults");
                }
                (loaded.config, loaded.errors)
            }
        };

        // The buffer starts empty for every install.
        if let Ok(mut signals) = self.signals.lock() {
            signals.clear();
        }
        if let Ok(mut stats) = self.stats.lock() {
            *stats = MonitorStats::default();
        }

        let mut installed_hooks = Vec::new();
        let mut failed = Vec::new();
        for kind in HookKind::ALL {
            if !kind.enabled_in(&config.hooks) {
                continue;
            }
            match self.install_hook(kind) {
                Ok(()) => {
                    if let Ok(mut active) = self.active.lock() {
                        active.insert(kind);
                    }
                    installed_hooks.push(kind);
                }
                Err(error) => {
                    warn!(hook = %kind, %error, "hook install failed");
                    failed.push(HookFailure { hook: kind, error });
                }
            }
        }

        if let Ok(mut current) = self.config.lock() {
            *current = config;
        }
        *installed = true;

        InstallResult {
            success: failed.is_empty(),
            installed: installed_hooks,
            failed,
            config_errors,
        }
    }

    fn install_hook(&self, kind: HookKind) -> std::result::Result<(), String> {
        match kind {
            HookKind::Http => {
                let client = Client::builder().build().map_err(|e| e.to_string())?;
                let mut slot = self
                    .http_client
                    .lock()
                    .map_err(|_| "http client state unavailable".to_string())?;
                *slot = Some(client);
                Ok(())
            }
            // The remaining facades delegate to infallible bindings.
            HookKind::Env | HookKind::Fs | HookKind::Net | HookKind::ChildProcess => Ok(()),
        }
    }

    /// Uninstall every hook and clear the buffer.
    pub fn uninstall(&self) -> UninstallResult {
        let Ok(mut installed) = self.installed.lock() else {
            return UninstallResult {
                success: false,
                uninstalled: Vec::new(),
                failed: Vec::new(),
            };
        };

        let uninstalled = match self.active.lock() {
            Ok(mut active) => {
                let hooks: Vec<HookKind> = active.iter().copied().collect();
                active.clear();
                hooks
            }
            Err(_) => Vec::new(),
        };
        if let Ok(mut signals) = self.signals.lock() {
            signals.clear();
        }
        if let Ok(mut client) = self.http_client.lock() {
            *client = None;
        }
        *installed = false;

        UninstallResult {
            success: true,
            uninstalled,
            failed: Vec::new(),
        }
    }

    /// Whether a hook is installed and enabled.
    pub fn hook_active(&self, kind: HookKind) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(&kind))
            .unwrap_or(false)
    }

    // ==================== Observation ====================

    /// Record an observation from a facade.
    ///
    /// Silent on every failure path; the facade's delegation is
    /// never affected by what happens here.
    pub(crate) fn record(&self, hook: HookKind, signal_type: SignalType, metadata: SignalMetadata) {
        if !self.hook_active(hook) {
            return;
        }

        let stack = self.stack.capture();
        let Some(attribution) = self.attribution.attribute(&stack) else {
            self.bump(|stats| stats.unattributed += 1);
            return;
        };

        let (suppressed, max_signals) = {
            let Ok(config) = self.config.lock() else {
                return;
            };
            let name = &attribution.package.name;
            let blacklisted = matches_any(&config.blacklist, name);
            let whitelisted = !blacklisted && matches_any(&config.whitelist, name);
            (whitelisted, config.performance.max_signals)
        };
        if suppressed {
            debug!(package = %attribution.package, "whitelisted package suppressed");
            self.bump(|stats| stats.suppressed += 1);
            return;
        }

        let Ok(mut signals) = self.signals.lock() else {
            return;
        };
        if signals.len() >= max_signals {
            drop(signals);
            self.bump(|stats| stats.dropped_capacity += 1);
            return;
        }

        let signal = match metadata {
            SignalMetadata::Http(http) => Signal::http(
                signal_type == SignalType::HttpsRequest,
                attribution.package,
                http,
                stack,
            ),
            other => Signal::new(attribution.package, other, stack),
        };
        signals.push(signal);
        drop(signals);
        self.bump(|stats| stats.emitted += 1);
    }

    fn bump(&self, update: impl FnOnce(&mut MonitorStats)) {
        let track = self
            .config
            .lock()
            .map(|config| config.performance.track)
            .unwrap_or(false);
        if !track {
            return;
        }
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }

    // ==================== Facades ====================

    /// Environment variable facade.
    pub fn env(&self) -> EnvView {
        EnvView::new(self.clone())
    }

    /// Filesystem facade.
    pub fn fs(&self) -> FsApi {
        FsApi::new(self.clone())
    }

    /// Connection facade.
    pub fn net(&self) -> NetApi {
        NetApi::new(self.clone())
    }

    /// Child-process facade.
    pub fn process(&self) -> ProcessApi {
        ProcessApi::new(self.clone())
    }

    /// HTTP(S) request facade.
    ///
    /// Reuses the client built at install time; building one on
    /// demand is the only fallible step.
    pub fn http(&self) -> Result<HttpApi> {
        let existing = self
            .http_client
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        let client = match existing {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|e| Error::internal(format!("http client unavailable: {e}")))?,
        };
        Ok(HttpApi::new(self.clone(), client))
    }

    // ==================== Analysis & reporting ====================

    /// Snapshot copy of the signal buffer.
    pub fn get_signals(&self) -> Vec<Signal> {
        self.signals
            .lock()
            .map(|signals| signals.clone())
            .unwrap_or_default()
    }

    /// Drop all buffered signals, keeping the hooks installed.
    pub fn clear_signals(&self) {
        if let Ok(mut signals) = self.signals.lock() {
            signals.clear();
        }
    }

    /// Score every package in the buffer.
    pub fn get_scores(&self) -> HashMap<String, PackageScore> {
        let signals = self.get_signals();
        let config = self.config_snapshot();
        score_packages(&signals, &config.risk_weights, &config.thresholds)
    }

    /// Run the pattern analyzer over the buffer.
    pub fn analyze(&self) -> ThreatReport {
        let signals = self.get_signals();
        let config = self.config_snapshot();
        analyze_patterns(&signals, &config.patterns)
    }

    /// Build the structured report over the current buffer.
    pub fn report(&self) -> Report {
        let signals = self.get_signals();
        let config = self.config_snapshot();
        let scores = score_packages(&signals, &config.risk_weights, &config.thresholds);
        Report::build(&signals, &scores, &config.output)
    }

    /// Render a report in the requested format.
    pub fn generate_report(&self, format: ReportFormat) -> String {
        let report = self.report();
        match format {
            ReportFormat::Json => report.to_json(),
            ReportFormat::Cli => report.render_text(self.config_snapshot().output.verbosity),
        }
    }

    /// Current statistics counters.
    pub fn stats(&self) -> MonitorStats {
        self.stats.lock().map(|stats| *stats).unwrap_or_default()
    }

    /// Active configuration.
    pub fn config_snapshot(&self) -> MonitorConfig {
        self.config
            .lock()
            .map(|config| config.clone())
            .unwrap_or_default()
    }

    /// Install, run `f`, build the report, uninstall.
    pub fn run<T, F: FnOnce() -> T>(&self, f: F, options: MonitorOptions) -> MonitorRun<T> {
        let install = self.install(options.config);
        let result = f();
        let report = self.report();
        self.uninstall();
        MonitorRun {
            result,
            report,
            install,
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_any(patterns: &[String], name: &str) -> bool {
    patterns.iter().any(|pattern| {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(name))
            .unwrap_or(false)
    })
}

/// Options for [`monitor`].
#[derive(Debug, Clone, Default)]
pub struct MonitorOptions {
    pub config: Option<MonitorConfig>,
}

/// Result of a monitored run.
#[derive(Debug)]
pub struct MonitorRun<T> {
    /// Return value of the monitored closure
    pub result: T,
    /// Report over everything observed during the run
    pub report: Report,
    /// Install outcome, for callers that care about partial failure
    pub install: InstallResult,
}

static DEFAULT_MONITOR: LazyLock<Monitor> = LazyLock::new(Monitor::new);

/// The process-wide default monitor.
pub fn default_monitor() -> &'static Monitor {
    &DEFAULT_MONITOR
}

/// Install hooks on the default monitor.
pub fn install(config: Option<MonitorConfig>) -> InstallResult {
    DEFAULT_MONITOR.install(config)
}

/// Uninstall hooks on the default monitor.
pub fn uninstall() -> UninstallResult {
    DEFAULT_MONITOR.uninstall()
}

/// Snapshot of the default monitor's signal buffer.
pub fn get_signals() -> Vec<Signal> {
    DEFAULT_MONITOR.get_signals()
}

/// Scores over the default monitor's buffer.
pub fn get_scores() -> HashMap<String, PackageScore> {
    DEFAULT_MONITOR.get_scores()
}

/// Render a report from the default monitor.
pub fn generate_report(format: ReportFormat) -> String {
    DEFAULT_MONITOR.generate_report(format)
}

/// Install, run `f`, report, uninstall, all on the default monitor.
pub fn monitor<T, F: FnOnce() -> T>(f: F, options: MonitorOptions) -> MonitorRun<T> {
    DEFAULT_MONITOR.run(f, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::ScriptFrame;
    use crate::signal::SignalType;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// A tempdir with a `node_modules/<name>` package ready for
    /// attribution, plus a scratch area for monitored file I/O.
    struct Fixture {
        _tmp: TempDir,
        package_file: PathBuf,
        scratch: PathBuf,
    }

    fn fixture(name: &str, version: &str) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let pkg_dir = tmp.path().join("node_modules").join(name);
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(
            pkg_dir.join("package.json"),
            format!(r#"{{"name":"{name}","version":"{version}"}}"#),
        )
        .unwrap();
        let scratch = tmp.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();
        Fixture {
            package_file: pkg_dir.join("index.js"),
            scratch,
            _tmp: tmp,
        }
    }

    fn installed_monitor() -> Monitor {
        let monitor = Monitor::new();
        let result = monitor.install(Some(MonitorConfig::default()));
        assert!(result.success);
        monitor
    }

    #[test]
    fn test_install_reports_enabled_hooks() {
        let monitor = Monitor::new();
        let result = monitor.install(Some(MonitorConfig::default()));
        assert!(result.success);
        assert_eq!(result.installed.len(), 5);
        assert!(result.failed.is_empty());
        assert!(result.config_errors.is_empty());
    }

    #[test]
    fn test_install_respects_hook_flags() {
        let mut config = MonitorConfig::default();
        config.hooks.net = false;
        config.hooks.child_process = false;

        let monitor = Monitor::new();
        let result = monitor.install(Some(config));
        assert!(result.success);
        assert!(!result.installed.contains(&HookKind::Net));
        assert!(!result.installed.contains(&HookKind::ChildProcess));
        assert!(!monitor.hook_active(HookKind::Net));
        assert!(monitor.hook_active(HookKind::Fs));
    }

    #[test]
    fn test_install_is_idempotent() {
        let monitor = installed_monitor();
        let again = monitor.install(Some(MonitorConfig::default()));
        assert!(again.success);
        assert_eq!(again.installed.len(), 5);
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let mut config = MonitorConfig::default();
        config.performance.max_signals = 0;

        let monitor = Monitor::new();
        let result = monitor.install(Some(config));
        assert!(result.success);
        assert_eq!(result.config_errors.len(), 1);
        assert_eq!(monitor.config_snapshot(), MonitorConfig::default());
    }

    #[test]
    fn test_attribution_via_node_modules() {
        let fx = fixture("bar", "1.2.3");
        let target = fx.scratch.join("x");
        std::fs::write(&target, b"data").unwrap();

        let monitor = installed_monitor();
        let _frame = ScriptFrame::enter(&fx.package_file);
        monitor.fs().read_file(target.clone()).unwrap();

        let signals = monitor.get_signals();
        assert_eq!(signals.len(), 1);
        let signal = &signals[0];
        assert_eq!(signal.signal_type(), SignalType::FsRead);
        assert_eq!(signal.package().name, "bar");
        assert_eq!(signal.package().version, "1.2.3");
        match signal.metadata() {
            crate::signal::SignalMetadata::FsRead { path, operation } => {
                assert_eq!(path, &target);
                assert_eq!(operation, "read_file");
            }
            other => panic!("unexpected metadata: {other:?}"),
        }
    }

    #[test]
    fn test_scoped_package_env_access_captures_name_only() {
        let fx = fixture("@acme/lib", "2.0.1");
        // SAFETY: no other test touches this process-global variable.
        unsafe { std::env::set_var("BHEESHMA_FOO", "extremely-secret-value") };

        let monitor = installed_monitor();
        {
            let _frame = ScriptFrame::enter(&fx.package_file);
            let value = monitor.env().var("BHEESHMA_FOO").unwrap();
            assert_eq!(value, "extremely-secret-value");
        }
        // SAFETY: as above.
        unsafe { std::env::remove_var("BHEESHMA_FOO") };

        let signals = monitor.get_signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].package().name, "@acme/lib");
        match signals[0].metadata() {
            crate::signal::SignalMetadata::Env { variable } => {
                assert_eq!(variable, "BHEESHMA_FOO");
            }
            other => panic!("unexpected metadata: {other:?}"),
        }
        // The value appears nowhere in the serialized signal.
        let serialized = serde_json::to_string(&signals[0]).unwrap();
        assert!(!serialized.contains("extremely-secret-value"));
    }

    #[test]
    fn test_scoped_fixture_version_scoping() {
        let fx = fixture("@acme/lib", "2.0.1");
        let monitor = installed_monitor();
        let _frame = ScriptFrame::enter(&fx.package_file);
        monitor.env().contains("PATH");

        let scores = monitor.get_scores();
        assert!(scores.contains_key("@acme/lib@2.0.1"));
    }

    #[test]
    fn test_first_party_emits_nothing() {
        let fx = fixture("bar", "1.0.0");
        let target = fx.scratch.join("y");
        std::fs::write(&target, b"data").unwrap();

        let monitor = installed_monitor();
        // No script frame: the stack is first-party.
        monitor.fs().read_file(target).unwrap();
        assert!(monitor.get_signals().is_empty());
        assert_eq!(monitor.stats().unattributed, 1);
    }

    #[test]
    fn test_install_uninstall_round_trip() {
        let fx = fixture("bar", "1.0.0");
        let target = fx.scratch.join("z");
        std::fs::write(&target, b"data").unwrap();

        let monitor = installed_monitor();
        let uninstall = monitor.uninstall();
        assert!(uninstall.success);
        assert_eq!(uninstall.uninstalled.len(), 5);

        let _frame = ScriptFrame::enter(&fx.package_file);
        monitor.fs().read_file(target).unwrap();
        monitor.env().contains("PATH");
        assert!(monitor.get_signals().is_empty());
    }

    #[test]
    fn test_http_suspicious_request() {
        let fx = fixture("bar", "1.0.0");
        let monitor = installed_monitor();
        let _frame = ScriptFrame::enter(&fx.package_file);

        // Prepared but never sent; the signal is recorded at call time.
        let _builder = monitor.http().unwrap().request("http://192.168.1.100:8080/x");

        let signals = monitor.get_signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type(), SignalType::HttpRequest);
        match signals[0].metadata() {
            crate::signal::SignalMetadata::Http(http) => {
                assert!(http.suspicious.is_ip_address);
                assert!(!http.suspicious.non_standard_port);
                assert!(http
                    .suspicious
                    .indicators
                    .contains(&"Direct IP request".to_string()));
                assert_eq!(http.host, "192.168.1.100");
                assert_eq!(http.port, 8080);
            }
            other => panic!("unexpected metadata: {other:?}"),
        }
    }

    #[test]
    fn test_whitelist_suppresses() {
        let fx = fixture("trusted-pkg", "1.0.0");
        let mut config = MonitorConfig::default();
        config.whitelist = vec!["trusted-*".to_string()];

        let monitor = Monitor::new();
        monitor.install(Some(config));
        let _frame = ScriptFrame::enter(&fx.package_file);
        monitor.env().contains("PATH");

        assert!(monitor.get_signals().is_empty());
        assert_eq!(monitor.stats().suppressed, 1);
    }

    #[test]
    fn test_blacklist_overrides_whitelist() {
        let fx = fixture("trusted-pkg", "1.0.0");
        let mut config = MonitorConfig::default();
        config.whitelist = vec!["trusted-*".to_string()];
        config.blacklist = vec!["trusted-pkg".to_string()];

        let monitor = Monitor::new();
        monitor.install(Some(config));
        let _frame = ScriptFrame::enter(&fx.package_file);
        monitor.env().contains("PATH");

        assert_eq!(monitor.get_signals().len(), 1);
    }

    #[test]
    fn test_max_signals_cap() {
        let fx = fixture("chatty", "1.0.0");
        let mut config = MonitorConfig::default();
        config.performance.max_signals = 2;

        let monitor = Monitor::new();
        monitor.install(Some(config));
        let _frame = ScriptFrame::enter(&fx.package_file);
        for _ in 0..5 {
            monitor.env().contains("PATH");
        }

        assert_eq!(monitor.get_signals().len(), 2);
        assert_eq!(monitor.stats().dropped_capacity, 3);
    }

    #[test]
    fn test_signals_keep_interception_order() {
        let fx = fixture("ordered", "1.0.0");
        let monitor = installed_monitor();
        let _frame = ScriptFrame::enter(&fx.package_file);

        monitor.env().contains("FIRST");
        monitor.env().contains("SECOND");
        monitor.env().contains("THIRD");

        let names: Vec<String> = monitor
            .get_signals()
            .iter()
            .map(|s| match s.metadata() {
                crate::signal::SignalMetadata::Env { variable } => variable.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["FIRST", "SECOND", "THIRD"]);
    }

    #[test]
    fn test_scores_and_analysis_over_buffer() {
        let fx = fixture("shelly", "1.0.0");
        let monitor = installed_monitor();
        {
            let _frame = ScriptFrame::enter(&fx.package_file);
            let _ = monitor.process().exec_sync("echo one");
            let _ = monitor.process().exec_sync("echo two");
            let _ = monitor.process().exec_sync("echo three");
        }

        let scores = monitor.get_scores();
        let score = &scores["shelly@1.0.0"];
        assert_eq!(score.score, 40);
        assert_eq!(score.stats[&SignalType::ShellExec], 3);

        let threats = monitor.analyze();
        assert!(threats.is_empty());
    }

    #[test]
    fn test_generate_report_formats() {
        let fx = fixture("reportee", "3.1.4");
        let monitor = installed_monitor();
        {
            let _frame = ScriptFrame::enter(&fx.package_file);
            monitor.env().contains("PATH");
        }

        let json = monitor.generate_report(ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["packages"][0]["name"], "reportee");

        let text = monitor.generate_report(ReportFormat::Cli);
        assert!(text.contains("reportee@3.1.4"));
    }

    #[test]
    fn test_run_convenience() {
        let fx = fixture("runner", "1.0.0");
        let monitor = Monitor::new();

        let run = monitor.run(
            || {
                let _frame = ScriptFrame::enter(&fx.package_file);
                monitor.env().contains("HOME");
                21 * 2
            },
            MonitorOptions::default(),
        );

        assert_eq!(run.result, 42);
        assert!(run.install.success);
        assert_eq!(run.report.summary.total_signals, 1);
        // Uninstalled afterwards: nothing further is recorded.
        let _frame = ScriptFrame::enter(&fx.package_file);
        monitor.env().contains("HOME");
        assert!(monitor.get_signals().is_empty());
    }

    #[test]
    fn test_clear_signals_keeps_hooks() {
        let fx = fixture("clearer", "1.0.0");
        let monitor = installed_monitor();
        let _frame = ScriptFrame::enter(&fx.package_file);

        monitor.env().contains("PATH");
        monitor.clear_signals();
        assert!(monitor.get_signals().is_empty());

        monitor.env().contains("PATH");
        assert_eq!(monitor.get_signals().len(), 1);
    }

    #[test]
    fn test_default_monitor_surface() {
        // The only test that touches the global instance.
        let fx = fixture("global-pkg", "1.0.0");
        let result = install(Some(MonitorConfig::default()));
        assert!(result.success);

        {
            let _frame = ScriptFrame::enter(&fx.package_file);
            default_monitor().env().contains("PATH");
        }
        assert_eq!(get_signals().len(), 1);
        assert!(get_scores().contains_key("global-pkg@1.0.0"));
        assert!(generate_report(ReportFormat::Cli).contains("global-pkg"));

        let result = uninstall();
        assert!(result.success);
        assert!(get_signals().is_empty());
    }

    #[test]
    fn test_nested_package_attribution_uses_innermost_frame() {
        let fx_outer = fixture("outer", "1.0.0");
        let fx_inner = fixture("inner", "2.0.0");

        let monitor = installed_monitor();
        let _outer = ScriptFrame::enter(&fx_outer.package_file);
        let _inner = ScriptFrame::enter(&fx_inner.package_file);
        monitor.env().contains("PATH");

        let signals = monitor.get_signals();
        assert_eq!(signals[0].package().name, "inner");
    }

    #[test]
    fn test_report_path_survives_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let orphan = tmp.path().join("node_modules/orphan");
        std::fs::create_dir_all(&orphan).unwrap();

        let monitor = installed_monitor();
        let _frame = ScriptFrame::enter(orphan.join("index.js"));
        monitor.env().contains("PATH");

        // Unresolvable manifest: the observation is dropped, the
        // host-visible call already succeeded.
        assert!(monitor.get_signals().is_empty());
    }
}
