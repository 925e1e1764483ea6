//! Child-process facade and command sanitizer.
//!
//! [`ProcessApi`] wraps the process-creation entry points. Each call
//! extracts a single command template, sanitizes it (credential
//! redaction first, truncation second, so no secret fragment survives
//! a cut), records a `ShellExec` signal, and delegates to
//! `std::process::Command`.

use crate::hooks::HookKind;
use crate::monitor::Monitor;
use crate::signal::{SignalMetadata, SignalType, TRUNCATED_MARKER};
use regex::Regex;
use std::io;
use std::process::{Child, Command, Output, Stdio};
use std::sync::LazyLock;

/// Maximum length of a sanitized command template.
pub const SHELL_TEMPLATE_MAX: usize = 200;

static FLAG_SECRETS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(--(?:password|token|api-key|secret))(=|\s+)\S+").expect("invalid regex")
});

static ENV_ASSIGNMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_]+_(?:KEY|TOKEN|SECRET))=\S+").expect("invalid regex")
});

/// Sanitize a command template for logging.
///
/// Redacts `--password`, `--token`, `--api-key`, and `--secret`
/// values (both `=` and space forms) and `*_KEY=`, `*_TOKEN=`,
/// `*_SECRET=` assignments, then truncates to
/// [`SHELL_TEMPLATE_MAX`] characters.
pub fn sanitize_command(raw: &str) -> String {
    let redacted = FLAG_SECRETS.replace_all(raw, "$1$2***");
    let redacted = ENV_ASSIGNMENTS.replace_all(&redacted, "$1=***");

    if redacted.chars().count() > SHELL_TEMPLATE_MAX {
        let head: String = redacted.chars().take(SHELL_TEMPLATE_MAX).collect();
        format!("{}{}", head, TRUNCATED_MARKER)
    } else {
        redacted.into_owned()
    }
}

fn command_template(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Facade over the child-process creation APIs.
pub struct ProcessApi {
    monitor: Monitor,
}

impl ProcessApi {
    pub(crate) fn new(monitor: Monitor) -> Self {
        Self { monitor }
    }

    fn observe(&self, template: &str, operation: &str) {
        self.monitor.record(
            HookKind::ChildProcess,
            SignalType::ShellExec,
            SignalMetadata::ShellExec {
                command: sanitize_command(template),
                operation: operation.to_string(),
            },
        );
    }

    /// Run a command line through the shell, returning the child.
    pub fn exec(&self, command: &str) -> io::Result<Child> {
        self.observe(command, "exec");
        shell_command(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    /// Run a command line through the shell and wait for its output.
    pub fn exec_sync(&self, command: &str) -> io::Result<Output> {
        self.observe(command, "exec_sync");
        shell_command(command).output()
    }

    /// Spawn a program directly with arguments, returning the child.
    pub fn exec_file(&self, program: &str, args: &[&str]) -> io::Result<Child> {
        self.observe(&command_template(program, args), "exec_file");
        Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    /// Spawn a program directly and wait for its output.
    pub fn exec_file_sync(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        self.observe(&command_template(program, args), "exec_file_sync");
        Command::new(program).args(args).output()
    }

    /// Spawn a program, inheriting standard streams.
    pub fn spawn(&self, program: &str, args: &[&str]) -> io::Result<Child> {
        self.observe(&command_template(program, args), "spawn");
        Command::new(program).args(args).spawn()
    }

    /// Spawn a program and wait for its output.
    pub fn spawn_sync(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        self.observe(&command_template(program, args), "spawn_sync");
        Command::new(program).args(args).output()
    }

    /// Spawn a module in a new interpreter process.
    pub fn fork(&self, module_path: &str, args: &[&str]) -> io::Result<Child> {
        self.observe(&format!("node {}", module_path), "fork");
        Command::new("node")
            .arg(module_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_flag_equals_form() {
        assert_eq!(
            sanitize_command("deploy --password=hunter2 --verbose"),
            "deploy --password=*** --verbose"
        );
        assert_eq!(
            sanitize_command("curl --api-key=abc123 https://example.com"),
            "curl --api-key=*** https://example.com"
        );
    }

    #[test]
    fn test_sanitize_flag_space_form() {
        assert_eq!(
            sanitize_command("publish --token tok_456 --dry-run"),
            "publish --token *** --dry-run"
        );
        assert_eq!(sanitize_command("run --secret s3cret"), "run --secret ***");
    }

    #[test]
    fn test_sanitize_env_assignments() {
        assert_eq!(
            sanitize_command("AWS_SECRET_KEY=abcd npm publish"),
            "AWS_SECRET_KEY=*** npm publish"
        );
        assert_eq!(
            sanitize_command("NPM_TOKEN=tok node publish.js"),
            "NPM_TOKEN=*** node publish.js"
        );
        assert_eq!(
            sanitize_command("CLIENT_SECRET=shh ./run.sh"),
            "CLIENT_SECRET=*** ./run.sh"
        );
    }

    #[test]
    fn test_sanitize_leaves_clean_commands() {
        assert_eq!(sanitize_command("ls -la /tmp"), "ls -la /tmp");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(300);
        let sanitized = sanitize_command(&long);
        assert!(sanitized.ends_with(TRUNCATED_MARKER));
        assert_eq!(
            sanitized.chars().count(),
            SHELL_TEMPLATE_MAX + TRUNCATED_MARKER.chars().count()
        );
    }

    #[test]
    fn test_redaction_happens_before_truncation() {
        // The secret sits past the truncation cut; redaction must
        // still remove it entirely.
        let command = format!("{} --password=12345678 x", "b".repeat(195));
        let sanitized = sanitize_command(&command);
        assert!(!sanitized.contains("12345678"));
        assert!(!sanitized.contains("1234"));
    }

    #[test]
    fn test_command_template() {
        assert_eq!(command_template("git", &["status"]), "git status");
        assert_eq!(command_template("ls", &[]), "ls");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_sync_delegates() {
        let api = ProcessApi::new(Monitor::new());
        let output = api.exec_sync("echo facade-test").unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "facade-test\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_sync_delegates() {
        let api = ProcessApi::new(Monitor::new());
        let output = api.spawn_sync("echo", &["hi"]).unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hi\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_program_error_matches_std() {
        let api = ProcessApi::new(Monitor::new());
        let facade_err = api.spawn_sync("bheeshma-no-such-bin", &[]).unwrap_err();
        let std_err = Command::new("bheeshma-no-such-bin").output().unwrap_err();
        assert_eq!(facade_err.kind(), std_err.kind());
    }

    proptest! {
        #[test]
        fn prop_flag_secret_never_survives(secret in "[0-9]{4,16}") {
            for flag in ["--password", "--token", "--api-key", "--secret"] {
                let command = format!("x {flag}={secret}");
                prop_assert!(!sanitize_command(&command).contains(&secret));

                let spaced = format!("x {flag} {secret}");
                prop_assert!(!sanitize_command(&spaced).contains(&secret));
            }
        }

        #[test]
        fn prop_env_secret_never_survives(secret in "[0-9]{4,16}") {
            for suffix in ["KEY", "TOKEN", "SECRET"] {
                let command = format!("VENDOR_{suffix}={secret} run");
                prop_assert!(!sanitize_command(&command).contains(&secret));
            }
        }
    }
}
