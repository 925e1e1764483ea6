//! Interception facades over platform APIs.
//!
//! Each hook is a facade the host calls instead of the platform API:
//! [`EnvView`] for environment variables, [`FsApi`] for the
//! filesystem, [`NetApi`] for TCP/IPC connections, [`HttpApi`] for
//! HTTP(S) requests, and [`ProcessApi`] for child processes. A facade
//! always delegates to the real platform; when its hook is installed
//! and enabled it additionally captures a stack, attributes the call,
//! and records a signal first.
//!
//! Every facade upholds the same contract: arguments are forwarded
//! unchanged, results and errors are returned unchanged, and any
//! failure in the observation path is swallowed before it can touch
//! the delegated operation.

mod env;
mod fs;
mod http;
mod net;
mod process;

pub use env::EnvView;
pub use fs::{FsApi, PathValue};
pub use http::{assess_request, redact_headers, HttpApi, RequestOptions, RequestTarget};
pub use net::{ConnectOptions, ConnectTarget, NetApi};
pub use process::{sanitize_command, ProcessApi, SHELL_TEMPLATE_MAX};

use crate::config::HookConfig;
use serde::{Deserialize, Serialize};

/// The installable hooks, one per platform surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookKind {
    /// Environment variable container
    Env,
    /// Filesystem read and write APIs
    Fs,
    /// Low-level connection entry point
    Net,
    /// HTTP and HTTPS request entry points
    Http,
    /// Child process creation
    ChildProcess,
}

impl HookKind {
    /// All hooks, in install order.
    pub const ALL: [HookKind; 5] = [
        HookKind::Env,
        HookKind::Fs,
        HookKind::Net,
        HookKind::Http,
        HookKind::ChildProcess,
    ];

    /// Config key of the hook.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Fs => "fs",
            Self::Net => "net",
            Self::Http => "http",
            Self::ChildProcess => "childProcess",
        }
    }

    /// Whether configuration enables this hook.
    pub fn enabled_in(&self, hooks: &HookConfig) -> bool {
        match self {
            Self::Env => hooks.env,
            Self::Fs => hooks.fs,
            Self::Net => hooks.net,
            Self::Http => hooks.http,
            Self::ChildProcess => hooks.child_process,
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A hook that could not be installed or uninstalled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookFailure {
    pub hook: HookKind,
    pub error: String,
}

/// Outcome of [`crate::Monitor::install`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallResult {
    /// True when every enabled hook installed
    pub success: bool,
    pub installed: Vec<HookKind>,
    pub failed: Vec<HookFailure>,
    /// Validation errors from a rejected configuration; the monitor
    /// fell back to the defaults when this is non-empty
    pub config_errors: Vec<String>,
}

/// Outcome of [`crate::Monitor::uninstall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UninstallResult {
    pub success: bool,
    pub uninstalled: Vec<HookKind>,
    pub failed: Vec<HookFailure>,
}
