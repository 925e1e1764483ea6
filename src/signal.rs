//! Signal types for observed runtime behavior.
//!
//! A [`Signal`] is an immutable observation of a side effect performed
//! by third-party code: an environment read, a filesystem operation,
//! an outbound connection, an HTTP(S) request, or a child-process
//! spawn. Signals carry metadata only (variable names, paths, hosts,
//! sanitized command templates), never values, bodies, or responses.

use crate::attribution::CallStack;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Maximum length of a string metadata field in report projections.
pub const METADATA_TRUNCATE_LEN: usize = 500;

/// Marker appended to truncated metadata strings.
pub const TRUNCATED_MARKER: &str = "…[TRUNCATED]";

/// The kind of runtime behavior a signal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalType {
    /// Environment variable read, write, or membership test
    EnvAccess,
    /// Filesystem read operation
    FsRead,
    /// Filesystem write, create, delete, or rename operation
    FsWrite,
    /// Low-level TCP (or IPC) connection
    NetConnect,
    /// Plain HTTP request
    HttpRequest,
    /// TLS HTTP request
    HttpsRequest,
    /// Child process creation
    ShellExec,
}

impl SignalType {
    /// All signal types, in a fixed order.
    pub const ALL: [SignalType; 7] = [
        SignalType::EnvAccess,
        SignalType::FsRead,
        SignalType::FsWrite,
        SignalType::NetConnect,
        SignalType::HttpRequest,
        SignalType::HttpsRequest,
        SignalType::ShellExec,
    ];

    /// Wire name of the signal type, as used in configuration and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnvAccess => "envAccess",
            Self::FsRead => "fsRead",
            Self::FsWrite => "fsWrite",
            Self::NetConnect => "netConnect",
            Self::HttpRequest => "httpRequest",
            Self::HttpsRequest => "httpsRequest",
            Self::ShellExec => "shellExec",
        }
    }

    /// Parse a wire name back into a signal type.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport protocol recorded for connection signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Http,
    Https,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// Identity of a third-party package: name plus resolved version.
///
/// Names may be scoped (`@scope/name`). Two packages with the same
/// name and different versions are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    /// Package name as declared in its manifest
    pub name: String,
    /// Manifest version, or `"unknown"` when the manifest omits it
    pub version: String,
}

impl PackageIdentity {
    /// Create a package identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Grouping key of the form `name@version`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Analysis subrecord attached to HTTP(S) request metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousRequest {
    /// Host is a dotted-quad IP literal
    pub is_ip_address: bool,
    /// Host ends with a TLD common in throwaway infrastructure
    pub suspicious_tld: bool,
    /// Port is outside {80, 443, 8080}
    pub non_standard_port: bool,
    /// Host belongs to a paste service
    pub pastebin_like: bool,
    /// Human-readable indicator for each triggered check
    pub indicators: Vec<String>,
}

impl SuspiciousRequest {
    /// Whether any check triggered.
    pub fn any(&self) -> bool {
        !self.indicators.is_empty()
    }
}

/// Metadata for an HTTP or HTTPS request signal.
///
/// Header values are redacted before construction; bodies, query
/// strings, and response data are never captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpMetadata {
    pub url: String,
    pub method: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Header names mapped to `[REDACTED]` or `[PRESENT]`
    pub headers: BTreeMap<String, String>,
    pub suspicious: SuspiciousRequest,
}

/// Type-specific signal metadata.
///
/// The tagged union makes an invalid type/metadata pairing
/// unrepresentable for every kind except the HTTP pair, which share
/// a shape and are split by protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalMetadata {
    /// Environment variable name; the value is never captured
    Env { variable: String },
    /// Absolute normalized path plus the API name that touched it
    FsRead { path: PathBuf, operation: String },
    /// Absolute normalized path plus the API name that touched it
    FsWrite { path: PathBuf, operation: String },
    /// Connection target
    NetConnect {
        host: String,
        port: u16,
        protocol: Protocol,
    },
    /// Request descriptor shared by the HTTP and HTTPS signal types
    Http(HttpMetadata),
    /// Sanitized command template plus the API name that spawned it
    ShellExec { command: String, operation: String },
}

impl SignalMetadata {
    /// Whether this metadata shape is valid for the given signal type.
    pub fn compatible_with(&self, signal_type: SignalType) -> bool {
        matches!(
            (self, signal_type),
            (SignalMetadata::Env { .. }, SignalType::EnvAccess)
                | (SignalMetadata::FsRead { .. }, SignalType::FsRead)
                | (SignalMetadata::FsWrite { .. }, SignalType::FsWrite)
                | (SignalMetadata::NetConnect { .. }, SignalType::NetConnect)
                | (SignalMetadata::Http(_), SignalType::HttpRequest)
                | (SignalMetadata::Http(_), SignalType::HttpsRequest)
                | (SignalMetadata::ShellExec { .. }, SignalType::ShellExec)
        )
    }

    /// The signal type implied by this metadata, where unambiguous.
    fn implied_type(&self) -> Option<SignalType> {
        match self {
            SignalMetadata::Env { .. } => Some(SignalType::EnvAccess),
            SignalMetadata::FsRead { .. } => Some(SignalType::FsRead),
            SignalMetadata::FsWrite { .. } => Some(SignalType::FsWrite),
            SignalMetadata::NetConnect { .. } => Some(SignalType::NetConnect),
            SignalMetadata::ShellExec { .. } => Some(SignalType::ShellExec),
            SignalMetadata::Http(_) => None,
        }
    }
}

/// An immutable observation of third-party runtime behavior.
///
/// Constructed only through the typed constructors; once built, a
/// signal is read-only. Signals without a package attribution are
/// never constructed; first-party events are suppressed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    signal_type: SignalType,
    package: PackageIdentity,
    metadata: SignalMetadata,
    stack: CallStack,
}

impl Signal {
    /// Construct a signal whose type is implied by its metadata.
    ///
    /// Panics in debug builds if `metadata` is the shared HTTP shape;
    /// use [`Signal::http`] for those.
    pub fn new(package: PackageIdentity, metadata: SignalMetadata, stack: CallStack) -> Self {
        let signal_type = metadata
            .implied_type()
            .unwrap_or(SignalType::HttpRequest);
        debug_assert!(
            metadata.implied_type().is_some(),
            "HTTP metadata requires an explicit protocol; use Signal::http"
        );
        Self::with_type(signal_type, package, metadata, stack)
    }

    /// Construct an HTTP or HTTPS signal from request metadata.
    pub fn http(
        secure: bool,
        package: PackageIdentity,
        metadata: HttpMetadata,
        stack: CallStack,
    ) -> Self {
        let signal_type = if secure {
            SignalType::HttpsRequest
        } else {
            SignalType::HttpRequest
        };
        Self::with_type(signal_type, package, SignalMetadata::Http(metadata), stack)
    }

    fn with_type(
        signal_type: SignalType,
        package: PackageIdentity,
        metadata: SignalMetadata,
        stack: CallStack,
    ) -> Self {
        debug_assert!(
            metadata.compatible_with(signal_type),
            "signal metadata {:?} is invalid for type {}",
            metadata,
            signal_type
        );
        if let SignalMetadata::NetConnect { port, .. } = &metadata {
            debug_assert!(*port as u32 <= u16::MAX as u32);
        }
        Self {
            timestamp: Utc::now(),
            signal_type,
            package,
            metadata,
            stack,
        }
    }

    /// When the behavior was intercepted (UTC).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The kind of behavior recorded.
    pub fn signal_type(&self) -> SignalType {
        self.signal_type
    }

    /// The package responsible for the behavior.
    pub fn package(&self) -> &PackageIdentity {
        &self.package
    }

    /// Type-specific metadata.
    pub fn metadata(&self) -> &SignalMetadata {
        &self.metadata
    }

    /// Call stack captured at the point of interception.
    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    /// Project the signal into its report view.
    ///
    /// Drops the stack unless `include_stack` is set, keeps only the
    /// allowed metadata keys, and truncates long string fields.
    pub fn to_view(&self, include_stack: bool) -> SignalView {
        let mut metadata = BTreeMap::new();
        match &self.metadata {
            SignalMetadata::Env { variable } => {
                metadata.insert("variable".into(), truncated_value(variable));
            }
            SignalMetadata::FsRead { path, operation }
            | SignalMetadata::FsWrite { path, operation } => {
                metadata.insert(
                    "path".into(),
                    truncated_value(&path.to_string_lossy()),
                );
                metadata.insert("operation".into(), truncated_value(operation));
            }
            SignalMetadata::NetConnect {
                host,
                port,
                protocol,
            } => {
                metadata.insert("host".into(), truncated_value(host));
                metadata.insert("port".into(), Value::from(*port));
                metadata.insert("protocol".into(), Value::from(protocol.to_string()));
            }
            SignalMetadata::Http(http) => {
                metadata.insert("host".into(), truncated_value(&http.host));
                metadata.insert("port".into(), Value::from(http.port));
                metadata.insert("path".into(), truncated_value(&http.path));
            }
            SignalMetadata::ShellExec { command, operation } => {
                metadata.insert("command".into(), truncated_value(command));
                metadata.insert("operation".into(), truncated_value(operation));
            }
        }

        SignalView {
            timestamp: self.timestamp,
            signal_type: self.signal_type,
            package: self.package.name.clone(),
            version: self.package.version.clone(),
            metadata,
            stack: include_stack.then(|| self.stack.source_files()),
        }
    }
}

/// Report projection of a signal.
///
/// Metadata is restricted to the keys `variable`, `path`,
/// `operation`, `host`, `port`, `protocol`, and `command`; the full
/// stack is included only on request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalView {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub package: String,
    pub version: String,
    pub metadata: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

/// Truncate a metadata string over the projection limit.
pub fn truncate_metadata(s: &str) -> String {
    if s.chars().count() > METADATA_TRUNCATE_LEN {
        let head: String = s.chars().take(METADATA_TRUNCATE_LEN).collect();
        format!("{}{}", head, TRUNCATED_MARKER)
    } else {
        s.to_string()
    }
}

fn truncated_value(s: &str) -> Value {
    Value::from(truncate_metadata(s))
}
