//! HTTP(S) request facade.
//!
//! [`HttpApi::request`] accepts the URL-string, URL-object, options,
//! and `(url, options)` calling conventions, normalizes them to a
//! request descriptor, records an `HttpRequest` or `HttpsRequest`
//! signal (headers redacted, suspiciousness assessed), and delegates
//! to a `reqwest` blocking client. The returned builder is the
//! caller's to send; bodies, query strings, and responses are never
//! captured.

use crate::hooks::HookKind;
use crate::monitor::Monitor;
use crate::signal::{HttpMetadata, SignalMetadata, SignalType, SuspiciousRequest};
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, Url};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Options-style request descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// `"http"` or `"https"`; defaults to `"https"`
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    /// Defaults to `GET`
    pub method: Option<String>,
    /// Real header values; they reach the wire but never a signal
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A request in one of the accepted calling conventions.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestTarget {
    /// Bare URL string
    Url(String),
    /// Parsed URL
    ParsedUrl(Url),
    /// Options object
    Options(RequestOptions),
    /// URL with option overrides
    UrlWithOptions(String, RequestOptions),
}

impl RequestTarget {
    /// Best-effort URL for delegation when normalization fails.
    fn raw_url(&self) -> String {
        match self {
            Self::Url(url) | Self::UrlWithOptions(url, _) => url.clone(),
            Self::ParsedUrl(url) => url.to_string(),
            Self::Options(options) => {
                let protocol = options.protocol.as_deref().unwrap_or("https");
                let host = options.host.as_deref().unwrap_or("localhost");
                let path = options.path.as_deref().unwrap_or("/");
                match options.port {
                    Some(port) => format!("{protocol}://{host}:{port}{path}"),
                    None => format!("{protocol}://{host}{path}"),
                }
            }
        }
    }
}

impl From<&str> for RequestTarget {
    fn from(value: &str) -> Self {
        Self::Url(value.to_string())
    }
}

impl From<String> for RequestTarget {
    fn from(value: String) -> Self {
        Self::Url(value)
    }
}

impl From<Url> for RequestTarget {
    fn from(value: Url) -> Self {
        Self::ParsedUrl(value)
    }
}

impl From<RequestOptions> for RequestTarget {
    fn from(value: RequestOptions) -> Self {
        Self::Options(value)
    }
}

impl From<(&str, RequestOptions)> for RequestTarget {
    fn from((url, options): (&str, RequestOptions)) -> Self {
        Self::UrlWithOptions(url.to_string(), options)
    }
}

impl From<(String, RequestOptions)> for RequestTarget {
    fn from((url, options): (String, RequestOptions)) -> Self {
        Self::UrlWithOptions(url, options)
    }
}

/// Fully normalized request descriptor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalizedRequest {
    /// URL recorded on the signal: scheme, host, port, and path only.
    /// Query strings are never captured.
    pub url: String,
    /// Exact URL for delegation, query included
    pub target_url: String,
    pub method: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub secure: bool,
    /// Original header values, for delegation only
    pub headers: BTreeMap<String, String>,
}

pub(crate) fn normalize(target: &RequestTarget) -> Option<NormalizedRequest> {
    match target {
        RequestTarget::Url(raw) => normalize_url(&Url::parse(raw).ok()?, None),
        RequestTarget::ParsedUrl(url) => normalize_url(url, None),
        RequestTarget::UrlWithOptions(raw, options) => {
            normalize_url(&Url::parse(raw).ok()?, Some(options))
        }
        RequestTarget::Options(options) => {
            let protocol = options.protocol.as_deref().unwrap_or("https");
            let secure = match protocol {
                "http" => false,
                "https" => true,
                _ => return None,
            };
            let host = options.host.clone().unwrap_or_else(|| "localhost".to_string());
            let port = options.port.unwrap_or(if secure { 443 } else { 80 });
            let path = options.path.clone().unwrap_or_else(|| "/".to_string());
            let url = format!("{protocol}://{host}:{port}{path}");
            Some(NormalizedRequest {
                target_url: url.clone(),
                url,
                method: options.method.clone().unwrap_or_else(|| "GET".to_string()),
                host,
                port,
                path,
                secure,
                headers: options.headers.clone(),
            })
        }
    }
}

fn normalize_url(url: &Url, options: Option<&RequestOptions>) -> Option<NormalizedRequest> {
    let secure = match url.scheme() {
        "http" => false,
        "https" => true,
        _ => return None,
    };
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(if secure { 443 } else { 80 });
    let path = url.path().to_string();
    let mut normalized = NormalizedRequest {
        url: format!("{}://{}:{}{}", url.scheme(), host, port, path),
        target_url: url.to_string(),
        method: "GET".to_string(),
        path,
        host,
        port,
        secure,
        headers: BTreeMap::new(),
    };
    if let Some(options) = options {
        if let Some(method) = &options.method {
            normalized.method = method.clone();
        }
        normalized.headers = options.headers.clone();
    }
    Some(normalized)
}

static IP_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("invalid regex"));

const SUSPICIOUS_TLDS: [&str; 6] = [".tk", ".ml", ".ga", ".cf", ".gq", ".xyz"];
const STANDARD_PORTS: [u16; 3] = [80, 443, 8080];
const PASTE_HOSTS: [&str; 4] = ["pastebin.com", "paste.ee", "hastebin.com", "dpaste.com"];

/// Assess a request target for suspicious traits.
///
/// Each check is independent and contributes its own indicator.
pub fn assess_request(host: &str, port: u16) -> SuspiciousRequest {
    let mut suspicious = SuspiciousRequest::default();
    let host_lower = host.to_lowercase();

    if IP_HOST.is_match(&host_lower) {
        suspicious.is_ip_address = true;
        suspicious.indicators.push("Direct IP request".to_string());
    }
    if let Some(tld) = SUSPICIOUS_TLDS.iter().find(|t| host_lower.ends_with(*t)) {
        suspicious.suspicious_tld = true;
        suspicious.indicators.push(format!("Suspicious TLD: {tld}"));
    }
    if !STANDARD_PORTS.contains(&port) {
        suspicious.non_standard_port = true;
        suspicious
            .indicators
            .push(format!("Non-standard port: {port}"));
    }
    if PASTE_HOSTS.iter().any(|p| host_lower.contains(p)) {
        suspicious.pastebin_like = true;
        suspicious
            .indicators
            .push("Paste service request".to_string());
    }

    suspicious
}

/// Redact header values for signal metadata.
///
/// Keys whose lowercase form contains `auth`, `token`, or `key`
/// become `[REDACTED]`; every other value becomes `[PRESENT]`.
pub fn redact_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let lower = name.to_lowercase();
            let marker = if lower.contains("auth") || lower.contains("token") || lower.contains("key")
            {
                "[REDACTED]"
            } else {
                "[PRESENT]"
            };
            (name.clone(), marker.to_string())
        })
        .collect()
}

/// Facade over the HTTP(S) request entry point.
pub struct HttpApi {
    monitor: Monitor,
    client: Client,
}

impl HttpApi {
    pub(crate) fn new(monitor: Monitor, client: Client) -> Self {
        Self { monitor, client }
    }

    fn emit(&self, normalized: &NormalizedRequest) {
        let metadata = HttpMetadata {
            url: normalized.url.clone(),
            method: normalized.method.clone(),
            host: normalized.host.clone(),
            port: normalized.port,
            path: normalized.path.clone(),
            headers: redact_headers(&normalized.headers),
            suspicious: assess_request(&normalized.host, normalized.port),
        };
        let signal_type = if normalized.secure {
            SignalType::HttpsRequest
        } else {
            SignalType::HttpRequest
        };
        self.monitor
            .record(HookKind::Http, signal_type, SignalMetadata::Http(metadata));
    }

    /// Prepare a request, recording a signal at call time.
    ///
    /// The builder is returned unsent; delegation is untouched even
    /// when the target cannot be normalized (the client surfaces its
    /// own error on send).
    pub fn request(&self, target: impl Into<RequestTarget>) -> RequestBuilder {
        let target = target.into();
        match normalize(&target) {
            Some(normalized) => {
                self.emit(&normalized);
                let method = Method::from_bytes(normalized.method.as_bytes())
                    .unwrap_or(Method::GET);
                let mut builder = self.client.request(method, normalized.target_url.clone());
                for (name, value) in &normalized.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder
            }
            None => self.client.request(Method::GET, target.raw_url()),
        }
    }

    /// Prepare a GET request; same conventions as [`HttpApi::request`].
    pub fn get(&self, target: impl Into<RequestTarget>) -> RequestBuilder {
        self.request(target.into())
    }
}
