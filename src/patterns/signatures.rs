//! Signature tables for the pattern detectors.
//!
//! Kept as data so new indicators land without touching detector
//! logic. All matching is substring- or exact-match based; entries
//! are lowercase unless the detector compares raw text.

/// Known miner process names, matched against lowercased commands.
pub const MINER_PROCESSES: &[&str] = &[
    "xmrig",
    "ethminer",
    "cpuminer",
    "cgminer",
    "bfgminer",
    "minerd",
    "nicehash",
    "phoenixminer",
    "lolminer",
    "t-rex",
];

/// Known mining pool domains, matched against lowercased request URLs.
pub const MINING_POOLS: &[&str] = &[
    "pool.minexmr.com",
    "xmrpool.eu",
    "supportxmr.com",
    "nanopool.org",
    "f2pool.com",
    "ethermine.org",
    "2miners.com",
    "hashvault.pro",
    "moneroocean.stream",
];

/// Markers of mining-related environment variables, matched against
/// uppercased variable names.
pub const MINING_ENV_MARKERS: &[&str] = &[
    "XMRIG",
    "STRATUM",
    "POOL_USER",
    "POOL_PASS",
    "WALLET_ADDRESS",
    "MINING",
];

/// Substrings of sensitive file paths whose reads feed the
/// exfiltration correlation.
pub const SENSITIVE_FILES: &[&str] = &[
    ".npmrc",
    ".env",
    ".aws/credentials",
    ".ssh/id_rsa",
    ".ssh/id_ed25519",
    ".ssh/id_ecdsa",
    ".netrc",
    ".gitconfig",
    ".git-credentials",
    ".docker/config.json",
    ".kube/config",
    ".pgpass",
];

/// Hosts of services commonly used as exfiltration sinks, matched
/// against lowercased request URLs.
pub const EXFIL_SERVICES: &[&str] = &[
    "pastebin.com",
    "paste.ee",
    "hastebin.com",
    "dpaste.com",
    "webhook.site",
    "requestbin.net",
    "pipedream.net",
    "interact.sh",
    "oastify.com",
    "burpcollaborator.net",
    "transfer.sh",
    "file.io",
    "anonfiles.com",
];

/// Reverse-shell command fragments, matched against raw commands.
pub const REVERSE_SHELL_PATTERNS: &[&str] = &[
    "nc -e",
    "nc -c",
    "/bin/bash -i",
    "/bin/sh -i",
    "bash -i >&",
    "sh -i >&",
    "/dev/tcp/",
    "mkfifo /tmp/",
    "0<&196",
];

/// Remote-access tunnel tools, matched against raw commands.
pub const RAT_TOOLS: &[&str] = &[
    "ngrok",
    "localtunnel",
    "serveo",
    "pagekite",
    "telebit",
    "cloudflared tunnel",
];

/// Ports associated with backdoor listeners.
pub const SUSPICIOUS_PORTS: &[u16] = &[1337, 4444, 5555, 6666, 6697, 12345, 31337, 54321];

/// Environment variables that hold secrets, matched exactly.
pub const SECRET_ENV_VARS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "NPM_TOKEN",
    "NPM_AUTH_TOKEN",
    "GITHUB_TOKEN",
    "GH_TOKEN",
    "GITLAB_TOKEN",
    "DOCKER_PASSWORD",
    "DATABASE_URL",
    "STRIPE_SECRET_KEY",
    "SLACK_TOKEN",
    "TWILIO_AUTH_TOKEN",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
];

/// Substrings of credential file paths.
pub const CREDENTIAL_FILES: &[&str] = &[
    ".aws/credentials",
    ".npmrc",
    ".netrc",
    ".git-credentials",
    ".ssh/",
    "id_rsa",
    ".docker/config.json",
    ".kube/config",
    ".pgpass",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_tables() {
        for entry in MINER_PROCESSES
            .iter()
            .chain(MINING_POOLS)
            .chain(EXFIL_SERVICES)
        {
            assert_eq!(*entry, entry.to_lowercase());
        }
    }

    #[test]
    fn test_uppercase_env_tables() {
        for entry in MINING_ENV_MARKERS.iter().chain(SECRET_ENV_VARS) {
            assert_eq!(*entry, entry.to_uppercase());
        }
    }
}
