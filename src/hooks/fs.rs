//! Filesystem facade and path normalizer.
//!
//! [`FsApi`] wraps the fixed set of read and write APIs. The first
//! argument of every operation passes through [`PathValue`]: text,
//! UTF-8 byte buffers, and `file://` URLs resolve to an absolute
//! lexically-normalized path for the signal; numeric descriptors and
//! undecodable input are unresolvable and emit nothing. Delegation
//! always uses the caller's original path, never the normalized one.

use crate::hooks::HookKind;
use crate::monitor::Monitor;
use crate::paths;
use crate::signal::{SignalMetadata, SignalType};
use std::fs::{self, File, OpenOptions, ReadDir};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A path argument as the host supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValue {
    /// Plain text path
    Text(String),
    /// Byte buffer, decoded as UTF-8
    Bytes(Vec<u8>),
    /// `file://` URL string
    Url(String),
    /// Numeric file descriptor; never resolvable to a path
    Descriptor(u64),
}

impl PathValue {
    /// Construct a URL-flavored path value.
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// Absolute normalized path for signal metadata, or `None` when
    /// the input is unresolvable.
    pub fn resolve(&self) -> Option<PathBuf> {
        self.raw_path().map(|raw| paths::normalize(&raw))
    }

    /// The path to delegate with, unmodified.
    pub(crate) fn raw_path(&self) -> Option<PathBuf> {
        match self {
            Self::Text(text) => Some(PathBuf::from(text)),
            Self::Bytes(bytes) => std::str::from_utf8(bytes).ok().map(PathBuf::from),
            Self::Url(url) => {
                let rest = url.strip_prefix("file://")?;
                Some(PathBuf::from(rest))
            }
            Self::Descriptor(_) => None,
        }
    }
}

impl From<&str> for PathValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PathValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&Path> for PathValue {
    fn from(value: &Path) -> Self {
        Self::Text(value.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for PathValue {
    fn from(value: PathBuf) -> Self {
        Self::Text(value.to_string_lossy().into_owned())
    }
}

impl From<&[u8]> for PathValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for PathValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<u64> for PathValue {
    fn from(value: u64) -> Self {
        Self::Descriptor(value)
    }
}

fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "operation requires a path argument",
    )
}

/// Facade over the `std::fs` read and write APIs.
pub struct FsApi {
    monitor: Monitor,
}

impl FsApi {
    pub(crate) fn new(monitor: Monitor) -> Self {
        Self { monitor }
    }

    fn observe(&self, value: &PathValue, signal_type: SignalType, operation: &str) {
        // Unresolvable arguments (descriptors, non-UTF-8) are dropped.
        let Some(path) = value.resolve() else {
            return;
        };
        let metadata = match signal_type {
            SignalType::FsRead => SignalMetadata::FsRead {
                path,
                operation: operation.to_string(),
            },
            _ => SignalMetadata::FsWrite {
                path,
                operation: operation.to_string(),
            },
        };
        self.monitor.record(HookKind::Fs, signal_type, metadata);
    }

    fn read_arg(&self, value: &PathValue, operation: &str) -> io::Result<PathBuf> {
        self.observe(value, SignalType::FsRead, operation);
        value.raw_path().ok_or_else(unsupported)
    }

    fn write_arg(&self, value: &PathValue, operation: &str) -> io::Result<PathBuf> {
        self.observe(value, SignalType::FsWrite, operation);
        value.raw_path().ok_or_else(unsupported)
    }

    // ==================== Read APIs ====================

    /// Read a file's bytes, as `std::fs::read`.
    pub fn read_file(&self, path: impl Into<PathValue>) -> io::Result<Vec<u8>> {
        let path = self.read_arg(&path.into(), "read_file")?;
        fs::read(path)
    }

    /// Read a file to a string, as `std::fs::read_to_string`.
    pub fn read_to_string(&self, path: impl Into<PathValue>) -> io::Result<String> {
        let path = self.read_arg(&path.into(), "read_to_string")?;
        fs::read_to_string(path)
    }

    /// Read a directory, as `std::fs::read_dir`.
    pub fn read_dir(&self, path: impl Into<PathValue>) -> io::Result<ReadDir> {
        let path = self.read_arg(&path.into(), "read_dir")?;
        fs::read_dir(path)
    }

    /// Read a symlink target, as `std::fs::read_link`.
    pub fn read_link(&self, path: impl Into<PathValue>) -> io::Result<PathBuf> {
        let path = self.read_arg(&path.into(), "read_link")?;
        fs::read_link(path)
    }

    /// Open a file for reading (read-stream construction).
    pub fn open(&self, path: impl Into<PathValue>) -> io::Result<File> {
        let path = self.read_arg(&path.into(), "open")?;
        File::open(path)
    }

    // ==================== Write APIs ====================

    /// Write a file, as `std::fs::write`.
    pub fn write_file(
        &self,
        path: impl Into<PathValue>,
        contents: impl AsRef<[u8]>,
    ) -> io::Result<()> {
        let path = self.write_arg(&path.into(), "write_file")?;
        fs::write(path, contents)
    }

    /// Append to a file, creating it when missing.
    pub fn append_file(
        &self,
        path: impl Into<PathValue>,
        contents: impl AsRef<[u8]>,
    ) -> io::Result<()> {
        let path = self.write_arg(&path.into(), "append_file")?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(contents.as_ref())
    }

    /// Create a directory, as `std::fs::create_dir`.
    pub fn create_dir(&self, path: impl Into<PathValue>) -> io::Result<()> {
        let path = self.write_arg(&path.into(), "create_dir")?;
        fs::create_dir(path)
    }

    /// Remove an empty directory, as `std::fs::remove_dir`.
    pub fn remove_dir(&self, path: impl Into<PathValue>) -> io::Result<()> {
        let path = self.write_arg(&path.into(), "remove_dir")?;
        fs::remove_dir(path)
    }

    /// Remove a file, as `std::fs::remove_file`.
    pub fn remove_file(&self, path: impl Into<PathValue>) -> io::Result<()> {
        let path = self.write_arg(&path.into(), "remove_file")?;
        fs::remove_file(path)
    }

    /// Rename a path, as `std::fs::rename`.
    ///
    /// The signal records the source path.
    pub fn rename(
        &self,
        from: impl Into<PathValue>,
        to: impl Into<PathValue>,
    ) -> io::Result<()> {
        let from = self.write_arg(&from.into(), "rename")?;
        let to = to.into().raw_path().ok_or_else(unsupported)?;
        fs::rename(from, to)
    }

    /// Open a file for writing, truncating (write-stream construction).
    pub fn create(&self, path: impl Into<PathValue>) -> io::Result<File> {
        let path = self.write_arg(&path.into(), "create")?;
        File::create(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn api() -> FsApi {
        FsApi::new(Monitor::new())
    }

    #[test]
    fn test_path_value_text() {
        let value = PathValue::from("/tmp/./a/../x");
        assert_eq!(value.resolve(), Some(PathBuf::from("/tmp/x")));
        assert_eq!(value.raw_path(), Some(PathBuf::from("/tmp/./a/../x")));
    }

    #[test]
    fn test_path_value_bytes() {
        let value = PathValue::from(b"/tmp/data".to_vec());
        assert_eq!(value.resolve(), Some(PathBuf::from("/tmp/data")));

        let invalid = PathValue::Bytes(vec![0xff, 0xfe]);
        assert_eq!(invalid.resolve(), None);
    }

    #[test]
    fn test_path_value_url() {
        let value = PathValue::url("file:///tmp/url-path");
        assert_eq!(value.resolve(), Some(PathBuf::from("/tmp/url-path")));

        let not_file = PathValue::Url("https://example.com/x".into());
        assert_eq!(not_file.resolve(), None);
    }

    #[test]
    fn test_path_value_descriptor_unresolvable() {
        let value = PathValue::from(3u64);
        assert_eq!(value.resolve(), None);
        assert_eq!(value.raw_path(), None);
    }

    #[test]
    fn test_read_write_round_trip_delegates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.txt");
        let api = api();

        api.write_file(path.clone(), b"hello").unwrap();
        assert_eq!(api.read_to_string(path.clone()).unwrap(), "hello");
        api.append_file(path.clone(), b" world").unwrap();
        assert_eq!(api.read_file(path.clone()).unwrap(), b"hello world");
    }

    #[test]
    fn test_errors_match_std() {
        let missing = "/definitely/not/a/real/path";
        let facade_err = api().read_file(missing).unwrap_err();
        let std_err = fs::read(missing).unwrap_err();
        assert_eq!(facade_err.kind(), std_err.kind());
    }

    #[test]
    fn test_descriptor_argument_is_unsupported() {
        let err = api().read_file(3u64).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_dir_operations() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("sub");
        let api = api();

        api.create_dir(dir.clone()).unwrap();
        assert!(dir.is_dir());
        assert_eq!(api.read_dir(tmp.path()).unwrap().count(), 1);
        api.remove_dir(dir.clone()).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_rename_and_remove() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a");
        let to = tmp.path().join("b");
        let api = api();

        api.write_file(from.clone(), b"x").unwrap();
        api.rename(from.clone(), to.clone()).unwrap();
        assert!(!from.exists() && to.exists());
        api.remove_file(to.clone()).unwrap();
        assert!(!to.exists());
    }

    #[test]
    fn test_stream_construction() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stream.txt");
        let api = api();

        let mut file = api.create(path.clone()).unwrap();
        file.write_all(b"streamed").unwrap();
        drop(file);

        let opened = api.open(path).unwrap();
        assert_eq!(opened.metadata().unwrap().len(), 8);
    }
}
