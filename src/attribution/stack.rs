//! Captured call stacks and the stack capture seam.
//!
//! Attribution works on a [`CallStack`]: an ordered list of frames,
//! innermost first, each carrying the source file of the executing
//! module. Where the stack comes from is the host's business: a
//! [`StackProvider`] supplies it at interception time. The default
//! [`ScriptStackProvider`] reads a thread-local frame stack that the
//! host's module runtime maintains with [`ScriptFrame`] guards as it
//! enters and leaves module code. Interception-layer code never
//! pushes frames, so the captured stack excludes the monitor itself.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// A single frame of a captured call stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Source file of the executing module
    pub file: PathBuf,
    /// Function or export name, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Line number, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl StackFrame {
    /// Create a frame for a source file.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            symbol: None,
            line: None,
        }
    }

    /// Attach a symbol name.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Attach a line number.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// An ordered call stack, innermost frame first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStack {
    frames: Vec<StackFrame>,
}

impl CallStack {
    /// Create a stack from frames ordered innermost first.
    pub fn new(frames: Vec<StackFrame>) -> Self {
        Self { frames }
    }

    /// The empty stack.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Frames in attribution order (innermost first).
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Whether the stack has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Source file of each frame, for report inclusion.
    pub fn source_files(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|f| f.file.to_string_lossy().into_owned())
            .collect()
    }
}

/// Source of captured call stacks.
///
/// Implementations must be cheap and infallible; a provider that
/// cannot capture returns an empty stack, which attribution treats
/// as first-party.
pub trait StackProvider: Send + Sync {
    /// Capture the current call stack, innermost frame first.
    fn capture(&self) -> CallStack;
}

thread_local! {
    static SCRIPT_FRAMES: RefCell<Vec<StackFrame>> = const { RefCell::new(Vec::new()) };
}

/// Default provider backed by a thread-local script-frame stack.
///
/// The host's module runtime pushes a [`ScriptFrame`] guard when it
/// begins executing a module's code and drops it on return; capture
/// reads the live stack for the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptStackProvider;

impl ScriptStackProvider {
    pub fn new() -> Self {
        Self
    }
}

impl StackProvider for ScriptStackProvider {
    fn capture(&self) -> CallStack {
        SCRIPT_FRAMES.with(|frames| {
            let frames = frames.borrow();
            // Innermost first: guards push in call order.
            CallStack::new(frames.iter().rev().cloned().collect())
        })
    }
}

/// Provider that always captures an empty stack.
///
/// Useful for hosts without a module runtime; every observation is
/// then unattributable and suppressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStackProvider;

impl StackProvider for NullStackProvider {
    fn capture(&self) -> CallStack {
        CallStack::empty()
    }
}

/// RAII guard marking the current thread as executing a module file.
///
/// Pushed by the host's module runtime on entry to module code and
/// popped on drop. Guards nest; the innermost guard is the top of
/// the captured stack.
#[derive(Debug)]
pub struct ScriptFrame {
    _priv: (),
}

impl ScriptFrame {
    /// Enter a module source file.
    pub fn enter(file: impl AsRef<Path>) -> Self {
        Self::enter_frame(StackFrame::new(file.as_ref()))
    }

    /// Enter with a full frame (symbol and line included).
    pub fn enter_frame(frame: StackFrame) -> Self {
        SCRIPT_FRAMES.with(|frames| frames.borrow_mut().push(frame));
        Self { _priv: () }
    }
}

impl Drop for ScriptFrame {
    fn drop(&mut self) {
        SCRIPT_FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_capture_empty_by_default() {
        let provider = ScriptStackProvider::new();
        assert!(provider.capture().is_empty());
    }

    #[test]
    fn test_guard_push_pop() {
        let provider = ScriptStackProvider::new();
        {
            let _outer = ScriptFrame::enter("/app/index.js");
            {
                let _inner = ScriptFrame::enter("/app/node_modules/bar/index.js");
                let stack = provider.capture();
                let files = stack.source_files();
                assert_eq!(
                    files,
                    vec![
                        "/app/node_modules/bar/index.js".to_string(),
                        "/app/index.js".to_string(),
                    ]
                );
            }
            assert_eq!(provider.capture().frames().len(), 1);
        }
        assert!(provider.capture().is_empty());
    }

    #[test]
    fn test_frame_builder() {
        let frame = StackFrame::new("/x.js").with_symbol("doWork").with_line(42);
        assert_eq!(frame.symbol.as_deref(), Some("doWork"));
        assert_eq!(frame.line, Some(42));
    }

    #[test]
    fn test_null_provider() {
        assert!(NullStackProvider.capture().is_empty());
    }
}
