//! Attribution of captured stacks to third-party packages.
//!
//! Two pieces cooperate here:
//!
//! - **Stack capture**: a [`StackProvider`] supplies the call stack at
//!   the point of interception. The default [`ScriptStackProvider`]
//!   reads thread-local [`ScriptFrame`] guards maintained by the
//!   host's module runtime.
//! - **Resolution**: the [`AttributionEngine`] walks the frames,
//!   derives the package from the rightmost `node_modules` path
//!   segment, and resolves the version from the cached on-disk
//!   manifest.
//!
//! The engine never raises; unresolvable stacks are first-party and
//! produce no signal.

mod resolver;
mod stack;

pub use resolver::{locate_package, Attribution, AttributionEngine, PackageManifest};
pub use stack::{
    CallStack, NullStackProvider, ScriptFrame, ScriptStackProvider, StackFrame, StackProvider,
};
