//! Sandboxed rendering of published snippets.
//!
//! Stored code is treated as untrusted third-party content: executable
//! markup only ever runs under a [`sandbox::SandboxPolicy`], and source views
//! escape it as literal text.

pub mod page;
pub mod sandbox;
