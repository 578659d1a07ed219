//! Capability allow-list for running untrusted snippet markup.
//!
//! Everything is denied unless the policy names it. The same policy renders
//! to an iframe `sandbox` attribute and to a CSP `sandbox` directive, so the
//! embedded view and a direct visit to the raw document get identical
//! restrictions.

use std::{collections::BTreeSet, fmt};
use thiserror::Error;

/// A single capability an isolated document may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Scripts,
    Modals,
    Forms,
    Downloads,
    PointerLock,
    SameOrigin,
    TopNavigation,
    Popups,
    PopupsEscapeSandbox,
}

impl Capability {
    /// The `sandbox` keyword for this capability.
    pub fn token(self) -> &'static str {
        match self {
            Capability::Scripts => "allow-scripts",
            Capability::Modals => "allow-modals",
            Capability::Forms => "allow-forms",
            Capability::Downloads => "allow-downloads",
            Capability::PointerLock => "allow-pointer-lock",
            Capability::SameOrigin => "allow-same-origin",
            Capability::TopNavigation => "allow-top-navigation",
            Capability::Popups => "allow-popups",
            Capability::PopupsEscapeSandbox => "allow-popups-to-escape-sandbox",
        }
    }

    /// Capabilities that hand the document the host's origin (cookies,
    /// storage, DOM) or a way out of the frame.
    pub fn breaks_isolation(self) -> bool {
        matches!(
            self,
            Capability::SameOrigin
                | Capability::TopNavigation
                | Capability::Popups
                | Capability::PopupsEscapeSandbox
        )
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("capability `{0}` would let a snippet escape its sandbox")]
    BreaksIsolation(Capability),
}

/// Default-deny set of granted capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    allowed: BTreeSet<Capability>,
}

impl SandboxPolicy {
    /// Nothing allowed: no scripts, no dialogs, opaque origin.
    pub fn deny_all() -> Self {
        Self {
            allowed: BTreeSet::new(),
        }
    }

    /// Policy used for published snippets: scripts and simple dialogs only.
    pub fn strict() -> Self {
        let mut allowed = BTreeSet::new();
        allowed.insert(Capability::Scripts);
        allowed.insert(Capability::Modals);
        Self { allowed }
    }

    /// Grant one more capability. Isolation-breaking capabilities are refused.
    pub fn allow(mut self, capability: Capability) -> Result<Self, SandboxError> {
        if capability.breaks_isolation() {
            return Err(SandboxError::BreaksIsolation(capability));
        }
        self.allowed.insert(capability);
        Ok(self)
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.allowed.contains(&capability)
    }

    /// Value for an iframe `sandbox="..."` attribute. Empty means deny all.
    pub fn iframe_attribute(&self) -> String {
        self.allowed
            .iter()
            .map(|c| c.token())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value for a `Content-Security-Policy` header sandboxing a document.
    pub fn csp_directive(&self) -> String {
        let tokens = self.iframe_attribute();
        if tokens.is_empty() {
            "sandbox".to_string()
        } else {
            format!("sandbox {tokens}")
        }
    }
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

/// Languages whose snippets are documents a browser would execute.
const EXECUTABLE_LANGUAGES: [&str; 4] = ["html", "htm", "xhtml", "svg"];

/// Whether a snippet should be run in the sandbox rather than only shown as
/// source. Decided by the language tag, or by sniffing for an HTML document.
pub fn is_executable(language: &str, code: &str) -> bool {
    let language = language.trim();
    if EXECUTABLE_LANGUAGES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(language))
    {
        return true;
    }

    let head = code.trim_start().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.contains("<html")
}
