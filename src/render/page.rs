//! Host pages for shareable snippet links.
//!
//! The host page never inlines snippet markup. In run mode the snippet is
//! loaded from its raw URL inside a sandboxed iframe; in code mode the source
//! is escaped and shown as literal text.

use super::sandbox::SandboxPolicy;
use crate::models::snippet::Snippet;
use serde::Deserialize;

/// CSP for the host page itself. Only inline styles and same-origin frames.
pub const HOST_PAGE_CSP: &str = "default-src 'none'; style-src 'unsafe-inline'; \
     frame-src 'self'; base-uri 'none'; form-action 'none'";

/// How a snippet page presents the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Run,
    Code,
}

impl ViewMode {
    /// Pick the effective mode. Non-executable snippets are always shown as
    /// code; executable ones default to run.
    pub fn resolve(requested: Option<ViewMode>, executable: bool) -> ViewMode {
        match (requested, executable) {
            (_, false) => ViewMode::Code,
            (Some(mode), true) => mode,
            (None, true) => ViewMode::Run,
        }
    }
}

const STYLE: &str = "body{margin:0;font-family:system-ui,sans-serif;background:#0a0a0a;color:#eee}\
header{display:flex;justify-content:space-between;align-items:center;padding:16px 32px;\
border-bottom:1px solid #222}\
h1{font-size:16px;margin:0}\
.meta{font-size:11px;color:#888;text-transform:uppercase;letter-spacing:.1em}\
nav a{color:#aaa;margin-left:12px;text-decoration:none;font-weight:bold;font-size:12px}\
nav a.active{color:#fff}\
main{padding:32px}\
iframe{width:100%;height:80vh;border:0;background:#fff;border-radius:16px}\
pre{margin:0;padding:32px;background:#0d0d0d;border-radius:16px;overflow:auto;\
font-family:'JetBrains Mono',monospace;font-size:15px;line-height:1.7}";

/// Render the host page for `snippet` served at `link` (e.g. `/p/abc123`).
pub fn render_snippet_page(
    snippet: &Snippet,
    link: &str,
    view: ViewMode,
    executable: bool,
    policy: &SandboxPolicy,
) -> String {
    let body = match view {
        ViewMode::Run => format!(
            r#"<iframe src="{raw}" title="Preview" sandbox="{sandbox}" referrerpolicy="no-referrer" credentialless loading="lazy"></iframe>"#,
            raw = html_escape(&format!("{link}/raw")),
            sandbox = html_escape(&policy.iframe_attribute()),
        ),
        ViewMode::Code => format!(
            r#"<pre><code class="language-{lang}">{code}</code></pre>"#,
            lang = html_escape(&snippet.language),
            code = html_escape(&snippet.code),
        ),
    };

    let nav = if executable {
        format!(
            r#"<nav><a href="{link}?view=run"{run}>RUN</a><a href="{link}?view=code"{code}>CODE</a></nav>"#,
            link = html_escape(link),
            run = active(view == ViewMode::Run),
            code = active(view == ViewMode::Code),
        )
    } else {
        String::new()
    };

    format!(
        concat!(
            "<!DOCTYPE html>",
            r#"<html lang="en"><head><meta charset="utf-8">"#,
            r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#,
            r#"<meta name="referrer" content="no-referrer">"#,
            "<title>{title}</title><style>{style}</style></head>",
            "<body><header><div><h1>{title}</h1>",
            r#"<div class="meta">{language} &middot; {date}</div></div>{nav}</header>"#,
            "<main>{body}</main></body></html>"
        ),
        title = html_escape(&snippet.title),
        style = STYLE,
        language = html_escape(&snippet.language),
        date = snippet.created_at.format("%Y-%m-%d"),
        nav = nav,
        body = body,
    )
}

/// Page shown for a link whose snippet does not exist.
pub fn render_not_found_page() -> String {
    format!(
        concat!(
            "<!DOCTYPE html>",
            r#"<html lang="en"><head><meta charset="utf-8"><title>Snippet not found</title>"#,
            "<style>{style}</style></head>",
            "<body><main><h1>404</h1><p>Snippet not found or has been removed.</p>",
            r#"<p><a href="/">Back to Assistant</a></p></main></body></html>"#
        ),
        style = STYLE,
    )
}

fn active(on: bool) -> &'static str {
    if on { r#" class="active""# } else { "" }
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
