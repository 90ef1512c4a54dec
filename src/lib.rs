//! Codelab
//!
//! A single-user playground for HTML/CSS/JavaScript snippets with a live,
//! sandboxed preview. Three buffers (markup, styles, script) are composed into
//! one document which a headless render surface parses and runs in an
//! isolated JavaScript context.
//!
//! # Components
//!
//! - [`store`]: persists the three buffers as one JSON snapshot under a fixed key
//! - [`state`]: the buffers and the active-buffer selection
//! - [`compose`]: builds the preview document
//! - [`render`]: the isolated render surface (scraper + boa_engine)
//! - [`shell`]: the editor shell tying everything together
//! - [`config`]: command-line arguments for the terminal frontend
//!
//! # Example
//!
//! ```no_run
//! use codelab::{EditorShell, MemoryStore, MemoryClipboard, PlaygroundConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut shell = EditorShell::new(
//!     PlaygroundConfig::default(),
//!     MemoryStore::new(),
//!     MemoryClipboard::new(),
//! );
//! shell.input("<h1>Hi</h1>");
//! println!("{}", shell.preview().map(|s| s.text.as_str()).unwrap_or(""));
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod clipboard;
pub mod config;
pub mod compose;
pub mod render;
pub mod shell;
pub mod state;
pub mod store;

pub use clipboard::{Clipboard, MemoryClipboard};
#[cfg(feature = "system-clipboard")]
pub use clipboard::SystemClipboard;
pub use compose::compose;
pub use render::{
    DispatchOutcome, DocumentId, PageEffect, RenderOptions, RenderOutcome, RenderSnapshot, RenderSurface,
    SandboxPolicy,
};
pub use shell::{EditorShell, PaneRect, ShellLayout, ShellStatus, ViewMode};
pub use state::{BufferId, ClearOutcome, CodeState, CodeStateContainer, Confirm, FixedConfirm};
pub use store::{FileStore, MemoryStore, Store, DEFAULT_STORAGE_KEY};

/// Configuration for a playground session
///
/// Defaults: the `minimalist-code-lab-final`
/// storage key, a sandbox allowing scripts, modals, forms and popups, and a
/// two second "copied" indicator.
///
/// # Examples
///
/// ```
/// let cfg = codelab::PlaygroundConfig::default();
/// assert_eq!(cfg.storage_key, "minimalist-code-lab-final");
/// assert!(cfg.sandbox.allow_scripts);
/// ```
#[derive(Debug, Clone)]
pub struct PlaygroundConfig {
    /// Key the snapshot is stored under
    pub storage_key: String,
    /// Storage file used by [`FileStore`]
    pub store_path: PathBuf,
    /// Capabilities granted to the preview document
    pub sandbox: SandboxPolicy,
    /// Per-job timeout for preview scripts in milliseconds
    pub script_timeout_ms: u64,
    /// Maximum loop iterations before the preview context throws (0 => disabled)
    pub script_loop_iteration_limit: u64,
    /// Maximum recursion depth before the preview context throws (usize::MAX => disabled)
    pub script_recursion_limit: usize,
    /// How long the "copied" indicator stays visible
    pub copied_indicator_ms: u64,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            store_path: FileStore::default_path(),
            sandbox: SandboxPolicy::default(),
            script_timeout_ms: 5000,
            script_loop_iteration_limit: 1_000_000,
            script_recursion_limit: 1024,
            copied_indicator_ms: 2000,
        }
    }
}

impl PlaygroundConfig {
    /// Options for the render surface
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            sandbox: self.sandbox,
            script_timeout_ms: self.script_timeout_ms,
            script_loop_iteration_limit: self.script_loop_iteration_limit,
            script_recursion_limit: self.script_recursion_limit,
        }
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(Error::ConfigError("storage key must not be empty".into()));
        }
        if self.script_timeout_ms == 0 {
            return Err(Error::ConfigError("script timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Console message emitted by the preview document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
    /// Level such as "log", "warn", or "error"
    pub level: String,
    /// Textual content of the message
    pub text: String,
    /// Whether the message came from the composed script's error boundary
    pub boundary: bool,
}

impl ConsoleMessage {
    pub fn new(level: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            text: text.into(),
            boundary: false,
        }
    }

    /// Error reported by the composed script's catch block
    pub fn boundary_error(text: impl Into<String>) -> Self {
        Self {
            level: "error".to_string(),
            text: text.into(),
            boundary: true,
        }
    }
}
