//! Code state: the three editable buffers and the active-buffer selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Identifier of one of the three fixed buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferId {
    /// Markup (`html`)
    #[default]
    Html,
    /// Styles (`css`)
    Css,
    /// Script (`js`)
    Js,
}

impl BufferId {
    /// All buffers in tab order
    pub const ALL: [BufferId; 3] = [BufferId::Html, BufferId::Css, BufferId::Js];

    /// Field name used in the persisted snapshot
    pub fn as_str(self) -> &'static str {
        match self {
            BufferId::Html => "html",
            BufferId::Css => "css",
            BufferId::Js => "js",
        }
    }

    /// Upper-cased label shown on tabs and in prompts
    pub fn label(self) -> &'static str {
        match self {
            BufferId::Html => "HTML",
            BufferId::Css => "CSS",
            BufferId::Js => "JS",
        }
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BufferId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "markup" => Ok(BufferId::Html),
            "css" | "styles" | "style" => Ok(BufferId::Css),
            "js" | "script" | "javascript" => Ok(BufferId::Js),
            other => Err(Error::Other(format!("unknown buffer '{}'", other))),
        }
    }
}

const SEED_HTML: &str = "<div class=\"container\">\n  <h1>Halo Dunia!</h1>\n  <p>Selamat datang di editor kode hitam putih.</p>\n  <button id=\"magicBtn\">Klik Saya</button>\n</div>";

const SEED_CSS: &str = "body {\n  background: #000;\n  color: #fff;\n  display: flex;\n  justify-content: center;\n  align-items: center;\n  height: 100vh;\n  margin: 0;\n  font-family: sans-serif;\n}\n\n.container {\n  text-align: center;\n  padding: 2rem;\n  border: 1px solid #fff;\n  background: #000;\n}\n\nbutton {\n  background: #fff;\n  border: none;\n  padding: 0.5rem 1rem;\n  color: #000;\n  cursor: pointer;\n  font-weight: bold;\n  margin-top: 1rem;\n}";

const SEED_JS: &str = "const btn = document.getElementById(\"magicBtn\");\n\nif (btn) {\n  btn.addEventListener(\"click\", () => {\n    alert(\"Berhasil!\");\n  });\n}";

/// Contents of the three buffers.
///
/// This is also the persisted snapshot shape: a JSON object with exactly the
/// string fields `html`, `css` and `js`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeState {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl CodeState {
    /// A state with all three buffers empty
    pub fn empty() -> Self {
        Self {
            html: String::new(),
            css: String::new(),
            js: String::new(),
        }
    }

    pub fn get(&self, id: BufferId) -> &str {
        match id {
            BufferId::Html => &self.html,
            BufferId::Css => &self.css,
            BufferId::Js => &self.js,
        }
    }

    fn slot_mut(&mut self, id: BufferId) -> &mut String {
        match id {
            BufferId::Html => &mut self.html,
            BufferId::Css => &mut self.css,
            BufferId::Js => &mut self.js,
        }
    }
}

/// First-run seed snippets
impl Default for CodeState {
    fn default() -> Self {
        Self {
            html: SEED_HTML.to_string(),
            css: SEED_CSS.to_string(),
            js: SEED_JS.to_string(),
        }
    }
}

/// A blocking yes/no prompt.
pub trait Confirm {
    /// Ask `message`; `true` means the user agreed.
    fn confirm(&mut self, message: &str) -> bool;
}

/// Confirm that always answers the same way, recording what it was asked.
#[derive(Debug, Clone, Default)]
pub struct FixedConfirm {
    pub answer: bool,
    pub asked: Vec<String>,
}

impl FixedConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Vec::new(),
        }
    }
}

impl Confirm for FixedConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        self.asked.push(message.to_string());
        self.answer
    }
}

/// Result of a clear request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Cancelled,
}

/// Prompt shown before clearing `id`
pub fn clear_prompt(id: BufferId) -> String {
    format!(
        "Apakah Anda yakin ingin menghapus semua kode di tab {}?",
        id.label()
    )
}

/// Holds the code state and which buffer the text input is bound to.
#[derive(Debug, Clone, Default)]
pub struct CodeStateContainer {
    state: CodeState,
    active: BufferId,
}

impl CodeStateContainer {
    pub fn new(state: CodeState) -> Self {
        Self {
            state,
            active: BufferId::default(),
        }
    }

    pub fn state(&self) -> &CodeState {
        &self.state
    }

    pub fn into_state(self) -> CodeState {
        self.state
    }

    pub fn active(&self) -> BufferId {
        self.active
    }

    pub fn get(&self, id: BufferId) -> &str {
        self.state.get(id)
    }

    /// Text of the active buffer
    pub fn active_text(&self) -> &str {
        self.state.get(self.active)
    }

    pub fn set_active_buffer(&mut self, id: BufferId) {
        self.active = id;
    }

    /// Replace the active buffer's content. Returns whether it changed.
    pub fn update_active_buffer(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        let slot = self.state.slot_mut(self.active);
        if *slot == text {
            return false;
        }
        *slot = text;
        true
    }

    /// Empty the active buffer after the user confirms.
    pub fn clear_active_buffer(&mut self, confirm: &mut dyn Confirm) -> ClearOutcome {
        if !confirm.confirm(&clear_prompt(self.active)) {
            return ClearOutcome::Cancelled;
        }
        self.state.slot_mut(self.active).clear();
        ClearOutcome::Cleared
    }
}
