//! Editor shell: tab selection, the text input bound to the active buffer,
//! the copy/clear/toggle actions and the split layout around the preview.

use std::time::{Duration, Instant};

use crate::render::{DispatchOutcome, RenderSnapshot, RenderSurface};
use crate::{
    compose, BufferId, ClearOutcome, Clipboard, CodeStateContainer, Confirm, PlaygroundConfig,
    Result, Store,
};

/// Which panes are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Split,
    PreviewOnly,
}

/// A horizontal band of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneRect {
    pub top: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellLayout {
    /// `None` in preview-only mode
    pub editor: Option<PaneRect>,
    pub preview: PaneRect,
}

/// Failures the shell absorbed without interrupting the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellStatus {
    pub persist_error: Option<String>,
    pub render_error: Option<String>,
    pub clipboard_error: Option<String>,
}

pub struct EditorShell<S: Store, C: Clipboard> {
    config: PlaygroundConfig,
    container: CodeStateContainer,
    store: S,
    clipboard: C,
    surface: RenderSurface,
    view: ViewMode,
    copied_until: Option<Instant>,
    composed: String,
    status: ShellStatus,
}

impl<S: Store, C: Clipboard> EditorShell<S, C> {
    /// Start a session from whatever `store` holds, falling back to the seeds.
    ///
    /// The starting state is written back immediately, so a first run leaves
    /// the seeds in the store.
    pub fn new(config: PlaygroundConfig, store: S, clipboard: C) -> Self {
        let state = match store.load() {
            Some(state) => state,
            None => {
                log::debug!("no usable snapshot stored, starting from defaults");
                Default::default()
            }
        };
        let surface = RenderSurface::new(config.render_options());
        let mut shell = Self {
            config,
            container: CodeStateContainer::new(state),
            store,
            clipboard,
            surface,
            view: ViewMode::default(),
            copied_until: None,
            composed: String::new(),
            status: ShellStatus::default(),
        };
        shell.persist();
        shell.recompose();
        shell
    }

    pub fn container(&self) -> &CodeStateContainer {
        &self.container
    }

    pub fn active(&self) -> BufferId {
        self.container.active()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    /// The render surface, e.g. to register a console sink
    pub fn surface_mut(&mut self) -> &mut RenderSurface {
        &mut self.surface
    }

    /// The document currently handed to the preview
    pub fn composed(&self) -> &str {
        &self.composed
    }

    pub fn preview(&self) -> Option<&RenderSnapshot> {
        self.surface.current()
    }

    pub fn status(&self) -> &ShellStatus {
        &self.status
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn select_tab(&mut self, id: BufferId) {
        self.container.set_active_buffer(id);
    }

    /// Replace the active buffer with `text`.
    pub fn input(&mut self, text: impl Into<String>) {
        if self.container.update_active_buffer(text) {
            self.persist();
            self.recompose();
        }
    }

    /// Copy the active buffer's raw text.
    ///
    /// The indicator is shown whether or not the write succeeded.
    pub fn copy(&mut self, now: Instant) {
        match self.clipboard.write_text(self.container.active_text()) {
            Ok(()) => self.status.clipboard_error = None,
            Err(e) => {
                log::warn!("copy to clipboard failed: {}", e);
                self.status.clipboard_error = Some(e.to_string());
            }
        }
        self.copied_until = Some(now + Duration::from_millis(self.config.copied_indicator_ms));
    }

    /// Whether the "copied" indicator is visible at `now`
    pub fn copied_visible(&self, now: Instant) -> bool {
        self.copied_until.is_some_and(|until| now < until)
    }

    pub fn clear(&mut self, confirm: &mut dyn Confirm) -> ClearOutcome {
        let outcome = self.container.clear_active_buffer(confirm);
        if outcome == ClearOutcome::Cleared {
            self.persist();
            self.recompose();
        }
        outcome
    }

    pub fn toggle_preview(&mut self) -> ViewMode {
        self.view = match self.view {
            ViewMode::Split => ViewMode::PreviewOnly,
            ViewMode::PreviewOnly => ViewMode::Split,
        };
        self.view
    }

    /// Split `rows` between the editor (top) and the preview (bottom).
    pub fn layout(&self, rows: usize) -> ShellLayout {
        match self.view {
            ViewMode::PreviewOnly => ShellLayout {
                editor: None,
                preview: PaneRect { top: 0, rows },
            },
            ViewMode::Split => {
                let editor = rows / 2;
                ShellLayout {
                    editor: Some(PaneRect { top: 0, rows: editor }),
                    preview: PaneRect {
                        top: editor,
                        rows: rows - editor,
                    },
                }
            }
        }
    }

    pub fn placeholder(&self) -> String {
        format!("/* Masukkan kode {} di sini... */", self.active().label())
    }

    pub fn copy_title(&self) -> &'static str {
        "Salin Kode"
    }

    pub fn clear_title(&self) -> String {
        format!("Hapus Kode {}", self.active().label())
    }

    pub fn toggle_title(&self) -> &'static str {
        match self.view {
            ViewMode::Split => "Layar Penuh Review",
            ViewMode::PreviewOnly => "Kecilkan",
        }
    }

    /// Click the element with `element_id` in the live preview.
    pub fn click(&mut self, element_id: &str) -> Result<DispatchOutcome> {
        self.surface.dispatch(element_id, "click")
    }

    fn persist(&mut self) {
        match self.store.save(self.container.state()) {
            Ok(()) => self.status.persist_error = None,
            Err(e) => {
                log::warn!("failed to persist code state: {}", e);
                self.status.persist_error = Some(e.to_string());
            }
        }
    }

    fn recompose(&mut self) {
        self.composed = compose(self.container.state());
        match self.surface.load_document(&self.composed) {
            Ok(_) => self.status.render_error = None,
            Err(e) => {
                log::warn!("preview render failed: {}", e);
                self.status.render_error = Some(e.to_string());
            }
        }
    }
}
