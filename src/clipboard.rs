//! Clipboard access: write-only, raw text.

use std::sync::{Arc, Mutex};

use crate::{Error, Result};

/// Destination for the copy action
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

impl<T: Clipboard + ?Sized> Clipboard for Box<T> {
    fn write_text(&mut self, text: &str) -> Result<()> {
        (**self).write_text(text)
    }
}

/// In-process clipboard. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
    deny: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that rejects every write, like a denied permission
    pub fn denied() -> Self {
        Self {
            contents: Arc::default(),
            deny: true,
        }
    }

    /// Most recently written text
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok()?.clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        if self.deny {
            return Err(Error::ClipboardError("write permission denied".into()));
        }
        let mut slot = self
            .contents
            .lock()
            .map_err(|_| Error::ClipboardError("clipboard lock poisoned".into()))?;
        *slot = Some(text.to_string());
        Ok(())
    }
}

/// The desktop clipboard, opened lazily on first write.
#[cfg(feature = "system-clipboard")]
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "system-clipboard")]
impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            let clip = arboard::Clipboard::new()
                .map_err(|e| Error::ClipboardError(format!("clipboard unavailable: {}", e)))?;
            self.inner = Some(clip);
        }
        match self.inner.as_mut() {
            Some(clip) => clip
                .set_text(text.to_string())
                .map_err(|e| Error::ClipboardError(format!("clipboard copy failed: {}", e))),
            None => Err(Error::ClipboardError("clipboard unavailable".into())),
        }
    }
}
