//! Render surface: an isolated context the composed document is loaded into.
//!
//! Every document change is a full reload: the previous page context is
//! dropped and a new one created from scratch. Scripts run on a page worker
//! (see [`worker`]) inside a small DOM harness; the page never sees host
//! state, and storage access throws as it does in an iframe sandboxed
//! without `allow-same-origin`.
//!
//! A page whose scripts overrun the timeout is torn down, but its thread
//! cannot be interrupted mid-job. Until that thread finishes, later loads
//! render statically and scripts stay paused, so at most one runaway thread
//! exists per surface.

pub mod dom;
pub mod worker;

use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::compose::BOUNDARY_CATCH;
use crate::{ConsoleMessage, Error, Result};
use dom::ParsedDocument;
use worker::{EvalResult, PageWorker, ScriptLimits};

type OnConsoleHandler = Arc<dyn Fn(&ConsoleMessage) + Send + Sync>;

const HARNESS: &str = include_str!("harness.js");

// Replaces the composed catch block so boundary reports are tagged at the source.
const BOUNDARY_HOOK: &str = "\n      } catch (e) {\n        __codelab.boundary(e);\n      }\n    ";

const SCRIPTS_PAUSED: &str = "Scripts paused: a timed-out script from an earlier load is still running";

/// Capabilities granted to the preview document.
///
/// Same-origin access and top-level navigation are never granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxPolicy {
    pub allow_scripts: bool,
    pub allow_modals: bool,
    pub allow_forms: bool,
    pub allow_popups: bool,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            allow_scripts: true,
            allow_modals: true,
            allow_forms: true,
            allow_popups: true,
        }
    }
}

impl SandboxPolicy {
    pub fn allow_same_origin(&self) -> bool {
        false
    }

    pub fn allow_top_navigation(&self) -> bool {
        false
    }

    /// Tokens of the equivalent iframe `sandbox` attribute
    pub fn to_attribute(&self) -> String {
        let mut tokens = Vec::new();
        if self.allow_scripts {
            tokens.push("allow-scripts");
        }
        if self.allow_modals {
            tokens.push("allow-modals");
        }
        if self.allow_forms {
            tokens.push("allow-forms");
        }
        if self.allow_popups {
            tokens.push("allow-popups");
        }
        tokens.join(" ")
    }

    fn to_json(self) -> String {
        serde_json::json!({
            "scripts": self.allow_scripts,
            "modals": self.allow_modals,
            "forms": self.allow_forms,
            "popups": self.allow_popups,
        })
        .to_string()
    }
}

/// Options for a [`RenderSurface`]
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub sandbox: SandboxPolicy,
    pub script_timeout_ms: u64,
    pub script_loop_iteration_limit: u64,
    pub script_recursion_limit: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        crate::PlaygroundConfig::default().render_options()
    }
}

/// Identity of a loaded document (SHA-256 of its text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId([u8; 32]);

impl DocumentId {
    pub fn of(document: &str) -> Self {
        let digest = Sha256::digest(document.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Something the page asked the host to do
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageEffect {
    Alert { message: String },
    Confirm { message: String },
    Prompt { message: String },
    Popup { url: String },
    FormSubmit { target: String, action: String },
}

#[derive(Debug, Deserialize)]
struct ConsoleEvent {
    level: String,
    text: String,
    #[serde(default)]
    boundary: bool,
}

#[derive(Debug, Deserialize)]
struct PageState {
    title: String,
    text: String,
}

/// What the preview shows after a load
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub id: DocumentId,
    /// Document title (after scripts ran)
    pub title: String,
    /// Visible body text, whitespace collapsed
    pub text: String,
    /// Inline style sheets in document order
    pub styles: Vec<String>,
    /// Diagnostic channel: console output and uncaught errors
    pub diagnostics: Vec<ConsoleMessage>,
    pub effects: Vec<PageEffect>,
}

impl RenderSnapshot {
    /// Diagnostics emitted by the composed script's error boundary
    pub fn boundary_errors(&self) -> impl Iterator<Item = &ConsoleMessage> {
        self.diagnostics.iter().filter(|m| m.boundary)
    }
}

#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// Same document identity as what is loaded; nothing re-rendered
    Unchanged,
    Rendered(RenderSnapshot),
}

/// Result of dispatching an event into the live page
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Whether the target element exists
    pub found: bool,
    pub effects: Vec<PageEffect>,
    pub diagnostics: Vec<ConsoleMessage>,
}

struct LoadedPage {
    snapshot: RenderSnapshot,
    worker: Option<PageWorker>,
}

pub struct RenderSurface {
    options: RenderOptions,
    page: Option<LoadedPage>,
    /// Threads of timed-out pages that have not finished yet
    stalled: Vec<JoinHandle<()>>,
    on_console: Option<OnConsoleHandler>,
}

impl RenderSurface {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            page: None,
            stalled: Vec::new(),
            on_console: None,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Replace the options; they apply from the next load.
    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    /// Register a sink for every diagnostic the page produces.
    pub fn on_console<F>(&mut self, cb: F)
    where
        F: Fn(&ConsoleMessage) + Send + Sync + 'static,
    {
        self.on_console = Some(Arc::new(cb));
    }

    pub fn clear_on_console(&mut self) {
        self.on_console = None;
    }

    /// Page threads still alive: the loaded page's worker plus any timed-out
    /// worker that has not finished its job yet.
    pub fn live_workers(&mut self) -> usize {
        self.reap_stalled();
        let current = self
            .page
            .as_ref()
            .and_then(|p| p.worker.as_ref())
            .map_or(0, |w| usize::from(w.is_running()));
        current + self.stalled.len()
    }

    /// Last rendered snapshot
    pub fn current(&self) -> Option<&RenderSnapshot> {
        self.page.as_ref().map(|p| &p.snapshot)
    }

    /// Load `document` as the surface's entire content.
    pub fn load_document(&mut self, document: &str) -> Result<RenderOutcome> {
        let id = DocumentId::of(document);
        if self.page.as_ref().map(|p| p.snapshot.id) == Some(id) {
            return Ok(RenderOutcome::Unchanged);
        }
        // Tear down the previous context before building the next one.
        self.page = None;

        let parsed = ParsedDocument::parse(document);
        let mut snapshot = RenderSnapshot {
            id,
            title: parsed.title.clone(),
            text: parsed.body_text(),
            styles: parsed.styles.clone(),
            diagnostics: Vec::new(),
            effects: Vec::new(),
        };
        for src in &parsed.external_scripts {
            self.push_diagnostic(
                &mut snapshot.diagnostics,
                ConsoleMessage::new("warn", format!("External script '{}' was not loaded", src)),
            );
        }

        let mut worker = None;
        self.reap_stalled();
        if self.options.sandbox.allow_scripts && !parsed.scripts.is_empty() {
            if !self.stalled.is_empty() {
                log::warn!("{} stalled page worker(s), not running scripts", self.stalled.len());
                self.push_diagnostic(
                    &mut snapshot.diagnostics,
                    ConsoleMessage::new("error", SCRIPTS_PAUSED),
                );
            } else {
                let w = PageWorker::spawn(self.limits());
                match self.run_page_scripts(&w, &parsed, &mut snapshot) {
                    Ok(()) => worker = Some(w),
                    Err(Error::Timeout(ms)) => {
                        log::warn!("preview scripts timed out after {}ms", ms);
                        self.stalled.push(w.into_handle());
                        self.push_diagnostic(
                            &mut snapshot.diagnostics,
                            ConsoleMessage::new("error", format!("Script timed out after {}ms", ms)),
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        log::debug!("rendered document {}", id);
        self.page = Some(LoadedPage {
            snapshot: snapshot.clone(),
            worker,
        });
        Ok(RenderOutcome::Rendered(snapshot))
    }

    /// Fire `event_type` at the element with `element_id` in the live page.
    pub fn dispatch(&mut self, element_id: &str, event_type: &str) -> Result<DispatchOutcome> {
        let Some(page) = self.page.as_ref() else {
            return Ok(DispatchOutcome::default());
        };
        let Some(worker) = page.worker.as_ref() else {
            return Ok(DispatchOutcome::default());
        };

        let call = format!(
            "String(__codelab.dispatch({}, {}))",
            serde_json::to_string(element_id)?,
            serde_json::to_string(event_type)?
        );
        let sources = vec![
            call,
            "__codelab.drain()".to_string(),
            "__codelab.snapshot()".to_string(),
        ];
        let results = match worker.run(sources) {
            Ok(r) => r,
            Err(Error::Timeout(ms)) => {
                let msg = ConsoleMessage::new("error", format!("Script timed out after {}ms", ms));
                self.notify(&msg);
                if let Some(page) = self.page.as_mut() {
                    if let Some(w) = page.worker.take() {
                        self.stalled.push(w.into_handle());
                    }
                    page.snapshot.diagnostics.push(msg.clone());
                }
                return Ok(DispatchOutcome {
                    found: true,
                    effects: Vec::new(),
                    diagnostics: vec![msg],
                });
            }
            Err(e) => return Err(e),
        };

        let found = matches!(results.first(), Some(Ok(v)) if v == "true");
        let mut outcome = DispatchOutcome {
            found,
            ..Default::default()
        };
        if let Some(Err(e)) = results.first() {
            outcome.diagnostics.push(ConsoleMessage::new("error", format!("Uncaught {}", e)));
        }
        if let Some(res) = results.get(1) {
            self.absorb_events(res, &mut outcome.diagnostics, &mut outcome.effects)?;
        }
        let state = results.get(2).map(parse_page_state).transpose()?;

        if let Some(page) = self.page.as_mut() {
            if let Some(state) = state {
                page.snapshot.title = state.title;
                page.snapshot.text = state.text;
            }
            page.snapshot.effects.extend(outcome.effects.iter().cloned());
            page.snapshot.diagnostics.extend(outcome.diagnostics.iter().cloned());
        }
        for msg in &outcome.diagnostics {
            self.notify(msg);
        }
        Ok(outcome)
    }

    // Join the threads of timed-out pages that have since finished.
    fn reap_stalled(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) =
            self.stalled.drain(..).partition(|h| h.is_finished());
        for handle in done {
            if handle.join().is_err() {
                log::warn!("stalled page worker panicked");
            }
        }
        self.stalled = running;
    }

    fn limits(&self) -> ScriptLimits {
        ScriptLimits {
            timeout_ms: self.options.script_timeout_ms,
            loop_iteration_limit: self.options.script_loop_iteration_limit,
            recursion_limit: self.options.script_recursion_limit,
        }
    }

    fn run_page_scripts(
        &self,
        worker: &PageWorker,
        parsed: &ParsedDocument,
        snapshot: &mut RenderSnapshot,
    ) -> Result<()> {
        let title_json = serde_json::to_string(&parsed.title)?;
        let harness = fill_template(
            HARNESS,
            &[
                ("__CODELAB_POLICY__", &self.options.sandbox.to_json()),
                ("__CODELAB_TITLE__", &title_json),
                ("__CODELAB_NODES__", &parsed.nodes_json()),
            ],
        );

        // harness, then (script, drain) pairs, then load + drain + snapshot
        let mut sources = Vec::with_capacity(parsed.scripts.len() * 2 + 4);
        sources.push(harness);
        let last = parsed.scripts.len().saturating_sub(1);
        for (i, script) in parsed.scripts.iter().enumerate() {
            if i == last {
                sources.push(instrument_boundary(&script.code));
            } else {
                sources.push(script.code.clone());
            }
            sources.push("__codelab.drain()".to_string());
        }
        sources.push("__codelab.loaded(); ''".to_string());
        sources.push("__codelab.drain()".to_string());
        sources.push("__codelab.snapshot()".to_string());

        let results = worker.run(sources)?;
        let mut results = results.into_iter();

        match results.next() {
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                return Err(Error::RenderError(format!("page harness failed: {}", e)));
            }
            None => return Err(Error::RenderError("page worker returned nothing".into())),
        }

        for _ in &parsed.scripts {
            let script_res = results.next();
            let drained = results.next();
            if let Some(res) = drained {
                self.absorb_events(&res, &mut snapshot.diagnostics, &mut snapshot.effects)?;
            }
            if let Some(Err(e)) = script_res {
                self.push_diagnostic(
                    &mut snapshot.diagnostics,
                    ConsoleMessage::new("error", format!("Uncaught {}", e)),
                );
            }
        }

        if let Some(Err(e)) = results.next() {
            log::warn!("load handlers failed: {}", e);
        }
        if let Some(res) = results.next() {
            self.absorb_events(&res, &mut snapshot.diagnostics, &mut snapshot.effects)?;
        }
        if let Some(res) = results.next() {
            let state = parse_page_state(&res)?;
            snapshot.title = state.title;
            snapshot.text = state.text;
        }
        Ok(())
    }

    fn absorb_events(
        &self,
        drained: &EvalResult,
        diagnostics: &mut Vec<ConsoleMessage>,
        effects: &mut Vec<PageEffect>,
    ) -> Result<()> {
        let json = drained
            .as_ref()
            .map_err(|e| Error::RenderError(format!("failed to read page events: {}", e)))?;
        let events: Vec<serde_json::Value> = serde_json::from_str(json)?;
        for ev in events {
            if ev.get("kind").and_then(|k| k.as_str()) == Some("console") {
                let c: ConsoleEvent = serde_json::from_value(ev)?;
                let msg = if c.boundary {
                    ConsoleMessage::boundary_error(c.text)
                } else {
                    ConsoleMessage::new(c.level, c.text)
                };
                self.push_diagnostic(diagnostics, msg);
            } else {
                effects.push(serde_json::from_value(ev)?);
            }
        }
        Ok(())
    }

    fn push_diagnostic(&self, diagnostics: &mut Vec<ConsoleMessage>, msg: ConsoleMessage) {
        self.notify(&msg);
        diagnostics.push(msg);
    }

    fn notify(&self, msg: &ConsoleMessage) {
        log::debug!("preview {}: {}", msg.level, msg.text);
        if let Some(cb) = &self.on_console {
            cb(msg);
        }
    }
}

/// Substitute every `(token, value)` in one left-to-right pass; inserted
/// values are never rescanned.
fn fill_template(template: &str, subs: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let next = subs
            .iter()
            .filter_map(|(token, value)| rest.find(token).map(|at| (at, *token, *value)))
            .min_by_key(|(at, _, _)| *at);
        match next {
            Some((at, token, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + token.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Route the composed catch block to the harness so its reports are
/// distinguishable from page code calling `console.error` itself.
fn instrument_boundary(code: &str) -> String {
    match code.strip_suffix(BOUNDARY_CATCH) {
        Some(body) => format!("{}{}", body, BOUNDARY_HOOK),
        None => code.to_string(),
    }
}

fn parse_page_state(res: &EvalResult) -> Result<PageState> {
    let json = res
        .as_ref()
        .map_err(|e| Error::RenderError(format!("failed to read page state: {}", e)))?;
    let state: PageState = serde_json::from_str(json)?;
    Ok(PageState {
        title: dom::collapse_whitespace(&state.title),
        text: dom::collapse_whitespace(&state.text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn surface() -> RenderSurface {
        RenderSurface::new(RenderOptions::default())
    }

    fn rendered(outcome: RenderOutcome) -> RenderSnapshot {
        match outcome {
            RenderOutcome::Rendered(s) => s,
            RenderOutcome::Unchanged => panic!("expected a render"),
        }
    }

    #[test]
    fn sandbox_attribute_matches_iframe_tokens() {
        let p = SandboxPolicy::default();
        assert_eq!(
            p.to_attribute(),
            "allow-scripts allow-modals allow-forms allow-popups"
        );
        assert!(!p.allow_same_origin());
        assert!(!p.allow_top_navigation());
        let none = SandboxPolicy {
            allow_scripts: false,
            allow_modals: false,
            allow_forms: false,
            allow_popups: false,
        };
        assert_eq!(none.to_attribute(), "");
    }

    #[test]
    fn document_id_is_content_addressed() {
        let a = DocumentId::of("<p>a</p>");
        assert_eq!(a, DocumentId::of("<p>a</p>"));
        assert_ne!(a, DocumentId::of("<p>b</p>"));
        assert_eq!(a.to_string().len(), 64);
    }

    #[test]
    fn identical_document_is_not_rerendered() {
        let mut s = surface();
        let doc = "<html><body><p>hi</p></body></html>";
        assert!(matches!(s.load_document(doc).unwrap(), RenderOutcome::Rendered(_)));
        assert!(matches!(s.load_document(doc).unwrap(), RenderOutcome::Unchanged));
        assert!(matches!(
            s.load_document("<html><body><p>bye</p></body></html>").unwrap(),
            RenderOutcome::Rendered(_)
        ));
        assert_eq!(s.current().unwrap().text, "bye");
    }

    #[test]
    fn script_mutates_title_and_text() {
        let mut s = surface();
        let snap = rendered(
            s.load_document(
                "<html><head><title>Old</title></head><body><p id=\"t\">before</p>\
                 <script>document.title = 'New'; document.getElementById('t').textContent = 'after';</script>\
                 </body></html>",
            )
            .unwrap(),
        );
        assert_eq!(snap.title, "New");
        assert_eq!(snap.text, "after");
        assert!(snap.diagnostics.is_empty(), "{:?}", snap.diagnostics);
    }

    #[test]
    fn console_output_reaches_sink_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut s = surface();
        s.on_console(move |m| sink.lock().unwrap().push(format!("{}:{}", m.level, m.text)));
        rendered(
            s.load_document(
                "<body><script>console.log('one', 2); console.warn({a: 1});</script>\
                 <script>undefinedFn();</script><script>console.error('three')</script></body>",
            )
            .unwrap(),
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], "log:one 2");
        assert_eq!(seen[1], "warn:{\"a\":1}");
        assert!(seen[2].starts_with("error:Uncaught"), "{}", seen[2]);
        assert!(seen[2].contains("undefinedFn"));
        assert_eq!(seen[3], "error:three");
    }

    #[test]
    fn storage_is_not_reachable_from_the_page() {
        let mut s = surface();
        let snap = rendered(
            s.load_document(
                "<body><p id=\"o\">x</p><script>\
                 var out = document.getElementById('o');\
                 try { localStorage.getItem('k'); out.textContent = 'leaked'; }\
                 catch (e) { out.textContent = e.name; }\
                 document.cookie = 'a=b'; console.log('cookie=' + document.cookie);\
                 </script></body>",
            )
            .unwrap(),
        );
        assert_eq!(snap.text, "SecurityError");
        assert_eq!(snap.diagnostics[0].text, "cookie=");
    }

    #[test]
    fn dialogs_popups_and_forms_become_effects() {
        let mut s = surface();
        let snap = rendered(
            s.load_document(
                "<body><form id=\"f\" action=\"/go\"><button id=\"b\">Go</button></form><script>\
                 alert('hi'); var ok = confirm('sure?'); prompt('name');\
                 window.open('https://example.com');\
                 console.log('confirm=' + ok);\
                 </script></body>",
            )
            .unwrap(),
        );
        assert_eq!(
            snap.effects,
            vec![
                PageEffect::Alert { message: "hi".into() },
                PageEffect::Confirm { message: "sure?".into() },
                PageEffect::Prompt { message: "name".into() },
                PageEffect::Popup { url: "https://example.com".into() },
            ]
        );
        assert_eq!(snap.diagnostics[0].text, "confirm=false");

        let out = s.dispatch("b", "click").unwrap();
        assert!(out.found);
        assert_eq!(
            out.effects,
            vec![PageEffect::FormSubmit {
                target: "f".into(),
                action: "/go".into()
            }]
        );
    }

    #[test]
    fn restricted_policy_blocks_capabilities() {
        let mut s = RenderSurface::new(RenderOptions {
            sandbox: SandboxPolicy {
                allow_scripts: true,
                allow_modals: false,
                allow_forms: false,
                allow_popups: false,
            },
            ..RenderOptions::default()
        });
        let snap = rendered(
            s.load_document(
                "<body><form id=\"f\"></form><script>alert('x'); window.open('u');\
                 document.getElementById('f').submit();</script></body>",
            )
            .unwrap(),
        );
        assert!(snap.effects.is_empty());
        assert_eq!(snap.diagnostics.len(), 3);
        assert!(snap.diagnostics[0].text.contains("allow-modals"));
        assert!(snap.diagnostics[1].text.contains("allow-popups"));
        assert!(snap.diagnostics[2].text.contains("allow-forms"));
    }

    #[test]
    fn scripts_disabled_renders_static_content() {
        let mut s = RenderSurface::new(RenderOptions {
            sandbox: SandboxPolicy {
                allow_scripts: false,
                ..SandboxPolicy::default()
            },
            ..RenderOptions::default()
        });
        let snap = rendered(
            s.load_document("<body><p>static</p><script>document.title='no';</script></body>")
                .unwrap(),
        );
        assert_eq!(snap.text, "static");
        assert_eq!(snap.title, "");
        let out = s.dispatch("anything", "click").unwrap();
        assert!(!out.found);
    }

    #[test]
    fn click_dispatch_runs_listeners_and_timers() {
        let mut s = surface();
        rendered(
            s.load_document(
                "<body><button id=\"b\">0</button><script>\
                 var n = 0; var b = document.querySelector('#b');\
                 b.addEventListener('click', function () {\
                   n++; setTimeout(function () { b.textContent = String(n); }, 10);\
                 });\
                 </script></body>",
            )
            .unwrap(),
        );
        s.dispatch("b", "click").unwrap();
        let out = s.dispatch("b", "click").unwrap();
        assert!(out.found);
        assert_eq!(s.current().unwrap().text, "2");
        assert!(!s.dispatch("missing", "click").unwrap().found);
    }

    #[test]
    fn inner_html_and_queries() {
        let mut s = surface();
        let snap = rendered(
            s.load_document(
                "<body><ul class=\"list\"><li class=\"item\">a</li><li class=\"item\">b</li></ul>\
                 <div id=\"out\"></div><script>\
                 var items = document.querySelectorAll('ul.list .item');\
                 var out = document.getElementById('out');\
                 out.innerHTML = '<strong>' + items.length + '</strong> items';\
                 console.log(out.children[0].tagName, out.innerHTML);\
                 </script></body>",
            )
            .unwrap(),
        );
        assert_eq!(snap.text, "ab2 items");
        assert_eq!(snap.diagnostics[0].text, "STRONG <strong>2</strong> items");
    }

    #[test]
    fn runaway_loop_is_contained() {
        let mut s = RenderSurface::new(RenderOptions {
            script_loop_iteration_limit: 1000,
            ..RenderOptions::default()
        });
        let snap = rendered(
            s.load_document("<body><p>still here</p><script>while (true) {}</script></body>")
                .unwrap(),
        );
        assert_eq!(snap.text, "still here");
        assert!(snap.diagnostics.iter().any(|m| m.level == "error"));
    }

    #[test]
    fn timed_out_page_pauses_scripts_until_its_thread_ends() {
        let mut s = RenderSurface::new(RenderOptions {
            script_timeout_ms: 20,
            script_loop_iteration_limit: 10_000_000,
            ..RenderOptions::default()
        });
        let first = rendered(
            s.load_document("<body><p>spin</p><script>while (true) {}</script></body>")
                .unwrap(),
        );
        assert!(first.diagnostics.iter().any(|m| m.text.contains("timed out")));
        assert_eq!(s.live_workers(), 1);

        for n in 0..3 {
            let doc = format!("<body><p>{}</p><script>while (true) {{}}</script></body>", n);
            let snap = rendered(s.load_document(&doc).unwrap());
            assert_eq!(snap.text, n.to_string());
            assert!(s.live_workers() <= 1);
            if s.live_workers() == 1 {
                assert!(snap.diagnostics.iter().any(|m| m.text == SCRIPTS_PAUSED));
            }
        }

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(120);
        while s.live_workers() > 0 {
            assert!(std::time::Instant::now() < deadline, "stalled worker never finished");
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        s.set_options(RenderOptions::default());
        let snap = rendered(
            s.load_document("<body><p id=\"t\">old</p><script>document.getElementById('t').textContent = 'ran';</script></body>")
                .unwrap(),
        );
        assert_eq!(snap.text, "ran");
        assert_eq!(s.live_workers(), 1);
    }

    #[test]
    fn only_the_composed_catch_block_is_a_boundary_error() {
        let state = crate::CodeState {
            html: "<p>ok</p>".into(),
            css: String::new(),
            js: "console.error('JS Error: written by the page');\nthrow new TypeError('real');".into(),
        };
        let mut s = surface();
        let snap = rendered(s.load_document(&crate::compose(&state)).unwrap());
        assert_eq!(snap.diagnostics.len(), 2);
        assert!(!snap.diagnostics[0].boundary);
        assert_eq!(snap.diagnostics[0].text, "JS Error: written by the page");
        let boundary: Vec<_> = snap.boundary_errors().collect();
        assert_eq!(boundary.len(), 1);
        assert_eq!(boundary[0].text, "JS Error: TypeError: real");
        assert_eq!(snap.text, "ok");
    }

    #[test]
    fn template_tokens_in_page_content_stay_literal() {
        let mut s = surface();
        let snap = rendered(
            s.load_document(
                "<html><head><title>__CODELAB_NODES__ __CODELAB_POLICY__</title></head>\
                 <body><p>__CODELAB_TITLE__</p><script>console.log(document.title)</script></body></html>",
            )
            .unwrap(),
        );
        assert_eq!(snap.title, "__CODELAB_NODES__ __CODELAB_POLICY__");
        assert_eq!(snap.text, "__CODELAB_TITLE__");
        assert_eq!(snap.diagnostics[0].text, "__CODELAB_NODES__ __CODELAB_POLICY__");
    }

    #[test]
    fn fill_template_is_single_pass() {
        let out = fill_template("a=A; b=B;", &[("A", "B"), ("B", "A")]);
        assert_eq!(out, "a=B; b=A;");
    }
}
