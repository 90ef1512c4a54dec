//! End-to-end scenarios through the editor shell

use std::sync::{Arc, Mutex};

use codelab::{
    compose, BufferId, CodeState, ConsoleMessage, EditorShell, MemoryClipboard, MemoryStore,
    PageEffect, PlaygroundConfig, RenderOptions, RenderOutcome, RenderSurface,
};

fn shell_with(store: MemoryStore) -> EditorShell<MemoryStore, MemoryClipboard> {
    EditorShell::new(PlaygroundConfig::default(), store, MemoryClipboard::new())
}

#[test]
fn default_session_shows_seed_preview() {
    let shell = shell_with(MemoryStore::new());
    let state = shell.container().state();
    assert_eq!(state, &CodeState::default());
    assert_eq!(shell.active(), BufferId::Html);

    let preview = shell.preview().expect("initial render");
    assert!(preview.text.contains("Halo Dunia!"));
    assert!(preview.text.contains("Klik Saya"));
    assert!(preview.styles.iter().any(|s| s.contains("background: #000")));
    assert!(preview.diagnostics.is_empty(), "{:?}", preview.diagnostics);
}

#[test]
fn script_title_is_embedded_and_applied() {
    let mut shell = shell_with(MemoryStore::new());
    shell.select_tab(BufferId::Js);
    shell.input("document.title = \"X\";");

    let composed = shell.composed();
    let try_at = composed.find("try {").unwrap();
    let catch_at = composed.find("} catch (e) {").unwrap();
    let script_at = composed.find("document.title = \"X\";").unwrap();
    assert!(try_at < script_at && script_at < catch_at);

    assert_eq!(shell.preview().unwrap().title, "X");
}

#[test]
fn empty_state_composes_scaffold() {
    let store = MemoryStore::new();
    store.set_raw(r#"{"html":"","css":"","js":""}"#);
    let shell = shell_with(store);
    assert_eq!(shell.container().state(), &CodeState::empty());
    assert_eq!(shell.composed(), compose(&CodeState::empty()));
    let preview = shell.preview().unwrap();
    assert_eq!(preview.text, "");
    assert!(preview.diagnostics.is_empty());
}

#[test]
fn runtime_error_is_caught_by_boundary() {
    let seen: Arc<Mutex<Vec<ConsoleMessage>>> = Arc::default();
    let sink = seen.clone();

    let mut shell = shell_with(MemoryStore::new());
    shell.surface_mut().on_console(move |m| sink.lock().unwrap().push(m.clone()));
    shell.select_tab(BufferId::Js);
    shell.input("document.title = 'before';\nnotDefined();\ndocument.title = 'after';");

    let preview = shell.preview().unwrap();
    assert_eq!(preview.title, "before");
    assert!(preview.text.contains("Halo Dunia!"));
    let boundary: Vec<_> = preview.boundary_errors().collect();
    assert_eq!(boundary.len(), 1);
    assert!(boundary[0].text.starts_with("JS Error:"));
    assert!(boundary[0].text.contains("notDefined"));

    let seen = seen.lock().unwrap();
    assert!(seen.iter().any(|m| m.boundary));
}

#[test]
fn clicking_magic_button_alerts() {
    let mut shell = shell_with(MemoryStore::new());
    let outcome = shell.click("magicBtn").unwrap();
    assert!(outcome.found);
    assert_eq!(
        outcome.effects,
        vec![PageEffect::Alert {
            message: "Berhasil!".to_string()
        }]
    );
    assert!(shell
        .preview()
        .unwrap()
        .effects
        .contains(&PageEffect::Alert {
            message: "Berhasil!".to_string()
        }));
}

#[test]
fn identical_document_is_unchanged() {
    let mut surface = RenderSurface::new(RenderOptions::default());
    let doc = compose(&CodeState::default());
    let first = surface.load_document(&doc).unwrap();
    let id = match first {
        RenderOutcome::Rendered(snap) => snap.id,
        RenderOutcome::Unchanged => panic!("first load must render"),
    };
    assert!(matches!(
        surface.load_document(&doc).unwrap(),
        RenderOutcome::Unchanged
    ));
    assert_eq!(surface.current().unwrap().id, id);
}

#[test]
fn page_cannot_read_host_storage() {
    let store = MemoryStore::new();
    let mut shell = shell_with(store.clone());
    shell.select_tab(BufferId::Js);
    shell.input("document.body.textContent = localStorage.getItem('minimalist-code-lab-final');");

    let preview = shell.preview().unwrap();
    let boundary: Vec<_> = preview.boundary_errors().collect();
    assert_eq!(boundary.len(), 1);
    assert!(boundary[0].text.contains("SecurityError"));
    assert!(store.raw().is_some());
    assert!(!preview.text.contains("\"html\""));
}

#[test]
fn switching_tabs_keeps_every_buffer() {
    let mut shell = shell_with(MemoryStore::new());
    shell.input("<p>a</p>");
    shell.select_tab(BufferId::Css);
    shell.input("p { color: red; }");
    shell.select_tab(BufferId::Html);
    assert_eq!(shell.container().active_text(), "<p>a</p>");
    assert_eq!(shell.container().get(BufferId::Css), "p { color: red; }");
    assert_eq!(shell.container().get(BufferId::Js), CodeState::default().js);
}
