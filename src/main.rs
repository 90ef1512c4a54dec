use std::io::{self, BufRead, Write};
use std::time::Instant;

use anyhow::{Context as _, Result};
use clap::Parser;

use codelab::config::Args;
use codelab::{
    BufferId, ClearOutcome, Clipboard, Confirm, EditorShell, FileStore, MemoryClipboard,
    MemoryStore, PageEffect, PlaygroundConfig, Store, ViewMode,
};

const TERMINAL_ROWS: usize = 24;

const HELP: &str = "\
commands:
  tabs              list buffers
  tab <html|css|js> switch the active buffer
  show              print the active buffer
  edit              replace the active buffer (end with a line containing only '.')
  append <text>     append a line to the active buffer
  copy              copy the active buffer to the clipboard
  clear             empty the active buffer (asks first)
  toggle            switch between split and preview-only view
  preview           print the rendered preview
  source            print the composed document
  click <id>        click an element in the preview
  diag              print preview console output
  help              show this help
  quit              exit";

/// Yes/no prompt read from the REPL's own input.
struct StdinConfirm<'a, R: BufRead, W: Write> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<R: BufRead, W: Write> Confirm for StdinConfirm<'_, R, W> {
    fn confirm(&mut self, message: &str) -> bool {
        if write!(self.output, "{} [y/N] ", message)
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn init_logging(level: Option<&str>) {
    let mut builder = match level {
        Some(level) => {
            let mut b = env_logger::Builder::new();
            b.parse_filters(level);
            b
        }
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")),
    };
    let _ = builder.try_init();
}

fn print_pane(out: &mut impl Write, text: &str, rows: usize) -> io::Result<()> {
    let lines: Vec<&str> = text.lines().collect();
    for line in lines.iter().take(rows) {
        writeln!(out, "{}", line)?;
    }
    if lines.len() > rows {
        writeln!(out, "... ({} more lines)", lines.len() - rows)?;
    }
    Ok(())
}

fn print_effects(out: &mut impl Write, effects: &[PageEffect]) -> io::Result<()> {
    for effect in effects {
        match effect {
            PageEffect::Alert { message } => writeln!(out, "[alert] {}", message)?,
            PageEffect::Confirm { message } => writeln!(out, "[confirm] {} -> cancel", message)?,
            PageEffect::Prompt { message } => writeln!(out, "[prompt] {} -> cancel", message)?,
            PageEffect::Popup { url } => writeln!(out, "[popup] {}", url)?,
            PageEffect::FormSubmit { target, action } => {
                writeln!(out, "[submit] form '{}' -> '{}'", target, action)?
            }
        }
    }
    Ok(())
}

fn show_editor<S: Store, C: Clipboard>(
    shell: &EditorShell<S, C>,
    out: &mut impl Write,
) -> io::Result<()> {
    let layout = shell.layout(TERMINAL_ROWS);
    let Some(editor) = layout.editor else {
        return writeln!(out, "(editor hidden, use 'toggle')");
    };
    let text = shell.container().active_text();
    if text.is_empty() {
        return writeln!(out, "{}", shell.placeholder());
    }
    print_pane(out, text, editor.rows)
}

fn show_preview<S: Store, C: Clipboard>(
    shell: &EditorShell<S, C>,
    out: &mut impl Write,
) -> io::Result<()> {
    let rows = shell.layout(TERMINAL_ROWS).preview.rows;
    match shell.preview() {
        Some(snap) => {
            writeln!(out, "title: {}", snap.title)?;
            writeln!(out, "styles: {} sheet(s)", snap.styles.len())?;
            print_pane(out, &snap.text, rows)?;
            print_effects(out, &snap.effects)
        }
        None => writeln!(out, "(nothing rendered)"),
    }
}

fn active_label<S: Store, C: Clipboard>(shell: &EditorShell<S, C>) -> String {
    BufferId::ALL
        .iter()
        .map(|id| {
            if *id == shell.active() {
                format!("[{}]", id.label())
            } else {
                id.label().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run the command loop until `quit` or end of input.
fn repl<S, C, R, W>(shell: &mut EditorShell<S, C>, input: &mut R, out: &mut W) -> Result<()>
where
    S: Store,
    C: Clipboard,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{}  (type 'help')", active_label(shell))?;
    loop {
        write!(out, "{}> ", shell.active().as_str())?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        let (cmd, rest) = match line.trim_start().split_once(' ') {
            Some((c, r)) => (c, r),
            None => (line.trim(), ""),
        };

        match cmd {
            "" => {}
            "help" => writeln!(out, "{}", HELP)?,
            "quit" | "exit" => break,
            "tabs" => writeln!(out, "{}", active_label(shell))?,
            "tab" => match rest.trim().parse::<BufferId>() {
                Ok(id) => {
                    shell.select_tab(id);
                    writeln!(out, "{}", active_label(shell))?;
                }
                Err(e) => writeln!(out, "{}", e)?,
            },
            "show" => show_editor(shell, out)?,
            "edit" => {
                writeln!(out, "{}", shell.placeholder())?;
                let mut lines = Vec::new();
                loop {
                    let mut l = String::new();
                    if input.read_line(&mut l)? == 0 {
                        break;
                    }
                    let l = l.trim_end_matches(['\r', '\n']);
                    if l == "." {
                        break;
                    }
                    lines.push(l.to_string());
                }
                shell.input(lines.join("\n"));
            }
            "append" => {
                let current = shell.container().active_text();
                let next = if current.is_empty() {
                    rest.to_string()
                } else {
                    format!("{}\n{}", current, rest)
                };
                shell.input(next);
            }
            "copy" => {
                shell.copy(Instant::now());
                writeln!(out, "\u{2713} {}", shell.copy_title())?;
            }
            "clear" => {
                let title = shell.clear_title();
                let outcome = {
                    let mut confirm = StdinConfirm {
                        input: &mut *input,
                        output: &mut *out,
                    };
                    shell.clear(&mut confirm)
                };
                match outcome {
                    ClearOutcome::Cleared => writeln!(out, "{}: done", title)?,
                    ClearOutcome::Cancelled => writeln!(out, "{}: cancelled", title)?,
                }
            }
            "toggle" => {
                let mode = shell.toggle_preview();
                let name = match mode {
                    ViewMode::Split => "split",
                    ViewMode::PreviewOnly => "preview only",
                };
                writeln!(out, "view: {} (next: {})", name, shell.toggle_title())?;
            }
            "preview" => show_preview(shell, out)?,
            "source" => write!(out, "{}", shell.composed())?,
            "click" => match shell.click(rest.trim()) {
                Ok(outcome) if !outcome.found => {
                    writeln!(out, "no element with id '{}'", rest.trim())?
                }
                Ok(outcome) => {
                    print_effects(out, &outcome.effects)?;
                    for msg in &outcome.diagnostics {
                        writeln!(out, "[{}] {}", msg.level, msg.text)?;
                    }
                }
                Err(e) => writeln!(out, "click failed: {}", e)?,
            },
            "diag" => {
                if let Some(snap) = shell.preview() {
                    for msg in &snap.diagnostics {
                        writeln!(out, "[{}] {}", msg.level, msg.text)?;
                    }
                }
                let status = shell.status();
                if let Some(e) = &status.persist_error {
                    writeln!(out, "storage: {}", e)?;
                }
                if let Some(e) = &status.render_error {
                    writeln!(out, "render: {}", e)?;
                }
                if let Some(e) = &status.clipboard_error {
                    writeln!(out, "clipboard: {}", e)?;
                }
            }
            other => writeln!(out, "unknown command '{}', try 'help'", other)?,
        }
    }
    Ok(())
}

fn make_clipboard(args: &Args) -> Box<dyn Clipboard> {
    #[cfg(feature = "system-clipboard")]
    {
        if !args.no_clipboard {
            return Box::new(codelab::SystemClipboard::new());
        }
    }
    log::debug!("using in-process clipboard (no_clipboard={})", args.no_clipboard);
    Box::new(MemoryClipboard::new())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let config = PlaygroundConfig::from_args(&args).context("invalid configuration")?;
    let store: Box<dyn Store> = if args.memory {
        Box::new(MemoryStore::with_key(config.storage_key.clone()))
    } else {
        log::info!("using storage file {}", config.store_path.display());
        Box::new(FileStore::new(
            config.store_path.clone(),
            config.storage_key.clone(),
        ))
    };
    let clipboard = make_clipboard(&args);

    let mut shell = EditorShell::new(config, store, clipboard);
    let stdin = io::stdin();
    let stdout = io::stdout();
    repl(&mut shell, &mut stdin.lock(), &mut stdout.lock())
}
