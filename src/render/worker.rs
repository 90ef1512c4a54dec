//! Page worker: one thread owning the JavaScript context of one loaded page.
//!
//! `boa_engine::Context` is not `Send`, so it lives on its own thread and the
//! render surface talks to it over a channel. Dropping the [`PageWorker`]
//! closes the channel and the thread exits after its current job. A job
//! that overran its timeout cannot be interrupted; [`PageWorker::into_handle`]
//! lets the owner track the thread until it finishes.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use boa_engine::native_function::{NativeFunction, NativeFunctionPointer};
use boa_engine::{js_string, Context, JsResult, JsString, JsValue, Source};

use super::dom;
use crate::{Error, Result};

/// Outcome of evaluating one source: its string value or the thrown error
pub type EvalResult = std::result::Result<String, String>;

struct PageJob {
    sources: Vec<String>,
    resp: Sender<Vec<EvalResult>>,
}

/// Runtime limits applied to the page context
#[derive(Debug, Clone, Copy)]
pub struct ScriptLimits {
    pub timeout_ms: u64,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
}

pub struct PageWorker {
    tx: Sender<PageJob>,
    handle: JoinHandle<()>,
    limits: ScriptLimits,
}

// Native helper backing `innerHTML` assignment: parses markup with the same
// HTML parser the host uses and returns the node list as JSON.
fn parse_fragment_native(
    _this: &JsValue,
    args: &[JsValue],
    ctx: &mut Context,
) -> JsResult<JsValue> {
    let markup = match args.first() {
        Some(v) => v.to_string(ctx)?.to_std_string_escaped(),
        None => String::new(),
    };
    let json = dom::fragment_json(&markup);
    Ok(JsValue::from(JsString::from(json.as_str())))
}

impl PageWorker {
    /// Spawn a fresh, empty page context.
    pub fn spawn(limits: ScriptLimits) -> Self {
        let (tx, rx) = mpsc::channel::<PageJob>();
        let handle = thread::spawn(move || {
            let mut ctx = Context::default();
            if limits.loop_iteration_limit > 0 {
                ctx.runtime_limits_mut()
                    .set_loop_iteration_limit(limits.loop_iteration_limit);
            }
            if limits.recursion_limit < usize::MAX {
                ctx.runtime_limits_mut()
                    .set_recursion_limit(limits.recursion_limit);
            }
            let nf = NativeFunction::from_fn_ptr(parse_fragment_native as NativeFunctionPointer);
            if let Err(e) = ctx.register_global_builtin_callable(
                js_string!("__codelab_parse_fragment"),
                1usize,
                nf,
            ) {
                log::warn!("failed to register fragment parser: {}", e);
            }

            while let Ok(job) = rx.recv() {
                let mut results = Vec::with_capacity(job.sources.len());
                for src in &job.sources {
                    let res = match ctx.eval(Source::from_bytes(src.as_bytes())) {
                        Ok(val) => val
                            .to_string(&mut ctx)
                            .map(|s| s.to_std_string_escaped())
                            .map_err(|e| e.to_string()),
                        Err(e) => Err(e.to_string()),
                    };
                    results.push(res);
                    ctx.run_jobs();
                }
                let _ = job.resp.send(results);
            }
            log::debug!("page worker exiting");
        });
        Self { tx, handle, limits }
    }

    /// Whether the worker thread is still alive
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Close the job channel and hand back the thread handle.
    pub fn into_handle(self) -> JoinHandle<()> {
        drop(self.tx);
        self.handle
    }

    /// Evaluate `sources` in order in the page context.
    ///
    /// A later source still runs when an earlier one throws; each result is
    /// reported separately.
    pub fn run(&self, sources: Vec<String>) -> Result<Vec<EvalResult>> {
        let (resp_tx, resp_rx) = mpsc::channel::<Vec<EvalResult>>();
        self.tx
            .send(PageJob {
                sources,
                resp: resp_tx,
            })
            .map_err(|e| Error::ScriptError(format!("failed to queue page job: {}", e)))?;
        match resp_rx.recv_timeout(Duration::from_millis(self.limits.timeout_ms)) {
            Ok(results) => Ok(results),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(self.limits.timeout_ms)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::ScriptError("page worker exited".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ScriptLimits {
        ScriptLimits {
            timeout_ms: 5000,
            loop_iteration_limit: 100_000,
            recursion_limit: 512,
        }
    }

    #[test]
    fn state_persists_between_jobs() {
        let w = PageWorker::spawn(limits());
        let first = w.run(vec!["var counter = 40;".into(), "counter + 1".into()]).unwrap();
        assert_eq!(first[1], Ok("41".to_string()));
        let second = w.run(vec!["counter += 2; String(counter)".into()]).unwrap();
        assert_eq!(second[0], Ok("42".to_string()));
    }

    #[test]
    fn errors_are_reported_per_source() {
        let w = PageWorker::spawn(limits());
        let res = w
            .run(vec![
                "throw new TypeError('boom')".into(),
                "1 +".into(),
                "'still running'".into(),
            ])
            .unwrap();
        assert!(res[0].as_ref().unwrap_err().contains("boom"));
        assert!(res[1].is_err());
        assert_eq!(res[2], Ok("still running".to_string()));
    }

    #[test]
    fn loop_limit_stops_runaway_script() {
        let w = PageWorker::spawn(ScriptLimits {
            loop_iteration_limit: 100,
            ..limits()
        });
        let res = w.run(vec!["var i = 0; while (true) { i++; }".into()]).unwrap();
        assert!(res[0].is_err());
    }

    #[test]
    fn idle_worker_exits_when_released() {
        let w = PageWorker::spawn(limits());
        w.run(vec!["1".into()]).unwrap();
        assert!(w.is_running());
        let handle = w.into_handle();
        handle.join().unwrap();
    }

    #[test]
    fn timed_out_job_keeps_thread_until_done() {
        let w = PageWorker::spawn(ScriptLimits {
            timeout_ms: 10,
            loop_iteration_limit: 0,
            ..limits()
        });
        let res = w.run(vec!["var n = 0; for (var i = 0; i < 3000000; i++) { n += i; }".into()]);
        assert!(matches!(res, Err(Error::Timeout(10))));
        assert!(w.is_running());
        let handle = w.into_handle();
        handle.join().unwrap();
    }

    #[test]
    fn fragment_parser_is_available() {
        let w = PageWorker::spawn(limits());
        let res = w
            .run(vec!["JSON.parse(__codelab_parse_fragment('<i>x</i>'))[1].tag".into()])
            .unwrap();
        assert_eq!(res[0], Ok("i".to_string()));
    }
}
