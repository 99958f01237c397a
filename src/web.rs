//! Browser host: Web Audio output, `window` timers and the `BeatDrill`
//! class exported to JavaScript.
//!
//! The page owns exactly one drill session, kept in a thread-local. Timer
//! and promise callbacks re-enter it through [`with_session`], which also
//! forwards queued notifications to the registered JS listener once the
//! session borrow is released.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{AudioContext, AudioContextState};

use crate::arith::Problem;
use crate::backend::{AudioBackend, OutputState, ResumeOutcome};
use crate::error::AudioError;
use crate::session::DrillSession;
use crate::timer::{TimerHandle, TimerHost, TimerKind};

type WebSession = DrillSession<WebAudioBackend, WebTimers>;

struct PageDrill {
    session: WebSession,
    listener: Option<js_sys::Function>,
}

/// Settlement handlers for `AudioContext.resume()`, created once and reused
/// for every request.
struct ResumeHandlers {
    on_ok: Closure<dyn FnMut(JsValue)>,
    on_err: Closure<dyn FnMut(JsValue)>,
}

impl ResumeHandlers {
    fn new() -> Self {
        let settle = |ok: bool| {
            Closure::wrap(Box::new(move |_: JsValue| report_resumed(ok)) as Box<dyn FnMut(JsValue)>)
        };
        ResumeHandlers {
            on_ok: settle(true),
            on_err: settle(false),
        }
    }
}

thread_local! {
    static AUDIO_CONTEXT: RefCell<Option<AudioContext>> = const { RefCell::new(None) };
    static DRILL: RefCell<Option<PageDrill>> = const { RefCell::new(None) };
    static RESUME_HANDLERS: ResumeHandlers = ResumeHandlers::new();
    static RESUME_IN_FLIGHT: Cell<bool> = const { Cell::new(false) };
}

fn js_err(context: &str, err: JsValue) -> String {
    format!("{context}: {}", err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// The process-wide context, created on first use.
fn audio_context() -> Result<AudioContext, AudioError> {
    AUDIO_CONTEXT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(ctx) = slot.as_ref() {
            return Ok(ctx.clone());
        }
        let ctx = AudioContext::new()
            .map_err(|e| AudioError::Unavailable(js_err("AudioContext", e)))?;
        *slot = Some(ctx.clone());
        Ok(ctx)
    })
}

/// Web Audio output. Each hit becomes a one-shot `AudioBufferSourceNode`
/// started at its scheduled context time.
#[derive(Debug, Default)]
pub struct WebAudioBackend;

impl AudioBackend for WebAudioBackend {
    fn state(&self) -> OutputState {
        match audio_context() {
            Ok(ctx) => match ctx.state() {
                AudioContextState::Running => OutputState::Running,
                AudioContextState::Closed => OutputState::Closed,
                _ => OutputState::Suspended,
            },
            Err(_) => OutputState::Closed,
        }
    }

    fn current_time(&self) -> f64 {
        audio_context().map(|ctx| ctx.current_time()).unwrap_or(0.0)
    }

    fn sample_rate(&self) -> f64 {
        audio_context()
            .map(|ctx| ctx.sample_rate() as f64)
            .unwrap_or(44100.0)
    }

    fn resume(&mut self) -> ResumeOutcome {
        if RESUME_IN_FLIGHT.with(Cell::get) {
            return ResumeOutcome::Pending;
        }
        let ctx = match audio_context() {
            Ok(ctx) => ctx,
            Err(err) => return ResumeOutcome::Failed(err),
        };
        let promise = match ctx.resume() {
            Ok(p) => p,
            Err(e) => return ResumeOutcome::Failed(AudioError::Blocked(js_err("resume", e))),
        };
        RESUME_HANDLERS.with(|h| {
            let _ = promise.then2(&h.on_ok, &h.on_err);
        });
        RESUME_IN_FLIGHT.with(|f| f.set(true));
        ResumeOutcome::Pending
    }

    fn play(&mut self, samples: &[f32], at: f64) -> Result<(), AudioError> {
        if samples.is_empty() {
            return Ok(());
        }
        let ctx = audio_context()?;
        let schedule = |context: &str, e: JsValue| AudioError::Schedule(js_err(context, e));
        let buffer = ctx
            .create_buffer(1, samples.len() as u32, ctx.sample_rate())
            .map_err(|e| schedule("createBuffer", e))?;
        buffer
            .copy_to_channel(samples, 0)
            .map_err(|e| schedule("copyToChannel", e))?;
        let source = ctx
            .create_buffer_source()
            .map_err(|e| schedule("createBufferSource", e))?;
        source.set_buffer(Some(&buffer));
        source
            .connect_with_audio_node(&ctx.destination())
            .map_err(|e| schedule("connect", e))?;
        source
            .start_with_when(at)
            .map_err(|e| schedule("start", e))?;
        Ok(())
    }
}

/// `window.setInterval` / `setTimeout`. Each callback is owned here until
/// its timer is cleared or, for a timeout, has fired. Fired timeouts are
/// released on the next call, never from inside their own callback.
#[derive(Default)]
pub struct WebTimers {
    intervals: HashMap<i32, Closure<dyn FnMut()>>,
    timeouts: HashMap<i32, Closure<dyn FnMut()>>,
    fired: Rc<RefCell<Vec<i32>>>,
}

impl WebTimers {
    /// Callbacks currently held for armed or fired-but-unreleased timers.
    pub fn live_callbacks(&self) -> usize {
        self.intervals.len() + self.timeouts.len()
    }

    fn release_fired(&mut self) {
        for id in self.fired.borrow_mut().drain(..) {
            self.timeouts.remove(&id);
        }
    }
}

fn window() -> Result<web_sys::Window, AudioError> {
    web_sys::window().ok_or_else(|| AudioError::Timer("no window".into()))
}

impl TimerHost for WebTimers {
    fn set_interval(&mut self, kind: TimerKind, period_ms: f64) -> Result<TimerHandle, AudioError> {
        let callback = Closure::wrap(Box::new(move || dispatch_timer(kind)) as Box<dyn FnMut()>);
        let id = window()?
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                period_ms.round() as i32,
            )
            .map_err(|e| AudioError::Timer(js_err("setInterval", e)))?;
        self.intervals.insert(id, callback);
        Ok(TimerHandle(id))
    }

    fn set_timeout(&mut self, kind: TimerKind, delay_ms: f64) -> Result<TimerHandle, AudioError> {
        self.release_fired();
        let own_id = Rc::new(Cell::new(0));
        let callback = {
            let own_id = Rc::clone(&own_id);
            let fired = Rc::clone(&self.fired);
            Closure::wrap(Box::new(move || {
                dispatch_timer(kind);
                fired.borrow_mut().push(own_id.get());
            }) as Box<dyn FnMut()>)
        };
        let id = window()?
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                delay_ms.round() as i32,
            )
            .map_err(|e| AudioError::Timer(js_err("setTimeout", e)))?;
        own_id.set(id);
        self.timeouts.insert(id, callback);
        Ok(TimerHandle(id))
    }

    fn clear(&mut self, handle: TimerHandle) {
        self.release_fired();
        let Ok(win) = window() else { return };
        if self.intervals.remove(&handle.0).is_some() {
            win.clear_interval_with_handle(handle.0);
        } else if self.timeouts.remove(&handle.0).is_some() {
            win.clear_timeout_with_handle(handle.0);
        }
    }
}

/// Run `f` on the page session, then deliver its queued notifications.
fn with_session<R>(f: impl FnOnce(&mut WebSession) -> R) -> Result<R, JsValue> {
    let (result, notes, listener) = DRILL.with(|slot| {
        let mut slot = slot.borrow_mut();
        let drill = slot
            .as_mut()
            .ok_or_else(|| JsValue::from_str("BeatDrill is not initialised"))?;
        let result = f(&mut drill.session);
        Ok::<_, JsValue>((
            result,
            drill.session.drain_notifications(),
            drill.listener.clone(),
        ))
    })?;
    if let Some(listener) = listener {
        for note in notes {
            match serde_wasm_bindgen::to_value(&note) {
                Ok(value) => {
                    if let Err(e) = listener.call1(&JsValue::NULL, &value) {
                        tracing::warn!(error = ?e, "notification listener threw");
                    }
                }
                Err(e) => tracing::warn!(%e, "cannot serialise notification"),
            }
        }
    }
    Ok(result)
}

fn dispatch_timer(kind: TimerKind) {
    let _ = with_session(|s| s.on_timer(kind));
}

fn report_resumed(ok: bool) {
    RESUME_IN_FLIGHT.with(|f| f.set(false));
    let _ = with_session(|s| s.on_backend_resumed(ok));
}

#[derive(serde::Serialize)]
struct ProblemView<'a> {
    #[serde(flatten)]
    problem: &'a Problem,
    prompt: String,
}

/// The drill as seen from JavaScript. Constructing a new one replaces the
/// page's previous session.
#[wasm_bindgen]
pub struct BeatDrill {
    _private: (),
}

#[wasm_bindgen]
impl BeatDrill {
    #[wasm_bindgen(constructor)]
    pub fn new() -> BeatDrill {
        let session = DrillSession::new(WebAudioBackend, WebTimers::default());
        let previous = DRILL.with(|slot| {
            slot.borrow_mut().replace(PageDrill {
                session,
                listener: None,
            })
        });
        if let Some(mut old) = previous {
            old.session.stop_beat();
        }
        BeatDrill { _private: () }
    }

    /// Register `callback({type, payload})` for stage-clear, bgm-switch,
    /// wrong and pulse notifications.
    #[wasm_bindgen(js_name = setListener)]
    pub fn set_listener(&self, callback: js_sys::Function) {
        DRILL.with(|slot| {
            if let Some(drill) = slot.borrow_mut().as_mut() {
                drill.listener = Some(callback);
            }
        });
    }

    pub fn problem(&self) -> Result<JsValue, JsValue> {
        with_session(|s| {
            let view = ProblemView {
                problem: s.problem(),
                prompt: s.problem().prompt(),
            };
            serde_wasm_bindgen::to_value(&view)
        })?
        .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    pub fn stats(&self) -> Result<JsValue, JsValue> {
        with_session(|s| serde_wasm_bindgen::to_value(&s.stats()))?
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    /// Judge an answer typed by the player. Rejects empty or non-numeric
    /// input without touching any state.
    #[wasm_bindgen(js_name = submitAnswer)]
    pub fn submit_answer(&self, input: &str) -> Result<bool, JsValue> {
        with_session(|s| s.submit_answer(input))?.map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    #[wasm_bindgen(js_name = onCorrectAnswer)]
    pub fn on_correct_answer(&self) -> Result<(), JsValue> {
        with_session(|s| s.on_correct_answer())
    }

    #[wasm_bindgen(js_name = onWrongAnswer)]
    pub fn on_wrong_answer(&self) -> Result<(), JsValue> {
        with_session(|s| s.on_wrong_answer())
    }

    #[wasm_bindgen(js_name = onUserRequestsReset)]
    pub fn on_user_requests_reset(&self) -> Result<(), JsValue> {
        with_session(|s| s.on_user_requests_reset())
    }

    #[wasm_bindgen(js_name = onToggleBeat)]
    pub fn on_toggle_beat(&self) -> Result<bool, JsValue> {
        with_session(|s| s.on_toggle_beat())
    }

    #[wasm_bindgen(js_name = onToggleSfx)]
    pub fn on_toggle_sfx(&self) -> Result<bool, JsValue> {
        with_session(|s| s.on_toggle_sfx())
    }
}

impl Default for BeatDrill {
    fn default() -> Self {
        Self::new()
    }
}
