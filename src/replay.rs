//! Gesture script replay
//!
//! A script is one `<ms> <event>` per line, where `<ms>` is the offset from
//! the start of the replay and `<event>` a pointer event name or `toggle`.
//! Time is simulated, so a replay runs instantly and gives the same result
//! every time.

use crate::app::Controller;
use crate::dispatch::Dispatcher;
use crate::gesture::{GestureController, GestureTimings, PointerEvent};
use crate::recognizer::{NO_SPEECH, RecognizerEvent, ScriptedRecognizer};
use crate::session::SessionManager;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Pointer(PointerEvent),
    Toggle,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Pointer(event) => write!(f, "{}", event),
            Step::Toggle => write!(f, "toggle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLine {
    pub at: Duration,
    pub step: Step,
}

pub fn parse(text: &str) -> Result<Vec<ScriptLine>, ScriptError> {
    let mut lines = Vec::new();
    let mut last = Duration::ZERO;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let err = |message: String| ScriptError { line, message };

        let mut parts = content.split_whitespace();
        let (Some(ms), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(err(format!("expected `<ms> <event>`, got `{}`", content)));
        };
        let ms: u64 = ms
            .parse()
            .map_err(|_| err(format!("invalid time `{}`", ms)))?;
        let at = Duration::from_millis(ms);
        if at < last {
            return Err(err(format!("time {}ms goes backwards", ms)));
        }
        last = at;

        let step = if name == "toggle" {
            Step::Toggle
        } else {
            Step::Pointer(name.parse().map_err(err)?)
        };
        lines.push(ScriptLine { at, step });
    }
    Ok(lines)
}

/// Replay `script` against a fresh controller. Every session hears `say`,
/// or reports no speech when `say` is `None`.
pub fn run(
    script: &[ScriptLine],
    say: Option<&str>,
    timings: GestureTimings,
    dispatcher: Dispatcher,
) {
    let (tx, rx) = flume::unbounded::<RecognizerEvent>();
    let recognizer = match say {
        Some(text) => ScriptedRecognizer::hearing(tx, text),
        None => ScriptedRecognizer::failing(tx, NO_SPEECH),
    };
    let mut app = Controller::new(SessionManager::new(Box::new(recognizer)), dispatcher);
    let mut gestures = GestureController::new(timings);
    let base = Instant::now();

    let mut listening = false;
    let mut settle = |app: &mut Controller, at: Duration| {
        for event in rx.try_iter() {
            app.on_recognizer(event);
        }
        if app.is_listening() != listening {
            listening = app.is_listening();
            println!("{:>7}  -> {}", fmt_ms(at), app.button().label());
        }
    };

    for line in script {
        let now = base + line.at;
        app.on_tick(&mut gestures, now);
        settle(&mut app, line.at);

        println!("{:>7}  {}", fmt_ms(line.at), line.step);
        match line.step {
            Step::Pointer(event) => app.on_pointer(&mut gestures, event, now),
            Step::Toggle => app.on_toggle(&mut gestures),
        }
        settle(&mut app, line.at);
    }

    // Let a hold still armed at the end of the script run out
    if let Some(timer) = gestures.pending_timer() {
        let at = timer.deadline.duration_since(base);
        app.on_tick(&mut gestures, timer.deadline);
        settle(&mut app, at);
    }
}

fn fmt_ms(d: Duration) -> String {
    format!("{}ms", d.as_millis())
}
