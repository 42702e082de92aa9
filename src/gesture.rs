//! Activation gestures - turns raw pointer input into start/stop signals
//!
//! Detects three gestures anywhere on the input surface:
//! - Toggle: explicit button press, starts or stops listening
//! - Hold: press and keep still for the hold duration
//! - Double-tap: two presses within the double-tap window
//!
//! A touch press suppresses mouse presses for a short window, since platforms
//! synthesize a mouse press for every physical tap.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Raw pointer input, touch and mouse streams kept apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    TouchStart,
    TouchEnd,
    TouchMove,
    MouseDown,
    MouseUp,
    MouseMove,
    Scroll,
    Cancel,
}

impl PointerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TouchStart => "touch-start",
            Self::TouchEnd => "touch-end",
            Self::TouchMove => "touch-move",
            Self::MouseDown => "mouse-down",
            Self::MouseUp => "mouse-up",
            Self::MouseMove => "mouse-move",
            Self::Scroll => "scroll",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for PointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointerEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "touch-start" => Ok(Self::TouchStart),
            "touch-end" => Ok(Self::TouchEnd),
            "touch-move" => Ok(Self::TouchMove),
            "mouse-down" => Ok(Self::MouseDown),
            "mouse-up" => Ok(Self::MouseUp),
            "mouse-move" => Ok(Self::MouseMove),
            "scroll" => Ok(Self::Scroll),
            "cancel" => Ok(Self::Cancel),
            other => Err(format!("unknown pointer event '{}'", other)),
        }
    }
}

/// What caused an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Toggle,
    Hold,
    DoubleTap,
}

/// Signal sent to the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureSignal {
    /// Start listening
    Activate(Trigger),
    /// Stop listening (only the toggle produces this)
    Deactivate,
}

/// Timing thresholds for gesture detection
#[derive(Debug, Clone, Copy)]
pub struct GestureTimings {
    /// Press duration that counts as a hold
    pub hold: Duration,
    /// Maximum gap between presses for a double-tap
    pub double_tap: Duration,
    /// How long a touch press hides mouse presses
    pub touch_suppress: Duration,
}

impl Default for GestureTimings {
    fn default() -> Self {
        Self {
            hold: Duration::from_millis(800),
            double_tap: Duration::from_millis(300),
            touch_suppress: Duration::from_millis(600),
        }
    }
}

/// Armed hold timer. The id ties a deadline to the press that armed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTimer {
    pub id: u64,
    pub deadline: Instant,
}

/// Gesture state machine
///
/// Owns the only hold timer. Every exit from a gesture cycle (release, move,
/// scroll, cancel, a new press, the timer firing) leaves `pending` empty.
#[derive(Debug)]
pub struct GestureController {
    timings: GestureTimings,
    pending: Option<HoldTimer>,
    last_press: Option<Instant>,
    suppress_mouse_until: Option<Instant>,
    next_timer_id: u64,
}

impl GestureController {
    pub fn new(timings: GestureTimings) -> Self {
        Self {
            timings,
            pending: None,
            last_press: None,
            suppress_mouse_until: None,
            next_timer_id: 1,
        }
    }

    /// Currently armed hold timer, if any
    pub fn pending_timer(&self) -> Option<HoldTimer> {
        self.pending
    }

    /// Feed one pointer event. `listening` is the current session state.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        now: Instant,
        listening: bool,
    ) -> Option<GestureSignal> {
        match event {
            PointerEvent::TouchStart => {
                self.suppress_mouse_until = Some(now + self.timings.touch_suppress);
                self.press(now, listening)
            }
            PointerEvent::MouseDown => {
                if self.suppress_mouse_until.is_some_and(|until| now < until) {
                    debug!("mouse press follows touch, ignored");
                    return None;
                }
                self.press(now, listening)
            }
            PointerEvent::TouchEnd
            | PointerEvent::TouchMove
            | PointerEvent::MouseUp
            | PointerEvent::MouseMove
            | PointerEvent::Scroll
            | PointerEvent::Cancel => {
                if self.pending.take().is_some() {
                    debug!(event = event.as_str(), "hold cancelled");
                }
                None
            }
        }
    }

    /// Explicit button press, available in every state
    pub fn toggle(&mut self, listening: bool) -> GestureSignal {
        self.pending = None;
        if listening {
            GestureSignal::Deactivate
        } else {
            GestureSignal::Activate(Trigger::Toggle)
        }
    }

    /// Timer callback. Ignores ids that no longer match the armed timer.
    pub fn fire(&mut self, id: u64, now: Instant, listening: bool) -> Option<GestureSignal> {
        match self.pending {
            Some(timer) if timer.id == id && now >= timer.deadline => {
                self.pending = None;
                if listening {
                    debug!("hold elapsed while listening, ignored");
                    None
                } else {
                    Some(GestureSignal::Activate(Trigger::Hold))
                }
            }
            _ => {
                debug!(id, "stale hold timer");
                None
            }
        }
    }

    /// Fire the armed timer if its deadline has passed
    pub fn poll(&mut self, now: Instant, listening: bool) -> Option<GestureSignal> {
        let timer = self.pending.filter(|t| now >= t.deadline)?;
        self.fire(timer.id, now, listening)
    }

    /// Drop all gesture state
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_press = None;
        self.suppress_mouse_until = None;
    }

    fn press(&mut self, now: Instant, listening: bool) -> Option<GestureSignal> {
        self.pending = None;
        if listening {
            return None;
        }

        if let Some(last) = self.last_press {
            if now.duration_since(last) < self.timings.double_tap {
                self.last_press = None;
                return Some(GestureSignal::Activate(Trigger::DoubleTap));
            }
        }
        self.last_press = Some(now);

        let timer = HoldTimer {
            id: self.next_timer_id,
            deadline: now + self.timings.hold,
        };
        self.next_timer_id += 1;
        self.pending = Some(timer);
        debug!(id = timer.id, "hold armed");
        None
    }
}

/// Something that can deliver pointer input while attached
pub trait InputSurface {
    fn attach(&mut self) -> std::io::Result<()>;
    fn detach(&mut self);
}

/// Attached input surface plus the controller fed from it
///
/// Dropping the subscription detaches the surface and clears the controller,
/// so a new subscription always starts from a neutral state.
pub struct InputSubscription<S: InputSurface> {
    surface: S,
    controller: GestureController,
}

impl<S: InputSurface> InputSubscription<S> {
    pub fn attach(mut surface: S, controller: GestureController) -> std::io::Result<Self> {
        surface.attach()?;
        debug!("input surface attached");
        Ok(Self {
            surface,
            controller,
        })
    }

    pub fn controller(&mut self) -> &mut GestureController {
        &mut self.controller
    }

    pub fn pending_timer(&self) -> Option<HoldTimer> {
        self.controller.pending_timer()
    }
}

impl<S: InputSurface> Drop for InputSubscription<S> {
    fn drop(&mut self) {
        self.controller.reset();
        self.surface.detach();
        debug!("input surface detached");
    }
}
