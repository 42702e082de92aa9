//! Voice navigation controller
//!
//! Single owner of the session and dispatcher. Front ends feed it pointer
//! input, toggle presses, timer expiries and recognizer events, one at a time.

use crate::command::classify;
use crate::dispatch::Dispatcher;
use crate::gesture::{GestureController, GestureSignal, PointerEvent, Trigger};
use crate::recognizer::RecognizerEvent;
use crate::session::{SessionEvent, SessionManager, SessionState};
use std::time::Instant;
use tracing::{debug, info};

/// Visible state of the activation button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Listening,
}

impl ButtonState {
    /// Accessible label for the button
    pub fn label(&self) -> &'static str {
        match self {
            ButtonState::Idle => "Start voice command",
            ButtonState::Listening => "Stop listening",
        }
    }
}

pub struct Controller {
    session: SessionManager,
    dispatcher: Dispatcher,
}

impl Controller {
    pub fn new(session: SessionManager, dispatcher: Dispatcher) -> Self {
        Self {
            session,
            dispatcher,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_listening()
    }

    pub fn button(&self) -> ButtonState {
        match self.session.state() {
            SessionState::Idle => ButtonState::Idle,
            SessionState::Listening => ButtonState::Listening,
        }
    }

    pub fn on_pointer(
        &mut self,
        gestures: &mut GestureController,
        event: PointerEvent,
        now: Instant,
    ) {
        if let Some(signal) = gestures.handle(event, now, self.is_listening()) {
            self.apply(signal);
        }
    }

    pub fn on_toggle(&mut self, gestures: &mut GestureController) {
        let signal = gestures.toggle(self.is_listening());
        self.apply(signal);
    }

    /// Hold timer expiry scheduled by the event loop
    pub fn on_hold_timer(&mut self, gestures: &mut GestureController, id: u64, now: Instant) {
        if let Some(signal) = gestures.fire(id, now, self.is_listening()) {
            self.apply(signal);
        }
    }

    /// Fire an overdue hold timer, for loops that step time themselves
    pub fn on_tick(&mut self, gestures: &mut GestureController, now: Instant) {
        if let Some(signal) = gestures.poll(now, self.is_listening()) {
            self.apply(signal);
        }
    }

    pub fn on_recognizer(&mut self, event: RecognizerEvent) {
        let events = self.session.handle(event);
        self.emit(events);
    }

    pub fn apply(&mut self, signal: GestureSignal) {
        let events = match signal {
            // Only the explicit button reports a missing recognizer
            GestureSignal::Activate(Trigger::Hold | Trigger::DoubleTap)
                if !self.session.is_supported() =>
            {
                debug!(?signal, "no recognizer, gesture ignored");
                return;
            }
            GestureSignal::Activate(trigger) => {
                info!(?trigger, "activation");
                self.session.start()
            }
            GestureSignal::Deactivate => {
                info!("deactivation");
                self.session.stop()
            }
        };
        self.emit(events);
    }

    fn emit(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            debug!(?event, "session event");
            match event {
                SessionEvent::ListeningStarted => self.dispatcher.listening_started(),
                SessionEvent::ListeningEnded => self.dispatcher.listening_ended(),
                SessionEvent::Transcript(text) => {
                    info!(transcript = %text, "voice command");
                    let command = classify(&text);
                    self.dispatcher.execute(&command);
                }
                SessionEvent::Failed(error) => self.dispatcher.report(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NoticeLevel;
    use crate::dispatch::testing::{Effect, Recorder};
    use crate::gesture::GestureTimings;
    use crate::recognizer::{KeyboardMic, KeyboardRecognizer, NOT_ALLOWED, ScriptedRecognizer};
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    struct Harness {
        app: Controller,
        gestures: GestureController,
        rec: Recorder,
        rx: flume::Receiver<RecognizerEvent>,
        mic: KeyboardMic,
    }

    impl Harness {
        fn keyboard() -> Self {
            let (tx, rx) = flume::unbounded();
            let (recognizer, mic) = KeyboardRecognizer::new(tx, "en-US", false);
            let rec = Recorder::default();
            let session = SessionManager::new(Box::new(recognizer));
            let app = Controller::new(session, rec.dispatcher());
            Self {
                app,
                gestures: GestureController::new(GestureTimings::default()),
                rec,
                rx,
                mic,
            }
        }

        fn pump(&mut self) {
            let events: Vec<_> = self.rx.try_iter().collect();
            for event in events {
                self.app.on_recognizer(event);
            }
        }

        fn say(&mut self, text: &str) {
            for c in text.chars() {
                self.mic.push(c);
            }
            self.mic.submit();
            self.pump();
        }
    }

    #[test]
    fn test_toggle_speak_navigate() {
        let mut h = Harness::keyboard();
        h.app.on_toggle(&mut h.gestures);
        h.pump();
        assert_eq!(h.app.button(), ButtonState::Listening);
        assert_eq!(h.app.button().label(), "Stop listening");
        h.say("Show me furniture donations");
        assert_eq!(h.app.button(), ButtonState::Idle);
        assert_eq!(
            h.rec.effects(),
            vec![
                Effect::StartSound,
                Effect::Notify(NoticeLevel::Info, "Listening...".to_string()),
                Effect::StopSound,
                Effect::Navigate("/feed?tab=donations&category=furniture".to_string()),
                Effect::Notify(
                    NoticeLevel::Success,
                    "Showing donations for furniture".to_string()
                ),
                Effect::Speak("Showing donations for furniture".to_string()),
            ]
        );
    }

    #[test]
    fn test_hold_starts_session() {
        let mut h = Harness::keyboard();
        let t0 = Instant::now();
        h.app.on_pointer(&mut h.gestures, PointerEvent::MouseDown, t0);
        let timer = h.gestures.pending_timer().unwrap();
        h.app.on_hold_timer(&mut h.gestures, timer.id, timer.deadline);
        assert!(h.app.is_listening());
        assert_eq!(h.rec.count(&Effect::StartSound), 1);
    }

    #[test]
    fn test_gestures_cannot_stop_listening() {
        let mut h = Harness::keyboard();
        let t0 = Instant::now();
        h.app.on_toggle(&mut h.gestures);
        h.app.on_pointer(&mut h.gestures, PointerEvent::MouseDown, t0);
        h.app.on_pointer(&mut h.gestures, PointerEvent::MouseDown, t0 + ms(100));
        h.app.on_tick(&mut h.gestures, t0 + ms(1000));
        assert!(h.app.is_listening());
        assert_eq!(h.rec.count(&Effect::StartSound), 1);
    }

    #[test]
    fn test_double_tap_then_toggle_off() {
        let mut h = Harness::keyboard();
        let t0 = Instant::now();
        h.app.on_pointer(&mut h.gestures, PointerEvent::TouchStart, t0);
        h.app.on_pointer(&mut h.gestures, PointerEvent::TouchEnd, t0 + ms(40));
        h.app.on_pointer(&mut h.gestures, PointerEvent::TouchStart, t0 + ms(150));
        assert!(h.app.is_listening());
        h.pump();

        h.mic.push('i');
        h.mic.push('n');
        h.mic.push('b');
        h.mic.push('o');
        h.mic.push('x');
        h.app.on_toggle(&mut h.gestures);
        assert!(!h.app.is_listening());
        h.pump();
        assert!(h.rec.effects().contains(&Effect::Navigate("/messages".to_string())));
        assert_eq!(h.rec.count(&Effect::StartSound), 1);
        assert_eq!(h.rec.count(&Effect::StopSound), 1);
    }

    #[test]
    fn test_no_speech_reports_no_match() {
        let mut h = Harness::keyboard();
        h.app.on_toggle(&mut h.gestures);
        h.mic.cancel();
        h.pump();
        let effects = h.rec.effects();
        assert!(effects.contains(&Effect::Notify(
            NoticeLevel::Error,
            "Could not understand.".to_string()
        )));
        assert!(effects.contains(&Effect::Speak("Could not understand.".to_string())));
        assert_eq!(h.rec.count(&Effect::StopSound), 1);
        // Errors do not disable later activations
        h.app.on_toggle(&mut h.gestures);
        assert!(h.app.is_listening());
    }

    #[test]
    fn test_permission_denied() {
        let (tx, rx) = flume::unbounded();
        let rec = Recorder::default();
        let recognizer = ScriptedRecognizer::failing(tx, NOT_ALLOWED);
        let mut app = Controller::new(SessionManager::new(Box::new(recognizer)), rec.dispatcher());
        let mut gestures = GestureController::new(GestureTimings::default());
        app.on_toggle(&mut gestures);
        for event in rx.try_iter() {
            app.on_recognizer(event);
        }
        assert_eq!(
            rec.effects(),
            vec![
                Effect::StartSound,
                Effect::Notify(NoticeLevel::Info, "Listening...".to_string()),
                Effect::StopSound,
                Effect::Notify(NoticeLevel::Error, "Microphone access denied.".to_string()),
                Effect::Speak("Microphone access denied.".to_string()),
            ]
        );
    }

    #[test]
    fn test_unsupported_platform() {
        let rec = Recorder::default();
        let mut app = Controller::new(SessionManager::unsupported(), rec.dispatcher());
        let mut gestures = GestureController::new(GestureTimings::default());
        app.on_toggle(&mut gestures);
        assert!(!app.is_listening());
        assert_eq!(
            rec.effects(),
            vec![Effect::Notify(
                NoticeLevel::Error,
                "Voice commands not supported on this platform.".to_string()
            )]
        );
    }

    #[test]
    fn test_unsupported_ignores_gestures_but_not_toggle() {
        let rec = Recorder::default();
        let mut app = Controller::new(SessionManager::unsupported(), rec.dispatcher());
        let mut gestures = GestureController::new(GestureTimings::default());
        let t0 = Instant::now();
        app.on_pointer(&mut gestures, PointerEvent::MouseDown, t0);
        app.on_pointer(&mut gestures, PointerEvent::MouseUp, t0 + ms(50));
        app.on_pointer(&mut gestures, PointerEvent::MouseDown, t0 + ms(150));
        app.on_pointer(&mut gestures, PointerEvent::MouseDown, t0 + ms(1000));
        app.on_tick(&mut gestures, t0 + ms(2000));
        assert!(rec.effects().is_empty());

        app.on_toggle(&mut gestures);
        assert_eq!(
            rec.effects(),
            vec![Effect::Notify(
                NoticeLevel::Error,
                "Voice commands not supported on this platform.".to_string()
            )]
        );
    }

    #[test]
    fn test_start_while_listening_has_no_effect() {
        let mut h = Harness::keyboard();
        h.app.apply(GestureSignal::Activate(crate::gesture::Trigger::Hold));
        h.app.apply(GestureSignal::Activate(crate::gesture::Trigger::DoubleTap));
        h.pump();
        assert_eq!(h.rec.count(&Effect::StartSound), 1);
        assert_eq!(
            h.rec.count(&Effect::Notify(NoticeLevel::Info, "Listening...".to_string())),
            1
        );
    }
}
