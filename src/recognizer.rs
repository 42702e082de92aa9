//! Speech recognition engines
//!
//! Engines are started and stopped by the session manager and report back
//! through a channel of `RecognizerEvent`s. One final transcript per session,
//! no interim results.

use flume::Sender;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Error code reported when microphone access is refused
pub const NOT_ALLOWED: &str = "not-allowed";
/// Error code reported when nothing usable was heard
pub const NO_SPEECH: &str = "no-speech";

/// Lifecycle notifications from an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    Started,
    Result(String),
    Error(String),
    Ended,
}

pub trait SpeechRecognizer {
    fn start(&mut self);
    fn stop(&mut self);
}

fn send(tx: &Sender<RecognizerEvent>, event: RecognizerEvent) {
    if tx.send(event).is_err() {
        warn!("recognizer event dropped, receiver closed");
    }
}

#[derive(Debug, Default)]
struct Capture {
    active: bool,
    text: String,
}

/// Treats typed text as the spoken utterance
///
/// Terminals have no portable microphone API, so while a session is open the
/// keyboard stands in for the microphone. Keystrokes arrive through the
/// paired `KeyboardMic`.
pub struct KeyboardRecognizer {
    capture: Rc<RefCell<Capture>>,
    tx: Sender<RecognizerEvent>,
    lang: String,
    deny_microphone: bool,
}

/// Keystroke side of a `KeyboardRecognizer`
#[derive(Clone)]
pub struct KeyboardMic {
    capture: Rc<RefCell<Capture>>,
    tx: Sender<RecognizerEvent>,
}

impl KeyboardRecognizer {
    /// `lang` is the language tag of the expected utterances
    pub fn new(
        tx: Sender<RecognizerEvent>,
        lang: &str,
        deny_microphone: bool,
    ) -> (Self, KeyboardMic) {
        let capture = Rc::new(RefCell::new(Capture::default()));
        let mic = KeyboardMic {
            capture: Rc::clone(&capture),
            tx: tx.clone(),
        };
        (
            Self {
                capture,
                tx,
                lang: lang.to_string(),
                deny_microphone,
            },
            mic,
        )
    }
}

impl SpeechRecognizer for KeyboardRecognizer {
    fn start(&mut self) {
        if self.deny_microphone {
            send(&self.tx, RecognizerEvent::Error(NOT_ALLOWED.to_string()));
            send(&self.tx, RecognizerEvent::Ended);
            return;
        }
        let mut capture = self.capture.borrow_mut();
        capture.active = true;
        capture.text.clear();
        debug!(lang = %self.lang, "keyboard capture started");
        send(&self.tx, RecognizerEvent::Started);
    }

    fn stop(&mut self) {
        let mut capture = self.capture.borrow_mut();
        if !capture.active {
            return;
        }
        capture.active = false;
        let text = capture.text.trim().to_string();
        if !text.is_empty() {
            send(&self.tx, RecognizerEvent::Result(text));
        }
        send(&self.tx, RecognizerEvent::Ended);
    }
}

impl KeyboardMic {
    pub fn is_capturing(&self) -> bool {
        self.capture.borrow().active
    }

    /// Text heard so far in the open session
    pub fn text(&self) -> String {
        self.capture.borrow().text.clone()
    }

    pub fn push(&self, c: char) {
        let mut capture = self.capture.borrow_mut();
        if capture.active {
            capture.text.push(c);
        }
    }

    pub fn backspace(&self) {
        let mut capture = self.capture.borrow_mut();
        if capture.active {
            capture.text.pop();
        }
    }

    /// End of utterance
    pub fn submit(&self) {
        let mut capture = self.capture.borrow_mut();
        if !capture.active {
            return;
        }
        capture.active = false;
        let text = capture.text.trim().to_string();
        if text.is_empty() {
            send(&self.tx, RecognizerEvent::Error(NO_SPEECH.to_string()));
        } else {
            send(&self.tx, RecognizerEvent::Result(text));
        }
        send(&self.tx, RecognizerEvent::Ended);
    }

    /// Abandon the utterance
    pub fn cancel(&self) {
        let mut capture = self.capture.borrow_mut();
        if !capture.active {
            return;
        }
        capture.active = false;
        capture.text.clear();
        send(&self.tx, RecognizerEvent::Error(NO_SPEECH.to_string()));
        send(&self.tx, RecognizerEvent::Ended);
    }
}

/// Answers every start with the same outcome. Drives replays.
pub struct ScriptedRecognizer {
    tx: Sender<RecognizerEvent>,
    outcome: Result<String, String>,
    open: bool,
}

impl ScriptedRecognizer {
    /// Hear `transcript` on every session
    pub fn hearing(tx: Sender<RecognizerEvent>, transcript: &str) -> Self {
        Self {
            tx,
            outcome: Ok(transcript.to_string()),
            open: false,
        }
    }

    /// Fail every session with `code`
    pub fn failing(tx: Sender<RecognizerEvent>, code: &str) -> Self {
        Self {
            tx,
            outcome: Err(code.to_string()),
            open: false,
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(&mut self) {
        self.open = true;
        send(&self.tx, RecognizerEvent::Started);
        let event = match &self.outcome {
            Ok(text) => RecognizerEvent::Result(text.clone()),
            Err(code) => RecognizerEvent::Error(code.clone()),
        };
        send(&self.tx, event);
        send(&self.tx, RecognizerEvent::Ended);
        self.open = false;
    }

    fn stop(&mut self) {
        if !self.open {
            debug!("scripted session already closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &flume::Receiver<RecognizerEvent>) -> Vec<RecognizerEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_keyboard_submit() {
        let (tx, rx) = flume::unbounded();
        let (mut rec, mic) = KeyboardRecognizer::new(tx, "en-US", false);
        rec.start();
        assert!(mic.is_capturing());
        for c in "go homx".chars() {
            mic.push(c);
        }
        mic.backspace();
        mic.push('e');
        assert_eq!(mic.text(), "go home");
        mic.submit();
        assert!(!mic.is_capturing());
        assert_eq!(
            drain(&rx),
            vec![
                RecognizerEvent::Started,
                RecognizerEvent::Result("go home".to_string()),
                RecognizerEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_keyboard_empty_submit_is_no_speech() {
        let (tx, rx) = flume::unbounded();
        let (mut rec, mic) = KeyboardRecognizer::new(tx, "en-US", false);
        rec.start();
        mic.push(' ');
        mic.submit();
        assert_eq!(
            drain(&rx),
            vec![
                RecognizerEvent::Started,
                RecognizerEvent::Error(NO_SPEECH.to_string()),
                RecognizerEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_keyboard_stop_yields_trailing_result() {
        let (tx, rx) = flume::unbounded();
        let (mut rec, mic) = KeyboardRecognizer::new(tx, "en-US", false);
        rec.start();
        mic.push('h');
        mic.push('i');
        rec.stop();
        assert_eq!(
            drain(&rx),
            vec![
                RecognizerEvent::Started,
                RecognizerEvent::Result("hi".to_string()),
                RecognizerEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_keyboard_stop_without_speech() {
        let (tx, rx) = flume::unbounded();
        let (mut rec, _mic) = KeyboardRecognizer::new(tx, "en-US", false);
        rec.start();
        rec.stop();
        rec.stop();
        assert_eq!(
            drain(&rx),
            vec![RecognizerEvent::Started, RecognizerEvent::Ended]
        );
    }

    #[test]
    fn test_keyboard_denied_microphone() {
        let (tx, rx) = flume::unbounded();
        let (mut rec, mic) = KeyboardRecognizer::new(tx, "en-US", true);
        rec.start();
        assert!(!mic.is_capturing());
        assert_eq!(
            drain(&rx),
            vec![
                RecognizerEvent::Error(NOT_ALLOWED.to_string()),
                RecognizerEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_keys_ignored_when_not_capturing() {
        let (tx, rx) = flume::unbounded();
        let (_rec, mic) = KeyboardRecognizer::new(tx, "en-US", false);
        mic.push('x');
        mic.submit();
        mic.cancel();
        assert_eq!(mic.text(), "");
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_keyboard_keeps_language() {
        let (tx, _rx) = flume::unbounded();
        let (rec, _mic) = KeyboardRecognizer::new(tx, "de-DE", false);
        assert_eq!(rec.lang, "de-DE");
    }

    #[test]
    fn test_scripted() {
        let (tx, rx) = flume::unbounded();
        let mut rec = ScriptedRecognizer::failing(tx, NOT_ALLOWED);
        rec.start();
        assert_eq!(
            drain(&rx),
            vec![
                RecognizerEvent::Started,
                RecognizerEvent::Error(NOT_ALLOWED.to_string()),
                RecognizerEvent::Ended,
            ]
        );
    }
}
