//! Session manager - one speech recognition session at a time

use crate::recognizer::{NOT_ALLOWED, RecognizerEvent, SpeechRecognizer};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
}

/// Why a session produced no transcript
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("Voice commands not supported on this platform.")]
    Unsupported,

    #[error("Microphone access denied.")]
    PermissionDenied,

    #[error("Could not understand.")]
    NoMatch,
}

impl SessionError {
    /// Map an engine error code to the user-facing error
    pub fn from_code(code: &str) -> Self {
        if code == NOT_ALLOWED {
            SessionError::PermissionDenied
        } else {
            SessionError::NoMatch
        }
    }

    /// Unsupported is only shown, everything else is also spoken
    pub fn is_spoken(&self) -> bool {
        !matches!(self, SessionError::Unsupported)
    }
}

/// Observable outcome of a session step, in delivery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ListeningStarted,
    ListeningEnded,
    Transcript(String),
    Failed(SessionError),
}

/// Bookkeeping for the session the engine still considers open
#[derive(Debug, Default)]
struct OpenSession {
    terminal_sent: bool,
    ended_sent: bool,
    stopping: bool,
}

pub struct SessionManager {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    state: SessionState,
    open: Option<OpenSession>,
}

impl SessionManager {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>) -> Self {
        Self {
            recognizer: Some(recognizer),
            state: SessionState::Idle,
            open: None,
        }
    }

    /// Manager for a platform without speech recognition
    pub fn unsupported() -> Self {
        warn!("speech recognition not available");
        Self {
            recognizer: None,
            state: SessionState::Idle,
            open: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == SessionState::Listening
    }

    pub fn start(&mut self) -> Vec<SessionEvent> {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return vec![SessionEvent::Failed(SessionError::Unsupported)];
        };
        if self.state == SessionState::Listening {
            debug!("start ignored, already listening");
            return Vec::new();
        }
        if self.open.is_some() {
            debug!("start ignored, previous session still closing");
            return Vec::new();
        }

        self.state = SessionState::Listening;
        self.open = Some(OpenSession::default());
        info!("listening");
        recognizer.start();
        vec![SessionEvent::ListeningStarted]
    }

    /// Stop listening. The engine may still deliver one trailing transcript.
    pub fn stop(&mut self) -> Vec<SessionEvent> {
        if self.state != SessionState::Listening {
            return Vec::new();
        }
        self.state = SessionState::Idle;
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        match self.open.as_mut() {
            Some(open) => {
                open.stopping = true;
                Self::end(open)
            }
            None => Vec::new(),
        }
    }

    /// Feed one engine notification
    pub fn handle(&mut self, event: RecognizerEvent) -> Vec<SessionEvent> {
        let Some(open) = self.open.as_mut() else {
            debug!(?event, "no open session, event dropped");
            return Vec::new();
        };

        match event {
            RecognizerEvent::Started => {
                debug!("engine started");
                Vec::new()
            }
            RecognizerEvent::Result(text) => {
                if open.terminal_sent {
                    debug!("extra result dropped");
                    return Vec::new();
                }
                open.terminal_sent = true;
                self.state = SessionState::Idle;
                let mut events = Self::end(open);
                events.push(SessionEvent::Transcript(text.to_lowercase()));
                events
            }
            RecognizerEvent::Error(code) => {
                if open.terminal_sent || open.stopping {
                    debug!(code, "error after stop or result dropped");
                    return Vec::new();
                }
                warn!(code, "speech recognition error");
                open.terminal_sent = true;
                self.state = SessionState::Idle;
                let mut events = Self::end(open);
                events.push(SessionEvent::Failed(SessionError::from_code(&code)));
                events
            }
            RecognizerEvent::Ended => {
                let events = Self::end(open);
                self.state = SessionState::Idle;
                self.open = None;
                events
            }
        }
    }

    fn end(open: &mut OpenSession) -> Vec<SessionEvent> {
        if open.ended_sent {
            return Vec::new();
        }
        open.ended_sent = true;
        vec![SessionEvent::ListeningEnded]
    }
}
