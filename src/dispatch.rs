//! Action dispatch - turns commands and session outcomes into side effects
//!
//! Every effect goes through one of four collaborator traits so the front end
//! decides how navigation, notices, speech and tones are rendered.

use crate::command::{Command, HELP_TEXT};
use crate::session::SessionError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::info;

/// Spoken when a transcript matched no rule
pub const UNRECOGNIZED_HINT: &str =
    "I heard that, but I'm not sure what to do. Try saying 'help' for commands.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Info => write!(f, "info"),
            NoticeLevel::Success => write!(f, "success"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

pub trait Navigator {
    fn navigate(&mut self, path: &str);
}

pub trait Notifier {
    fn notify(&mut self, level: NoticeLevel, text: &str);
}

/// Best effort text-to-speech, never blocks
pub trait Speaker {
    fn speak(&mut self, text: &str);
}

/// Short listening start/stop tones, never blocks
pub trait Chime {
    fn play_start_sound(&mut self);
    fn play_stop_sound(&mut self);
}

/// Client-side navigation history
#[derive(Clone, Default)]
pub struct HistoryNavigator {
    history: Rc<RefCell<Vec<String>>>,
}

impl HistoryNavigator {
    pub fn current(&self) -> String {
        self.history
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }

    pub fn history(&self) -> Vec<String> {
        self.history.borrow().clone()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&mut self, path: &str) {
        self.history.borrow_mut().push(path.to_string());
    }
}

/// Notices printed as plain lines
pub struct PrintNotifier;

impl Notifier for PrintNotifier {
    fn notify(&mut self, level: NoticeLevel, text: &str) {
        println!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            level,
            text
        );
    }
}

pub struct Dispatcher {
    navigator: Box<dyn Navigator>,
    notifier: Box<dyn Notifier>,
    speaker: Box<dyn Speaker>,
    chime: Box<dyn Chime>,
}

impl Dispatcher {
    pub fn new(
        navigator: Box<dyn Navigator>,
        notifier: Box<dyn Notifier>,
        speaker: Box<dyn Speaker>,
        chime: Box<dyn Chime>,
    ) -> Self {
        Self {
            navigator,
            notifier,
            speaker,
            chime,
        }
    }

    pub fn listening_started(&mut self) {
        self.chime.play_start_sound();
        self.notifier.notify(NoticeLevel::Info, "Listening...");
    }

    pub fn listening_ended(&mut self) {
        self.chime.play_stop_sound();
    }

    pub fn execute(&mut self, command: &Command) {
        match command {
            Command::Help => {
                self.speaker.speak(HELP_TEXT);
                self.notifier.notify(NoticeLevel::Info, HELP_TEXT);
            }
            Command::Navigate { .. } | Command::Search { .. } => {
                if let (Some(path), Some(msg)) = (command.path(), command.announcement()) {
                    info!(path, "navigating");
                    self.navigator.navigate(&path);
                    self.notifier.notify(NoticeLevel::Success, &msg);
                    self.speaker.speak(&msg);
                }
            }
            Command::Unrecognized { raw_text } => {
                info!(raw_text, "no action for transcript");
                self.notifier.notify(
                    NoticeLevel::Info,
                    &format!("Command received: \"{}\" (No action taken)", raw_text),
                );
                self.speaker.speak(UNRECOGNIZED_HINT);
            }
        }
    }

    pub fn report(&mut self, error: SessionError) {
        let msg = error.to_string();
        self.notifier.notify(NoticeLevel::Error, &msg);
        if error.is_spoken() {
            self.speaker.speak(&msg);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Effect, Recorder};
    use super::*;
    use crate::command::classify;

    #[test]
    fn test_navigation_effects() {
        let rec = Recorder::default();
        let mut dispatcher = rec.dispatcher();
        dispatcher.execute(&classify("go to my profile"));
        assert_eq!(
            rec.effects(),
            vec![
                Effect::Navigate("/profile".to_string()),
                Effect::Notify(NoticeLevel::Success, "Navigating to profile".to_string()),
                Effect::Speak("Navigating to profile".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_effects() {
        let rec = Recorder::default();
        let mut dispatcher = rec.dispatcher();
        dispatcher.execute(&classify("search for baby car seat"));
        assert_eq!(
            rec.effects()[0],
            Effect::Navigate("/feed?search=baby%20car%20seat".to_string())
        );
        assert!(rec.effects().contains(&Effect::Speak(
            "Searching for baby car seat".to_string()
        )));
    }

    #[test]
    fn test_help_never_navigates() {
        let rec = Recorder::default();
        let mut dispatcher = rec.dispatcher();
        dispatcher.execute(&Command::Help);
        assert_eq!(
            rec.effects(),
            vec![
                Effect::Speak(HELP_TEXT.to_string()),
                Effect::Notify(NoticeLevel::Info, HELP_TEXT.to_string()),
            ]
        );
    }

    #[test]
    fn test_unrecognized_effects() {
        let rec = Recorder::default();
        let mut dispatcher = rec.dispatcher();
        dispatcher.execute(&classify("xyz"));
        assert_eq!(
            rec.effects(),
            vec![
                Effect::Notify(
                    NoticeLevel::Info,
                    "Command received: \"xyz\" (No action taken)".to_string()
                ),
                Effect::Speak(UNRECOGNIZED_HINT.to_string()),
            ]
        );
    }

    #[test]
    fn test_error_reports() {
        let rec = Recorder::default();
        let mut dispatcher = rec.dispatcher();
        dispatcher.report(SessionError::PermissionDenied);
        assert_eq!(
            rec.take(),
            vec![
                Effect::Notify(NoticeLevel::Error, "Microphone access denied.".to_string()),
                Effect::Speak("Microphone access denied.".to_string()),
            ]
        );
        dispatcher.report(SessionError::Unsupported);
        let effects = rec.take();
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Notify(NoticeLevel::Error, _)));
    }

    #[test]
    fn test_listening_feedback() {
        let rec = Recorder::default();
        let mut dispatcher = rec.dispatcher();
        dispatcher.listening_started();
        dispatcher.listening_ended();
        assert_eq!(
            rec.effects(),
            vec![
                Effect::StartSound,
                Effect::Notify(NoticeLevel::Info, "Listening...".to_string()),
                Effect::StopSound,
            ]
        );
    }

    #[test]
    fn test_history_navigator() {
        let mut nav = HistoryNavigator::default();
        assert_eq!(nav.current(), "/");
        nav.navigate("/messages");
        nav.navigate("/feed?tab=requests");
        assert_eq!(nav.current(), "/feed?tab=requests");
        assert_eq!(nav.history().len(), 2);
    }
}
