//! Terminal front end
//!
//! The whole terminal window acts as the voice button: mouse presses go
//! through the gesture controller, Tab toggles, and while a session is open
//! typed text is what the recognizer hears.

use crate::app::{ButtonState, Controller};
use crate::config::{Config, RecognitionEngine};
use crate::dispatch::{Chime, Dispatcher, HistoryNavigator, NoticeLevel, Notifier, Speaker};
use crate::gesture::{GestureController, InputSubscription, InputSurface, PointerEvent};
use crate::recognizer::{KeyboardMic, KeyboardRecognizer, RecognizerEvent};
use crate::session::SessionManager;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write, stdout};
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, error, info};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const MAX_PENDING_NOTICES: usize = 32;

// ============================================================================
// Input surface
// ============================================================================

/// Raw mode plus mouse and focus reporting for the lifetime of a subscription
pub struct TerminalSurface;

impl InputSurface for TerminalSurface {
    fn attach(&mut self) -> io::Result<()> {
        enter_raw(
            terminal::enable_raw_mode,
            || execute!(stdout(), EnableMouseCapture, EnableFocusChange, cursor::Hide),
            || {
                let _ = terminal::disable_raw_mode();
            },
        )
    }

    fn detach(&mut self) {
        let _ = execute!(
            stdout(),
            DisableFocusChange,
            DisableMouseCapture,
            cursor::Show,
            cursor::MoveToColumn(0)
        );
        let _ = terminal::disable_raw_mode();
        println!();
    }
}

/// Enable raw mode, then the reporting modes. Raw mode is switched back off
/// when the second step fails, since no guard exists yet to do it.
fn enter_raw(
    enable: impl FnOnce() -> io::Result<()>,
    setup: impl FnOnce() -> io::Result<()>,
    disable: impl FnOnce(),
) -> io::Result<()> {
    enable()?;
    if let Err(e) = setup() {
        disable();
        return Err(e);
    }
    Ok(())
}

/// Pointer event for a terminal mouse report
pub fn pointer_event(kind: MouseEventKind) -> Option<PointerEvent> {
    match kind {
        MouseEventKind::Down(_) => Some(PointerEvent::MouseDown),
        MouseEventKind::Up(_) => Some(PointerEvent::MouseUp),
        MouseEventKind::Drag(_) | MouseEventKind::Moved => Some(PointerEvent::MouseMove),
        MouseEventKind::ScrollDown
        | MouseEventKind::ScrollUp
        | MouseEventKind::ScrollLeft
        | MouseEventKind::ScrollRight => Some(PointerEvent::Scroll),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Toggle,
    Quit,
    Type(char),
    Erase,
    Submit,
    Discard,
    Ignore,
}

/// Map a key press. `capturing` is true while typed text is being heard.
pub fn key_action(key: &KeyEvent, capturing: bool) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => KeyAction::Quit,
            _ => KeyAction::Ignore,
        };
    }
    if key.code == KeyCode::Tab {
        return KeyAction::Toggle;
    }
    if capturing {
        match key.code {
            KeyCode::Enter => KeyAction::Submit,
            KeyCode::Esc => KeyAction::Discard,
            KeyCode::Backspace => KeyAction::Erase,
            KeyCode::Char(c) => KeyAction::Type(c),
            _ => KeyAction::Ignore,
        }
    } else {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
            _ => KeyAction::Ignore,
        }
    }
}

// ============================================================================
// Notices and status line
// ============================================================================

/// Queues notices until the next redraw
#[derive(Clone, Default)]
pub struct TerminalNotifier {
    pending: Rc<RefCell<VecDeque<String>>>,
}

impl TerminalNotifier {
    pub fn drain(&self) -> Vec<String> {
        self.pending.borrow_mut().drain(..).collect()
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&mut self, level: NoticeLevel, text: &str) {
        let icon = match level {
            NoticeLevel::Info => "ℹ",
            NoticeLevel::Success => "✔",
            NoticeLevel::Error => "✖",
        };
        let line = format!(
            "\x1b[90m{}\x1b[0m {} {}",
            chrono::Local::now().format("%H:%M:%S"),
            icon,
            text
        );
        let mut pending = self.pending.borrow_mut();
        if pending.len() == MAX_PENDING_NOTICES {
            pending.pop_front();
        }
        pending.push_back(line);
    }
}

/// Cut `text` to at most `width` terminal columns
pub fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(c);
    }
    if width > 0 {
        out.push('…');
    }
    out
}

/// Single status line: button, current page, and what is being heard
pub fn status_line(button: ButtonState, page: &str, heard: Option<&str>, width: usize) -> String {
    let icon = match button {
        ButtonState::Idle => "🎤",
        ButtonState::Listening => "🔴",
    };
    let mut line = format!("{} {}  │  {}", icon, button.label(), page);
    match heard {
        Some(text) => {
            line.push_str("  │  ▶ ");
            line.push_str(text);
        }
        None if button == ButtonState::Idle => {
            line.push_str("  │  hold or double-click, Tab toggles, q quits");
        }
        None => line.push_str("  │  type, Enter to finish"),
    }
    truncate(&line, width)
}

struct Screen {
    notices: TerminalNotifier,
    navigator: HistoryNavigator,
}

impl Screen {
    fn draw(&self, button: ButtonState, heard: Option<&str>) -> io::Result<()> {
        let mut out = stdout();
        for notice in self.notices.drain() {
            queue!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                crossterm::style::Print(notice),
                crossterm::style::Print("\r\n")
            )?;
        }
        let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
        let status = status_line(button, &self.navigator.current(), heard, width);
        queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            crossterm::style::Print(status)
        )?;
        out.flush()
    }
}

// ============================================================================
// Event loop
// ============================================================================

enum Flow {
    Continue,
    Quit,
}

fn handle_event(
    event: Event,
    controller: &mut Controller,
    gestures: &mut GestureController,
    mic: Option<&KeyboardMic>,
) -> Flow {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            let capturing = mic.is_some_and(|m| m.is_capturing());
            match key_action(&key, capturing) {
                KeyAction::Quit => return Flow::Quit,
                KeyAction::Toggle => controller.on_toggle(gestures),
                KeyAction::Type(c) => mic.iter().for_each(|m| m.push(c)),
                KeyAction::Erase => mic.iter().for_each(|m| m.backspace()),
                KeyAction::Submit => mic.iter().for_each(|m| m.submit()),
                KeyAction::Discard => mic.iter().for_each(|m| m.cancel()),
                KeyAction::Ignore => {}
            }
        }
        Event::Mouse(mouse) => {
            if let Some(pointer) = pointer_event(mouse.kind) {
                controller.on_pointer(gestures, pointer, Instant::now());
            }
        }
        Event::FocusLost => controller.on_pointer(gestures, PointerEvent::Cancel, Instant::now()),
        _ => {}
    }
    Flow::Continue
}

pub async fn run(
    config: &Config,
    speaker: Box<dyn Speaker>,
    chime: Box<dyn Chime>,
) -> anyhow::Result<()> {
    let (rec_tx, rec_rx) = flume::unbounded::<RecognizerEvent>();
    let (session, mic) = match config.recognition.engine {
        RecognitionEngine::Keyboard => {
            info!(lang = %config.recognition.lang, "keyboard recognition");
            let (recognizer, mic) = KeyboardRecognizer::new(
                rec_tx.clone(),
                &config.recognition.lang,
                config.recognition.deny_microphone,
            );
            (SessionManager::new(Box::new(recognizer)), Some(mic))
        }
        RecognitionEngine::Disabled => (SessionManager::unsupported(), None),
    };

    let screen = Screen {
        notices: TerminalNotifier::default(),
        navigator: HistoryNavigator::default(),
    };
    let dispatcher = Dispatcher::new(
        Box::new(screen.navigator.clone()),
        Box::new(screen.notices.clone()),
        speaker,
        chime,
    );
    let mut controller = Controller::new(session, dispatcher);
    let mut input = InputSubscription::attach(
        TerminalSurface,
        GestureController::new(config.gesture.timings()),
    )?;

    // Blocking reads stay off the event loop
    let (input_tx, input_rx) = flume::unbounded::<Event>();
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(ev) => {
                    if input_tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("terminal input error: {}", e);
                    break;
                }
            }
        }
    });

    let heard = |mic: Option<&KeyboardMic>| mic.filter(|m| m.is_capturing()).map(|m| m.text());
    screen.draw(controller.button(), heard(mic.as_ref()).as_deref())?;

    loop {
        let hold = input.pending_timer();
        let hold_fut = async move {
            match hold {
                Some(timer) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(timer.deadline)).await
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            event = input_rx.recv_async() => {
                let Ok(event) = event else {
                    break;
                };
                let flow = handle_event(event, &mut controller, input.controller(), mic.as_ref());
                if let Flow::Quit = flow {
                    debug!("quit requested");
                    break;
                }
            }

            Ok(event) = rec_rx.recv_async() => {
                controller.on_recognizer(event);
            }

            _ = hold_fut, if hold.is_some() => {
                if let Some(timer) = hold {
                    controller.on_hold_timer(input.controller(), timer.id, Instant::now());
                }
            }
        }

        screen.draw(controller.button(), heard(mic.as_ref()).as_deref())?;
    }

    drop(rec_tx);
    Ok(())
}
