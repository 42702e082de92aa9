use crate::dispatch::Speaker;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

// ============================================================================
// System speaker - hands text to an external TTS program
// ============================================================================

/// Speaks through a command line TTS program such as `espeak` or `say`
///
/// A new utterance interrupts the previous one, so announcements never pile up.
pub struct SystemSpeaker {
    program: String,
    args: Vec<String>,
    current: Option<Child>,
}

impl SystemSpeaker {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            current: None,
        }
    }

    /// Stop the utterance in progress, if any
    pub fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            if matches!(child.try_wait(), Ok(None)) {
                debug!("interrupting previous utterance");
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl Speaker for SystemSpeaker {
    fn speak(&mut self, text: &str) {
        self.cancel();
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => self.current = Some(child),
            Err(e) => warn!(program = %self.program, "text-to-speech failed: {}", e),
        }
    }
}

impl Drop for SystemSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Speech output disabled or no program configured
pub struct MuteSpeaker;

impl Speaker for MuteSpeaker {
    fn speak(&mut self, text: &str) {
        debug!(text, "speech muted");
    }
}
