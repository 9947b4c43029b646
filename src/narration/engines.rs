// Speech engine backends

use std::process::Stdio;
use std::sync::{Mutex, MutexGuard};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::SpeechEngine;

/// Prints utterances to stdout and the log. Never reports "speaking".
pub struct LogSpeechEngine;

impl SpeechEngine for LogSpeechEngine {
    fn cancel_all(&self) {}

    fn speak(&self, utterance: &str, locale: &str) {
        info!(locale = %locale, "Narration: {}", utterance);
        println!("🔊 {utterance}");
    }

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Discards everything
pub struct SilentSpeechEngine;

impl SpeechEngine for SilentSpeechEngine {
    fn cancel_all(&self) {}

    fn speak(&self, _utterance: &str, _locale: &str) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Voices utterances through a command-line TTS program (espeak-ng by default),
/// one child process per utterance. A replaced child is killed on drop and reaped by
/// the tokio runtime. Must be used from within a tokio runtime.
pub struct ProcessSpeechEngine {
    program: String,
    voice_flag: String,
    current: Mutex<Option<Child>>,
}

impl ProcessSpeechEngine {
    pub fn new(program: impl Into<String>, voice_flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            voice_flag: voice_flag.into(),
            current: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn current_pid(&self) -> Option<u32> {
        self.lock_current().as_ref().and_then(|child| child.id())
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Child>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `id-ID` -> `id`; TTS voices are keyed by language
    fn voice_for(locale: &str) -> &str {
        locale.split(['-', '_']).next().unwrap_or(locale)
    }
}

impl SpeechEngine for ProcessSpeechEngine {
    fn cancel_all(&self) {
        let mut current = self.lock_current();
        if let Some(mut child) = current.take() {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "TTS process already exited");
            }
            // Reap without blocking; a still-dying child is picked up by is_speaking
            match child.try_wait() {
                Ok(Some(_)) => {}
                _ => *current = Some(child),
            }
        }
    }

    fn speak(&self, utterance: &str, locale: &str) {
        let spawned = Command::new(&self.program)
            .arg(&self.voice_flag)
            .arg(Self::voice_for(locale))
            .arg(utterance)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => {
                // Dropping the previous child kills it and hands it to the runtime's reaper
                let previous = self.lock_current().replace(child);
                drop(previous);
            }
            Err(e) => {
                warn!(program = %self.program, error = %e, "Failed to start TTS program");
            }
        }
    }

    fn is_speaking(&self) -> bool {
        let mut current = self.lock_current();
        let still_running = match current.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_))) | None => false,
            Some(Err(e)) => {
                warn!(error = %e, "Could not query TTS process");
                false
            }
        };
        if !still_running {
            *current = None;
        }
        still_running
    }
}
