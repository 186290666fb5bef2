// Keyboard input: raw terminal keys -> velocity state updates
//
// The reader runs on its own thread because reading a key blocks. Reads use
// a short timeout so the loop can notice a shutdown request between keys.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{debug, info, warn};

use crate::bindings::{HELP_MSG, KeyCommand, decode};
use crate::config::{HELP_REPEAT_EVERY, KEY_POLL_INTERVAL};
use crate::state::SharedState;

const ESC: char = '\x1b';

/// Source of single keystrokes
pub trait KeySource {
    /// Wait up to `timeout` for one key. `Ok(None)` means nothing was pressed.
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<char>>;
}

/// Keys from the controlling terminal (expects raw mode to be enabled)
#[derive(Debug, Default)]
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<char>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(key_to_char(&key)),
            _ => Ok(None),
        }
    }
}

/// Translate a key event into the byte a raw terminal would have delivered
pub fn key_to_char(key: &KeyEvent) -> Option<char> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let c = match key.code {
        KeyCode::Char(c)
            if key.modifiers.contains(KeyModifiers::CONTROL) && c.is_ascii_alphabetic() =>
        {
            // Ctrl-A..Ctrl-Z -> 0x01..0x1A
            ((c.to_ascii_lowercase() as u8) & 0x1f) as char
        }
        KeyCode::Char(c) => c,
        KeyCode::Enter => '\r',
        KeyCode::Tab => '\t',
        KeyCode::Backspace => '\x7f',
        // Arrows, function keys etc. start with ESC on a real terminal
        _ => ESC,
    };
    Some(c)
}

/// Raw terminal mode for the lifetime of the guard
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn acquire() -> io::Result<Self> {
        enable_raw_mode()?;
        debug!("Terminal switched to raw mode");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        } else {
            debug!("Terminal mode restored");
        }
    }
}

/// Session console output. Raw mode needs explicit carriage returns.
pub struct Console<W: Write> {
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn print(&mut self, text: &str) -> io::Result<()> {
        for line in text.split('\n') {
            self.out.write_all(line.as_bytes())?;
            self.out.write_all(b"\r\n")?;
        }
        self.out.flush()
    }

    pub fn print_help(&mut self) -> io::Result<()> {
        self.print(HELP_MSG)
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

/// Result of handling one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

/// Why the reader loop ended
#[derive(Debug)]
pub enum ReaderExit {
    /// Ctrl-C was pressed
    Quit,
    /// Someone else cleared the running flag
    Cancelled,
    /// Reading the terminal failed
    Failed(io::Error),
}

/// Turns keystrokes into velocity state changes
pub struct InputReader<K, W: Write> {
    keys: K,
    state: SharedState,
    running: Arc<AtomicBool>,
    console: Console<W>,
    speed_events: u32,
}

impl<K: KeySource, W: Write> InputReader<K, W> {
    pub fn new(keys: K, state: SharedState, running: Arc<AtomicBool>, console: Console<W>) -> Self {
        Self {
            keys,
            state,
            running,
            console,
            speed_events: 0,
        }
    }

    /// Apply one keystroke to the shared state
    pub fn handle_key(&mut self, key: char) -> io::Result<KeyOutcome> {
        match decode(key) {
            KeyCommand::Move(intent) => {
                debug!("Key {:?} -> {:?}", key, intent);
                self.state.set_intent(intent);
            }
            KeyCommand::Scale(factors) => {
                let scale = self.state.scale_by(factors);
                debug!("Key {:?} -> {:?}", key, scale);
                self.console.print(&scale.status_line())?;
                if self.speed_events == HELP_REPEAT_EVERY - 1 {
                    self.console.print_help()?;
                }
                self.speed_events = (self.speed_events + 1) % HELP_REPEAT_EVERY;
            }
            KeyCommand::Stop => {
                debug!("Key {:?} -> stop", key);
                self.state.stop();
            }
            KeyCommand::Quit => {
                // Clear the flag before stopping so the publish timer never
                // sends the zeroed intent as a regular tick
                self.running.store(false, Ordering::SeqCst);
                self.state.stop();
                return Ok(KeyOutcome::Quit);
            }
        }
        Ok(KeyOutcome::Continue)
    }

    /// Read keys until Ctrl-C, a read error, or the running flag is cleared
    pub fn run(mut self) -> ReaderExit {
        while self.running.load(Ordering::SeqCst) {
            let key = match self.keys.next_key(KEY_POLL_INTERVAL) {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(e) => return self.fail(e),
            };
            match self.handle_key(key) {
                Ok(KeyOutcome::Continue) => {}
                Ok(KeyOutcome::Quit) => {
                    info!("Ctrl-C pressed, quitting");
                    return ReaderExit::Quit;
                }
                Err(e) => return self.fail(e),
            }
        }
        ReaderExit::Cancelled
    }

    fn fail(&self, e: io::Error) -> ReaderExit {
        warn!("Keyboard reader stopped: {}", e);
        self.running.store(false, Ordering::SeqCst);
        self.state.stop();
        ReaderExit::Failed(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::CTRL_C;
    use crate::state::VelocityIntent;
    use std::collections::VecDeque;

    /// Replays a fixed list of reads, then reports end of input
    struct ScriptedKeys {
        script: VecDeque<io::Result<Option<char>>>,
    }

    impl ScriptedKeys {
        fn new(keys: &str) -> Self {
            Self {
                script: keys.chars().map(|c| Ok(Some(c))).collect(),
            }
        }

        fn then_error(mut self, kind: io::ErrorKind) -> Self {
            self.script.push_back(Err(io::Error::new(kind, "scripted failure")));
            self
        }
    }

    impl KeySource for ScriptedKeys {
        fn next_key(&mut self, _timeout: Duration) -> io::Result<Option<char>> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(io::ErrorKind::UnexpectedEof.into()))
        }
    }

    fn reader(keys: &str) -> (InputReader<ScriptedKeys, Vec<u8>>, SharedState, Arc<AtomicBool>) {
        let state = SharedState::default();
        let running = Arc::new(AtomicBool::new(true));
        let reader = InputReader::new(
            ScriptedKeys::new(keys),
            state.clone(),
            running.clone(),
            Console::new(Vec::new()),
        );
        (reader, state, running)
    }

    #[test]
    fn test_move_key_sets_intent() {
        let (mut reader, state, _) = reader("");
        assert_eq!(reader.handle_key('i').unwrap(), KeyOutcome::Continue);
        assert_eq!(state.snapshot().intent, VelocityIntent::new(1, 0, 0, 0));
        reader.handle_key('M').unwrap();
        assert_eq!(state.snapshot().intent, VelocityIntent::new(-1, 1, 0, 0));
    }

    #[test]
    fn test_unmapped_key_stops() {
        let (mut reader, state, _) = reader("");
        reader.handle_key('u').unwrap();
        assert!(!state.snapshot().intent.is_stop());
        reader.handle_key(' ').unwrap();
        assert!(state.snapshot().intent.is_stop());
    }

    #[test]
    fn test_speed_keys_keep_intent_and_multiply() {
        let (mut reader, state, _) = reader("");
        reader.handle_key('i').unwrap();
        for _ in 0..3 {
            reader.handle_key('q').unwrap();
        }
        let snapshot = state.snapshot();
        assert_eq!(snapshot.intent, VelocityIntent::new(1, 0, 0, 0));
        assert!((snapshot.scale.linear - 0.5 * 1.1 * 1.1 * 1.1).abs() < 1e-12);
        assert!((snapshot.scale.linear - 0.6655).abs() < 1e-9);
        assert!((snapshot.scale.angular - 1.1 * 1.1 * 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_linear_only_keys_leave_turn_alone() {
        let (mut reader, state, _) = reader("");
        for key in ['w', 'w', 'x'] {
            reader.handle_key(key).unwrap();
        }
        let scale = state.snapshot().scale;
        assert_eq!(scale.angular, 1.0);
        assert_eq!(scale.linear, 0.5 * 1.1 * 1.1 * 0.9);
    }

    #[test]
    fn test_status_line_after_each_speed_key() {
        let (mut reader, _, _) = reader("");
        reader.handle_key('e').unwrap();
        reader.handle_key('c').unwrap();
        let out = String::from_utf8(reader.console.into_inner()).unwrap();
        assert_eq!(
            out,
            "currently:\tspeed 0.50\tturn 1.10\r\ncurrently:\tspeed 0.50\tturn 0.99\r\n"
        );
    }

    #[test]
    fn test_help_repeats_every_fifteenth_speed_key() {
        let (mut reader, _, _) = reader("");
        for _ in 0..14 {
            reader.handle_key('e').unwrap();
        }
        let help_count = |out: &[u8]| String::from_utf8_lossy(out).matches("CTRL-C to quit").count();
        assert_eq!(help_count(&reader.console.out), 0);

        reader.handle_key('e').unwrap();
        assert_eq!(help_count(&reader.console.out), 1);

        for _ in 0..15 {
            reader.handle_key('c').unwrap();
        }
        assert_eq!(help_count(&reader.console.out), 2);
    }

    #[test]
    fn test_ctrl_c_stops_and_quits() {
        let (reader, state, running) = reader(&format!("u{}", CTRL_C));
        let exit = reader.run();
        assert!(matches!(exit, ReaderExit::Quit));
        assert!(state.snapshot().intent.is_stop());
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_read_error_ends_session() {
        let state = SharedState::default();
        let running = Arc::new(AtomicBool::new(true));
        let keys = ScriptedKeys::new("i").then_error(io::ErrorKind::BrokenPipe);
        let exit = InputReader::new(keys, state.clone(), running.clone(), Console::new(Vec::new())).run();

        match exit {
            ReaderExit::Failed(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(state.snapshot().intent.is_stop());
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cleared_flag_cancels_reader() {
        let (reader, _, running) = reader("iii");
        running.store(false, Ordering::SeqCst);
        assert!(matches!(reader.run(), ReaderExit::Cancelled));
    }

    #[test]
    fn test_key_event_translation() {
        let press = |code, modifiers| KeyEvent::new(code, modifiers);
        assert_eq!(key_to_char(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(CTRL_C));
        assert_eq!(key_to_char(&press(KeyCode::Char('U'), KeyModifiers::SHIFT)), Some('U'));
        assert_eq!(key_to_char(&press(KeyCode::Char(','), KeyModifiers::NONE)), Some(','));
        assert_eq!(key_to_char(&press(KeyCode::Enter, KeyModifiers::NONE)), Some('\r'));
        assert_eq!(key_to_char(&press(KeyCode::Up, KeyModifiers::NONE)), Some(ESC));

        let release = KeyEvent::new_with_kind(KeyCode::Char('i'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(key_to_char(&release), None);
    }
}
