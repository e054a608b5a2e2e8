//! Terminal speech adapters.
//!
//! [`TerminalSpeaker`] "speaks" by printing each line and simulating playback
//! time at the configured speaking rate.  [`TerminalListener`] treats each
//! line typed on stdin as one utterance, read on a dedicated OS thread
//! because blocking reads cannot run on the async runtime.
//!
//! Console lines starting with `/` are commands:
//!
//! | Line              | Effect                                  |
//! |-------------------|-----------------------------------------|
//! | `/start`          | start the walkthrough                   |
//! | `/repeat`         | read the current step again             |
//! | `/end`            | end the session                         |
//! | `/listen`         | push-to-talk, opens a listening cycle   |
//! | `/help`           | print this list                         |
//! | `/quit`, `/exit`  | end the session and exit                |
//!
//! Any other line is an utterance.  While a listening cycle is open it
//! becomes that cycle's final transcript; otherwise it is a typed
//! utterance that interrupts playback.  End of input shuts the session down.

use std::io::BufRead;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use tokio::task::JoinHandle;

use crate::config::SpeechConfig;
use crate::session::{SessionHandle, UserCommand};

use super::input::{
    CycleId, RecognitionErrorKind, RecognitionEvent, SpeechInput, SpeechInputError,
};
use super::output::{
    SpeechOutput, SpeechOutputError, SynthesisErrorKind, SynthesisEvent, UtteranceId,
};

const HELP: &str = "\
Commands:
  /start    start cooking
  /repeat   repeat the current step
  /listen   talk now (interrupts the voice)
  /end      end the session
  /quit     exit
Anything else is treated as something you said.";

// ---------------------------------------------------------------------------
// TerminalSpeaker
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Playback {
    id: UtteranceId,
    task: JoinHandle<()>,
}

/// Prints utterances and reports simulated playback events.
///
/// Must be used from within a tokio runtime.
pub struct TerminalSpeaker {
    handle: SessionHandle,
    config: SpeechConfig,
    next_id: u64,
    playback: Option<Playback>,
}

impl TerminalSpeaker {
    pub fn new(handle: SessionHandle, config: SpeechConfig) -> Self {
        Self {
            handle,
            config,
            next_id: 0,
            playback: None,
        }
    }
}

impl SpeechOutput for TerminalSpeaker {
    fn speak(&mut self, text: &str) -> Result<UtteranceId, SpeechOutputError> {
        self.cancel()?;

        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        let duration = self.config.playback_duration(text);

        println!("{} {}", self.config.voice_prefix, text);
        log::debug!("terminal-speaker: {id} for {duration:?}");

        let handle = self.handle.clone();
        let task = tokio::spawn(async move {
            handle.synthesis(SynthesisEvent::Started(id));
            tokio::time::sleep(duration).await;
            handle.synthesis(SynthesisEvent::Ended(id));
        });

        self.playback = Some(Playback { id, task });
        Ok(id)
    }

    fn cancel(&mut self) -> Result<(), SpeechOutputError> {
        if let Some(playback) = self.playback.take() {
            if !playback.task.is_finished() {
                playback.task.abort();
                self.handle.synthesis(SynthesisEvent::Error(
                    playback.id,
                    SynthesisErrorKind::Canceled,
                ));
            }
        }
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|playback| !playback.task.is_finished())
    }
}

impl Drop for TerminalSpeaker {
    fn drop(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Console lines
// ---------------------------------------------------------------------------

/// One parsed line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Command(UserCommand),
    Help,
    Quit,
    /// A `/word` that is not a known command.
    Unknown(String),
    /// Anything that is not a command, trimmed.  May be empty.
    Utterance(String),
}

/// Classify one line of console input.
///
/// ```
/// use savora_cook::session::UserCommand;
/// use savora_cook::speech::{parse_console_line, ConsoleLine};
///
/// assert_eq!(parse_console_line("/START"), ConsoleLine::Command(UserCommand::Start));
/// assert_eq!(parse_console_line(" next "), ConsoleLine::Utterance("next".into()));
/// ```
pub fn parse_console_line(line: &str) -> ConsoleLine {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return ConsoleLine::Utterance(line.to_string());
    };

    match command.trim().to_ascii_lowercase().as_str() {
        "start" => ConsoleLine::Command(UserCommand::Start),
        "repeat" => ConsoleLine::Command(UserCommand::Repeat),
        "end" | "stop" => ConsoleLine::Command(UserCommand::End),
        "listen" | "talk" => ConsoleLine::Command(UserCommand::Listen),
        "help" | "?" => ConsoleLine::Help,
        "quit" | "exit" => ConsoleLine::Quit,
        other => ConsoleLine::Unknown(other.to_string()),
    }
}

/// The listening cycle currently open, if any.
pub type OpenCycle = Mutex<Option<CycleId>>;

fn take_open(open: &OpenCycle) -> Option<CycleId> {
    open.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Forward one console line to the session.
///
/// A plain line closes the open listening cycle, if any.  Returns `false`
/// when the line asked to quit.
pub fn route_line(line: &str, open: &OpenCycle, handle: &SessionHandle) -> bool {
    match parse_console_line(line) {
        ConsoleLine::Command(command) => {
            handle.command(command);
        }
        ConsoleLine::Help => println!("{HELP}"),
        ConsoleLine::Quit => {
            handle.command(UserCommand::End);
            handle.shutdown();
            return false;
        }
        ConsoleLine::Unknown(command) => {
            println!("Unknown command /{command}. Type /help for the list.");
        }
        ConsoleLine::Utterance(text) => match take_open(open) {
            Some(cycle) => {
                if text.is_empty() {
                    handle.recognition(
                        cycle,
                        RecognitionEvent::Error(RecognitionErrorKind::NoSpeech),
                    );
                } else {
                    handle.recognition(cycle, RecognitionEvent::SpeechDetected);
                    handle.recognition(cycle, RecognitionEvent::Final(text));
                }
                handle.recognition(cycle, RecognitionEvent::Ended);
            }
            None if !text.is_empty() => {
                handle.command(UserCommand::Say(text));
            }
            None => {}
        },
    }
    true
}

// ---------------------------------------------------------------------------
// TerminalListener
// ---------------------------------------------------------------------------

/// Line-oriented speech input backed by a reader thread.
///
/// Dropping the listener stops event forwarding.  The reader thread stays
/// blocked on its next read until input arrives or the process exits.
pub struct TerminalListener {
    handle: SessionHandle,
    open: Arc<OpenCycle>,
    next_cycle: u64,
    stop: Arc<AtomicBool>,
    _thread: std::thread::JoinHandle<()>,
}

impl TerminalListener {
    /// Listen on the process's stdin.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the reader thread.
    pub fn stdin(handle: SessionHandle) -> Self {
        Self::spawn(std::io::BufReader::new(std::io::stdin()), handle)
    }

    /// Listen on any line reader.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the reader thread.
    pub fn spawn<R>(reader: R, handle: SessionHandle) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let open = Arc::new(OpenCycle::default());
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let open = Arc::clone(&open);
            let stop = Arc::clone(&stop);
            let handle = handle.clone();
            std::thread::Builder::new()
                .name("stdin-listener".into())
                .spawn(move || read_lines(reader, &open, &stop, &handle))
                .expect("failed to spawn stdin-listener thread")
        };

        Self {
            handle,
            open,
            next_cycle: 0,
            stop,
            _thread: thread,
        }
    }
}

fn read_lines<R: BufRead>(
    reader: R,
    open: &OpenCycle,
    stop: &AtomicBool,
    handle: &SessionHandle,
) {
    for line in reader.lines() {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        match line {
            Ok(line) => {
                if !route_line(&line, open, handle) {
                    return;
                }
            }
            Err(e) => {
                log::error!("stdin-listener: read failed: {e}");
                break;
            }
        }
    }

    if !stop.load(Ordering::Relaxed) {
        log::info!("stdin-listener: end of input");
        handle.shutdown();
    }
}

impl TerminalListener {
    fn open_cycle(&self) -> std::sync::MutexGuard<'_, Option<CycleId>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SpeechInput for TerminalListener {
    fn start_listening(&mut self) -> Result<CycleId, SpeechInputError> {
        if let Some(cycle) = *self.open_cycle() {
            return Ok(cycle);
        }

        self.next_cycle += 1;
        let cycle = CycleId(self.next_cycle);
        *self.open_cycle() = Some(cycle);
        println!("🎤 Listening… (type what you would say)");
        Ok(cycle)
    }

    fn stop_listening(&mut self) -> Result<(), SpeechInputError> {
        if let Some(cycle) = take_open(&self.open) {
            self.handle.recognition(cycle, RecognitionEvent::Ended);
        }
        Ok(())
    }

    fn abort(&mut self) -> Result<(), SpeechInputError> {
        if let Some(cycle) = take_open(&self.open) {
            self.handle.recognition(
                cycle,
                RecognitionEvent::Error(RecognitionErrorKind::Aborted),
            );
            self.handle.recognition(cycle, RecognitionEvent::Ended);
        }
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.open_cycle().is_some()
    }
}

impl Drop for TerminalListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use crate::session::{channel, SessionEvent, SessionInbox};

    fn drain(inbox: &mut SessionInbox) -> Vec<SessionEvent> {
        std::iter::from_fn(|| inbox.try_recv()).collect()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_console_line("/repeat"),
            ConsoleLine::Command(UserCommand::Repeat)
        );
        assert_eq!(
            parse_console_line("  /End "),
            ConsoleLine::Command(UserCommand::End)
        );
        assert_eq!(
            parse_console_line("/listen"),
            ConsoleLine::Command(UserCommand::Listen)
        );
        assert_eq!(parse_console_line("/exit"), ConsoleLine::Quit);
        assert_eq!(parse_console_line("/help"), ConsoleLine::Help);
        assert_eq!(
            parse_console_line("/flip"),
            ConsoleLine::Unknown("flip".into())
        );
        assert_eq!(parse_console_line(""), ConsoleLine::Utterance(String::new()));
    }

    /// Recognition events in order, dropping any that belong to another cycle.
    fn recognition_of(events: &[SessionEvent], id: CycleId) -> Vec<RecognitionEvent> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Recognition { cycle, event } if *cycle == id => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn line_while_listening_is_a_recognition_cycle() {
        let (handle, mut inbox) = channel().into_parts();
        let open = OpenCycle::new(Some(CycleId(4)));

        assert!(route_line("go back", &open, &handle));
        assert!(open.lock().unwrap().is_none());

        let events = drain(&mut inbox);
        assert_eq!(events.len(), 3);
        assert_eq!(
            recognition_of(&events, CycleId(4)),
            vec![
                RecognitionEvent::SpeechDetected,
                RecognitionEvent::Final("go back".into()),
                RecognitionEvent::Ended,
            ]
        );
    }

    #[test]
    fn blank_line_while_listening_is_silence() {
        let (handle, mut inbox) = channel().into_parts();
        let open = OpenCycle::new(Some(CycleId(1)));

        route_line("   ", &open, &handle);

        assert_eq!(
            recognition_of(&drain(&mut inbox), CycleId(1)),
            vec![
                RecognitionEvent::Error(RecognitionErrorKind::NoSpeech),
                RecognitionEvent::Ended,
            ]
        );
    }

    #[test]
    fn line_while_not_listening_is_typed() {
        let (handle, mut inbox) = channel().into_parts();
        let open = OpenCycle::default();

        route_line("next", &open, &handle);
        route_line("", &open, &handle);

        let events = drain(&mut inbox);
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Command(UserCommand::Say(text))] if text == "next"
        ));
    }

    #[test]
    fn quit_ends_and_shuts_down() {
        let (handle, mut inbox) = channel().into_parts();
        assert!(!route_line("/quit", &OpenCycle::default(), &handle));

        let events = drain(&mut inbox);
        assert!(matches!(
            events.as_slice(),
            [
                SessionEvent::Command(UserCommand::End),
                SessionEvent::Shutdown
            ]
        ));
    }

    #[tokio::test]
    async fn reader_thread_shuts_down_at_eof() {
        let (handle, mut inbox) = channel().into_parts();
        let _listener = TerminalListener::spawn(Cursor::new("/start\nnext\n"), handle);

        assert!(matches!(
            inbox.recv().await,
            Some(SessionEvent::Command(UserCommand::Start))
        ));
        assert!(matches!(
            inbox.recv().await,
            Some(SessionEvent::Command(UserCommand::Say(ref t))) if t == "next"
        ));
        assert!(matches!(inbox.recv().await, Some(SessionEvent::Shutdown)));
    }

    #[tokio::test]
    async fn abort_reports_aborted_cycle() {
        let (handle, mut inbox) = channel().into_parts();
        let mut listener = TerminalListener::spawn(Cursor::new(""), handle);
        assert!(matches!(inbox.recv().await, Some(SessionEvent::Shutdown)));

        let cycle = listener.start_listening().unwrap();
        assert!(listener.is_listening());
        assert_eq!(listener.start_listening().unwrap(), cycle);
        listener.abort().unwrap();
        assert!(!listener.is_listening());

        let events = drain(&mut inbox);
        assert_eq!(events.len(), 2);
        assert_eq!(
            recognition_of(&events, cycle),
            vec![
                RecognitionEvent::Error(RecognitionErrorKind::Aborted),
                RecognitionEvent::Ended,
            ]
        );

        // Each cycle gets a new id.
        let next = listener.start_listening().unwrap();
        assert_ne!(next, cycle);
        listener.stop_listening().unwrap();
        assert_eq!(
            recognition_of(&drain(&mut inbox), next),
            vec![RecognitionEvent::Ended]
        );

        // Nothing open: abort and stop are no-ops.
        listener.abort().unwrap();
        listener.stop_listening().unwrap();
        assert!(drain(&mut inbox).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn speaker_reports_playback() {
        let (handle, mut inbox) = channel().into_parts();
        let config = SpeechConfig {
            words_per_minute: 60,
            ..SpeechConfig::default()
        };
        let mut speaker = TerminalSpeaker::new(handle, config);

        let started = tokio::time::Instant::now();
        let id = speaker.speak("Mix flour and sugar").unwrap();
        assert!(speaker.is_speaking());

        assert!(matches!(
            inbox.recv().await,
            Some(SessionEvent::Synthesis(SynthesisEvent::Started(s))) if s == id
        ));
        assert!(matches!(
            inbox.recv().await,
            Some(SessionEvent::Synthesis(SynthesisEvent::Ended(e))) if e == id
        ));
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn new_utterance_cancels_the_previous_one() {
        let (handle, mut inbox) = channel().into_parts();
        let mut speaker = TerminalSpeaker::new(handle, SpeechConfig::default());

        let first = speaker.speak("Preheat oven to 350F").unwrap();
        let second = speaker.speak("Mix flour and sugar").unwrap();
        assert_ne!(first, second);

        tokio::time::sleep(Duration::from_secs(60)).await;

        let events = drain(&mut inbox);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Synthesis(SynthesisEvent::Error(id, SynthesisErrorKind::Canceled))
                if *id == first
        )));
        assert!(!events.iter().any(|e| matches!(
            e,
            SessionEvent::Synthesis(SynthesisEvent::Ended(id)) if *id == first
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Synthesis(SynthesisEvent::Ended(id)) if *id == second
        )));
        assert!(!speaker.is_speaking());
    }
}
