//! Hands-free cooking session — state machine, event loop and timers.
//!
//! # Architecture
//!
//! ```text
//!  TerminalListener / UI ──UserCommand──┐
//!  SpeechInput engine ──RecognitionEvent┤
//!  SpeechOutput engine ─SynthesisEvent──┤      SessionHandle (mpsc)
//!  interpreter task ───InterpreterReply─┤ ───────────────────────────▶ CookingSession::run()
//!  AutoAdvanceTimer ───AutoAdvance──────┘                                     │
//!                                                                             ├─ SessionState (Idle / Active{step})
//!                                                                             ├─ RequestSlot (one call in flight)
//!                                                                             └─ SharedSnapshot ◀── read by UI
//! ```
//!
//! Every input is a [`SessionEvent`] on one inbox, so transitions happen one
//! at a time in arrival order.  The only asynchronous work — the interpreter
//! call and the auto-advance dwell — runs in spawned tasks that post their
//! result back as an event.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use savora_cook::config::AppConfig;
//! use savora_cook::interpreter::OfflineInterpreter;
//! use savora_cook::recipe::Recipe;
//! use savora_cook::session::{self, CookingSession, UserCommand};
//! use savora_cook::speech::{TerminalListener, TerminalSpeaker};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let recipe = Recipe::new("Toast", ["Slice bread", "Toast it"]).unwrap();
//!
//!     let channel = session::channel();
//!     let input = TerminalListener::stdin(channel.handle());
//!     let output = TerminalSpeaker::new(channel.handle(), config.speech.clone());
//!
//!     let session = CookingSession::new(
//!         recipe,
//!         config.session.clone(),
//!         Arc::new(OfflineInterpreter::new()),
//!         Box::new(input),
//!         Box::new(output),
//!         channel,
//!     );
//!     session.handle().command(UserCommand::Start);
//!     session.run().await;
//! }
//! ```

pub mod controller;
pub mod slot;
pub mod state;
pub mod timer;

use tokio::sync::mpsc;

use crate::interpreter::{InstructionResponse, InterpreterError};
use crate::speech::{CycleId, RecognitionEvent, SynthesisEvent};

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{CookingSession, SessionError};
pub use slot::{RequestSlot, RequestTicket, SlotBusy};
pub use state::{
    new_shared_snapshot, resolve_step, SessionPhase, SessionSnapshot, SessionState,
    SessionStatus, SharedSnapshot, StepTarget, Transition, TransitionError,
};
pub use timer::{AutoAdvanceTimer, DEFAULT_AUTO_ADVANCE};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Commands issued by the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Start,
    Repeat,
    End,
    /// Push-to-talk: open a listening cycle now (interrupts playback).
    Listen,
    /// A typed utterance; interrupts playback like spoken input.
    Say(String),
}

/// Everything the session controller reacts to.
#[derive(Debug)]
pub enum SessionEvent {
    Command(UserCommand),
    /// A recognition event of listening cycle `cycle`.
    Recognition {
        cycle: CycleId,
        event: RecognitionEvent,
    },
    Synthesis(SynthesisEvent),
    InterpreterReply {
        ticket: RequestTicket,
        result: Result<InstructionResponse, InterpreterError>,
    },
    AutoAdvance {
        generation: u64,
    },
    /// Stop the event loop after tearing the session down.
    Shutdown,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Cloneable sender into a session's inbox.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Post an event.  Returns `false` once the session is gone.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn command(&self, command: UserCommand) -> bool {
        self.send(SessionEvent::Command(command))
    }

    pub fn recognition(&self, cycle: CycleId, event: RecognitionEvent) -> bool {
        self.send(SessionEvent::Recognition { cycle, event })
    }

    pub fn synthesis(&self, event: SynthesisEvent) -> bool {
        self.send(SessionEvent::Synthesis(event))
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionEvent::Shutdown)
    }
}

/// Receiving side of a session's inbox.
#[derive(Debug)]
pub struct SessionInbox {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionInbox {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

/// Inbox plus its sender, created before the adapters that post into it.
#[derive(Debug)]
pub struct SessionChannel {
    handle: SessionHandle,
    inbox: SessionInbox,
}

impl SessionChannel {
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn into_parts(self) -> (SessionHandle, SessionInbox) {
        (self.handle, self.inbox)
    }
}

/// Create a session inbox.
pub fn channel() -> SessionChannel {
    let (tx, rx) = mpsc::unbounded_channel();
    SessionChannel {
        handle: SessionHandle { tx },
        inbox: SessionInbox { rx },
    }
}
