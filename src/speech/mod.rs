//! Speech adapters.
//!
//! * [`SpeechInput`] / [`RecognitionEvent`] — speech-to-text, one listening
//!   cycle at a time.
//! * [`SpeechOutput`] / [`SynthesisEvent`] — text-to-speech, one utterance at
//!   a time, last write wins.
//! * [`TerminalListener`] / [`TerminalSpeaker`] — console stand-ins used by
//!   the `savora-cook` binary.
//!
//! Engines report their events by posting into the session's inbox through
//! a [`SessionHandle`](crate::session::SessionHandle).

pub mod input;
pub mod output;
pub mod terminal;

pub use input::{
    CycleId, ListeningCycle, RecognitionErrorKind, RecognitionEvent, SpeechInput, SpeechInputError,
};
pub use output::{
    SpeakOptions, SpeechOutput, SpeechOutputError, SynthesisErrorKind, SynthesisEvent,
    UtteranceId,
};
pub use terminal::{
    parse_console_line, route_line, ConsoleLine, OpenCycle, TerminalListener, TerminalSpeaker,
};
