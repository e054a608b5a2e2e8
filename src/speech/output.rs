//! Speech output adapter — the contract a synthesis engine implements.
//!
//! Only one utterance plays at a time.  Every `speak` call returns a fresh
//! [`UtteranceId`]; the engine reports [`SynthesisEvent`]s tagged with it so
//! the controller can ignore events of utterances it already superseded.

use std::fmt;

use thiserror::Error;

/// Identifies one `speak` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance#{}", self.0)
    }
}

/// Why playback of an utterance failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisErrorKind {
    #[error("playback canceled")]
    Canceled,
    #[error("playback interrupted")]
    Interrupted,
    #[error("audio output busy")]
    AudioBusy,
    #[error("speech synthesis failed")]
    SynthesisFailed,
    #[error("{0}")]
    Other(String),
}

impl SynthesisErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "canceled" => Self::Canceled,
            "interrupted" => Self::Interrupted,
            "audio-busy" => Self::AudioBusy,
            "synthesis-failed" => Self::SynthesisFailed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Cancellation and interruption are caused by our own last-write-wins
    /// policy.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Canceled | Self::Interrupted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started(UtteranceId),
    Ended(UtteranceId),
    Error(UtteranceId, SynthesisErrorKind),
}

impl SynthesisEvent {
    pub fn id(&self) -> UtteranceId {
        match self {
            Self::Started(id) | Self::Ended(id) | Self::Error(id, _) => *id,
        }
    }
}

/// How the controller treats the end of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeakOptions {
    /// Last words of the session; do not resume listening afterwards.
    pub is_final: bool,
    /// The text is one of the recipe instructions; arm auto-advance after it.
    pub is_instruction_echo: bool,
}

#[derive(Debug, Error)]
pub enum SpeechOutputError {
    #[error("speech output unavailable: {0}")]
    Unavailable(String),
    #[error("speech output engine error: {0}")]
    Engine(String),
}

/// A text-to-speech engine.
pub trait SpeechOutput: Send {
    /// Start playing `text`, replacing anything currently playing.
    fn speak(&mut self, text: &str) -> Result<UtteranceId, SpeechOutputError>;

    /// Stop the current utterance, if any.
    fn cancel(&mut self) -> Result<(), SpeechOutputError>;

    fn is_speaking(&self) -> bool;
}
