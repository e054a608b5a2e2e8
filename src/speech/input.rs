//! Speech input adapter — the contract a recognition engine implements.
//!
//! An engine runs *listening cycles*.  `start_listening` returns a fresh
//! [`CycleId`] and every recognition event of that cycle is reported with
//! it, so events of an aborted cycle that arrive after the next one began
//! are recognised and dropped.  The controller feeds the current cycle's
//! events to a [`ListeningCycle`], which yields at most one finalized
//! transcript when the cycle ends.
//!
//! ```text
//! start_listening ─▶ SpeechDetected ─▶ Interim* ─▶ Final+ ─▶ Ended
//!                                                     │
//!                      stop_listening / end-of-speech ┘
//! abort ─▶ Error(Aborted) ─▶ Ended   (transcript discarded)
//! ```

use std::fmt;

use thiserror::Error;

/// Identifies one listening cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Why a recognition cycle reported an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionErrorKind {
    #[error("no speech detected")]
    NoSpeech,
    #[error("recognition aborted")]
    Aborted,
    #[error("microphone permission denied")]
    NotAllowed,
    #[error("audio capture failed")]
    AudioCapture,
    #[error("recognition service unreachable")]
    Network,
    #[error("{0}")]
    Other(String),
}

impl RecognitionErrorKind {
    /// Map an engine error code (`"no-speech"`, `"audio-capture"` …).
    ///
    /// ```
    /// use savora_cook::speech::RecognitionErrorKind;
    ///
    /// assert_eq!(RecognitionErrorKind::from_code("no-speech"), RecognitionErrorKind::NoSpeech);
    /// assert!(RecognitionErrorKind::from_code("aborted").is_expected());
    /// assert!(!RecognitionErrorKind::from_code("network").is_expected());
    /// ```
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }

    /// Silence, cancellation and a declined permission are normal outcomes
    /// and are not shown to the user.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NoSpeech | Self::Aborted | Self::NotAllowed)
    }
}

/// Events a recognition engine reports during a listening cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The engine heard the start of user speech.
    SpeechDetected,
    /// Advisory partial transcript, for live display only.
    Interim(String),
    /// A finalized transcript segment.
    Final(String),
    Error(RecognitionErrorKind),
    /// The cycle is over; no more events until the next `start_listening`.
    Ended,
}

// ---------------------------------------------------------------------------
// SpeechInput trait
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SpeechInputError {
    #[error("speech recognition unavailable: {0}")]
    Unavailable(String),
    #[error("speech recognition engine error: {0}")]
    Engine(String),
}

/// A speech-to-text engine driven one listening cycle at a time.
///
/// The engine is a process-wide resource (one microphone); the session that
/// starts a cycle is responsible for stopping it.
pub trait SpeechInput: Send {
    /// Begin a listening cycle and return its id.  Callers check
    /// [`is_listening`](Self::is_listening) first.
    fn start_listening(&mut self) -> Result<CycleId, SpeechInputError>;

    /// End the cycle and deliver whatever was recognised.
    fn stop_listening(&mut self) -> Result<(), SpeechInputError>;

    /// End the cycle and discard it.
    fn abort(&mut self) -> Result<(), SpeechInputError>;

    fn is_listening(&self) -> bool;
}

// ---------------------------------------------------------------------------
// ListeningCycle
// ---------------------------------------------------------------------------

/// Collects the final transcript of one listening cycle.
///
/// ```
/// use savora_cook::speech::{CycleId, ListeningCycle};
///
/// let mut cycle = ListeningCycle::default();
/// cycle.begin(CycleId(1));
/// cycle.capture("next");
/// assert_eq!(cycle.finish().as_deref(), Some("next"));
/// assert_eq!(cycle.finish(), None);
/// assert!(cycle.owns(CycleId(1)));
/// ```
#[derive(Debug, Default)]
pub struct ListeningCycle {
    id: Option<CycleId>,
    active: bool,
    transcript: String,
}

impl ListeningCycle {
    pub fn begin(&mut self, id: CycleId) {
        self.id = Some(id);
        self.active = true;
        self.transcript.clear();
    }

    /// `true` if `id` is the most recently begun cycle.  Events of older
    /// cycles must be ignored.
    pub fn owns(&self, id: CycleId) -> bool {
        self.id == Some(id)
    }

    /// Append a final segment.  Ignored outside a cycle.
    pub fn capture(&mut self, text: &str) {
        if !self.active {
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(text);
    }

    /// Close the cycle.  Returns the transcript, or `None` when nothing was
    /// captured (silence) or no cycle was open.
    pub fn finish(&mut self) -> Option<String> {
        if !std::mem::replace(&mut self.active, false) {
            return None;
        }
        let transcript = std::mem::take(&mut self.transcript);
        (!transcript.is_empty()).then_some(transcript)
    }

    /// Close the cycle without a transcript.
    pub fn discard(&mut self) {
        self.active = false;
        self.transcript.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_cycle_yields_nothing() {
        let mut cycle = ListeningCycle::default();
        cycle.begin(CycleId(1));
        assert_eq!(cycle.finish(), None);
        assert!(!cycle.is_active());
    }

    #[test]
    fn blank_segments_are_ignored() {
        let mut cycle = ListeningCycle::default();
        cycle.begin(CycleId(1));
        cycle.capture("   ");
        assert_eq!(cycle.finish(), None);
    }

    #[test]
    fn segments_are_joined() {
        let mut cycle = ListeningCycle::default();
        cycle.begin(CycleId(1));
        cycle.capture("go to");
        cycle.capture(" step 3 ");
        assert_eq!(cycle.finish().as_deref(), Some("go to step 3"));
    }

    #[test]
    fn capture_outside_cycle_is_dropped() {
        let mut cycle = ListeningCycle::default();
        cycle.capture("next");
        cycle.begin(CycleId(1));
        assert_eq!(cycle.finish(), None);
    }

    #[test]
    fn discarded_cycle_never_delivers() {
        let mut cycle = ListeningCycle::default();
        cycle.begin(CycleId(1));
        cycle.capture("next");
        cycle.discard();
        assert_eq!(cycle.finish(), None);
    }

    #[test]
    fn begin_resets_previous_transcript() {
        let mut cycle = ListeningCycle::default();
        cycle.begin(CycleId(1));
        cycle.capture("repeat");
        cycle.begin(CycleId(2));
        cycle.capture("next");
        assert_eq!(cycle.finish().as_deref(), Some("next"));
    }

    #[test]
    fn only_the_latest_cycle_is_owned() {
        let mut cycle = ListeningCycle::default();
        assert!(!cycle.owns(CycleId(1)));

        cycle.begin(CycleId(1));
        cycle.discard();
        cycle.begin(CycleId(2));

        assert!(!cycle.owns(CycleId(1)));
        assert!(cycle.owns(CycleId(2)));
        assert!(cycle.is_active());
    }

    #[test]
    fn error_classification() {
        assert!(RecognitionErrorKind::NoSpeech.is_expected());
        assert!(RecognitionErrorKind::NotAllowed.is_expected());
        assert!(!RecognitionErrorKind::AudioCapture.is_expected());
        assert_eq!(
            RecognitionErrorKind::from_code("bad-grammar"),
            RecognitionErrorKind::Other("bad-grammar".into())
        );
    }
}
