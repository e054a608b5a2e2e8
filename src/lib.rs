//! Savora — voice-guided, hands-free cooking sessions.
//!
//! * [`recipe`] — recipe loading.
//! * [`session`] — the session controller, its state machine and timers.
//! * [`interpreter`] — maps an utterance plus recipe context to a reply.
//! * [`speech`] — speech input/output adapters.
//! * [`config`] — settings and application paths.

pub mod config;
pub mod interpreter;
pub mod recipe;
pub mod session;
pub mod speech;
