//! Cooking session controller — drives the hands-free walkthrough.
//!
//! [`CookingSession`] owns the [`SessionState`], the speech adapters and the
//! interpreter, and reacts to [`SessionEvent`]s one at a time.
//!
//! # Exchange flow
//!
//! ```text
//! utterance ─▶ "pause" / "resume" ─▶ answered locally
//!           └▶ RequestSlot::acquire ─▶ spawn interpreter call      [Thinking]
//!                 InterpreterReply ─▶ validate nextStep, update step
//!                                  └▶ SpeechOutput::speak           [Speaking]
//!                 SynthesisEvent::Ended
//!                   ├─ final reply    ─▶ stay quiet
//!                   └─ otherwise      ─▶ SpeechInput::start_listening  [Listening]
//!                        └─ instruction echo ─▶ AutoAdvanceTimer::arm
//! ```
//!
//! Failures never leave the session half-updated: an interpreter error keeps
//! the step and speaks a retry message, adapter errors become a warning on
//! the [`SharedSnapshot`].

use std::ops::ControlFlow;
use std::sync::{Arc, PoisonError};

use thiserror::Error;

use crate::config::SessionConfig;
use crate::interpreter::offline::normalise;
use crate::interpreter::{
    InstructionInterpreter, InstructionRequest, InstructionResponse, InterpreterError,
};
use crate::recipe::Recipe;
use crate::speech::{
    CycleId, ListeningCycle, RecognitionEvent, SpeakOptions, SpeechInput, SpeechOutput,
    SynthesisEvent, UtteranceId,
};

use super::slot::{RequestSlot, RequestTicket};
use super::state::{
    new_shared_snapshot, resolve_step, SessionSnapshot, SessionState, SessionStatus,
    SharedSnapshot, StepTarget, Transition, TransitionError,
};
use super::timer::AutoAdvanceTimer;
use super::{SessionChannel, SessionEvent, SessionHandle, SessionInbox, UserCommand};

/// Synthetic query sent when the session starts.
pub const START_QUERY: &str = "start cooking";
/// Synthetic query sent when the auto-advance timer fires.
pub const AUTO_ADVANCE_QUERY: &str = "next";
/// Query used by [`CookingSession::repeat`].
pub const REPEAT_QUERY: &str = "repeat";

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Why an operation was refused.  Refusals never change session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a cooking session is already running")]
    AlreadyActive,
    #[error("no cooking session is running")]
    NotActive,
    #[error("still working on the previous request")]
    Busy,
}

impl From<TransitionError> for SessionError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadyActive => SessionError::AlreadyActive,
            TransitionError::NotActive => SessionError::NotActive,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingUtterance {
    id: UtteranceId,
    options: SpeakOptions,
}

// ---------------------------------------------------------------------------
// CookingSession
// ---------------------------------------------------------------------------

/// Voice-driven walkthrough of one recipe.
///
/// Create with [`CookingSession::new`], then either call [`run`](Self::run)
/// inside a tokio task or drive it event by event with
/// [`pump`](Self::pump).  The session keeps a sender to its own inbox, so
/// `run` returns only after a [`SessionEvent::Shutdown`].
///
/// Operations that reach the interpreter or arm the auto-advance timer spawn
/// tokio tasks.  Must be driven from within a tokio runtime.
pub struct CookingSession {
    recipe: Recipe,
    config: SessionConfig,
    state: SessionState,
    interpreter: Arc<dyn InstructionInterpreter>,
    input: Box<dyn SpeechInput>,
    output: Box<dyn SpeechOutput>,
    cycle: ListeningCycle,
    speaking: Option<PendingUtterance>,
    slot: RequestSlot,
    timer: AutoAdvanceTimer,
    handle: SessionHandle,
    inbox: SessionInbox,
    snapshot: SharedSnapshot,
}

impl CookingSession {
    /// Create an idle session.
    ///
    /// * `recipe`      — instructions are fixed for the session's lifetime.
    /// * `interpreter` — e.g. `ApiInterpreter` or `OfflineInterpreter`.
    /// * `input`, `output` — speech adapters posting into `channel`.
    pub fn new(
        recipe: Recipe,
        config: SessionConfig,
        interpreter: Arc<dyn InstructionInterpreter>,
        input: Box<dyn SpeechInput>,
        output: Box<dyn SpeechOutput>,
        channel: SessionChannel,
    ) -> Self {
        let (handle, inbox) = channel.into_parts();
        Self {
            state: SessionState::new(recipe.len()),
            timer: AutoAdvanceTimer::new(config.auto_advance_delay()),
            recipe,
            config,
            interpreter,
            input,
            output,
            cycle: ListeningCycle::default(),
            speaking: None,
            slot: RequestSlot::new(),
            handle,
            inbox,
            snapshot: new_shared_snapshot(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> SharedSnapshot {
        Arc::clone(&self.snapshot)
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step()
    }

    pub fn is_thinking(&self) -> bool {
        self.slot.is_busy()
    }

    pub fn auto_advance_pending(&self) -> bool {
        self.timer.is_pending()
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Process events until shutdown, then tear the session down.
    pub async fn run(mut self) {
        log::info!("session: ready for {:?}", self.recipe.title());
        while self.pump().await {}
        self.end();
        log::info!("session: event loop stopped");
    }

    /// Wait for and process one event.  Returns `false` on shutdown.
    pub async fn pump(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(event) => self.dispatch(event).is_continue(),
            None => false,
        }
    }

    /// Process one event if one is queued.
    ///
    /// Returns `None` when the inbox was empty, otherwise the result of
    /// [`dispatch`](Self::dispatch) (`Break` on shutdown).
    pub fn try_pump(&mut self) -> Option<ControlFlow<()>> {
        self.inbox.try_recv().map(|event| self.dispatch(event))
    }

    /// Apply one event.
    pub fn dispatch(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Command(command) => self.on_command(command),
            SessionEvent::Recognition { cycle, event } => self.on_recognition(cycle, event),
            SessionEvent::Synthesis(event) => self.on_synthesis(event),
            SessionEvent::InterpreterReply { ticket, result } => {
                self.on_interpreter_reply(ticket, result)
            }
            SessionEvent::AutoAdvance { generation } => self.on_auto_advance(generation),
            SessionEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Begin the walkthrough at step 0 and ask the interpreter to read it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.state.apply(Transition::Start)?;
        log::info!(
            "session: started {:?} ({} steps)",
            self.recipe.title(),
            self.recipe.len()
        );
        self.update(|s| {
            s.active = true;
            s.step = 0;
            s.warning = None;
            s.last_query = None;
            s.last_response = None;
        });
        self.submit(START_QUERY)
    }

    /// Handle one finalized utterance.
    ///
    /// Refused while idle or while the previous utterance is still with the
    /// interpreter.  Must be called from within a tokio runtime.
    pub fn handle_utterance(&mut self, query: &str) -> Result<(), SessionError> {
        if !self.state.is_active() {
            return Err(SessionError::NotActive);
        }
        if self.slot.is_busy() {
            log::warn!("session: ignoring {query:?} while thinking");
            return Err(SessionError::Busy);
        }

        self.timer.cancel();

        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        match normalise(query).as_str() {
            "pause" => {
                log::debug!("session: pause");
                self.update(|s| s.last_query = Some(query.to_string()));
                let message = self.config.pause_message.clone();
                self.speak(message, SpeakOptions::default());
                Ok(())
            }
            "resume" => {
                log::debug!("session: resume at step {}", self.state.current_step());
                self.update(|s| s.last_query = Some(query.to_string()));
                let text = self.current_instruction();
                let is_instruction_echo = self.recipe.is_instruction(&text);
                self.speak(
                    text,
                    SpeakOptions {
                        is_final: false,
                        is_instruction_echo,
                    },
                );
                Ok(())
            }
            _ => self.submit(query),
        }
    }

    /// Read the current step again.  Interrupts playback like [`say`](Self::say).
    pub fn repeat(&mut self) -> Result<(), SessionError> {
        self.say(REPEAT_QUERY)
    }

    /// Typed or pushed utterance: interrupt playback, then handle it.
    ///
    /// Refusals leave playback, listening and the timer untouched.
    pub fn say(&mut self, text: &str) -> Result<(), SessionError> {
        if !self.state.is_active() {
            return Err(SessionError::NotActive);
        }
        if self.slot.is_busy() {
            log::warn!("session: ignoring {text:?} while thinking");
            return Err(SessionError::Busy);
        }
        self.timer.cancel();
        self.cancel_speech();
        self.abort_listening();
        self.handle_utterance(text)
    }

    /// Open a listening cycle.  Interrupts playback and cancels any pending
    /// auto-advance.  No-op when already listening or idle.
    pub fn start_listening(&mut self) {
        if !self.state.is_active() || self.input.is_listening() {
            return;
        }

        self.timer.cancel();
        self.cancel_speech();

        match self.input.start_listening() {
            Ok(cycle) => {
                log::debug!("session: listening ({cycle})");
                self.cycle.begin(cycle);
                self.set_status(SessionStatus::Listening);
            }
            Err(e) => {
                log::warn!("session: cannot start listening: {e}");
                self.update(|s| {
                    s.warning = Some(e.to_string());
                    s.status = SessionStatus::ReadyForCommand;
                });
            }
        }
    }

    /// Stop everything and return to idle at step 0.
    ///
    /// Each teardown step runs even if an earlier one fails.
    pub fn end(&mut self) {
        self.timer.cancel();

        self.speaking = None;
        if let Err(e) = self.output.cancel() {
            log::warn!("session: failed to cancel speech: {e}");
        }

        self.abort_listening();

        self.slot.clear();
        let was_active = self.state.is_active();
        let _ = self.state.apply(Transition::End);
        self.update(|s| {
            s.active = false;
            s.step = 0;
            s.status = SessionStatus::Idle;
            s.interim_transcript = None;
        });

        if was_active {
            log::info!("session: ended");
        }
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn on_command(&mut self, command: UserCommand) {
        let result = match command {
            UserCommand::Start => self.start(),
            UserCommand::Repeat => self.repeat(),
            UserCommand::Say(text) => self.say(&text),
            UserCommand::Listen => {
                self.start_listening();
                Ok(())
            }
            UserCommand::End => {
                self.end();
                Ok(())
            }
        };

        if let Err(e) = result {
            log::info!("session: command refused: {e}");
            self.update(|s| s.warning = Some(e.to_string()));
        }
    }

    fn on_recognition(&mut self, cycle: CycleId, event: RecognitionEvent) {
        if !self.cycle.owns(cycle) {
            log::trace!("session: ignoring {event:?} for superseded {cycle}");
            return;
        }

        match event {
            RecognitionEvent::SpeechDetected => {
                // The user is talking; never auto-advance over them.
                self.timer.cancel();
            }
            RecognitionEvent::Interim(text) => {
                self.update(|s| s.interim_transcript = Some(text));
            }
            RecognitionEvent::Final(text) => self.cycle.capture(&text),
            RecognitionEvent::Error(kind) if kind.is_expected() => {
                log::debug!("session: recognition ended: {kind}");
            }
            RecognitionEvent::Error(kind) => {
                log::warn!("session: recognition error: {kind}");
                self.update(|s| s.warning = Some(format!("Speech recognition problem: {kind}")));
            }
            RecognitionEvent::Ended => {
                self.update(|s| s.interim_transcript = None);
                let transcript = self.cycle.finish();

                if self.status() == SessionStatus::Listening {
                    self.set_status(if self.state.is_active() {
                        SessionStatus::ReadyForCommand
                    } else {
                        SessionStatus::Idle
                    });
                }

                if let Some(text) = transcript {
                    log::debug!("session: heard {text:?}");
                    if let Err(e) = self.handle_utterance(&text) {
                        log::debug!("session: utterance {text:?} dropped: {e}");
                    }
                }
            }
        }
    }

    fn on_synthesis(&mut self, event: SynthesisEvent) {
        let is_current = self.speaking.is_some_and(|p| p.id == event.id());
        if !is_current {
            log::trace!("session: ignoring {event:?} for superseded utterance");
            return;
        }

        match event {
            SynthesisEvent::Started(_) => self.set_status(SessionStatus::Speaking),
            SynthesisEvent::Ended(_) => {
                if let Some(pending) = self.speaking.take() {
                    self.after_utterance(pending.options);
                }
            }
            SynthesisEvent::Error(_, kind) if kind.is_expected() => {
                log::debug!("session: playback stopped: {kind}");
                self.speaking = None;
            }
            SynthesisEvent::Error(_, kind) => {
                log::warn!("session: playback error: {kind}");
                self.update(|s| s.warning = Some(format!("Speech playback problem: {kind}")));
                if let Some(pending) = self.speaking.take() {
                    self.after_utterance(pending.options);
                }
            }
        }
    }

    fn on_interpreter_reply(
        &mut self,
        ticket: RequestTicket,
        result: Result<InstructionResponse, InterpreterError>,
    ) {
        if !self.slot.complete(ticket) {
            log::debug!("session: dropping stale reply #{}", ticket.id());
            return;
        }
        if !self.state.is_active() {
            return;
        }

        match result {
            Ok(response) => self.apply_response(response),
            Err(e) => {
                log::warn!("session: interpreter failed: {e}");
                let message = self.config.retry_message.clone();
                self.update(|s| s.warning = Some(message.clone()));
                self.speak(message, SpeakOptions::default());
            }
        }
    }

    fn on_auto_advance(&mut self, generation: u64) {
        if !self.timer.fire(generation) {
            log::debug!("session: ignoring stale auto-advance #{generation}");
            return;
        }
        if !self.state.is_active() || self.slot.is_busy() {
            return;
        }

        log::info!(
            "session: no input for {:?}, advancing",
            self.timer.delay()
        );
        self.abort_listening();
        if let Err(e) = self.handle_utterance(AUTO_ADVANCE_QUERY) {
            log::debug!("session: auto-advance dropped: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Send `query` to the interpreter in a spawned task.
    fn submit(&mut self, query: &str) -> Result<(), SessionError> {
        let ticket = self.slot.acquire().map_err(|_| SessionError::Busy)?;
        let request = self.build_request(query);

        log::debug!(
            "session: request #{} at step {}: {:?}",
            ticket.id(),
            request.current_step,
            request.user_query
        );
        self.update(|s| {
            s.last_query = Some(query.to_string());
            s.status = SessionStatus::Thinking;
        });

        let interpreter = Arc::clone(&self.interpreter);
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let result = interpreter.interpret(&request).await;
            handle.send(SessionEvent::InterpreterReply { ticket, result });
        });
        Ok(())
    }

    fn apply_response(&mut self, response: InstructionResponse) {
        let text = match response.response_text.trim() {
            "" => self.config.not_understood_message.clone(),
            text => text.to_string(),
        };

        let current = self.state.current_step();
        if resolve_step(response.next_step, self.recipe.len()) == StepTarget::Invalid {
            log::warn!(
                "session: interpreter proposed step {} of {}; staying on {current}",
                response.next_step,
                self.recipe.len()
            );
        }

        // Active is checked by the caller, so Navigate cannot be refused.
        let _ = self.state.apply(Transition::Navigate(response.next_step));

        if self.state.is_active() {
            let step = self.state.current_step();
            self.update(|s| {
                s.step = step;
                s.warning = None;
            });
            let is_instruction_echo = self.recipe.is_instruction(&text);
            self.speak(
                text,
                SpeakOptions {
                    is_final: false,
                    is_instruction_echo,
                },
            );
        } else {
            log::info!("session: finished {:?}", self.recipe.title());
            self.timer.cancel();
            self.abort_listening();
            self.update(|s| {
                s.active = false;
                s.step = 0;
                s.warning = None;
                s.interim_transcript = None;
            });
            self.speak(
                text,
                SpeakOptions {
                    is_final: true,
                    is_instruction_echo: false,
                },
            );
        }
    }

    /// Play `text`, replacing whatever is playing.
    fn speak(&mut self, text: String, options: SpeakOptions) {
        self.cancel_speech();
        self.update(|s| s.last_response = Some(text.clone()));

        match self.output.speak(&text) {
            Ok(id) => {
                self.speaking = Some(PendingUtterance { id, options });
            }
            Err(e) => {
                log::warn!("session: cannot speak: {e}");
                self.update(|s| s.warning = Some(e.to_string()));
                self.after_utterance(options);
            }
        }
    }

    /// Close the open listening cycle without a transcript.
    fn abort_listening(&mut self) {
        self.cycle.discard();
        if self.input.is_listening() {
            if let Err(e) = self.input.abort() {
                log::warn!("session: failed to abort listening: {e}");
            }
        }
    }

    fn cancel_speech(&mut self) {
        if self.speaking.take().is_some() {
            if let Err(e) = self.output.cancel() {
                log::warn!("session: failed to cancel speech: {e}");
            }
        }
    }

    /// Hands-free loop: resume listening after a reply unless it was final.
    fn after_utterance(&mut self, options: SpeakOptions) {
        if !self.state.is_active() {
            self.set_status(SessionStatus::Idle);
            return;
        }
        if options.is_final {
            self.set_status(SessionStatus::ReadyForCommand);
            return;
        }

        self.set_status(SessionStatus::ReadyForCommand);
        self.start_listening();

        if options.is_instruction_echo && self.config.auto_advance {
            self.timer.arm(&self.handle);
        }
    }

    fn build_request(&self, query: &str) -> InstructionRequest {
        InstructionRequest {
            recipe_title: self.recipe.title().to_string(),
            instructions: self.recipe.instructions().to_vec(),
            current_step: self.state.current_step(),
            current_instruction: self.current_instruction(),
            user_query: query.to_string(),
            language: self.config.language.clone(),
        }
    }

    fn current_instruction(&self) -> String {
        self.recipe
            .step(self.state.current_step())
            .map(str::to_string)
            .unwrap_or_else(|| self.config.start_of_recipe_message.clone())
    }

    fn status(&self) -> SessionStatus {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    fn set_status(&self, status: SessionStatus) {
        self.update(|s| s.status = status);
    }

    fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut snapshot);
    }
}

impl Drop for CookingSession {
    /// Release the speech engines even if `run` never completed.
    fn drop(&mut self) {
        self.end();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
