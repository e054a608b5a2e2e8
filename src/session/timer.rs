//! Auto-advance timer.
//!
//! After an instruction has been read aloud the session waits a dwell period
//! for the user to speak; if nobody does, it behaves as if the user had said
//! "next".  At most one fire is pending.  Each arm bumps a generation number
//! and the fire event carries it, so a fire that raced with a cancel (the
//! task already posted its event) is recognised as stale and dropped.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::{SessionEvent, SessionHandle};

/// Dwell time after an instruction before auto-advancing.
pub const DEFAULT_AUTO_ADVANCE: Duration = Duration::from_millis(7_000);

#[derive(Debug)]
struct PendingFire {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Debug)]
pub struct AutoAdvanceTimer {
    delay: Duration,
    generation: u64,
    pending: Option<PendingFire>,
}

impl AutoAdvanceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending fire with a new one `delay` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, handle: &SessionHandle) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let delay = self.delay;
        let handle = handle.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.send(SessionEvent::AutoAdvance { generation });
        });

        log::debug!("timer: armed auto-advance #{generation} ({delay:?})");
        self.pending = Some(PendingFire { generation, task });
        generation
    }

    /// Cancel the pending fire.  Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.task.abort();
                log::debug!("timer: cancelled auto-advance #{}", pending.generation);
                true
            }
            None => false,
        }
    }

    /// Accept a fire event.  Only the currently pending generation counts.
    pub fn fire(&mut self, generation: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.generation == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for AutoAdvanceTimer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_ADVANCE)
    }
}

impl Drop for AutoAdvanceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::channel;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (handle, mut inbox) = channel().into_parts();
        let mut timer = AutoAdvanceTimer::default();

        let started = tokio::time::Instant::now();
        let generation = timer.arm(&handle);

        let event = inbox.recv().await;
        assert!(matches!(
            event,
            Some(SessionEvent::AutoAdvance { generation: g }) if g == generation
        ));
        assert!(started.elapsed() >= DEFAULT_AUTO_ADVANCE);

        assert!(timer.fire(generation));
        assert!(!timer.fire(generation));
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (handle, mut inbox) = channel().into_parts();
        let mut timer = AutoAdvanceTimer::new(Duration::from_secs(7));

        timer.arm(&handle);
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(inbox.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_pending_fire() {
        let (handle, mut inbox) = channel().into_parts();
        let mut timer = AutoAdvanceTimer::new(Duration::from_secs(7));

        let first = timer.arm(&handle);
        tokio::time::sleep(Duration::from_secs(5)).await;
        let second = timer.arm(&handle);
        assert_ne!(first, second);

        tokio::time::sleep(Duration::from_secs(30)).await;

        let mut fired = Vec::new();
        while let Some(SessionEvent::AutoAdvance { generation }) = inbox.try_recv() {
            fired.push(generation);
        }
        assert_eq!(fired, vec![second]);
        assert!(!timer.fire(first));
        assert!(timer.fire(second));
    }

    #[tokio::test]
    async fn stale_generation_is_rejected() {
        let (handle, _inbox) = channel().into_parts();
        let mut timer = AutoAdvanceTimer::default();

        let stale = timer.arm(&handle);
        timer.cancel();
        assert!(!timer.fire(stale));

        let live = timer.arm(&handle);
        assert!(!timer.fire(stale));
        assert!(timer.fire(live));
    }
}
