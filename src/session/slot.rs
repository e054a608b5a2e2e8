//! Single-slot request correlation.
//!
//! At most one interpreter call is outstanding per session.  Each call is
//! tagged with a [`RequestTicket`]; a reply is accepted only if it carries
//! the ticket currently held by the slot, so replies that arrive after the
//! session was ended (or restarted) are dropped.

use thiserror::Error;

/// Correlation id of one interpreter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request {0:?} still outstanding")]
pub struct SlotBusy(pub RequestTicket);

/// Holds the one outstanding [`RequestTicket`].
///
/// ```
/// use savora_cook::session::RequestSlot;
///
/// let mut slot = RequestSlot::new();
/// let ticket = slot.acquire().unwrap();
/// assert!(slot.acquire().is_err());
/// assert!(slot.complete(ticket));
/// assert!(!slot.is_busy());
/// ```
#[derive(Debug, Default)]
pub struct RequestSlot {
    issued: u64,
    outstanding: Option<RequestTicket>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, or report the one still outstanding.
    pub fn acquire(&mut self) -> Result<RequestTicket, SlotBusy> {
        if let Some(ticket) = self.outstanding {
            return Err(SlotBusy(ticket));
        }
        self.issued += 1;
        let ticket = RequestTicket(self.issued);
        self.outstanding = Some(ticket);
        Ok(ticket)
    }

    /// Release the slot if `ticket` is the outstanding one.
    pub fn complete(&mut self, ticket: RequestTicket) -> bool {
        if self.outstanding == Some(ticket) {
            self.outstanding = None;
            true
        } else {
            false
        }
    }

    /// Forget the outstanding ticket; its reply will be rejected.
    pub fn clear(&mut self) {
        self.outstanding = None;
    }

    pub fn is_busy(&self) -> bool {
        self.outstanding.is_some()
    }
}
