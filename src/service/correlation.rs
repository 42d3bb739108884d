use crate::domain::payment::{PaymentOutcome, PaymentRequest};
use crate::error::AdmissionError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Producer half of a pending payment outcome.
pub type PendingOutcome = oneshot::Sender<PaymentOutcome>;

/// Consumer half, held by the admitting caller.
pub type OutcomeReceiver = oneshot::Receiver<PaymentOutcome>;

/// Handle returned to the admitting caller. `ticket` identifies this
/// particular registration so that abandoning it never removes a later
/// registration of the same correlation id.
#[derive(Debug)]
pub struct Waiter {
    pub ticket: u64,
    pub receiver: OutcomeReceiver,
}

/// A queued payment together with the registration it resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmittedPayment {
    pub ticket: u64,
    pub request: PaymentRequest,
}

struct PendingEntry {
    ticket: u64,
    tx: PendingOutcome,
}

/// Correlation id -> single-assignment outcome slot.
///
/// An entry lives from admission until it is resolved by a worker or taken
/// back by the admission path. Whoever removes the entry owns the only
/// `Sender`, so an id can be resolved at most once.
#[derive(Default)]
pub struct CorrelationTable {
    pending: DashMap<String, PendingEntry>,
    next_ticket: AtomicU64,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, correlation_id: &str) -> Result<Waiter, AdmissionError> {
        match self.pending.entry(correlation_id.to_string()) {
            Entry::Occupied(_) => Err(AdmissionError::DuplicateCorrelationId(
                correlation_id.to_string(),
            )),
            Entry::Vacant(slot) => {
                let (tx, receiver) = oneshot::channel();
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                slot.insert(PendingEntry { ticket, tx });
                Ok(Waiter { ticket, receiver })
            }
        }
    }

    /// Fulfils the entry for `outcome.correlation_id` if it is still the
    /// registration identified by `ticket`. Returns `false` when the id is
    /// unknown, already resolved, abandoned, or re-registered since.
    pub fn resolve(&self, ticket: u64, outcome: PaymentOutcome) -> bool {
        match self
            .pending
            .remove_if(&outcome.correlation_id, |_, entry| entry.ticket == ticket)
        {
            Some((_, entry)) => entry.tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Removes the entry without resolving it.
    pub fn take(&self, correlation_id: &str) -> Option<PendingOutcome> {
        self.pending.remove(correlation_id).map(|(_, entry)| entry.tx)
    }

    /// Removes the entry only if it still belongs to `ticket`.
    pub fn abandon(&self, correlation_id: &str, ticket: u64) -> bool {
        self.pending
            .remove_if(correlation_id, |_, entry| entry.ticket == ticket)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
