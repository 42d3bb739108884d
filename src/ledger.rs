use crate::domain::payment::{Backend, PaymentOutcome, PaymentSummary};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub correlation_id: String,
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
}

/// Append-only record of successful payments, one book per processor.
///
/// Owned by the payment service and handed to the dispatcher; nothing is ever
/// removed for the lifetime of the process.
#[derive(Debug, Default)]
pub struct Ledger {
    default: RwLock<Vec<LedgerEntry>>,
    fallback: RwLock<Vec<LedgerEntry>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn book(&self, backend: Backend) -> &RwLock<Vec<LedgerEntry>> {
        match backend {
            Backend::Default => &self.default,
            Backend::Fallback => &self.fallback,
        }
    }

    pub fn append(&self, backend: Backend, outcome: &PaymentOutcome) {
        self.book(backend).write().push(LedgerEntry {
            correlation_id: outcome.correlation_id.clone(),
            amount: outcome.amount,
            requested_at: outcome.requested_at,
        });
    }

    /// Count and total of entries whose `requested_at` lies within the
    /// inclusive `[from, to]` range; a missing bound is open.
    pub fn query(
        &self,
        backend: Backend,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> PaymentSummary {
        let book = self.book(backend).read();
        book.iter()
            .filter(|e| from.map_or(true, |f| e.requested_at >= f))
            .filter(|e| to.map_or(true, |t| e.requested_at <= t))
            .fold(PaymentSummary::default(), |mut acc, e| {
                acc.total_requests += 1;
                acc.total_amount += e.amount;
                acc
            })
    }

    #[cfg(test)]
    pub fn entries(&self, backend: Backend) -> Vec<LedgerEntry> {
        self.book(backend).read().clone()
    }
}
