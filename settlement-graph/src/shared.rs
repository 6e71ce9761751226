//! Thread-safe handle around an [`EdgeStore`]
//!
//! The graph and its transpose must never be seen out of sync, and
//! netting a crossed pair touches four map slots at once. A single
//! exclusive lock therefore guards the whole store; every operation,
//! including a full reduction, holds it for its entire duration.

use crate::{
    builder::validate_expense,
    config::ReductionConfig,
    driver::{ReductionDriver, ReductionReport},
    edge_store::EdgeStore,
    types::{Amount, Expense, PartyId, SettledGraph},
    Error, Result,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable, lock-guarded edge store
#[derive(Debug, Clone, Default)]
pub struct SharedEdgeStore {
    inner: Arc<Mutex<EdgeStore>>,
}

impl SharedEdgeStore {
    /// Take ownership of a built store
    pub fn new(store: EdgeStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Fold one more expense into the graph
    ///
    /// Like [`GraphBuilder`](crate::GraphBuilder), the total outstanding
    /// amount across all edges must stay within [`Amount`].
    pub fn record_expense(&self, expense: &Expense) -> Result<()> {
        validate_expense(expense)?;

        let overflow = || Error::AmountOverflow {
            borrower: expense.borrower.clone(),
            lender: expense.lender.clone(),
        };

        let mut store = self.inner.lock();
        store
            .total_amount()?
            .checked_add(expense.amount)
            .ok_or_else(overflow)?;
        let running = store
            .amount(&expense.borrower, &expense.lender)
            .checked_add(expense.amount)
            .ok_or_else(overflow)?;
        store.reset_edge(&expense.borrower, &expense.lender, running)
    }

    /// Amount `borrower` owes `lender`
    pub fn amount(&self, borrower: &PartyId, lender: &PartyId) -> Amount {
        self.inner.lock().amount(borrower, lender)
    }

    /// Delete an edge
    pub fn prune_edge(&self, borrower: &PartyId, lender: &PartyId) {
        self.inner.lock().prune_edge(borrower, lender);
    }

    /// Overwrite an edge
    pub fn reset_edge(
        &self,
        borrower: &PartyId,
        lender: &PartyId,
        new_amount: Amount,
    ) -> Result<()> {
        self.inner.lock().reset_edge(borrower, lender, new_amount)
    }

    /// Net a bidirectional pair
    pub fn resolve_crossed_pair(&self, a: &PartyId, b: &PartyId) -> Result<bool> {
        self.inner.lock().resolve_crossed_pair(a, b)
    }

    /// Reduce under the lock
    pub fn reduce(&self, config: ReductionConfig) -> Result<ReductionReport> {
        let mut store = self.inner.lock();
        ReductionDriver::new(config).reduce(&mut *store)
    }

    /// Copy of the current borrower -> lender graph
    pub fn snapshot(&self) -> SettledGraph {
        self.inner.lock().graph().clone()
    }

    /// Run `f` against a consistent view of the store
    pub fn with_store<R>(&self, f: impl FnOnce(&EdgeStore) -> R) -> R {
        let store = self.inner.lock();
        f(&*store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_recording_keeps_mirrors_in_sync() {
        let shared = SharedEdgeStore::default();

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        let borrower = format!("P{}", (worker + i) % 5);
                        let lender = format!("P{}", (worker + i + 1) % 5);
                        shared
                            .record_expense(&Expense::new(borrower, lender, 1 + i as Amount))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        shared.with_store(|store| store.check_invariants()).unwrap();
        let total = shared.with_store(EdgeStore::total_amount).unwrap();
        assert_eq!(total, 4 * (1..=50).sum::<Amount>());

        let report = shared.reduce(ReductionConfig::default()).unwrap();
        assert!(report.scans >= 1);
        shared
            .with_store(|store| store.check_reduced_invariants())
            .unwrap();
    }

    #[test]
    fn test_record_rejects_invalid_expense() {
        let shared = SharedEdgeStore::default();
        assert!(shared.record_expense(&Expense::new("A", "B", 0)).is_err());
        assert!(shared.snapshot().is_empty());
    }

    #[test]
    fn test_record_rejects_total_overflow() {
        let shared = SharedEdgeStore::default();
        shared
            .record_expense(&Expense::new("A", "B", Amount::MAX))
            .unwrap();

        let result = shared.record_expense(&Expense::new("B", "C", Amount::MAX));
        assert!(matches!(result, Err(Error::AmountOverflow { .. })));
        assert_eq!(shared.snapshot().len(), 1);

        let report = shared.reduce(ReductionConfig::default()).unwrap();
        assert!(report.was_noop());
        assert_eq!(shared.amount(&PartyId::new("A"), &PartyId::new("B")), Amount::MAX);
    }

    #[test]
    fn test_reduce_reports_overflowing_store() {
        let shared = SharedEdgeStore::default();
        let (a, b, c) = (PartyId::new("A"), PartyId::new("B"), PartyId::new("C"));
        shared.reset_edge(&a, &b, Amount::MAX).unwrap();
        shared.reset_edge(&b, &c, Amount::MAX).unwrap();

        let result = shared.reduce(ReductionConfig::default());
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_edge_operations() {
        let shared = SharedEdgeStore::default();
        let (a, b) = (PartyId::new("A"), PartyId::new("B"));

        shared.reset_edge(&a, &b, 9).unwrap();
        shared.reset_edge(&b, &a, 4).unwrap();
        assert!(shared.resolve_crossed_pair(&a, &b).unwrap());
        assert_eq!(shared.amount(&a, &b), 5);

        shared.prune_edge(&a, &b);
        assert!(shared.snapshot().is_empty());
    }
}
