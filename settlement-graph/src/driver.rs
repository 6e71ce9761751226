//! Fixed-point reduction driver
//!
//! Scans the graph in passes. Each pass visits every party that is both a
//! debtor and a creditor and collapses one chain through it. Passes repeat
//! until one makes no progress, at which point every party is either a pure
//! debtor or a pure creditor.
//!
//! # Selection
//!
//! When a midpoint has several borrowers or lenders, which one is picked is
//! not part of the contract. The ordered adjacency maps make the choice the
//! smallest [`PartyId`](crate::PartyId), which keeps runs reproducible.
//!
//! # Termination
//!
//! Every collapse lowers the total outstanding amount by the absorbed edge's
//! amount, and netting a crossed pair lowers it by twice the smaller side.
//! Amounts are positive integers, so the number of steps is bounded by the
//! initial total. The driver checks this decrease on every step.

use crate::{
    config::ReductionConfig,
    edge_store::EdgeStore,
    reducer::TripletReducer,
    types::Triplet,
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// Summary of a reduction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionReport {
    /// Passes that changed the graph
    pub passes: usize,

    /// Passes performed, including the final one that found nothing to do
    pub scans: usize,

    /// Triplets collapsed
    pub triplets_collapsed: usize,

    /// Two-party cycles netted by the driver itself
    pub crossed_pairs_resolved: usize,
}

impl ReductionReport {
    /// Whether the graph was already at a fixed point
    pub fn was_noop(&self) -> bool {
        self.passes == 0
    }
}

/// Drives an [`EdgeStore`] to its fixed point
#[derive(Debug, Clone, Default)]
pub struct ReductionDriver {
    config: ReductionConfig,
}

impl ReductionDriver {
    /// Create a driver
    pub fn new(config: ReductionConfig) -> Self {
        Self { config }
    }

    /// Reduce `store` in place until no chain remains
    pub fn reduce(&self, store: &mut EdgeStore) -> Result<ReductionReport> {
        if self.config.verify_invariants {
            store.check_invariants()?;
        }

        let mut report = ReductionReport::default();
        let edges_before = store.edge_count();

        loop {
            report.scans += 1;
            if !self.run_pass(store, &mut report)? {
                break;
            }
            report.passes += 1;

            // only productive passes count against the cap
            if let Some(max_passes) = self.config.max_passes {
                if report.passes > max_passes {
                    tracing::warn!(max_passes, "Reduction pass limit exceeded");
                    return Err(Error::PassLimitExceeded {
                        passes: report.passes,
                    });
                }
            }
        }

        if self.config.verify_invariants {
            store.check_reduced_invariants()?;
        }

        tracing::info!(
            passes = report.passes,
            collapsed = report.triplets_collapsed,
            edges_before,
            edges_after = store.edge_count(),
            "Reduction reached fixed point"
        );
        Ok(report)
    }

    /// One scan over the current midpoints; returns whether anything changed
    fn run_pass(&self, store: &mut EdgeStore, report: &mut ReductionReport) -> Result<bool> {
        let mut progress = false;

        for lender in store.midpoints() {
            // earlier steps in this pass may have emptied one side
            let (borrower, lenders_lender) = match (
                store.borrowers_of(&lender).next(),
                store.lenders_of(&lender).next(),
            ) {
                (Some((borrower, _)), Some((lenders_lender, _))) => {
                    (borrower.clone(), lenders_lender.clone())
                }
                _ => continue,
            };

            let total_before = store.total_amount()?;

            if borrower == lenders_lender {
                store.resolve_crossed_pair(&lender, &borrower)?;
                report.crossed_pairs_resolved += 1;
            } else {
                TripletReducer::new(store).collapse(&Triplet {
                    borrower,
                    lender,
                    lenders_lender,
                })?;
                report.triplets_collapsed += 1;
            }

            let total_after = store.total_amount()?;
            if total_after >= total_before {
                return Err(Error::InvariantViolation(format!(
                    "reduction step did not lower total outstanding ({} -> {})",
                    total_before, total_after
                )));
            }
            progress = true;
        }

        Ok(progress)
    }
}
