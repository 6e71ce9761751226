//! Triplet collapse
//!
//! Given a chain `borrower -> lender -> lenders_lender`, reroute debt around
//! the midpoint so the smaller of the two edges disappears:
//!
//! ```text
//! A owes B 10, B owes C 4     (cost diff = +6)
//!   => A owes C 4, A owes B 6
//!
//! A owes B 5, B owes C 10     (cost diff = -5)
//!   => A owes C 5, B owes C 5
//! ```
//!
//! Every party's net position is unchanged and the total outstanding
//! amount drops by the absorbed edge's amount.

use crate::{
    edge_store::EdgeStore,
    types::{Amount, PartyId, Triplet},
    Error, Result,
};

/// What a single collapse did to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseOutcome {
    /// Amount moved onto the direct borrower -> lenders_lender edge
    pub rerouted: Amount,

    /// Whether the merged edge had to be netted against a reverse edge
    pub crossed_pair_resolved: bool,
}

/// Collapses one chain at a time through an [`EdgeStore`]
#[derive(Debug)]
pub struct TripletReducer<'a> {
    store: &'a mut EdgeStore,
}

impl<'a> TripletReducer<'a> {
    /// Wrap a store
    pub fn new(store: &'a mut EdgeStore) -> Self {
        Self { store }
    }

    /// Collapse `triplet`, removing at least one of its two edges
    pub fn collapse(&mut self, triplet: &Triplet) -> Result<CollapseOutcome> {
        let Triplet {
            borrower,
            lender,
            lenders_lender,
        } = triplet;

        let first_leg = self.store.amount(borrower, lender);
        let second_leg = self.store.amount(lender, lenders_lender);
        if first_leg <= 0 || second_leg <= 0 {
            return Err(Error::InvariantViolation(format!(
                "triplet {} is not a chain ({} / {})",
                triplet, first_leg, second_leg
            )));
        }
        if borrower == lender || lender == lenders_lender || borrower == lenders_lender {
            return Err(Error::InvariantViolation(format!(
                "triplet {} repeats a party",
                triplet
            )));
        }

        let cost_diff = first_leg - second_leg;
        let rerouted = if cost_diff >= 0 { second_leg } else { first_leg };

        let merged = self
            .store
            .amount(borrower, lenders_lender)
            .checked_add(rerouted)
            .ok_or_else(|| {
                Error::InvariantViolation(format!("amount overflow collapsing {}", triplet))
            })?;
        self.store.reset_edge(borrower, lenders_lender, merged)?;
        let crossed_pair_resolved = self.store.resolve_crossed_pair(borrower, lenders_lender)?;

        if cost_diff >= 0 {
            self.store.reset_edge(borrower, lender, cost_diff)?;
            self.store.prune_edge(lender, lenders_lender);
        } else {
            self.store.reset_edge(lender, lenders_lender, cost_diff.abs())?;
            self.store.prune_edge(borrower, lender);
        }

        tracing::debug!(
            %triplet,
            first_leg,
            second_leg,
            rerouted,
            crossed_pair_resolved,
            "collapsed triplet"
        );

        Ok(CollapseOutcome {
            rerouted,
            crossed_pair_resolved,
        })
    }
}

/// Collapse a single chain named by its three parties
pub fn collapse_triplet(
    store: &mut EdgeStore,
    borrower: &PartyId,
    lender: &PartyId,
    lenders_lender: &PartyId,
) -> Result<CollapseOutcome> {
    TripletReducer::new(store).collapse(&Triplet {
        borrower: borrower.clone(),
        lender: lender.clone(),
        lenders_lender: lenders_lender.clone(),
    })
}
