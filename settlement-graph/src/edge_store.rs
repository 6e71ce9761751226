//! Mirrored debt graph storage
//!
//! [`EdgeStore`] owns the borrower -> lender graph together with its exact
//! transpose (lender -> borrower) and is the only code that mutates either.
//! Every mutating operation updates both mirrors before returning, so:
//!
//! - every stored amount is positive; an edge whose amount would drop to
//!   zero or below is deleted instead
//! - `graph[b][l] == v` iff `flipped[l][b] == v`
//! - no party owes itself
//!
//! Reads never create entries. Missing edges read as zero through
//! [`EdgeStore::amount`], and parties whose adjacency becomes empty are
//! removed from the outer map.

use crate::{
    types::{Adjacency, Amount, PartyId, SettledGraph},
    Error, Result,
};
use std::collections::BTreeMap;

/// Borrower -> lender graph plus its transpose
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeStore {
    /// borrower -> lender -> amount
    graph: Adjacency,

    /// lender -> borrower -> amount
    flipped: Adjacency,
}

impl EdgeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount `borrower` owes `lender`, zero if there is no edge
    pub fn amount(&self, borrower: &PartyId, lender: &PartyId) -> Amount {
        self.graph
            .get(borrower)
            .and_then(|lenders| lenders.get(lender))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `borrower` currently owes `lender` anything
    pub fn has_edge(&self, borrower: &PartyId, lender: &PartyId) -> bool {
        self.amount(borrower, lender) > 0
    }

    /// Outgoing edges of `party` (who `party` owes)
    pub fn lenders_of<'a>(
        &'a self,
        party: &PartyId,
    ) -> impl Iterator<Item = (&'a PartyId, Amount)> + 'a {
        self.graph
            .get(party)
            .into_iter()
            .flat_map(|lenders| lenders.iter().map(|(p, a)| (p, *a)))
    }

    /// Incoming edges of `party` (who owes `party`)
    pub fn borrowers_of<'a>(
        &'a self,
        party: &PartyId,
    ) -> impl Iterator<Item = (&'a PartyId, Amount)> + 'a {
        self.flipped
            .get(party)
            .into_iter()
            .flat_map(|borrowers| borrowers.iter().map(|(p, a)| (p, *a)))
    }

    /// Whether `party` both owes and is owed, i.e. sits in the middle of a chain
    pub fn is_midpoint(&self, party: &PartyId) -> bool {
        self.lenders_of(party).next().is_some() && self.borrowers_of(party).next().is_some()
    }

    /// All chain midpoints, in party order
    pub fn midpoints(&self) -> Vec<PartyId> {
        self.graph
            .keys()
            .filter(|party| self.is_midpoint(party))
            .cloned()
            .collect()
    }

    /// Borrower -> lender view
    pub fn graph(&self) -> &Adjacency {
        &self.graph
    }

    /// Lender -> borrower view
    pub fn flipped_graph(&self) -> &Adjacency {
        &self.flipped
    }

    /// Number of directed edges
    pub fn edge_count(&self) -> usize {
        self.graph.values().map(BTreeMap::len).sum()
    }

    /// Whether there are no edges at all
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Sum of every edge amount
    ///
    /// Fails if the sum does not fit [`Amount`], which only a store filled
    /// edge by edge without a gross bound can reach.
    pub fn total_amount(&self) -> Result<Amount> {
        self.graph
            .values()
            .flat_map(BTreeMap::values)
            .try_fold(0 as Amount, |total, amount| total.checked_add(*amount))
            .ok_or_else(|| {
                Error::InvariantViolation("total outstanding amount overflows".to_string())
            })
    }

    /// Per party: total owed to others minus total owed by others
    ///
    /// Parties whose position nets to zero are omitted.
    pub fn net_positions(&self) -> BTreeMap<PartyId, Amount> {
        let mut positions: BTreeMap<PartyId, Amount> = BTreeMap::new();
        for (borrower, lenders) in &self.graph {
            for (lender, amount) in lenders {
                *positions.entry(borrower.clone()).or_insert(0) += amount;
                *positions.entry(lender.clone()).or_insert(0) -= amount;
            }
        }
        positions.retain(|_, position| *position != 0);
        positions
    }

    /// Consume the store, keeping only the borrower -> lender graph
    pub fn into_settled(self) -> SettledGraph {
        self.graph
    }

    /// Delete `borrower -> lender` from both mirrors. No-op if absent.
    pub fn prune_edge(&mut self, borrower: &PartyId, lender: &PartyId) {
        let removed = remove_entry(&mut self.graph, borrower, lender);
        remove_entry(&mut self.flipped, lender, borrower);

        if let Some(amount) = removed {
            tracing::trace!(%borrower, %lender, amount, "pruned edge");
        }
    }

    /// Set `borrower -> lender` to `new_amount` in both mirrors
    ///
    /// A non-positive amount prunes the edge. Fails on a self-loop.
    pub fn reset_edge(
        &mut self,
        borrower: &PartyId,
        lender: &PartyId,
        new_amount: Amount,
    ) -> Result<()> {
        if new_amount <= 0 {
            self.prune_edge(borrower, lender);
            return Ok(());
        }

        if borrower == lender {
            return Err(Error::InvariantViolation(format!(
                "attempted to store self-loop on {} ({})",
                borrower, new_amount
            )));
        }

        self.graph
            .entry(borrower.clone())
            .or_default()
            .insert(lender.clone(), new_amount);
        self.flipped
            .entry(lender.clone())
            .or_default()
            .insert(borrower.clone(), new_amount);

        tracing::trace!(%borrower, %lender, amount = new_amount, "reset edge");
        Ok(())
    }

    /// Net out a bidirectional pair `a <-> b` into at most one edge
    ///
    /// Returns `true` if both directions were present and got netted.
    pub fn resolve_crossed_pair(&mut self, a: &PartyId, b: &PartyId) -> Result<bool> {
        let a_to_b = self.amount(a, b);
        let b_to_a = self.amount(b, a);
        if a_to_b == 0 || b_to_a == 0 {
            return Ok(false);
        }

        let diff = a_to_b - b_to_a;
        if diff == 0 {
            self.prune_edge(a, b);
            self.prune_edge(b, a);
        } else if diff > 0 {
            self.prune_edge(b, a);
            self.reset_edge(a, b, diff)?;
        } else {
            self.prune_edge(a, b);
            self.reset_edge(b, a, diff.abs())?;
        }

        tracing::debug!(%a, %b, a_to_b, b_to_a, "resolved crossed pair");
        Ok(true)
    }

    /// Net out every bidirectional pair; returns how many were resolved
    pub fn resolve_all_crossed_pairs(&mut self) -> Result<usize> {
        let mut resolved = 0;
        for (a, b) in self.crossed_pairs() {
            if self.resolve_crossed_pair(&a, &b)? {
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    /// Unordered pairs with edges in both directions, each listed once
    pub fn crossed_pairs(&self) -> Vec<(PartyId, PartyId)> {
        let mut pairs = Vec::new();
        for (a, lenders) in &self.graph {
            for b in lenders.keys() {
                if a < b && self.has_edge(b, a) {
                    pairs.push((a.clone(), b.clone()));
                }
            }
        }
        pairs
    }

    /// Audit positivity, mirror consistency and absence of self-loops
    pub fn check_invariants(&self) -> Result<()> {
        for (borrower, lenders) in &self.graph {
            if lenders.is_empty() {
                return Err(Error::InvariantViolation(format!(
                    "empty adjacency left behind for borrower {}",
                    borrower
                )));
            }
            for (lender, amount) in lenders {
                if *amount <= 0 {
                    return Err(Error::InvariantViolation(format!(
                        "non-positive amount {} on {} -> {}",
                        amount, borrower, lender
                    )));
                }
                if borrower == lender {
                    return Err(Error::InvariantViolation(format!(
                        "self-loop on {}",
                        borrower
                    )));
                }
                let mirrored = self
                    .flipped
                    .get(lender)
                    .and_then(|borrowers| borrowers.get(borrower));
                if mirrored != Some(amount) {
                    return Err(Error::InvariantViolation(format!(
                        "mirror desync on {} -> {}: {} vs {:?}",
                        borrower, lender, amount, mirrored
                    )));
                }
            }
        }

        let mirrored_edges: usize = self.flipped.values().map(BTreeMap::len).sum();
        if mirrored_edges != self.edge_count() || self.flipped.values().any(BTreeMap::is_empty) {
            return Err(Error::InvariantViolation(format!(
                "flipped graph holds {} edges, graph holds {}",
                mirrored_edges,
                self.edge_count()
            )));
        }

        Ok(())
    }

    /// [`check_invariants`](Self::check_invariants) plus no crossed pairs
    pub fn check_reduced_invariants(&self) -> Result<()> {
        self.check_invariants()?;
        if let Some((a, b)) = self.crossed_pairs().into_iter().next() {
            return Err(Error::InvariantViolation(format!(
                "crossed pair {} <-> {} survived reduction",
                a, b
            )));
        }
        Ok(())
    }
}

/// Remove `outer[key][inner_key]`, dropping the inner map once it is empty
fn remove_entry(outer: &mut Adjacency, key: &PartyId, inner_key: &PartyId) -> Option<Amount> {
    let inner = outer.get_mut(key)?;
    let removed = inner.remove(inner_key);
    if inner.is_empty() {
        outer.remove(key);
    }
    removed
}
