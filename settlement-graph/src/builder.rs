//! Debt graph construction from expense records

use crate::{
    config::BuilderConfig,
    edge_store::EdgeStore,
    types::{Amount, Expense, PartyId},
    Error, Result,
};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregates expenses into a mirrored [`EdgeStore`]
///
/// Duplicate borrower/lender pairs are summed. Expenses in opposite
/// directions are kept as a crossed pair unless
/// [`BuilderConfig::resolve_crossed_pairs`] is set. [`GraphBuilder::new`]
/// and [`GraphBuilder::default`] leave it unset so the raw aggregated graph
/// can be inspected; [`GraphBuilder::with_config`] with
/// [`BuilderConfig::default`] sets it.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    store: EdgeStore,
    parties: BTreeSet<PartyId>,
    expense_count: usize,
    total_gross: Amount,
    resolve_crossed_pairs: bool,
}

impl GraphBuilder {
    /// Create a builder that leaves crossed pairs in place
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from configuration
    pub fn with_config(config: &BuilderConfig) -> Self {
        Self {
            resolve_crossed_pairs: config.resolve_crossed_pairs,
            ..Self::default()
        }
    }

    /// Validate and fold one expense into the graph
    ///
    /// Rejected expenses leave the builder untouched.
    pub fn add_expense(&mut self, expense: &Expense) -> Result<()> {
        validate_expense(expense)?;

        let Expense {
            borrower,
            lender,
            amount,
        } = expense;

        let overflow = || Error::AmountOverflow {
            borrower: borrower.clone(),
            lender: lender.clone(),
        };
        let total_gross = self.total_gross.checked_add(*amount).ok_or_else(overflow)?;
        let running = self
            .store
            .amount(borrower, lender)
            .checked_add(*amount)
            .ok_or_else(overflow)?;

        self.store.reset_edge(borrower, lender, running)?;
        self.total_gross = total_gross;
        self.expense_count += 1;
        self.parties.insert(borrower.clone());
        self.parties.insert(lender.clone());
        Ok(())
    }

    /// Fold a whole batch; the first invalid expense aborts the build
    pub fn add_expenses<'a>(
        &mut self,
        expenses: impl IntoIterator<Item = &'a Expense>,
    ) -> Result<()> {
        for expense in expenses {
            self.add_expense(expense)?;
        }
        Ok(())
    }

    /// Distinct parties seen so far
    pub fn party_count(&self) -> usize {
        self.parties.len()
    }

    /// Expenses accepted so far
    pub fn expense_count(&self) -> usize {
        self.expense_count
    }

    /// Sum of accepted expense amounts
    pub fn total_gross(&self) -> Amount {
        self.total_gross
    }

    /// Finish construction
    pub fn build(self) -> Result<EdgeStore> {
        let mut store = self.store;
        if self.resolve_crossed_pairs {
            let resolved = store.resolve_all_crossed_pairs()?;
            if resolved > 0 {
                tracing::debug!(resolved, "netted crossed pairs after build");
            }
        }

        tracing::info!(
            parties = self.parties.len(),
            expenses = self.expense_count,
            edges = store.edge_count(),
            "Built settlement graph"
        );
        Ok(store)
    }

    /// Build the raw aggregated graph, crossed pairs left in place
    pub fn from_expenses(expenses: &[Expense]) -> Result<EdgeStore> {
        let mut builder = Self::new();
        builder.add_expenses(expenses)?;
        builder.build()
    }
}

/// Reject non-positive amounts and self-loops
pub fn validate_expense(expense: &Expense) -> Result<()> {
    let reason = if expense.amount <= 0 {
        "amount must be positive"
    } else if expense.borrower == expense.lender {
        "borrower and lender must differ"
    } else {
        return Ok(());
    };

    tracing::warn!(
        borrower = %expense.borrower,
        lender = %expense.lender,
        amount = expense.amount,
        reason,
        "Rejected expense"
    );
    Err(Error::invalid_expense(
        &expense.borrower,
        &expense.lender,
        expense.amount,
        reason,
    ))
}

/// Per party: total owed by the party minus total owed to it, from raw input
///
/// Parties whose position nets to zero are omitted, matching
/// [`EdgeStore::net_positions`].
pub fn net_positions(expenses: &[Expense]) -> BTreeMap<PartyId, Amount> {
    let mut positions: BTreeMap<PartyId, Amount> = BTreeMap::new();
    for expense in expenses {
        *positions.entry(expense.borrower.clone()).or_insert(0) += expense.amount;
        *positions.entry(expense.lender.clone()).or_insert(0) -= expense.amount;
    }
    positions.retain(|_, position| *position != 0);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> PartyId {
        PartyId::new(id)
    }

    #[test]
    fn test_duplicate_pairs_are_summed() {
        let store = GraphBuilder::from_expenses(&[
            Expense::new("A", "B", 10),
            Expense::new("A", "B", 5),
        ])
        .unwrap();

        assert_eq!(store.amount(&p("A"), &p("B")), 15);
        assert_eq!(store.flipped_graph()[&p("B")][&p("A")], 15);
        store.check_invariants().unwrap();
    }

    #[test]
    fn test_mirror_consistent_after_every_expense() {
        let mut builder = GraphBuilder::new();
        for expense in [
            Expense::new("A", "B", 1),
            Expense::new("B", "C", 2),
            Expense::new("A", "B", 3),
            Expense::new("C", "A", 4),
        ] {
            builder.add_expense(&expense).unwrap();
            builder.store.check_invariants().unwrap();
        }
        assert_eq!(builder.expense_count(), 4);
        assert_eq!(builder.party_count(), 3);
        assert_eq!(builder.total_gross(), 10);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let result = GraphBuilder::from_expenses(&[Expense::new("A", "B", 0)]);
        assert!(matches!(result, Err(Error::InvalidExpense { amount: 0, .. })));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = GraphBuilder::from_expenses(&[
            Expense::new("A", "B", 10),
            Expense::new("B", "C", -1),
        ]);
        assert!(matches!(result, Err(Error::InvalidExpense { .. })));
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut builder = GraphBuilder::new();
        let result = builder.add_expense(&Expense::new("A", "A", 5));
        assert!(matches!(result, Err(Error::InvalidExpense { .. })));
        assert_eq!(builder.expense_count(), 0);
        assert_eq!(builder.party_count(), 0);
    }

    #[test]
    fn test_overflow_rejected() {
        let result = GraphBuilder::from_expenses(&[
            Expense::new("A", "B", Amount::MAX),
            Expense::new("A", "B", 1),
        ]);
        assert!(matches!(result, Err(Error::AmountOverflow { .. })));
    }

    #[test]
    fn test_new_builder_keeps_crossed_pairs() {
        let store = GraphBuilder::from_expenses(&[
            Expense::new("A", "B", 10),
            Expense::new("B", "A", 3),
        ])
        .unwrap();

        assert_eq!(store.crossed_pairs().len(), 1);
    }

    #[test]
    fn test_crossed_pair_resolved_when_configured() {
        let mut builder = GraphBuilder::with_config(&BuilderConfig::default());
        builder
            .add_expenses(&[Expense::new("A", "B", 10), Expense::new("B", "A", 3)])
            .unwrap();
        let store = builder.build().unwrap();

        assert_eq!(store.amount(&p("A"), &p("B")), 7);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let forward = [
            Expense::new("A", "B", 10),
            Expense::new("B", "C", 4),
            Expense::new("A", "B", 2),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(
            GraphBuilder::from_expenses(&forward).unwrap(),
            GraphBuilder::from_expenses(&reversed).unwrap()
        );
    }

    #[test]
    fn test_net_positions_from_expenses() {
        let positions = net_positions(&[
            Expense::new("A", "B", 10),
            Expense::new("B", "C", 10),
        ]);
        assert_eq!(positions.get(&p("A")), Some(&10));
        assert_eq!(positions.get(&p("B")), None);
        assert_eq!(positions.get(&p("C")), Some(&-10));
    }
}
