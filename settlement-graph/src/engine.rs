//! Settlement engine
//!
//! Orchestrates graph construction and reduction and packages the result.

use crate::{
    builder::GraphBuilder,
    config::Config,
    driver::{ReductionDriver, ReductionReport},
    edge_store::EdgeStore,
    types::*,
    Result,
};
use serde::{Deserialize, Serialize};

/// Result of a settlement run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Reduced borrower -> lender graph
    pub settled: SettledGraph,

    /// The same graph as a flat list of payments
    pub instructions: Vec<Instruction>,

    /// How the reduction went
    pub report: ReductionReport,

    /// Gross vs net figures
    pub stats: NettingStats,
}

/// Settlement engine
#[derive(Debug, Clone, Default)]
pub struct SettlementEngine {
    config: Config,
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the unreduced graph
    pub fn build(&self, expenses: &[Expense]) -> Result<EdgeStore> {
        let mut builder = GraphBuilder::with_config(&self.config.builder);
        builder.add_expenses(expenses)?;
        builder.build()
    }

    /// Reduce a graph in place to its fixed point
    pub fn reduce(&self, store: &mut EdgeStore) -> Result<ReductionReport> {
        ReductionDriver::new(self.config.reduction.clone()).reduce(store)
    }

    /// Build, reduce and summarize
    pub fn settle(&self, expenses: &[Expense]) -> Result<SettlementPlan> {
        tracing::info!(expenses = expenses.len(), "Starting settlement");

        let mut builder = GraphBuilder::with_config(&self.config.builder);
        builder.add_expenses(expenses)?;
        let party_count = builder.party_count();
        let expense_count = builder.expense_count();
        let total_gross = builder.total_gross();

        let mut store = builder.build()?;
        let gross_edge_count = store.edge_count();

        let report = self.reduce(&mut store)?;

        let total_net = store.total_amount()?;
        let settled = store.into_settled();
        let instructions = instructions(&settled);

        let stats = NettingStats {
            party_count,
            expense_count,
            gross_edge_count,
            net_instruction_count: instructions.len(),
            total_gross,
            total_net,
            transfers_eliminated: gross_edge_count.saturating_sub(instructions.len()),
        };

        tracing::info!(
            "Settlement complete: {} gross → {} net ({:.1}% efficiency), {} instructions",
            stats.total_gross,
            stats.total_net,
            stats.efficiency() * 100.0,
            stats.net_instruction_count
        );

        Ok(SettlementPlan {
            settled,
            instructions,
            report,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::net_positions, config::BuilderConfig, Error};

    #[test]
    fn test_settle_chain() {
        let engine = SettlementEngine::default();
        let plan = engine
            .settle(&[Expense::new("A", "B", 10), Expense::new("B", "C", 10)])
            .unwrap();

        assert_eq!(
            plan.instructions,
            vec![Instruction {
                borrower: PartyId::new("A"),
                lender: PartyId::new("C"),
                amount: 10,
            }]
        );
        assert_eq!(plan.stats.party_count, 3);
        assert_eq!(plan.stats.gross_edge_count, 2);
        assert_eq!(plan.stats.transfers_eliminated, 1);
        assert_eq!(plan.stats.total_gross, 20);
        assert_eq!(plan.stats.total_net, 10);
    }

    #[test]
    fn test_build_exposes_unreduced_graph() {
        let engine = SettlementEngine::default();
        let store = engine
            .build(&[Expense::new("A", "B", 10), Expense::new("B", "C", 10)])
            .unwrap();

        assert_eq!(store.edge_count(), 2);
        assert_eq!(store.midpoints(), vec![PartyId::new("B")]);
    }

    #[test]
    fn test_settle_without_build_time_netting() {
        let mut config = Config::default();
        config.builder = BuilderConfig {
            resolve_crossed_pairs: false,
        };
        let expenses = [
            Expense::new("A", "B", 10),
            Expense::new("B", "A", 3),
            Expense::new("B", "C", 4),
        ];

        let plan = SettlementEngine::new(config).settle(&expenses).unwrap();

        let mut net: std::collections::BTreeMap<PartyId, Amount> = Default::default();
        for instruction in &plan.instructions {
            *net.entry(instruction.borrower.clone()).or_insert(0) += instruction.amount;
            *net.entry(instruction.lender.clone()).or_insert(0) -= instruction.amount;
        }
        net.retain(|_, position| *position != 0);
        assert_eq!(net, net_positions(&expenses));
        assert_eq!(plan.report.crossed_pairs_resolved, 1);
    }

    #[test]
    fn test_settle_rejects_invalid_input() {
        let result = SettlementEngine::default().settle(&[
            Expense::new("A", "B", 10),
            Expense::new("B", "B", 4),
        ]);
        assert!(matches!(result, Err(Error::InvalidExpense { .. })));
    }

    #[test]
    fn test_settle_empty_input() {
        let plan = SettlementEngine::default().settle(&[]).unwrap();
        assert!(plan.settled.is_empty());
        assert!(plan.report.was_noop());
        assert_eq!(plan.stats, NettingStats::default());
    }
}
