//! Settlement Graph
//!
//! Reduces a list of pairwise debts to the smallest equivalent set of direct
//! payments. If A owes B and B owes C, A pays C directly.
//!
//! # Architecture
//!
//! 1. **Build**: [`GraphBuilder`] aggregates expenses into a borrower -> lender
//!    graph and its transpose, held together by [`EdgeStore`]
//! 2. **Collapse**: [`TripletReducer`] removes one intermediary from a
//!    borrower -> lender -> lender's lender chain
//! 3. **Drive**: [`ReductionDriver`] repeats collapses until no party both
//!    owes and is owed
//!
//! [`SettlementEngine`] runs all three and packages a [`SettlementPlan`].
//!
//! # Example
//!
//! ```
//! use settlement_graph::{Expense, PartyId, SettlementEngine};
//!
//! let engine = SettlementEngine::default();
//! let plan = engine.settle(&[
//!     Expense::new("alice", "bob", 10),
//!     Expense::new("bob", "carol", 10),
//! ])?;
//!
//! assert_eq!(plan.settled[&PartyId::new("alice")][&PartyId::new("carol")], 10);
//! assert_eq!(plan.instructions.len(), 1);
//! # Ok::<(), settlement_graph::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod builder;
pub mod config;
pub mod driver;
pub mod edge_store;
pub mod engine;
pub mod error;
pub mod reducer;
pub mod shared;
pub mod types;

// Re-exports
pub use builder::GraphBuilder;
pub use config::Config;
pub use driver::{ReductionDriver, ReductionReport};
pub use edge_store::EdgeStore;
pub use engine::{SettlementEngine, SettlementPlan};
pub use error::{Error, Result};
pub use reducer::TripletReducer;
pub use shared::SharedEdgeStore;
pub use types::*;

/// Build and reduce `expenses`
///
/// Builds with [`GraphBuilder::new`], which leaves crossed pairs to the
/// driver. [`SettlementEngine::default`] nets them at build time instead;
/// every party's net position comes out the same either way.
pub fn compute_settlement(expenses: &[Expense]) -> Result<SettledGraph> {
    let mut store = GraphBuilder::from_expenses(expenses)?;
    ReductionDriver::default().reduce(&mut store)?;
    Ok(store.into_settled())
}
