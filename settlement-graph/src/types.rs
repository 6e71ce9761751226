//! Core types for settlement graph reduction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Debt amount in the smallest indivisible unit
///
/// Signed so that invalid input (zero or negative) stays representable and
/// can be rejected explicitly instead of failing to parse.
pub type Amount = i64;

/// Opaque participant identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(String);

impl PartyId {
    /// Create new party ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single "borrower owes lender amount" fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Party that owes
    pub borrower: PartyId,

    /// Party that is owed
    pub lender: PartyId,

    /// Amount owed; must be strictly positive
    pub amount: Amount,
}

impl Expense {
    /// Create new expense
    pub fn new(borrower: impl Into<String>, lender: impl Into<String>, amount: Amount) -> Self {
        Self {
            borrower: PartyId::new(borrower),
            lender: PartyId::new(lender),
            amount,
        }
    }
}

/// Adjacency map: party -> (counterparty -> amount)
///
/// Used both for the borrower -> lender graph and its transpose.
pub type Adjacency = BTreeMap<PartyId, BTreeMap<PartyId, Amount>>;

/// Final reduced graph: borrower -> (lender -> amount to pay)
pub type SettledGraph = Adjacency;

/// A chain borrower -> lender -> lenders_lender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triplet {
    /// Start of the chain
    pub borrower: PartyId,

    /// Midpoint, both debtor and creditor
    pub lender: PartyId,

    /// End of the chain
    pub lenders_lender: PartyId,
}

impl std::fmt::Display for Triplet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} -> {}",
            self.borrower, self.lender, self.lenders_lender
        )
    }
}

/// One direct payment of the settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Party that pays
    pub borrower: PartyId,

    /// Party that receives
    pub lender: PartyId,

    /// Amount to pay
    pub amount: Amount,
}

/// Netting statistics for a settlement run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NettingStats {
    /// Distinct parties in the input
    pub party_count: usize,

    /// Input expense records
    pub expense_count: usize,

    /// Aggregated borrower -> lender edges before reduction
    pub gross_edge_count: usize,

    /// Instructions after reduction
    pub net_instruction_count: usize,

    /// Sum of all input amounts
    pub total_gross: Amount,

    /// Sum of all instruction amounts
    pub total_net: Amount,

    /// gross_edge_count - net_instruction_count
    pub transfers_eliminated: usize,
}

impl NettingStats {
    /// Share of the gross amount that no longer needs to move (0.0 - 1.0)
    pub fn efficiency(&self) -> f64 {
        if self.total_gross == 0 {
            return 0.0;
        }
        (self.total_gross - self.total_net) as f64 / self.total_gross as f64
    }
}

/// Flatten a settled graph into instructions, ordered by borrower then lender
pub fn instructions(graph: &SettledGraph) -> Vec<Instruction> {
    graph
        .iter()
        .flat_map(|(borrower, lenders)| {
            lenders.iter().map(move |(lender, amount)| Instruction {
                borrower: borrower.clone(),
                lender: lender.clone(),
                amount: *amount,
            })
        })
        .collect()
}
