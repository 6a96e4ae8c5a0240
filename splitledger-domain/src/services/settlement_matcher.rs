use crate::{
    model::{MemberSnapshot, Money},
    services::MemberBalances,
};
use serde::Serialize;

/// Proposed payment from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTransfer {
    pub from: MemberSnapshot,
    pub to: MemberSnapshot,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementPlan {
    pub balances: MemberBalances,
    pub suggestions: Vec<SuggestedTransfer>,
}

/// Greedy netting of member balances into a short list of transfers.
pub struct SettlementMatcher;

impl SettlementMatcher {
    /// Pairs the largest debtor with the largest creditor until one side runs
    /// out. Produces at most `n - 1` transfers; amounts of one cent or less are
    /// absorbed without emitting a transfer.
    pub fn suggest(&self, balances: &MemberBalances) -> Vec<SuggestedTransfer> {
        let mut working: Vec<(&MemberSnapshot, Money)> = balances
            .values()
            .map(|balance| (&balance.member, balance.balance))
            .collect();
        // Stable, so equal balances keep roster order.
        working.sort_by(|a, b| b.1.cmp(&a.1));

        let n = working.len();
        if n < 2 {
            return Vec::new();
        }

        let max_iterations = n * n;
        let mut transfers = Vec::new();
        let (mut i, mut j) = (0, n - 1);
        let mut iterations = 0;

        while i < j && iterations < max_iterations {
            iterations += 1;

            let debt = working[i].1;
            let credit = working[j].1;
            if !debt.is_positive() || !credit.is_negative() {
                break;
            }

            let amount = debt.min(-credit);
            if amount > Money::cent() {
                transfers.push(SuggestedTransfer {
                    from: working[i].0.clone(),
                    to: working[j].0.clone(),
                    amount: amount.round_cents(),
                });
            }

            working[i].1 -= amount;
            working[j].1 += amount;

            if working[i].1.abs() < Money::cent() {
                i += 1;
            }
            if working[j].1.abs() < Money::cent() {
                j -= 1;
            }
        }

        if iterations >= max_iterations && i < j {
            tracing::warn!(
                members = n,
                iterations,
                "Settlement matcher hit its iteration cap"
            );
        }

        tracing::debug!(
            members = n,
            transfers = transfers.len(),
            "Computed settlement suggestions"
        );
        transfers
    }

    pub fn plan(&self, balances: MemberBalances) -> SettlementPlan {
        let suggestions = self.suggest(&balances);
        SettlementPlan {
            balances,
            suggestions,
        }
    }
}
