mod approval_gate;
mod balance_aggregator;
mod settlement_matcher;
mod split_calculator;

pub use approval_gate::{Admission, ApprovalGate};
pub use balance_aggregator::{BalanceAggregator, MemberBalance, MemberBalances};
pub use settlement_matcher::{SettlementMatcher, SettlementPlan, SuggestedTransfer};
pub use split_calculator::SplitCalculator;
