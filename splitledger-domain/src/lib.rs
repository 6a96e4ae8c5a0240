#![warn(clippy::uninlined_format_args)]

pub mod model;
pub mod services;

pub use model::{
    Approval, ApprovalState, CurrencyCode, EntryDraft, EntryId, Group, GroupDraft, GroupId,
    GroupPatch, GroupSettings, GroupType, InvalidTransition, LedgerEntry, Member, MemberSnapshot,
    Money, PaymentMethod, Role, Settlement, SettlementDraft, SettlementId, SettlementPatch,
    SettlementStatus, ShareAmount, SharePercentage, Split, SplitMethod, SplitRequest,
    TransitionEffect, UserId, ValidationError,
};
pub use services::{
    Admission, ApprovalGate, BalanceAggregator, MemberBalance, MemberBalances,
    SettlementMatcher, SettlementPlan, SplitCalculator, SuggestedTransfer,
};
