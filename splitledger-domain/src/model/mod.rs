mod entry;
mod error;
mod group;
mod ids;
mod money;
mod settlement;

pub use entry::{
    Approval, ApprovalState, EntryDraft, LedgerEntry, ShareAmount, SharePercentage, Split,
    SplitMethod, SplitRequest,
};
pub use error::ValidationError;
pub use group::{
    CurrencyCode, Group, GroupDraft, GroupPatch, GroupSettings, GroupType, Member,
    MemberSnapshot, Role,
};
pub use ids::{EntryId, GroupId, SettlementId, UserId};
pub use money::Money;
pub use settlement::{
    InvalidTransition, PaymentMethod, Settlement, SettlementDraft, SettlementPatch,
    SettlementStatus, TransitionEffect,
};
