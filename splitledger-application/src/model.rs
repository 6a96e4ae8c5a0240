use chrono::NaiveDate;
use serde::Serialize;
use splitledger_domain::{
    CurrencyCode, EntryId, Group, GroupDraft, GroupId, GroupSettings, GroupType, LedgerEntry,
    MemberBalance, MemberSnapshot, Money, PaymentMethod, Settlement, SplitMethod, SplitRequest,
    UserId,
};

/// The authenticated user on whose behalf an operation runs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Actor {
    pub user_id: UserId,
}

impl Actor {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub group_type: GroupType,
    pub currency: CurrencyCode,
    pub default_split_method: SplitMethod,
    pub settings: GroupSettings,
    /// Users to invite; unknown addresses are reported, not rejected.
    pub member_emails: Vec<String>,
}

impl NewGroup {
    pub(crate) fn into_parts(self) -> (GroupDraft, Vec<String>) {
        let draft = GroupDraft {
            name: self.name,
            description: self.description,
            group_type: self.group_type,
            currency: self.currency,
            default_split_method: self.default_split_method,
            settings: self.settings,
        };
        (draft, self.member_emails)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGroup {
    pub group: Group,
    pub not_found_emails: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersOutcome {
    pub group: Group,
    pub added: Vec<MemberSnapshot>,
    pub already_members: Vec<String>,
    pub not_found_emails: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewExpense {
    pub group_id: GroupId,
    pub name: String,
    pub description: String,
    pub amount: Money,
    pub category: String,
    pub date: NaiveDate,
    /// Defaults to the actor.
    pub paid_by: Option<UserId>,
    /// Defaults to the group's split method with no explicit shares.
    pub split: Option<SplitRequest>,
}

/// Partial expense update. `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpensePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub split: Option<SplitRequest>,
    pub is_settled: Option<bool>,
}

impl ExpensePatch {
    /// Whether the patch touches nothing but the settled flag.
    pub fn only_settled_flag(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.split.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub is_settled: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Store-level entry selection. Soft-deleted entries never match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryQuery {
    pub group_id: GroupId,
    pub is_settled: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl EntryQuery {
    /// Every active entry of a group.
    pub fn active(group_id: GroupId) -> Self {
        Self {
            group_id,
            is_settled: None,
            date_from: None,
            date_to: None,
        }
    }

    pub fn filtered(group_id: GroupId, filter: ExpenseFilter) -> Self {
        Self {
            is_settled: filter.is_settled,
            date_from: filter.date_from,
            date_to: filter.date_to,
            ..Self::active(group_id)
        }
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        entry.group_id == self.group_id
            && entry.is_active
            && self.is_settled.is_none_or(|settled| entry.is_settled == settled)
            && self.date_from.is_none_or(|from| entry.date >= from)
            && self.date_to.is_none_or(|to| entry.date <= to)
    }
}

/// Narrows [`list_groups`](crate::LedgerService::list_groups).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupFilter {
    pub group_type: Option<GroupType>,
    /// `None` lists archived groups alongside active ones.
    pub is_active: Option<bool>,
}

impl Default for GroupFilter {
    fn default() -> Self {
        Self {
            group_type: None,
            is_active: Some(true),
        }
    }
}

impl GroupFilter {
    pub fn matches(&self, group: &Group) -> bool {
        self.group_type.is_none_or(|kind| group.group_type == kind)
            && self.is_active.is_none_or(|active| group.is_active == active)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub total_expenses: Money,
    pub total_expense_count: usize,
    pub unsettled_expenses: usize,
    pub pending_settlements: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group: Group,
    pub stats: GroupStats,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSettlement {
    pub group_id: GroupId,
    pub from: UserId,
    pub to: UserId,
    pub amount: Money,
    pub payment_method: Option<PaymentMethod>,
    pub notes: String,
    pub covered_entries: Vec<EntryId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_expenses: Money,
    pub total_expense_count: usize,
    pub unsettled_expenses: usize,
    pub settled_expense_count: usize,
    pub total_settled: Money,
    pub pending_settlements: usize,
    pub completed_settlements: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDashboard {
    pub group: Group,
    pub stats: DashboardStats,
    pub recent_expenses: Vec<LedgerEntry>,
    pub recent_settlements: Vec<Settlement>,
    /// The actor's own position, over unsettled entries only.
    pub user_balance: MemberBalance,
}
