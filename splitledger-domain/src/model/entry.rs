use crate::model::{
    CurrencyCode, EntryId, GroupId, MemberSnapshot, Money, UserId, ValidationError,
    error::{require_max_len, require_text},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const MAX_ENTRY_NAME_LEN: usize = 200;
const MAX_ENTRY_DESCRIPTION_LEN: usize = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitMethod {
    #[default]
    Equal,
    Custom,
    Percentage,
    Exact,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareAmount {
    pub member: UserId,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePercentage {
    pub member: UserId,
    pub percentage: Decimal,
}

/// How a new expense should be divided. Each method carries only the input
/// it needs; `Equal` derives the participants from the group roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "shares")]
pub enum SplitRequest {
    Equal,
    Custom(Vec<ShareAmount>),
    Exact(Vec<ShareAmount>),
    Percentage(Vec<SharePercentage>),
}

impl SplitRequest {
    /// Request for `method` with no caller-supplied shares.
    pub fn without_shares(method: SplitMethod) -> Self {
        match method {
            SplitMethod::Equal => SplitRequest::Equal,
            SplitMethod::Custom => SplitRequest::Custom(Vec::new()),
            SplitMethod::Exact => SplitRequest::Exact(Vec::new()),
            SplitMethod::Percentage => SplitRequest::Percentage(Vec::new()),
        }
    }

    pub fn method(&self) -> SplitMethod {
        match self {
            SplitRequest::Equal => SplitMethod::Equal,
            SplitRequest::Custom(_) => SplitMethod::Custom,
            SplitRequest::Exact(_) => SplitMethod::Exact,
            SplitRequest::Percentage(_) => SplitMethod::Percentage,
        }
    }
}

/// One member's share of a ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub member: MemberSnapshot,
    pub amount: Money,
    pub percentage: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Split {
    pub fn owed(member: MemberSnapshot, amount: Money, percentage: Decimal) -> Self {
        Self {
            member,
            amount,
            percentage,
            is_paid: false,
            paid_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub approver: UserId,
    pub approved_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalState {
    pub requires_approval: bool,
    pub approved_by: Vec<Approval>,
}

/// Descriptive fields of a new expense, before an id and splits are attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryDraft {
    pub group_id: GroupId,
    pub added_by: UserId,
    pub name: String,
    pub description: String,
    pub amount: Money,
    pub currency: CurrencyCode,
    pub category: String,
    pub date: NaiveDate,
    pub paid_by: MemberSnapshot,
}

/// A recorded group expense. Splits are frozen when the entry is created and
/// only change when a caller explicitly supplies new ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: EntryId,
    pub group_id: GroupId,
    pub added_by: UserId,
    pub name: String,
    pub description: String,
    pub amount: Money,
    pub currency: CurrencyCode,
    pub category: String,
    pub date: NaiveDate,
    pub split_method: SplitMethod,
    pub splits: Vec<Split>,
    pub paid_by: MemberSnapshot,
    pub is_settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
    pub approval: ApprovalState,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        id: EntryId,
        draft: EntryDraft,
        split_method: SplitMethod,
        splits: Vec<Split>,
        requires_approval: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let mut entry = Self {
            id,
            group_id: draft.group_id,
            added_by: draft.added_by,
            name: draft.name.trim().to_string(),
            description: draft.description,
            amount: draft.amount,
            currency: draft.currency,
            category: draft.category.trim().to_string(),
            date: draft.date,
            split_method,
            splits: Vec::new(),
            paid_by: draft.paid_by,
            is_settled: false,
            settled_at: None,
            approval: ApprovalState {
                requires_approval,
                approved_by: Vec::new(),
            },
            is_active: true,
            created_at,
        };
        entry.replace_splits(split_method, splits, created_at);
        entry.validate()?;
        Ok(entry)
    }

    /// Checks every invariant a stored entry must satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "Expense name", MAX_ENTRY_NAME_LEN)?;
        require_max_len(&self.description, "Description", MAX_ENTRY_DESCRIPTION_LEN)?;
        require_text(&self.category, "Category", usize::MAX)?;
        if !self.amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount(self.amount));
        }
        if self.splits.is_empty() {
            return Err(ValidationError::NoParticipants);
        }

        for split in &self.splits {
            if split.amount.is_negative() {
                return Err(ValidationError::NegativeShare {
                    member: split.member.id.clone(),
                });
            }
            if split.percentage < Decimal::ZERO || split.percentage > Decimal::ONE_HUNDRED {
                return Err(ValidationError::PercentageOutOfRange {
                    member: split.member.id.clone(),
                });
            }
        }

        let total = Money::checked_sum(self.splits.iter().map(|split| split.amount))
            .ok_or(ValidationError::AmountOutOfRange)?;
        if !total.within(self.amount, Money::cent()) {
            return Err(ValidationError::SplitSumMismatch {
                total,
                amount: self.amount,
            });
        }

        if self.split_method == SplitMethod::Percentage {
            let total: Decimal = self.splits.iter().map(|split| split.percentage).sum();
            if (total - Decimal::ONE_HUNDRED).abs() > Decimal::new(1, 1) {
                return Err(ValidationError::PercentageSumMismatch { total });
            }
        }

        Ok(())
    }

    /// Whether the entry takes part in balance computation.
    pub fn is_outstanding(&self) -> bool {
        self.is_active && !self.is_settled
    }

    /// Marks the payer's own share as paid; every other share starts unpaid.
    pub fn replace_splits(&mut self, method: SplitMethod, splits: Vec<Split>, at: DateTime<Utc>) {
        self.split_method = method;
        self.splits = splits
            .into_iter()
            .map(|mut split| {
                let is_payer = split.member.id == self.paid_by.id;
                split.is_paid = is_payer;
                split.paid_at = is_payer.then_some(at);
                split
            })
            .collect();
    }

    /// Reconciliation hook. Returns `false` if the entry was already settled.
    pub fn mark_settled(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_settled {
            return false;
        }
        self.is_settled = true;
        self.settled_at = Some(at);
        true
    }

    /// Explicit settled-flag edit; clearing the flag also clears `settled_at`.
    pub fn set_settled(&mut self, settled: bool, at: DateTime<Utc>) -> bool {
        if settled {
            return self.mark_settled(at);
        }
        let changed = self.is_settled;
        self.is_settled = false;
        self.settled_at = None;
        changed
    }

    /// Records an approval. Approving twice is a no-op and returns `false`.
    pub fn approve(&mut self, approver: &UserId, at: DateTime<Utc>) -> bool {
        if self
            .approval
            .approved_by
            .iter()
            .any(|approval| &approval.approver == approver)
        {
            return false;
        }
        self.approval.approved_by.push(Approval {
            approver: approver.clone(),
            approved_at: at,
        });
        true
    }

    pub fn soft_delete(&mut self) -> bool {
        std::mem::replace(&mut self.is_active, false)
    }
}
