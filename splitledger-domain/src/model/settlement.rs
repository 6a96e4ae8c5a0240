use crate::model::{
    CurrencyCode, EntryId, GroupId, MemberSnapshot, Money, SettlementId, ValidationError,
    error::require_max_len,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_SETTLEMENT_NOTES_LEN: usize = 500;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SettlementStatus::Pending => "Pending",
            SettlementStatus::Completed => "Completed",
            SettlementStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Debit Card")]
    DebitCard,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("Cannot move a settlement from {from} to {to}")]
pub struct InvalidTransition {
    pub from: SettlementStatus,
    pub to: SettlementStatus,
}

/// Side effect the caller must perform after a successful transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Mark every covered ledger entry settled.
    Reconcile,
    None,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementDraft {
    pub group_id: GroupId,
    pub from: MemberSnapshot,
    pub to: MemberSnapshot,
    pub amount: Money,
    pub currency: CurrencyCode,
    pub payment_method: Option<PaymentMethod>,
    pub notes: String,
    pub covered_entries: Vec<EntryId>,
}

impl SettlementDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from.id == self.to.id {
            return Err(ValidationError::SelfSettlement);
        }
        if self.amount <= Money::cent() {
            return Err(ValidationError::SettlementAmountTooSmall(self.amount));
        }
        require_max_len(&self.notes, "Notes", MAX_SETTLEMENT_NOTES_LEN)
    }
}

/// Edit of the free-form details that may accompany a status change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementPatch {
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

impl SettlementPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.notes {
            Some(notes) => require_max_len(notes, "Notes", MAX_SETTLEMENT_NOTES_LEN),
            None => Ok(()),
        }
    }
}

/// A declared transfer between two members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub id: SettlementId,
    pub group_id: GroupId,
    pub from: MemberSnapshot,
    pub to: MemberSnapshot,
    pub amount: Money,
    pub currency: CurrencyCode,
    pub status: SettlementStatus,
    pub settled_at: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: String,
    pub covered_entries: Vec<EntryId>,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(
        id: SettlementId,
        draft: SettlementDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        draft.validate()?;

        let mut covered_entries = draft.covered_entries;
        let mut seen = fxhash::FxHashSet::default();
        covered_entries.retain(|id| seen.insert(id.clone()));

        Ok(Self {
            id,
            group_id: draft.group_id,
            from: draft.from,
            to: draft.to,
            amount: draft.amount,
            currency: draft.currency,
            status: SettlementStatus::Pending,
            settled_at: None,
            payment_method: draft.payment_method,
            notes: draft.notes,
            covered_entries,
            created_at,
        })
    }

    /// Applies a validated patch. Returns whether anything changed.
    pub fn amend(&mut self, patch: SettlementPatch) -> Result<bool, ValidationError> {
        patch.validate()?;
        let mut changed = false;
        if let Some(method) = patch.payment_method
            && self.payment_method != Some(method)
        {
            self.payment_method = Some(method);
            changed = true;
        }
        if let Some(notes) = patch.notes
            && self.notes != notes
        {
            self.notes = notes;
            changed = true;
        }
        Ok(changed)
    }

    /// Applies a status change.
    ///
    /// `Pending` may move to `Completed` or `Cancelled`; both are terminal.
    /// Requesting the current status again is accepted without change, and a
    /// repeated completion still asks for reconciliation, which is idempotent.
    pub fn transition(
        &mut self,
        to: SettlementStatus,
        at: DateTime<Utc>,
    ) -> Result<TransitionEffect, InvalidTransition> {
        use SettlementStatus::{Cancelled, Completed, Pending};

        match (self.status, to) {
            (Pending, Completed) => {
                self.status = Completed;
                self.settled_at = Some(at);
                Ok(TransitionEffect::Reconcile)
            }
            (Completed, Completed) => Ok(TransitionEffect::Reconcile),
            (Pending, Cancelled) => {
                self.status = Cancelled;
                Ok(TransitionEffect::None)
            }
            (Pending, Pending) | (Cancelled, Cancelled) => Ok(TransitionEffect::None),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SettlementStatus::{Cancelled, Completed, Pending};
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 2, 9, 30, 0).unwrap()
    }

    fn draft(from: &str, to: &str, cents: i64) -> SettlementDraft {
        SettlementDraft {
            group_id: GroupId::new("g1"),
            from: MemberSnapshot::new(from, from, format!("{from}@example.com")),
            to: MemberSnapshot::new(to, to, format!("{to}@example.com")),
            amount: Money::new(cents, 2),
            currency: CurrencyCode::default(),
            payment_method: Some(PaymentMethod::Upi),
            notes: String::new(),
            covered_entries: vec![EntryId::new("e1"), EntryId::new("e2"), EntryId::new("e1")],
        }
    }

    #[fixture]
    fn pending() -> Settlement {
        Settlement::new(SettlementId::new("s1"), draft("a", "b", 2000), at()).unwrap()
    }

    #[rstest]
    #[case::same_member(draft("a", "a", 2000), ValidationError::SelfSettlement)]
    #[case::one_cent(
        draft("a", "b", 1),
        ValidationError::SettlementAmountTooSmall(Money::new(1, 2))
    )]
    #[case::negative(
        draft("a", "b", -500),
        ValidationError::SettlementAmountTooSmall(Money::new(-500, 2))
    )]
    fn invalid_drafts(#[case] draft: SettlementDraft, #[case] expected: ValidationError) {
        assert_eq!(
            Settlement::new(SettlementId::new("s1"), draft, at()),
            Err(expected)
        );
    }

    #[rstest]
    fn covered_entries_are_deduplicated(pending: Settlement) {
        assert_eq!(
            pending.covered_entries,
            vec![EntryId::new("e1"), EntryId::new("e2")]
        );
    }

    #[rstest]
    #[case::complete(Pending, Completed, Ok(TransitionEffect::Reconcile))]
    #[case::cancel(Pending, Cancelled, Ok(TransitionEffect::None))]
    #[case::complete_again(Completed, Completed, Ok(TransitionEffect::Reconcile))]
    #[case::reopen(Completed, Pending, Err(InvalidTransition { from: Completed, to: Pending }))]
    #[case::cancel_completed(
        Completed,
        Cancelled,
        Err(InvalidTransition { from: Completed, to: Cancelled })
    )]
    #[case::revive(Cancelled, Completed, Err(InvalidTransition { from: Cancelled, to: Completed }))]
    fn transition_cases(
        mut pending: Settlement,
        #[case] start: SettlementStatus,
        #[case] target: SettlementStatus,
        #[case] expected: Result<TransitionEffect, InvalidTransition>,
    ) {
        pending.status = start;
        assert_eq!(pending.transition(target, at()), expected);
    }

    #[rstest]
    #[case::method_and_notes(
        SettlementPatch { payment_method: Some(PaymentMethod::Cash), notes: Some("paid at dinner".into()) },
        Ok(true)
    )]
    #[case::same_values(
        SettlementPatch { payment_method: Some(PaymentMethod::Upi), notes: Some(String::new()) },
        Ok(false)
    )]
    #[case::empty(SettlementPatch::default(), Ok(false))]
    #[case::notes_too_long(
        SettlementPatch { payment_method: Some(PaymentMethod::Cash), notes: Some("x".repeat(501)) },
        Err(ValidationError::TooLong { field: "Notes", max: 500 })
    )]
    fn amend_cases(
        mut pending: Settlement,
        #[case] patch: SettlementPatch,
        #[case] expected: Result<bool, ValidationError>,
    ) {
        let before = pending.clone();
        let result = pending.amend(patch);
        if result.is_err() {
            assert_eq!(pending, before);
        }
        assert_eq!(result, expected);
    }

    #[rstest]
    fn completion_timestamp_is_kept_on_repeat(mut pending: Settlement) {
        let later = at() + chrono::Duration::days(1);
        pending.transition(Completed, at()).unwrap();
        pending.transition(Completed, later).unwrap();
        assert_eq!(pending.settled_at, Some(at()));
    }

    #[rstest]
    fn serializes_with_camel_case_keys(pending: Settlement) {
        let json = serde_json::to_value(&pending).unwrap();

        assert_eq!(json["groupId"], "g1");
        assert_eq!(json["paymentMethod"], "UPI");
        assert_eq!(json["coveredEntries"], serde_json::json!(["e1", "e2"]));
        assert!(json["settledAt"].is_null());
        assert!(json.get("created_at").is_none());
    }
}
