use crate::model::{Money, UserId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Input that is malformed or would break an aggregate invariant.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must be greater than 0 (found {0})")]
    NonPositiveAmount(Money),
    #[error("Amount is too large to be recorded")]
    AmountOutOfRange,
    #[error("{field} is required")]
    EmptyField { field: &'static str },
    #[error("{field} cannot exceed {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Currency code must be 3 letters (found `{0}`)")]
    InvalidCurrency(String),
    #[error("At least one participant is required to split an expense")]
    NoParticipants,
    #[error("Split amounts ({total}) must equal total amount ({amount})")]
    SplitSumMismatch { total: Money, amount: Money },
    #[error("Split percentages ({total}%) must sum to 100%")]
    PercentageSumMismatch { total: Decimal },
    #[error("Split amount for {member} cannot be negative")]
    NegativeShare { member: UserId },
    #[error("Percentage for {member} must be between 0 and 100")]
    PercentageOutOfRange { member: UserId },
    #[error("{member} appears more than once in the split")]
    DuplicateShare { member: UserId },
    #[error("{member} is not an active member of the group")]
    UnknownMember { member: UserId },
    #[error("No registered users found for the provided email(s)")]
    NoRegisteredUsers,
    #[error("Cannot remove the group owner")]
    OwnerRemoval,
    #[error("The owner role cannot be assigned or revoked")]
    OwnerRoleChange,
    #[error("From user and To user cannot be the same")]
    SelfSettlement,
    #[error("Settlement amount must be greater than 0.01 (found {0})")]
    SettlementAmountTooSmall(Money),
    #[error("Date range start {from} is after its end {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },
}

pub(crate) fn require_text(
    value: &str,
    field: &'static str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    require_max_len(value, field, max)
}

pub(crate) fn require_max_len(
    value: &str,
    field: &'static str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}
