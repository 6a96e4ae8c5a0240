use crate::model::{
    MemberSnapshot, Money, ShareAmount, SharePercentage, Split, SplitRequest, UserId,
    ValidationError,
};
use fxhash::{FxHashMap, FxHashSet};
use rust_decimal::{Decimal, RoundingStrategy};

/// Turns an expense amount and a split request into per-member shares.
///
/// The calculator is pure. Its output is checked again by
/// [`LedgerEntry::validate`](crate::model::LedgerEntry::validate) when the
/// entry is stored, so a caller that bypasses it cannot persist a bad split.
pub struct SplitCalculator;

impl SplitCalculator {
    /// Computes the splits for `amount`.
    ///
    /// `participants` is the group's active roster in display order. `Equal`
    /// divides over all of them; the other methods only use it to resolve
    /// member snapshots and reject unknown ids.
    pub fn compute(
        &self,
        amount: Money,
        request: &SplitRequest,
        participants: &[MemberSnapshot],
    ) -> Result<Vec<Split>, ValidationError> {
        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount(amount));
        }

        match request {
            SplitRequest::Equal => Self::equal(amount, participants),
            SplitRequest::Percentage(shares) => Self::percentage(amount, shares, participants),
            SplitRequest::Custom(shares) | SplitRequest::Exact(shares) => {
                Self::direct(shares, participants)
            }
        }
    }

    /// Floors every share to the cent and hands the residual to the last
    /// participant, so the shares add up to `amount` exactly.
    fn equal(amount: Money, participants: &[MemberSnapshot]) -> Result<Vec<Split>, ValidationError> {
        let count = participants.len();
        if count == 0 {
            return Err(ValidationError::NoParticipants);
        }

        let share = amount.divide(count).floor_cents();
        let residual = amount
            - share
                .checked_mul(Decimal::from(count))
                .ok_or(ValidationError::AmountOutOfRange)?;
        let percentage = (Decimal::ONE_HUNDRED / Decimal::from(count))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        let splits = participants
            .iter()
            .enumerate()
            .map(|(idx, member)| {
                let amount = if idx + 1 == count { share + residual } else { share };
                Split::owed(member.clone(), amount, percentage)
            })
            .collect();

        Ok(splits)
    }

    fn percentage(
        amount: Money,
        shares: &[SharePercentage],
        participants: &[MemberSnapshot],
    ) -> Result<Vec<Split>, ValidationError> {
        if shares.is_empty() {
            return Err(ValidationError::NoParticipants);
        }

        let mut roster = Roster::new(participants);
        let mut splits = Vec::with_capacity(shares.len());
        for share in shares {
            let member = roster.claim(&share.member)?;
            if share.percentage < Decimal::ZERO || share.percentage > Decimal::ONE_HUNDRED {
                return Err(ValidationError::PercentageOutOfRange {
                    member: share.member.clone(),
                });
            }
            let owed = amount
                .checked_mul(share.percentage / Decimal::ONE_HUNDRED)
                .ok_or(ValidationError::AmountOutOfRange)?
                .round_cents();
            splits.push(Split::owed(member.clone(), owed, share.percentage));
        }

        absorb_rounding_drift(amount, &mut splits)?;
        Ok(splits)
    }

    fn direct(
        shares: &[ShareAmount],
        participants: &[MemberSnapshot],
    ) -> Result<Vec<Split>, ValidationError> {
        if shares.is_empty() {
            return Err(ValidationError::NoParticipants);
        }

        let mut roster = Roster::new(participants);
        let mut splits = Vec::with_capacity(shares.len());
        for share in shares {
            let member = roster.claim(&share.member)?;
            if share.amount.is_negative() {
                return Err(ValidationError::NegativeShare {
                    member: share.member.clone(),
                });
            }
            splits.push(Split::owed(member.clone(), share.amount, Decimal::ZERO));
        }
        Ok(splits)
    }
}

/// Per-row rounding can leave the total a few cents away from `amount`.
/// When the gap is no larger than what rounding alone could produce, it is
/// taken up by the trailing splits: a shortfall goes onto the last split, an
/// excess is removed from the last splits without taking any below zero.
/// Larger gaps come from percentages that do not add up to 100 and are left
/// for entry validation.
fn absorb_rounding_drift(amount: Money, splits: &mut [Split]) -> Result<(), ValidationError> {
    let total = Money::checked_sum(splits.iter().map(|split| split.amount))
        .ok_or(ValidationError::AmountOutOfRange)?;
    let drift = amount - total;
    if drift.is_zero() {
        return Ok(());
    }

    let rounding_bound = Money::half_cent() * Decimal::from(splits.len());
    if drift.abs() > rounding_bound {
        tracing::debug!(
            amount = %amount,
            total = %total,
            drift = %drift,
            "Percentage split drift exceeds rounding bound; leaving shares uncorrected"
        );
        return Ok(());
    }

    if drift.is_positive() {
        if let Some(last) = splits.last_mut() {
            last.amount += drift;
        }
        return Ok(());
    }

    let mut excess = -drift;
    for split in splits.iter_mut().rev() {
        if excess.is_zero() {
            break;
        }
        let taken = excess.min(split.amount);
        split.amount -= taken;
        excess -= taken;
    }
    Ok(())
}

struct Roster<'a> {
    members: FxHashMap<&'a UserId, &'a MemberSnapshot>,
    claimed: FxHashSet<&'a UserId>,
}

impl<'a> Roster<'a> {
    fn new(participants: &'a [MemberSnapshot]) -> Self {
        Self {
            members: participants.iter().map(|member| (&member.id, member)).collect(),
            claimed: Default::default(),
        }
    }

    /// Resolves a member id, rejecting ids outside the roster and repeats.
    fn claim(&mut self, id: &UserId) -> Result<&'a MemberSnapshot, ValidationError> {
        let Some((&key, &member)) = self.members.get_key_value(id) else {
            return Err(ValidationError::UnknownMember { member: id.clone() });
        };
        if !self.claimed.insert(key) {
            return Err(ValidationError::DuplicateShare { member: id.clone() });
        }
        Ok(member)
    }
}
