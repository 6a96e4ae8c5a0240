use crate::model::{LedgerEntry, MemberSnapshot, Money, UserId, ValidationError};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberBalance {
    pub member: MemberSnapshot,
    pub total_paid: Money,
    pub total_owed: Money,
    /// `total_owed - total_paid`; positive means the member owes the group.
    pub balance: Money,
}

impl MemberBalance {
    fn empty(member: MemberSnapshot) -> Self {
        Self {
            member,
            total_paid: Money::ZERO,
            total_owed: Money::ZERO,
            balance: Money::ZERO,
        }
    }
}

/// Balances keyed by member, in group roster order.
pub type MemberBalances = IndexMap<UserId, MemberBalance>;

/// Folds outstanding ledger entries into per-member balances.
pub struct BalanceAggregator;

impl BalanceAggregator {
    /// Only active, unsettled entries contribute. Payers and split members
    /// outside `members` are ignored. Fails if a running total overflows.
    pub fn aggregate<'a, I>(
        &self,
        members: &[MemberSnapshot],
        entries: I,
    ) -> Result<MemberBalances, ValidationError>
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut balances: MemberBalances = members
            .iter()
            .map(|member| (member.id.clone(), MemberBalance::empty(member.clone())))
            .collect();

        let mut counted = 0usize;
        for entry in entries.into_iter().filter(|entry| entry.is_outstanding()) {
            counted += 1;
            if let Some(payer) = balances.get_mut(&entry.paid_by.id) {
                payer.total_paid = accumulate(payer.total_paid, entry.amount)?;
            }
            for split in &entry.splits {
                if let Some(debtor) = balances.get_mut(&split.member.id) {
                    debtor.total_owed = accumulate(debtor.total_owed, split.amount)?;
                }
            }
        }

        for balance in balances.values_mut() {
            balance.balance = balance.total_owed - balance.total_paid;
        }

        tracing::debug!(
            members = balances.len(),
            entries = counted,
            "Aggregated member balances"
        );
        Ok(balances)
    }
}

fn accumulate(total: Money, amount: Money) -> Result<Money, ValidationError> {
    total
        .checked_add(amount)
        .ok_or(ValidationError::AmountOutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CurrencyCode, EntryDraft, EntryId, GroupId, Split, SplitMethod};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;

    fn member(id: &str) -> MemberSnapshot {
        MemberSnapshot::new(id, id.to_uppercase(), format!("{id}@example.com"))
    }

    fn entry(id: &str, payer: &str, shares: &[(&str, i64)]) -> LedgerEntry {
        let amount: Money = shares.iter().map(|(_, cents)| Money::new(*cents, 2)).sum();
        LedgerEntry::new(
            EntryId::new(id),
            EntryDraft {
                group_id: GroupId::new("g1"),
                added_by: UserId::new(payer),
                name: format!("Entry {id}"),
                description: String::new(),
                amount,
                currency: CurrencyCode::default(),
                category: "General".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                paid_by: member(payer),
            },
            SplitMethod::Exact,
            shares
                .iter()
                .map(|(who, cents)| Split::owed(member(who), Money::new(*cents, 2), Decimal::ZERO))
                .collect(),
            false,
            Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[fixture]
    fn roster() -> Vec<MemberSnapshot> {
        vec![member("a"), member("b"), member("c")]
    }

    fn balance_of(balances: &MemberBalances, id: &str) -> Money {
        balances[&UserId::new(id)].balance
    }

    #[rstest]
    fn payer_is_credited_and_members_debited(roster: Vec<MemberSnapshot>) {
        let entries = [entry("e1", "a", &[("a", 3000), ("b", 3000), ("c", 3000)])];
        let balances = BalanceAggregator.aggregate(&roster, &entries).unwrap();

        let a = &balances[&UserId::new("a")];
        assert_eq!(a.total_paid, Money::from_i64(90));
        assert_eq!(a.total_owed, Money::from_i64(30));
        assert_eq!(a.balance, Money::from_i64(-60));
        assert_eq!(balance_of(&balances, "b"), Money::from_i64(30));
        assert_eq!(balance_of(&balances, "c"), Money::from_i64(30));
    }

    #[rstest]
    fn settled_and_deleted_entries_are_skipped(roster: Vec<MemberSnapshot>) {
        let mut settled = entry("e1", "a", &[("b", 5000)]);
        settled.mark_settled(Utc.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap());
        let mut deleted = entry("e2", "b", &[("a", 2000)]);
        deleted.soft_delete();
        let live = entry("e3", "c", &[("a", 1000), ("c", 1000)]);

        let balances = BalanceAggregator
            .aggregate(&roster, [&settled, &deleted, &live])
            .unwrap();

        assert_eq!(balance_of(&balances, "a"), Money::from_i64(10));
        assert_eq!(balance_of(&balances, "b"), Money::ZERO);
        assert_eq!(balance_of(&balances, "c"), Money::from_i64(-10));
    }

    #[rstest]
    fn members_outside_snapshot_are_not_reported(roster: Vec<MemberSnapshot>) {
        let entries = [entry("e1", "z", &[("a", 1000), ("z", 1000)])];
        let balances = BalanceAggregator.aggregate(&roster, &entries).unwrap();

        assert_eq!(balances.len(), 3);
        assert!(!balances.contains_key(&UserId::new("z")));
        assert_eq!(balance_of(&balances, "a"), Money::from_i64(10));
    }

    #[rstest]
    fn overflowing_totals_are_rejected(roster: Vec<MemberSnapshot>) {
        let max = Money::from_decimal(Decimal::MAX);
        let big = |id: &str| {
            let mut entry = entry(id, "a", &[("b", 100)]);
            entry.amount = max;
            entry.splits[0].amount = max;
            entry
        };
        let entries = [big("e1"), big("e2")];

        assert_eq!(
            BalanceAggregator.aggregate(&roster, &entries),
            Err(ValidationError::AmountOutOfRange)
        );
    }

    #[rstest]
    fn output_follows_roster_order(roster: Vec<MemberSnapshot>) {
        let balances = BalanceAggregator.aggregate(&roster, &[]).unwrap();
        let order: Vec<&str> = balances.keys().map(UserId::as_str).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
