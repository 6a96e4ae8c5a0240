use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use splitledger_domain::{
    BalanceAggregator, CurrencyCode, EntryDraft, EntryId, GroupId, LedgerEntry, MemberBalance,
    MemberBalances, MemberSnapshot, Money, SettlementMatcher, SharePercentage, SplitCalculator,
    SplitMethod, SplitRequest, UserId,
};
use rust_decimal::Decimal;

fn roster(count: usize) -> Vec<MemberSnapshot> {
    (0..count)
        .map(|idx| MemberSnapshot::new(format!("m{idx}"), format!("M{idx}"), format!("m{idx}@example.com")))
        .collect()
}

fn balances_from_cents(cents: &[i64]) -> MemberBalances {
    let closing = -cents.iter().sum::<i64>();
    let members = roster(cents.len() + 1);
    cents
        .iter()
        .copied()
        .chain(std::iter::once(closing))
        .zip(members)
        .map(|(cents, member)| {
            (
                member.id.clone(),
                MemberBalance {
                    member,
                    total_paid: Money::ZERO,
                    total_owed: Money::ZERO,
                    balance: Money::new(cents, 2),
                },
            )
        })
        .collect()
}

fn apply(balances: &MemberBalances, matcher: &SettlementMatcher) -> Vec<Money> {
    let mut remaining: Vec<(UserId, Money)> = balances
        .values()
        .map(|balance| (balance.member.id.clone(), balance.balance))
        .collect();
    for transfer in matcher.suggest(balances) {
        for (id, balance) in remaining.iter_mut() {
            if *id == transfer.from.id {
                *balance -= transfer.amount;
            }
            if *id == transfer.to.id {
                *balance += transfer.amount;
            }
        }
    }
    remaining.into_iter().map(|(_, balance)| balance).collect()
}

proptest! {
    #[test]
    fn equal_split_is_exact_and_fair(cents in 1i64..=10_000_000, count in 1usize..=12) {
        let amount = Money::new(cents, 2);
        let splits = SplitCalculator
            .compute(amount, &SplitRequest::Equal, &roster(count))
            .expect("equal split failed");

        prop_assert_eq!(splits.len(), count);
        prop_assert_eq!(splits.iter().map(|split| split.amount).sum::<Money>(), amount);

        let max = splits.iter().map(|split| split.amount).max().unwrap_or_default();
        let min = splits.iter().map(|split| split.amount).min().unwrap_or_default();
        prop_assert!(max - min <= Money::cent());
    }
}

/// Percentages with two decimals that add up to exactly 100.
fn percentages_from_weights(weights: &[u32]) -> Vec<Decimal> {
    let total: u32 = weights.iter().sum();
    let mut basis_points: Vec<i64> = weights
        .iter()
        .map(|weight| i64::from(weight * 10_000 / total))
        .collect();
    let assigned: i64 = basis_points.iter().sum();
    if let Some(last) = basis_points.last_mut() {
        *last += 10_000 - assigned;
    }
    basis_points.into_iter().map(|bp| Decimal::new(bp, 2)).collect()
}

proptest! {
    #[test]
    fn percentage_split_is_exact_and_recordable(
        cents in 1i64..=10_000_000,
        weights in prop::collection::vec(1u32..=1000, 3..=8),
    ) {
        let members = roster(weights.len());
        let shares: Vec<SharePercentage> = members
            .iter()
            .zip(percentages_from_weights(&weights))
            .map(|(member, percentage)| SharePercentage {
                member: member.id.clone(),
                percentage,
            })
            .collect();
        let amount = Money::new(cents, 2);
        let splits = SplitCalculator
            .compute(amount, &SplitRequest::Percentage(shares), &members)
            .expect("percentage split failed");

        prop_assert_eq!(splits.iter().map(|split| split.amount).sum::<Money>(), amount);
        prop_assert!(splits.iter().all(|split| split.amount >= Money::ZERO));

        let payer = members[0].clone();
        let entry = LedgerEntry::new(
            EntryId::new("e1"),
            EntryDraft {
                group_id: GroupId::new("g1"),
                added_by: payer.id.clone(),
                name: "Shared bill".to_string(),
                description: String::new(),
                amount,
                currency: CurrencyCode::default(),
                category: "General".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date"),
                paid_by: payer,
            },
            SplitMethod::Percentage,
            splits,
            false,
            Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
        );
        prop_assert!(entry.is_ok(), "{:?}", entry.err());
    }
}

proptest! {
    #[test]
    fn aggregation_is_a_closed_system(
        member_count in 1usize..=6,
        entries in prop::collection::vec((1i64..=500_000, 0usize..=5, 1usize..=63), 0..=20),
    ) {
        let members = roster(member_count);
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();

        let mut ledger = Vec::with_capacity(entries.len());
        for (idx, (cents, payer, mask)) in entries.into_iter().enumerate() {
            let participants: Vec<MemberSnapshot> = members
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, member)| member.clone())
                .collect();
            if participants.is_empty() {
                continue;
            }
            let amount = Money::new(cents, 2);
            let splits = SplitCalculator
                .compute(amount, &SplitRequest::Equal, &participants)
                .expect("equal split failed");
            let payer = members[payer % member_count].clone();
            let entry = LedgerEntry::new(
                EntryId::new(format!("e{idx}")),
                EntryDraft {
                    group_id: GroupId::new("g1"),
                    added_by: payer.id.clone(),
                    name: format!("Entry {idx}"),
                    description: String::new(),
                    amount,
                    currency: CurrencyCode::default(),
                    category: "General".to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date"),
                    paid_by: payer,
                },
                SplitMethod::Equal,
                splits,
                false,
                at,
            )
            .expect("entry rejected");
            ledger.push(entry);
        }

        let balances = BalanceAggregator.aggregate(&members, &ledger).unwrap();
        let total: Money = ledger.iter().map(|entry| entry.amount).sum();
        let paid: Money = balances.values().map(|balance| balance.total_paid).sum();
        let owed: Money = balances.values().map(|balance| balance.total_owed).sum();
        let net: Money = balances.values().map(|balance| balance.balance).sum();

        prop_assert_eq!(paid, total);
        prop_assert_eq!(owed, total);
        prop_assert_eq!(net, Money::ZERO);
    }
}

proptest! {
    #[test]
    fn whole_unit_balances_are_fully_settled(
        units in prop::collection::vec(-1_000i64..=1_000, 1..=8),
    ) {
        let cents: Vec<i64> = units.iter().map(|unit| unit * 100).collect();
        let balances = balances_from_cents(&cents);
        let matcher = SettlementMatcher;

        let transfers = matcher.suggest(&balances);
        prop_assert!(transfers.len() < balances.len());
        prop_assert!(transfers.iter().all(|transfer| transfer.amount > Money::cent()));
        prop_assert!(apply(&balances, &matcher).into_iter().all(|balance| balance.is_zero()));
    }
}

proptest! {
    #[test]
    fn cent_balances_leave_only_dust(
        cents in prop::collection::vec(-100_000i64..=100_000, 1..=8),
    ) {
        let balances = balances_from_cents(&cents);
        let matcher = SettlementMatcher;
        let bound = Money::cent() * Decimal::from(balances.len());

        let transfers = matcher.suggest(&balances);
        prop_assert!(transfers.len() < balances.len());

        let remaining = apply(&balances, &matcher);
        prop_assert_eq!(remaining.iter().sum::<Money>(), Money::ZERO);
        prop_assert!(remaining.iter().all(|balance| balance.abs() <= bound));
    }
}
