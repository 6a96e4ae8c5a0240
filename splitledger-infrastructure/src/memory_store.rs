use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use splitledger_application::{
    EntryQuery, GroupStore, LedgerStore, Resource, SettlementStore, StoreError,
};
use splitledger_domain::{
    EntryId, Group, GroupId, LedgerEntry, Settlement, SettlementId, SettlementStatus, UserId,
};
use std::{hash::Hash, sync::Arc};

/// Inserts `value` only if `key` is free, under the shard lock.
fn insert_unique<K, V>(
    map: &DashMap<K, V>,
    key: K,
    value: V,
    resource: Resource,
) -> Result<(), StoreError>
where
    K: Eq + Hash + ToString,
{
    match map.entry(key) {
        Entry::Occupied(occupied) => Err(StoreError::DuplicateId {
            resource,
            id: occupied.key().to_string(),
        }),
        Entry::Vacant(vacant) => {
            vacant.insert(value);
            Ok(())
        }
    }
}

fn replace_existing<K, V>(
    map: &DashMap<K, V>,
    key: &K,
    value: V,
    resource: Resource,
) -> Result<(), StoreError>
where
    K: Eq + Hash + ToString,
{
    match map.get_mut(key) {
        Some(mut slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(StoreError::Missing {
            resource,
            id: key.to_string(),
        }),
    }
}

#[derive(Clone, Default)]
pub struct InMemoryGroupStore {
    inner: Arc<DashMap<GroupId, Group>>,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GroupStore for InMemoryGroupStore {
    async fn insert(&self, group: Group) -> Result<(), StoreError> {
        insert_unique(&self.inner, group.id.clone(), group, Resource::Group)
    }

    async fn get(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.inner.get(id).map(|group| group.value().clone()))
    }

    async fn update(&self, group: Group) -> Result<(), StoreError> {
        let id = group.id.clone();
        replace_existing(&self.inner, &id, group, Resource::Group)
    }

    async fn list_for_member(&self, user: &UserId) -> Result<Vec<Group>, StoreError> {
        let mut groups: Vec<Group> = self
            .inner
            .iter()
            .filter(|group| group.is_member(user))
            .map(|group| group.value().clone())
            .collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete(&self, id: &GroupId) -> Result<bool, StoreError> {
        Ok(self.inner.remove(id).is_some())
    }
}

/// Ledger entries keyed by id. Every write is re-validated.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    inner: Arc<DashMap<EntryId, LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    async fn insert(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        entry.validate()?;
        insert_unique(&self.inner, entry.id.clone(), entry, Resource::Expense)
    }

    async fn get(&self, id: &EntryId) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self.inner.get(id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        entry.validate()?;
        let id = entry.id.clone();
        replace_existing(&self.inner, &id, entry, Resource::Expense)
    }

    async fn query(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut entries: Vec<LedgerEntry> = self
            .inner
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(entries)
    }

    async fn mark_settled(&self, id: &EntryId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut entry = self.inner.get_mut(id).ok_or_else(|| StoreError::Missing {
            resource: Resource::Expense,
            id: id.to_string(),
        })?;
        Ok(entry.mark_settled(at))
    }

    async fn delete_for_group(&self, group: &GroupId) -> Result<usize, StoreError> {
        let before = self.inner.len();
        self.inner.retain(|_, entry| &entry.group_id != group);
        Ok(before.saturating_sub(self.inner.len()))
    }
}

#[derive(Clone, Default)]
pub struct InMemorySettlementStore {
    inner: Arc<DashMap<SettlementId, Settlement>>,
}

impl InMemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettlementStore for InMemorySettlementStore {
    async fn insert(&self, settlement: Settlement) -> Result<(), StoreError> {
        insert_unique(
            &self.inner,
            settlement.id.clone(),
            settlement,
            Resource::Settlement,
        )
    }

    async fn get(&self, id: &SettlementId) -> Result<Option<Settlement>, StoreError> {
        Ok(self.inner.get(id).map(|settlement| settlement.value().clone()))
    }

    async fn update(&self, settlement: Settlement) -> Result<(), StoreError> {
        let id = settlement.id.clone();
        replace_existing(&self.inner, &id, settlement, Resource::Settlement)
    }

    async fn list_for_group(
        &self,
        group: &GroupId,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, StoreError> {
        let mut settlements: Vec<Settlement> = self
            .inner
            .iter()
            .filter(|settlement| {
                &settlement.group_id == group
                    && status.is_none_or(|status| settlement.status == status)
            })
            .map(|settlement| settlement.value().clone())
            .collect();
        settlements.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(settlements)
    }

    async fn delete_for_group(&self, group: &GroupId) -> Result<usize, StoreError> {
        let before = self.inner.len();
        self.inner.retain(|_, settlement| &settlement.group_id != group);
        Ok(before.saturating_sub(self.inner.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;
    use splitledger_domain::{
        CurrencyCode, EntryDraft, GroupDraft, GroupPatch, MemberSnapshot, Money, Split,
        SplitMethod, ValidationError,
    };

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    fn entry(id: &str, group: &str, day: u32) -> LedgerEntry {
        let payer = MemberSnapshot::new("a", "A", "a@example.com");
        LedgerEntry::new(
            EntryId::new(id),
            EntryDraft {
                group_id: GroupId::new(group),
                added_by: payer.id.clone(),
                name: format!("Entry {id}"),
                description: String::new(),
                amount: Money::from_i64(20),
                currency: CurrencyCode::default(),
                category: "General".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
                paid_by: payer.clone(),
            },
            SplitMethod::Exact,
            vec![
                Split::owed(payer, Money::from_i64(10), Decimal::ZERO),
                Split::owed(
                    MemberSnapshot::new("b", "B", "b@example.com"),
                    Money::from_i64(10),
                    Decimal::ZERO,
                ),
            ],
            false,
            at(day),
        )
        .unwrap()
    }

    #[fixture]
    fn store() -> InMemoryLedgerStore {
        InMemoryLedgerStore::new()
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_ids_are_rejected(store: InMemoryLedgerStore) {
        store.insert(entry("e1", "g1", 1)).await.unwrap();
        let err = store.insert(entry("e1", "g1", 2)).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateId {
                resource: Resource::Expense,
                id: "e1".to_string()
            }
        );
        assert_eq!(
            store.get(&EntryId::new("e1")).await.unwrap().map(|e| e.date),
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_entries_are_rejected_at_the_boundary(store: InMemoryLedgerStore) {
        store.insert(entry("e1", "g1", 1)).await.unwrap();
        let mut broken = entry("e1", "g1", 1);
        broken.amount = Money::from_i64(25);

        let err = store.update(broken).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(ValidationError::SplitSumMismatch { .. })
        ));
        assert_eq!(
            store.get(&EntryId::new("e1")).await.unwrap().unwrap().amount,
            Money::from_i64(20)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn mark_settled_reports_first_change_only(store: InMemoryLedgerStore) {
        store.insert(entry("e1", "g1", 1)).await.unwrap();
        let id = EntryId::new("e1");

        assert!(store.mark_settled(&id, at(5)).await.unwrap());
        assert!(!store.mark_settled(&id, at(6)).await.unwrap());
        assert!(matches!(
            store.mark_settled(&EntryId::new("nope"), at(6)).await,
            Err(StoreError::Missing { .. })
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn query_filters_and_orders_newest_first(store: InMemoryLedgerStore) {
        for (id, group, day) in [("e1", "g1", 1), ("e2", "g1", 3), ("e3", "g2", 2), ("e4", "g1", 2)] {
            store.insert(entry(id, group, day)).await.unwrap();
        }
        store.mark_settled(&EntryId::new("e4"), at(9)).await.unwrap();

        let all = store.query(&EntryQuery::active(GroupId::new("g1"))).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e4", "e1"]);

        let unsettled = store
            .query(&EntryQuery {
                is_settled: Some(false),
                ..EntryQuery::active(GroupId::new("g1"))
            })
            .await
            .unwrap();
        assert_eq!(unsettled.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_for_group_leaves_other_groups(store: InMemoryLedgerStore) {
        store.insert(entry("e1", "g1", 1)).await.unwrap();
        store.insert(entry("e2", "g2", 1)).await.unwrap();

        assert_eq!(store.delete_for_group(&GroupId::new("g1")).await.unwrap(), 1);
        assert!(store.get(&EntryId::new("e2")).await.unwrap().is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn soft_deleted_entries_never_match(store: InMemoryLedgerStore) {
        store.insert(entry("e1", "g1", 1)).await.unwrap();
        let mut gone = entry("e2", "g1", 2);
        gone.soft_delete();
        store.insert(gone).await.unwrap();

        let found = store.query(&EntryQuery::active(GroupId::new("g1"))).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["e1"]);
    }

    #[tokio::test]
    async fn archived_groups_are_still_listed_for_members() {
        let store = InMemoryGroupStore::new();
        let owner = MemberSnapshot::new("a", "A", "a@example.com");
        for (id, hour) in [("g2", 2), ("g1", 1)] {
            let draft = GroupDraft {
                name: format!("Group {id}"),
                ..GroupDraft::default()
            };
            let group = Group::new(GroupId::new(id), draft, owner.clone(), at(hour)).unwrap();
            store.insert(group).await.unwrap();
        }
        let mut archived = store.get(&GroupId::new("g2")).await.unwrap().unwrap();
        archived
            .apply_patch(GroupPatch {
                is_active: Some(false),
                ..GroupPatch::default()
            })
            .unwrap();
        store.update(archived).await.unwrap();

        let listed = store.list_for_member(&owner.id).await.unwrap();
        let ids: Vec<(&str, bool)> = listed.iter().map(|g| (g.id.as_str(), g.is_active)).collect();
        assert_eq!(ids, vec![("g1", true), ("g2", false)]);
        assert!(store.list_for_member(&UserId::new("b")).await.unwrap().is_empty());
    }
}
