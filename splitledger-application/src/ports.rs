use crate::{error::StoreError, model::EntryQuery};
use chrono::{DateTime, Utc};
use splitledger_domain::{
    EntryId, Group, GroupId, LedgerEntry, MemberSnapshot, Settlement, SettlementId,
    SettlementStatus, UserId,
};

/// Persistence for groups and their rosters.
pub trait GroupStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateId`] if the id is taken.
    fn insert(&self, group: Group) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(&self, id: &GroupId) -> impl Future<Output = Result<Option<Group>, StoreError>> + Send;

    /// Replaces a stored group. Fails with [`StoreError::Missing`] if absent.
    fn update(&self, group: Group) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Groups, archived ones included, in which `user` is an active member,
    /// oldest first.
    fn list_for_member(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Group>, StoreError>> + Send;

    fn delete(&self, id: &GroupId) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Persistence for ledger entries.
///
/// Implementations validate every entry they accept and report violations
/// as [`StoreError::Rejected`].
pub trait LedgerStore: Send + Sync {
    fn insert(&self, entry: LedgerEntry) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(
        &self,
        id: &EntryId,
    ) -> impl Future<Output = Result<Option<LedgerEntry>, StoreError>> + Send;

    fn update(&self, entry: LedgerEntry) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Entries matching `query`, newest expense date first.
    fn query(
        &self,
        query: &EntryQuery,
    ) -> impl Future<Output = Result<Vec<LedgerEntry>, StoreError>> + Send;

    /// Atomically flags one entry as settled. Returns `false` when it
    /// already was.
    fn mark_settled(
        &self,
        id: &EntryId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes every entry of a group, returning how many were dropped.
    fn delete_for_group(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

pub trait SettlementStore: Send + Sync {
    fn insert(
        &self,
        settlement: Settlement,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(
        &self,
        id: &SettlementId,
    ) -> impl Future<Output = Result<Option<Settlement>, StoreError>> + Send;

    fn update(
        &self,
        settlement: Settlement,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Active settlements of a group, newest first.
    fn list_for_group(
        &self,
        group: &GroupId,
        status: Option<SettlementStatus>,
    ) -> impl Future<Output = Result<Vec<Settlement>, StoreError>> + Send;

    fn delete_for_group(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// Registered users, looked up synchronously.
pub trait UserDirectory: Send + Sync {
    fn find_by_id(&self, id: &UserId) -> Option<MemberSnapshot>;

    /// Case-insensitive lookup.
    fn find_by_email(&self, email: &str) -> Option<MemberSnapshot>;
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
