mod dashboard;
mod expenses;
mod groups;
mod settlements;

use crate::{
    config::LedgerConfig,
    error::{LedgerError, Resource, StoreError},
    model::Actor,
    ports::{Clock, GroupStore, IdGenerator, LedgerStore, SettlementStore, UserDirectory},
};
use splitledger_domain::{EntryId, Group, GroupId, LedgerEntry, Settlement, SettlementId};
use std::sync::Arc;

/// Every ledger operation, checked against the acting user's membership.
///
/// Stores are generic so adapters keep their async `impl Future` methods;
/// the synchronous collaborators sit behind `Arc<dyn _>`.
pub struct LedgerService<G, L, S> {
    groups: G,
    ledger: L,
    settlements: S,
    directory: Arc<dyn UserDirectory>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl<G, L, S> LedgerService<G, L, S>
where
    G: GroupStore,
    L: LedgerStore,
    S: SettlementStore,
{
    pub fn new(
        groups: G,
        ledger: L,
        settlements: S,
        directory: Arc<dyn UserDirectory>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            groups,
            ledger,
            settlements,
            directory,
            ids,
            clock,
            config,
        }
    }

    /// Loads a group whether or not it is archived.
    async fn stored_group(&self, id: &GroupId) -> Result<Group, LedgerError> {
        self.groups
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(Resource::Group, id))
    }

    async fn load_group(&self, id: &GroupId) -> Result<Group, LedgerError> {
        let group = self.stored_group(id).await?;
        if !group.is_active {
            return Err(LedgerError::not_found(Resource::Group, id));
        }
        Ok(group)
    }

    /// Loads a group the actor is an active member of.
    async fn member_group(&self, actor: &Actor, id: &GroupId) -> Result<Group, LedgerError> {
        let group = self.load_group(id).await?;
        if !group.is_member(&actor.user_id) {
            return Err(LedgerError::Forbidden("You don't have access to this group"));
        }
        Ok(group)
    }

    async fn load_entry(&self, id: &EntryId) -> Result<LedgerEntry, LedgerError> {
        match self.ledger.get(id).await? {
            Some(entry) if entry.is_active => Ok(entry),
            _ => Err(LedgerError::not_found(Resource::Expense, id)),
        }
    }

    async fn load_settlement(&self, id: &SettlementId) -> Result<Settlement, LedgerError> {
        self.settlements
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(Resource::Settlement, id))
    }

    /// Inserts `record`, drawing a new id each time the store reports a
    /// collision, up to `max_id_attempts` tries.
    async fn insert_with_fresh_id<T, F, Fut>(
        &self,
        resource: Resource,
        mut record: T,
        reassign: impl Fn(&mut T, String),
        insert: F,
    ) -> Result<T, LedgerError>
    where
        T: Clone,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let attempts = self.config.max_id_attempts.max(1);
        for attempt in 1..=attempts {
            match insert(record.clone()).await {
                Ok(()) => return Ok(record),
                Err(StoreError::DuplicateId { id, .. }) => {
                    tracing::warn!(
                        resource = %resource,
                        id = %id,
                        attempt,
                        "Generated id collided with an existing record"
                    );
                    if attempt < attempts {
                        reassign(&mut record, self.ids.next_id());
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(LedgerError::Conflict { resource, attempts })
    }
}
