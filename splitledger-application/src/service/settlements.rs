use super::LedgerService;
use crate::{
    error::{LedgerError, Resource},
    model::{Actor, EntryQuery, NewSettlement},
    ports::{GroupStore, LedgerStore, SettlementStore},
};
use chrono::{DateTime, Utc};
use splitledger_domain::{
    BalanceAggregator, Group, GroupId, MemberBalances, MemberSnapshot, Settlement,
    SettlementDraft, SettlementId, SettlementMatcher, SettlementPatch, SettlementPlan,
    SettlementStatus, TransitionEffect, UserId, ValidationError,
};

impl<G, L, S> LedgerService<G, L, S>
where
    G: GroupStore,
    L: LedgerStore,
    S: SettlementStore,
{
    /// Per-member balances over the group's outstanding entries.
    pub async fn get_balances(
        &self,
        actor: &Actor,
        group_id: &GroupId,
    ) -> Result<MemberBalances, LedgerError> {
        let group = self.member_group(actor, group_id).await?;
        self.outstanding_balances(&group).await
    }

    pub async fn suggest_settlements(
        &self,
        actor: &Actor,
        group_id: &GroupId,
    ) -> Result<SettlementPlan, LedgerError> {
        let group = self.member_group(actor, group_id).await?;
        let balances = self.outstanding_balances(&group).await?;
        Ok(SettlementMatcher.plan(balances))
    }

    pub(super) async fn outstanding_balances(
        &self,
        group: &Group,
    ) -> Result<MemberBalances, LedgerError> {
        let entries = self
            .ledger
            .query(&EntryQuery {
                is_settled: Some(false),
                ..EntryQuery::active(group.id.clone())
            })
            .await?;
        Ok(BalanceAggregator.aggregate(&group.active_snapshots(), &entries)?)
    }

    /// Records a pending transfer between two active members.
    pub async fn declare_settlement(
        &self,
        actor: &Actor,
        request: NewSettlement,
    ) -> Result<Settlement, LedgerError> {
        let group = self.member_group(actor, &request.group_id).await?;
        let draft = SettlementDraft {
            from: active_snapshot(&group, request.from)?,
            to: active_snapshot(&group, request.to)?,
            group_id: group.id.clone(),
            amount: request.amount,
            currency: group.currency.clone(),
            payment_method: request.payment_method,
            notes: request.notes,
            covered_entries: request.covered_entries,
        };
        let settlement = Settlement::new(
            SettlementId::new(self.ids.next_id()),
            draft,
            self.clock.now(),
        )?;

        let settlement = self
            .insert_with_fresh_id(
                Resource::Settlement,
                settlement,
                |settlement, id| settlement.id = SettlementId::new(id),
                |settlement| self.settlements.insert(settlement),
            )
            .await?;

        tracing::info!(
            group_id = %settlement.group_id,
            settlement_id = %settlement.id,
            from = %settlement.from.id,
            to = %settlement.to.id,
            amount = %settlement.amount,
            covered = settlement.covered_entries.len(),
            "Settlement declared"
        );
        Ok(settlement)
    }

    /// Moves a settlement to `status`, applying `details` in the same write.
    /// Completing it marks every covered entry of the same group settled;
    /// entries that cannot be marked are logged and skipped.
    pub async fn transition_settlement(
        &self,
        actor: &Actor,
        id: &SettlementId,
        status: SettlementStatus,
        details: SettlementPatch,
    ) -> Result<Settlement, LedgerError> {
        let mut settlement = self.load_settlement(id).await?;
        let group = self.load_group(&settlement.group_id).await?;
        if !group.is_member(&actor.user_id) {
            return Err(LedgerError::Forbidden(
                "You don't have access to this settlement",
            ));
        }

        details.validate()?;
        let from = settlement.status;
        let now = self.clock.now();
        let effect = settlement.transition(status, now)?;
        let amended = settlement.amend(details)?;
        if from != settlement.status || amended {
            self.settlements.update(settlement.clone()).await?;
            tracing::info!(
                settlement_id = %id,
                from = %from,
                to = %settlement.status,
                amended,
                actor = %actor.user_id,
                "Settlement updated"
            );
        }

        if effect == TransitionEffect::Reconcile {
            self.reconcile(&settlement, now).await;
        }
        Ok(settlement)
    }

    async fn reconcile(&self, settlement: &Settlement, at: DateTime<Utc>) {
        let mut marked = 0usize;
        for entry_id in &settlement.covered_entries {
            match self.ledger.get(entry_id).await {
                Ok(Some(entry)) if entry.group_id == settlement.group_id => {}
                Ok(Some(entry)) => {
                    tracing::warn!(
                        settlement_id = %settlement.id,
                        entry_id = %entry_id,
                        entry_group = %entry.group_id,
                        "Covered expense belongs to another group; skipping"
                    );
                    continue;
                }
                Ok(None) => {
                    tracing::warn!(
                        settlement_id = %settlement.id,
                        entry_id = %entry_id,
                        "Covered expense not found; skipping"
                    );
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        settlement_id = %settlement.id,
                        entry_id = %entry_id,
                        error = %err,
                        "Failed to load covered expense; skipping"
                    );
                    continue;
                }
            }

            match self.ledger.mark_settled(entry_id, at).await {
                Ok(true) => marked += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(
                    settlement_id = %settlement.id,
                    entry_id = %entry_id,
                    error = %err,
                    "Failed to mark covered expense settled; skipping"
                ),
            }
        }

        tracing::debug!(
            settlement_id = %settlement.id,
            covered = settlement.covered_entries.len(),
            marked,
            "Reconciled settlement"
        );
    }

    /// Active settlements of a group, newest first.
    pub async fn list_settlements(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, LedgerError> {
        let group = self.member_group(actor, group_id).await?;
        Ok(self.settlements.list_for_group(&group.id, status).await?)
    }
}

fn active_snapshot(group: &Group, id: UserId) -> Result<MemberSnapshot, ValidationError> {
    group
        .active_member(&id)
        .map(|member| member.snapshot())
        .ok_or(ValidationError::UnknownMember { member: id })
}
