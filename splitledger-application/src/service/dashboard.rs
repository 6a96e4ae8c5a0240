use super::LedgerService;
use crate::{
    error::{LedgerError, Resource},
    model::{Actor, DashboardStats, EntryQuery, GroupDashboard, GroupStats},
    ports::{GroupStore, LedgerStore, SettlementStore},
};
use splitledger_domain::{
    BalanceAggregator, GroupId, LedgerEntry, Money, SettlementStatus, ValidationError,
};

const RECENT_LIMIT: usize = 10;

impl<G, L, S> LedgerService<G, L, S>
where
    G: GroupStore,
    L: LedgerStore,
    S: SettlementStore,
{
    pub async fn group_dashboard(
        &self,
        actor: &Actor,
        group_id: &GroupId,
    ) -> Result<GroupDashboard, LedgerError> {
        let group = self.member_group(actor, group_id).await?;
        let entries = self.ledger.query(&EntryQuery::active(group.id.clone())).await?;
        let settlements = self.settlements.list_for_group(&group.id, None).await?;

        let settled: Vec<&LedgerEntry> = entries.iter().filter(|entry| entry.is_settled).collect();
        let stats = DashboardStats {
            total_expenses: total_amount(&entries)?,
            total_expense_count: entries.len(),
            unsettled_expenses: entries.len() - settled.len(),
            settled_expense_count: settled.len(),
            total_settled: total_amount(settled.iter().copied())?,
            pending_settlements: settlements
                .iter()
                .filter(|s| s.status == SettlementStatus::Pending)
                .count(),
            completed_settlements: settlements
                .iter()
                .filter(|s| s.status == SettlementStatus::Completed)
                .count(),
        };

        let actor_snapshot = group
            .active_member(&actor.user_id)
            .map(|member| member.snapshot())
            .ok_or_else(|| LedgerError::not_found(Resource::Member, &actor.user_id))?;
        let user_balance = BalanceAggregator
            .aggregate(std::slice::from_ref(&actor_snapshot), &entries)?
            .shift_remove(&actor_snapshot.id)
            .ok_or_else(|| LedgerError::not_found(Resource::Member, &actor.user_id))?;

        Ok(GroupDashboard {
            group,
            stats,
            recent_expenses: entries.into_iter().take(RECENT_LIMIT).collect(),
            recent_settlements: settlements.into_iter().take(RECENT_LIMIT).collect(),
            user_balance,
        })
    }

    /// Counters shown next to each group in a listing.
    pub(super) async fn group_stats(&self, group_id: &GroupId) -> Result<GroupStats, LedgerError> {
        let entries = self.ledger.query(&EntryQuery::active(group_id.clone())).await?;
        let pending = self
            .settlements
            .list_for_group(group_id, Some(SettlementStatus::Pending))
            .await?;

        Ok(GroupStats {
            total_expenses: total_amount(&entries)?,
            total_expense_count: entries.len(),
            unsettled_expenses: entries.iter().filter(|entry| !entry.is_settled).count(),
            pending_settlements: pending.len(),
        })
    }
}

fn total_amount<'a>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
) -> Result<Money, ValidationError> {
    Money::checked_sum(entries.into_iter().map(|entry| entry.amount))
        .ok_or(ValidationError::AmountOutOfRange)
}
