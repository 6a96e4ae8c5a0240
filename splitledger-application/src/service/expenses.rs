use super::LedgerService;
use crate::{
    error::{LedgerError, Resource},
    model::{Actor, EntryQuery, ExpenseFilter, ExpensePatch, NewExpense},
    ports::{GroupStore, LedgerStore, SettlementStore},
};
use splitledger_domain::{
    Admission, ApprovalGate, EntryDraft, EntryId, Group, GroupId, LedgerEntry, SplitCalculator,
    SplitRequest, ValidationError,
};

impl<G, L, S> LedgerService<G, L, S>
where
    G: GroupStore,
    L: LedgerStore,
    S: SettlementStore,
{
    /// Records a group expense, splitting it over the current active roster.
    pub async fn record_expense(
        &self,
        actor: &Actor,
        request: NewExpense,
    ) -> Result<LedgerEntry, LedgerError> {
        let group = self.member_group(actor, &request.group_id).await?;
        let Admission::Admitted { requires_approval } = ApprovalGate.admit(&group, &actor.user_id)
        else {
            return Err(LedgerError::Forbidden(
                "Members are not allowed to add expenses to this group",
            ));
        };

        let payer_id = request.paid_by.unwrap_or_else(|| actor.user_id.clone());
        let paid_by = group
            .active_member(&payer_id)
            .map(|member| member.snapshot())
            .ok_or(ValidationError::UnknownMember { member: payer_id })?;
        let split = request
            .split
            .unwrap_or_else(|| SplitRequest::without_shares(group.default_split_method));
        let splits = SplitCalculator.compute(request.amount, &split, &group.active_snapshots())?;

        let draft = EntryDraft {
            group_id: group.id.clone(),
            added_by: actor.user_id.clone(),
            name: request.name,
            description: request.description,
            amount: request.amount,
            currency: group.currency.clone(),
            category: request.category,
            date: request.date,
            paid_by,
        };
        let entry = LedgerEntry::new(
            EntryId::new(self.ids.next_id()),
            draft,
            split.method(),
            splits,
            requires_approval,
            self.clock.now(),
        )?;

        let entry = self
            .insert_with_fresh_id(
                Resource::Expense,
                entry,
                |entry, id| entry.id = EntryId::new(id),
                |entry| self.ledger.insert(entry),
            )
            .await?;

        tracing::info!(
            group_id = %entry.group_id,
            entry_id = %entry.id,
            amount = %entry.amount,
            method = ?entry.split_method,
            requires_approval,
            "Expense recorded"
        );
        Ok(entry)
    }

    pub async fn list_expenses(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        filter: ExpenseFilter,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to)
            && from > to
        {
            return Err(ValidationError::InvalidDateRange { from, to }.into());
        }

        let group = self.member_group(actor, group_id).await?;
        Ok(self
            .ledger
            .query(&EntryQuery::filtered(group.id, filter))
            .await?)
    }

    /// Edits an expense. The adder and group managers may change anything;
    /// the payer may only flip the settled flag.
    pub async fn update_expense(
        &self,
        actor: &Actor,
        id: &EntryId,
        patch: ExpensePatch,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut entry = self.load_entry(id).await?;
        let group = self.load_group(&entry.group_id).await?;

        let may_edit = entry.added_by == actor.user_id || group.can_manage(&actor.user_id);
        let is_payer = entry.paid_by.id == actor.user_id;
        if !may_edit && !(is_payer && patch.only_settled_flag()) {
            return Err(LedgerError::Forbidden(
                "You don't have permission to update this expense",
            ));
        }

        self.apply_expense_patch(&group, &mut entry, patch)?;
        self.ledger.update(entry.clone()).await?;
        tracing::info!(entry_id = %entry.id, actor = %actor.user_id, "Expense updated");
        Ok(entry)
    }

    fn apply_expense_patch(
        &self,
        group: &Group,
        entry: &mut LedgerEntry,
        patch: ExpensePatch,
    ) -> Result<(), LedgerError> {
        let now = self.clock.now();
        if let Some(name) = patch.name {
            entry.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(category) = patch.category {
            entry.category = category.trim().to_string();
        }
        if let Some(date) = patch.date {
            entry.date = date;
        }
        if let Some(amount) = patch.amount {
            entry.amount = amount;
        }
        if let Some(split) = patch.split {
            let splits = SplitCalculator.compute(entry.amount, &split, &group.active_snapshots())?;
            entry.replace_splits(split.method(), splits, now);
        }
        if let Some(settled) = patch.is_settled {
            entry.set_settled(settled, now);
        }
        entry.validate()?;
        Ok(())
    }

    /// Soft-deletes an expense; it stops counting towards balances.
    pub async fn delete_expense(&self, actor: &Actor, id: &EntryId) -> Result<(), LedgerError> {
        let mut entry = self.load_entry(id).await?;
        let group = self.load_group(&entry.group_id).await?;
        if entry.added_by != actor.user_id && !group.can_manage(&actor.user_id) {
            return Err(LedgerError::Forbidden(
                "You don't have permission to delete this expense",
            ));
        }

        entry.soft_delete();
        self.ledger.update(entry).await?;
        tracing::info!(entry_id = %id, actor = %actor.user_id, "Expense deleted");
        Ok(())
    }

    pub async fn approve_expense(
        &self,
        actor: &Actor,
        id: &EntryId,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut entry = self.load_entry(id).await?;
        let group = self.load_group(&entry.group_id).await?;
        if !ApprovalGate.may_approve(&group, &actor.user_id) {
            return Err(LedgerError::Forbidden("Only admins can approve expenses"));
        }

        if entry.approve(&actor.user_id, self.clock.now()) {
            self.ledger.update(entry.clone()).await?;
            tracing::info!(entry_id = %id, approver = %actor.user_id, "Expense approved");
        }
        Ok(entry)
    }
}
