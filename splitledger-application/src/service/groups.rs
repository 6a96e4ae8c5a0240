use super::LedgerService;
use crate::{
    error::{LedgerError, Resource},
    model::{Actor, AddMembersOutcome, CreatedGroup, GroupFilter, GroupSummary, NewGroup},
    ports::{GroupStore, LedgerStore, SettlementStore},
};
use fxhash::FxHashSet;
use splitledger_domain::{Group, GroupId, GroupPatch, Role, UserId, ValidationError};

impl<G, L, S> LedgerService<G, L, S>
where
    G: GroupStore,
    L: LedgerStore,
    S: SettlementStore,
{
    /// Creates a group owned by the actor and invites `member_emails`.
    /// Addresses the directory does not know are returned, not rejected.
    pub async fn create_group(
        &self,
        actor: &Actor,
        request: NewGroup,
    ) -> Result<CreatedGroup, LedgerError> {
        let owner = self
            .directory
            .find_by_id(&actor.user_id)
            .ok_or_else(|| LedgerError::not_found(Resource::User, &actor.user_id))?;
        let (draft, emails) = request.into_parts();
        let now = self.clock.now();

        let mut group = Group::new(GroupId::new(self.ids.next_id()), draft, owner, now)?;
        let mut not_found_emails = Vec::new();
        let mut seen = FxHashSet::default();
        for email in emails {
            let email = email.trim();
            if email.is_empty() || !seen.insert(email.to_ascii_lowercase()) {
                continue;
            }
            match self.directory.find_by_email(email) {
                Some(identity) => {
                    group.add_member(identity, now);
                }
                None => not_found_emails.push(email.to_string()),
            }
        }

        let group = self
            .insert_with_fresh_id(
                Resource::Group,
                group,
                |group, id| group.id = GroupId::new(id),
                |group| self.groups.insert(group),
            )
            .await?;

        tracing::info!(
            group_id = %group.id,
            owner = %actor.user_id,
            members = group.members().len(),
            not_found = not_found_emails.len(),
            "Group created"
        );
        Ok(CreatedGroup {
            group,
            not_found_emails,
        })
    }

    pub async fn get_group(&self, actor: &Actor, id: &GroupId) -> Result<Group, LedgerError> {
        self.member_group(actor, id).await
    }

    /// Groups the actor belongs to, newest first, each with its expense and
    /// settlement counters.
    pub async fn list_groups(
        &self,
        actor: &Actor,
        filter: GroupFilter,
    ) -> Result<Vec<GroupSummary>, LedgerError> {
        let groups = self.groups.list_for_member(&actor.user_id).await?;
        let mut summaries = Vec::with_capacity(groups.len());
        for group in groups.into_iter().rev().filter(|group| filter.matches(group)) {
            let stats = self.group_stats(&group.id).await?;
            summaries.push(GroupSummary { group, stats });
        }
        Ok(summaries)
    }

    pub async fn update_group(
        &self,
        actor: &Actor,
        id: &GroupId,
        patch: GroupPatch,
    ) -> Result<Group, LedgerError> {
        // Archived groups stay reachable here so they can be restored.
        let mut group = self.stored_group(id).await?;
        if !group.is_member(&actor.user_id) {
            return Err(LedgerError::Forbidden("You don't have access to this group"));
        }
        if !group.can_manage(&actor.user_id) {
            return Err(LedgerError::Forbidden("Only owners and admins can update the group"));
        }

        group.apply_patch(patch)?;
        self.groups.update(group.clone()).await?;
        tracing::info!(
            group_id = %group.id,
            actor = %actor.user_id,
            is_active = group.is_active,
            "Group updated"
        );
        Ok(group)
    }

    pub async fn add_members(
        &self,
        actor: &Actor,
        id: &GroupId,
        emails: &[String],
    ) -> Result<AddMembersOutcome, LedgerError> {
        let mut group = self.member_group(actor, id).await?;
        if !group.can_manage(&actor.user_id) {
            return Err(LedgerError::Forbidden("Only owners and admins can add members"));
        }

        let now = self.clock.now();
        let mut added = Vec::new();
        let mut already_members = Vec::new();
        let mut not_found_emails = Vec::new();
        for email in emails.iter().map(|email| email.trim()).filter(|e| !e.is_empty()) {
            let Some(identity) = self.directory.find_by_email(email) else {
                not_found_emails.push(email.to_string());
                continue;
            };
            if group.add_member(identity.clone(), now) {
                added.push(identity);
            } else {
                already_members.push(email.to_string());
            }
        }

        if added.is_empty() && already_members.is_empty() {
            return Err(ValidationError::NoRegisteredUsers.into());
        }
        if !added.is_empty() {
            self.groups.update(group.clone()).await?;
            tracing::info!(group_id = %group.id, added = added.len(), "Members added");
        }

        Ok(AddMembersOutcome {
            group,
            added,
            already_members,
            not_found_emails,
        })
    }

    pub async fn remove_member(
        &self,
        actor: &Actor,
        id: &GroupId,
        member: &UserId,
    ) -> Result<Group, LedgerError> {
        let mut group = self.member_group(actor, id).await?;
        if !group.can_manage(&actor.user_id) {
            return Err(LedgerError::Forbidden("Only owners and admins can remove members"));
        }

        if group.remove_member(member)?.is_none() {
            return Err(LedgerError::not_found(Resource::Member, member));
        }
        self.groups.update(group.clone()).await?;
        tracing::info!(group_id = %group.id, member = %member, "Member removed");
        Ok(group)
    }

    /// Promotes or demotes between `Admin` and `Member`. Owner only.
    pub async fn set_member_role(
        &self,
        actor: &Actor,
        id: &GroupId,
        member: &UserId,
        role: Role,
    ) -> Result<Group, LedgerError> {
        let mut group = self.member_group(actor, id).await?;
        if !group.is_owner(&actor.user_id) {
            return Err(LedgerError::Forbidden("Only the owner can change member roles"));
        }

        if !group.set_role(member, role)? {
            return Err(LedgerError::not_found(Resource::Member, member));
        }
        self.groups.update(group.clone()).await?;
        tracing::info!(group_id = %group.id, member = %member, ?role, "Member role changed");
        Ok(group)
    }

    /// Deletes the group together with its expenses and settlements.
    pub async fn delete_group(&self, actor: &Actor, id: &GroupId) -> Result<(), LedgerError> {
        let group = self.member_group(actor, id).await?;
        if !group.is_owner(&actor.user_id) {
            return Err(LedgerError::Forbidden("Only the owner can delete the group"));
        }

        let entries = self.ledger.delete_for_group(id).await?;
        let settlements = self.settlements.delete_for_group(id).await?;
        self.groups.delete(id).await?;
        tracing::info!(group_id = %id, entries, settlements, "Group deleted");
        Ok(())
    }
}
