use crate::model::{
    GroupId, SplitMethod, UserId, ValidationError,
    error::{require_max_len, require_text},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

const MAX_GROUP_NAME_LEN: usize = 100;
const MAX_GROUP_DESCRIPTION_LEN: usize = 500;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Member,
}

impl Role {
    /// Owners and admins manage membership, settings and approvals.
    pub fn can_manage(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// Identity of a member frozen at the time it was recorded.
///
/// Entries and settlements keep their own copy so later profile edits do not
/// rewrite history.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSnapshot {
    pub id: UserId,
    pub name: SmolStr,
    pub email: SmolStr,
}

impl MemberSnapshot {
    pub fn new(id: impl Into<UserId>, name: impl AsRef<str>, email: impl AsRef<str>) -> Self {
        Self {
            id: id.into(),
            name: SmolStr::new(name),
            email: SmolStr::new(email),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: UserId,
    pub name: SmolStr,
    pub email: SmolStr,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Member {
    fn joining(identity: MemberSnapshot, role: Role, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: identity.id,
            name: identity.name,
            email: identity.email,
            role,
            joined_at,
            is_active: true,
        }
    }

    pub fn snapshot(&self) -> MemberSnapshot {
        MemberSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupType {
    Family,
    Roommates,
    Travel,
    Friends,
    #[default]
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupSettings {
    pub allow_member_add_expense: bool,
    pub require_approval_for_expense: bool,
    pub auto_settle: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            allow_member_add_expense: true,
            require_approval_for_expense: false,
            auto_settle: false,
        }
    }
}

/// ISO-4217 style three letter currency code, stored upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(SmolStr);

impl CurrencyCode {
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(SmolStr::new(code.to_ascii_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self(SmolStr::new_static("INR"))
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0.to_string()
    }
}

/// Fields a user chooses when creating a group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupDraft {
    pub name: String,
    pub description: String,
    pub group_type: GroupType,
    pub currency: CurrencyCode,
    pub default_split_method: SplitMethod,
    pub settings: GroupSettings,
}

/// Partial update of group metadata. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub group_type: Option<GroupType>,
    pub currency: Option<CurrencyCode>,
    pub default_split_method: Option<SplitMethod>,
    pub settings: Option<GroupSettings>,
    /// `Some(false)` archives the group, `Some(true)` restores it.
    pub is_active: Option<bool>,
}

/// Aggregate root for membership. Members are only mutated through methods
/// that keep exactly one owner in the roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub group_type: GroupType,
    pub created_by: UserId,
    pub currency: CurrencyCode,
    pub default_split_method: SplitMethod,
    members: Vec<Member>,
    pub settings: GroupSettings,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(
        id: GroupId,
        draft: GroupDraft,
        owner: MemberSnapshot,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = draft.name.trim().to_string();
        require_text(&name, "Group name", MAX_GROUP_NAME_LEN)?;
        require_max_len(&draft.description, "Description", MAX_GROUP_DESCRIPTION_LEN)?;

        Ok(Self {
            id,
            name,
            description: draft.description,
            group_type: draft.group_type,
            created_by: owner.id.clone(),
            currency: draft.currency,
            default_split_method: draft.default_split_method,
            members: vec![Member::joining(owner, Role::Owner, created_at)],
            settings: draft.settings,
            is_active: true,
            created_at,
        })
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn active_members(&self) -> impl Iterator<Item = &Member> + '_ {
        self.members.iter().filter(|member| member.is_active)
    }

    pub fn active_snapshots(&self) -> Vec<MemberSnapshot> {
        self.active_members().map(Member::snapshot).collect()
    }

    pub fn member(&self, id: &UserId) -> Option<&Member> {
        self.members.iter().find(|member| &member.id == id)
    }

    pub fn active_member(&self, id: &UserId) -> Option<&Member> {
        self.member(id).filter(|member| member.is_active)
    }

    pub fn is_member(&self, id: &UserId) -> bool {
        self.active_member(id).is_some()
    }

    pub fn role_of(&self, id: &UserId) -> Option<Role> {
        self.active_member(id).map(|member| member.role)
    }

    pub fn can_manage(&self, id: &UserId) -> bool {
        self.role_of(id).is_some_and(Role::can_manage)
    }

    pub fn is_owner(&self, id: &UserId) -> bool {
        self.role_of(id) == Some(Role::Owner)
    }

    pub fn owner(&self) -> Option<&Member> {
        self.members.iter().find(|member| member.role == Role::Owner)
    }

    /// Adds a plain member. Returns `false` when the user id or email is
    /// already on the roster.
    pub fn add_member(&mut self, identity: MemberSnapshot, joined_at: DateTime<Utc>) -> bool {
        if self.has_identity(&identity) {
            return false;
        }
        self.members
            .push(Member::joining(identity, Role::Member, joined_at));
        true
    }

    pub fn has_identity(&self, identity: &MemberSnapshot) -> bool {
        self.members.iter().any(|member| {
            member.id == identity.id || member.email.eq_ignore_ascii_case(&identity.email)
        })
    }

    /// Removes a member. Returns `Ok(None)` when the id is not on the roster.
    pub fn remove_member(&mut self, id: &UserId) -> Result<Option<Member>, ValidationError> {
        let Some(index) = self.members.iter().position(|member| &member.id == id) else {
            return Ok(None);
        };
        if self.members[index].role == Role::Owner {
            return Err(ValidationError::OwnerRemoval);
        }
        Ok(Some(self.members.remove(index)))
    }

    /// Changes a member's role between `Admin` and `Member`.
    pub fn set_role(&mut self, id: &UserId, role: Role) -> Result<bool, ValidationError> {
        if role == Role::Owner {
            return Err(ValidationError::OwnerRoleChange);
        }
        let Some(member) = self.members.iter_mut().find(|member| &member.id == id) else {
            return Ok(false);
        };
        if member.role == Role::Owner {
            return Err(ValidationError::OwnerRoleChange);
        }
        member.role = role;
        Ok(true)
    }

    pub fn apply_patch(&mut self, patch: GroupPatch) -> Result<(), ValidationError> {
        if let Some(name) = &patch.name {
            require_text(name.trim(), "Group name", MAX_GROUP_NAME_LEN)?;
        }
        if let Some(description) = &patch.description {
            require_max_len(description, "Description", MAX_GROUP_DESCRIPTION_LEN)?;
        }

        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(group_type) = patch.group_type {
            self.group_type = group_type;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(method) = patch.default_split_method {
            self.default_split_method = method;
        }
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        Ok(())
    }
}
