use crate::model::{Group, UserId};

/// Outcome of submitting an expense to a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The submitter may not add expenses to this group.
    Rejected,
    Admitted { requires_approval: bool },
}

/// Decides whether a member may add an expense and whether it needs an
/// Owner/Admin approval. Pending approval does not keep an entry out of
/// balance computation.
pub struct ApprovalGate;

impl ApprovalGate {
    pub fn admit(&self, group: &Group, submitter: &UserId) -> Admission {
        let Some(member) = group.active_member(submitter) else {
            return Admission::Rejected;
        };
        if member.role.can_manage() {
            return Admission::Admitted {
                requires_approval: false,
            };
        }
        if !group.settings.allow_member_add_expense {
            return Admission::Rejected;
        }
        Admission::Admitted {
            requires_approval: group.settings.require_approval_for_expense,
        }
    }

    /// Only Owners and Admins approve.
    pub fn may_approve(&self, group: &Group, approver: &UserId) -> bool {
        group.active_member(approver).is_some() && group.can_manage(approver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupDraft, GroupId, GroupSettings, MemberSnapshot, Role};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn group(settings: GroupSettings) -> Group {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut group = Group::new(
            GroupId::new("g1"),
            GroupDraft {
                name: "Flat".to_string(),
                settings,
                ..GroupDraft::default()
            },
            MemberSnapshot::new("owner", "Owner", "owner@example.com"),
            at,
        )
        .unwrap();
        group.add_member(MemberSnapshot::new("admin", "Admin", "admin@example.com"), at);
        group.add_member(MemberSnapshot::new("m", "Member", "m@example.com"), at);
        group.set_role(&UserId::new("admin"), Role::Admin).unwrap();
        group
    }

    fn settings(allow: bool, approval: bool) -> GroupSettings {
        GroupSettings {
            allow_member_add_expense: allow,
            require_approval_for_expense: approval,
            ..GroupSettings::default()
        }
    }

    #[rstest]
    #[case::open_group(settings(true, false), "m", Admission::Admitted { requires_approval: false })]
    #[case::member_needs_approval(settings(true, true), "m", Admission::Admitted { requires_approval: true })]
    #[case::admin_skips_approval(settings(true, true), "admin", Admission::Admitted { requires_approval: false })]
    #[case::owner_skips_approval(settings(true, true), "owner", Admission::Admitted { requires_approval: false })]
    #[case::members_locked_out(settings(false, false), "m", Admission::Rejected)]
    #[case::admin_when_locked(settings(false, true), "admin", Admission::Admitted { requires_approval: false })]
    #[case::outsider(settings(true, false), "stranger", Admission::Rejected)]
    fn admission_cases(
        #[case] settings: GroupSettings,
        #[case] submitter: &str,
        #[case] expected: Admission,
    ) {
        assert_eq!(
            ApprovalGate.admit(&group(settings), &UserId::new(submitter)),
            expected
        );
    }

    #[rstest]
    #[case("owner", true)]
    #[case("admin", true)]
    #[case("m", false)]
    #[case("stranger", false)]
    fn approvers(#[case] who: &str, #[case] expected: bool) {
        let group = group(settings(true, true));
        assert_eq!(ApprovalGate.may_approve(&group, &UserId::new(who)), expected);
    }
}
