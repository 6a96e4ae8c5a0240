use dashmap::DashMap;
use splitledger_application::UserDirectory;
use splitledger_domain::{MemberSnapshot, UserId};
use std::sync::Arc;

/// User directory backed by an in-process table, keyed by id and by
/// lower-cased email.
#[derive(Clone, Default)]
pub struct StaticUserDirectory {
    by_id: Arc<DashMap<UserId, MemberSnapshot>>,
    by_email: Arc<DashMap<String, UserId>>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user, replacing any earlier record with the same id.
    pub fn register(&self, user: MemberSnapshot) {
        if let Some((_, previous)) = self.by_id.remove(&user.id) {
            self.by_email.remove(&previous.email.to_lowercase());
        }
        self.by_email
            .insert(user.email.to_lowercase(), user.id.clone());
        self.by_id.insert(user.id.clone(), user);
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl FromIterator<MemberSnapshot> for StaticUserDirectory {
    fn from_iter<I: IntoIterator<Item = MemberSnapshot>>(iter: I) -> Self {
        let directory = Self::new();
        for user in iter {
            directory.register(user);
        }
        directory
    }
}

impl UserDirectory for StaticUserDirectory {
    fn find_by_id(&self, id: &UserId) -> Option<MemberSnapshot> {
        self.by_id.get(id).map(|user| user.value().clone())
    }

    fn find_by_email(&self, email: &str) -> Option<MemberSnapshot> {
        let id = self.by_email.get(&email.trim().to_lowercase())?.value().clone();
        self.find_by_id(&id)
    }
}
