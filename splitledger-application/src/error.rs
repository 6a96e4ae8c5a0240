use splitledger_domain::{InvalidTransition, ValidationError};
use std::fmt;
use thiserror::Error;

/// Kind of record an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Group,
    Member,
    Expense,
    Settlement,
    User,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Resource::Group => "Group",
            Resource::Member => "Member",
            Resource::Expense => "Expense",
            Resource::Settlement => "Settlement",
            Resource::User => "User",
        };
        f.write_str(label)
    }
}

/// Failure reported by a store adapter.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{resource} `{id}` already exists")]
    DuplicateId { resource: Resource, id: String },
    #[error("{resource} `{id}` does not exist")]
    Missing { resource: Resource, id: String },
    #[error("Record rejected by the store: {0}")]
    Rejected(#[from] ValidationError),
    #[error("Store backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{resource} `{id}` not found")]
    NotFound { resource: Resource, id: String },
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
    #[error("Could not allocate a unique {resource} id after {attempts} attempts")]
    Conflict { resource: Resource, attempts: u32 },
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Store(StoreError),
}

impl LedgerError {
    pub fn not_found(resource: Resource, id: impl fmt::Display) -> Self {
        LedgerError::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(err) => LedgerError::Validation(err),
            StoreError::Missing { resource, id } => LedgerError::NotFound { resource, id },
            other => LedgerError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use splitledger_domain::Money;

    #[rstest]
    #[case::rejected(
        StoreError::Rejected(ValidationError::NonPositiveAmount(Money::ZERO)),
        LedgerError::Validation(ValidationError::NonPositiveAmount(Money::ZERO))
    )]
    #[case::missing(
        StoreError::Missing { resource: Resource::Expense, id: "e1".into() },
        LedgerError::NotFound { resource: Resource::Expense, id: "e1".into() }
    )]
    #[case::backend(
        StoreError::Backend("disk full".into()),
        LedgerError::Store(StoreError::Backend("disk full".into()))
    )]
    fn store_errors_map_onto_ledger_errors(#[case] input: StoreError, #[case] expected: LedgerError) {
        assert_eq!(LedgerError::from(input), expected);
    }

    #[test]
    fn messages_name_the_resource() {
        let err = LedgerError::Conflict {
            resource: Resource::Settlement,
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "Could not allocate a unique Settlement id after 5 attempts"
        );
    }
}
