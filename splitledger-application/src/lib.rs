#![warn(clippy::uninlined_format_args)]

pub mod config;
pub mod error;
pub mod model;
pub mod ports;
mod service;

pub use config::LedgerConfig;
pub use error::{LedgerError, Resource, StoreError};
pub use model::{
    Actor, AddMembersOutcome, CreatedGroup, DashboardStats, EntryQuery, ExpenseFilter,
    ExpensePatch, GroupDashboard, GroupFilter, GroupStats, GroupSummary, NewExpense, NewGroup,
    NewSettlement,
};
pub use ports::{Clock, GroupStore, IdGenerator, LedgerStore, SettlementStore, UserDirectory};
pub use service::LedgerService;
