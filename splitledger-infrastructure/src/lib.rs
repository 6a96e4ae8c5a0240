#![warn(clippy::uninlined_format_args)]

pub mod clock;
pub mod directory;
pub mod id_generator;
pub mod memory_store;

pub use clock::{FixedClock, SystemClock};
pub use directory::StaticUserDirectory;
pub use id_generator::{DEFAULT_ID_LENGTH, RandomIdGenerator, SequenceIdGenerator};
pub use memory_store::{InMemoryGroupStore, InMemoryLedgerStore, InMemorySettlementStore};
