/// Tunables for [`LedgerService`](crate::LedgerService).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How many generated ids to try before giving up with `Conflict`.
    pub max_id_attempts: u32,
}

impl LedgerConfig {
    pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 5;
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_id_attempts: Self::DEFAULT_MAX_ID_ATTEMPTS,
        }
    }
}
