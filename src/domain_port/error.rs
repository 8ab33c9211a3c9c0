#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (e.g. user email) is already taken.
    #[error("unique constraint violated")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
