use thiserror::Error;

/// Per-request prediction failures.
#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    /// One or both requested teams are absent from the stats table.
    #[error("{}", unknown_team_message(.0))]
    UnknownTeam(Vec<String>),

    /// The model returned something that is not a two-class distribution.
    #[error("model returned an invalid probability pair ({0}, {1})")]
    InvalidModelOutput(f64, f64),
}

fn unknown_team_message(names: &[String]) -> String {
    match names {
        [one] => format!("Unknown team: {}", one),
        many => format!("Unknown teams: {}", many.join(", ")),
    }
}

/// Counter persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The storage object exists but cannot be read as a collection at all.
    #[error("counter storage is unreadable: {0}")]
    Malformed(String),

    #[error("counter database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode counter collection: {0}")]
    Encode(String),

    /// The pairing's count is already at the largest storable value.
    #[error("counter for '{0}' cannot grow any further")]
    Overflow(String),

    #[error("counter lock poisoned by a panicked writer")]
    LockPoisoned,
}
