use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A dimension or timing field is missing, zero, or too large.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// The settings token could not be decoded. The detail is for logs only;
    /// the displayed message is the same for every failure.
    #[error("invalid save data")]
    InvalidSaveData(String),

    /// A match query before turn `n` exists.
    #[error("no turn {n} back yet (current turn: {turn:?})")]
    QueryOutOfRange { turn: Option<u64>, n: u32 },

    #[error("box {box_index} is outside the {box_count} boxes of this session")]
    BoxOutOfRange { box_index: usize, box_count: usize },

    #[error("no session is running")]
    NotRunning,
}

impl Error {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }

    /// Conditions that are expected during play and must not interrupt a session.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Error::QueryOutOfRange { .. } | Error::BoxOutOfRange { .. } | Error::NotRunning
        )
    }
}
