use thiserror::Error;

use crate::MatchType;

/// Reasons a ledger operation was refused. None of these mutate the ledger.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum LedgerError {
    #[error("user '{0}' already exists")]
    DuplicateAccount(String),
    #[error("user name must not be empty")]
    EmptyName,
    #[error("user '{0}' not found")]
    UnknownAccount(String),
    #[error("no match is currently set up")]
    NoActiveContest,
    #[error("wrestler '{0}' is not in the current match")]
    InvalidContestant(String),
    #[error("'{0}' is not in the current match and cannot win it")]
    InvalidWinner(String),
    #[error("user '{0}' has already placed a bet for this match")]
    DuplicateWager(String),
    #[error("bet amount must be positive, got {0}")]
    NonPositiveAmount(i64),
    #[error("insufficient WrestleBucks: tried to bet {requested} with {available} available")]
    InsufficientBalance { requested: i64, available: i64 },
    #[error("a win on a {amount} bet would push {balance} WrestleBucks past the largest balance")]
    PayoutOverflow { amount: i64, balance: i64 },
    #[error("wrestler names must not be empty")]
    EmptyContestantName,
    #[error("a match needs between 2 and 8 wrestlers, got {0}")]
    InvalidContestantCount(usize),
    #[error("wrestler names must be unique, '{0}' appears twice")]
    DuplicateContestant(String),
    #[error("{mode} needs {expected} wrestlers, got {found}")]
    ContestantCountMismatch {
        mode: MatchType,
        expected: usize,
        found: usize,
    },
    #[error("unknown match type '{0}'")]
    UnknownMatchType(String),
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record stored under '{key}' belongs to '{name}'")]
    NameMismatch { key: String, name: String },
    #[error("user '{0}' is stored more than once")]
    DuplicateRecord(String),
}
