use std::fmt;
use std::str::FromStr;

pub mod error;
pub mod snapshot;

pub use error::{LedgerError, SnapshotError};

/// WrestleBucks every new account is registered with.
pub const STARTING_BALANCE: i64 = 1000;

pub const MIN_CONTESTANTS: usize = 2;
pub const MAX_CONTESTANTS: usize = 8;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Account {
    pub name: String,
    pub balance: i64,
    pub wins: u32,
    pub losses: u32,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            balance: STARTING_BALANCE,
            wins: 0,
            losses: 0,
        }
    }

    pub fn stats(&self) -> AccountStats {
        let settled = self.wins + self.losses;
        let win_rate = if settled > 0 {
            f64::from(self.wins) / f64::from(settled) * 100.0
        } else {
            0.0
        };
        AccountStats {
            name: self.name.clone(),
            balance: self.balance,
            wins: self.wins,
            losses: self.losses,
            win_rate,
        }
    }
}

/// Read-only view of an account, as shown to bettors.
#[derive(Debug, PartialEq, Clone)]
pub struct AccountStats {
    pub name: String,
    pub balance: i64,
    pub wins: u32,
    pub losses: u32,
    /// Percentage of settled wagers that were won, 0.0 before the first settlement.
    pub win_rate: f64,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum MatchType {
    OneOnOne,
    TripleThreat,
    Fatal4Way,
    FiveWay,
    SixWay,
    SevenWay,
    EightWay,
}

impl MatchType {
    pub const ALL: [MatchType; 7] = [
        MatchType::OneOnOne,
        MatchType::TripleThreat,
        MatchType::Fatal4Way,
        MatchType::FiveWay,
        MatchType::SixWay,
        MatchType::SevenWay,
        MatchType::EightWay,
    ];

    pub fn contestants(self) -> usize {
        match self {
            MatchType::OneOnOne => 2,
            MatchType::TripleThreat => 3,
            MatchType::Fatal4Way => 4,
            MatchType::FiveWay => 5,
            MatchType::SixWay => 6,
            MatchType::SevenWay => 7,
            MatchType::EightWay => 8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchType::OneOnOne => "One on One",
            MatchType::TripleThreat => "Triple Threat",
            MatchType::Fatal4Way => "Fatal 4 Way",
            MatchType::FiveWay => "Five Way",
            MatchType::SixWay => "Six Way",
            MatchType::SevenWay => "Seven Way",
            MatchType::EightWay => "Eight Way",
        }
    }

    pub fn for_count(count: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.contestants() == count)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MatchType {
    type Err = LedgerError;

    // accepts the display label in any case, with spaces, dashes or underscores
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|mode| normalize_label(mode.label()) == wanted)
            .ok_or_else(|| LedgerError::UnknownMatchType(s.to_string()))
    }
}

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The staged match bettors are currently wagering on.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Contest {
    mode: MatchType,
    contestants: Vec<String>,
}

impl Contest {
    /// Validates the contestant list. Names are trimmed, must be unique
    /// ignoring ASCII case, and there must be between two and eight of them.
    /// Without an explicit mode the label is derived from the list length.
    pub fn new(
        mode: Option<MatchType>,
        contestants: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, LedgerError> {
        let mut names: Vec<String> = Vec::new();
        for name in contestants {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(LedgerError::EmptyContestantName);
            }
            names.push(name.to_string());
        }

        if !(MIN_CONTESTANTS..=MAX_CONTESTANTS).contains(&names.len()) {
            return Err(LedgerError::InvalidContestantCount(names.len()));
        }

        for (i, name) in names.iter().enumerate() {
            if names[..i].iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
                return Err(LedgerError::DuplicateContestant(name.clone()));
            }
        }

        let derived = MatchType::for_count(names.len())
            .ok_or(LedgerError::InvalidContestantCount(names.len()))?;
        let mode = match mode {
            Some(mode) if mode != derived => {
                return Err(LedgerError::ContestantCountMismatch {
                    mode,
                    expected: mode.contestants(),
                    found: names.len(),
                })
            }
            Some(mode) => mode,
            None => derived,
        };

        Ok(Self {
            mode,
            contestants: names,
        })
    }

    pub fn mode(&self) -> MatchType {
        self.mode
    }

    pub fn contestants(&self) -> &[String] {
        &self.contestants
    }

    // exact, case-sensitive match
    pub fn contains(&self, contestant: &str) -> bool {
        self.contestants.iter().any(|name| name == contestant)
    }
}

impl fmt::Display for Contest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.mode, self.contestants.join(" vs "))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Wager {
    pub account: String,
    pub contestant: String,
    pub amount: i64,
}
