//! On-disk form of the ledger: one JSON object keyed by account name.
//!
//! ```json
//! {
//!   "Ann": { "name": "Ann", "wrestlebucks": 1200, "wins": 1, "losses": 0 }
//! }
//! ```

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::{Account, SnapshotError};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AccountRecord {
    pub name: String,
    #[serde(rename = "wrestlebucks")]
    pub balance: i64,
    pub wins: u32,
    pub losses: u32,
}

impl From<&Account> for AccountRecord {
    fn from(account: &Account) -> Self {
        Self {
            name: account.name.clone(),
            balance: account.balance,
            wins: account.wins,
            losses: account.losses,
        }
    }
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        Self {
            name: record.name,
            balance: record.balance,
            wins: record.wins,
            losses: record.losses,
        }
    }
}

#[derive(Serialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(transparent)]
pub struct LedgerSnapshot {
    records: IndexMap<String, AccountRecord>,
}

/// Top-level entries exactly as written, repeated keys included.
struct RecordEntries(Vec<(String, AccountRecord)>);

impl<'de> Deserialize<'de> for RecordEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = RecordEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of user names to user records")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, AccountRecord>()? {
            entries.push(entry);
        }
        Ok(RecordEntries(entries))
    }
}

impl LedgerSnapshot {
    pub fn from_accounts<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        let records = accounts
            .into_iter()
            .map(|account| (account.name.clone(), AccountRecord::from(account)))
            .collect();
        Self { records }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a snapshot. Every record must carry exactly the
    /// schema fields, name the account it is stored under, and appear once.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let RecordEntries(entries) = serde_json::from_str(text)?;
        let mut records = IndexMap::with_capacity(entries.len());
        for (key, record) in entries {
            if key != record.name {
                return Err(SnapshotError::NameMismatch {
                    key,
                    name: record.name,
                });
            }
            match records.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(SnapshotError::DuplicateRecord(entry.key().clone()))
                }
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
            }
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_accounts(self) -> impl Iterator<Item = Account> {
        self.records.into_values().map(Account::from)
    }
}
