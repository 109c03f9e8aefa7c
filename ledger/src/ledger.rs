use common::snapshot::LedgerSnapshot;
use common::{Account, AccountStats, Contest, LedgerError, MatchType, Wager};
use indexmap::IndexMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::random::{RandomSource, ThreadRandom};
use crate::store::{SnapshotStore, StoreError};

/// Accounts, the match being bet on, and the bets against it.
///
/// Only the accounts are ever written to disk. The contest and its wagers
/// live for one settlement and are gone on restart.
pub struct Ledger<R = ThreadRandom> {
    pub(crate) accounts: IndexMap<String, Account>,
    pub(crate) contest: Option<Contest>,
    pub(crate) wagers: IndexMap<String, Wager>,
    pub(crate) store: SnapshotStore,
    pub(crate) random: R,
}

#[derive(Debug)]
pub struct Registration {
    pub account: Account,
    /// The registration stands even when this is an error.
    pub saved: Result<(), StoreError>,
}

impl Ledger<ThreadRandom> {
    pub fn open(store: SnapshotStore) -> Self {
        Self::open_with_random(store, ThreadRandom)
    }
}

impl<R: RandomSource> Ledger<R> {
    /// Empty ledger, nothing read from `store`.
    pub fn new(store: SnapshotStore, random: R) -> Self {
        Self {
            accounts: IndexMap::new(),
            contest: None,
            wagers: IndexMap::new(),
            store,
            random,
        }
    }

    /// Ledger seeded from whatever `store` holds. An unreadable snapshot
    /// leaves it empty.
    pub fn open_with_random(store: SnapshotStore, random: R) -> Self {
        let mut ledger = Self::new(store, random);
        // failures are already logged and leave the ledger empty
        let _ = ledger.load_snapshot();
        ledger
    }

    pub fn register(&mut self, name: &str) -> Result<Registration, LedgerError> {
        if name.trim().is_empty() {
            return Err(LedgerError::EmptyName);
        }
        if self.accounts.contains_key(name) {
            return Err(LedgerError::DuplicateAccount(name.to_string()));
        }

        let account = Account::new(name);
        self.accounts.insert(account.name.clone(), account.clone());
        info!(user = name, balance = account.balance, "registered user");

        Ok(Registration {
            account,
            saved: self.save_snapshot(),
        })
    }

    /// Replaces the active contest. Wagers on the previous one are dropped
    /// along with their stakes.
    pub fn start_contest<S: AsRef<str>>(
        &mut self,
        mode: Option<MatchType>,
        contestants: impl IntoIterator<Item = S>,
    ) -> Result<&Contest, LedgerError> {
        let contest = Contest::new(mode, contestants)?;
        if !self.wagers.is_empty() {
            warn!(dropped = self.wagers.len(), "new match discards outstanding bets");
        }
        self.wagers.clear();
        info!(%contest, "match set up");
        Ok(&*self.contest.insert(contest))
    }

    /// Stakes `amount` of `account`'s balance on `contestant`.
    ///
    /// Checks, in order: a contest is active, the account exists, it has not
    /// bet on this contest yet, the contestant is in the contest, the amount
    /// is positive, and the balance covers it. A stake whose winning payout
    /// would not fit in the balance is refused last. Nothing changes on
    /// failure.
    pub fn place_wager(
        &mut self,
        account: &str,
        contestant: &str,
        amount: i64,
    ) -> Result<&Wager, LedgerError> {
        let contest = self.contest.as_ref().ok_or(LedgerError::NoActiveContest)?;
        let holder = self
            .accounts
            .get_mut(account)
            .ok_or_else(|| LedgerError::UnknownAccount(account.to_string()))?;
        if self.wagers.contains_key(account) {
            return Err(LedgerError::DuplicateWager(account.to_string()));
        }
        if !contest.contains(contestant) {
            return Err(LedgerError::InvalidContestant(contestant.to_string()));
        }
        if amount <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        if amount > holder.balance {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: holder.balance,
            });
        }
        // a win leaves the balance at balance - amount + 2 * amount
        if holder.balance.checked_add(amount).is_none() {
            return Err(LedgerError::PayoutOverflow {
                amount,
                balance: holder.balance,
            });
        }

        holder.balance -= amount;
        debug!(user = account, contestant, amount, balance = holder.balance, "bet placed");

        let wager = Wager {
            account: holder.name.clone(),
            contestant: contestant.to_string(),
            amount,
        };
        Ok(&*self.wagers.entry(holder.name.clone()).or_insert(wager))
    }

    pub fn save_snapshot(&self) -> Result<(), StoreError> {
        let snapshot = LedgerSnapshot::from_accounts(self.accounts.values());
        match self.store.save(&snapshot) {
            Ok(()) => {
                info!(
                    users = snapshot.len(),
                    path = %self.store.path().display(),
                    "user data saved"
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "could not save user data");
                Err(e)
            }
        }
    }

    /// Replaces every account with the stored snapshot and returns how many
    /// were read. On any failure the ledger is left with no accounts.
    ///
    /// The stored balances predate any outstanding stakes, so the contest
    /// and its wagers are discarded just as a restart would.
    pub fn load_snapshot(&mut self) -> Result<usize, StoreError> {
        if !self.wagers.is_empty() {
            warn!(dropped = self.wagers.len(), "reload discards outstanding bets");
        }
        self.wagers.clear();
        self.contest = None;
        self.accounts.clear();
        let path = self.store.path().display().to_string();
        match self.store.load() {
            Ok(Some(snapshot)) => {
                self.accounts = snapshot
                    .into_accounts()
                    .map(|account| (account.name.clone(), account))
                    .collect();
                info!(users = self.accounts.len(), %path, "loaded user data");
                Ok(self.accounts.len())
            }
            Ok(None) => {
                info!(%path, "no existing user data found, starting fresh");
                Ok(0)
            }
            Err(e) => {
                warn!(error = %e, "starting with empty user list");
                Err(e)
            }
        }
    }

    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn stats(&self, name: &str) -> Option<AccountStats> {
        self.account(name).map(Account::stats)
    }

    pub fn all_stats(&self) -> Vec<AccountStats> {
        self.accounts().map(Account::stats).collect()
    }

    pub fn contest(&self) -> Option<&Contest> {
        self.contest.as_ref()
    }

    pub fn wager(&self, account: &str) -> Option<&Wager> {
        self.wagers.get(account)
    }

    /// Outstanding wagers in the order they were placed.
    pub fn wagers(&self) -> impl Iterator<Item = &Wager> {
        self.wagers.values()
    }

    /// Sum of every balance, excluding stakes held by outstanding wagers.
    /// Saturates rather than wrapping.
    pub fn total_balance(&self) -> i64 {
        self.accounts
            .values()
            .fold(0i64, |total, account| total.saturating_add(account.balance))
    }

    pub fn data_file(&self) -> &Path {
        self.store.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;
    use std::fs;

    fn ledger_in(dir: &tempfile::TempDir) -> Ledger<SeededRandom> {
        let store = SnapshotStore::at(dir.path().join("users.json"));
        Ledger::new(store, SeededRandom::new(1))
    }

    fn fox_wolf(ledger: &mut Ledger<SeededRandom>) {
        ledger.start_contest(None, ["Fox", "Wolf"]).unwrap();
    }

    #[test]
    fn register_starts_at_a_thousand_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        let registration = ledger.register("Ann").unwrap();
        assert_eq!(registration.account, Account::new("Ann"));
        assert!(registration.saved.is_ok());
        assert!(fs::read_to_string(dir.path().join("users.json")).unwrap().contains("\"Ann\""));
    }

    #[test]
    fn duplicate_registration_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();
        fox_wolf(&mut ledger);
        ledger.place_wager("Ann", "Fox", 300).unwrap();

        let err = ledger.register("Ann").unwrap_err();
        assert_eq!(err, LedgerError::DuplicateAccount("Ann".into()));
        assert_eq!(ledger.account("Ann").unwrap().balance, 700);
        assert_eq!(ledger.accounts().count(), 1);
    }

    #[test]
    fn names_are_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();
        ledger.register("ann").unwrap();
        assert_eq!(ledger.accounts().count(), 2);
    }

    #[test]
    fn blank_names_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        assert_eq!(ledger.register("   ").unwrap_err(), LedgerError::EmptyName);
        assert_eq!(ledger.accounts().count(), 0);
    }

    #[test]
    fn registration_survives_a_failed_save() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = SnapshotStore::at(blocker.join("users.json"));
        let mut ledger = Ledger::new(store, SeededRandom::new(1));

        let registration = ledger.register("Ann").unwrap();
        assert!(registration.saved.is_err());
        assert_eq!(ledger.account("Ann").unwrap().balance, 1000);
    }

    #[test]
    fn wager_checks_run_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();

        // no contest beats every other problem
        assert_eq!(
            ledger.place_wager("Nobody", "Nobody", -1).unwrap_err(),
            LedgerError::NoActiveContest
        );
        fox_wolf(&mut ledger);
        assert_eq!(
            ledger.place_wager("Nobody", "Nobody", -1).unwrap_err(),
            LedgerError::UnknownAccount("Nobody".into())
        );
        assert_eq!(
            ledger.place_wager("Ann", "Nobody", -1).unwrap_err(),
            LedgerError::InvalidContestant("Nobody".into())
        );
        assert_eq!(
            ledger.place_wager("Ann", "Fox", 0).unwrap_err(),
            LedgerError::NonPositiveAmount(0)
        );
        assert_eq!(
            ledger.place_wager("Ann", "Fox", 1001).unwrap_err(),
            LedgerError::InsufficientBalance {
                requested: 1001,
                available: 1000
            }
        );
        assert_eq!(ledger.account("Ann").unwrap().balance, 1000);
        assert_eq!(ledger.wagers().count(), 0);

        ledger.place_wager("Ann", "Fox", 1000).unwrap();
        assert_eq!(
            ledger.place_wager("Ann", "Nobody", -1).unwrap_err(),
            LedgerError::DuplicateWager("Ann".into())
        );
    }

    #[test]
    fn wager_holds_the_stake() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();
        ledger.register("Bob").unwrap();
        fox_wolf(&mut ledger);

        let before = ledger.total_balance();
        let wager = ledger.place_wager("Ann", "Wolf", 250).unwrap().clone();
        assert_eq!(
            wager,
            Wager {
                account: "Ann".into(),
                contestant: "Wolf".into(),
                amount: 250
            }
        );
        assert_eq!(ledger.account("Ann").unwrap().balance, 750);
        assert_eq!(ledger.total_balance(), before - 250);
        assert_eq!(ledger.wager("Ann"), Some(&wager));
    }

    #[test]
    fn contestant_match_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();
        fox_wolf(&mut ledger);
        assert_eq!(
            ledger.place_wager("Ann", "fox", 10).unwrap_err(),
            LedgerError::InvalidContestant("fox".into())
        );
    }

    #[test]
    fn new_contest_discards_outstanding_wagers() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();
        fox_wolf(&mut ledger);
        ledger.place_wager("Ann", "Fox", 100).unwrap();

        let contest = ledger
            .start_contest(Some(MatchType::TripleThreat), ["Bear", "Lynx", "Hawk"])
            .unwrap();
        assert_eq!(contest.mode(), MatchType::TripleThreat);
        assert_eq!(ledger.wagers().count(), 0);
        assert_eq!(ledger.account("Ann").unwrap().balance, 900);
        ledger.place_wager("Ann", "Lynx", 100).unwrap();
    }

    #[test]
    fn rejected_contest_keeps_the_current_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        fox_wolf(&mut ledger);

        assert!(ledger.start_contest(None, ["Solo"]).is_err());
        assert_eq!(ledger.contest().unwrap().contestants(), ["Fox", "Wolf"]);
    }

    #[test]
    fn malformed_snapshot_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, r#"{"Ann": {"name": "Ann"}}"#).unwrap();

        let ledger = Ledger::open_with_random(SnapshotStore::at(&path), SeededRandom::new(1));
        assert_eq!(ledger.accounts().count(), 0);
    }

    #[test]
    fn failed_reload_clears_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();
        fs::write(dir.path().join("users.json"), "[]").unwrap();

        assert!(matches!(ledger.load_snapshot(), Err(StoreError::Malformed { .. })));
        assert_eq!(ledger.accounts().count(), 0);
    }

    #[test]
    fn stats_report_win_rate() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();
        let stats = ledger.stats("Ann").unwrap();
        assert_eq!(stats.balance, 1000);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(ledger.all_stats(), vec![stats]);
        assert!(ledger.stats("Bob").is_none());
    }

    #[test]
    fn reload_discards_the_session_and_its_stakes() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.register("Ann").unwrap();
        fox_wolf(&mut ledger);
        ledger.place_wager("Ann", "Fox", 500).unwrap();

        assert_eq!(ledger.load_snapshot().unwrap(), 1);
        assert_eq!(ledger.account("Ann").unwrap().balance, 1000);
        assert!(ledger.contest().is_none());
        assert_eq!(ledger.wagers().count(), 0);
        assert_eq!(ledger.settle("Fox").unwrap_err(), LedgerError::NoActiveContest);
        assert_eq!(ledger.account("Ann").unwrap().balance, 1000);
    }

    #[test]
    fn stake_whose_payout_cannot_fit_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(
            &path,
            concat!(
                r#"{"Ann": {"name": "Ann", "wrestlebucks": 9000000000000000000, "#,
                r#""wins": 0, "losses": 0}}"#,
            ),
        )
        .unwrap();
        let mut ledger = Ledger::open_with_random(SnapshotStore::at(&path), SeededRandom::new(1));
        fox_wolf(&mut ledger);

        let err = ledger.place_wager("Ann", "Fox", 9_000_000_000_000_000_000).unwrap_err();
        assert!(matches!(err, LedgerError::PayoutOverflow { .. }));
        assert_eq!(ledger.account("Ann").unwrap().balance, 9_000_000_000_000_000_000);

        // the largest stake that still fits pays out to exactly i64::MAX
        let stake = i64::MAX - 9_000_000_000_000_000_000;
        ledger.place_wager("Ann", "Fox", stake).unwrap();
        ledger.settle("Fox").unwrap();
        assert_eq!(ledger.account("Ann").unwrap().balance, i64::MAX);
    }

    #[test]
    fn total_balance_saturates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(
            &path,
            r#"{
                "Ann": {"name": "Ann", "wrestlebucks": 9000000000000000000, "wins": 0, "losses": 0},
                "Bob": {"name": "Bob", "wrestlebucks": 9000000000000000000, "wins": 0, "losses": 0}
            }"#,
        )
        .unwrap();
        let ledger = Ledger::open_with_random(SnapshotStore::at(&path), SeededRandom::new(1));
        assert_eq!(ledger.total_balance(), i64::MAX);
    }
}
