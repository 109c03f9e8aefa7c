use common::{Contest, LedgerError};
use tracing::info;

use crate::ledger::Ledger;
use crate::random::{RandomSource, RELIEF_RANGE};
use crate::store::StoreError;

/// What one wager came to once the winner was known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WagerOutcome {
    pub account: String,
    pub contestant: String,
    pub stake: i64,
    pub won: bool,
    /// Credited on a win: twice the stake.
    pub payout: i64,
    /// Bankruptcy relief granted after the payout, if the bettor ended up broke.
    pub relief: Option<i64>,
    pub balance: i64,
}

#[derive(Debug)]
pub struct SettlementReport {
    pub contest: Contest,
    pub winner: String,
    pub outcomes: Vec<WagerOutcome>,
    pub saved: Result<(), StoreError>,
}

impl SettlementReport {
    pub fn winners(&self) -> impl Iterator<Item = &WagerOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.won)
    }

    pub fn relieved(&self) -> impl Iterator<Item = &WagerOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.relief.is_some())
    }
}

//NOTE: a settlement either fails before touching anything or runs to completion
impl<R: RandomSource> Ledger<R> {
    /// Declares `winner` and pays out every outstanding wager.
    ///
    /// A winning bet is credited double its stake and counts as a win; a
    /// losing bet keeps its stake and counts as a loss. Anyone left at zero
    /// or below is then handed a random relief amount in `RELIEF_RANGE`. The
    /// contest and all wagers are cleared and the snapshot is saved.
    pub fn settle(&mut self, winner: &str) -> Result<SettlementReport, LedgerError> {
        let contest = self.contest.as_ref().ok_or(LedgerError::NoActiveContest)?;
        if !contest.contains(winner) {
            return Err(LedgerError::InvalidWinner(winner.to_string()));
        }
        let contest = self.contest.take().ok_or(LedgerError::NoActiveContest)?;
        let wagers = std::mem::take(&mut self.wagers);

        let mut outcomes = Vec::with_capacity(wagers.len());
        for wager in wagers.into_values() {
            // wagers only name registered accounts; a reload clears them
            let Some(account) = self.accounts.get_mut(&wager.account) else {
                continue;
            };

            // place_wager refuses any stake whose payout would not fit
            let won = wager.contestant == winner;
            let payout = if won {
                let payout = wager.amount.saturating_mul(2);
                account.balance = account.balance.saturating_add(payout);
                account.wins = account.wins.saturating_add(1);
                payout
            } else {
                account.losses = account.losses.saturating_add(1);
                0
            };

            let relief = if account.balance <= 0 {
                let relief = self.random.gen_range(RELIEF_RANGE);
                account.balance += relief;
                info!(
                    user = %account.name,
                    relief,
                    balance = account.balance,
                    "bankrupt bettor bailed out"
                );
                Some(relief)
            } else {
                None
            };

            outcomes.push(WagerOutcome {
                account: wager.account,
                contestant: wager.contestant,
                stake: wager.amount,
                won,
                payout,
                relief,
                balance: account.balance,
            });
        }

        info!(
            %contest,
            winner,
            bets = outcomes.len(),
            winners = outcomes.iter().filter(|outcome| outcome.won).count(),
            "match settled"
        );

        Ok(SettlementReport {
            contest,
            winner: winner.to_string(),
            outcomes,
            saved: self.save_snapshot(),
        })
    }
}
