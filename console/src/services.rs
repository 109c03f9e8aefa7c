use common::AccountStats;
use ledger::{LedgerHandle, SettlementReport, StoreError};
use std::fmt::Write;

use crate::commands::ReplCommand;

const SAVE_WARNING: &str = "Could not save user data. Your progress may be lost!";

/// Runs one command against the ledger and renders what the user should see.
/// Ledger refusals come back as errors for the caller to print.
pub async fn execute(handle: &LedgerHandle, command: ReplCommand) -> anyhow::Result<String> {
    let output = match command {
        ReplCommand::Register { name } => {
            let registration = handle.register(name.join(" ")).await?;
            let mut out = format!(
                "User '{}' added with {} WrestleBucks!",
                registration.account.name, registration.account.balance
            );
            push_save_warning(&mut out, &registration.saved);
            out
        }
        ReplCommand::Contest { mode, wrestlers } => {
            let contest = handle.start_contest(mode, wrestlers).await?;
            format!("Match set up: {contest}")
        }
        ReplCommand::Bet {
            user,
            wrestler,
            amount,
        } => {
            let wager = handle.place_wager(user, wrestler, amount).await?;
            format!(
                "Bet of {} WrestleBucks placed on {} for {}!",
                wager.amount, wager.contestant, wager.account
            )
        }
        ReplCommand::Settle { winner } => render_settlement(&handle.settle(winner).await?),
        ReplCommand::Users => render_user_table(&handle.all_stats().await?),
        ReplCommand::Stats { name: Some(name) } => match handle.stats(&name).await? {
            Some(stats) => render_stats(&stats),
            None => format!("User '{name}' not found!"),
        },
        ReplCommand::Stats { name: None } => {
            let all = handle.all_stats().await?;
            if all.is_empty() {
                "No users in the system yet.".to_string()
            } else {
                all.iter().map(render_stats).collect::<Vec<_>>().join("\n")
            }
        }
        ReplCommand::Match => match handle.contest().await? {
            Some(contest) => contest.to_string(),
            None => "No match is currently set up.".to_string(),
        },
        ReplCommand::Bets => {
            let wagers = handle.wagers().await?;
            if wagers.is_empty() {
                "No bets placed yet.".to_string()
            } else {
                wagers
                    .iter()
                    .map(|wager| {
                        format!(
                            "• {}: {} WrestleBucks on {}",
                            wager.account, wager.amount, wager.contestant
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        ReplCommand::Save => {
            handle.save().await?;
            format!("User data saved to {}", handle.data_file().await?.display())
        }
        ReplCommand::Reload => {
            let loaded = handle.reload().await?;
            format!("Loaded {loaded} users from {}", handle.data_file().await?.display())
        }
        ReplCommand::Where => {
            format!("User data is stored at {}", handle.data_file().await?.display())
        }
        ReplCommand::Quit => "Goodbye!".to_string(),
    };
    Ok(output)
}

fn push_save_warning(out: &mut String, saved: &Result<(), StoreError>) {
    if let Err(e) = saved {
        let _ = write!(out, "\nWarning: {SAVE_WARNING} ({e})");
    }
}

pub fn render_settlement(report: &SettlementReport) -> String {
    let mut out = format!("{} wins the match!\n", report.winner);
    if report.outcomes.is_empty() {
        out.push_str("\nNo bets were placed on this match.");
    }
    for outcome in &report.outcomes {
        // the result line shows the balance before any relief, as it stood at the bell
        let before_relief = outcome.balance - outcome.relief.unwrap_or(0);
        if outcome.won {
            let _ = write!(
                out,
                "\n{}: Won! +{} WrestleBucks (Total: {before_relief})",
                outcome.account, outcome.payout
            );
        } else {
            let _ = write!(
                out,
                "\n{}: Lost! WrestleBucks remain: {before_relief}",
                outcome.account
            );
        }
    }

    let relieved: Vec<_> = report.relieved().collect();
    if !relieved.is_empty() {
        out.push('\n');
    }
    for outcome in relieved {
        let relief = outcome.relief.unwrap_or_default();
        let _ = write!(
            out,
            "\n{name} is broke! The wrestling federation has given them {relief} WrestleBucks \
             to keep them in the game!\n{name} now has {} WrestleBucks.",
            outcome.balance,
            name = outcome.account,
        );
    }
    push_save_warning(&mut out, &report.saved);
    out
}

pub fn render_user_table(all: &[AccountStats]) -> String {
    if all.is_empty() {
        return "No users in the system yet.".to_string();
    }
    let width = all
        .iter()
        .map(|stats| stats.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let mut out = format!(
        "{:<width$}  {:>12}  {:>4}  {:>6}  {:>8}",
        "Name", "WrestleBucks", "Wins", "Losses", "Win Rate"
    );
    for stats in all {
        let _ = write!(
            out,
            "\n{:<width$}  {:>12}  {:>4}  {:>6}  {:>7.1}%",
            stats.name, stats.balance, stats.wins, stats.losses, stats.win_rate
        );
    }
    out
}

pub fn render_stats(stats: &AccountStats) -> String {
    format!(
        "=== {}'s Statistics ===\nWrestleBucks: {}\nWins: {}\nLosses: {}\nWin Rate: {:.1}%\n",
        stats.name, stats.balance, stats.wins, stats.losses, stats.win_rate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::parse_line;
    use ledger::ledger_manager::channel;
    use ledger::{Ledger, SeededRandom, SnapshotStore};

    async fn run(handle: &LedgerHandle, line: &str) -> anyhow::Result<String> {
        let command = parse_line(line).unwrap().unwrap();
        execute(handle, command).await
    }

    fn start(dir: &tempfile::TempDir) -> LedgerHandle {
        let store = SnapshotStore::at(dir.path().join("users.json"));
        let ledger = Ledger::new(store, SeededRandom::new(2));
        let (handle, manager) = channel(ledger, 8);
        tokio::spawn(manager.manage());
        handle
    }

    #[tokio::test]
    async fn full_session_reads_like_the_results_pane() {
        let dir = tempfile::tempdir().unwrap();
        let handle = start(&dir);

        assert_eq!(
            run(&handle, "register Ann").await.unwrap(),
            "User 'Ann' added with 1000 WrestleBucks!"
        );
        run(&handle, "add Bob").await.unwrap();
        assert_eq!(
            run(&handle, "contest Fox Wolf").await.unwrap(),
            "Match set up: One on One: Fox vs Wolf"
        );
        run(&handle, "bet Ann Fox 200").await.unwrap();
        run(&handle, "bet Bob Wolf 300").await.unwrap();
        assert_eq!(
            run(&handle, "bets").await.unwrap(),
            "• Ann: 200 WrestleBucks on Fox\n• Bob: 300 WrestleBucks on Wolf"
        );

        assert_eq!(
            run(&handle, "settle Fox").await.unwrap(),
            "Fox wins the match!\n\n\
             Ann: Won! +400 WrestleBucks (Total: 1200)\n\
             Bob: Lost! WrestleBucks remain: 700"
        );
        assert_eq!(run(&handle, "match").await.unwrap(), "No match is currently set up.");
        assert!(run(&handle, "stats Ann")
            .await
            .unwrap()
            .contains("WrestleBucks: 1200\nWins: 1\nLosses: 0\nWin Rate: 100.0%"));
    }

    #[tokio::test]
    async fn refusals_surface_as_errors() {
        let dir = tempfile::tempdir().unwrap();
        let handle = start(&dir);

        let err = run(&handle, "bet Ann Fox 10").await.unwrap_err();
        assert_eq!(err.to_string(), "no match is currently set up");
        run(&handle, "register Ann").await.unwrap();
        run(&handle, "contest Fox Wolf").await.unwrap();
        let err = run(&handle, "bet Ann Fox 5000").await.unwrap_err();
        assert!(err.to_string().starts_with("insufficient WrestleBucks"));
    }

    #[tokio::test]
    async fn broke_bettors_get_a_relief_message() {
        let dir = tempfile::tempdir().unwrap();
        let handle = start(&dir);
        run(&handle, "register Cy").await.unwrap();
        run(&handle, "contest Fox Wolf").await.unwrap();
        run(&handle, "bet Cy Wolf 1000").await.unwrap();

        let out = run(&handle, "settle Fox").await.unwrap();
        assert!(out.contains("Cy: Lost! WrestleBucks remain: 0"));
        assert!(out.contains("Cy is broke! The wrestling federation has given them"));
    }

    #[tokio::test]
    async fn failed_save_warns_but_keeps_the_user() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = SnapshotStore::at(blocker.join("users.json"));
        let ledger = Ledger::new(store, SeededRandom::new(2));
        let (handle, manager) = channel(ledger, 8);
        tokio::spawn(manager.manage());

        let out = run(&handle, "register Ann").await.unwrap();
        assert!(out.contains(SAVE_WARNING));
        assert!(run(&handle, "users").await.unwrap().contains("Ann"));
    }

    #[test]
    fn user_table_lines_up() {
        let stats = vec![
            common::Account::new("Ann").stats(),
            common::Account::new("Bartholomew").stats(),
        ];
        let table = render_user_table(&stats);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.len() == lines[0].len()));
        assert!(lines[1].ends_with("0.0%"));
    }
}
