use clap::{Parser, Subcommand};
use common::MatchType;

#[derive(Parser, Debug, PartialEq)]
#[command(
    name = "saltybet",
    no_binary_name = true,
    disable_version_flag = true
)]
pub struct ReplLine {
    #[command(subcommand)]
    pub command: ReplCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ReplCommand {
    /// Register a new user with 1000 WrestleBucks
    #[command(visible_alias = "add")]
    Register {
        /// User name; several words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Set up a new match, discarding any unsettled bets
    Contest {
        /// Match type, e.g. "One on One" or fatal-4-way; derived from the wrestler count if omitted
        #[arg(short, long)]
        mode: Option<MatchType>,
        /// Between 2 and 8 wrestler names
        #[arg(required = true, num_args = 1..)]
        wrestlers: Vec<String>,
    },
    /// Bet WrestleBucks on a wrestler in the current match
    Bet {
        user: String,
        wrestler: String,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Declare the winner and pay out every bet
    #[command(visible_alias = "resolve")]
    Settle { winner: String },
    /// List every user with their record
    Users,
    /// Detailed statistics for one user, or everyone
    Stats { name: Option<String> },
    /// Show the current match
    Match,
    /// Show the bets placed on the current match
    Bets,
    /// Write user data to disk now
    Save,
    /// Discard in-memory users and read them back from disk
    Reload,
    /// Show where user data is stored
    Where,
    /// Leave the session
    #[command(visible_alias = "exit")]
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, String> {
    let words = split_words(line)?;
    if words.is_empty() {
        return Ok(None);
    }
    ReplLine::try_parse_from(words)
        .map(|parsed| Some(parsed.command))
        .map_err(|e| e.to_string())
}

/// Whitespace-separated words; double quotes group words with spaces.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_word = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
