use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "almanac",
    version,
    about = "Almanac: month-view calendar for the terminal",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Anchor date: initial month and target of `today`.
    #[arg(long = "date", default_value = "today")]
    pub date: String,

    /// Wall clock used to mark today and past days.
    #[arg(long = "now", default_value = "now")]
    pub now: String,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Prev,
    Next,
    Today,
    Add(String),
    Close,
    Show,
    Json,
    Help,
    Quit,
    Interactive,
}

impl Action {
    /// Whether the action can change what the calendar shows.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Action::Prev | Action::Next | Action::Today | Action::Add(_) | Action::Close
        )
    }

    /// Whether the action prints a frame itself.
    pub fn prints_frame(&self) -> bool {
        matches!(self, Action::Show | Action::Json)
    }
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "prev",
        "next",
        "today",
        "add",
        "close",
        "cancel",
        "show",
        "json",
        "help",
        "quit",
        "exit",
        "interactive",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

fn resolve_alias(token: &str) -> Option<&'static str> {
    match token {
        "<" | "p" => Some("prev"),
        ">" | "n" => Some("next"),
        "t" => Some("today"),
        "+" => Some("add"),
        "c" => Some("close"),
        "q" => Some("quit"),
        _ => None,
    }
}

/// Parses a whitespace-separated action script; `add` takes the next
/// token as its date.
#[tracing::instrument(skip_all)]
pub fn parse_actions(tokens: &[String]) -> anyhow::Result<Vec<Action>> {
    let known = known_command_names();
    let mut actions = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter();

    while let Some(raw) = iter.next() {
        let token = raw.trim().to_ascii_lowercase();
        if token.is_empty() {
            continue;
        }

        let name: &str = match resolve_alias(&token) {
            Some(alias) => alias,
            None => expand_command_abbrev(&token, &known).ok_or_else(|| anyhow!("unknown command: {raw}"))?,
        };
        debug!(token = %raw, expanded = %name, "resolved command token");

        let action = match name {
            "prev" => Action::Prev,
            "next" => Action::Next,
            "today" => Action::Today,
            "add" => {
                let date = iter
                    .next()
                    .ok_or_else(|| anyhow!("add requires a date or day number"))?;
                Action::Add(date.clone())
            }
            "close" | "cancel" => Action::Close,
            "show" => Action::Show,
            "json" => Action::Json,
            "help" => Action::Help,
            "quit" | "exit" => Action::Quit,
            "interactive" => Action::Interactive,
            other => return Err(anyhow!("unhandled command: {other}")),
        };
        actions.push(action);
    }

    Ok(actions)
}

pub fn parse_line(line: &str) -> anyhow::Result<Vec<Action>> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    parse_actions(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_script_with_aliases_and_abbreviations() {
        let actions = parse_actions(&tokens(&["<", "ne", "add", "12", "c", "sh"])).expect("parse");
        assert_eq!(
            actions,
            vec![
                Action::Prev,
                Action::Next,
                Action::Add("12".to_string()),
                Action::Close,
                Action::Show,
            ]
        );
    }

    #[test]
    fn add_without_argument_fails() {
        assert!(parse_actions(&tokens(&["add"])).is_err());
    }

    #[test]
    fn unknown_tokens_fail() {
        assert!(parse_actions(&tokens(&["bogus"])).is_err());
        assert!(parse_actions(&tokens(&["next", "zz"])).is_err());
        assert_eq!(parse_actions(&tokens(&["e"])).expect("exit"), vec![Action::Quit]);
    }

    #[test]
    fn keyval_requires_equals() {
        let kv: KeyVal = "week_start = monday".parse().expect("keyval");
        assert_eq!(kv.key, "week_start");
        assert_eq!(kv.value, "monday");
        assert!("week_start".parse::<KeyVal>().is_err());
    }

    #[test]
    fn parse_line_splits_on_whitespace() {
        assert_eq!(
            parse_line("  today   json ").expect("parse"),
            vec![Action::Today, Action::Json]
        );
        assert!(parse_line("").expect("empty").is_empty());
    }
}
