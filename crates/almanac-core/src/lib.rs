pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod format;
pub mod grid;
pub mod render;
pub mod view;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal
};

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting almanac"
  );

  let mut cfg =
    config::CalendarConfig::load(
      cli.config.as_deref()
    )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;
  debug!(?cfg, "effective config");

  let wall_clock =
    Local::now().naive_local();
  let now = datetime::parse_datetime_expr(
    &cli.now, wall_clock
  )
  .context("invalid --now value")?;
  let clock = if cli
    .now
    .trim()
    .eq_ignore_ascii_case("now")
  {
    commands::Clock::System
  } else {
    commands::Clock::Fixed(now)
  };

  let anchor = datetime::parse_date_expr(
    &cli.date,
    now.date()
  )
  .context("invalid --date value")?;
  info!(%anchor, week_start = %cfg.week_start, "calendar anchor resolved");

  let view =
    view::CalendarView::from_config(
      anchor, &cfg
    )
    .with_on_change(|month| {
      debug!(%month, "selected month changed");
    });

  let tokens: Vec<String> = cli
    .rest
    .into_iter()
    .map(|arg| {
      arg.to_string_lossy().to_string()
    })
    .collect();
  let mut actions =
    cli::parse_actions(&tokens)?;
  if actions.is_empty() {
    let action = if io::stdin()
      .is_terminal()
    {
      cli::Action::Interactive
    } else {
      cli::Action::Show
    };
    debug!(?action, "no explicit actions, using default");
    actions.push(action);
  }

  let mut session =
    commands::Session::new(
      view,
      format::ChronoFormatter::new(
        cfg.title_format.clone()
      ),
      render::Renderer::new(&cfg),
      clock
    );

  let stdin = io::stdin().lock();
  let mut stdout = io::stdout().lock();
  session.run_script(
    &actions,
    stdin,
    &mut stdout
  )?;

  info!("done");
  Ok(())
}
