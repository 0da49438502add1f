use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::cli::{Action, parse_line};
use crate::datetime::resolve_day_in_month;
use crate::format::ChronoFormatter;
use crate::render::{Renderer, write_json};
use crate::view::CalendarView;

const PROMPT: &str = "> ";

/// Source of the wall clock used for today/past styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    System,
    Fixed(NaiveDateTime),
}

impl Clock {
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            Clock::Fixed(now) => *now,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct Session {
    pub view: CalendarView,
    formatter: ChronoFormatter,
    renderer: Renderer,
    clock: Clock,
}

impl Session {
    pub fn new(view: CalendarView, formatter: ChronoFormatter, renderer: Renderer, clock: Clock) -> Self {
        Self {
            view,
            formatter,
            renderer,
            clock,
        }
    }

    /// Runs a scripted action list, then prints the resulting frame unless
    /// the script already produced output of its own.
    #[instrument(skip(self, actions, input, out))]
    pub fn run_script<R: BufRead, W: Write>(
        &mut self,
        actions: &[Action],
        input: R,
        out: &mut W,
    ) -> anyhow::Result<()> {
        info!(count = actions.len(), "running action script");

        if let Some(pos) = actions.iter().position(|a| *a == Action::Interactive) {
            for action in &actions[..pos] {
                if self.apply(action, out)? == Flow::Quit {
                    return Ok(());
                }
            }
            return self.run_interactive(input, out);
        }

        for action in actions {
            if self.apply(action, out)? == Flow::Quit {
                return Ok(());
            }
        }

        let needs_final_frame = actions
            .last()
            .is_none_or(|last| !(last.prints_frame() || *last == Action::Help));
        if needs_final_frame {
            self.show(out)?;
        }
        Ok(())
    }

    /// Line-oriented event loop: one or more actions per line, redraw
    /// after anything that changes state, stop on `quit` or EOF.
    #[instrument(skip(self, input, out))]
    pub fn run_interactive<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> anyhow::Result<()> {
        info!("entering interactive mode");
        self.show(out)?;
        write!(out, "{PROMPT}")?;
        out.flush().context("failed to flush output")?;

        for line in input.lines() {
            let line = line.context("failed to read input line")?;
            let actions = match parse_line(&line) {
                Ok(actions) => actions,
                Err(err) => {
                    warn!(error = %err, line = %line, "ignoring invalid input");
                    writeln!(out, "error: {err:#}")?;
                    write!(out, "{PROMPT}")?;
                    out.flush().context("failed to flush output")?;
                    continue;
                }
            };

            let mut redraw = false;
            for action in &actions {
                if *action == Action::Interactive {
                    continue;
                }
                match self.apply(action, out) {
                    Ok(Flow::Quit) => {
                        info!("leaving interactive mode");
                        return Ok(());
                    }
                    Ok(Flow::Continue) => redraw |= action.mutates(),
                    Err(err) => {
                        warn!(error = %err, "action failed");
                        writeln!(out, "error: {err:#}")?;
                    }
                }
            }

            if redraw {
                self.show(out)?;
            }
            write!(out, "{PROMPT}")?;
            out.flush().context("failed to flush output")?;
        }

        debug!("input closed");
        writeln!(out)?;
        Ok(())
    }

    #[instrument(skip(self, out))]
    pub fn apply<W: Write>(&mut self, action: &Action, out: &mut W) -> anyhow::Result<Flow> {
        debug!(?action, "dispatching action");
        match action {
            Action::Prev => self.view.navigate_previous(),
            Action::Next => self.view.navigate_next(),
            Action::Today => self.view.jump_to_today(),
            Action::Add(raw) => {
                let day = resolve_day_in_month(raw, self.view.selected_month(), self.clock.today())
                    .with_context(|| format!("cannot resolve day for add: {raw}"))?;
                self.view.open_event_creation(day);
            }
            Action::Close => self.view.close_event_creation(),
            Action::Show => self.show(out)?,
            Action::Json => {
                let frame = self.view.frame(self.clock.now(), &self.formatter);
                write_json(&mut *out, &frame)?;
            }
            Action::Help => write_help(out)?,
            Action::Quit => return Ok(Flow::Quit),
            Action::Interactive => {
                return Err(anyhow!("interactive mode cannot be nested"));
            }
        }
        Ok(Flow::Continue)
    }

    fn show<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        let frame = self.view.frame(self.clock.now(), &self.formatter);
        self.renderer.write_frame(&mut *out, &frame)
    }
}

fn write_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands: prev (<), next (>), today (t), add <day|date> (+), close (c), show, json, help, quit (q)"
    )?;
    Ok(())
}
