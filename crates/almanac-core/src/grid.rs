use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::{
  add_days,
  checked_shift_months,
  end_of_week,
  first_day_of_month,
  last_day_of_month,
  parse_weekday_name,
  start_of_week
};

pub const DAYS_PER_WEEK: usize = 7;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
  #[default]
  Sunday,
  Monday
}

impl WeekStart {
  #[must_use]
  pub fn weekday(self) -> Weekday {
    match self {
      | WeekStart::Sunday => Weekday::Sun,
      | WeekStart::Monday => Weekday::Mon
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | WeekStart::Sunday => "sunday",
      | WeekStart::Monday => "monday"
    }
  }
}

impl FromStr for WeekStart {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match parse_weekday_name(s) {
      | Some(Weekday::Sun) => {
        Ok(WeekStart::Sunday)
      }
      | Some(Weekday::Mon) => {
        Ok(WeekStart::Monday)
      }
      | _ => {
        Err(anyhow!(
          "unsupported week start \
           '{s}'; expected sunday or \
           monday"
        ))
      }
    }
  }
}

impl fmt::Display for WeekStart {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

/// The week-aligned run of days shown for one month.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct MonthGrid {
  year:       i32,
  month:      u32,
  week_start: WeekStart,
  dates:      Vec<NaiveDate>
}

impl MonthGrid {
  #[must_use]
  pub fn build(
    reference: NaiveDate,
    week_start: WeekStart
  ) -> Self {
    let reference =
      clamp_to_grid_range(reference);
    Self {
      year: reference.year(),
      month: reference.month(),
      week_start,
      dates: build_visible_dates(
        reference, week_start
      )
    }
  }

  /// Whether this grid was built for the month containing `date`
  /// under `week_start`.
  pub fn covers(
    &self,
    date: NaiveDate,
    week_start: WeekStart
  ) -> bool {
    let date = clamp_to_grid_range(date);
    self.year == date.year()
      && self.month == date.month()
      && self.week_start == week_start
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn start(&self) -> NaiveDate {
    self
      .dates
      .first()
      .copied()
      .unwrap_or(NaiveDate::MIN)
  }

  pub fn end(&self) -> NaiveDate {
    self
      .dates
      .last()
      .copied()
      .unwrap_or(NaiveDate::MIN)
  }

  pub fn week_count(&self) -> usize {
    self.dates.len() / DAYS_PER_WEEK
  }

  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[NaiveDate]>
  {
    self.dates.chunks(DAYS_PER_WEEK)
  }

  pub fn week_start(&self) -> WeekStart {
    self.week_start
  }
}

/// Pulls `date` into the months whose padded weeks stay representable:
/// the first and last month of `NaiveDate`'s range map to their inner
/// neighbours.
#[must_use]
pub fn clamp_to_grid_range(
  date: NaiveDate
) -> NaiveDate {
  let lowest = checked_shift_months(
    first_day_of_month(
      NaiveDate::MIN.year(),
      NaiveDate::MIN.month()
    ),
    1
  )
  .unwrap_or(NaiveDate::MIN);
  let highest = add_days(
    first_day_of_month(
      NaiveDate::MAX.year(),
      NaiveDate::MAX.month()
    ),
    -1
  );
  date.clamp(lowest, highest)
}

/// Every day from the start of the week holding the 1st of
/// `reference`'s month through the end of the week holding its last
/// day. Only the year and month of `reference` matter.
#[tracing::instrument(level = "trace")]
pub fn build_visible_dates(
  reference: NaiveDate,
  week_start: WeekStart
) -> Vec<NaiveDate> {
  let reference =
    clamp_to_grid_range(reference);
  let weekday = week_start.weekday();
  let first = first_day_of_month(
    reference.year(),
    reference.month()
  );
  let last = last_day_of_month(
    reference.year(),
    reference.month()
  );
  let start =
    start_of_week(first, weekday);
  let end = end_of_week(last, weekday);

  let span =
    (end - start).num_days().max(0);
  let dates = (0..=span)
    .map(|offset| {
      add_days(start, offset)
    })
    .collect::<Vec<_>>();

  tracing::trace!(
    %start,
    %end,
    cells = dates.len(),
    "built month grid"
  );
  dates
}
