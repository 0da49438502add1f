use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Weekday
};
use regex::Regex;

const RELATIVE_PATTERN: &str =
  r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$";
const YEAR_MONTH_PATTERN: &str =
  r"^(?P<year>\d{4})-(?P<month>\d{1,2})$";

fn relative_re()
-> anyhow::Result<&'static Regex> {
  static RELATIVE_RE: OnceLock<
    Result<Regex, regex::Error>
  > = OnceLock::new();
  RELATIVE_RE
    .get_or_init(|| {
      Regex::new(RELATIVE_PATTERN)
    })
    .as_ref()
    .map_err(|e| {
      anyhow!(
        "internal regex compile \
         failure: {e}"
      )
    })
}

fn year_month_re()
-> anyhow::Result<&'static Regex> {
  static YEAR_MONTH_RE: OnceLock<
    Result<Regex, regex::Error>
  > = OnceLock::new();
  YEAR_MONTH_RE
    .get_or_init(|| {
      Regex::new(YEAR_MONTH_PATTERN)
    })
    .as_ref()
    .map_err(|e| {
      anyhow!(
        "internal regex compile \
         failure: {e}"
      )
    })
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  let next_first =
    NaiveDate::from_ymd_opt(
      next_year, next_month, 1
    );
  match next_first {
    | Some(first) => add_days(first, -1),
    | None => NaiveDate::MAX
  }
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

/// Largest `N` accepted in `+Nd`/`+Nw`/`+Nm` date expressions.
pub const MAX_RELATIVE_AMOUNT: i64 =
  1_000_000;

/// Adds whole days, saturating at the representable date range.
#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  checked_add_days(date, days)
    .unwrap_or(saturated(days))
}

pub fn checked_add_days(
  date: NaiveDate,
  days: i64
) -> Option<NaiveDate> {
  date.checked_add_signed(
    Duration::try_days(days)?
  )
}

/// Moves `date` by whole calendar months, clamping the day-of-month to
/// the length of the target month (Jan 31 + 1 month is Feb 28/29).
/// Saturates at the representable date range.
#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  checked_shift_months(
    date,
    i64::from(months)
  )
  .unwrap_or(saturated(i64::from(
    months
  )))
}

pub fn checked_shift_months(
  date: NaiveDate,
  months: i64
) -> Option<NaiveDate> {
  let total = i64::from(date.year())
    .checked_mul(12)?
    .checked_add(i64::from(
      date.month0()
    ))?
    .checked_add(months)?;
  let year = i32::try_from(
    total.div_euclid(12)
  )
  .ok()?;
  let month =
    total.rem_euclid(12) as u32 + 1;

  let first = NaiveDate::from_ymd_opt(
    year, month, 1
  )?;
  let day = date
    .day()
    .min(days_in_month(year, month));
  first.with_day(day)
}

fn saturated(
  direction: i64
) -> NaiveDate {
  if direction < 0 {
    NaiveDate::MIN
  } else {
    NaiveDate::MAX
  }
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

#[must_use]
pub fn end_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    start_of_week(day, week_start),
    6
  )
}

/// Last representable instant of `day`.
#[must_use]
pub fn end_of_day(
  day: NaiveDate
) -> NaiveDateTime {
  let last = NaiveTime::from_hms_nano_opt(
    23,
    59,
    59,
    999_999_999
  )
  .unwrap_or(NaiveTime::MIN);
  day.and_time(last)
}

#[must_use]
pub fn same_month(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a.year() == b.year()
    && a.month() == b.month()
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    return Ok(first_day_of_month(
      today.year(),
      month
    ));
  }

  if let Some(caps) =
    relative_re()?.captures(&lower)
  {
    let negative = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    if num > MAX_RELATIVE_AMOUNT {
      return Err(anyhow!(
        "relative offset {num} exceeds \
         {MAX_RELATIVE_AMOUNT}"
      ));
    }
    let num =
      if negative { -num } else { num };
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let shifted = match unit {
      | "d" => {
        checked_add_days(today, num)
      }
      | "w" => {
        num.checked_mul(7).and_then(
          |days| {
            checked_add_days(today, days)
          }
        )
      }
      | "m" => {
        checked_shift_months(today, num)
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };
    return shifted.ok_or_else(|| {
      anyhow!(
        "date expression {token} is \
         outside the supported range"
      )
    });
  }

  for fmt in
    ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
  {
    if let Ok(date) =
      NaiveDate::parse_from_str(
        token, fmt
      )
    {
      return Ok(date);
    }
  }

  if let Some(caps) =
    year_month_re()?.captures(token)
  {
    let year: i32 = caps["year"]
      .parse()
      .context("invalid year")?;
    let month: u32 = caps["month"]
      .parse()
      .context("invalid month")?;
    return NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year/month: {token}"
      )
    });
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, month \
     names (e.g. march), +Nd/-Nw/+Nm, \
     YYYY-MM-DD, YYYY/MM/DD, \
     MM/DD/YYYY, YYYY-MM"
  })
}

/// Parses a wall-clock instant. Anything [`parse_date_expr`] accepts
/// resolves to midnight of that day.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_datetime_expr(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();
  if token.eq_ignore_ascii_case("now") {
    return Ok(now);
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  let date =
    parse_date_expr(token, now.date())?;
  Ok(date.and_time(NaiveTime::MIN))
}

/// Resolves either a bare day number (day N of `month`'s month) or any
/// date expression.
pub fn resolve_day_in_month(
  input: &str,
  month: NaiveDate,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  if !token.is_empty()
    && token.len() <= 2
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let day: u32 = token
      .parse()
      .context("invalid day number")?;
    return NaiveDate::from_ymd_opt(
      month.year(),
      month.month(),
      day
    )
    .ok_or_else(|| {
      anyhow!(
        "day {day} does not exist in \
         {}",
        month.format("%B %Y")
      )
    });
  }

  parse_date_expr(token, today)
}

pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}
