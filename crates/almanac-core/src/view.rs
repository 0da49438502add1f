use std::fmt;

use chrono::{
  NaiveDate,
  NaiveDateTime
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::debug;

use crate::classify::{
  DayClass,
  classify_day,
  is_week_header_row
};
use crate::config::CalendarConfig;
use crate::datetime::shift_months;
use crate::format::{
  DateFormat,
  DateFormatter
};
use crate::grid::{
  DAYS_PER_WEEK,
  MonthGrid,
  WeekStart
};

/// State of the "add event" dialog.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
#[serde(
  tag = "state",
  rename_all = "lowercase"
)]
pub enum EventCreation {
  #[default]
  Closed,
  Open {
    target: NaiveDate
  }
}

impl EventCreation {
  pub fn is_open(&self) -> bool {
    matches!(
      self,
      EventCreation::Open { .. }
    )
  }

  pub fn target(
    &self
  ) -> Option<NaiveDate> {
    match self {
      | EventCreation::Open {
        target
      } => Some(*target),
      | EventCreation::Closed => None
    }
  }
}

/// What a "+" click does while the dialog is already open.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RetargetPolicy {
  /// Any click closes the dialog.
  #[default]
  Toggle,
  /// A click on another day moves the dialog there; a click on the
  /// targeted day closes it.
  Retarget
}

impl RetargetPolicy {
  pub fn as_key(self) -> &'static str {
    match self {
      | RetargetPolicy::Toggle => {
        "toggle"
      }
      | RetargetPolicy::Retarget => {
        "retarget"
      }
    }
  }
}

impl std::str::FromStr
  for RetargetPolicy
{
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "toggle" => Ok(Self::Toggle),
      | "retarget" => {
        Ok(Self::Retarget)
      }
      | other => {
        Err(anyhow::anyhow!(
          "unknown event creation \
           policy '{other}'; expected \
           toggle or retarget"
        ))
      }
    }
  }
}

type ChangeCallback =
  Box<dyn FnMut(NaiveDate)>;

pub struct CalendarView {
  anchor:         NaiveDate,
  selected_month: NaiveDate,
  week_start:     WeekStart,
  policy:         RetargetPolicy,
  event_creation: EventCreation,
  grid:           MonthGrid,
  on_change:      Option<ChangeCallback>
}

impl fmt::Debug for CalendarView {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("CalendarView")
      .field("anchor", &self.anchor)
      .field(
        "selected_month",
        &self.selected_month
      )
      .field(
        "week_start",
        &self.week_start
      )
      .field("policy", &self.policy)
      .field(
        "event_creation",
        &self.event_creation
      )
      .field(
        "on_change",
        &self.on_change.is_some()
      )
      .finish_non_exhaustive()
  }
}

impl CalendarView {
  #[must_use]
  pub fn new(
    anchor: NaiveDate,
    week_start: WeekStart
  ) -> Self {
    Self {
      anchor,
      selected_month: anchor,
      week_start,
      policy: RetargetPolicy::default(),
      event_creation:
        EventCreation::Closed,
      grid: MonthGrid::build(
        anchor, week_start
      ),
      on_change: None
    }
  }

  #[must_use]
  pub fn from_config(
    anchor: NaiveDate,
    config: &CalendarConfig
  ) -> Self {
    Self::new(anchor, config.week_start)
      .with_policy(
        config
          .event_creation
          .on_reclick
      )
  }

  #[must_use]
  pub fn with_policy(
    mut self,
    policy: RetargetPolicy
  ) -> Self {
    self.policy = policy;
    self
  }

  /// Registers a callback fired with the new selected month after any
  /// navigation that changes it.
  #[must_use]
  pub fn with_on_change<F>(
    mut self,
    callback: F
  ) -> Self
  where
    F: FnMut(NaiveDate) + 'static
  {
    self.on_change =
      Some(Box::new(callback));
    self
  }

  pub fn anchor(&self) -> NaiveDate {
    self.anchor
  }

  pub fn selected_month(
    &self
  ) -> NaiveDate {
    self.selected_month
  }

  pub fn week_start(&self) -> WeekStart {
    self.week_start
  }

  pub fn policy(
    &self
  ) -> RetargetPolicy {
    self.policy
  }

  pub fn event_creation(
    &self
  ) -> EventCreation {
    self.event_creation
  }

  pub fn grid(&self) -> &MonthGrid {
    &self.grid
  }

  pub fn visible_dates(
    &self
  ) -> &[NaiveDate] {
    self.grid.dates()
  }

  pub fn navigate_previous(&mut self) {
    let target = shift_months(
      self.selected_month,
      -1
    );
    debug!(
      from = %self.selected_month,
      to = %target,
      "navigate previous"
    );
    self.set_selected_month(target);
  }

  pub fn navigate_next(&mut self) {
    let target = shift_months(
      self.selected_month,
      1
    );
    debug!(
      from = %self.selected_month,
      to = %target,
      "navigate next"
    );
    self.set_selected_month(target);
  }

  /// Returns to the anchor date supplied at construction, not the
  /// wall clock.
  pub fn jump_to_today(&mut self) {
    debug!(
      anchor = %self.anchor,
      "jump to anchor"
    );
    self.set_selected_month(
      self.anchor
    );
  }

  pub fn open_event_creation(
    &mut self,
    day: NaiveDate
  ) {
    let next = match (
      self.event_creation,
      self.policy
    ) {
      | (EventCreation::Closed, _) => {
        EventCreation::Open {
          target: day
        }
      }
      | (
        EventCreation::Open { .. },
        RetargetPolicy::Toggle
      ) => EventCreation::Closed,
      | (
        EventCreation::Open {
          target
        },
        RetargetPolicy::Retarget
      ) => {
        if target == day {
          EventCreation::Closed
        } else {
          EventCreation::Open {
            target: day
          }
        }
      }
    };
    debug!(
      clicked = %day.format("%m/%d/%Y"),
      before = ?self.event_creation,
      after = ?next,
      "event creation control activated"
    );
    self.event_creation = next;
  }

  pub fn close_event_creation(
    &mut self
  ) {
    if self.event_creation.is_open() {
      debug!("event creation closed");
    }
    self.event_creation =
      EventCreation::Closed;
  }

  /// Pure projection of the current state; equal inputs give equal
  /// frames.
  pub fn frame(
    &self,
    now: NaiveDateTime,
    formatter: &dyn DateFormatter
  ) -> CalendarFrame {
    let target =
      self.event_creation.target();
    let cells = self
      .grid
      .dates()
      .iter()
      .enumerate()
      .map(|(index, &date)| {
        DayCell {
          date,
          index,
          label: formatter.format(
            date,
            DateFormat::NumericDay
          ),
          week_name:
            is_week_header_row(index)
              .then(|| {
                formatter.format(
                  date,
                  DateFormat::ShortWeekday
                )
              }),
          class: classify_day(
            date,
            self.selected_month,
            now
          ),
          targeted: target
            == Some(date)
        }
      })
      .collect::<Vec<_>>();

    let weekday_labels = cells
      .iter()
      .take(DAYS_PER_WEEK)
      .filter_map(|cell| {
        cell.week_name.clone()
      })
      .collect();

    CalendarFrame {
      title: formatter.format(
        self.selected_month,
        DateFormat::MonthTitle
      ),
      selected_month: self
        .selected_month,
      week_start: self.week_start,
      weekday_labels,
      cells,
      modal: target.map(|target_date| {
        AddEventModal {
          target_date,
          label: formatter.format(
            target_date,
            DateFormat::SlashDate
          )
        }
      })
    }
  }

  fn set_selected_month(
    &mut self,
    date: NaiveDate
  ) {
    if !self
      .grid
      .covers(date, self.week_start)
    {
      self.grid = MonthGrid::build(
        date,
        self.week_start
      );
    }

    let changed =
      self.selected_month != date;
    self.selected_month = date;

    if changed
      && let Some(callback) =
        self.on_change.as_mut()
    {
      callback(date);
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct CalendarFrame {
  pub title:          String,
  pub selected_month: NaiveDate,
  pub week_start:     WeekStart,
  pub weekday_labels: Vec<String>,
  pub cells:          Vec<DayCell>,
  pub modal:          Option<AddEventModal>
}

impl CalendarFrame {
  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[DayCell]> {
    self.cells.chunks(DAYS_PER_WEEK)
  }
}

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct DayCell {
  pub date:      NaiveDate,
  pub index:     usize,
  pub label:     String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub week_name: Option<String>,
  pub class:     DayClass,
  pub targeted:  bool
}

/// Descriptor for the add-event dialog. Cancelling it closes event
/// creation on the owning view.
#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct AddEventModal {
  pub target_date: NaiveDate,
  pub label:       String
}

impl AddEventModal {
  pub fn on_cancel(
    &self,
    view: &mut CalendarView
  ) {
    view.close_event_creation();
  }
}
