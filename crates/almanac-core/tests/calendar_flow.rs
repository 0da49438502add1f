use std::cell::RefCell;
use std::rc::Rc;

use almanac_core::classify::{is_current_day, is_past_day};
use almanac_core::config::CalendarConfig;
use almanac_core::format::ChronoFormatter;
use almanac_core::grid::WeekStart;
use almanac_core::view::{CalendarView, EventCreation, RetargetPolicy};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn navigation_round_trip_from_config() {
    let cfg = CalendarConfig::from_toml("week_start = \"monday\"").expect("config");
    let months = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&months);
    let mut view =
        CalendarView::from_config(date(2024, 5, 31), &cfg).with_on_change(move |m| sink.borrow_mut().push(m));
    assert_eq!(view.anchor(), date(2024, 5, 31));
    assert_eq!(view.week_start(), WeekStart::Monday);
    assert_eq!(view.grid().week_start(), WeekStart::Monday);
    assert_eq!(view.policy(), RetargetPolicy::Toggle);

    view.navigate_previous();
    assert_eq!(view.selected_month(), date(2024, 4, 30));
    assert_eq!(view.visible_dates().first().copied(), Some(date(2024, 4, 1)));

    view.navigate_next();
    assert_eq!(view.selected_month(), date(2024, 5, 30));

    view.jump_to_today();
    assert_eq!(view.selected_month(), date(2024, 5, 31));
    assert_eq!(view.anchor(), date(2024, 5, 31));

    assert_eq!(
        *months.borrow(),
        vec![date(2024, 4, 30), date(2024, 5, 30), date(2024, 5, 31)]
    );
}

#[test]
fn plus_button_toggles_without_retargeting() {
    let mut view = CalendarView::from_config(date(2024, 3, 1), &CalendarConfig::default());

    view.open_event_creation(date(2024, 3, 8));
    assert_eq!(view.event_creation(), EventCreation::Open { target: date(2024, 3, 8) });

    view.open_event_creation(date(2024, 3, 20));
    assert_eq!(view.event_creation(), EventCreation::Closed);

    view.open_event_creation(date(2024, 3, 20));
    assert_eq!(view.event_creation().target(), Some(date(2024, 3, 20)));
}

#[test]
fn today_cell_is_never_past() {
    let today = date(2024, 3, 12);
    let view = CalendarView::new(date(2024, 3, 1), Default::default());
    for (h, m, s) in [(0, 0, 0), (6, 15, 0), (23, 59, 59)] {
        let now = today.and_hms_opt(h, m, s).expect("valid time");
        assert!(!is_past_day(today, now));
        assert!(is_current_day(today, now));

        let frame = view.frame(now, &ChronoFormatter::default());
        let todays: Vec<_> = frame.cells.iter().filter(|cell| cell.class.today).collect();
        assert_eq!(todays.len(), 1);
        assert!(!todays[0].class.past);
        assert!(frame
            .cells
            .iter()
            .filter(|cell| cell.date < today)
            .all(|cell| cell.class.past));
    }
}

#[test]
fn config_selects_retarget_policy() {
    let cfg = CalendarConfig::from_toml("[event_creation]\non_reclick = \"retarget\"").expect("config");
    let mut view = CalendarView::from_config(date(2024, 3, 1), &cfg);
    assert_eq!(view.policy(), RetargetPolicy::Retarget);
    assert_eq!(view.week_start(), WeekStart::Sunday);

    view.open_event_creation(date(2024, 3, 4));
    view.open_event_creation(date(2024, 3, 9));
    assert_eq!(view.event_creation(), EventCreation::Open { target: date(2024, 3, 9) });
}
