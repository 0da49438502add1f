use std::io::{self, IsTerminal, Write};

use anyhow::Context;
use unicode_width::UnicodeWidthStr;

use crate::classify::DayClass;
use crate::config::CalendarConfig;
use crate::view::{AddEventModal, CalendarFrame, DayCell};

const TODAY_CODE: &str = "7";
const PAST_CODE: &str = "2";
const OUT_OF_MONTH_CODE: &str = "90";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &CalendarConfig) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn with_color(color: bool) -> Self {
        Self { color }
    }

    pub fn write_frame<W: Write>(&self, mut writer: W, frame: &CalendarFrame) -> anyhow::Result<()> {
        let width = cell_width(frame);

        writeln!(writer, "Today  <  >  {}", frame.title)?;

        for label in &frame.weekday_labels {
            write!(writer, "{} ", pad_left(label, width))?;
        }
        writeln!(writer)?;

        for week in frame.weeks() {
            for cell in week {
                write!(writer, "{} ", self.render_cell(cell, width))?;
            }
            writeln!(writer)?;
        }

        if let Some(modal) = &frame.modal {
            write_modal(&mut writer, modal)?;
        }

        Ok(())
    }

    fn render_cell(&self, cell: &DayCell, width: usize) -> String {
        let text = if cell.targeted {
            format!("[{}]", cell.label)
        } else {
            format!(" {} ", cell.label)
        };
        let padded = pad_left(&text, width);
        match style_codes(&cell.class) {
            Some(codes) => self.paint(&padded, &codes),
            None => padded,
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn write_json<W: Write>(mut writer: W, frame: &CalendarFrame) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut writer, frame).context("failed to serialize frame")?;
    writeln!(writer)?;
    Ok(())
}

fn style_codes(class: &DayClass) -> Option<String> {
    let mut codes = Vec::new();
    if class.today {
        codes.push(TODAY_CODE);
    }
    if class.past {
        codes.push(PAST_CODE);
    }
    if class.out_of_month {
        codes.push(OUT_OF_MONTH_CODE);
    }
    if codes.is_empty() {
        None
    } else {
        Some(codes.join(";"))
    }
}

fn cell_width(frame: &CalendarFrame) -> usize {
    let day_width = frame
        .cells
        .iter()
        .map(|cell| UnicodeWidthStr::width(cell.label.as_str()) + 2)
        .max()
        .unwrap_or(0);
    let label_width = frame
        .weekday_labels
        .iter()
        .map(|label| UnicodeWidthStr::width(label.as_str()))
        .max()
        .unwrap_or(0);
    day_width.max(label_width)
}

fn pad_left(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(strip_ansi(text).as_str());
    format!("{}{}", " ".repeat(width.saturating_sub(visible)), text)
}

fn write_modal<W: Write>(writer: &mut W, modal: &AddEventModal) -> anyhow::Result<()> {
    let lines = [
        format!("Add event on {}", modal.label),
        "close: 'close'".to_string(),
    ];
    let inner = lines
        .iter()
        .map(|line| UnicodeWidthStr::width(line.as_str()))
        .max()
        .unwrap_or(0);

    writeln!(writer, "+{}+", "-".repeat(inner + 2))?;
    for line in &lines {
        let padding = inner.saturating_sub(UnicodeWidthStr::width(line.as_str()));
        writeln!(writer, "| {}{} |", line, " ".repeat(padding))?;
    }
    writeln!(writer, "+{}+", "-".repeat(inner + 2))?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::format::ChronoFormatter;
    use crate::grid::WeekStart;
    use crate::view::CalendarView;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn render(view: &CalendarView, renderer: &Renderer) -> String {
        let now = date(2024, 3, 12).and_hms_opt(10, 0, 0).expect("valid now");
        let frame = view.frame(now, &ChronoFormatter::default());
        let mut buf = Vec::new();
        renderer.write_frame(&mut buf, &frame).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn plain_grid_has_header_and_week_rows() {
        let view = CalendarView::new(date(2024, 3, 1), WeekStart::Sunday);
        let text = render(&view, &Renderer::plain());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Today  <  >  Mar 2024");
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>()[0], "Sun");
        assert_eq!(lines.len(), 2 + 6);
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>()[0], "25");
        assert_eq!(lines[7].split_whitespace().last(), Some("6"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn modal_and_target_are_drawn() {
        let mut view = CalendarView::new(date(2024, 3, 1), WeekStart::Sunday);
        view.open_event_creation(date(2024, 3, 14));
        let text = render(&view, &Renderer::plain());
        assert!(text.contains("[14]"));
        assert!(text.contains("| Add event on 03/14/2024 |"));
    }

    #[test]
    fn color_marks_today_past_and_filler() {
        let view = CalendarView::new(date(2024, 3, 1), WeekStart::Sunday);
        let text = render(&view, &Renderer::with_color(true));
        assert!(text.contains("\x1b[7m 12 \x1b[0m"));
        assert!(text.contains("\x1b[2m 11 \x1b[0m"));
        assert!(text.contains("\x1b[2;90m 25 \x1b[0m"));
        assert!(text.contains("\x1b[90m  6 \x1b[0m"));
    }

    #[test]
    fn json_contains_cells_and_modal() {
        let mut view = CalendarView::new(date(2024, 3, 1), WeekStart::Sunday);
        view.open_event_creation(date(2024, 3, 2));
        let now = date(2024, 3, 12).and_hms_opt(10, 0, 0).expect("valid now");
        let frame = view.frame(now, &ChronoFormatter::default());
        let mut buf = Vec::new();
        write_json(&mut buf, &frame).expect("json");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("parse json");
        assert_eq!(value["title"], "Mar 2024");
        assert_eq!(value["cells"].as_array().map(Vec::len), Some(42));
        assert_eq!(value["modal"]["target_date"], "2024-03-02");
        assert_eq!(value["cells"][0]["class"]["out_of_month"], true);
    }
}
