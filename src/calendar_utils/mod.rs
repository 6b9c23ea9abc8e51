//! A bunch of utils for working with calendar stuff

pub mod grid;

use chrono::{Datelike, NaiveDate};

pub use grid::{CalendarGrid, CellKind, GridCell, GridGeometry};

pub const DAYS_IN_WEEK: u8 = 7;

/// Monday-first weekday number in `1..=7`
pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Single letter labels used when the localized header can't be drawn
pub const fn all_weekdays_letter_en() -> [&'static str; 7] {
    ["M", "T", "W", "T", "F", "S", "S"]
}
