//! Placement of forecast days on the week grid

use chrono::{Datelike, Days, NaiveDate};
use embedded_graphics::prelude::Point;

use super::{weekday_number, DAYS_IN_WEEK};

/// At most this many week rows are displayed
pub const MAX_ROWS: u8 = 5;
pub const MAX_CELLS: usize = MAX_ROWS as usize * DAYS_IN_WEEK as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Index into the forecast sequence the grid was laid out from
    Forecast(usize),
    /// Synthesized to complete the last week row
    Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub date: NaiveDate,
    /// Monday = 1 .. Sunday = 7
    pub weekday: u8,
    /// Row, 0 based
    pub week_index: u8,
    pub kind: CellKind,
}

impl GridCell {
    pub const fn column(&self) -> u8 {
        self.weekday - 1
    }

    pub const fn row(&self) -> u8 {
        self.week_index
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub const fn is_padding(&self) -> bool {
        matches!(self.kind, CellKind::Padding)
    }

    /// Offset of the day number inside the calendar area
    pub fn offset(&self, geometry: &GridGeometry) -> Point {
        let dx = (self.column() as f32 * geometry.cell_width) as i32 + geometry.left_inset;
        let dy = ((self.row() as f32 + 1.0) * geometry.cell_height) as i32
            + geometry.header_height
            - geometry.vertical_correction;
        Point::new(dx, dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub cell_width: f32,
    pub cell_height: f32,
    pub header_height: i32,
    pub left_inset: i32,
    pub vertical_correction: i32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            cell_width: 18.0,
            cell_height: 25.5,
            header_height: 17,
            left_inset: 1,
            vertical_correction: 3,
        }
    }
}

impl GridGeometry {
    pub fn width(&self) -> i32 {
        (DAYS_IN_WEEK as f32 * self.cell_width) as i32
    }
}

/// Nudge for the day number so one digit days and the narrow `1` glyph look centered
pub fn day_label_correction(day: u32) -> i32 {
    let single_digit = if day < 10 { 4 } else { 0 };
    let ones = day.to_string().chars().filter(|&c| c == '1').count() as i32;
    single_digit + ones * 2
}

#[derive(Debug, Clone, Default)]
pub struct CalendarGrid {
    cells: heapless::Vec<GridCell, MAX_CELLS>,
}

impl CalendarGrid {
    /// Lay out consecutive forecast dates Monday-first.
    ///
    /// A new row starts every time the weekday wraps back to Monday; a sixth week is
    /// dropped. The last row is padded through Sunday.
    pub fn layout<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut cells = heapless::Vec::new();
        let mut row = 0_u8;

        for (idx, date) in dates.into_iter().enumerate() {
            let weekday = weekday_number(date);
            if weekday == 1 && idx > 0 {
                if row == MAX_ROWS - 1 {
                    break;
                }
                row += 1;
            }
            let cell = GridCell {
                date,
                weekday,
                week_index: row,
                kind: CellKind::Forecast(idx),
            };
            if cells.push(cell).is_err() {
                break;
            }
        }

        let mut grid = Self { cells };
        grid.pad_to_sunday();
        grid
    }

    fn pad_to_sunday(&mut self) {
        let Some(last) = self.cells.last().copied() else {
            return;
        };
        for weekday in (last.weekday + 1)..=DAYS_IN_WEEK {
            let Some(date) = last
                .date
                .checked_add_days(Days::new(u64::from(weekday - last.weekday)))
            else {
                break;
            };
            let cell = GridCell {
                date,
                weekday,
                week_index: last.week_index,
                kind: CellKind::Padding,
            };
            if self.cells.push(cell).is_err() {
                break;
            }
        }
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn rows(&self) -> u8 {
        self.cells.last().map(|c| c.week_index + 1).unwrap_or(0)
    }

    pub fn padding_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_padding()).count()
    }
}
