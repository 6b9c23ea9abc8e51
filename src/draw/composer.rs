//! The weather calendar: week grid with icons on the right, todo lines on the left and a
//! short weather summary under the todo lines when there is room.

use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::{Point, Primitive, Size};
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::Drawable;
use log::debug;

use super::canvas::Canvas;
use super::locale::Locale;
use super::typeface::{FontSet, GlyphError};
use crate::calendar_utils::grid::day_label_correction;
use crate::calendar_utils::{
    all_weekdays_letter_en, weekday_number, CalendarGrid, CellKind, GridCell, GridGeometry,
};
use crate::error::{Error, Result};
use crate::todolist::SEPARATOR;
use crate::weather::{icon_glyph, DailyForecast, UNKNOWN_ICON};

pub const CANVAS_WIDTH: u32 = 296;
pub const CANVAS_HEIGHT: u32 = 152;

const CALENDAR_LEFT: i32 = 2;
const CALENDAR_TOP: i32 = -3;
const HEADER_FONT_PX: f32 = 9.0;
const DAY_FONT_PX: f32 = 9.0;
const DAY_ICON_MARGIN: i32 = 2;
const ICON_FONT_PX: f32 = 10.0;

const TODO_FONT_PX: f32 = 10.0;
pub const TODO_MAX_LINES: usize = 5;
const TODO_LEFT: i32 = 3;
const TODO_TOP: i32 = 3;
const LINE_SPACING: i32 = 3;
const CHAR_SPACING: i32 = 1;
const SEPARATOR_GAP: i32 = 6;
const SEPARATOR_INSET: i32 = 10;
const PLACEHOLDER_LEFT: i32 = 30;
const PLACEHOLDER_TOP: i32 = 10 + TODO_FONT_PX as i32;
const PLACEHOLDER_FALLBACK: &str = "No schedule";

const BIG_ICON_PX: f32 = 35.0;
const TEMP_LABEL_PX: f32 = 10.0;
const TEMP_VALUE_PX: f32 = 20.0;
const BOTTOM_MARGIN: i32 = 2;
const LOW_LABEL_X: i32 = 53;
const HIGH_LABEL_X: i32 = 113;
/// Temperature value sits this far right of its label
const VALUE_OFFSET: i32 = 15;
const DEGREE: &str = "°";

/// Local hour from which today's cell shows the night icon
const EVENING_HOUR: u32 = 17;

fn skipped(result: core::result::Result<i32, GlyphError>, what: &str) -> Option<i32> {
    result
        .inspect_err(|e| debug!("Skipped drawing {what}: {e}"))
        .ok()
}

pub struct Composer<'a> {
    fonts: &'a FontSet,
    locale: &'a Locale,
    geometry: GridGeometry,
}

impl<'a> Composer<'a> {
    pub fn new(fonts: &'a FontSet, locale: &'a Locale) -> Self {
        Self {
            fonts,
            locale,
            geometry: GridGeometry::default(),
        }
    }

    fn calendar_width(&self) -> i32 {
        self.geometry.width()
    }

    fn calendar_origin_x(&self) -> i32 {
        CANVAS_WIDTH as i32 - self.calendar_width() + CALENDAR_LEFT
    }

    /// Draw everything onto a fresh transparent canvas
    pub fn compose(
        &self,
        forecast: &[DailyForecast],
        todolist: &[String],
        now: &DateTime<Tz>,
    ) -> Result<Canvas> {
        if forecast.is_empty() {
            return Err(Error::Render("no forecast days to draw".to_string()));
        }

        let grid = CalendarGrid::layout(forecast.iter().map(|day| day.fx_date));
        let mut canvas = Canvas::transparent(CANVAS_WIDTH, CANVAS_HEIGHT);

        self.draw_header(&mut canvas);
        self.draw_days(&mut canvas, &grid, forecast, now);
        let todo_height = self.draw_todos(&mut canvas, todolist);
        if todo_height < CANVAS_HEIGHT as i32 / 2 {
            self.draw_supplement(&mut canvas, forecast, now);
        }
        Ok(canvas)
    }

    fn draw_header(&self, canvas: &mut Canvas) {
        let face = self.fonts.text(HEADER_FONT_PX);
        let y = CALENDAR_TOP + self.geometry.header_height - 3;
        let fallback = all_weekdays_letter_en();

        for (idx, label) in self.locale.weekday_headers.iter().enumerate() {
            let x = self.calendar_origin_x()
                + (idx as f32 * self.geometry.cell_width) as i32
                + self.geometry.left_inset;
            let position = Point::new(x, y);
            if face.draw(canvas, label, position, Rgb888::BLACK).is_err() {
                skipped(
                    face.draw(canvas, fallback[idx], position, Rgb888::BLACK),
                    "weekday header",
                );
            }
        }
    }

    fn draw_days(
        &self,
        canvas: &mut Canvas,
        grid: &CalendarGrid,
        forecast: &[DailyForecast],
        now: &DateTime<Tz>,
    ) {
        let numbers = self.fonts.text(DAY_FONT_PX);
        let icons = self.fonts.icons(ICON_FONT_PX);

        for cell in grid.cells() {
            let offset = cell.offset(&self.geometry);
            let x = self.calendar_origin_x() + offset.x;
            let y = CALENDAR_TOP + offset.y;

            let day = cell.day();
            let label = day.to_string();
            let label_at = Point::new(x + day_label_correction(day), y);
            skipped(numbers.draw(canvas, &label, label_at, Rgb888::BLACK), "day number");

            let glyph = cell_glyph(cell, forecast, &self.locale.precipitation_keywords, now);
            let icon_at = Point::new(x, y - DAY_FONT_PX as i32 - DAY_ICON_MARGIN);
            let mut buf = [0; 4];
            skipped(
                icons.draw(canvas, glyph.encode_utf8(&mut buf), icon_at, Rgb888::BLACK),
                "weather icon",
            );
        }
    }

    /// Returns how far down the todo block reaches
    fn draw_todos(&self, canvas: &mut Canvas, todolist: &[String]) -> i32 {
        let face = self.fonts.text(TODO_FONT_PX);

        if todolist.is_empty() {
            let position = Point::new(PLACEHOLDER_LEFT, PLACEHOLDER_TOP);
            if face
                .draw(canvas, &self.locale.no_schedule, position, Rgb888::BLACK)
                .is_err()
            {
                skipped(
                    face.draw(canvas, PLACEHOLDER_FALLBACK, position, Rgb888::BLACK),
                    "placeholder",
                );
            }
            return PLACEHOLDER_TOP + 10;
        }

        let rule_end = CANVAS_WIDTH as i32 - self.calendar_width() - SEPARATOR_INSET;
        let mut height = TODO_TOP;
        for line in todolist.iter().take(TODO_MAX_LINES) {
            if line == SEPARATOR {
                let y = height + 3;
                let _ = Line::new(Point::new(SEPARATOR_INSET, y), Point::new(rule_end, y))
                    .into_styled(PrimitiveStyle::with_stroke(Rgb888::BLACK, 1))
                    .draw(canvas);
                height += SEPARATOR_GAP;
                continue;
            }

            // one draw call per character so a missing glyph only costs that character
            let mut x = TODO_LEFT;
            let mut buf = [0; 4];
            for c in line.chars() {
                skipped(
                    face.draw(canvas, c.encode_utf8(&mut buf), Point::new(x, height), Rgb888::BLACK),
                    "todo character",
                );
                x += face.advance(c) + CHAR_SPACING;
            }
            height += face.measure(line).height as i32 + LINE_SPACING;
        }
        height
    }

    fn draw_supplement(&self, canvas: &mut Canvas, forecast: &[DailyForecast], now: &DateTime<Tz>) {
        let Some(today) = forecast.first() else {
            return;
        };
        let keywords = &self.locale.precipitation_keywords;

        let night = today.night_matches(keywords) || now.hour() >= EVENING_HOUR;
        let glyph = icon_glyph(if night { &today.icon_night } else { &today.icon_day });
        let mut buf = [0; 4];
        let icon_at = Point::new(3, CANVAS_HEIGHT as i32 - BIG_ICON_PX as i32 - BOTTOM_MARGIN);
        skipped(
            self.fonts
                .icons(BIG_ICON_PX)
                .draw(canvas, glyph.encode_utf8(&mut buf), icon_at, Rgb888::BLACK),
            "today icon",
        );

        let value_y = CANVAS_HEIGHT as i32 - TEMP_VALUE_PX as i32 - BOTTOM_MARGIN;
        self.draw_temperature(canvas, LOW_LABEL_X, value_y, &self.locale.lowest, today.temp_min);
        self.draw_temperature(canvas, HIGH_LABEL_X, value_y, &self.locale.highest, today.temp_max);

        let Some(outlook) = precipitation_outlook(forecast, self.locale, now.date_naive()) else {
            return;
        };
        let face = self.fonts.text(TEMP_LABEL_PX);
        let position = supplement_position(face.measure(&outlook), self.calendar_width());
        skipped(face.draw(canvas, &outlook, position, Rgb888::BLACK), "precipitation outlook");
    }

    /// Two stacked label characters followed by the value and a degree sign
    fn draw_temperature(&self, canvas: &mut Canvas, x: i32, value_y: i32, which: &str, value: i32) {
        let label = self.fonts.text(TEMP_LABEL_PX);
        let label_top = Point::new(x, value_y - TEMP_LABEL_PX as i32);
        skipped(label.draw(canvas, &self.locale.extreme, label_top, Rgb888::BLACK), "temperature label");
        skipped(label.draw(canvas, which, Point::new(x, value_y), Rgb888::BLACK), "temperature label");

        let face = self.fonts.text(TEMP_VALUE_PX);
        let value_at = Point::new(x + VALUE_OFFSET, value_y);
        if let Some(width) = skipped(face.draw(canvas, &value.to_string(), value_at, Rgb888::BLACK), "temperature") {
            skipped(
                face.draw(canvas, DEGREE, value_at + Point::new(width, 0), Rgb888::BLACK),
                "degree sign",
            );
        }
    }
}

/// Icon for a grid cell. The night icon wins when the night brings precipitation, or for
/// today once it's evening.
pub fn cell_glyph(
    cell: &GridCell,
    forecast: &[DailyForecast],
    keywords: &[String],
    now: &DateTime<Tz>,
) -> char {
    let CellKind::Forecast(idx) = cell.kind else {
        return icon_glyph(UNKNOWN_ICON);
    };
    let Some(day) = forecast.get(idx) else {
        return icon_glyph(UNKNOWN_ICON);
    };
    let evening_today = day.fx_date == now.date_naive() && now.hour() >= EVENING_HOUR;
    if day.night_matches(keywords) || evening_today {
        icon_glyph(&day.icon_night)
    } else {
        icon_glyph(&day.icon_day)
    }
}

/// Where the next precipitation is expected, in words. `forecast` starts at `today`.
pub fn precipitation_outlook(
    forecast: &[DailyForecast],
    locale: &Locale,
    today: NaiveDate,
) -> Option<String> {
    let keywords = &locale.precipitation_keywords;
    let first = forecast.first()?;
    if first.day_matches(keywords) || first.night_matches(keywords) {
        return Some(locale.rain_today.clone());
    }

    let labels = locale.relative_day_labels(weekday_number(today));
    let label = |idx: usize| {
        labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| locale.days_later(idx))
    };
    forecast.iter().enumerate().find_map(|(idx, day)| {
        if day.day_matches(keywords) {
            Some(format!("{}{}{}", label(idx), locale.has, day.text_day))
        } else if day.night_matches(keywords) {
            Some(format!("{}{}{}", label(idx), locale.at_night, day.text_night))
        } else {
            None
        }
    })
}

/// Bottom right of the todo column, kept inside the canvas
pub fn supplement_position(text: Size, calendar_width: i32) -> Point {
    let (w, h) = (CANVAS_WIDTH as i32, CANVAS_HEIGHT as i32);
    let (tw, th) = (text.width as i32, text.height as i32);
    let x = (w - calendar_width - tw - 5).min(w - tw - 2).max(0);
    let y = (h - 40 - th).min(h - th - 2).max(0);
    Point::new(x, y)
}
