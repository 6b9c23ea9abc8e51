//! Multi-day temperature trend chart

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::{Point, Primitive, Size};
use embedded_graphics::primitives::{Line, Polyline, PrimitiveStyle, Rectangle};
use embedded_graphics::Drawable;
use log::debug;

use super::canvas::Canvas;
use super::typeface::{FontSet, Typeface};
use crate::error::{Error, Result};
use crate::weather::{icon_glyph, ChartDay};

pub const CHART_WIDTH: u32 = 296;
pub const CHART_HEIGHT: u32 = 152;

const MARGIN: i32 = 12;
const LEFT: i32 = MARGIN + 8;
const RIGHT: i32 = CHART_WIDTH as i32 - MARGIN;
const TOP: i32 = 5;
const BOTTOM: i32 = CHART_HEIGHT as i32 - 28;

const LABEL_PX: f32 = 9.0;
const ICON_PX: f32 = 12.0;
const GRID_COLOR: Rgb888 = Rgb888::new(180, 180, 180);
const GRID_INTERVALS: u8 = 2;

/// Narrowest temperature span the y axis covers before padding
const MIN_SPAN: i32 = 5;
const PADDING: i32 = 2;
/// With more days than this only every other day gets date and value labels
const THIN_LABELS_ABOVE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YBounds {
    pub min: i32,
    pub max: i32,
}

impl YBounds {
    pub const fn range(&self) -> i32 {
        self.max - self.min
    }
}

/// Lowest low and highest high with two degrees of room each way. A span narrower than
/// five degrees is widened upwards.
pub fn y_bounds(series: &[ChartDay]) -> Option<YBounds> {
    let low = series.iter().map(|d| d.forecast.temp_min).min()?;
    let high = series.iter().map(|d| d.forecast.temp_max).max()?;
    let deficit = (MIN_SPAN - (high - low)).max(0);
    Some(YBounds {
        min: low - PADDING,
        max: high + PADDING + deficit,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gridline {
    pub y: f32,
    pub temp: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartColumn {
    pub x: f32,
    pub high_y: f32,
    pub low_y: f32,
    /// Whether the date and the temperature values are printed
    pub show_labels: bool,
}

/// Pixel positions of everything on the chart, computed before drawing
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub bounds: YBounds,
    pub gridlines: Vec<Gridline>,
    pub columns: Vec<ChartColumn>,
}

impl ChartLayout {
    pub fn compute(series: &[ChartDay]) -> Result<Self> {
        let bounds =
            y_bounds(series).ok_or_else(|| Error::Render("no weather days to chart".to_string()))?;
        let width = (RIGHT - LEFT) as f32;
        let height = (BOTTOM - TOP) as f32;
        let range = bounds.range() as f32;

        let gridlines = (0..=GRID_INTERVALS)
            .map(|i| {
                let share = f32::from(i) / f32::from(GRID_INTERVALS);
                Gridline {
                    y: TOP as f32 + height * share,
                    temp: bounds.max as f32 - range * share,
                }
            })
            .collect();

        let days = series.len();
        let y_of = |temp: i32| TOP as f32 + height * (bounds.max - temp) as f32 / range;
        let columns = series
            .iter()
            .enumerate()
            .map(|(idx, day)| {
                let x = if days > 1 {
                    LEFT as f32 + width / (days - 1) as f32 * idx as f32
                } else {
                    (LEFT + (RIGHT - LEFT) / 2) as f32
                };
                ChartColumn {
                    x,
                    high_y: y_of(day.forecast.temp_max),
                    low_y: y_of(day.forecast.temp_min),
                    show_labels: days <= THIN_LABELS_ABOVE || idx % 2 == 0,
                }
            })
            .collect();

        Ok(Self {
            bounds,
            gridlines,
            columns,
        })
    }
}

fn px(x: f32, y: f32) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

fn label(face: &Typeface<'_>, canvas: &mut Canvas, text: &str, at: Point) {
    if let Err(e) = face.draw(canvas, text, at, Rgb888::BLACK) {
        debug!("Skipped chart label {text:?}: {e}");
    }
}

pub struct TrendChart<'a> {
    fonts: &'a FontSet,
}

impl<'a> TrendChart<'a> {
    pub fn new(fonts: &'a FontSet) -> Self {
        Self { fonts }
    }

    /// Draw onto an opaque white canvas
    pub fn render(&self, series: &[ChartDay]) -> Result<Canvas> {
        let layout = ChartLayout::compute(series)?;
        let mut canvas = Canvas::filled(CHART_WIDTH, CHART_HEIGHT, Rgb888::WHITE);
        let text = self.fonts.text(LABEL_PX);
        let icons = self.fonts.icons(ICON_PX);
        let grid = PrimitiveStyle::with_stroke(GRID_COLOR, 1);
        let ink = PrimitiveStyle::with_stroke(Rgb888::BLACK, 1);

        for line in &layout.gridlines {
            let y = line.y.round() as i32;
            let _ = Line::new(Point::new(LEFT, y), Point::new(RIGHT, y))
                .into_styled(grid)
                .draw(&mut canvas);
            label(&text, &mut canvas, &format!("{:.0}", line.temp), Point::new(2, y - 5));
        }

        for (column, day) in layout.columns.iter().zip(series) {
            let x = column.x.round() as i32;
            let _ = Line::new(Point::new(x, TOP), Point::new(x, BOTTOM))
                .into_styled(grid)
                .draw(&mut canvas);

            if column.show_labels {
                let date = day.forecast.fx_date.format("%d").to_string();
                let width = text.measure(&date).width as i32;
                label(&text, &mut canvas, &date, Point::new(x - width / 2, BOTTOM + 12));
            }

            let mut buf = [0; 4];
            let glyph: &str = icon_glyph(&day.forecast.icon_day).encode_utf8(&mut buf);
            let width = icons.measure(glyph).width as i32;
            label(&icons, &mut canvas, glyph, Point::new(x - width / 2, BOTTOM + 1));
        }

        let highs: Vec<Point> = layout.columns.iter().map(|c| px(c.x, c.high_y)).collect();
        let lows: Vec<Point> = layout.columns.iter().map(|c| px(c.x, c.low_y)).collect();
        let _ = Polyline::new(&highs).into_styled(ink).draw(&mut canvas);
        let _ = Polyline::new(&lows).into_styled(ink).draw(&mut canvas);

        for ((column, day), (high, low)) in layout
            .columns
            .iter()
            .zip(series)
            .zip(highs.iter().zip(&lows))
        {
            let marker = if day.is_estimate {
                PrimitiveStyle::with_stroke(Rgb888::BLACK, 1)
            } else {
                PrimitiveStyle::with_fill(Rgb888::BLACK)
            };
            for point in [high, low] {
                let _ = Rectangle::new(*point - Point::new(1, 1), Size::new(3, 3))
                    .into_styled(marker)
                    .draw(&mut canvas);
            }

            if column.show_labels {
                let forecast = &day.forecast;
                label(&text, &mut canvas, &forecast.temp_max.to_string(), *high + Point::new(-6, -10));
                label(&text, &mut canvas, &forecast.temp_min.to_string(), *low + Point::new(-6, 2));
            }
        }

        Ok(canvas)
    }
}
