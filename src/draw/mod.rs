//! Everything that puts pixels on the image

pub mod canvas;
pub mod chart;
pub mod composer;
pub mod locale;
pub mod monochrome;
pub mod text_styles;
pub mod typeface;

pub use canvas::Canvas;
pub use chart::TrendChart;
pub use composer::Composer;
pub use locale::Locale;
pub use monochrome::{binarize, encode_png};
pub use typeface::FontSet;
