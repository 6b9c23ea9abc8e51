//! Weather calendar and temperature trend images for Dot e-ink displays

pub mod app;
pub mod cache;
pub mod calendar_utils;
pub mod config;
#[cfg(feature = "http")]
pub mod device_push;
pub mod draw;
pub mod error;
pub mod event_source;
pub mod time;
pub mod todolist;
pub mod weather;

pub use error::{Error, Result};
