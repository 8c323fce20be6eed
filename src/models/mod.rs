//! Data models for wishtrack.

mod item;

pub use item::{ItemRecord, Price};
