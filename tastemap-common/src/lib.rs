//! # Tastemap Common Library
//!
//! Preference matching and ranking core shared by every tastemap front end:
//! - Catalog snapshot types (items positioned in body/sweetness taste space)
//! - Coordinate mapper between slider positions and taste coordinates
//! - Target state fed by point picks, sliders and barcode scans
//! - Nearest-neighbour ranking engine
//! - Scan state machine with at-most-once decode handling
//! - Rating store, zoom/viewport, event bus and configuration

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod mapper;
pub mod ranking;
pub mod ratings;
pub mod scan;
pub mod session;
pub mod target;
pub mod viewport;

pub use catalog::{AxisBounds, Bounds, Catalog, Item, TastePoint, WineType};
pub use error::{Error, Result};
pub use session::{ScanOutcome, SessionOptions, SessionView, TasteSession};
