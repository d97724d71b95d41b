//! # Tastemap CLI Library
//!
//! Concrete collaborators around the tastemap core:
//! - Catalog loader (CSV tables from file or HTTP, merged by product code)
//! - Line-oriented barcode scanner backend
//! - Interactive command parsing and driver loop
//! - Text and JSON rendering of the session view

pub mod app;
pub mod capture;
pub mod commands;
pub mod loader;
pub mod render;

pub use app::{App, OutputMode};
pub use loader::{load_catalog, source_for, CatalogSource, LoadReport};
