//! Text and JSON rendering of the session view

use std::fmt::Write;
use tastemap_common::ratings::Rating;
use tastemap_common::{ScanOutcome, SessionView};

/// Multi-line summary: target, scan state, zoom, then the ranked list
pub fn render_text(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Target: body {:.3}, sweetness {:.3}  (sliders {}/{}, from {}, rev {})",
        view.target.x,
        view.target.y,
        view.sliders.body,
        view.sliders.sweetness,
        view.source,
        view.revision
    );
    let _ = writeln!(
        out,
        "Scan: {}   Zoom: {:.1}x   View: body [{:.2}, {:.2}] sweetness [{:.2}, {:.2}]",
        view.scan,
        view.zoom,
        view.viewport.x_range.0,
        view.viewport.x_range.1,
        view.viewport.y_range.0,
        view.viewport.y_range.1
    );

    if view.ranking.is_empty() {
        out.push_str("No items in catalog\n");
    }
    for entry in &view.ranking {
        let name = if entry.name.is_empty() { &entry.id } else { &entry.name };
        let rating = Rating::new(i64::from(entry.rating));
        let _ = writeln!(
            out,
            "{:>3}. {} [{}] {}  d={:.3}  {}",
            entry.rank,
            name,
            entry.wine_type,
            entry.price_label,
            entry.distance,
            rating.label()
        );
    }

    if !view.rated.is_empty() {
        let _ = writeln!(out, "Rated: {}", view.rated.len());
    }
    out
}

pub fn render_json(view: &SessionView) -> serde_json::Result<String> {
    serde_json::to_string_pretty(view)
}

/// One-line notice for a scan result, if it deserves one
pub fn render_outcome(outcome: &ScanOutcome) -> Option<String> {
    match outcome {
        ScanOutcome::Matched { code, item_id } => Some(format!("Scanned {} -> {}", code, item_id)),
        ScanOutcome::NoMatch(code) => Some(format!("No catalog item for code {}", code)),
        ScanOutcome::CaptureFailed(reason) => Some(format!("Scan failed: {}", reason)),
        ScanOutcome::Ignored => None,
    }
}
