//! Zoom level and the chart window around the target

use crate::catalog::{AxisBounds, Bounds, TastePoint};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Zoom limits; all fields optional in TOML
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSettings {
    pub initial: f64,
    pub step: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            initial: 0.5,
            step: 0.1,
            min: 0.2,
            max: 10.0,
        }
    }
}

impl ZoomSettings {
    /// Finite, positive limits with `min <= max`, positive step, finite initial
    pub fn is_valid(&self) -> bool {
        self.min > 0.0
            && self.max.is_finite()
            && self.min <= self.max
            && self.step > 0.0
            && self.step.is_finite()
            && self.initial.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom {
    level: f64,
    settings: ZoomSettings,
}

impl Zoom {
    /// Invalid settings are replaced by the defaults
    pub fn new(settings: ZoomSettings) -> Self {
        let settings = if settings.is_valid() {
            settings
        } else {
            warn!(?settings, "Invalid zoom settings, using defaults");
            ZoomSettings::default()
        };
        Self {
            level: settings.initial.clamp(settings.min, settings.max),
            settings,
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.level = (self.level + self.settings.step).min(self.settings.max);
        self.level
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.level = (self.level - self.settings.step).max(self.settings.min);
        self.level
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(ZoomSettings::default())
    }
}

/// Visible chart ranges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

fn visible_span(axis: AxisBounds) -> f64 {
    if axis.is_degenerate() {
        1.0
    } else {
        axis.span()
    }
}

/// Window centred on the target; higher zoom shows less
pub fn viewport(target: TastePoint, bounds: &Bounds, zoom: f64) -> Viewport {
    let half_x = visible_span(bounds.body) / 2.0 / zoom;
    let half_y = visible_span(bounds.sweetness) / 2.0 / zoom;
    Viewport {
        x_range: (target.x - half_x, target.x + half_x),
        y_range: (target.y - half_y, target.y + half_y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_is_clamped() {
        let mut zoom = Zoom::default();
        assert_eq!(zoom.level(), 0.5);
        for _ in 0..200 {
            zoom.zoom_in();
        }
        assert_eq!(zoom.level(), 10.0);
        for _ in 0..200 {
            zoom.zoom_out();
        }
        assert_eq!(zoom.level(), 0.2);
    }

    #[test]
    fn test_initial_outside_limits_is_clamped() {
        let zoom = Zoom::new(ZoomSettings { initial: 50.0, ..ZoomSettings::default() });
        assert_eq!(zoom.level(), 10.0);
    }

    #[test]
    fn test_invalid_settings_fall_back_to_defaults() {
        let inverted = Zoom::new(ZoomSettings { min: 5.0, max: 1.0, ..ZoomSettings::default() });
        assert_eq!(inverted.level(), 0.5);

        let nan_limit = Zoom::new(ZoomSettings { max: f64::NAN, ..ZoomSettings::default() });
        assert_eq!(nan_limit.level(), 0.5);

        let mut nan_initial = Zoom::new(ZoomSettings { initial: f64::NAN, ..ZoomSettings::default() });
        assert_eq!(nan_initial.level(), 0.5);
        assert!((nan_initial.zoom_in() - 0.6).abs() < 1e-9);

        let bounds = Bounds::new(AxisBounds::new(-10.0, 10.0), AxisBounds::new(-10.0, 10.0));
        let view = viewport(TastePoint::ORIGIN, &bounds, nan_initial.level());
        assert!(view.x_range.0.is_finite() && view.y_range.1.is_finite());
    }

    #[test]
    fn test_viewport_centred_on_target() {
        let bounds = Bounds::new(AxisBounds::new(-10.0, 10.0), AxisBounds::new(0.0, 4.0));
        let view = viewport(TastePoint::new(1.0, 2.0), &bounds, 0.5);
        assert_eq!(view.x_range, (-19.0, 21.0));
        assert_eq!(view.y_range, (-2.0, 6.0));

        let close = viewport(TastePoint::new(1.0, 2.0), &bounds, 2.0);
        assert_eq!(close.x_range, (-4.0, 6.0));
    }

    #[test]
    fn test_degenerate_axis_window_is_not_empty() {
        let bounds = Bounds::new(AxisBounds::new(3.0, 3.0), AxisBounds::new(3.0, 3.0));
        let view = viewport(TastePoint::new(3.0, 3.0), &bounds, 1.0);
        assert_eq!(view.x_range, (2.5, 3.5));
    }
}
