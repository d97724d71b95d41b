//! Coordinate mapper
//!
//! Converts between slider positions (0-100 per axis) and taste-space
//! coordinates using the catalog's observed bounds. Slider, click and scan
//! input all resolve to the same target through these two functions, and the
//! sliders follow a target set elsewhere through the inverse.
//!
//! Positions are continuous here. The integer [`SliderPair`] is the
//! presentation view and is derived by rounding.

use crate::catalog::{AxisBounds, Bounds, TastePoint};
use serde::{Deserialize, Serialize};

pub const SLIDER_MIN: f64 = 0.0;
pub const SLIDER_MAX: f64 = 100.0;

/// Continuous slider positions, each in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderPosition {
    pub body: f64,
    pub sweetness: f64,
}

/// Integer slider view, each in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SliderPair {
    pub body: u8,
    pub sweetness: u8,
}

impl SliderPair {
    pub fn new(body: u8, sweetness: u8) -> Self {
        Self {
            body: body.min(SLIDER_MAX as u8),
            sweetness: sweetness.min(SLIDER_MAX as u8),
        }
    }

    pub fn from_position(position: SliderPosition) -> Self {
        Self {
            body: round_slider(position.body),
            sweetness: round_slider(position.sweetness),
        }
    }

    pub fn as_position(&self) -> SliderPosition {
        SliderPosition {
            body: self.body as f64,
            sweetness: self.sweetness as f64,
        }
    }
}

fn round_slider(value: f64) -> u8 {
    if value.is_nan() {
        return SLIDER_MIN as u8;
    }
    value.clamp(SLIDER_MIN, SLIDER_MAX).round() as u8
}

/// Slider position on one axis → coordinate
///
/// A degenerate axis maps every position to its single value.
pub fn axis_to_coordinate(position: f64, axis: AxisBounds) -> f64 {
    if axis.is_degenerate() {
        return axis.min;
    }
    let position = position.clamp(SLIDER_MIN, SLIDER_MAX);
    axis.min + (position / SLIDER_MAX) * axis.span()
}

/// Coordinate on one axis → slider position, clamped to `[0, 100]`
///
/// A degenerate axis has no meaningful position and reports the minimum.
pub fn coordinate_to_axis(value: f64, axis: AxisBounds) -> f64 {
    if axis.is_degenerate() || value.is_nan() {
        return SLIDER_MIN;
    }
    ((value - axis.min) / axis.span() * SLIDER_MAX).clamp(SLIDER_MIN, SLIDER_MAX)
}

pub fn slider_to_target(position: SliderPosition, bounds: &Bounds) -> TastePoint {
    TastePoint::new(
        axis_to_coordinate(position.body, bounds.body),
        axis_to_coordinate(position.sweetness, bounds.sweetness),
    )
}

pub fn target_to_slider(target: TastePoint, bounds: &Bounds) -> SliderPosition {
    SliderPosition {
        body: coordinate_to_axis(target.x, bounds.body),
        sweetness: coordinate_to_axis(target.y, bounds.sweetness),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric(extent: f64) -> Bounds {
        Bounds::new(
            AxisBounds::new(-extent, extent),
            AxisBounds::new(-extent, extent),
        )
    }

    #[test]
    fn test_midpoint_maps_to_center() {
        let target = slider_to_target(
            SliderPosition { body: 50.0, sweetness: 50.0 },
            &symmetric(10.0),
        );
        assert_eq!(target, TastePoint::new(0.0, 0.0));
    }

    #[test]
    fn test_extremes_map_to_bounds() {
        let bounds = Bounds::new(AxisBounds::new(-3.0, 7.0), AxisBounds::new(1.0, 2.0));
        let low = slider_to_target(SliderPosition { body: 0.0, sweetness: 0.0 }, &bounds);
        let high = slider_to_target(SliderPosition { body: 100.0, sweetness: 100.0 }, &bounds);
        assert_eq!(low, TastePoint::new(-3.0, 1.0));
        assert_eq!(high, TastePoint::new(7.0, 2.0));
    }

    #[test]
    fn test_target_to_slider_scenario() {
        let position = target_to_slider(TastePoint::new(3.0, 4.0), &symmetric(10.0));
        assert_eq!(SliderPair::from_position(position), SliderPair::new(65, 70));
    }

    #[test]
    fn test_target_outside_bounds_is_clamped() {
        let position = target_to_slider(TastePoint::new(-50.0, 50.0), &symmetric(10.0));
        assert_eq!(position.body, 0.0);
        assert_eq!(position.sweetness, 100.0);
    }

    #[test]
    fn test_round_trip_inside_bounds() {
        let bounds = Bounds::new(AxisBounds::new(-2.37, 4.11), AxisBounds::new(-8.0, -1.5));
        let points = [
            TastePoint::new(0.0, -4.0),
            TastePoint::new(-2.3, -7.99),
            TastePoint::new(4.1, -1.51),
            TastePoint::new(1.2345678, -3.3333333),
        ];
        for p in points {
            let back = slider_to_target(target_to_slider(p, &bounds), &bounds);
            assert!((back.x - p.x).abs() < 1e-6, "x drifted: {:?} -> {:?}", p, back);
            assert!((back.y - p.y).abs() < 1e-6, "y drifted: {:?} -> {:?}", p, back);
        }
    }

    #[test]
    fn test_degenerate_axis_is_constant() {
        let bounds = Bounds::new(AxisBounds::new(2.5, 2.5), AxisBounds::new(-1.0, 1.0));
        for slider in [0.0, 13.0, 50.0, 99.0, 100.0] {
            let target = slider_to_target(SliderPosition { body: slider, sweetness: 50.0 }, &bounds);
            assert_eq!(target.x, 2.5);
            assert_eq!(target.y, 0.0);
        }
        let position = target_to_slider(TastePoint::new(2.5, 1.0), &bounds);
        assert_eq!(position.body, SLIDER_MIN);
        assert_eq!(position.sweetness, 100.0);
    }

    #[test]
    fn test_slider_pair_clamps_and_rounds() {
        assert_eq!(SliderPair::new(150, 30), SliderPair { body: 100, sweetness: 30 });
        let pair = SliderPair::from_position(SliderPosition { body: 49.5, sweetness: f64::NAN });
        assert_eq!(pair, SliderPair { body: 50, sweetness: 0 });
    }
}
