//! Target state
//!
//! The single authoritative preference point. Slider pair and target are two
//! views of one value: whichever the user set last is taken as given and the
//! other is derived through the coordinate mapper. Every write is a full
//! overwrite of both views and bumps the revision, so anything derived from an
//! older revision is stale.

use crate::catalog::{Bounds, Catalog, Item, TastePoint};
use crate::mapper::{slider_to_target, target_to_slider, SliderPair};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which input last wrote the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    Initial,
    Point,
    Slider,
    Scan,
}

impl std::fmt::Display for TargetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetSource::Initial => write!(f, "initial"),
            TargetSource::Point => write!(f, "point"),
            TargetSource::Slider => write!(f, "slider"),
            TargetSource::Scan => write!(f, "scan"),
        }
    }
}

/// Where the target starts before any user input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialTarget {
    #[default]
    Origin,
    Centroid,
}

impl InitialTarget {
    pub fn resolve(&self, catalog: &Catalog) -> TastePoint {
        match self {
            InitialTarget::Origin => TastePoint::ORIGIN,
            InitialTarget::Centroid => catalog.centroid(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetState {
    target: TastePoint,
    sliders: SliderPair,
    source: TargetSource,
    bounds: Bounds,
    revision: u64,
}

impl TargetState {
    pub fn new(initial: TastePoint, bounds: Bounds) -> Self {
        let sliders = SliderPair::from_position(target_to_slider(initial, &bounds));
        Self {
            target: initial,
            sliders,
            source: TargetSource::Initial,
            bounds,
            revision: 0,
        }
    }

    pub fn target(&self) -> TastePoint {
        self.target
    }

    pub fn sliders(&self) -> SliderPair {
        self.sliders
    }

    pub fn source(&self) -> TargetSource {
        self.source
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Incremented on every write
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Direct pick in taste space; may lie outside the data envelope
    pub fn set_from_point(&mut self, x: f64, y: f64) -> TastePoint {
        let target = TastePoint::new(x, y);
        let sliders = SliderPair::from_position(target_to_slider(target, &self.bounds));
        self.overwrite(target, sliders, TargetSource::Point)
    }

    pub fn set_from_slider(&mut self, body: u8, sweetness: u8) -> TastePoint {
        let sliders = SliderPair::new(body, sweetness);
        let target = slider_to_target(sliders.as_position(), &self.bounds);
        self.overwrite(target, sliders, TargetSource::Slider)
    }

    pub fn set_from_scan_match(&mut self, item: &Item) -> TastePoint {
        let target = item.position();
        let sliders = SliderPair::from_position(target_to_slider(target, &self.bounds));
        self.overwrite(target, sliders, TargetSource::Scan)
    }

    fn overwrite(&mut self, target: TastePoint, sliders: SliderPair, source: TargetSource) -> TastePoint {
        self.target = target;
        self.sliders = sliders;
        self.source = source;
        self.revision += 1;
        debug!(
            x = target.x,
            y = target.y,
            body = sliders.body,
            sweetness = sliders.sweetness,
            %source,
            revision = self.revision,
            "Target updated"
        );
        target
    }
}
