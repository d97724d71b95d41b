//! Rating store
//!
//! Per-session star ratings keyed by item identity. Independent of ranking;
//! merged into the presentation view only.

use crate::catalog::{Catalog, Item};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Star rating in `[0, 5]`; 0 means unrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const UNRATED: Rating = Rating(0);
    pub const MAX: u8 = 5;

    /// Out-of-range input clamps to the nearest bound
    pub fn new(value: i64) -> Self {
        Rating(value.clamp(0, Self::MAX as i64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_rated(&self) -> bool {
        self.0 > 0
    }

    /// `unrated`, or one star glyph per point
    pub fn label(&self) -> String {
        if self.is_rated() {
            "★".repeat(self.0 as usize)
        } else {
            "unrated".to_string()
        }
    }

    /// Chart bubble size for a rated item
    pub fn marker_size(&self) -> u32 {
        self.0 as u32 * 6 + 8
    }
}

/// Rated item as shown on the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedMarker {
    pub id: String,
    pub body: f64,
    pub sweetness: f64,
    pub rating: u8,
    pub marker_size: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RatingStore {
    ratings: HashMap<String, Rating>,
}

impl RatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; returns the stored (clamped) rating
    pub fn set_rating(&mut self, item_id: &str, rating: i64) -> Rating {
        let rating = Rating::new(rating);
        self.ratings.insert(item_id.trim().to_string(), rating);
        rating
    }

    pub fn get_rating(&self, item_id: &str) -> Rating {
        self.ratings
            .get(item_id.trim())
            .copied()
            .unwrap_or(Rating::UNRATED)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Sorted copy for presentation and serialisation
    pub fn snapshot(&self) -> BTreeMap<String, u8> {
        self.ratings
            .iter()
            .map(|(id, rating)| (id.clone(), rating.value()))
            .collect()
    }

    /// Items with a rating above zero, in catalog order
    ///
    /// Ratings for keys absent from the catalog are kept but not listed.
    pub fn rated<'a>(&self, catalog: &'a Catalog) -> Vec<(&'a Item, Rating)> {
        catalog
            .items()
            .iter()
            .filter_map(|item| {
                let rating = self.get_rating(&item.id);
                rating.is_rated().then_some((item, rating))
            })
            .collect()
    }

    pub fn markers(&self, catalog: &Catalog) -> Vec<RatedMarker> {
        self.rated(catalog)
            .into_iter()
            .map(|(item, rating)| RatedMarker {
                id: item.id.clone(),
                body: item.body,
                sweetness: item.sweetness,
                rating: rating.value(),
                marker_size: rating.marker_size(),
            })
            .collect()
    }
}
