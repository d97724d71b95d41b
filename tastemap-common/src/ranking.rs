//! Ranking engine
//!
//! Brute-force nearest neighbours over the full catalog snapshot. Filtering by
//! category, if any, happens in the presentation layer after ranking.
//!
//! Ordering is ascending Euclidean distance with catalog position as the
//! tie-break, so the output is a pure function of (target, catalog, k).

use crate::catalog::{Catalog, Item, TastePoint, WineType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Length of the recommendation list unless configured otherwise
pub const DEFAULT_TOP_K: usize = 10;

/// One ranked catalog item, borrowed from the snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked<'a> {
    pub item: &'a Item,
    /// Position in the catalog (tie-break key)
    pub index: usize,
    pub distance: f64,
}

fn ranked_cmp(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.index.cmp(&b.index))
}

/// Top `k` items nearest to `target`, nearest first
///
/// Returns fewer than `k` entries when the catalog is smaller; never pads.
/// O(n) selection followed by an O(k log k) sort of the survivors.
pub fn rank(target: TastePoint, catalog: &Catalog, k: usize) -> Vec<Ranked<'_>> {
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<Ranked<'_>> = catalog
        .items()
        .iter()
        .enumerate()
        .map(|(index, item)| Ranked {
            item,
            index,
            distance: target.distance_to(item.position()),
        })
        .collect();

    if scored.len() > k {
        scored.select_nth_unstable_by(k - 1, ranked_cmp);
        scored.truncate(k);
    }
    scored.sort_by(ranked_cmp);
    scored
}

/// Owned, presentation-ready ranking row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// 1-based list position
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub wine_type: WineType,
    pub price: Option<f64>,
    pub price_label: String,
    pub body: f64,
    pub sweetness: f64,
    pub distance: f64,
    /// Merged from the rating store; 0 = unrated
    pub rating: u8,
}

impl RankingEntry {
    pub fn new(position: usize, ranked: &Ranked<'_>, rating: u8) -> Self {
        let item = ranked.item;
        Self {
            rank: position + 1,
            id: item.id.clone(),
            name: item.name.clone(),
            wine_type: item.wine_type,
            price: item.price,
            price_label: item.price_label(),
            body: item.body,
            sweetness: item.sweetness,
            distance: ranked.distance,
            rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(points: &[(&str, f64, f64)]) -> Catalog {
        Catalog::new(
            points
                .iter()
                .map(|(id, x, y)| Item::new(*id, *x, *y, WineType::Red))
                .collect(),
        )
    }

    fn ids(ranked: &[Ranked<'_>]) -> Vec<String> {
        ranked.iter().map(|r| r.item.id.clone()).collect()
    }

    #[test]
    fn test_scenario_top_two() {
        let catalog = catalog(&[("1", 0.0, 0.0), ("2", 3.0, 4.0), ("3", -1.0, -1.0)]);
        let ranked = rank(TastePoint::ORIGIN, &catalog, 2);
        assert_eq!(ids(&ranked), vec!["1", "3"]);
        assert_eq!(ranked[0].distance, 0.0);
        assert!((ranked[1].distance - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_small_catalog_is_not_padded() {
        let catalog = catalog(&[("a", 5.0, 0.0), ("b", 1.0, 0.0), ("c", 3.0, 0.0)]);
        let ranked = rank(TastePoint::ORIGIN, &catalog, DEFAULT_TOP_K);
        assert_eq!(ids(&ranked), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        // Four items on the unit circle plus one farther away
        let catalog = catalog(&[
            ("n", 0.0, 1.0),
            ("far", 9.0, 9.0),
            ("e", 1.0, 0.0),
            ("s", 0.0, -1.0),
            ("w", -1.0, 0.0),
        ]);
        let ranked = rank(TastePoint::ORIGIN, &catalog, 3);
        assert_eq!(ids(&ranked), vec!["n", "e", "s"]);

        let all = rank(TastePoint::ORIGIN, &catalog, 10);
        assert_eq!(ids(&all), vec!["n", "e", "s", "w", "far"]);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let points: Vec<(String, f64, f64)> = (0..200)
            .map(|i| (format!("{i:04}"), ((i * 37) % 11) as f64, ((i * 53) % 7) as f64))
            .collect();
        let catalog = Catalog::new(
            points
                .iter()
                .map(|(id, x, y)| Item::new(id.as_str(), *x, *y, WineType::White))
                .collect(),
        );
        let target = TastePoint::new(5.0, 3.0);
        let first = rank(target, &catalog, 10);
        let second = rank(target, &catalog, 10);
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
        assert!(first.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_selection_matches_full_sort() {
        let catalog = catalog(&[
            ("a", 4.0, 4.0),
            ("b", 1.0, 1.0),
            ("c", -1.0, -1.0),
            ("d", 2.0, 0.0),
            ("e", 0.0, 2.0),
            ("f", 0.5, 0.0),
        ]);
        let full = rank(TastePoint::ORIGIN, &catalog, catalog.len());
        for k in 1..=catalog.len() {
            let partial = rank(TastePoint::ORIGIN, &catalog, k);
            assert_eq!(partial.as_slice(), &full[..k], "k = {k}");
        }
    }

    #[test]
    fn test_zero_k_and_empty_catalog() {
        let catalog = catalog(&[("a", 0.0, 0.0)]);
        assert!(rank(TastePoint::ORIGIN, &catalog, 0).is_empty());
        assert!(rank(TastePoint::ORIGIN, &Catalog::new(Vec::new()), 10).is_empty());
    }

    #[test]
    fn test_entry_carries_rating_and_one_based_rank() {
        let catalog = catalog(&[("a", 0.0, 0.0)]);
        let ranked = rank(TastePoint::new(0.0, 1.0), &catalog, 1);
        let entry = RankingEntry::new(0, &ranked[0], 4);
        assert_eq!(entry.rank, 1);
        assert_eq!(entry.id, "a");
        assert_eq!(entry.distance, 1.0);
        assert_eq!(entry.rating, 4);
        assert_eq!(entry.price_label, "price not set");
    }
}
