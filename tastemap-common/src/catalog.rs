//! Catalog snapshot types
//!
//! The snapshot is built once by the loader and is read-only afterwards.
//! Axis bounds are computed at construction so the coordinate mapper never
//! has to scan the items again.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Wine category
///
/// The catalog tables spell sparkling wine as `Spa`; anything unrecognised
/// lands in `Other` so the item stays rankable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WineType {
    #[serde(rename = "Spa")]
    Sparkling,
    White,
    Red,
    Rose,
    Other,
}

impl WineType {
    /// Chart grouping order
    pub const ALL: [WineType; 5] = [
        WineType::Sparkling,
        WineType::White,
        WineType::Red,
        WineType::Rose,
        WineType::Other,
    ];

    /// Lenient parse of the `Type` column
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "spa" | "sparkling" => WineType::Sparkling,
            "white" => WineType::White,
            "red" => WineType::Red,
            "rose" | "rosé" => WineType::Rose,
            _ => WineType::Other,
        }
    }

    /// Marker colour hint for the chart
    pub fn color(&self) -> &'static str {
        match self {
            WineType::Sparkling => "blue",
            WineType::White => "gold",
            WineType::Red => "red",
            WineType::Rose => "pink",
            WineType::Other => "gray",
        }
    }
}

impl std::fmt::Display for WineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WineType::Sparkling => write!(f, "Spa"),
            WineType::White => write!(f, "White"),
            WineType::Red => write!(f, "Red"),
            WineType::Rose => write!(f, "Rose"),
            WineType::Other => write!(f, "Other"),
        }
    }
}

/// A point in taste space (x = body, y = sweetness)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TastePoint {
    pub x: f64,
    pub y: f64,
}

impl TastePoint {
    pub const ORIGIN: TastePoint = TastePoint { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance_to(&self, other: TastePoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Product code (JAN), trimmed
    pub id: String,
    /// Axis A
    pub body: f64,
    /// Axis B
    pub sweetness: f64,
    pub wine_type: WineType,
    /// Empty when the metadata table had no row for this code
    pub name: String,
    /// Suggested retail price; `None` means "not set", never zero
    pub price: Option<f64>,
}

impl Item {
    pub fn new(id: impl Into<String>, body: f64, sweetness: f64, wine_type: WineType) -> Self {
        Self {
            id: id.into().trim().to_string(),
            body,
            sweetness,
            wine_type,
            name: String::new(),
            price: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_price(mut self, price: Option<f64>) -> Self {
        self.price = price;
        self
    }

    pub fn position(&self) -> TastePoint {
        TastePoint::new(self.body, self.sweetness)
    }

    /// Price with thousands separators, e.g. `1,980 yen`
    pub fn price_label(&self) -> String {
        match self.price {
            Some(price) => format!("{} yen", group_thousands(price.trunc() as i64)),
            None => "price not set".to_string(),
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Observed range of one taste axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bounds of a set of finite values; an empty set collapses to `[0, 0]`
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            min = min.min(v);
            max = max.max(v);
        }
        if min > max {
            return Self { min: 0.0, max: 0.0 };
        }
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Zero spread: every item shares one value on this axis
    pub fn is_degenerate(&self) -> bool {
        !(self.max > self.min)
    }
}

/// Bounds of both taste axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub body: AxisBounds,
    pub sweetness: AxisBounds,
}

impl Bounds {
    pub fn new(body: AxisBounds, sweetness: AxisBounds) -> Self {
        Self { body, sweetness }
    }
}

/// Immutable, merged catalog snapshot
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<Item>,
    bounds: Bounds,
}

impl Catalog {
    /// Build a snapshot, keeping catalog order
    ///
    /// Items with non-finite coordinates and repeated identity keys (after the
    /// first occurrence) are dropped with a warning.
    pub fn new(items: Vec<Item>) -> Self {
        let mut seen = HashSet::with_capacity(items.len());
        let mut kept = Vec::with_capacity(items.len());

        for mut item in items {
            item.id = item.id.trim().to_string();
            if !item.position().is_finite() {
                warn!(id = %item.id, "Dropping catalog item without finite coordinates");
                continue;
            }
            if !seen.insert(item.id.clone()) {
                warn!(id = %item.id, "Dropping duplicate catalog item");
                continue;
            }
            kept.push(item);
        }

        let bounds = Bounds::new(
            AxisBounds::from_values(kept.iter().map(|i| i.body)),
            AxisBounds::from_values(kept.iter().map(|i| i.sweetness)),
        );

        Self { items: kept, bounds }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Exact lookup by identity key (trimmed)
    pub fn get(&self, id: &str) -> Option<&Item> {
        let id = id.trim();
        self.items.iter().find(|item| item.id == id)
    }

    /// Mean position of all items; the origin for an empty catalog
    pub fn centroid(&self) -> TastePoint {
        if self.items.is_empty() {
            return TastePoint::ORIGIN;
        }
        let n = self.items.len() as f64;
        let (sx, sy) = self
            .items
            .iter()
            .fold((0.0, 0.0), |(sx, sy), item| (sx + item.body, sy + item.sweetness));
        TastePoint::new(sx / n, sy / n)
    }

    /// Items of one category, in catalog order
    pub fn by_type(&self, wine_type: WineType) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |item| item.wine_type == wine_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, x: f64, y: f64) -> Item {
        Item::new(id, x, y, WineType::Red)
    }

    #[test]
    fn test_bounds_computed_from_items() {
        let catalog = Catalog::new(vec![item("1", -2.0, 5.0), item("2", 3.0, -1.0), item("3", 0.5, 0.0)]);
        let bounds = catalog.bounds();
        assert_eq!(bounds.body, AxisBounds::new(-2.0, 3.0));
        assert_eq!(bounds.sweetness, AxisBounds::new(-1.0, 5.0));
        assert!(!bounds.body.is_degenerate());
    }

    #[test]
    fn test_empty_catalog_bounds_are_zero_not_nan() {
        let catalog = Catalog::new(Vec::new());
        let bounds = catalog.bounds();
        assert_eq!(bounds.body, AxisBounds::new(0.0, 0.0));
        assert!(bounds.body.is_degenerate());
        assert_eq!(catalog.centroid(), TastePoint::ORIGIN);
    }

    #[test]
    fn test_single_item_axis_is_degenerate() {
        let catalog = Catalog::new(vec![item("1", 1.5, -0.5)]);
        assert!(catalog.bounds().body.is_degenerate());
        assert!(catalog.bounds().sweetness.is_degenerate());
    }

    #[test]
    fn test_duplicates_and_non_finite_are_dropped() {
        let catalog = Catalog::new(vec![
            item(" 1 ", 0.0, 0.0),
            item("1", 9.0, 9.0),
            item("2", f64::NAN, 0.0),
            item("3", 1.0, 1.0),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("1").map(|i| i.body), Some(0.0));
        assert!(catalog.get("2").is_none());
    }

    #[test]
    fn test_centroid() {
        let catalog = Catalog::new(vec![item("1", 0.0, 0.0), item("2", 2.0, 4.0)]);
        assert_eq!(catalog.centroid(), TastePoint::new(1.0, 2.0));
    }

    #[test]
    fn test_wine_type_parse_and_display() {
        assert_eq!(WineType::parse("Spa"), WineType::Sparkling);
        assert_eq!(WineType::parse(" white "), WineType::White);
        assert_eq!(WineType::parse("Orange"), WineType::Other);
        assert_eq!(WineType::Sparkling.to_string(), "Spa");
        assert_eq!(WineType::Rose.color(), "pink");
    }

    #[test]
    fn test_by_type_keeps_catalog_order() {
        let catalog = Catalog::new(vec![
            Item::new("a", 0.0, 0.0, WineType::White),
            Item::new("b", 0.0, 0.0, WineType::Red),
            Item::new("c", 0.0, 0.0, WineType::White),
        ]);
        let whites: Vec<&str> = catalog.by_type(WineType::White).map(|i| i.id.as_str()).collect();
        assert_eq!(whites, vec!["a", "c"]);
    }

    #[test]
    fn test_price_label() {
        let priced = item("1", 0.0, 0.0).with_price(Some(1980.0));
        assert_eq!(priced.price_label(), "1,980 yen");
        let big = item("2", 0.0, 0.0).with_price(Some(1_234_567.9));
        assert_eq!(big.price_label(), "1,234,567 yen");
        let cheap = item("3", 0.0, 0.0).with_price(Some(0.0));
        assert_eq!(cheap.price_label(), "0 yen");
        assert_eq!(item("4", 0.0, 0.0).price_label(), "price not set");
    }
}
