//! Fuel type catalog for the carburantes fuel price downloader.
//!
//! This crate lists the fuel types a caller can ask to keep, and turns a raw
//! selection into the normalised [`FuelSelection`] consumed by the pruner.
//!
//! # Example
//!
//! ```
//! use carburantes_fuels::{FuelCatalog, FuelSelection};
//!
//! let catalog = FuelCatalog::global();
//! assert!(catalog.get("gasoleo a").is_some());
//!
//! let selection = FuelSelection::from_list("Gasoleo A, gasoleo a ,Biodiesel");
//! assert_eq!(selection.len(), 2);
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/carburantes/carburantes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::sync::OnceLock;

use serde::Deserialize;

/// The fuel catalog JSON embedded at compile time.
const FUELS_JSON: &str = include_str!("../data/fuels.json");

/// Global catalog instance.
static CATALOG: OnceLock<FuelCatalog> = OnceLock::new();

/// Normalises a fuel name for comparison: trimmed and lowercased.
#[must_use]
pub fn normalize_fuel_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A fuel type offered for selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FuelType {
    name: String,
    #[serde(default)]
    basic: bool,
}

impl FuelType {
    /// Returns the display name, which is also the suffix of the price column.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the fuel belongs to the "basic" preset.
    #[must_use]
    pub const fn is_basic(&self) -> bool {
        self.basic
    }
}

/// Catalog of the fuel types published by the price API.
#[derive(Debug)]
pub struct FuelCatalog {
    fuels: Vec<FuelType>,
}

impl FuelCatalog {
    /// Returns the global catalog.
    ///
    /// The catalog is initialized lazily on first access.
    #[must_use]
    pub fn global() -> &'static Self {
        CATALOG.get_or_init(Self::load)
    }

    /// Loads fuels from the embedded JSON data.
    fn load() -> Self {
        let fuels: Vec<FuelType> = serde_json::from_str(FUELS_JSON).expect("Invalid fuels.json");
        Self { fuels }
    }

    /// Looks up a fuel by display name (case- and whitespace-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FuelType> {
        let wanted = normalize_fuel_name(name);
        self.fuels
            .iter()
            .find(|f| normalize_fuel_name(&f.name) == wanted)
    }

    /// Returns all fuels in display order.
    pub fn all(&self) -> impl Iterator<Item = &FuelType> {
        self.fuels.iter()
    }

    /// Returns the fuels of the "basic" preset.
    pub fn basic(&self) -> impl Iterator<Item = &FuelType> {
        self.fuels.iter().filter(|f| f.basic)
    }

    /// Returns the total number of fuels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fuels.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fuels.is_empty()
    }
}

/// The caller's set of fuel names to keep.
///
/// Names are trimmed, empty entries are dropped, and duplicates that differ
/// only in case are collapsed (the first spelling wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuelSelection {
    names: Vec<String>,
}

impl FuelSelection {
    /// Creates a selection from any list of names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .filter(|n| seen.insert(normalize_fuel_name(n)))
            .collect();
        Self { names }
    }

    /// Parses a comma-separated list of names.
    #[must_use]
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// The "basic" preset of the global catalog.
    #[must_use]
    pub fn basic() -> Self {
        Self::new(FuelCatalog::global().basic().map(FuelType::name))
    }

    /// Returns the selected names as given (trimmed).
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the number of selected fuels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no fuel is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns true if `fuel` equals a selected name after trimming and
    /// lowercasing both sides. Partial names never match.
    #[must_use]
    pub fn contains(&self, fuel: &str) -> bool {
        let wanted = normalize_fuel_name(fuel);
        self.names.iter().any(|n| normalize_fuel_name(n) == wanted)
    }

    /// Merges another selection into this one.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.names.iter().chain(other.names.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = FuelCatalog::global();
        assert_eq!(catalog.len(), 15);
        assert_eq!(catalog.basic().count(), 7);
    }

    #[test]
    fn test_get_case_insensitive() {
        let catalog = FuelCatalog::global();
        assert!(catalog.get("GASOLEO A").is_some());
        assert!(catalog.get("  gases licuados del petróleo ").is_some());
        assert!(catalog.get("Gasoleo").is_none());
    }

    #[test]
    fn test_selection_normalises() {
        let selection = FuelSelection::new(["  Gasoleo A ", "", "GASOLEO A", "Biodiesel"]);
        assert_eq!(selection.names(), ["Gasoleo A", "Biodiesel"]);
    }

    #[test]
    fn test_selection_exact_match() {
        let selection = FuelSelection::from_list("gasoleo a");
        assert!(selection.contains("Gasoleo A"));
        assert!(selection.contains(" Gasoleo A "));
        assert!(!selection.contains("Gasoleo A Premium"));
        assert!(!selection.contains("Gasoleo"));
    }

    #[test]
    fn test_basic_preset() {
        let basic = FuelSelection::basic();
        assert!(basic.contains("Gasolina 95 E5 Premium"));
        assert!(!basic.contains("Biodiesel"));
        let merged = basic.union(&FuelSelection::from_list("biodiesel,Gasoleo A"));
        assert_eq!(merged.len(), 8);
    }
}
