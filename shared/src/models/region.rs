//! Region catalog and coordinate-to-region resolution
//!
//! Region codes are the integer encoding the forecast model was trained with.
//! The persisted region map is a JSON object of `{"<code>": "<name>"}`; when it
//! is not available the built-in table of the seventeen Philippine regions is
//! used instead.
//!
//! Coordinate resolution is a coarse approximation using a handful of
//! axis-aligned bounding boxes. It is not a geocoder: anything outside the
//! boxes resolves to the catalog's default region.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::GpsCoordinates;

/// Geographic centroid of the Philippines, used for names with no known capital
pub const NATIONAL_CENTROID: GpsCoordinates = GpsCoordinates::new(12.8797, 121.7740);

/// An administrative region known to the forecast model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    /// Model encoding, unique within a catalog
    pub code: i32,
    /// Name as it appears in the training data
    pub canonical_name: String,
    /// Human friendly name
    pub display_name: String,
    /// Regional capital, used when a flow needs a point for the region
    pub coordinates: GpsCoordinates,
}

/// Errors raised while parsing a persisted region map
#[derive(Debug, Error)]
pub enum RegionMapError {
    #[error("invalid region map JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("region code '{0}' is not an integer")]
    InvalidCode(String),

    #[error("region code {0} appears more than once")]
    DuplicateCode(i32),

    #[error("region map is empty")]
    Empty,
}

/// Built-in catalog: (code, canonical name, display name, capital lat, capital lon)
static BUILTIN_REGIONS: [(i32, &str, &str, f64, f64); 17] = [
    (0, "BARMM", "Bangsamoro (BARMM)", 7.2236, 124.2464),
    (1, "CAR", "Cordillera Administrative Region", 16.4023, 120.5960),
    (2, "CARAGA", "Caraga", 8.9475, 125.5406),
    (3, "National Capital Region", "Metro Manila (NCR)", 14.5995, 120.9842),
    (4, "Region I", "Ilocos Region", 16.6159, 120.3166),
    (5, "Region II", "Cagayan Valley", 17.6132, 121.7270),
    (6, "Region III", "Central Luzon", 15.0286, 120.6898),
    (7, "Region IV-A", "CALABARZON", 14.2117, 121.1653),
    (8, "Region IV-B", "MIMAROPA", 13.4115, 121.1803),
    (9, "Region IX", "Zamboanga Peninsula", 7.8257, 123.4370),
    (10, "Region V", "Bicol Region", 13.1391, 123.7438),
    (11, "Region VI", "Western Visayas", 10.7202, 122.5621),
    (12, "Region VII", "Central Visayas", 10.3157, 123.8854),
    (13, "Region VIII", "Eastern Visayas", 11.2447, 125.0048),
    (14, "Region X", "Northern Mindanao", 8.4542, 124.6319),
    (15, "Region XI", "Davao Region", 7.1907, 125.4553),
    (16, "Region XII", "SOCCSKSARGEN", 6.5008, 124.8469),
];

/// Axis-aligned box mapped to a region name
#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    region_name: &'static str,
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
}

impl BoundingBox {
    fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

/// Boxes in priority order; the first match wins.
const REGION_BOXES: [BoundingBox; 4] = [
    BoundingBox {
        region_name: "National Capital Region",
        lat_min: 14.35,
        lat_max: 14.75,
        lon_min: 120.85,
        lon_max: 121.15,
    },
    BoundingBox {
        region_name: "Region X",
        lat_min: 8.0,
        lat_max: 9.5,
        lon_min: 124.0,
        lon_max: 125.5,
    },
    BoundingBox {
        region_name: "Region VI",
        lat_min: 10.0,
        lat_max: 11.5,
        lon_min: 122.0,
        lon_max: 123.5,
    },
    BoundingBox {
        region_name: "Region IX",
        lat_min: 7.0,
        lat_max: 8.5,
        lon_min: 122.5,
        lon_max: 124.5,
    },
];

/// Immutable, ordered set of regions with a default
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    regions: Vec<Region>,
    default_index: usize,
}

impl RegionCatalog {
    /// Catalog of the seventeen Philippine regions.
    pub fn builtin() -> Self {
        let regions = BUILTIN_REGIONS
            .iter()
            .map(|&(code, canonical, display, lat, lon)| Region {
                code,
                canonical_name: canonical.to_string(),
                display_name: display.to_string(),
                coordinates: GpsCoordinates::new(lat, lon),
            })
            .collect();
        Self {
            regions,
            default_index: 0,
        }
    }

    /// Build a catalog from `(code, name)` pairs, ordered by code.
    ///
    /// Display names and capitals are filled from the built-in table when the
    /// name is known there.
    pub fn from_entries(entries: Vec<(i32, String)>) -> Result<Self, RegionMapError> {
        if entries.is_empty() {
            return Err(RegionMapError::Empty);
        }

        let mut seen = HashSet::new();
        let mut sorted: BTreeMap<i32, String> = BTreeMap::new();
        for (code, name) in entries {
            if !seen.insert(code) {
                return Err(RegionMapError::DuplicateCode(code));
            }
            sorted.insert(code, name.trim().to_string());
        }

        let regions = sorted
            .into_iter()
            .map(|(code, name)| {
                let known = builtin_entry_for(&name);
                Region {
                    code,
                    display_name: known
                        .map(|k| k.2.to_string())
                        .unwrap_or_else(|| name.clone()),
                    coordinates: known
                        .map(|k| GpsCoordinates::new(k.3, k.4))
                        .unwrap_or(NATIONAL_CENTROID),
                    canonical_name: name,
                }
            })
            .collect();

        Ok(Self {
            regions,
            default_index: 0,
        })
    }

    /// Parse the persisted `{"<code>": "<name>"}` form.
    pub fn from_json_str(json: &str) -> Result<Self, RegionMapError> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .map(|(code, name)| {
                code.trim()
                    .parse::<i32>()
                    .map(|c| (c, name))
                    .map_err(|_| RegionMapError::InvalidCode(code))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_entries(entries)
    }

    /// Use the region with `code` as the fallback; unknown codes keep the
    /// current default.
    pub fn with_default_code(mut self, code: i32) -> Self {
        if let Some(idx) = self.regions.iter().position(|r| r.code == code) {
            self.default_index = idx;
        }
        self
    }

    pub fn all(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn default_region(&self) -> &Region {
        &self.regions[self.default_index]
    }

    pub fn get(&self, code: i32) -> Option<&Region> {
        self.regions.iter().find(|r| r.code == code)
    }

    /// Resolve a computed region name against the catalog.
    ///
    /// Exact match first, then a case-insensitive substring match, then the
    /// default region.
    pub fn resolve_name(&self, name: &str) -> &Region {
        if let Some(region) = self.regions.iter().find(|r| r.canonical_name == name) {
            return region;
        }
        let needle = name.to_lowercase();
        self.regions
            .iter()
            .find(|r| r.canonical_name.to_lowercase().contains(&needle))
            .unwrap_or_else(|| self.default_region())
    }

    /// Map a coordinate to a region. Total for every input, including
    /// non-finite values which fall through to the default.
    pub fn lookup_by_coordinate(&self, latitude: f64, longitude: f64) -> &Region {
        match REGION_BOXES.iter().find(|b| b.contains(latitude, longitude)) {
            Some(b) => self.resolve_name(b.region_name),
            None => self.default_region(),
        }
    }

    /// Model encoding for `region`; regions not in this catalog encode to 0.
    pub fn encode(&self, region: &Region) -> i32 {
        self.regions
            .iter()
            .find(|r| r.code == region.code && r.canonical_name == region.canonical_name)
            .map(|r| r.code)
            .unwrap_or(0)
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_entry_for(name: &str) -> Option<&'static (i32, &'static str, &'static str, f64, f64)> {
    BUILTIN_REGIONS
        .iter()
        .find(|entry| entry.1.eq_ignore_ascii_case(name))
}
