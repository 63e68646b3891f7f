// src/models/building.rs

//! Buildings, regions, and the static building directory.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Building identifier.
pub type BuildingId = u32;

/// Highest building id accepted anywhere in the system.
pub const MAX_BUILDING_ID: BuildingId = 40;

/// Whether a raw id falls in the accepted building id range.
pub fn is_valid_building_id(id: i64) -> bool {
    (0..=i64::from(MAX_BUILDING_ID)).contains(&id)
}

/// A campus region grouping residence halls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    North,
    South,
    West,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::North, Region::South, Region::West];

    /// Canonical display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::North => "North",
            Region::South => "South",
            Region::West => "West",
        }
    }

    /// Parse a region name, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "north" => Some(Region::North),
            "south" => Some(Region::South),
            "west" => Some(Region::West),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A residence hall.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub region: Region,
    #[serde(default)]
    pub address: String,
}

/// Read-only collection of buildings, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct BuildingDirectory {
    buildings: Vec<Building>,
}

impl BuildingDirectory {
    /// Build a directory, rejecting ids outside the accepted range and duplicates.
    pub fn new(buildings: Vec<Building>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for building in &buildings {
            if building.id > MAX_BUILDING_ID {
                return Err(AppError::config(format!(
                    "building id {} ({}) is outside 0-{}",
                    building.id, building.name, MAX_BUILDING_ID
                )));
            }
            if !seen.insert(building.id) {
                return Err(AppError::config(format!(
                    "duplicate building id {}",
                    building.id
                )));
            }
        }
        Ok(Self { buildings })
    }

    /// Load buildings from a JSON array file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::new(serde_json::from_str(&content)?)
    }

    /// Load buildings or return an empty directory if loading fails.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Buildings load failed from {:?}: {}. Using an empty building list.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    pub fn all(&self) -> &[Building] {
        &self.buildings
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Display name of a building, empty when unknown.
    pub fn name_of(&self, id: BuildingId) -> &str {
        self.get(id).map(|b| b.name.as_str()).unwrap_or("")
    }

    /// Every building id, in directory order.
    pub fn ids(&self) -> Vec<BuildingId> {
        self.buildings.iter().map(|b| b.id).collect()
    }

    /// Building ids in the given region, in directory order.
    pub fn in_region(&self, region: Region) -> Vec<BuildingId> {
        self.buildings
            .iter()
            .filter(|b| b.region == region)
            .map(|b| b.id)
            .collect()
    }

    /// Distinct regions present, in order of first appearance.
    pub fn regions(&self) -> Vec<Region> {
        let mut regions = Vec::new();
        for building in &self.buildings {
            if !regions.contains(&building.region) {
                regions.push(building.region);
            }
        }
        regions
    }
}
