// src/models/selection.rs

//! Target selection values exchanged with the control panel.
//!
//! The panel speaks in string values: `region-all` for the whole campus,
//! `region-<Name>` for a region, and the decimal building id for a building.
//! A selected entry arrives either as that bare value or as an object
//! `{ "value": ..., "label": ... }`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{BuildingId, Region, is_valid_building_id};

const REGION_PREFIX: &str = "region-";
const CAMPUS_VALUE: &str = "region-all";

/// One node of the campus → region → building selection tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionNode {
    Campus,
    Region(Region),
    Building(BuildingId),
}

impl SelectionNode {
    /// Parse a panel value string.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Some(rest) = value.strip_prefix(REGION_PREFIX) {
            if rest.eq_ignore_ascii_case("all") {
                return Ok(SelectionNode::Campus);
            }
            return Region::parse(rest)
                .map(SelectionNode::Region)
                .ok_or_else(|| AppError::validation(format!("Invalid region: {rest}")));
        }
        match value.parse::<i64>() {
            Ok(id) if is_valid_building_id(id) => Ok(SelectionNode::Building(id as BuildingId)),
            Ok(id) => Err(AppError::validation(format!("Invalid building_id: {id}"))),
            Err(_) => Err(AppError::validation(format!(
                "Unrecognized selection value: {value}"
            ))),
        }
    }

    /// Parse a raw JSON selection entry: a string, a number, or `{value, label}`.
    pub fn from_json(raw: &Value) -> Result<Self> {
        match raw {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n
                .as_i64()
                .filter(|id| is_valid_building_id(*id))
                .map(|id| SelectionNode::Building(id as BuildingId))
                .ok_or_else(|| AppError::validation(format!("Invalid building_id: {n}"))),
            Value::Object(map) => match map.get("value") {
                Some(inner @ (Value::String(_) | Value::Number(_))) => Self::from_json(inner),
                _ => Err(AppError::validation(
                    "Selection object must carry a string or numeric \"value\"",
                )),
            },
            other => Err(AppError::validation(format!(
                "Unrecognized selection entry: {other}"
            ))),
        }
    }

    /// Parse a list of raw JSON entries, failing on the first bad one.
    pub fn from_json_list(raw: &[Value]) -> Result<Vec<Self>> {
        raw.iter().map(Self::from_json).collect()
    }

    /// The panel value string for this node.
    pub fn value(&self) -> String {
        match self {
            SelectionNode::Campus => CAMPUS_VALUE.to_string(),
            SelectionNode::Region(region) => format!("{REGION_PREFIX}{region}"),
            SelectionNode::Building(id) => id.to_string(),
        }
    }
}

impl fmt::Display for SelectionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value())
    }
}

/// A selection entry in the panel's `{value, label}` shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabeledValue {
    pub value: String,
    pub label: String,
}

/// Node of the selection tree served to the panel.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeNode {
    pub title: String,
    pub value: String,
    pub selectable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Broadcast targets in the request form the orchestrator accepts.
///
/// At most one of the two lists is populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastTargets {
    pub regions: Vec<String>,
    pub building_ids: Vec<BuildingId>,
}

impl BroadcastTargets {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.building_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_values() {
        assert_eq!(SelectionNode::parse("region-all").unwrap(), SelectionNode::Campus);
        assert_eq!(SelectionNode::parse("region-ALL").unwrap(), SelectionNode::Campus);
        assert_eq!(
            SelectionNode::parse("region-North").unwrap(),
            SelectionNode::Region(Region::North)
        );
        assert_eq!(SelectionNode::parse("12").unwrap(), SelectionNode::Building(12));
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert!(SelectionNode::parse("region-East").is_err());
        assert!(SelectionNode::parse("41").is_err());
        assert!(SelectionNode::parse("-1").is_err());
        assert!(SelectionNode::parse("Baker Hall").is_err());
    }

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(
            SelectionNode::from_json(&json!("region-South")).unwrap(),
            SelectionNode::Region(Region::South)
        );
        assert_eq!(
            SelectionNode::from_json(&json!(7)).unwrap(),
            SelectionNode::Building(7)
        );
        assert_eq!(
            SelectionNode::from_json(&json!({"value": "3", "label": "Building C"})).unwrap(),
            SelectionNode::Building(3)
        );
        assert_eq!(
            SelectionNode::from_json(&json!({"value": 4})).unwrap(),
            SelectionNode::Building(4)
        );
    }

    #[test]
    fn test_from_json_rejects_unrecognized_shapes() {
        assert!(SelectionNode::from_json(&json!(true)).is_err());
        assert!(SelectionNode::from_json(&json!(["1"])).is_err());
        assert!(SelectionNode::from_json(&json!({"label": "North"})).is_err());
        assert!(SelectionNode::from_json(&json!({"value": {"value": "1"}})).is_err());
        assert!(SelectionNode::from_json(&json!(2.5)).is_err());
    }

    #[test]
    fn test_value_round_trips_through_parse() {
        for node in [
            SelectionNode::Campus,
            SelectionNode::Region(Region::West),
            SelectionNode::Building(0),
        ] {
            assert_eq!(SelectionNode::parse(&node.value()).unwrap(), node);
        }
    }
}
