// src/services/selection.rs

//! Selection reconciler.
//!
//! Two independent operations over the campus → region → building tree:
//! - [`SelectionTree::canonicalize`] collapses a raw, possibly redundant
//!   selection into its minimal form
//! - [`expand_targets`] turns broadcast targets (regions or building ids) into
//!   concrete building ids

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{
    BroadcastTargets, BuildingDirectory, BuildingId, LabeledValue, Region, SelectionNode,
    TreeNode, is_valid_building_id,
};

const CAMPUS_TITLE: &str = "Campuswide";

/// Hierarchy derived from the building directory.
#[derive(Debug, Clone)]
pub struct SelectionTree {
    /// Regions in directory order, each with its buildings
    regions: Vec<(Region, Vec<BuildingId>)>,
    root: TreeNode,
}

impl SelectionTree {
    pub fn from_directory(directory: &BuildingDirectory) -> Self {
        let regions: Vec<_> = directory
            .regions()
            .into_iter()
            .map(|region| (region, directory.in_region(region)))
            .collect();

        let children = regions
            .iter()
            .map(|(region, ids)| TreeNode {
                title: format!("{region} Campus"),
                value: SelectionNode::Region(*region).value(),
                selectable: true,
                children: ids
                    .iter()
                    .map(|id| TreeNode {
                        title: directory.name_of(*id).to_string(),
                        value: SelectionNode::Building(*id).value(),
                        selectable: true,
                        children: Vec::new(),
                    })
                    .collect(),
            })
            .collect();

        let root = TreeNode {
            title: CAMPUS_TITLE.to_string(),
            value: SelectionNode::Campus.value(),
            selectable: true,
            children,
        };

        Self { regions, root }
    }

    /// Serializable root node.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.regions.iter().map(|(region, _)| *region)
    }

    pub fn buildings_in(&self, region: Region) -> &[BuildingId] {
        self.regions
            .iter()
            .find(|(r, _)| *r == region)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn region_of(&self, id: BuildingId) -> Option<Region> {
        self.regions
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(region, _)| *region)
    }

    /// Collapse a raw selection into its canonical form.
    ///
    /// Campus-wide wins outright; regions absorb their buildings; a region
    /// whose buildings are all selected individually is promoted to the
    /// region; every region selected promotes to campus-wide. Regions come
    /// before standalone buildings in the output.
    pub fn canonicalize(&self, raw: &[SelectionNode]) -> CanonicalSelection {
        if raw.contains(&SelectionNode::Campus) || self.all_regions_in(raw.iter().copied()) {
            return CanonicalSelection::campus();
        }

        let mut regions: Vec<Region> = Vec::new();
        for node in raw {
            if let SelectionNode::Region(region) = node {
                if !regions.contains(region) {
                    regions.push(*region);
                }
            }
        }

        let mut buildings: Vec<BuildingId> = Vec::new();
        for node in raw {
            if let SelectionNode::Building(id) = node {
                let absorbed = self
                    .region_of(*id)
                    .is_some_and(|region| regions.contains(&region));
                if !absorbed && !buildings.contains(id) {
                    buildings.push(*id);
                }
            }
        }

        for (region, ids) in &self.regions {
            if regions.contains(region) || ids.is_empty() {
                continue;
            }
            if ids.iter().all(|id| buildings.contains(id)) {
                buildings.retain(|id| !ids.contains(id));
                regions.push(*region);
            }
        }

        if self.all_regions_in(regions.iter().map(|r| SelectionNode::Region(*r))) {
            return CanonicalSelection::campus();
        }

        let nodes = regions
            .into_iter()
            .map(SelectionNode::Region)
            .chain(buildings.into_iter().map(SelectionNode::Building))
            .collect();
        CanonicalSelection { nodes }
    }

    fn all_regions_in(&self, nodes: impl Iterator<Item = SelectionNode>) -> bool {
        if self.regions.is_empty() {
            return false;
        }
        let present: HashSet<SelectionNode> = nodes.collect();
        self.regions
            .iter()
            .all(|(region, _)| present.contains(&SelectionNode::Region(*region)))
    }
}

/// Minimal, redundancy-free selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSelection {
    nodes: Vec<SelectionNode>,
}

impl CanonicalSelection {
    fn campus() -> Self {
        Self {
            nodes: vec![SelectionNode::Campus],
        }
    }

    pub fn nodes(&self) -> &[SelectionNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_campus(&self) -> bool {
        self.nodes == [SelectionNode::Campus]
    }

    /// Nodes in the panel's `{value, label}` shape.
    pub fn labeled(&self, directory: &BuildingDirectory) -> Vec<LabeledValue> {
        self.nodes
            .iter()
            .map(|node| LabeledValue {
                value: node.value(),
                label: match node {
                    SelectionNode::Campus => CAMPUS_TITLE.to_string(),
                    SelectionNode::Region(region) => format!("{region} Campus"),
                    SelectionNode::Building(id) => directory.name_of(*id).to_string(),
                },
            })
            .collect()
    }

    /// Broadcast targets for this selection.
    ///
    /// Campus-wide becomes `regions = ["all"]`, a regions-only selection
    /// becomes region names, and anything with buildings becomes explicit
    /// building ids with selected regions expanded.
    pub fn to_targets(&self, tree: &SelectionTree) -> BroadcastTargets {
        if self.is_campus() {
            return BroadcastTargets {
                regions: vec!["all".to_string()],
                building_ids: Vec::new(),
            };
        }

        let has_buildings = self
            .nodes
            .iter()
            .any(|node| matches!(node, SelectionNode::Building(_)));
        if !has_buildings {
            return BroadcastTargets {
                regions: self
                    .nodes
                    .iter()
                    .filter_map(|node| match node {
                        SelectionNode::Region(region) => Some(region.to_string()),
                        _ => None,
                    })
                    .collect(),
                building_ids: Vec::new(),
            };
        }

        let mut building_ids = Vec::new();
        for node in &self.nodes {
            let ids: &[BuildingId] = match node {
                SelectionNode::Region(region) => tree.buildings_in(*region),
                SelectionNode::Building(id) => std::slice::from_ref(id),
                SelectionNode::Campus => &[],
            };
            for id in ids {
                if !building_ids.contains(id) {
                    building_ids.push(*id);
                }
            }
        }
        BroadcastTargets {
            regions: Vec::new(),
            building_ids,
        }
    }
}

/// Resolve broadcast targets to building ids.
///
/// Explicit building ids win when present and are returned as given (minus
/// duplicates); any id outside the accepted range rejects the whole request.
/// Otherwise regions are matched case-insensitively, with `all` meaning every
/// building in the directory.
pub fn expand_targets(
    directory: &BuildingDirectory,
    regions: &[String],
    building_ids: &[i64],
) -> Result<Vec<BuildingId>> {
    if !building_ids.is_empty() {
        if let Some(bad) = building_ids.iter().find(|id| !is_valid_building_id(**id)) {
            return Err(AppError::validation(format!("Invalid building_id: {bad}")));
        }
        let mut ids: Vec<BuildingId> = Vec::with_capacity(building_ids.len());
        for id in building_ids {
            let id = *id as BuildingId;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        return Ok(ids);
    }

    if regions.is_empty() {
        return Err(AppError::validation("Missing building_ids or regions"));
    }

    let mut wanted: HashSet<Region> = HashSet::new();
    let mut everything = false;
    for raw in regions {
        let name = raw.trim();
        if name.eq_ignore_ascii_case("all") {
            everything = true;
        } else {
            let region = Region::parse(name)
                .ok_or_else(|| AppError::validation(format!("Invalid region: {raw}")))?;
            wanted.insert(region);
        }
    }

    if everything {
        return Ok(directory.ids());
    }

    let ids: Vec<BuildingId> = directory
        .all()
        .iter()
        .filter(|b| wanted.contains(&b.region))
        .map(|b| b.id)
        .collect();

    if ids.is_empty() {
        return Err(AppError::validation(format!(
            "No buildings found in regions: {}",
            regions.join(", ")
        )));
    }
    Ok(ids)
}
