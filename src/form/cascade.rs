//! Region to town cascade.
//!
//! The town select only offers towns of the selected region. Changing the
//! region recomputes the list; a previously chosen town that is not in the new
//! list stays in the values and is reported as orphaned. Rejecting the pair is
//! left to the schema's town/region rule at submit time.

use crate::domain::Town;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TownCascade {
    #[default]
    NoRegion,
    RegionSelected { region_id: i64, towns: Vec<Town> },
}

impl TownCascade {
    /// Starting state for the stored region. Without loaded towns there is
    /// nothing to show, so the cascade starts empty.
    pub fn new(initial_region: Option<i64>, all_towns: &[Town]) -> Self {
        match initial_region {
            Some(region_id) if !all_towns.is_empty() => Self::selected(region_id, all_towns),
            _ => Self::NoRegion,
        }
    }

    fn selected(region_id: i64, all_towns: &[Town]) -> Self {
        Self::RegionSelected {
            region_id,
            towns: towns_of(region_id, all_towns),
        }
    }

    pub fn select_region(&mut self, region: Option<i64>, all_towns: &[Town]) {
        *self = match region {
            Some(region_id) => Self::selected(region_id, all_towns),
            None => Self::NoRegion,
        };
    }

    pub fn selected_region(&self) -> Option<i64> {
        match self {
            Self::NoRegion => None,
            Self::RegionSelected { region_id, .. } => Some(*region_id),
        }
    }

    /// Towns offered by the town select.
    pub fn visible_towns(&self) -> &[Town] {
        match self {
            Self::NoRegion => &[],
            Self::RegionSelected { towns, .. } => towns,
        }
    }

    /// The chosen town is not among the offered towns.
    pub fn is_orphaned(&self, town: Option<i64>) -> bool {
        town.is_some_and(|id| !self.visible_towns().iter().any(|t| t.id == id))
    }
}

/// Towns whose region reference equals `region_id`, in source order.
pub fn towns_of(region_id: i64, all_towns: &[Town]) -> Vec<Town> {
    all_towns
        .iter()
        .filter(|town| town.region_id == region_id)
        .cloned()
        .collect()
}
