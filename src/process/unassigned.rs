use std::collections::HashMap;

use super::{Region, UNASSIGNED};

/// Per-state sums of "Unassigned" rows, kept in first-seen order.
#[derive(Debug, Default)]
pub struct UnassignedAccumulator {
    index: HashMap<String, usize>,
    regions: Vec<Region>,
}

impl UnassignedAccumulator {
    pub fn add(&mut self, state: &str, cases: u64, deaths: u64) {
        match self.index.get(state) {
            Some(&i) => {
                let region = &mut self.regions[i];
                region.cases = region.cases.saturating_add(cases);
                region.deaths = region.deaths.saturating_add(deaths);
            }
            None => {
                self.index.insert(state.to_string(), self.regions.len());
                self.regions.push(Region {
                    cases,
                    deaths,
                    county: UNASSIGNED.to_string(),
                    state: state.to_string(),
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }
}
