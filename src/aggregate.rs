// Asset Count Aggregator - the counts behind every dashboard section
//
// One pass over the catalog buckets defined assets by owner, compute kind,
// asset group and code location, then sorts each bucket list for display.
// Pure function of its input: recomputed from scratch whenever the catalog changes.

use crate::assets::{AssetRecord, GroupMetadata, RepoAddress};
use crate::collation::{locale_compare, sort_by_locale};
use serde::Serialize;
use std::collections::HashMap;

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerCount {
    pub owner: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeKindCount {
    pub compute_kind: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: GroupMetadata,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeLocationCount {
    pub repo_address: RepoAddress,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetCounts {
    pub counts_by_owner: Vec<OwnerCount>,
    pub counts_by_compute_kind: Vec<ComputeKindCount>,
    pub count_per_asset_group: Vec<GroupCount>,
    pub count_per_code_location: Vec<CodeLocationCount>,
}

impl AssetCounts {
    pub fn is_empty(&self) -> bool {
        self.counts_by_owner.is_empty()
            && self.counts_by_compute_kind.is_empty()
            && self.count_per_asset_group.is_empty()
            && self.count_per_code_location.is_empty()
    }

    /// Number of defined assets (each lands in exactly one code location).
    pub fn defined_assets(&self) -> usize {
        self.count_per_code_location.iter().map(|c| c.count).sum()
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct AssetCountAggregator;

impl AssetCountAggregator {
    pub fn new() -> Self {
        AssetCountAggregator
    }

    pub fn aggregate(&self, records: &[AssetRecord]) -> AssetCounts {
        let mut by_owner: HashMap<&str, usize> = HashMap::new();
        let mut by_compute_kind: HashMap<&str, usize> = HashMap::new();
        let mut by_group: HashMap<GroupMetadata, usize> = HashMap::new();
        let mut by_code_location: HashMap<String, (RepoAddress, usize)> = HashMap::new();

        for definition in records.iter().filter_map(|r| r.definition.as_ref()) {
            for owner in &definition.owners {
                *by_owner.entry(owner.identifier()).or_insert(0) += 1;
            }

            if let Some(kind) = definition.compute_kind() {
                *by_compute_kind.entry(kind).or_insert(0) += 1;
            }

            if let Some(group) = definition.group() {
                *by_group.entry(group).or_insert(0) += 1;
            }

            let repo = &definition.repository;
            by_code_location
                .entry(repo.to_human_string())
                .or_insert_with(|| (repo.clone(), 0))
                .1 += 1;
        }

        let mut counts_by_owner: Vec<OwnerCount> = by_owner
            .into_iter()
            .map(|(owner, count)| OwnerCount {
                owner: owner.to_string(),
                count,
            })
            .collect();
        sort_by_locale(&mut counts_by_owner, |c| c.owner.as_str());

        let mut counts_by_compute_kind: Vec<ComputeKindCount> = by_compute_kind
            .into_iter()
            .map(|(kind, count)| ComputeKindCount {
                compute_kind: kind.to_string(),
                count,
            })
            .collect();
        sort_by_locale(&mut counts_by_compute_kind, |c| c.compute_kind.as_str());

        let mut count_per_asset_group: Vec<GroupCount> = by_group
            .into_iter()
            .map(|(group, count)| GroupCount { group, count })
            .collect();
        count_per_asset_group.sort_by(|a, b| {
            let a_repo = a.group.repo_address().to_human_string();
            let b_repo = b.group.repo_address().to_human_string();
            locale_compare(&a_repo, &b_repo)
                .then_with(|| locale_compare(&a.group.group_name, &b.group.group_name))
                .then_with(|| a.group.cmp(&b.group))
        });

        let mut keyed_locations: Vec<(String, CodeLocationCount)> = by_code_location
            .into_iter()
            .map(|(human, (repo_address, count))| (human, CodeLocationCount { repo_address, count }))
            .collect();
        sort_by_locale(&mut keyed_locations, |(human, _)| human.as_str());
        let count_per_code_location = keyed_locations.into_iter().map(|(_, c)| c).collect();

        AssetCounts {
            counts_by_owner,
            counts_by_compute_kind,
            count_per_asset_group,
            count_per_code_location,
        }
    }
}
