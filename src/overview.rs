// Dashboard composition
//
// Turns catalog records plus visit history into the sections rendered by the
// terminal UI and the web server. Every count carries the deep link that
// opens the matching filtered catalog view.

use crate::aggregate::{AssetCountAggregator, AssetCounts};
use crate::assets::{AssetKey, AssetRecord};
use crate::greeting::greeting;
use crate::links;
use anyhow::Result;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Owners,
    ComputeKinds,
    AssetGroups,
    CodeLocations,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Owners,
        SectionKind::ComputeKinds,
        SectionKind::AssetGroups,
        SectionKind::CodeLocations,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Owners => "Owners",
            SectionKind::ComputeKinds => "Compute kinds",
            SectionKind::AssetGroups => "Asset groups",
            SectionKind::CodeLocations => "Code locations",
        }
    }

    /// Column name used by the CSV export.
    pub fn dimension(&self) -> &'static str {
        match self {
            SectionKind::Owners => "owner",
            SectionKind::ComputeKinds => "compute_kind",
            SectionKind::AssetGroups => "asset_group",
            SectionKind::CodeLocations => "code_location",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedCount {
    pub label: String,
    /// Secondary text, e.g. the code location an asset group lives in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub count: usize,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: &'static str,
    pub items: Vec<LinkedCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentAsset {
    pub key: AssetKey,
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub greeting: &'static str,
    pub total_assets: usize,
    pub search_href: String,
    pub recently_visited: Vec<RecentAsset>,
    pub sections: Vec<Section>,
}

impl Overview {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

/// Build the four count sections, in dashboard order.
pub fn build_sections(counts: &AssetCounts) -> Result<Vec<Section>> {
    let owners: Vec<LinkedCount> = counts
        .counts_by_owner
        .iter()
        .map(|c| LinkedCount {
            label: c.owner.clone(),
            caption: None,
            count: c.count,
            href: links::owner_link(&c.owner),
        })
        .collect();

    let compute_kinds: Vec<LinkedCount> = counts
        .counts_by_compute_kind
        .iter()
        .map(|c| LinkedCount {
            label: c.compute_kind.clone(),
            caption: None,
            count: c.count,
            href: links::compute_kind_link(&c.compute_kind),
        })
        .collect();

    let groups = counts
        .count_per_asset_group
        .iter()
        .map(|c| {
            Ok(LinkedCount {
                label: c.group.group_name.clone(),
                caption: Some(c.group.repo_address().to_human_string()),
                count: c.count,
                href: links::group_link(&c.group)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let code_locations: Vec<LinkedCount> = counts
        .count_per_code_location
        .iter()
        .map(|c| LinkedCount {
            label: c.repo_address.to_human_string(),
            caption: None,
            count: c.count,
            href: links::code_location_link(&c.repo_address),
        })
        .collect();

    Ok(SectionKind::ALL
        .into_iter()
        .zip([owners, compute_kinds, groups, code_locations])
        .map(|(kind, items)| Section {
            kind,
            title: kind.title(),
            items,
        })
        .collect())
}

/// Recently visited keys that are still in the catalog, capped at `limit`.
pub fn recently_visited(
    records: &[AssetRecord],
    recent_keys: &[AssetKey],
    limit: usize,
) -> Vec<RecentAsset> {
    let known: HashSet<&AssetKey> = records.iter().map(|r| &r.key).collect();

    recent_keys
        .iter()
        .filter(|key| known.contains(key))
        .take(limit)
        .map(|key| RecentAsset {
            key: key.clone(),
            label: key.to_user_string(),
            href: links::asset_link(key),
        })
        .collect()
}

pub fn build_overview<Tz: TimeZone>(
    records: &[AssetRecord],
    recent_keys: &[AssetKey],
    now: &DateTime<Tz>,
    recent_limit: usize,
) -> Result<Overview> {
    let counts = AssetCountAggregator::new().aggregate(records);

    Ok(Overview {
        greeting: greeting(now),
        total_assets: records.len(),
        search_href: links::CATALOG_ROUTE.to_string(),
        recently_visited: recently_visited(records, recent_keys, recent_limit),
        sections: build_sections(&counts)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetDefinition, Owner, RepoAddress};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn catalog() -> Vec<AssetRecord> {
        vec![
            AssetRecord::new(
                AssetKey::new(["A"]),
                Some(AssetDefinition {
                    owners: vec![Owner::user("a@x.com")],
                    compute_kind: Some("pandas".to_string()),
                    group_name: Some("g1".to_string()),
                    repository: RepoAddress::new("R", "L"),
                }),
            ),
            AssetRecord::new(
                AssetKey::new(["B"]),
                Some(AssetDefinition {
                    owners: vec![Owner::team("data")],
                    compute_kind: Some("pandas".to_string()),
                    group_name: None,
                    repository: RepoAddress::new("R", "L"),
                }),
            ),
            AssetRecord::new(AssetKey::new(["C"]), None),
        ]
    }

    #[test]
    fn test_overview_sections_carry_links() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap();
        let overview = build_overview(&catalog(), &[], &now, 10).unwrap();

        assert_eq!(overview.greeting, "Good afternoon");
        assert_eq!(overview.total_assets, 3);
        assert_eq!(overview.sections.len(), 4);

        let owners = overview.section(SectionKind::Owners).unwrap();
        assert_eq!(
            owners.items,
            vec![
                LinkedCount {
                    label: "a@x.com".to_string(),
                    caption: None,
                    count: 1,
                    href: "/assets?owner=a%40x.com".to_string(),
                },
                LinkedCount {
                    label: "data".to_string(),
                    caption: None,
                    count: 1,
                    href: "/assets?owner=data".to_string(),
                },
            ]
        );

        let groups = overview.section(SectionKind::AssetGroups).unwrap();
        assert_eq!(groups.items.len(), 1);
        assert_eq!(groups.items[0].label, "g1");
        assert_eq!(groups.items[0].caption.as_deref(), Some("R@L"));
        assert!(groups.items[0].href.starts_with("/assets?group="));

        let locations = overview.section(SectionKind::CodeLocations).unwrap();
        assert_eq!(locations.items[0].label, "R@L");
        assert_eq!(locations.items[0].count, 2);
        assert_eq!(locations.items[0].href, "/assets?codeLocation=R%40L");
    }

    #[test]
    fn test_recently_visited_skips_unknown_and_caps() {
        let recent = vec![
            AssetKey::new(["gone"]),
            AssetKey::new(["B"]),
            AssetKey::new(["A"]),
            AssetKey::new(["C"]),
        ];

        let visited = recently_visited(&catalog(), &recent, 2);
        let labels: Vec<&str> = visited.iter().map(|r| r.label.as_str()).collect();

        assert_eq!(labels, vec!["B", "A"]);
        assert_eq!(visited[0].href, "/assets/B");
    }

    #[test]
    fn test_empty_catalog_has_empty_sections() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let overview = build_overview(&[], &[], &now, 10).unwrap();

        assert_eq!(overview.total_assets, 0);
        assert!(overview.recently_visited.is_empty());
        assert!(overview.sections.iter().all(|s| s.items.is_empty()));
    }
}
