use crate::aggregate::AssetCounts;
use crate::overview::SectionKind;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct CountRow<'a> {
    dimension: &'static str,
    label: &'a str,
    location: Option<String>,
    count: usize,
}

/// Write every grouping as `dimension,label,location,count` rows, in display order.
///
/// `location` is only set for asset groups, whose names repeat across code locations.
pub fn write_counts_csv<W: Write>(counts: &AssetCounts, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for c in &counts.counts_by_owner {
        wtr.serialize(CountRow {
            dimension: SectionKind::Owners.dimension(),
            label: &c.owner,
            location: None,
            count: c.count,
        })?;
        rows += 1;
    }

    for c in &counts.counts_by_compute_kind {
        wtr.serialize(CountRow {
            dimension: SectionKind::ComputeKinds.dimension(),
            label: &c.compute_kind,
            location: None,
            count: c.count,
        })?;
        rows += 1;
    }

    for c in &counts.count_per_asset_group {
        wtr.serialize(CountRow {
            dimension: SectionKind::AssetGroups.dimension(),
            label: &c.group.group_name,
            location: Some(c.group.repo_address().to_human_string()),
            count: c.count,
        })?;
        rows += 1;
    }

    for c in &counts.count_per_code_location {
        let label = c.repo_address.to_human_string();
        wtr.serialize(CountRow {
            dimension: SectionKind::CodeLocations.dimension(),
            label: &label,
            location: None,
            count: c.count,
        })?;
        rows += 1;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(rows)
}

pub fn export_counts_csv(counts: &AssetCounts, path: &Path) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    write_counts_csv(counts, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{CodeLocationCount, ComputeKindCount, GroupCount, OwnerCount};
    use crate::assets::{GroupMetadata, RepoAddress, PLACEHOLDER_REPOSITORY_NAME};
    use pretty_assertions::assert_eq;

    fn sample_counts() -> AssetCounts {
        let repo = RepoAddress::new("R", "L");
        AssetCounts {
            counts_by_owner: vec![OwnerCount { owner: "a@x.com".to_string(), count: 1 }],
            counts_by_compute_kind: vec![ComputeKindCount {
                compute_kind: "pandas".to_string(),
                count: 2,
            }],
            count_per_asset_group: vec![GroupCount {
                group: GroupMetadata::new("g1", &repo),
                count: 1,
            }],
            count_per_code_location: vec![CodeLocationCount { repo_address: repo, count: 2 }],
        }
    }

    #[test]
    fn test_write_counts_csv() {
        let mut out = Vec::new();
        let rows = write_counts_csv(&sample_counts(), &mut out).unwrap();

        assert_eq!(rows, 4);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "dimension,label,location,count\n\
             owner,a@x.com,,1\n\
             compute_kind,pandas,,2\n\
             asset_group,g1,R@L,1\n\
             code_location,R@L,,2\n"
        );
    }

    #[test]
    fn test_placeholder_repository_exports_location_only() {
        let counts = AssetCounts {
            count_per_code_location: vec![CodeLocationCount {
                repo_address: RepoAddress::new(PLACEHOLDER_REPOSITORY_NAME, "etl"),
                count: 3,
            }],
            ..AssetCounts::default()
        };

        let mut out = Vec::new();
        write_counts_csv(&counts, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "dimension,label,location,count\ncode_location,etl,,3\n"
        );
    }

    #[test]
    fn test_export_empty_counts_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.csv");

        let rows = export_counts_csv(&AssetCounts::default(), &path).unwrap();

        assert_eq!(rows, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
