// Filtered catalog views - the landing side of dashboard deep links

use crate::assets::{AssetRecord, GroupMetadata, RepoAddress};
use crate::links::{
    CODE_LOCATION_PARAM, COMPUTE_KIND_PARAM, GROUP_PARAM, OWNER_PARAM, SEARCH_PARAM,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetFilter {
    pub owner: Option<String>,
    pub compute_kind: Option<String>,
    pub group: Option<GroupMetadata>,
    pub code_location: Option<RepoAddress>,
    pub search: Option<String>,
}

impl AssetFilter {
    /// Build a filter from already-decoded query parameters.
    ///
    /// Unknown parameters are ignored; empty values mean "no constraint".
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self> {
        let value = |name: &str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let group = match value(GROUP_PARAM) {
            Some(json) => Some(
                serde_json::from_str::<GroupMetadata>(&json)
                    .with_context(|| format!("Invalid group filter: {}", json))?,
            ),
            None => None,
        };

        // Query decoding already undid the percent-encoding, so re-encode
        // before handing the value to the path parser.
        let code_location = match value(CODE_LOCATION_PARAM) {
            Some(raw) => Some(
                RepoAddress::from_path_string(&urlencoding::encode(&raw))
                    .with_context(|| format!("Invalid code location filter: {}", raw))?,
            ),
            None => None,
        };

        Ok(AssetFilter {
            owner: value(OWNER_PARAM),
            compute_kind: value(COMPUTE_KIND_PARAM),
            group,
            code_location,
            search: value(SEARCH_PARAM),
        })
    }

    /// Build a filter from a deep link such as `/assets?owner=a%40x.com`.
    pub fn from_link(link: &str) -> Result<Self> {
        let query = link.split_once('?').map(|(_, q)| q).unwrap_or("");
        let mut params = HashMap::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value)
                .with_context(|| format!("Invalid query parameter in link: {}", link))?;
            params.insert(name.to_string(), value.into_owned());
        }

        Self::from_query(&params)
    }

    pub fn is_empty(&self) -> bool {
        *self == AssetFilter::default()
    }

    /// Short label for status bars and page titles.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(owner) = &self.owner {
            parts.push(format!("owner: {}", owner));
        }
        if let Some(kind) = &self.compute_kind {
            parts.push(format!("compute kind: {}", kind));
        }
        if let Some(group) = &self.group {
            parts.push(format!("group: {}", group));
        }
        if let Some(repo) = &self.code_location {
            parts.push(format!("code location: {}", repo));
        }
        if let Some(search) = &self.search {
            parts.push(format!("search: \"{}\"", search));
        }

        if parts.is_empty() {
            "all assets".to_string()
        } else {
            parts.join(", ")
        }
    }

    pub fn matches(&self, record: &AssetRecord) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !record.key.to_user_string().to_lowercase().contains(&needle) {
                return false;
            }
        }

        let needs_definition = self.owner.is_some()
            || self.compute_kind.is_some()
            || self.group.is_some()
            || self.code_location.is_some();

        let definition = match &record.definition {
            Some(def) => def,
            None => return !needs_definition,
        };

        if let Some(owner) = &self.owner {
            if !definition.owners.iter().any(|o| o.identifier() == owner) {
                return false;
            }
        }

        if let Some(kind) = &self.compute_kind {
            if definition.compute_kind() != Some(kind.as_str()) {
                return false;
            }
        }

        if let Some(group) = &self.group {
            if definition.group().as_ref() != Some(group) {
                return false;
            }
        }

        if let Some(repo) = &self.code_location {
            if definition.repository.to_human_string() != repo.to_human_string() {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, records: &'a [AssetRecord]) -> Vec<&'a AssetRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetDefinition, AssetKey, Owner, PLACEHOLDER_REPOSITORY_NAME};
    use crate::links;

    fn catalog() -> Vec<AssetRecord> {
        vec![
            AssetRecord::new(
                AssetKey::new(["warehouse", "orders"]),
                Some(AssetDefinition {
                    owners: vec![Owner::user("a@x.com")],
                    compute_kind: Some("pandas".to_string()),
                    group_name: Some("g1".to_string()),
                    repository: RepoAddress::new("R", "L"),
                }),
            ),
            AssetRecord::new(
                AssetKey::new(["warehouse", "customers"]),
                Some(AssetDefinition {
                    owners: vec![Owner::team("data")],
                    compute_kind: Some("dbt".to_string()),
                    group_name: None,
                    repository: RepoAddress::new("S", "M"),
                }),
            ),
            AssetRecord::new(AssetKey::new(["external", "orders_feed"]), None),
        ]
    }

    fn keys(records: Vec<&AssetRecord>) -> Vec<String> {
        records.iter().map(|r| r.key.to_user_string()).collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = AssetFilter::from_query(&HashMap::new()).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&catalog()).len(), 3);
        assert_eq!(filter.describe(), "all assets");
    }

    #[test]
    fn test_owner_link_round_trips_into_filter() {
        let filter = AssetFilter::from_link(&links::owner_link("a@x.com")).unwrap();
        assert_eq!(filter.owner.as_deref(), Some("a@x.com"));
        assert_eq!(keys(filter.apply(&catalog())), vec!["warehouse/orders"]);
    }

    #[test]
    fn test_group_link_round_trips_into_filter() {
        let group = GroupMetadata::new("g1", &RepoAddress::new("R", "L"));
        let link = links::group_link(&group).unwrap();

        let filter = AssetFilter::from_link(&link).unwrap();
        assert_eq!(filter.group, Some(group));
        assert_eq!(keys(filter.apply(&catalog())), vec!["warehouse/orders"]);
    }

    #[test]
    fn test_code_location_link_round_trips_into_filter() {
        let link = links::code_location_link(&RepoAddress::new("S", "M"));

        let filter = AssetFilter::from_link(&link).unwrap();
        assert_eq!(filter.code_location, Some(RepoAddress::new("S", "M")));
        assert_eq!(keys(filter.apply(&catalog())), vec!["warehouse/customers"]);
    }

    #[test]
    fn test_code_location_filter_on_placeholder_location_with_at_sign() {
        let repo = RepoAddress::new(PLACEHOLDER_REPOSITORY_NAME, "etl@east");
        let records = vec![AssetRecord::new(
            AssetKey::new(["ingest"]),
            Some(AssetDefinition {
                owners: vec![],
                compute_kind: None,
                group_name: None,
                repository: repo.clone(),
            }),
        )];

        let filter = AssetFilter::from_link(&links::code_location_link(&repo)).unwrap();
        assert_eq!(keys(filter.apply(&records)), vec!["ingest"]);
    }

    #[test]
    fn test_search_includes_undefined_assets() {
        let mut params = HashMap::new();
        params.insert("q".to_string(), "ORDERS".to_string());

        let filter = AssetFilter::from_query(&params).unwrap();
        assert_eq!(
            keys(filter.apply(&catalog())),
            vec!["warehouse/orders", "external/orders_feed"]
        );
    }

    #[test]
    fn test_combined_filters_intersect() {
        let mut params = HashMap::new();
        params.insert("computeKind".to_string(), "dbt".to_string());
        params.insert("q".to_string(), "orders".to_string());

        let filter = AssetFilter::from_query(&params).unwrap();
        assert!(filter.apply(&catalog()).is_empty());
        assert_eq!(filter.describe(), "compute kind: dbt, search: \"orders\"");
    }

    #[test]
    fn test_catalog_route_without_query_is_unfiltered() {
        assert!(AssetFilter::from_link("/assets").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_group_is_rejected() {
        let mut params = HashMap::new();
        params.insert("group".to_string(), "{not json".to_string());

        assert!(AssetFilter::from_query(&params).is_err());
    }
}
