// Deep links from dashboard counts into filtered catalog views
//
// Every link targets the catalog route with exactly one filter parameter.
// `filters::AssetFilter::from_query` is the inverse.

use crate::assets::{AssetKey, GroupMetadata, RepoAddress};
use anyhow::{Context, Result};

pub const CATALOG_ROUTE: &str = "/assets";

pub const OWNER_PARAM: &str = "owner";
pub const COMPUTE_KIND_PARAM: &str = "computeKind";
pub const GROUP_PARAM: &str = "group";
pub const CODE_LOCATION_PARAM: &str = "codeLocation";
pub const SEARCH_PARAM: &str = "q";

pub fn owner_link(owner: &str) -> String {
    query_link(OWNER_PARAM, &urlencoding::encode(owner))
}

pub fn compute_kind_link(compute_kind: &str) -> String {
    query_link(COMPUTE_KIND_PARAM, &urlencoding::encode(compute_kind))
}

pub fn group_link(group: &GroupMetadata) -> Result<String> {
    let json = serde_json::to_string(group).context("Failed to encode group metadata")?;
    Ok(query_link(GROUP_PARAM, &urlencoding::encode(&json)))
}

/// The code location is already percent-encoded as a path component.
pub fn code_location_link(repo_address: &RepoAddress) -> String {
    query_link(CODE_LOCATION_PARAM, &repo_address.to_path_string())
}

pub fn search_link(query: &str) -> String {
    query_link(SEARCH_PARAM, &urlencoding::encode(query))
}

pub fn asset_link(key: &AssetKey) -> String {
    format!("{}/{}", CATALOG_ROUTE, key.to_url_path())
}

fn query_link(param: &str, encoded_value: &str) -> String {
    format!("{}?{}={}", CATALOG_ROUTE, param, encoded_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_compute_kind_links() {
        assert_eq!(owner_link("a@x.com"), "/assets?owner=a%40x.com");
        assert_eq!(owner_link("data eng"), "/assets?owner=data%20eng");
        assert_eq!(compute_kind_link("pandas"), "/assets?computeKind=pandas");
    }

    #[test]
    fn test_group_link_embeds_json() {
        let group = GroupMetadata::new("g1", &RepoAddress::new("R", "L"));
        let link = group_link(&group).unwrap();

        let encoded = link.strip_prefix("/assets?group=").unwrap();
        let json = urlencoding::decode(encoded).unwrap();
        assert_eq!(
            json,
            r#"{"groupName":"g1","repositoryLocationName":"L","repositoryName":"R"}"#
        );
    }

    #[test]
    fn test_code_location_link() {
        let repo = RepoAddress::new("R", "L");
        assert_eq!(code_location_link(&repo), "/assets?codeLocation=R%40L");
    }

    #[test]
    fn test_asset_link() {
        let key = AssetKey::new(["warehouse", "daily orders"]);
        assert_eq!(asset_link(&key), "/assets/warehouse/daily%20orders");
        assert_eq!(search_link("orders"), "/assets?q=orders");
    }
}
