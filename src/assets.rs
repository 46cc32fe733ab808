// Asset catalog model
//
// An asset is addressed by its hierarchical key ("warehouse/raw/orders").
// Only assets with a definition carry the categorical fields the dashboard
// groups by: owners, compute kind, group, and the code location hosting it.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Repository name used when a code location exposes a single implicit repository.
pub const PLACEHOLDER_REPOSITORY_NAME: &str = "__repository__";

// ============================================================================
// ASSET KEY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(pub Vec<String>);

impl AssetKey {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AssetKey(path.into_iter().map(Into::into).collect())
    }

    /// Parse a user string such as `warehouse/raw/orders`.
    pub fn parse(input: &str) -> Result<Self> {
        let path: Vec<String> = input
            .split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if path.is_empty() {
            bail!("asset key must have at least one path segment: {:?}", input);
        }

        Ok(AssetKey(path))
    }

    pub fn path(&self) -> &[String] {
        &self.0
    }

    pub fn to_user_string(&self) -> String {
        self.0.join("/")
    }

    /// Each segment percent-encoded, joined with `/`.
    pub fn to_url_path(&self) -> String {
        self.0
            .iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_user_string())
    }
}

// ============================================================================
// OWNERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Owner {
    User { email: String },
    Team { team: String },
}

impl Owner {
    pub fn user(email: &str) -> Self {
        Owner::User {
            email: email.to_string(),
        }
    }

    pub fn team(team: &str) -> Self {
        Owner::Team {
            team: team.to_string(),
        }
    }

    /// Bucket key: email for users, team name for teams.
    pub fn identifier(&self) -> &str {
        match self {
            Owner::User { email } => email,
            Owner::Team { team } => team,
        }
    }
}

// ============================================================================
// CODE LOCATIONS & GROUPS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoAddress {
    pub name: String,
    pub location: String,
}

impl RepoAddress {
    pub fn new(name: &str, location: &str) -> Self {
        RepoAddress {
            name: name.to_string(),
            location: location.to_string(),
        }
    }

    /// `name@location`, or just `location` for the placeholder repository.
    pub fn to_human_string(&self) -> String {
        if self.name == PLACEHOLDER_REPOSITORY_NAME {
            self.location.clone()
        } else {
            format!("{}@{}", self.name, self.location)
        }
    }

    /// Human string percent-encoded as a single path component.
    pub fn to_path_string(&self) -> String {
        urlencoding::encode(&self.to_human_string()).into_owned()
    }

    /// Inverse of [`RepoAddress::to_path_string`], splitting at the first `@`.
    ///
    /// The human string is ambiguous when a placeholder repository's location
    /// contains `@`: such a location parses as a named repository. The human
    /// string still round-trips, which is what code-location filters compare.
    pub fn from_path_string(input: &str) -> Result<Self> {
        let decoded = urlencoding::decode(input)
            .with_context(|| format!("code location is not valid UTF-8: {:?}", input))?;

        // Repository names cannot contain '@'; location names may.
        let (name, location) = match decoded.split_once('@') {
            Some((name, location)) => (name, location),
            None => (PLACEHOLDER_REPOSITORY_NAME, &*decoded),
        };

        if name.is_empty() || location.is_empty() {
            bail!("malformed code location: {:?}", decoded);
        }

        Ok(RepoAddress::new(name, location))
    }
}

impl fmt::Display for RepoAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMetadata {
    pub group_name: String,
    pub repository_location_name: String,
    pub repository_name: String,
}

impl GroupMetadata {
    pub fn new(group_name: &str, repository: &RepoAddress) -> Self {
        GroupMetadata {
            group_name: group_name.to_string(),
            repository_location_name: repository.location.clone(),
            repository_name: repository.name.clone(),
        }
    }

    pub fn repo_address(&self) -> RepoAddress {
        RepoAddress::new(&self.repository_name, &self.repository_location_name)
    }
}

impl fmt::Display for GroupMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.group_name, self.repo_address())
    }
}

// ============================================================================
// ASSET RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDefinition {
    #[serde(default)]
    pub owners: Vec<Owner>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_kind: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    pub repository: RepoAddress,
}

impl AssetDefinition {
    /// Compute kind, treating an empty string as absent.
    pub fn compute_kind(&self) -> Option<&str> {
        self.compute_kind.as_deref().filter(|kind| !kind.is_empty())
    }

    /// Group name, treating an empty string as absent.
    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn group(&self) -> Option<GroupMetadata> {
        self.group_name()
            .map(|name| GroupMetadata::new(name, &self.repository))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub key: AssetKey,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<AssetDefinition>,
}

impl AssetRecord {
    pub fn new(key: AssetKey, definition: Option<AssetDefinition>) -> Self {
        AssetRecord { key, definition }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AssetFile {
    Bare(Vec<AssetRecord>),
    Wrapped { assets: Vec<AssetRecord> },
}

/// Parse a catalog export: either a bare array or `{ "assets": [...] }`.
pub fn parse_assets_json(json: &str) -> Result<Vec<AssetRecord>> {
    let file: AssetFile =
        serde_json::from_str(json).context("Failed to deserialize asset records")?;

    let records = match file {
        AssetFile::Bare(records) => records,
        AssetFile::Wrapped { assets } => assets,
    };

    if let Some(record) = records.iter().find(|r| r.key.path().is_empty()) {
        bail!("asset record with an empty key: {:?}", record);
    }

    Ok(records)
}

pub fn load_assets_json(path: &Path) -> Result<Vec<AssetRecord>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read asset file {}", path.display()))?;

    parse_assets_json(&json).with_context(|| format!("Invalid asset file {}", path.display()))
}
