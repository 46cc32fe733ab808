// Asset Overview - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod aggregate;
pub mod assets;
pub mod collation;
pub mod config;
pub mod db;
pub mod export;
pub mod filters;
pub mod greeting;
pub mod links;
pub mod overview;

// Re-export commonly used types
pub use aggregate::{
    AssetCountAggregator, AssetCounts, CodeLocationCount, ComputeKindCount, GroupCount,
    OwnerCount,
};
pub use assets::{
    load_assets_json, parse_assets_json, AssetDefinition, AssetKey, AssetRecord, GroupMetadata,
    Owner, RepoAddress,
};
pub use config::Config;
pub use db::{
    get_all_assets, get_recent_visits, insert_assets, record_visit, setup_database,
    verify_count, ImportSummary, Visit,
};
pub use export::{export_counts_csv, write_counts_csv};
pub use filters::AssetFilter;
pub use overview::{build_overview, LinkedCount, Overview, RecentAsset, Section, SectionKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
