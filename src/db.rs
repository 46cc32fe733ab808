use crate::assets::{AssetDefinition, AssetKey, AssetRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

/// Outcome of an import: new assets vs. definitions refreshed in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// A visit to an asset page, most recent per asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub key: AssetKey,
    pub visited_at: DateTime<Utc>,
}

/// Stable identity of an asset row: SHA-256 over the key's JSON form.
pub fn compute_key_hash(key: &AssetKey) -> Result<String> {
    let key_json = serde_json::to_string(key)?;
    let mut hasher = Sha256::new();
    hasher.update(key_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Assets Table (definition stored as JSON, NULL when undefined)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key_hash TEXT UNIQUE NOT NULL,
            asset_key TEXT NOT NULL,
            definition TEXT,
            updated_at TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Visits Table (recently visited assets)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS visits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key_hash TEXT NOT NULL,
            asset_key TEXT NOT NULL,
            visited_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_visits_key ON visits(key_hash, visited_at)",
        [],
    )?;

    Ok(())
}

/// Upsert asset records by key. Re-importing the same catalog is a no-op
/// apart from refreshed definitions and timestamps.
pub fn insert_assets(conn: &Connection, records: &[AssetRecord]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let now = Utc::now().to_rfc3339();

    for record in records {
        let hash = compute_key_hash(&record.key)?;
        let key_json = serde_json::to_string(&record.key)?;
        let definition_json = record
            .definition
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM assets WHERE key_hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE assets SET definition = ?1, updated_at = ?2 WHERE id = ?3",
                    params![definition_json, now, id],
                )?;
                summary.updated += 1;
            }
            None => {
                conn.execute(
                    "INSERT INTO assets (key_hash, asset_key, definition, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![hash, key_json, definition_json, now],
                )?;
                summary.inserted += 1;
            }
        }
    }

    tracing::info!(
        inserted = summary.inserted,
        updated = summary.updated,
        "imported asset records"
    );

    Ok(summary)
}

pub fn get_all_assets(conn: &Connection) -> Result<Vec<AssetRecord>> {
    let mut stmt = conn.prepare("SELECT asset_key, definition FROM assets ORDER BY id")?;

    let rows = stmt
        .query_map([], |row| {
            let key_json: String = row.get(0)?;
            let definition_json: Option<String> = row.get(1)?;
            Ok((key_json, definition_json))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(key_json, definition_json)| {
            let key: AssetKey = serde_json::from_str(&key_json)
                .with_context(|| format!("Corrupt asset key in store: {}", key_json))?;
            let definition = definition_json
                .map(|json| serde_json::from_str::<AssetDefinition>(&json))
                .transpose()
                .with_context(|| format!("Corrupt definition for asset {}", key))?;
            Ok(AssetRecord { key, definition })
        })
        .collect()
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
    Ok(count)
}

pub fn record_visit(conn: &Connection, key: &AssetKey) -> Result<()> {
    record_visit_at(conn, key, Utc::now())
}

pub fn record_visit_at(conn: &Connection, key: &AssetKey, visited_at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO visits (key_hash, asset_key, visited_at) VALUES (?1, ?2, ?3)",
        params![
            compute_key_hash(key)?,
            serde_json::to_string(key)?,
            visited_at.to_rfc3339()
        ],
    )?;

    tracing::debug!(asset = %key, "recorded visit");
    Ok(())
}

/// Most recently visited assets still in the catalog, newest first, one entry per asset.
pub fn get_recent_visits(conn: &Connection, limit: usize) -> Result<Vec<Visit>> {
    // Join before LIMIT so visits to removed assets never take a slot.
    let mut stmt = conn.prepare(
        "SELECT v.asset_key, MAX(v.visited_at) AS last_visit
         FROM visits v
         JOIN assets a ON a.key_hash = v.key_hash
         GROUP BY v.key_hash
         ORDER BY last_visit DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            let key_json: String = row.get(0)?;
            let visited_at: String = row.get(1)?;
            Ok((key_json, visited_at))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(key_json, visited_at)| {
            Ok(Visit {
                key: serde_json::from_str(&key_json)
                    .with_context(|| format!("Corrupt asset key in visits: {}", key_json))?,
                visited_at: DateTime::parse_from_rfc3339(&visited_at)
                    .with_context(|| format!("Corrupt visit timestamp: {}", visited_at))?
                    .with_timezone(&Utc),
            })
        })
        .collect()
}
