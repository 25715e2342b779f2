//! Persisted CSV artifacts.
//!
//! All tables are `;`-delimited with a UTF-8 BOM so spreadsheet tools open
//! them cleanly, and long numeric values (guild ids, tokens) carry a leading
//! apostrophe to stay literal text instead of being reinterpreted as
//! numbers.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};

use crate::api::Guild;
use crate::catalog::GuildCatalog;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Paths of the persisted artifacts for one run.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    dir: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create output directory {}", self.dir.display()))
    }

    /// Combined guild catalog accumulated across runs.
    pub fn combined_catalog(&self) -> PathBuf {
        self.dir.join("guilds_all.csv")
    }

    pub fn account_listing(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("guilds_{identifier}.csv"))
    }

    pub fn valid_tokens(&self) -> PathBuf {
        self.dir.join("valid_tokens.csv")
    }

    pub fn invalid_tokens(&self) -> PathBuf {
        self.dir.join("invalid_tokens.csv")
    }
}

/// Apostrophe prefix that keeps a value literal in spreadsheets.
fn text_safe(value: &str) -> String {
    format!("'{value}")
}

fn strip_text_safe(value: &str) -> &str {
    value.trim().trim_start_matches('\'')
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>> {
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)?;
    Ok(WriterBuilder::new().delimiter(b';').from_writer(file))
}

/// One account's guild listing: row number, name, text-safe id.
pub fn write_account_listing(path: &Path, guilds: &[Guild]) -> Result<()> {
    let mut writer = csv_writer(path)?;
    writer.write_record(["#", "Server Name", "Server ID"])?;
    for (i, guild) in guilds.iter().enumerate() {
        writer.write_record([&(i + 1).to_string(), &guild.name, &text_safe(&guild.id)])?;
    }
    writer.flush()?;
    Ok(())
}

/// The combined catalog, sorted by name case-insensitively.
pub fn write_combined_catalog(path: &Path, catalog: &GuildCatalog) -> Result<()> {
    let mut writer = csv_writer(path)?;
    writer.write_record(["#", "Server Name", "Server ID"])?;
    for (i, (id, name)) in catalog.sorted_by_name().into_iter().enumerate() {
        writer.write_record([&(i + 1).to_string(), &name, &text_safe(&id)])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a previously written combined catalog. Rows with an empty name or id
/// are skipped; a missing file yields an empty catalog.
pub fn read_combined_catalog(path: &Path) -> Result<GuildCatalog> {
    let mut catalog = GuildCatalog::new();
    if !path.exists() {
        return Ok(catalog);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read {}", path.display()))?;
        let name = record.get(1).map(str::trim).unwrap_or_default();
        let id = record.get(2).map(strip_text_safe).unwrap_or_default();
        if !name.is_empty() && !id.is_empty() {
            catalog.insert(id, name);
        }
    }
    Ok(catalog)
}

/// Token table: account id, text-safe token, status column.
pub fn write_token_report(path: &Path, rows: &[(u32, String)], status: &str) -> Result<()> {
    let mut writer = csv_writer(path)?;
    writer.write_record(["Account ID", "Token", "Status"])?;
    for (identifier, token) in rows {
        writer.write_record([&identifier.to_string(), &text_safe(token), &status.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn combined_catalog_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guilds_all.csv");

        let mut catalog = GuildCatalog::new();
        catalog.insert("1002684842196086876", "Caldera");
        catalog.insert("222", "alpha base");
        write_combined_catalog(&path, &catalog).unwrap();

        let loaded = read_combined_catalog(&path).unwrap();
        assert_eq!(loaded.name_of("1002684842196086876"), Some("Caldera"));
        assert_eq!(loaded.name_of("222"), Some("alpha base"));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn ids_are_apostrophe_prefixed_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listing.csv");

        let guilds = vec![Guild {
            id: "1002684842196086876".to_string(),
            name: "Caldera".to_string(),
        }];
        write_account_listing(&path, &guilds).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("'1002684842196086876"));
        assert!(raw.starts_with('\u{feff}'));
    }

    #[test]
    fn missing_catalog_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = read_combined_catalog(&dir.path().join("absent.csv")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn token_report_keeps_tokens_literal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invalid_tokens.csv");

        let rows = vec![(2, "MTA1token".to_string()), (7, "other".to_string())];
        write_token_report(&path, &rows, "Invalid").unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Account ID;Token;Status"));
        assert!(raw.contains("2;'MTA1token;Invalid"));
        assert!(raw.contains("7;'other;Invalid"));
    }
}
