//! Line-oriented data-file loading and scaffolding.
//!
//! Account identifiers, tokens, user agents, and proxies each live in their
//! own flat file under `data/`, aligned line by line. Blank lines and
//! '#'-prefixed comments are filtered out; the surviving lines are numbered
//! from `start_line` and that number becomes the profile identifier.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::profile::Profile;

const LEAVE_LIST_TEMPLATE: &str = "\
# Enter guild names, IDs or numbers to leave, one per line
# You can use guild names or IDs
# Example:
# My Server
# 1002684842196086876
";

/// Paths of the flat input files for one run.
#[derive(Debug, Clone)]
pub struct DataFiles {
    dir: PathBuf,
}

impl DataFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn account_indexes(&self) -> PathBuf {
        self.dir.join("account_indexes.txt")
    }

    pub fn tokens(&self) -> PathBuf {
        self.dir.join("ds_tokens.txt")
    }

    pub fn user_agents(&self) -> PathBuf {
        self.dir.join("user_agents.txt")
    }

    pub fn proxies(&self) -> PathBuf {
        self.dir.join("proxies.txt")
    }

    pub fn leave_list(&self) -> PathBuf {
        self.dir.join("guilds_leave.txt")
    }

    fn required(&self) -> [(PathBuf, &'static str); 4] {
        [
            (
                self.account_indexes(),
                "# Account identifiers - one per line\n# Example:\n# 1\n# 2\n# 3\n",
            ),
            (
                self.tokens(),
                "# Discord tokens - one per line\n# Example:\n# MTA1NTU2Nzg5...\n",
            ),
            (
                self.user_agents(),
                "# User agents - one per line\n# Example:\n# Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36\n",
            ),
            (
                self.proxies(),
                "# Proxies - one per line\n# Format: ip:port:username:password\n# Example:\n# 192.168.1.1:8080:user:pass\n",
            ),
        ]
    }

    /// Check that every required input file exists. Missing files are created
    /// with commented example content; returns false so the caller can tell
    /// the user to fill them in and abort the run.
    pub fn ensure_required(&self) -> Result<bool> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create data directory {}", self.dir.display()))?;

        let missing: Vec<_> = self
            .required()
            .into_iter()
            .filter(|(path, _)| !path.exists())
            .collect();
        if missing.is_empty() {
            return Ok(true);
        }

        error!("Missing required data files:");
        for (path, _) in &missing {
            error!("  - {}", path.display());
        }
        info!("Creating example files...");
        for (path, template) in &missing {
            fs::write(path, template)
                .with_context(|| format!("failed to create example file {}", path.display()))?;
        }
        info!("Example files created. Please fill them with your data and run again.");
        Ok(false)
    }

    /// Create the leave-list file with a commented template when absent.
    pub fn scaffold_leave_list(&self) -> Result<()> {
        let path = self.leave_list();
        if path.exists() {
            return Ok(());
        }
        fs::write(&path, LEAVE_LIST_TEMPLATE)
            .with_context(|| format!("failed to create leave list {}", path.display()))?;
        info!("Created leave list file: {}", path.display());
        Ok(())
    }
}

/// Load lines `start_line..=end_line` (1-indexed over the raw file), trimmed,
/// with blank lines and '#' comments removed. A missing file yields an empty
/// list rather than an error.
pub fn load_lines(path: &Path, start_line: usize, end_line: usize) -> Vec<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };

    content
        .lines()
        .skip(start_line.saturating_sub(1))
        .take(end_line.saturating_sub(start_line.saturating_sub(1)))
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Number surviving lines from `start_line` upward, producing the
/// identifier → value map the profile builder aligns across files.
pub fn indexed(lines: Vec<String>, start_line: usize) -> HashMap<String, String> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| ((i + start_line).to_string(), line))
        .collect()
}

/// Load all input files and assemble the selected profiles in processing
/// order. Profiles with a missing token are logged and dropped.
pub fn build_profiles(settings: &Settings, files: &DataFiles) -> Result<Vec<Profile>> {
    let sources = [
        ("account_indexes", files.account_indexes()),
        ("ds_tokens", files.tokens()),
        ("user_agents", files.user_agents()),
        ("proxies", files.proxies()),
    ];

    let mut data = HashMap::new();
    for (key, path) in sources {
        let lines = load_lines(&path, settings.start_line, settings.end_line);
        if lines.is_empty() {
            anyhow::bail!("required file {key} is empty or not found: {}", path.display());
        }
        info!("Loaded {} lines from {key} ({})", lines.len(), path.display());
        data.insert(key, indexed(lines, settings.start_line));
    }

    let mut identifiers: Vec<String> = data["account_indexes"].keys().cloned().collect();
    identifiers.sort_by_key(|id| id.parse::<u32>().unwrap_or(0));
    identifiers.retain(|id| settings.profile_selected(id.parse().unwrap_or(0)));

    if settings.random_start {
        identifiers.shuffle(&mut rand::rng());
    }

    let mut profiles = Vec::with_capacity(identifiers.len());
    for id in identifiers {
        let token = data["ds_tokens"].get(&id).cloned().unwrap_or_default();
        let user_agent = data["user_agents"].get(&id).cloned().unwrap_or_default();
        let proxy = data["proxies"].get(&id).cloned().unwrap_or_default();
        match Profile::new(&id, token, user_agent, proxy) {
            Ok(profile) => profiles.push(profile),
            Err(e) => warn!("Skipping profile: {e}"),
        }
    }

    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn load_lines_filters_comments_and_blanks() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "values.txt", "# header\n\none\ntwo\n# tail\nthree\n");

        let lines = load_lines(&dir.path().join("values.txt"), 1, 9999);
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn load_lines_respects_line_range() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "values.txt", "a\nb\nc\nd\ne\n");

        assert_eq!(load_lines(&dir.path().join("values.txt"), 2, 4), vec!["b", "c", "d"]);
        assert_eq!(
            load_lines(&dir.path().join("values.txt"), 1, 9999),
            vec!["a", "b", "c", "d", "e"]
        );
    }

    #[test]
    fn load_lines_missing_file_is_empty() {
        assert!(load_lines(Path::new("/nonexistent/values.txt"), 1, 10).is_empty());
    }

    #[test]
    fn indexed_numbers_from_start_line() {
        let map = indexed(vec!["x".into(), "y".into()], 5);
        assert_eq!(map["5"], "x");
        assert_eq!(map["6"], "y");
    }

    #[test]
    fn ensure_required_scaffolds_missing_files() {
        let dir = TempDir::new().unwrap();
        let files = DataFiles::new(dir.path().join("data"));

        assert!(!files.ensure_required().unwrap());
        assert!(files.tokens().exists());
        // Scaffolded files hold only comments, so a second check still fails
        // the "fill them in" gate at profile build time, not here.
        assert!(files.ensure_required().unwrap());
    }

    #[test]
    fn build_profiles_aligns_and_filters() {
        let dir = TempDir::new().unwrap();
        let files = DataFiles::new(dir.path());
        write_file(dir.path(), "account_indexes.txt", "acc-a\nacc-b\nacc-c\n");
        write_file(dir.path(), "ds_tokens.txt", "tok1\ntok2\ntok3\n");
        write_file(dir.path(), "user_agents.txt", "ua1\nua2\nua3\n");
        write_file(dir.path(), "proxies.txt", "1.2.3.4:80\n\n# none\n");

        let settings = Settings::default();
        let profiles = build_profiles(&settings, &files).unwrap();

        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].identifier, "1");
        assert_eq!(profiles[0].token, "tok1");
        assert_eq!(profiles[0].proxy, "1.2.3.4:80");
        // Comment and blank lines are filtered before numbering, so only the
        // first proxy line exists and later profiles run direct.
        assert_eq!(profiles[1].proxy, "");
    }

    #[test]
    fn build_profiles_applies_skip_filter() {
        let dir = TempDir::new().unwrap();
        let files = DataFiles::new(dir.path());
        write_file(dir.path(), "account_indexes.txt", "a\nb\n");
        write_file(dir.path(), "ds_tokens.txt", "tok1\ntok2\n");
        write_file(dir.path(), "user_agents.txt", "ua\nua\n");
        write_file(dir.path(), "proxies.txt", "p:1\np:2\n");

        let settings = Settings {
            skip_profiles: vec![2],
            ..Settings::default()
        };
        let profiles = build_profiles(&settings, &files).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].identifier, "1");
    }
}
