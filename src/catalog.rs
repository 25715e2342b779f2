//! Accumulated guild catalog and leave-target resolution.
//!
//! The catalog maps guild id to display name, deduplicated by id with the
//! last writer winning the name. It is filled from the combined CSV listing
//! and from live enumeration, and consulted to turn user-supplied leave
//! entries (ids or names) into concrete targets.

use std::collections::BTreeMap;

use crate::api::Guild;

/// A raw id entry must be longer than this to be taken as a literal guild
/// id; shorter digit strings are treated as names.
const MIN_LITERAL_ID_LEN: usize = 15;

/// A resolved (name, id) pair ready for a leave operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveTarget {
    pub name: String,
    pub id: String,
}

/// How a leave-list entry resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The entry was a long numeric string, used as an id directly.
    DirectId(LeaveTarget),
    /// Exact display-name match.
    Exact(LeaveTarget),
    /// Name matched ignoring case.
    CaseInsensitive(LeaveTarget),
    /// Nothing matched; the entry contributes no outcome record.
    Unresolved,
}

impl Resolution {
    pub fn target(self) -> Option<LeaveTarget> {
        match self {
            Resolution::DirectId(t) | Resolution::Exact(t) | Resolution::CaseInsensitive(t) => {
                Some(t)
            }
            Resolution::Unresolved => None,
        }
    }
}

/// Deduplicated guild id → display name mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildCatalog {
    entries: BTreeMap<String, String>,
}

impl GuildCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one mapping. Empty ids are never stored; an existing id gets
    /// its name overwritten (last writer wins).
    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        if id.is_empty() {
            return;
        }
        self.entries.insert(id, name.into());
    }

    pub fn merge_guilds(&mut self, guilds: &[Guild]) {
        for guild in guilds {
            self.insert(guild.id.trim(), guild.name.trim());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    /// Iterate (id, name) pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }

    /// Entries sorted by display name, case-insensitively, for the combined
    /// listing output.
    pub fn sorted_by_name(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .entries
            .iter()
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect();
        entries.sort_by_key(|(_, name)| name.to_lowercase());
        entries
    }

    /// Resolve one leave-list entry. Long all-digit entries are literal ids
    /// and skip the catalog; otherwise an exact name match is preferred over
    /// the first case-insensitive match in catalog iteration order.
    pub fn resolve(&self, entry: &str) -> Resolution {
        if entry.len() > MIN_LITERAL_ID_LEN && entry.chars().all(|c| c.is_ascii_digit()) {
            return Resolution::DirectId(LeaveTarget {
                name: "Unknown".to_string(),
                id: entry.to_string(),
            });
        }

        if let Some((id, name)) = self.entries.iter().find(|(_, name)| name.as_str() == entry) {
            return Resolution::Exact(LeaveTarget {
                name: name.clone(),
                id: id.clone(),
            });
        }

        if let Some((id, name)) = self
            .entries
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(entry))
        {
            return Resolution::CaseInsensitive(LeaveTarget {
                name: name.clone(),
                id: id.clone(),
            });
        }

        Resolution::Unresolved
    }
}
