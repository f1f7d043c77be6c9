//! Company data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Colors handed out to new companies, cycling by company count.
pub const PALETTE: [&str; 6] = [
    "#EF4444", "#F59E0B", "#10B981", "#3B82F6", "#8B5CF6", "#EC4899",
];

/// A tracked category (client, project) that time is recorded against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub color: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `companies` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCompany {
    pub name: String,
    pub color: String,
    pub user_id: String,
}

/// Partial update for a company row
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompanyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Company {
    /// Trim a user-supplied name. Returns `None` when nothing is left.
    pub fn normalize_name(name: &str) -> Option<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Apply a patch that the gateway has already accepted
    pub fn apply(&mut self, patch: &CompanyPatch) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(ref color) = patch.color {
            self.color = color.clone();
        }
    }
}

impl NewCompany {
    /// Build an insert payload, picking the palette color for the `index`-th company
    pub fn new(name: String, index: usize, user_id: String) -> Self {
        Self {
            name,
            color: PALETTE[index % PALETTE.len()].to_string(),
            user_id,
        }
    }
}

impl CompanyPatch {
    pub fn rename(name: String) -> Self {
        Self {
            name: Some(name),
            color: None,
        }
    }
}
