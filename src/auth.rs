use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info};

/// On-disk layout of the authorization file
#[derive(Debug, Deserialize, Default)]
struct AuthFile {
    #[serde(default)]
    admin: Vec<String>,
    #[serde(default)]
    owner: Vec<String>,
}

/// Who may invoke commands. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationContext {
    owners: HashSet<String>,
    admins: HashSet<String>,
}

impl AuthorizationContext {
    pub fn new<I, J>(owners: I, admins: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self {
            owners: owners.into_iter().collect(),
            admins: admins.into_iter().collect(),
        }
    }

    /// Load the owner/admin sets from a JSON file.
    ///
    /// A missing file is logged and yields empty sets, so nobody can run
    /// commands. A file that exists but cannot be parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!("Authorization file not found: {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read authorization file: {}", path.display())
                })
            }
        };

        let file: AuthFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse authorization file: {}", path.display()))?;

        let ctx = Self::new(file.owner, file.admin);
        info!(
            "Loaded authorization: {} owner(s), {} admin(s)",
            ctx.owners.len(),
            ctx.admins.len()
        );
        Ok(ctx)
    }

    pub fn is_authorized(&self, mid: &str) -> bool {
        self.owners.contains(mid) || self.admins.contains(mid)
    }

    #[cfg(test)]
    pub fn owners(&self) -> &HashSet<String> {
        &self.owners
    }

    #[cfg(test)]
    pub fn admins(&self) -> &HashSet<String> {
        &self.admins
    }
}
