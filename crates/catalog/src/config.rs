use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which names a history request shows for referenced entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameResolution {
    /// The name the entity has today.
    #[default]
    Current,
    /// The name the entity had when the change happened.
    AsOf,
}

impl FromStr for NameResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(NameResolution::Current),
            "as-of" | "as_of" | "asof" => Ok(NameResolution::AsOf),
            other => Err(format!("unknown name resolution mode: {other}")),
        }
    }
}

impl fmt::Display for NameResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameResolution::Current => f.write_str("current"),
            NameResolution::AsOf => f.write_str("as-of"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Database file; `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub name_resolution: NameResolution,
}

impl CatalogConfig {
    pub const DB_PATH_VAR: &'static str = "CATALOG_DB_PATH";
    pub const NAME_RESOLUTION_VAR: &'static str = "CATALOG_NAME_RESOLUTION";

    /// Read `CATALOG_DB_PATH` and `CATALOG_NAME_RESOLUTION`, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup(Self::DB_PATH_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let name_resolution = match lookup(Self::NAME_RESOLUTION_VAR) {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "falling back to current-name resolution");
                NameResolution::default()
            }),
            None => NameResolution::default(),
        };
        Self {
            db_path,
            name_resolution,
        }
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn with_name_resolution(mut self, mode: NameResolution) -> Self {
        self.name_resolution = mode;
        self
    }
}
