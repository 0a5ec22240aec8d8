//! Asset loading with embedded fallbacks
//!
//! The service configuration and the ink catalog ship embedded in the
//! binary and can be overridden on the filesystem:
//!
//! - If an env var is NOT set: use the embedded file only (no filesystem access)
//! - If an env var IS set and the file is missing: seed it from the embedded copy
//! - If an env var IS set and the file exists: use the filesystem copy

use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Embedded default config and ink catalog
#[derive(RustEmbed)]
#[folder = "."]
#[include = "config.yaml"]
#[include = "inks.yaml"]
struct EmbeddedAssets;

/// Asset category for selective operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    Config,
    Inks,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 2] = [AssetCategory::Config, AssetCategory::Inks];

    /// Name of the embedded file.
    pub fn file_name(&self) -> &'static str {
        match self {
            AssetCategory::Config => "config.yaml",
            AssetCategory::Inks => "inks.yaml",
        }
    }
}

/// Report of seeding operations
#[derive(Debug, Default)]
pub struct SeedReport {
    pub config_seeded: bool,
    pub inks_seeded: bool,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        !self.config_seeded && !self.inks_seeded
    }
}

/// Report of init (extraction) operations
#[derive(Debug, Default)]
pub struct InitReport {
    pub written: Vec<String>,
    pub skipped: Vec<String>,
}

/// Where an asset was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Embedded,
    File(PathBuf),
    /// Configured path does not exist; the embedded copy is used.
    Missing(PathBuf),
}

impl std::fmt::Display for AssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetSource::Embedded => f.write_str("embedded"),
            AssetSource::File(p) => write!(f, "{}", p.display()),
            AssetSource::Missing(p) => write!(f, "embedded ({} not found)", p.display()),
        }
    }
}

/// Asset loader with optional filesystem override
#[derive(Debug, Clone, Default)]
pub struct AssetLoader {
    /// External config file path (from CONFIG_FILE env var)
    config_file: Option<PathBuf>,
    /// External ink catalog path (from INKS_FILE env var)
    inks_file: Option<PathBuf>,
}

impl AssetLoader {
    /// Create a new asset loader
    ///
    /// Paths should be `Some` only if the corresponding env var was set.
    /// If `None`, embedded assets are used exclusively.
    pub fn new(config_file: Option<PathBuf>, inks_file: Option<PathBuf>) -> Self {
        Self {
            config_file,
            inks_file,
        }
    }

    /// Loader configured from `CONFIG_FILE` and `INKS_FILE`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("CONFIG_FILE").ok().map(PathBuf::from),
            std::env::var("INKS_FILE").ok().map(PathBuf::from),
        )
    }

    fn path_for(&self, category: AssetCategory) -> Option<&Path> {
        match category {
            AssetCategory::Config => self.config_file.as_deref(),
            AssetCategory::Inks => self.inks_file.as_deref(),
        }
    }

    pub fn source(&self, category: AssetCategory) -> AssetSource {
        match self.path_for(category) {
            Some(path) if path.exists() => AssetSource::File(path.to_path_buf()),
            Some(path) => AssetSource::Missing(path.to_path_buf()),
            None => AssetSource::Embedded,
        }
    }

    /// Read an asset, preferring the configured file over the embedded copy.
    pub fn read(&self, category: AssetCategory) -> io::Result<Cow<'static, [u8]>> {
        if let Some(path) = self.path_for(category) {
            if path.exists() {
                tracing::trace!(path = %path.display(), "Loading asset from filesystem");
                return Ok(Cow::Owned(fs::read(path)?));
            }
        }

        let name = category.file_name();
        EmbeddedAssets::get(name)
            .map(|f| {
                tracing::trace!(asset = name, "Loading asset from embedded files");
                f.data
            })
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("Embedded {name} not found"))
            })
    }

    /// Read an asset as a UTF-8 string
    pub fn read_string(&self, category: AssetCategory) -> io::Result<String> {
        let bytes = self.read(category)?;
        String::from_utf8(bytes.into_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Write the embedded copy of `category` to `path`.
    fn write_embedded(category: AssetCategory, path: &Path) -> io::Result<bool> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match EmbeddedAssets::get(category.file_name()) {
            Some(data) => {
                fs::write(path, &*data.data)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Seed configured but missing files with the embedded defaults
    pub fn seed_if_configured(&self) -> io::Result<SeedReport> {
        let mut report = SeedReport::default();

        for category in AssetCategory::ALL {
            let Some(path) = self.path_for(category) else {
                continue;
            };
            if path.exists() {
                continue;
            }
            if Self::write_embedded(category, path)? {
                tracing::info!(
                    path = %path.display(),
                    asset = category.file_name(),
                    "Seeded file with embedded default"
                );
                match category {
                    AssetCategory::Config => report.config_seeded = true,
                    AssetCategory::Inks => report.inks_seeded = true,
                }
            }
        }

        Ok(report)
    }

    /// Extract embedded assets to filesystem (init command)
    ///
    /// Uses the configured paths, or `./<file>` when not set.
    pub fn init(&self, categories: &[AssetCategory], force: bool) -> io::Result<InitReport> {
        let mut report = InitReport::default();

        for &category in categories {
            let path = self
                .path_for(category)
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".").join(category.file_name()));

            if !force && path.exists() {
                report.skipped.push(path.display().to_string());
                continue;
            }
            if Self::write_embedded(category, &path)? {
                report.written.push(path.display().to_string());
            }
        }

        Ok(report)
    }

    /// List embedded assets (for display)
    pub fn list_embedded() -> Vec<String> {
        let mut files: Vec<String> = EmbeddedAssets::iter().map(|s| s.to_string()).collect();
        files.sort();
        files
    }
}
