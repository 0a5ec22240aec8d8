use crate::assets::{AssetCategory, AssetLoader, AssetSource};
use ink_recipe::{Ink, InkSet};
use serde::Deserialize;

/// Layout of inks.yaml
#[derive(Debug, Deserialize, Default)]
pub struct InkCatalogFile {
    #[serde(default)]
    pub inks: Vec<Ink>,
}

impl InkCatalogFile {
    /// Parse and index a catalog document.
    pub fn parse(content: &str) -> anyhow::Result<InkSet> {
        let file: Self = serde_yaml::from_str(content)?;
        Ok(InkSet::new(file.inks)?)
    }

    /// Load the ink catalog.
    ///
    /// A broken external file falls back to the embedded catalog, and a
    /// broken embedded catalog to an empty one. Both cases are logged.
    pub fn load_from_assets(loader: &AssetLoader) -> InkSet {
        let source = loader.source(AssetCategory::Inks);
        match loader
            .read_string(AssetCategory::Inks)
            .map_err(anyhow::Error::from)
            .and_then(|content| Self::parse(&content))
        {
            Ok(set) => {
                tracing::info!(inks = set.len(), source = %source, "Loaded ink catalog");
                return set;
            }
            Err(e) => tracing::warn!(%e, source = %source, "Failed to load ink catalog"),
        }

        if matches!(source, AssetSource::File(_)) {
            match AssetLoader::default()
                .read_string(AssetCategory::Inks)
                .map_err(anyhow::Error::from)
                .and_then(|content| Self::parse(&content))
            {
                Ok(set) => {
                    tracing::warn!(inks = set.len(), "Using embedded ink catalog");
                    return set;
                }
                Err(e) => tracing::warn!(%e, "Embedded ink catalog is invalid"),
            }
        }

        tracing::warn!("Starting with an empty ink catalog");
        InkSet::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ink_recipe::{InkCatalog, InkType};
    use std::fs;

    #[test]
    fn test_embedded_catalog_loads() {
        let set = InkCatalogFile::load_from_assets(&AssetLoader::default());

        assert!(set.len() >= 10);
        for id in ["cyan", "magenta", "yellow", "black", "opaque-white"] {
            assert!(set.get(id).is_some(), "missing {id}");
        }
        assert!(set.get("opaque-white").unwrap().is_white());
        assert_eq!(set.by_type(InkType::Fluorescent).len(), 1);
    }

    #[test]
    fn test_parse_minimal_ink() {
        let yaml = r#"
inks:
  - id: black
    concentrations:
      100: { L: 16.0, a: 0.0, b: 0.0 }
"#;
        let set = InkCatalogFile::parse(yaml).unwrap();
        let black = set.get("black").unwrap();
        assert_eq!(black.name(), "black");
        assert_eq!(black.ink_type(), InkType::Process);
    }

    #[test]
    fn test_parse_rejects_missing_full_strength() {
        let yaml = r#"
inks:
  - id: cyan
    concentrations:
      50: { L: 72.0, a: -24.0, b: -33.0 }
"#;
        assert!(InkCatalogFile::parse(yaml).is_err());
    }

    #[test]
    fn test_parse_rejects_duplicate_ids() {
        let yaml = r#"
inks:
  - id: cyan
    concentrations:
      100: { L: 55.0, a: -37.0, b: -50.0 }
  - id: cyan
    concentrations:
      100: { L: 55.0, a: -37.0, b: -50.0 }
"#;
        assert!(InkCatalogFile::parse(yaml).is_err());
    }

    #[test]
    fn test_broken_file_falls_back_to_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inks.yaml");
        fs::write(&path, "inks: [{ id: broken }]").unwrap();

        let loader = AssetLoader::new(None, Some(path));
        let set = InkCatalogFile::load_from_assets(&loader);

        assert!(set.get("cyan").is_some());
    }

    #[test]
    fn test_external_file_replaces_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inks.yaml");
        fs::write(
            &path,
            "inks:\n  - id: house-red\n    type: spot\n    concentrations:\n      100: { L: 45.0, a: 65.0, b: 40.0 }\n",
        )
        .unwrap();

        let set = InkCatalogFile::load_from_assets(&AssetLoader::new(None, Some(path)));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("house-red").unwrap().ink_type(), InkType::Spot);
    }
}
