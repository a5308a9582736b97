//! Registry configuration loading.
//!
//! The configuration directory holds `crs.yaml` and one file per
//! collection under `collections/`. Missing files fall back to the
//! built-in defaults compiled into the binary.

use anyhow::{Context, Result};
use std::path::Path;

use edr_protocol::{CollectionConfig, CollectionRegistry, CrsConfig, CrsRegistry};

const DEFAULT_CRS: &str = include_str!("../../../config/crs.yaml");
const DEFAULT_COLLECTIONS: &[(&str, &str)] = &[
    (
        "isd-2025.yaml",
        include_str!("../../../config/collections/isd-2025.yaml"),
    ),
    (
        "mountains.yaml",
        include_str!("../../../config/collections/mountains.yaml"),
    ),
];

/// Both registries, validated and ready to freeze behind `Arc`.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub crs: CrsRegistry,
    pub collections: CollectionRegistry,
}

impl RegistryConfig {
    /// Load the registries from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            tracing::warn!(
                "Config directory {:?} does not exist, using built-in registries",
                dir
            );
        }

        let crs = load_crs(&dir.join("crs.yaml"))?;
        let configs = load_collections(&dir.join("collections"))?;
        let collections = CollectionRegistry::from_configs(configs, &crs)
            .context("Invalid collection configuration")?;

        tracing::info!(
            crs = crs.len(),
            collections = collections.len(),
            "Loaded registries"
        );

        Ok(Self { crs, collections })
    }

    /// The registries compiled into the binary.
    pub fn builtin() -> Result<Self> {
        let crs = parse_crs(DEFAULT_CRS, "built-in crs.yaml")?;
        let collections = CollectionRegistry::from_configs(builtin_collections()?, &crs)
            .context("Invalid built-in collection configuration")?;
        Ok(Self { crs, collections })
    }
}

fn parse_crs(content: &str, origin: &str) -> Result<CrsRegistry> {
    let entries: Vec<CrsConfig> =
        serde_yaml::from_str(content).with_context(|| format!("Failed to parse: {}", origin))?;
    CrsRegistry::from_entries(entries).with_context(|| format!("Invalid CRS table: {}", origin))
}

fn load_crs(path: &Path) -> Result<CrsRegistry> {
    if !path.exists() {
        tracing::info!("No {:?}, using the built-in CRS table", path);
        return parse_crs(DEFAULT_CRS, "built-in crs.yaml");
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {:?}", path))?;
    let registry = parse_crs(&content, &path.display().to_string())?;
    tracing::info!("Loaded {} CRS definitions from {:?}", registry.len(), path);
    Ok(registry)
}

fn builtin_collections() -> Result<Vec<CollectionConfig>> {
    DEFAULT_COLLECTIONS
        .iter()
        .map(|(name, content)| {
            serde_yaml::from_str(content)
                .with_context(|| format!("Failed to parse built-in collection: {}", name))
        })
        .collect()
}

fn load_collections(dir: &Path) -> Result<Vec<CollectionConfig>> {
    if !dir.exists() {
        tracing::info!("No {:?}, using the built-in collections", dir);
        return builtin_collections();
    }

    let mut paths = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?
    {
        let path = entry?.path();
        if let Some(ext) = path.extension() {
            if ext == "yaml" || ext == "yml" {
                paths.push(path);
            }
        }
    }
    // Registry order is listing order; keep it stable across platforms.
    paths.sort();

    let mut configs = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read: {:?}", path))?;
        let config: CollectionConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse: {:?}", path))?;
        tracing::info!("Loaded collection {} from {:?}", config.id, path);
        configs.push(config);
    }
    Ok(configs)
}
