//! Model registry seam
//!
//! The Model Manager only needs two things from a registry: the list of
//! versions of a model with their stage, and a way to load the model
//! currently tagged with a stage. `FsModelRegistry` keeps versions on disk;
//! `InMemoryRegistry` holds model factories for embedding and tests.

use crate::error::{ForecastError, Result};
use crate::models::{ModelArtifact, ModelHandle};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle tag of a registered model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    None,
    Staging,
    Production,
    Archived,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::None => "None",
            Stage::Staging => "Staging",
            Stage::Production => "Production",
            Stage::Archived => "Archived",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Stage {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Stage::None),
            "staging" => Ok(Stage::Staging),
            "production" => Ok(Stage::Production),
            "archived" => Ok(Stage::Archived),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown model stage: {}",
                other
            ))),
        }
    }
}

/// One version of a registered model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    /// Registry version identifier, normally an increasing integer
    pub version: String,
    pub stage: Stage,
}

impl ModelVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>, stage: Stage) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            stage,
        }
    }

    /// Numeric value of the version, when it has one
    pub fn numeric_version(&self) -> Option<u64> {
        self.version.trim().parse().ok()
    }
}

/// Pick the Production version with the greatest numeric identifier
///
/// Versions that are not integers cannot be ordered and are skipped.
pub fn latest_production(versions: &[ModelVersion]) -> Option<&ModelVersion> {
    versions
        .iter()
        .filter(|v| v.stage == Stage::Production)
        .filter_map(|v| match v.numeric_version() {
            Some(n) => Some((n, v)),
            None => {
                warn!(model = %v.name, version = %v.version, "skipping non-numeric model version");
                None
            }
        })
        .max_by_key(|(n, _)| *n)
        .map(|(_, v)| v)
}

/// Source of trained models
pub trait ModelRegistry: Send + Sync {
    /// All known versions of `model_name`, in no particular order
    fn search_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>>;

    /// Load one specific version of `model_name`, whatever its stage
    fn load_version(&self, model_name: &str, version: &str) -> Result<Box<dyn ModelHandle>>;

    /// Load the newest numeric version currently tagged with `stage`
    fn load(&self, model_name: &str, stage: Stage) -> Result<Box<dyn ModelHandle>> {
        let versions = self.search_versions(model_name)?;
        let chosen = versions
            .iter()
            .filter(|v| v.stage == stage)
            .filter_map(|v| v.numeric_version().map(|n| (n, v)))
            .max_by_key(|(n, _)| *n)
            .map(|(_, v)| v)
            .ok_or_else(|| {
                ForecastError::RegistryError(format!(
                    "No version of '{}' in stage {}",
                    model_name, stage
                ))
            })?;
        self.load_version(model_name, &chosen.version)
    }
}

/// Metadata stored next to each model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionMeta {
    version: String,
    stage: Stage,
    created_at: DateTime<Utc>,
}

const VERSION_FILE: &str = "version.json";
const ARTIFACT_FILE: &str = "model.json";

/// Registry stored as `<root>/<model>/<version>/{version.json, model.json}`
#[derive(Debug, Clone)]
pub struct FsModelRegistry {
    root: PathBuf,
}

impl FsModelRegistry {
    /// Open a registry rooted at `root`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            ForecastError::RegistryError(format!(
                "Cannot create registry at {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn model_dir(&self, model_name: &str) -> Result<PathBuf> {
        if model_name.is_empty()
            || model_name.contains(|c| c == '/' || c == '\\')
            || model_name == "."
            || model_name == ".."
        {
            return Err(ForecastError::ValidationError(format!(
                "Invalid model name: '{}'",
                model_name
            )));
        }
        Ok(self.root.join(model_name))
    }

    fn read_meta(dir: &Path) -> Result<VersionMeta> {
        let path = dir.join(VERSION_FILE);
        let text = fs::read_to_string(&path).map_err(|e| {
            ForecastError::RegistryError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ForecastError::RegistryError(format!("Malformed {}: {}", path.display(), e))
        })
    }

    fn write_meta(dir: &Path, meta: &VersionMeta) -> Result<()> {
        let path = dir.join(VERSION_FILE);
        let text = serde_json::to_string_pretty(meta)?;
        fs::write(&path, text).map_err(|e| {
            ForecastError::RegistryError(format!("Cannot write {}: {}", path.display(), e))
        })
    }

    /// Register a new version of `model_name` and return it
    pub fn register(
        &self,
        model_name: &str,
        artifact: &ModelArtifact,
        stage: Stage,
    ) -> Result<ModelVersion> {
        let next = self
            .search_versions(model_name)?
            .iter()
            .filter_map(ModelVersion::numeric_version)
            .max()
            .unwrap_or(0)
            + 1;
        let version = next.to_string();

        let dir = self.model_dir(model_name)?.join(&version);
        fs::create_dir_all(&dir).map_err(|e| {
            ForecastError::RegistryError(format!("Cannot create {}: {}", dir.display(), e))
        })?;

        let artifact_path = dir.join(ARTIFACT_FILE);
        fs::write(&artifact_path, serde_json::to_string_pretty(artifact)?).map_err(|e| {
            ForecastError::RegistryError(format!(
                "Cannot write {}: {}",
                artifact_path.display(),
                e
            ))
        })?;
        Self::write_meta(
            &dir,
            &VersionMeta {
                version: version.clone(),
                stage,
                created_at: Utc::now(),
            },
        )?;

        info!(model = model_name, version = %version, stage = %stage, "registered model version");
        Ok(ModelVersion::new(model_name, version, stage))
    }

    /// Move a version to another stage
    ///
    /// With `archive_existing`, other versions holding `stage` are archived.
    pub fn transition_stage(
        &self,
        model_name: &str,
        version: &str,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<()> {
        let model_dir = self.model_dir(model_name)?;
        let dir = model_dir.join(version);
        let mut meta = Self::read_meta(&dir)?;

        if archive_existing {
            for other in self.search_versions(model_name)? {
                if other.version != version && other.stage == stage {
                    let other_dir = model_dir.join(&other.version);
                    let mut other_meta = Self::read_meta(&other_dir)?;
                    other_meta.stage = Stage::Archived;
                    Self::write_meta(&other_dir, &other_meta)?;
                }
            }
        }

        meta.stage = stage;
        Self::write_meta(&dir, &meta)?;
        info!(model = model_name, version, stage = %stage, "transitioned model version");
        Ok(())
    }
}

impl ModelRegistry for FsModelRegistry {
    fn search_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>> {
        let dir = self.model_dir(model_name)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| {
            ForecastError::RegistryError(format!("Cannot list {}: {}", dir.display(), e))
        })?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ForecastError::RegistryError(e.to_string()))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match Self::read_meta(&path) {
                Ok(meta) => versions.push(ModelVersion::new(model_name, meta.version, meta.stage)),
                Err(e) => warn!(error = %e, "skipping unreadable model version"),
            }
        }
        Ok(versions)
    }

    fn load_version(&self, model_name: &str, version: &str) -> Result<Box<dyn ModelHandle>> {
        if version.is_empty() || version.contains(|c| c == '/' || c == '\\') || version == ".." {
            return Err(ForecastError::ValidationError(format!(
                "Invalid model version: '{}'",
                version
            )));
        }
        let path = self.model_dir(model_name)?.join(version).join(ARTIFACT_FILE);
        let text = fs::read_to_string(&path).map_err(|e| {
            ForecastError::RegistryError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&text).map_err(|e| {
            ForecastError::RegistryError(format!("Malformed {}: {}", path.display(), e))
        })?;

        artifact.into_model(model_name)
    }
}

type ModelFactory = Arc<dyn Fn() -> Result<Box<dyn ModelHandle>> + Send + Sync>;

struct RegisteredModel {
    version: ModelVersion,
    factory: ModelFactory,
}

/// Registry of in-process model factories
#[derive(Default)]
pub struct InMemoryRegistry {
    models: RwLock<Vec<RegisteredModel>>,
    unavailable: AtomicBool,
    loads: AtomicUsize,
}

impl fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let versions: Vec<ModelVersion> =
            self.models.read().iter().map(|m| m.version.clone()).collect();
        f.debug_struct("InMemoryRegistry")
            .field("versions", &versions)
            .field("unavailable", &self.unavailable.load(Ordering::SeqCst))
            .finish()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a version backed by `factory`
    pub fn add_version<F>(&self, model_name: &str, version: &str, stage: Stage, factory: F)
    where
        F: Fn() -> Result<Box<dyn ModelHandle>> + Send + Sync + 'static,
    {
        let mut models = self.models.write();
        models.retain(|m| !(m.version.name == model_name && m.version.version == version));
        models.push(RegisteredModel {
            version: ModelVersion::new(model_name, version, stage),
            factory: Arc::new(factory),
        });
    }

    /// Retag an existing version
    pub fn set_stage(&self, model_name: &str, version: &str, stage: Stage) -> Result<()> {
        let mut models = self.models.write();
        let entry = models
            .iter_mut()
            .find(|m| m.version.name == model_name && m.version.version == version)
            .ok_or_else(|| {
                ForecastError::RegistryError(format!(
                    "Unknown version {} of '{}'",
                    version, model_name
                ))
            })?;
        entry.version.stage = stage;
        Ok(())
    }

    /// Simulate an unreachable registry
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `load` calls so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ForecastError::RegistryError(
                "Registry is unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

impl ModelRegistry for InMemoryRegistry {
    fn search_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>> {
        self.check_available()?;
        Ok(self
            .models
            .read()
            .iter()
            .filter(|m| m.version.name == model_name)
            .map(|m| m.version.clone())
            .collect())
    }

    fn load_version(&self, model_name: &str, version: &str) -> Result<Box<dyn ModelHandle>> {
        self.check_available()?;
        let factory = {
            let models = self.models.read();
            models
                .iter()
                .find(|m| m.version.name == model_name && m.version.version == version)
                .map(|m| Arc::clone(&m.factory))
                .ok_or_else(|| {
                    ForecastError::RegistryError(format!(
                        "Unknown version {} of '{}'",
                        version, model_name
                    ))
                })?
        };

        let model = factory()?;
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(model)
    }
}
