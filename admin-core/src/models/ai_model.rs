//! Typed model registry loaded from the host's model catalog JSON.
//!
//! Entries are validated at load time; a malformed entry is a hard error
//! naming the entry, never a silently defaulted record.

use crate::error::{AdminError, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Which service serves a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Models routed through the CLI proxy
    CliProxy,
    /// Any other named service
    Other(String),
}

impl ServiceKind {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if s == "cliproxy" {
            Some(ServiceKind::CliProxy)
        } else {
            Some(ServiceKind::Other(s.to_string()))
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::CliProxy => f.pad("cliproxy"),
            ServiceKind::Other(name) => f.pad(name),
        }
    }
}

/// One switchable model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// Fully qualified reference passed to the host (`provider/name`)
    pub full_path: String,
    pub service_kind: ServiceKind,
    /// Family grouping used by selection menus (`claude`, `gemini`, ...)
    pub model_type: String,
}

impl Model {
    /// Trailing path segment, used for display.
    pub fn short_name(&self) -> &str {
        self.full_path.rsplit('/').next().unwrap_or(&self.full_path)
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    models: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    full_path: Option<String>,
    service: Option<String>,
    model_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<Model>,
}

impl ModelRegistry {
    /// Load and validate the catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|_| {
            AdminError::SourceMissing(format!("model catalog {}", path.display()))
        })?;
        let raw: RawCatalog = serde_json::from_str(&content)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCatalog) -> Result<Self> {
        let mut models = Vec::with_capacity(raw.models.len());
        for (index, entry) in raw.models.into_iter().enumerate() {
            let full_path = entry
                .full_path
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    AdminError::InvalidModel(format!("entry {index}: missing full_path"))
                })?;
            let service_kind = entry
                .service
                .as_deref()
                .and_then(ServiceKind::parse)
                .ok_or_else(|| {
                    AdminError::InvalidModel(format!(
                        "entry {index} ({full_path}): missing service"
                    ))
                })?;
            let model_type = entry
                .model_type
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    AdminError::InvalidModel(format!(
                        "entry {index} ({full_path}): missing model_type"
                    ))
                })?;
            models.push(Model {
                full_path,
                service_kind,
                model_type,
            });
        }
        Ok(ModelRegistry { models })
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn all(&self) -> &[Model] {
        &self.models
    }

    pub fn of_type<'a>(&'a self, model_type: &str) -> Vec<&'a Model> {
        self.models
            .iter()
            .filter(|m| m.model_type == model_type)
            .collect()
    }

    pub fn of_service<'a>(&'a self, kind: &ServiceKind) -> Vec<&'a Model> {
        self.models
            .iter()
            .filter(|m| m.service_kind == *kind)
            .collect()
    }

    /// Find by exact full path.
    pub fn find(&self, full_path: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.full_path == full_path)
    }

    /// Pick a random model served by the given service.
    pub fn pick_random(&self, kind: &ServiceKind) -> Option<&Model> {
        let pool = self.of_service(kind);
        pool.choose(&mut rand::thread_rng()).copied()
    }
}
