//! Named VM parameter presets, persisted as JSON

use crate::api::ParameterSet;
use crate::builder::VmBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const REGISTRY_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Template '{0}' already exists")]
    AlreadyExists(String),

    #[error("Invalid template: {0}")]
    Invalid(String),

    #[error("Template registry I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template registry is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TemplateError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// A reusable set of VM creation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: ParameterSet,
}

impl VmTemplate {
    pub fn new(name: impl Into<String>, parameters: ParameterSet) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    /// Capture the current state of `builder` under `name`.
    pub fn from_builder(name: impl Into<String>, builder: &VmBuilder) -> Self {
        Self::new(name, builder.build())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Start a builder for a new VM called `vm_name` from this template.
    pub fn to_builder(&self, vm_name: &str) -> Result<VmBuilder, crate::api::ApiError> {
        VmBuilder::from_parameters(vm_name, &self.parameters)
    }

    fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::Invalid(
                "template name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keyed storage of templates by name.
pub trait TemplateStore {
    /// Fails with `AlreadyExists` if the name is taken.
    fn create(&mut self, template: VmTemplate) -> Result<(), TemplateError>;

    fn get(&mut self, name: &str) -> Result<VmTemplate, TemplateError>;

    /// All templates, ordered by name.
    fn list(&mut self) -> Result<Vec<VmTemplate>, TemplateError>;

    /// Fails with `NotFound` if no template has this name.
    fn update(&mut self, template: VmTemplate) -> Result<(), TemplateError>;

    /// Removes and returns the template.
    fn delete(&mut self, name: &str) -> Result<VmTemplate, TemplateError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    templates: BTreeMap<String, VmTemplate>,
}

fn insert_new(
    templates: &mut BTreeMap<String, VmTemplate>,
    template: VmTemplate,
) -> Result<(), TemplateError> {
    template.validate()?;
    if templates.contains_key(&template.name) {
        return Err(TemplateError::AlreadyExists(template.name));
    }
    templates.insert(template.name.clone(), template);
    Ok(())
}

fn replace_existing(
    templates: &mut BTreeMap<String, VmTemplate>,
    template: VmTemplate,
) -> Result<(), TemplateError> {
    match templates.get_mut(&template.name) {
        Some(slot) => {
            *slot = template;
            Ok(())
        }
        None => Err(TemplateError::NotFound(template.name)),
    }
}

/// Template store kept only in memory.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: BTreeMap<String, VmTemplate>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn create(&mut self, template: VmTemplate) -> Result<(), TemplateError> {
        insert_new(&mut self.templates, template)
    }

    fn get(&mut self, name: &str) -> Result<VmTemplate, TemplateError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    fn list(&mut self) -> Result<Vec<VmTemplate>, TemplateError> {
        Ok(self.templates.values().cloned().collect())
    }

    fn update(&mut self, template: VmTemplate) -> Result<(), TemplateError> {
        replace_existing(&mut self.templates, template)
    }

    fn delete(&mut self, name: &str) -> Result<VmTemplate, TemplateError> {
        self.templates
            .remove(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }
}

/// Template store backed by a JSON file.
///
/// The file is read on first use and cached; every successful mutation is
/// written back before returning. A missing file is an empty registry.
#[derive(Debug)]
pub struct JsonFileTemplateStore {
    path: PathBuf,
    cache: Option<RegistryFile>,
}

impl JsonFileTemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    /// `{config_dir}/pve-client/templates.json`, falling back to
    /// `$HOME/.config`. `None` when neither directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|dir| dir.join("pve-client").join("templates.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TemplateError {
        TemplateError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn registry(&mut self) -> Result<&mut RegistryFile, TemplateError> {
        if self.cache.is_none() {
            let registry = if self.path.exists() {
                let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
                let registry: RegistryFile = serde_json::from_str(&content)?;
                tracing::debug!(
                    "Loaded {} templates from {}",
                    registry.templates.len(),
                    self.path.display()
                );
                registry
            } else {
                RegistryFile {
                    version: REGISTRY_VERSION,
                    templates: BTreeMap::new(),
                }
            };
            self.cache = Some(registry);
        }
        Ok(self.cache.get_or_insert_with(RegistryFile::default))
    }

    fn save(&self, registry: &RegistryFile) -> Result<(), TemplateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let content = serde_json::to_string_pretty(registry)?;
        fs::write(&self.path, content).map_err(|e| self.io_error(e))?;
        tracing::debug!("Saved template registry to {}", self.path.display());
        Ok(())
    }

    fn persist(&self) -> Result<(), TemplateError> {
        match &self.cache {
            Some(registry) => self.save(registry),
            None => Ok(()),
        }
    }

    /// Apply `change` to the cached mapping and persist it. The cache is
    /// rolled back if the change or the write fails.
    fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut BTreeMap<String, VmTemplate>) -> Result<T, TemplateError>,
    ) -> Result<T, TemplateError> {
        let registry = self.registry()?;
        let snapshot = registry.templates.clone();

        let result = match change(&mut registry.templates) {
            Ok(value) => self.persist().map(|_| value),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Some(registry) = self.cache.as_mut() {
                registry.templates = snapshot;
            }
        }
        result
    }
}

impl TemplateStore for JsonFileTemplateStore {
    fn create(&mut self, template: VmTemplate) -> Result<(), TemplateError> {
        self.mutate(|templates| insert_new(templates, template))
    }

    fn get(&mut self, name: &str) -> Result<VmTemplate, TemplateError> {
        self.registry()?
            .templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    fn list(&mut self) -> Result<Vec<VmTemplate>, TemplateError> {
        Ok(self.registry()?.templates.values().cloned().collect())
    }

    fn update(&mut self, template: VmTemplate) -> Result<(), TemplateError> {
        self.mutate(|templates| replace_existing(templates, template))
    }

    fn delete(&mut self, name: &str) -> Result<VmTemplate, TemplateError> {
        self.mutate(|templates| {
            templates
                .remove(name)
                .ok_or_else(|| TemplateError::NotFound(name.to_string()))
        })
    }
}
