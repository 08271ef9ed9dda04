use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;

use super::backend::DetectorBackend;
use super::backends::MotionBackend;

/// Registry of detector backends, keyed by name.
///
/// The processing loop owns exactly one backend, so `select` hands the chosen
/// backend out by value and consumes the registry.
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn DetectorBackend>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry holding every backend this build can construct from `settings`.
    ///
    /// `motion` is always available. `tract` is registered when the
    /// `backend-tract` feature is enabled and a model path is configured.
    pub fn builtin(settings: &DetectorSettings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(MotionBackend::new());

        #[cfg(feature = "backend-tract")]
        if let Some(model_path) = settings.model_path.as_deref() {
            registry.register(super::backends::TractBackend::new(model_path)?);
        }
        #[cfg(not(feature = "backend-tract"))]
        if settings.model_path.is_some() {
            log::warn!("model_path is set but this build lacks the backend-tract feature");
        }

        Ok(registry)
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Box::new(backend));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// List registered backends, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Take the named backend, or the default when `name` is `None`.
    pub fn select(mut self, name: Option<&str>) -> Result<Box<dyn DetectorBackend>> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self
                .default_name
                .clone()
                .ok_or_else(|| anyhow!("no detector backends registered"))?,
        };
        let available = self.list().join(", ");
        self.backends
            .remove(&name)
            .ok_or_else(|| anyhow!("backend '{}' not registered (available: {})", name, available))
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ScriptStep, ScriptedBackend};

    #[test]
    fn first_registered_backend_is_default() -> Result<()> {
        let mut registry = BackendRegistry::new();
        registry.register(ScriptedBackend::new(vec![ScriptStep::Absent]));
        registry.register(MotionBackend::new());

        assert_eq!(registry.list(), vec!["motion", "scripted"]);
        let backend = registry.select(None)?;
        assert_eq!(backend.name(), "scripted");
        Ok(())
    }

    #[test]
    fn set_default_rejects_unknown_names() {
        let mut registry = BackendRegistry::new();
        registry.register(MotionBackend::new());
        assert!(registry.set_default("hog").is_err());
        assert!(registry.set_default("motion").is_ok());
    }

    #[test]
    fn select_unknown_backend_fails() {
        let registry = BackendRegistry::builtin(&DetectorSettings::default()).unwrap();
        let err = registry.select(Some("hog")).err().expect("unknown backend");
        assert!(err.to_string().contains("motion"));
    }

    #[test]
    fn builtin_registry_offers_motion() -> Result<()> {
        let registry = BackendRegistry::builtin(&DetectorSettings::default())?;
        assert!(registry.list().contains(&"motion".to_string()));
        assert_eq!(registry.select(Some("motion"))?.name(), "motion");
        Ok(())
    }
}
