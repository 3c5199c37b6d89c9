//! Mechanism registry keyed by name.

use dashmap::DashMap;
use std::sync::Arc;

use crate::error::BridgeError;
use crate::mechanism::Mechanism;

/// Process-wide collection of mechanisms, owned by the composition root.
#[derive(Default, Clone)]
pub struct MechanismRegistry {
    mechanisms: Arc<DashMap<String, Arc<dyn Mechanism>>>,
}

impl MechanismRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `mechanism.name()`. Returns the mechanism it replaced, if any.
    pub fn register(&self, mechanism: Arc<dyn Mechanism>) -> Option<Arc<dyn Mechanism>> {
        let name = mechanism.name().to_string();
        let previous = self.mechanisms.insert(name.clone(), mechanism);
        if previous.is_some() {
            tracing::warn!(mechanism = %name, "Mechanism replaced");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Mechanism>> {
        self.mechanisms.get(name).map(|m| m.value().clone())
    }

    /// Sorted mechanism names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mechanisms.iter().map(|m| m.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }

    /// Initialize every mechanism. Failures are logged and returned; a failed
    /// mechanism stays registered and answers `NotInitialized`.
    pub async fn init_all(&self) -> Vec<(String, BridgeError)> {
        // Collect first so no map guard is held across an await.
        let mechanisms: Vec<Arc<dyn Mechanism>> =
            self.mechanisms.iter().map(|m| m.value().clone()).collect();

        let mut failures = Vec::new();
        for mechanism in mechanisms {
            if let Err(e) = mechanism.init().await {
                tracing::error!(mechanism = mechanism.name(), error = %e, "Mechanism init failed");
                failures.push((mechanism.name().to_string(), e));
            }
        }
        failures
    }
}

impl std::fmt::Debug for MechanismRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MechanismRegistry")
            .field("mechanisms", &self.names())
            .finish()
    }
}
