//! Identity types for engine instances
//!
//! An engine instance is addressed by `(namespace, name)`. The runtime type
//! is part of its identity once resolved, but never part of the lookup key:
//! callers reconcile by name before they know what was declared.

use crate::RuntimeType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key addressing one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EngineKey {
    namespace: String,
    name: String,
}

impl EngineKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Display for EngineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Resolved identity of an engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineIdentity {
    key: EngineKey,
    runtime_type: RuntimeType,
}

impl EngineIdentity {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        runtime_type: RuntimeType,
    ) -> Self {
        Self {
            key: EngineKey::new(name, namespace),
            runtime_type,
        }
    }

    /// Attach a runtime type to an existing key.
    pub fn from_key(key: EngineKey, runtime_type: RuntimeType) -> Self {
        Self { key, runtime_type }
    }

    pub fn key(&self) -> &EngineKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.key.name()
    }

    pub fn namespace(&self) -> &str {
        self.key.namespace()
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }
}

impl fmt::Display for EngineIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.runtime_type)
    }
}
