//! Class registry
//!
//! Maps object names to every registered [`ClassDef`] implementation, in
//! registration order. Registration is append-only; classes are never
//! unregistered. Lookup serves a requested version from any same-major
//! class whose minor is at least the requested one, since a newer minor
//! by contract understands every older shape of its major line.

use crate::object::ClassDef;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use verso_core::{Error, ObjectVersion, Result};

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// Append-only registry of versioned classes
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<String, Vec<Arc<ClassDef>>>>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Registry::default()
    }

    /// The process-wide shared registry
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL)
    }

    /// Register a class implementation
    pub fn register(&self, class: Arc<ClassDef>) {
        debug!(object = %class.name(), version = %class.version(), "registering class");
        self.entries
            .write()
            .entry(class.name().to_string())
            .or_default()
            .push(class);
    }

    /// Whether any implementation of the named object is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Resolve a class able to serve the requested version
    ///
    /// An exact shape match wins. Otherwise the greatest same-major class
    /// with minor above the requested one serves the request. With
    /// neither, fails with `IncompatibleVersion` carrying the greatest
    /// version registered for the requested major, or the greatest
    /// overall when that major is absent entirely.
    pub fn lookup(&self, name: &str, requested: &ObjectVersion) -> Result<Arc<ClassDef>> {
        let entries = self.entries.read();
        let classes = entries.get(name).ok_or_else(|| Error::UnsupportedObject {
            name: name.to_string(),
        })?;
        if let Some(class) = classes
            .iter()
            .find(|class| class.version().same_shape(requested))
        {
            return Ok(Arc::clone(class));
        }
        let serving = classes
            .iter()
            .filter(|class| {
                class.version().major == requested.major
                    && class.version().shape_cmp(requested) == Ordering::Greater
            })
            .max_by(|a, b| a.version().shape_cmp(b.version()));
        if let Some(class) = serving {
            return Ok(Arc::clone(class));
        }
        let supported = classes
            .iter()
            .filter(|class| class.version().major == requested.major)
            .max_by(|a, b| a.version().shape_cmp(b.version()))
            .or_else(|| {
                classes
                    .iter()
                    .max_by(|a, b| a.version().shape_cmp(b.version()))
            })
            .map(|class| class.version().clone())
            .ok_or_else(|| Error::UnsupportedObject {
                name: name.to_string(),
            })?;
        Err(Error::IncompatibleVersion {
            name: name.to_string(),
            requested: requested.clone(),
            supported,
        })
    }

    /// The greatest-versioned registered class for the named object
    pub fn latest(&self, name: &str) -> Result<Arc<ClassDef>> {
        let entries = self.entries.read();
        entries
            .get(name)
            .and_then(|classes| {
                classes
                    .iter()
                    .max_by(|a, b| a.version().shape_cmp(b.version()))
            })
            .map(Arc::clone)
            .ok_or_else(|| Error::UnsupportedObject {
                name: name.to_string(),
            })
    }

    /// All registered object names, sorted
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Every registered implementation of the named object, in
    /// registration order
    pub fn classes_of(&self, name: &str) -> Vec<Arc<ClassDef>> {
        self.entries.read().get(name).cloned().unwrap_or_default()
    }
}
