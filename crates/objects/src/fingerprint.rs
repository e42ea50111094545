//! Class fingerprints
//!
//! A fingerprint condenses everything version-relevant about a class
//! into `"<version>-<hash>"`: field descriptors, remote-capable method
//! signatures and the relationship table. Build tooling pins the expected
//! fingerprints and fails when one moves without its version, catching
//! forgotten version bumps before they reach a deployment.

use crate::object::ClassDef;
use crate::registry::Registry;
use std::collections::BTreeMap;
use xxhash_rust::xxh3::xxh3_64;

/// Compute the fingerprint of one class
pub fn fingerprint(class: &ClassDef) -> String {
    let mut parts: Vec<String> = Vec::new();
    for spec in class.fields() {
        parts.push(format!("field:{}={}", spec.name(), spec.descriptor()));
    }
    for method in class.methods() {
        parts.push(format!("method:{}{}", method.name(), method.signature()));
    }
    for method in class.class_methods() {
        parts.push(format!(
            "classmethod:{}{}",
            method.name(),
            method.signature()
        ));
    }
    for (field, pairs) in class.relationships() {
        let ladder: Vec<String> = pairs
            .iter()
            .map(|(owner, child)| format!("({owner},{child})"))
            .collect();
        parts.push(format!("rel:{}=[{}]", field, ladder.join(",")));
    }
    let digest = xxh3_64(parts.join(";").as_bytes());
    format!("{}-{:016x}", class.version(), digest)
}

/// Fingerprints for every registered class, object name to the
/// fingerprints of its implementations in registration order
pub fn fingerprints(registry: &Registry) -> BTreeMap<String, Vec<String>> {
    registry
        .class_names()
        .into_iter()
        .map(|name| {
            let prints = registry
                .classes_of(&name)
                .iter()
                .map(|class| fingerprint(class))
                .collect();
            (name, prints)
        })
        .collect()
}

/// Whether every relationship ladder has both columns non-decreasing
///
/// The downgrade engine assumes ordered ladders; this check belongs in
/// build tooling next to the fingerprint pinning.
pub fn relationships_ordered(class: &ClassDef) -> bool {
    class.relationships().values().all(|pairs| {
        pairs.windows(2).all(|window| {
            window[0].0.shape_cmp(&window[1].0).is_le()
                && window[0].1.shape_cmp(&window[1].1).is_le()
        })
    })
}
