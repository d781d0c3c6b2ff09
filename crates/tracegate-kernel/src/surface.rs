//! The host surface: which registered objects play which role.
//!
//! A host compiler describes its traceable operator surface once at startup,
//! either in code or through a manifest. The registry never walks anything
//! it was not handed here.

use crate::object::Obj;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct HostSurface {
    /// Namespaces walked by discovery, in order.
    pub roots: Vec<Obj>,
    /// The core value type whose method descriptors are recorded individually.
    pub core_value_type: Option<Obj>,
    /// Objects never allowed by discovery.
    pub disallowed_defaults: Vec<Obj>,
    /// Types whose instances bound directly in a root are never allowed
    /// (dtype and storage singletons).
    pub disallowed_instance_types: Vec<Obj>,
    /// Predicates the tracer itself calls; always allowed.
    pub tracer_utilities: Vec<Obj>,
    pub builtins: Option<Obj>,
    pub operator: Option<Obj>,
    pub iterator_utilities: Vec<Obj>,
    pub reduce: Option<Obj>,
    pub numeric_library: Option<Obj>,
    pub numeric_random: Option<Obj>,
    pub numeric_array_type: Option<Obj>,
    /// Optional tensor-rearrangement library whose known ops are allowed.
    pub extension_library: Option<Obj>,
}

/// A host surface plus a key index over its objects, as loaded from a
/// manifest or built by a toy host.
#[derive(Debug, Clone, Default)]
pub struct HostImage {
    pub surface: HostSurface,
    objects: BTreeMap<String, Obj>,
}

impl HostImage {
    pub fn new(surface: HostSurface, objects: BTreeMap<String, Obj>) -> Self {
        Self { surface, objects }
    }

    pub fn object(&self, key: &str) -> Option<&Obj> {
        self.objects.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
