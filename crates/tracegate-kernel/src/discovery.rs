//! Namespace discovery: the framework-operator set and its default denials.
//!
//! [`FrameworkOperators`] walks the host's root namespaces depth-first and
//! records every object that may appear as an opaque graph node, keyed by
//! identity and named by the first path it was reached through:
//!
//! ```text
//! roots ──walk──► namespaces + admitted objects
//!       ──────►  core value type methods
//!       ──────►  minus DefaultDenials
//!       ──────►  plus tracer utilities and extension ops
//! ```
//!
//! The walk tracks visited namespaces by identity, so cyclic graphs
//! terminate.

use crate::config::ModulePolicy;
use crate::identity::ObjectId;
use crate::object::Obj;
use crate::set::{ClassificationSet, Collector, IdentityNames};
use crate::surface::HostSurface;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::trace;

/// Ops of a tensor-rearrangement extension library that are safe to keep
/// opaque.
pub const EXTENSION_OPS: &[&str] = &["rearrange", "reduce", "repeat", "einsum", "pack", "unpack"];

/// Objects that discovery must never allow.
pub struct DefaultDenials {
    surface: Arc<HostSurface>,
    graph_break: ObjectId,
}

impl DefaultDenials {
    pub fn new(surface: Arc<HostSurface>, graph_break: ObjectId) -> Self {
        Self {
            surface,
            graph_break,
        }
    }
}

impl Collector for DefaultDenials {
    fn label(&self) -> &'static str {
        "disallowed"
    }

    fn collect(&self) -> IdentityNames {
        let mut denied = IdentityNames::new();
        for obj in &self.surface.disallowed_defaults {
            denied
                .entry(obj.id())
                .or_insert_with(|| Some(obj.qualified_name()));
        }

        let singleton_types: BTreeSet<ObjectId> = self
            .surface
            .disallowed_instance_types
            .iter()
            .map(|ty| ty.id())
            .collect();
        if !singleton_types.is_empty() {
            for root in &self.surface.roots {
                let root_name = root.qualified_name();
                for (name, obj) in root.bindings() {
                    if obj
                        .class_id()
                        .is_some_and(|class| singleton_types.contains(&class))
                    {
                        denied
                            .entry(obj.id())
                            .or_insert_with(|| Some(format!("{root_name}.{name}")));
                    }
                }
            }
        }

        for (id, _) in unconditional_allows(&self.surface) {
            denied.remove(&id);
        }
        denied.insert(self.graph_break, None);
        denied
    }
}

/// Discovers the framework-operator set.
pub struct FrameworkOperators {
    surface: Arc<HostSurface>,
    policy: ModulePolicy,
    denials: Arc<ClassificationSet>,
}

impl FrameworkOperators {
    pub fn new(
        surface: Arc<HostSurface>,
        policy: ModulePolicy,
        denials: Arc<ClassificationSet>,
    ) -> Self {
        Self {
            surface,
            policy,
            denials,
        }
    }
}

impl Collector for FrameworkOperators {
    fn label(&self) -> &'static str {
        "allowed"
    }

    fn collect(&self) -> IdentityNames {
        let mut walk = Walk {
            policy: &self.policy,
            entries: IdentityNames::new(),
            visited: BTreeSet::new(),
        };
        for root in &self.surface.roots {
            walk.visit_namespace(root);
        }
        let mut entries = walk.entries;

        if let Some(value_type) = &self.surface.core_value_type {
            let type_name = value_type.qualified_name();
            for (name, attr) in value_type.bindings() {
                if attr.is_method() {
                    entries
                        .entry(attr.id())
                        .or_insert_with(|| Some(format!("{type_name}.{name}")));
                }
            }
        }

        let denied = self.denials.snapshot();
        entries.retain(|id, _| !denied.contains_key(id));

        for (id, name) in unconditional_allows(&self.surface) {
            entries.entry(id).or_insert(Some(name));
        }
        entries
    }
}

/// Tracer utilities and bound extension ops. These are allowed regardless of
/// the walk, so the default denials never hold them.
fn unconditional_allows(surface: &HostSurface) -> Vec<(ObjectId, String)> {
    let mut allows: Vec<(ObjectId, String)> = surface
        .tracer_utilities
        .iter()
        .map(|utility| (utility.id(), utility.qualified_name()))
        .collect();
    if let Some(library) = &surface.extension_library {
        let library_name = library.qualified_name();
        for op in EXTENSION_OPS {
            if let Some(obj) = library.lookup(op).filter(|obj| obj.is_callable()) {
                allows.push((obj.id(), format!("{library_name}.{op}")));
            }
        }
    }
    allows
}

struct Walk<'a> {
    policy: &'a ModulePolicy,
    entries: IdentityNames,
    visited: BTreeSet<ObjectId>,
}

impl Walk<'_> {
    fn record(&mut self, obj: &Obj, path: String) {
        self.entries.entry(obj.id()).or_insert(Some(path));
    }

    fn visit_namespace(&mut self, namespace: &Obj) {
        let qualified = namespace.qualified_name();
        if self.policy.ignores(&qualified) {
            trace!(namespace = %qualified, "namespace ignored by policy");
            return;
        }
        if !self.visited.insert(namespace.id()) {
            return;
        }
        self.record(namespace, qualified.clone());

        for (name, child) in namespace.bindings() {
            if self.entries.contains_key(&child.id()) {
                continue;
            }
            let path = format!("{qualified}.{name}");
            if self.policy.ignores(&path) {
                trace!(path = %path, "binding ignored by policy");
                continue;
            }

            if child.is_namespace() {
                if self.visited.contains(&child.id()) {
                    continue;
                }
                let child_name = child.qualified_name();
                if self.policy.admits_module(&child_name) {
                    // Namespaces keep their own qualified name.
                    self.record(&child, child_name);
                    self.visit_namespace(&child);
                } else {
                    trace!(namespace = %child_name, "namespace outside admitted modules");
                }
                continue;
            }

            match child.module() {
                Some(module) => {
                    if self.policy.admits_module(module) {
                        self.record(&child, path);
                    }
                }
                // Unattributable objects are included unless they are plain
                // constants.
                None => {
                    if !child.is_safe_constant() {
                        self.record(&child, path);
                    }
                }
            }
        }
    }
}
