//! The classification registry: query surface and user overrides.
//!
//! A [`Registry`] owns five lazily materialized sets over one host surface:
//!
//! ```text
//! disallowed          ← DefaultDenials (explicit denials, singletons, graph break)
//!     │ subtracted from
//! allowed             ← FrameworkOperators (namespace discovery)
//! builtin_callables   ← BuiltinCallables
//! builtin_constants   ← BuiltinConstants
//! numeric_callables   ← NumericCallables
//! ```
//!
//! Nothing is collected until the first query or override touches a set.
//! Overrides mutate the materialized sets directly, so they always win over
//! discovery until the registry is [reset](Registry::reset).

use crate::collectors::{BuiltinCallables, BuiltinConstants, NumericCallables};
use crate::config::{OverrideConfig, RegistryConfig};
use crate::discovery::{DefaultDenials, FrameworkOperators};
use crate::error::{RegistryError, UsageError};
use crate::object::{HostObject, Obj};
use crate::set::ClassificationSet;
use crate::surface::{HostImage, HostSurface};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Module the graph-break marker reports as its origin.
pub const GRAPH_BREAK_MODULE: &str = "tracegate";

static GLOBAL_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// What the tracer should do with a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDecision {
    /// Record the call as a single graph node.
    Opaque,
    /// Trace into the callee.
    Inline,
    /// Never trace the callee at all.
    Forbidden,
}

/// Aggregate view of every classification that applies to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub object: String,
    pub allowed: bool,
    pub display_name: Option<String>,
    pub disallowed: bool,
    pub builtin_callable: bool,
    pub builtin_constant: bool,
    pub numeric: bool,
    pub forbidden: bool,
    pub decision: CallDecision,
}

/// Something override operations accept: one object or a sequence of them.
///
/// Sequences may nest; every leaf is validated before any is applied.
pub trait GraphTarget {
    fn collect_targets<'a>(&'a self, out: &mut Vec<&'a HostObject>);
}

impl GraphTarget for Obj {
    fn collect_targets<'a>(&'a self, out: &mut Vec<&'a HostObject>) {
        out.push(self);
    }
}

impl<T: GraphTarget + ?Sized> GraphTarget for &T {
    fn collect_targets<'a>(&'a self, out: &mut Vec<&'a HostObject>) {
        (**self).collect_targets(out);
    }
}

impl<T: GraphTarget> GraphTarget for [T] {
    fn collect_targets<'a>(&'a self, out: &mut Vec<&'a HostObject>) {
        for item in self {
            item.collect_targets(out);
        }
    }
}

impl<T: GraphTarget, const N: usize> GraphTarget for [T; N] {
    fn collect_targets<'a>(&'a self, out: &mut Vec<&'a HostObject>) {
        self.as_slice().collect_targets(out);
    }
}

impl<T: GraphTarget> GraphTarget for Vec<T> {
    fn collect_targets<'a>(&'a self, out: &mut Vec<&'a HostObject>) {
        self.as_slice().collect_targets(out);
    }
}

fn callable_targets<'a, T: GraphTarget + ?Sized>(
    target: &'a T,
    operation: &'static str,
) -> Result<Vec<&'a HostObject>, UsageError> {
    let mut objects = Vec::new();
    target.collect_targets(&mut objects);
    if let Some(bad) = objects.iter().find(|obj| !obj.is_callable()) {
        return Err(UsageError::NotCallable {
            operation,
            object: bad.qualified_name(),
        });
    }
    Ok(objects)
}

pub struct Registry {
    surface: Arc<HostSurface>,
    graph_break: Obj,
    allowed: Arc<ClassificationSet>,
    disallowed: Arc<ClassificationSet>,
    builtin_callables: ClassificationSet,
    builtin_constants: ClassificationSet,
    numeric_callables: ClassificationSet,
}

impl Registry {
    /// Build a registry over `surface`. Nothing is collected yet.
    pub fn new(surface: HostSurface, config: &RegistryConfig) -> Self {
        let surface = Arc::new(surface);
        let graph_break = HostObject::function(GRAPH_BREAK_MODULE, "graph_break");
        let disallowed = Arc::new(ClassificationSet::new(DefaultDenials::new(
            Arc::clone(&surface),
            graph_break.id(),
        )));
        let allowed = Arc::new(ClassificationSet::new(FrameworkOperators::new(
            Arc::clone(&surface),
            config.policy(),
            Arc::clone(&disallowed),
        )));
        Self {
            builtin_callables: ClassificationSet::new(BuiltinCallables::new(Arc::clone(&surface))),
            builtin_constants: ClassificationSet::new(BuiltinConstants::new(Arc::clone(&surface))),
            numeric_callables: ClassificationSet::new(NumericCallables::new(Arc::clone(&surface))),
            surface,
            graph_break,
            allowed,
            disallowed,
        }
    }

    pub fn surface(&self) -> &HostSurface {
        &self.surface
    }

    /// A callable that is disallowed by default. Calling it from traced code
    /// forces a graph break.
    pub fn graph_break_marker(&self) -> &Obj {
        &self.graph_break
    }

    /// Every set, labelled, in dependency order. Sets are read-only outside
    /// the registry; mutate through the override operations.
    pub fn sets(&self) -> [&ClassificationSet; 5] {
        [
            &*self.disallowed,
            &*self.allowed,
            &self.builtin_callables,
            &self.builtin_constants,
            &self.numeric_callables,
        ]
    }

    /// Look up one set by its label.
    pub fn set(&self, label: &str) -> Option<&ClassificationSet> {
        self.sets().into_iter().find(|set| set.label() == label)
    }

    // ── Queries ────────────────────────────────────────────────────────────

    /// Is this safe to record as one opaque node?
    ///
    /// Dispatch wrappers always are: their target is resolved at call time
    /// and cannot be inlined, and the host may create them after discovery.
    pub fn is_allowed(&self, obj: &HostObject) -> bool {
        self.allowed.contains(obj.id()) || obj.is_dispatch_wrapper()
    }

    pub fn get_display_name(&self, obj: &HostObject, default: &str) -> String {
        self.allowed.get_name(obj.id(), default)
    }

    /// Whether the object sits in the disallowed set (default or override).
    pub fn is_disallowed(&self, obj: &HostObject) -> bool {
        self.disallowed.contains(obj.id())
    }

    pub fn is_builtin_callable(&self, obj: &HostObject) -> bool {
        self.builtin_callables.contains(obj.id())
    }

    pub fn is_builtin_constant(&self, obj: &HostObject) -> bool {
        self.builtin_constants.contains(obj.id())
    }

    /// Numeric-library callables and instances of the numeric array type.
    /// Only direct instances match: the object model has no subclass relation.
    pub fn is_numeric(&self, obj: &HostObject) -> bool {
        if self.surface.numeric_library.is_none() {
            return false;
        }
        let is_array = match (&self.surface.numeric_array_type, obj.class_id()) {
            (Some(array_type), Some(class)) => array_type.id() == class,
            _ => false,
        };
        is_array || self.numeric_callables.contains(obj.id())
    }

    pub fn classify(&self, obj: &HostObject) -> Classification {
        let allowed = self.is_allowed(obj);
        let forbidden = obj.is_forbidden();
        let decision = if forbidden {
            CallDecision::Forbidden
        } else if allowed {
            CallDecision::Opaque
        } else {
            CallDecision::Inline
        };
        Classification {
            object: obj.qualified_name(),
            allowed,
            display_name: self.allowed.name(obj.id()),
            disallowed: self.is_disallowed(obj),
            builtin_callable: self.is_builtin_callable(obj),
            builtin_constant: self.is_builtin_constant(obj),
            numeric: self.is_numeric(obj),
            forbidden,
            decision,
        }
    }

    // ── Overrides ──────────────────────────────────────────────────────────

    /// Place `target` in the graph as-is. Returns `target` unchanged.
    pub fn allow_in_graph<T: GraphTarget>(&self, target: T) -> Result<T, UsageError> {
        for obj in callable_targets(&target, "allow_in_graph")? {
            self.allowed.add(obj.id());
            self.disallowed.remove(obj.id());
            debug!(object = %obj.qualified_name(), "allowed in graph");
        }
        Ok(target)
    }

    /// Force a graph break on `target`, which must currently be allowed.
    pub fn disallow_in_graph<T: GraphTarget>(&self, target: T) -> Result<T, UsageError> {
        let objects = callable_targets(&target, "disallow_in_graph")?;
        if let Some(obj) = objects.iter().find(|obj| !self.is_allowed(obj)) {
            return Err(UsageError::NotAllowed {
                object: obj.qualified_name(),
            });
        }
        for obj in objects {
            self.disallow_one(obj);
        }
        Ok(target)
    }

    /// Like [`Registry::disallow_in_graph`], without requiring the target
    /// to be allowed first.
    pub fn disallow_in_graph_lenient<T: GraphTarget>(&self, target: T) -> Result<T, UsageError> {
        for obj in callable_targets(&target, "disallow_in_graph")? {
            self.disallow_one(obj);
        }
        Ok(target)
    }

    fn disallow_one(&self, obj: &HostObject) {
        self.allowed.remove(obj.id());
        self.disallowed.add(obj.id());
        debug!(object = %obj.qualified_name(), "disallowed in graph");
    }

    /// Tag `target` so the tracer refuses to trace it at all.
    ///
    /// The tag is independent of the allowed and disallowed sets; it does not
    /// change [`Registry::is_allowed`].
    pub fn forbid_in_graph<T: GraphTarget>(&self, target: T) -> Result<T, UsageError> {
        for obj in callable_targets(&target, "forbid_in_graph")? {
            obj.mark_forbidden();
            debug!(object = %obj.qualified_name(), "forbidden in graph");
        }
        Ok(target)
    }

    /// Apply configured overrides by host key: allow, then disallow
    /// (lenient), then forbid.
    pub fn apply_overrides(
        &self,
        image: &HostImage,
        overrides: &OverrideConfig,
    ) -> Result<(), RegistryError> {
        let resolve = |keys: &[String]| -> Result<Vec<Obj>, RegistryError> {
            keys.iter()
                .map(|key| {
                    image
                        .object(key)
                        .cloned()
                        .ok_or_else(|| RegistryError::UnknownObject(key.clone()))
                })
                .collect()
        };
        let allow = resolve(&overrides.allow)?;
        let disallow = resolve(&overrides.disallow)?;
        let forbid = resolve(&overrides.forbid)?;
        self.allow_in_graph(allow)?;
        self.disallow_in_graph_lenient(disallow)?;
        self.forbid_in_graph(forbid)?;
        Ok(())
    }

    /// Drop every materialized set, including applied overrides.
    /// Forbidden tags live on the objects and are kept.
    pub fn reset(&self) {
        for set in self.sets() {
            set.reset();
        }
    }

    /// Deterministic digest of the current contents of every set.
    ///
    /// Tokens are process-local, so fingerprints compare registry states
    /// within one process (for example to invalidate cached graphs after an
    /// override).
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for set in self.sets() {
            hasher.update(set.label().as_bytes());
            hasher.update([0u8]);
            for (id, name) in set.snapshot() {
                hasher.update(id.as_u64().to_be_bytes());
                hasher.update(name.as_deref().unwrap_or_default().as_bytes());
                hasher.update([0u8]);
            }
        }
        format!("reg1_{}", hex_lower(&hasher.finalize()))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sets", &self.sets())
            .finish_non_exhaustive()
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Install the process-wide registry. Only the first call succeeds.
pub fn install_global(registry: Registry) -> Result<&'static Registry, RegistryError> {
    let mut installed = false;
    let current = GLOBAL_REGISTRY.get_or_init(|| {
        installed = true;
        registry
    });
    if installed {
        Ok(current)
    } else {
        Err(RegistryError::AlreadyInstalled)
    }
}

/// The process-wide registry, if one was installed.
pub fn global() -> Option<&'static Registry> {
    GLOBAL_REGISTRY.get()
}
