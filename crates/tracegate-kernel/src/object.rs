//! Host objects as seen by the registry.
//!
//! A host compiler registers the operators, namespaces and constants it
//! exposes to traced code as [`HostObject`]s. Each object carries its
//! interned [`ObjectId`], the module it originates from (absent for native
//! objects whose origin cannot be attributed), and a tagged [`ObjectKind`]
//! that drives discovery and classification.
//!
//! Namespaces and types own ordered attribute bindings. Bindings may point
//! back at an ancestor, so the namespace graph can be cyclic; such graphs
//! live for the lifetime of the process that built them.

use crate::identity::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to a registered host object.
pub type Obj = Arc<HostObject>;

/// Operator-dispatch wrappers whose call target is resolved at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    /// All overloads of one operator.
    OverloadPacket,
    /// A single resolved overload.
    Overload,
    /// A namespace of operator packets.
    OperatorNamespace,
}

/// What a host object is, for traversal and classification purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A module-like container of named bindings.
    Namespace,
    /// A plain function. `method` marks method descriptors found on types.
    Function { method: bool },
    /// An operator-dispatch wrapper.
    DispatchWrapper(DispatchKind),
    /// Anything else: classes, singletons, constants.
    Other { callable: bool, safe_constant: bool },
}

pub struct HostObject {
    id: ObjectId,
    name: String,
    module: Option<String>,
    class: Option<ObjectId>,
    kind: ObjectKind,
    bindings: RwLock<Vec<(String, Obj)>>,
    forbidden: AtomicBool,
}

impl HostObject {
    fn register(
        name: impl Into<String>,
        module: Option<&str>,
        class: Option<&Obj>,
        kind: ObjectKind,
    ) -> Obj {
        Arc::new(Self {
            id: ObjectId::issue(),
            name: name.into(),
            module: module.map(str::to_string),
            class: class.map(|class| class.id()),
            kind,
            bindings: RwLock::new(Vec::new()),
            forbidden: AtomicBool::new(false),
        })
    }

    /// A namespace whose qualified dotted name is `qualified_name`.
    pub fn namespace(qualified_name: impl Into<String>) -> Obj {
        let qualified_name = qualified_name.into();
        let module = qualified_name.clone();
        Self::register(qualified_name, Some(&module), None, ObjectKind::Namespace)
    }

    /// A function defined in `module`.
    pub fn function(module: &str, name: impl Into<String>) -> Obj {
        Self::register(name, Some(module), None, ObjectKind::Function { method: false })
    }

    /// A function with no attributable module (native code).
    pub fn native_function(name: impl Into<String>) -> Obj {
        Self::register(name, None, None, ObjectKind::Function { method: false })
    }

    /// A method descriptor, found as an attribute of a type.
    pub fn method(module: Option<&str>, name: impl Into<String>) -> Obj {
        Self::register(name, module, None, ObjectKind::Function { method: true })
    }

    pub fn dispatch_wrapper(kind: DispatchKind, module: Option<&str>, name: impl Into<String>) -> Obj {
        Self::register(name, module, None, ObjectKind::DispatchWrapper(kind))
    }

    /// A callable type. Its attributes are added with [`HostObject::bind`].
    pub fn class(module: Option<&str>, name: impl Into<String>) -> Obj {
        Self::register(
            name,
            module,
            None,
            ObjectKind::Other {
                callable: true,
                safe_constant: false,
            },
        )
    }

    /// A non-callable instance of `class`.
    pub fn instance(class: &Obj, module: Option<&str>, name: impl Into<String>) -> Obj {
        Self::register(
            name,
            module,
            Some(class),
            ObjectKind::Other {
                callable: false,
                safe_constant: false,
            },
        )
    }

    /// A literal constant (number, string, boolean, none-like).
    pub fn constant(module: Option<&str>, name: impl Into<String>) -> Obj {
        Self::register(
            name,
            module,
            None,
            ObjectKind::Other {
                callable: false,
                safe_constant: true,
            },
        )
    }

    /// Any other object, described by its flags.
    pub fn other(
        module: Option<&str>,
        name: impl Into<String>,
        class: Option<&Obj>,
        callable: bool,
        safe_constant: bool,
    ) -> Obj {
        Self::register(
            name,
            module,
            class,
            ObjectKind::Other {
                callable,
                safe_constant,
            },
        )
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module this object originates from, if attributable.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Token of the type this object is an instance of.
    pub fn class_id(&self) -> Option<ObjectId> {
        self.class
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Dotted name: a namespace's own name, otherwise `module.name`.
    pub fn qualified_name(&self) -> String {
        match (&self.kind, &self.module) {
            (ObjectKind::Namespace, _) | (_, None) => self.name.clone(),
            (_, Some(module)) => format!("{module}.{}", self.name),
        }
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, ObjectKind::Namespace)
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, ObjectKind::Function { method: true })
    }

    pub fn is_dispatch_wrapper(&self) -> bool {
        matches!(self.kind, ObjectKind::DispatchWrapper(_))
    }

    pub fn is_callable(&self) -> bool {
        match self.kind {
            ObjectKind::Namespace => false,
            ObjectKind::Function { .. } => true,
            ObjectKind::DispatchWrapper(kind) => kind != DispatchKind::OperatorNamespace,
            ObjectKind::Other { callable, .. } => callable,
        }
    }

    pub fn is_safe_constant(&self) -> bool {
        matches!(
            self.kind,
            ObjectKind::Other {
                safe_constant: true,
                ..
            }
        )
    }

    /// Bind `value` under `name`. Rebinding a name replaces it in place.
    pub fn bind(&self, name: impl Into<String>, value: &Obj) {
        let name = name.into();
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        match bindings.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = Arc::clone(value),
            None => bindings.push((name, Arc::clone(value))),
        }
    }

    /// Snapshot of the bindings in insertion order.
    pub fn bindings(&self) -> Vec<(String, Obj)> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lookup(&self, name: &str) -> Option<Obj> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find_map(|(bound, value)| (bound == name).then(|| Arc::clone(value)))
    }

    /// Whether the object carries the forbidden tag.
    pub fn is_forbidden(&self) -> bool {
        self.forbidden.load(Ordering::Acquire)
    }

    pub(crate) fn mark_forbidden(&self) {
        self.forbidden.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for HostObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Bindings are left out: the graph may be cyclic.
        f.debug_struct("HostObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("module", &self.module)
            .field("kind", &self.kind)
            .field("forbidden", &self.is_forbidden())
            .finish()
    }
}
