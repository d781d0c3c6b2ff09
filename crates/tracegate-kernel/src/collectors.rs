//! Fixed-domain collectors: language built-ins and the numeric library.
//!
//! Each collector scans the direct bindings of a fixed namespace once and
//! partitions them by callability. None of them recurse.

use crate::object::Obj;
use crate::set::{Collector, IdentityNames};
use crate::surface::HostSurface;
use std::sync::Arc;

fn is_private(name: &str) -> bool {
    name.starts_with('_')
}

fn record_bindings(
    namespace: &Obj,
    entries: &mut IdentityNames,
    keep: impl Fn(&str, &Obj) -> bool,
) {
    let namespace_name = namespace.qualified_name();
    for (name, obj) in namespace.bindings() {
        if keep(&name, &obj) {
            entries
                .entry(obj.id())
                .or_insert_with(|| Some(format!("{namespace_name}.{name}")));
        }
    }
}

/// Public callable built-ins, every operator-symbol callable, the iterator
/// utilities and `reduce`.
pub struct BuiltinCallables {
    surface: Arc<HostSurface>,
}

impl BuiltinCallables {
    pub fn new(surface: Arc<HostSurface>) -> Self {
        Self { surface }
    }
}

impl Collector for BuiltinCallables {
    fn label(&self) -> &'static str {
        "builtin_callables"
    }

    fn collect(&self) -> IdentityNames {
        let mut entries = IdentityNames::new();
        if let Some(builtins) = &self.surface.builtins {
            record_bindings(builtins, &mut entries, |name, obj| {
                !is_private(name) && obj.is_callable()
            });
        }
        if let Some(operator) = &self.surface.operator {
            record_bindings(operator, &mut entries, |_, obj| obj.is_callable());
        }
        for obj in self
            .surface
            .iterator_utilities
            .iter()
            .chain(self.surface.reduce.iter())
        {
            entries
                .entry(obj.id())
                .or_insert_with(|| Some(obj.qualified_name()));
        }
        entries
    }
}

/// Public non-callable built-ins.
pub struct BuiltinConstants {
    surface: Arc<HostSurface>,
}

impl BuiltinConstants {
    pub fn new(surface: Arc<HostSurface>) -> Self {
        Self { surface }
    }
}

impl Collector for BuiltinConstants {
    fn label(&self) -> &'static str {
        "builtin_constants"
    }

    fn collect(&self) -> IdentityNames {
        let mut entries = IdentityNames::new();
        if let Some(builtins) = &self.surface.builtins {
            record_bindings(builtins, &mut entries, |name, obj| {
                !is_private(name) && !obj.is_callable()
            });
        }
        entries
    }
}

/// Callables defined by the numeric library itself or its random
/// submodule. Re-exports from other modules are skipped.
pub struct NumericCallables {
    surface: Arc<HostSurface>,
}

impl NumericCallables {
    pub fn new(surface: Arc<HostSurface>) -> Self {
        Self { surface }
    }
}

impl Collector for NumericCallables {
    fn label(&self) -> &'static str {
        "numeric_callables"
    }

    fn collect(&self) -> IdentityNames {
        let mut entries = IdentityNames::new();
        let namespaces = self
            .surface
            .numeric_library
            .iter()
            .chain(self.surface.numeric_random.iter());
        for namespace in namespaces {
            let namespace_name = namespace.qualified_name();
            record_bindings(namespace, &mut entries, |_, obj| {
                obj.is_callable() && obj.module().unwrap_or(&namespace_name) == namespace_name
            });
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::HostObject;

    fn builtins_surface() -> (HostSurface, Vec<Obj>) {
        let builtins = HostObject::namespace("builtins");
        let len = HostObject::native_function("len");
        let dict = HostObject::class(Some("builtins"), "dict");
        let true_value = HostObject::constant(None, "True");
        let hidden = HostObject::native_function("__build_class__");
        let hidden_const = HostObject::constant(None, "__debug__");
        builtins.bind("len", &len);
        builtins.bind("dict", &dict);
        builtins.bind("True", &true_value);
        builtins.bind("__build_class__", &hidden);
        builtins.bind("__debug__", &hidden_const);

        let operator = HostObject::namespace("operator");
        let add = HostObject::native_function("add");
        operator.bind("add", &add);
        operator.bind("__add__", &add);
        let dunder_only = HostObject::native_function("__matmul__");
        operator.bind("__matmul__", &dunder_only);

        let itertools = HostObject::function("itertools", "chain");
        let reduce = HostObject::function("functools", "reduce");

        let surface = HostSurface {
            builtins: Some(builtins),
            operator: Some(operator),
            iterator_utilities: vec![Arc::clone(&itertools)],
            reduce: Some(Arc::clone(&reduce)),
            ..HostSurface::default()
        };
        (
            surface,
            vec![
                len,
                dict,
                true_value,
                hidden,
                hidden_const,
                add,
                dunder_only,
                itertools,
                reduce,
            ],
        )
    }

    #[test]
    fn builtin_callables_partition_by_callability_and_privacy() {
        let (surface, objs) = builtins_surface();
        let [len, dict, true_value, hidden, _, add, dunder_only, chain, reduce] =
            <[Obj; 9]>::try_from(objs).expect("nine fixture objects");
        let entries = BuiltinCallables::new(Arc::new(surface)).collect();

        assert_eq!(entries.get(&len.id()), Some(&Some("builtins.len".to_string())));
        assert!(entries.contains_key(&dict.id()));
        assert!(!entries.contains_key(&true_value.id()));
        assert!(!entries.contains_key(&hidden.id()));
        assert_eq!(entries.get(&add.id()), Some(&Some("operator.add".to_string())));
        assert!(entries.contains_key(&dunder_only.id()));
        assert_eq!(
            entries.get(&chain.id()),
            Some(&Some("itertools.chain".to_string()))
        );
        assert_eq!(
            entries.get(&reduce.id()),
            Some(&Some("functools.reduce".to_string()))
        );
    }

    #[test]
    fn builtin_constants_keep_public_non_callables() {
        let (surface, objs) = builtins_surface();
        let entries = BuiltinConstants::new(Arc::new(surface)).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries.get(&objs[2].id()),
            Some(&Some("builtins.True".to_string()))
        );
    }

    #[test]
    fn numeric_callables_skip_reexports() {
        let numpy = HostObject::namespace("numpy");
        let random = HostObject::namespace("numpy.random");
        let sum = HostObject::function("numpy", "sum");
        let native = HostObject::native_function("dot");
        let reexport = HostObject::function("numpy.core.numeric", "ones");
        let normal = HostObject::function("numpy.random", "normal");
        let pi = HostObject::constant(None, "pi");
        numpy.bind("sum", &sum);
        numpy.bind("dot", &native);
        numpy.bind("ones", &reexport);
        numpy.bind("pi", &pi);
        random.bind("normal", &normal);

        let entries = NumericCallables::new(Arc::new(HostSurface {
            numeric_library: Some(numpy),
            numeric_random: Some(random),
            ..HostSurface::default()
        }))
        .collect();

        assert_eq!(entries.get(&sum.id()), Some(&Some("numpy.sum".to_string())));
        assert_eq!(entries.get(&native.id()), Some(&Some("numpy.dot".to_string())));
        assert_eq!(
            entries.get(&normal.id()),
            Some(&Some("numpy.random.normal".to_string()))
        );
        assert!(!entries.contains_key(&reexport.id()));
        assert!(!entries.contains_key(&pi.id()));
    }

    #[test]
    fn missing_namespaces_yield_empty_sets() {
        let surface = Arc::new(HostSurface::default());
        assert!(BuiltinCallables::new(Arc::clone(&surface)).collect().is_empty());
        assert!(BuiltinConstants::new(Arc::clone(&surface)).collect().is_empty());
        assert!(NumericCallables::new(surface).collect().is_empty());
    }
}
