//! Toy hosts for conformance testing.
//!
//! Each toy host is a small, hand-built operator surface with the policy it
//! is meant to be checked under. The fixture suite under `tests/fixtures/`
//! and the CLI's `--toy` flag select hosts by name.
//!
//! ## Hosts
//!
//! - **mini_torch**: a framework namespace with nested submodules, a denied
//!   optimizer subtree, an ignored testing subtree, dtype and storage
//!   singletons, a core tensor type, builtins, the operator library, a
//!   numeric library and a rearrangement extension.
//!
//! - **cyclic**: a root whose child binds the root again, plus a self-loop.
//!   Discovery must terminate.
//!
//! - **policy_split**: root `R` holds submodule `A` (function `f`), and `A`
//!   holds `A.sub` (function `g`) under the ignore prefix `A.sub.`.

use crate::config::{OverrideConfig, RegistryConfig};
use crate::object::{DispatchKind, HostObject, Obj};
use crate::surface::{HostImage, HostSurface};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A toy host image and the configuration it is checked under.
#[derive(Debug, Clone)]
pub struct ToyHost {
    pub image: HostImage,
    pub config: RegistryConfig,
}

pub const TOY_HOSTS: &[&str] = &["mini_torch", "cyclic", "policy_split"];

/// Get a toy host by name (matching fixture "host" field).
pub fn get_host(name: &str) -> Option<ToyHost> {
    match name {
        "mini_torch" => Some(mini_torch()),
        "cyclic" => Some(cyclic()),
        "policy_split" => Some(policy_split()),
        _ => None,
    }
}

#[derive(Default)]
struct Keys(BTreeMap<String, Obj>);

impl Keys {
    fn put(&mut self, key: &str, obj: Obj) -> Obj {
        self.0.insert(key.to_string(), Arc::clone(&obj));
        obj
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn config(roots: &[&str], denied: &[&str], ignore: &[&str]) -> RegistryConfig {
    RegistryConfig {
        allowed_roots: owned(roots),
        denied_module_prefixes: owned(denied),
        ignore_prefixes: owned(ignore),
        overrides: OverrideConfig::default(),
    }
}

// ─── mini_torch ─────────────────────────────────────────────────────────────

fn mini_torch() -> ToyHost {
    let mut keys = Keys::default();

    let torch = keys.put("torch", HostObject::namespace("torch"));
    let add = keys.put("torch.add", HostObject::function("torch", "add"));
    let sub = keys.put("torch.sub", HostObject::function("torch", "sub"));
    let native_gelu = keys.put("torch._native_gelu", HostObject::native_function("_native_gelu"));
    torch.bind("add", &add);
    torch.bind("sub", &sub);
    torch.bind("_native_gelu", &native_gelu);
    // Alias: first path wins.
    torch.bind("subtract", &sub);

    let nn = keys.put("torch.nn", HostObject::namespace("torch.nn"));
    let functional = keys.put(
        "torch.nn.functional",
        HostObject::namespace("torch.nn.functional"),
    );
    let relu = keys.put(
        "torch.nn.functional.relu",
        HostObject::function("torch.nn.functional", "relu"),
    );
    let lstm = keys.put(
        "torch.nn.modules.rnn.LSTM",
        HostObject::class(Some("torch.nn.modules.rnn"), "LSTM"),
    );
    torch.bind("nn", &nn);
    nn.bind("functional", &functional);
    nn.bind("LSTM", &lstm);
    functional.bind("relu", &relu);
    // Back edge to the root.
    functional.bind("torch", &torch);

    let optim = keys.put("torch.optim", HostObject::namespace("torch.optim"));
    let sgd = keys.put(
        "torch.optim.SGD",
        HostObject::class(Some("torch.optim.sgd"), "SGD"),
    );
    torch.bind("optim", &optim);
    optim.bind("SGD", &sgd);

    let testing = keys.put("torch.testing", HostObject::namespace("torch.testing"));
    let assert_close = keys.put(
        "torch.testing.assert_close",
        HostObject::function("torch.testing._comparison", "assert_close"),
    );
    torch.bind("testing", &testing);
    testing.bind("assert_close", &assert_close);

    let autograd = keys.put("torch.autograd", HostObject::namespace("torch.autograd"));
    let grad = keys.put(
        "torch.autograd.grad",
        HostObject::function("torch.autograd", "grad"),
    );
    torch.bind("autograd", &autograd);
    autograd.bind("grad", &grad);

    let dtype = keys.put("torch.dtype", HostObject::class(Some("torch"), "dtype"));
    let float32 = keys.put("torch.float32", HostObject::instance(&dtype, None, "float32"));
    let storage_type = keys.put(
        "torch._StorageType",
        HostObject::class(Some("torch"), "_StorageType"),
    );
    let float_storage = keys.put(
        "torch.FloatStorage",
        HostObject::other(None, "FloatStorage", Some(&storage_type), true, false),
    );
    torch.bind("dtype", &dtype);
    torch.bind("float32", &float32);
    torch.bind("FloatStorage", &float_storage);

    let tensor = keys.put("torch.Tensor", HostObject::class(Some("torch"), "Tensor"));
    let tensor_add = keys.put("torch.Tensor.add", HostObject::method(None, "add"));
    let tensor_relu = keys.put("torch.Tensor.relu", HostObject::method(None, "relu"));
    let tensor_ndim = keys.put("torch.Tensor.ndim", HostObject::constant(None, "ndim"));
    tensor.bind("add", &tensor_add);
    tensor.bind("relu", &tensor_relu);
    tensor.bind("ndim", &tensor_ndim);
    torch.bind("Tensor", &tensor);

    let is_compiling = keys.put(
        "torch.compiler.is_compiling",
        HostObject::function("torch.compiler", "is_compiling"),
    );
    let is_fx_tracing = keys.put(
        "torch.fx._symbolic_trace.is_fx_tracing",
        HostObject::function("torch.fx._symbolic_trace", "is_fx_tracing"),
    );
    keys.put(
        "torch.ops.aten",
        HostObject::dispatch_wrapper(DispatchKind::OperatorNamespace, Some("torch._ops"), "aten"),
    );
    keys.put(
        "torch.ops.aten.add",
        HostObject::dispatch_wrapper(DispatchKind::OverloadPacket, Some("torch._ops"), "add"),
    );

    let math = keys.put("math", HostObject::namespace("math"));
    let sin = keys.put("math.sin", HostObject::function("math", "sin"));
    let pi = keys.put("math.pi", HostObject::constant(None, "pi"));
    math.bind("sin", &sin);
    math.bind("pi", &pi);

    let builtins = keys.put("builtins", HostObject::namespace("builtins"));
    let len = keys.put("builtins.len", HostObject::native_function("len"));
    let dict = keys.put("builtins.dict", HostObject::class(Some("builtins"), "dict"));
    let true_value = keys.put("builtins.True", HostObject::constant(None, "True"));
    let import = keys.put("builtins.__import__", HostObject::native_function("__import__"));
    builtins.bind("len", &len);
    builtins.bind("dict", &dict);
    builtins.bind("True", &true_value);
    builtins.bind("__import__", &import);

    let operator = keys.put("operator", HostObject::namespace("operator"));
    let op_add = keys.put("operator.add", HostObject::native_function("add"));
    let op_mul = keys.put("operator.mul", HostObject::native_function("mul"));
    operator.bind("add", &op_add);
    operator.bind("mul", &op_mul);

    let chain = keys.put("itertools.chain", HostObject::class(Some("itertools"), "chain"));
    let islice = keys.put("itertools.islice", HostObject::class(Some("itertools"), "islice"));
    let reduce = keys.put("functools.reduce", HostObject::function("functools", "reduce"));

    let numpy = keys.put("numpy", HostObject::namespace("numpy"));
    let np_random = keys.put("numpy.random", HostObject::namespace("numpy.random"));
    let ndarray = keys.put("numpy.ndarray", HostObject::class(Some("numpy"), "ndarray"));
    let np_sum = keys.put("numpy.sum", HostObject::function("numpy", "sum"));
    let np_ones = keys.put(
        "numpy.ones",
        HostObject::function("numpy.core.numeric", "ones"),
    );
    let np_normal = keys.put(
        "numpy.random.normal",
        HostObject::function("numpy.random", "normal"),
    );
    keys.put(
        "numpy.example_array",
        HostObject::instance(&ndarray, None, "example_array"),
    );
    numpy.bind("ndarray", &ndarray);
    numpy.bind("sum", &np_sum);
    numpy.bind("ones", &np_ones);
    numpy.bind("random", &np_random);
    np_random.bind("normal", &np_normal);

    let einops = keys.put("einops", HostObject::namespace("einops"));
    let rearrange = keys.put(
        "einops.rearrange",
        HostObject::function("einops.einops", "rearrange"),
    );
    let repeat = keys.put("einops.repeat", HostObject::function("einops.einops", "repeat"));
    einops.bind("rearrange", &rearrange);
    einops.bind("repeat", &repeat);

    keys.put("user.fused_gelu", HostObject::function("user", "fused_gelu"));
    keys.put("user.CONFIG", HostObject::constant(Some("user"), "CONFIG"));

    let surface = HostSurface {
        roots: vec![torch, math],
        core_value_type: Some(tensor),
        disallowed_defaults: vec![grad, true_value],
        disallowed_instance_types: vec![dtype, storage_type],
        tracer_utilities: vec![is_fx_tracing, is_compiling],
        builtins: Some(builtins),
        operator: Some(operator),
        iterator_utilities: vec![chain, islice],
        reduce: Some(reduce),
        numeric_library: Some(numpy),
        numeric_random: Some(np_random),
        numeric_array_type: Some(ndarray),
        extension_library: Some(einops),
    };
    ToyHost {
        image: HostImage::new(surface, keys.0),
        config: RegistryConfig::default(),
    }
}

// ─── cyclic ─────────────────────────────────────────────────────────────────

fn cyclic() -> ToyHost {
    let mut keys = Keys::default();
    let root = keys.put("R", HostObject::namespace("R"));
    let child = keys.put("R.loop", HostObject::namespace("R.loop"));
    let f = keys.put("R.loop.f", HostObject::function("R.loop", "f"));
    root.bind("loop", &child);
    root.bind("itself", &root);
    child.bind("f", &f);
    child.bind("parent", &root);
    child.bind("again", &child);

    ToyHost {
        image: HostImage::new(
            HostSurface {
                roots: vec![root],
                ..HostSurface::default()
            },
            keys.0,
        ),
        config: config(&["R"], &[], &[]),
    }
}

// ─── policy_split ───────────────────────────────────────────────────────────

fn policy_split() -> ToyHost {
    let mut keys = Keys::default();
    let root = keys.put("R", HostObject::namespace("R"));
    let a = keys.put("A", HostObject::namespace("A"));
    let sub = keys.put("A.sub", HostObject::namespace("A.sub"));
    let f = keys.put("A.f", HostObject::function("A", "f"));
    let g = keys.put("A.sub.g", HostObject::function("A.sub", "g"));
    root.bind("A", &a);
    a.bind("f", &f);
    a.bind("sub", &sub);
    sub.bind("g", &g);
    // Second path to g through an allowed parent.
    a.bind("g", &g);

    ToyHost {
        image: HostImage::new(
            HostSurface {
                roots: vec![root],
                ..HostSurface::default()
            },
            keys.0,
        ),
        config: config(&["R", "A"], &[], &["A.sub."]),
    }
}
