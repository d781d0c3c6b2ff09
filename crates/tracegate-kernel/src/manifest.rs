//! Host manifest: a JSON description of a host's traceable surface.
//!
//! Hosts that cannot register objects in code describe them here. Objects are
//! declared by key, bindings attach them to namespaces or types, and the
//! `surface` block assigns roles. Keys are only meaningful inside one
//! manifest; the loaded objects get fresh identity tokens.

use crate::object::{DispatchKind, HostObject, Obj, ObjectKind};
use crate::surface::{HostImage, HostSurface};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const HOST_MANIFEST_KIND: &str = "tracegate.host_manifest.v1";
pub const HOST_MANIFEST_SCHEMA: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported manifest schema {found} (expected {expected})")]
    Schema { found: u32, expected: u32 },

    #[error("unsupported manifest kind `{0}`")]
    Kind(String),

    #[error("objects[{index}]: duplicate object key `{key}`")]
    DuplicateKey { index: usize, key: String },

    #[error("{path}: unknown object key `{key}`")]
    UnknownObject { path: String, key: String },

    #[error("{path}: `{key}` is not a namespace or type and cannot hold bindings")]
    NotContainer { path: String, key: String },

    #[error("objects[{index}]: dispatch wrapper `{key}` requires a `dispatch` kind")]
    MissingDispatch { index: usize, key: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectRowKind {
    Namespace,
    Function,
    DispatchWrapper,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRow {
    pub key: String,
    pub kind: ObjectRowKind,
    /// Bound name; defaults to the key (namespaces) or its last segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Key of an earlier object this one is an instance of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchKind>,
    #[serde(default)]
    pub method: bool,
    #[serde(default)]
    pub callable: bool,
    #[serde(default)]
    pub safe_constant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindingRow {
    pub owner: String,
    pub name: String,
    pub object: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SurfaceRow {
    pub roots: Vec<String>,
    pub core_value_type: Option<String>,
    pub disallowed_defaults: Vec<String>,
    pub disallowed_instance_types: Vec<String>,
    pub tracer_utilities: Vec<String>,
    pub builtins: Option<String>,
    pub operator: Option<String>,
    pub iterator_utilities: Vec<String>,
    pub reduce: Option<String>,
    pub numeric_library: Option<String>,
    pub numeric_random: Option<String>,
    pub numeric_array_type: Option<String>,
    pub extension_library: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostManifest {
    pub schema: u32,
    pub manifest_kind: String,
    pub objects: Vec<ObjectRow>,
    #[serde(default)]
    pub bindings: Vec<BindingRow>,
    #[serde(default)]
    pub surface: SurfaceRow,
}

pub fn parse_host_manifest(text: &str) -> Result<HostImage, ManifestError> {
    let manifest: HostManifest = serde_json::from_str(text)?;
    manifest.build()
}

pub fn load_host_manifest(path: impl AsRef<Path>) -> Result<HostImage, ManifestError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_host_manifest(&text)
}

fn last_segment(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

struct Resolver<'a> {
    objects: &'a BTreeMap<String, Obj>,
}

impl Resolver<'_> {
    fn one(&self, key: &str, path: impl Into<String>) -> Result<Obj, ManifestError> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| ManifestError::UnknownObject {
                path: path.into(),
                key: key.to_string(),
            })
    }

    fn optional(&self, key: Option<&String>, path: &str) -> Result<Option<Obj>, ManifestError> {
        key.map(|key| self.one(key, path)).transpose()
    }

    fn many(&self, keys: &[String], path: &str) -> Result<Vec<Obj>, ManifestError> {
        keys.iter()
            .enumerate()
            .map(|(idx, key)| self.one(key, format!("{path}[{idx}]")))
            .collect()
    }
}

impl HostManifest {
    /// Register every object, apply bindings, and resolve surface roles.
    pub fn build(&self) -> Result<HostImage, ManifestError> {
        if self.schema != HOST_MANIFEST_SCHEMA {
            return Err(ManifestError::Schema {
                found: self.schema,
                expected: HOST_MANIFEST_SCHEMA,
            });
        }
        if self.manifest_kind != HOST_MANIFEST_KIND {
            return Err(ManifestError::Kind(self.manifest_kind.clone()));
        }

        let mut objects: BTreeMap<String, Obj> = BTreeMap::new();
        for (index, row) in self.objects.iter().enumerate() {
            if objects.contains_key(&row.key) {
                return Err(ManifestError::DuplicateKey {
                    index,
                    key: row.key.clone(),
                });
            }
            let obj = build_object(index, row, &objects)?;
            objects.insert(row.key.clone(), obj);
        }

        let resolver = Resolver { objects: &objects };
        for (idx, binding) in self.bindings.iter().enumerate() {
            let path = format!("bindings[{idx}]");
            let owner = resolver.one(&binding.owner, format!("{path}.owner"))?;
            if !matches!(
                owner.kind(),
                ObjectKind::Namespace | ObjectKind::Other { callable: true, .. }
            ) {
                return Err(ManifestError::NotContainer {
                    path: format!("{path}.owner"),
                    key: binding.owner.clone(),
                });
            }
            let value = resolver.one(&binding.object, format!("{path}.object"))?;
            owner.bind(binding.name.clone(), &value);
        }

        let row = &self.surface;
        let surface = HostSurface {
            roots: resolver.many(&row.roots, "surface.roots")?,
            core_value_type: resolver
                .optional(row.core_value_type.as_ref(), "surface.coreValueType")?,
            disallowed_defaults: resolver
                .many(&row.disallowed_defaults, "surface.disallowedDefaults")?,
            disallowed_instance_types: resolver.many(
                &row.disallowed_instance_types,
                "surface.disallowedInstanceTypes",
            )?,
            tracer_utilities: resolver.many(&row.tracer_utilities, "surface.tracerUtilities")?,
            builtins: resolver.optional(row.builtins.as_ref(), "surface.builtins")?,
            operator: resolver.optional(row.operator.as_ref(), "surface.operator")?,
            iterator_utilities: resolver
                .many(&row.iterator_utilities, "surface.iteratorUtilities")?,
            reduce: resolver.optional(row.reduce.as_ref(), "surface.reduce")?,
            numeric_library: resolver
                .optional(row.numeric_library.as_ref(), "surface.numericLibrary")?,
            numeric_random: resolver.optional(row.numeric_random.as_ref(), "surface.numericRandom")?,
            numeric_array_type: resolver
                .optional(row.numeric_array_type.as_ref(), "surface.numericArrayType")?,
            extension_library: resolver
                .optional(row.extension_library.as_ref(), "surface.extensionLibrary")?,
        };
        Ok(HostImage::new(surface, objects))
    }
}

fn build_object(
    index: usize,
    row: &ObjectRow,
    declared: &BTreeMap<String, Obj>,
) -> Result<Obj, ManifestError> {
    let module = row.module.as_deref();
    let name = row
        .name
        .clone()
        .unwrap_or_else(|| last_segment(&row.key).to_string());
    let obj = match row.kind {
        ObjectRowKind::Namespace => {
            HostObject::namespace(row.name.clone().unwrap_or_else(|| row.key.clone()))
        }
        ObjectRowKind::Function if row.method => HostObject::method(module, name),
        ObjectRowKind::Function => match module {
            Some(module) => HostObject::function(module, name),
            None => HostObject::native_function(name),
        },
        ObjectRowKind::DispatchWrapper => {
            let kind = row.dispatch.ok_or_else(|| ManifestError::MissingDispatch {
                index,
                key: row.key.clone(),
            })?;
            HostObject::dispatch_wrapper(kind, module, name)
        }
        ObjectRowKind::Other => {
            let class = match &row.class {
                Some(key) => Some(declared.get(key).ok_or_else(|| ManifestError::UnknownObject {
                    path: format!("objects[{index}].class"),
                    key: key.clone(),
                })?),
                None => None,
            };
            HostObject::other(module, name, class, row.callable, row.safe_constant)
        }
    };
    Ok(obj)
}
