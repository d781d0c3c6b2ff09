//! # Tracegate Kernel
//!
//! Callable classification for a tracing compiler front-end: given a host's
//! live operator surface, decide which callables may be placed as opaque
//! nodes in an extracted graph, which must be traced into, and which must
//! never be captured at all.
//!
//! Sets are keyed by object identity, never by name. Every set is built
//! lazily, exactly once, on first query, and may be reset.
//!
//! ## Architecture
//!
//! ```text
//! HostImage / HostSurface   ← Objects, bindings and the well-known namespaces
//!     │
//! RegistryConfig            ← Roots, denied module prefixes, ignore prefixes
//!     │
//! Collector                 ← DefaultDenials, FrameworkOperators, built-ins, numeric
//!     │
//! ClassificationSet         ← Lazy identity → display-name map
//!     │
//! Registry                  ← Queries, overrides, reset, fingerprint
//! ```

pub mod collectors;
pub mod config;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod object;
pub mod registry;
pub mod set;
pub mod surface;
pub mod toy;

pub use config::{ConfigError, ModulePolicy, OverrideConfig, RegistryConfig};
pub use error::{RegistryError, UsageError};
pub use identity::ObjectId;
pub use manifest::{HostManifest, ManifestError, load_host_manifest, parse_host_manifest};
pub use object::{DispatchKind, HostObject, Obj, ObjectKind};
pub use registry::{CallDecision, Classification, GraphTarget, Registry, global, install_global};
pub use set::{ClassificationSet, Collector, IdentityNames};
pub use surface::{HostImage, HostSurface};
