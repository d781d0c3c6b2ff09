use crate::cli::HostArgs;
use tracegate_kernel::toy::{TOY_HOSTS, get_host};
use tracegate_kernel::{HostImage, Registry, RegistryConfig, load_host_manifest};
use tracing::info;

/// A host image with a registry built over it and overrides applied.
pub struct LoadedHost {
    pub source: String,
    pub image: HostImage,
    pub registry: Registry,
}

pub fn load_host_or_exit(args: &HostArgs) -> LoadedHost {
    let (source, image, default_config) = match (&args.manifest, &args.toy) {
        (Some(path), _) => {
            let image = load_host_manifest(path).unwrap_or_else(|e| {
                eprintln!("error: failed to load host manifest: {e}");
                std::process::exit(1);
            });
            (path.clone(), image, RegistryConfig::default())
        }
        (None, Some(name)) => {
            let host = get_host(name).unwrap_or_else(|| {
                eprintln!(
                    "error: unknown toy host `{name}` (expected one of: {})",
                    TOY_HOSTS.join(", ")
                );
                std::process::exit(1);
            });
            (format!("toy:{name}"), host.image, host.config)
        }
        (None, None) => {
            eprintln!("error: one of --manifest or --toy is required");
            std::process::exit(1);
        }
    };

    let config = match &args.config {
        Some(path) => RegistryConfig::load(path).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        }),
        None => default_config,
    };

    let registry = Registry::new(image.surface.clone(), &config);
    if let Err(e) = registry.apply_overrides(&image, &config.overrides) {
        eprintln!("error: failed to apply overrides: {e}");
        std::process::exit(1);
    }
    info!(source = %source, objects = image.len(), "host loaded");

    LoadedHost {
        source,
        image,
        registry,
    }
}

pub fn print_json_or_exit(payload: &serde_json::Value, label: &str) {
    let rendered = serde_json::to_string_pretty(payload).unwrap_or_else(|err| {
        eprintln!("error: failed to render {label} payload: {err}");
        std::process::exit(2);
    });
    println!("{rendered}");
}
