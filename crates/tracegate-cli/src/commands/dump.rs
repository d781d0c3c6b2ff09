use crate::cli::HostArgs;
use crate::support::{load_host_or_exit, print_json_or_exit};
use serde::Serialize;
use serde_json::json;
use tracegate_kernel::ClassificationSet;

const DUMP_KIND: &str = "tracegate.dump.v1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetDump {
    label: &'static str,
    count: usize,
    names: Vec<String>,
    unnamed: usize,
}

impl SetDump {
    fn of(set: &ClassificationSet) -> Self {
        let snapshot = set.snapshot();
        let mut names: Vec<String> = snapshot.values().flatten().cloned().collect();
        names.sort();
        Self {
            label: set.label(),
            count: snapshot.len(),
            unnamed: snapshot.len() - names.len(),
            names,
        }
    }
}

pub fn run(host: HostArgs, set: Option<String>, json_output: bool) {
    let loaded = load_host_or_exit(&host);

    let dumps: Vec<SetDump> = match &set {
        Some(label) => {
            let selected = loaded.registry.set(label).unwrap_or_else(|| {
                let labels: Vec<&str> = loaded.registry.sets().iter().map(|s| s.label()).collect();
                eprintln!(
                    "error: unknown set `{label}` (expected one of: {})",
                    labels.join(", ")
                );
                std::process::exit(1);
            });
            vec![SetDump::of(selected)]
        }
        None => loaded.registry.sets().into_iter().map(SetDump::of).collect(),
    };
    let fingerprint = loaded.registry.fingerprint();

    if json_output {
        let payload = json!({
            "schema": 1,
            "kind": DUMP_KIND,
            "source": loaded.source,
            "fingerprint": fingerprint,
            "sets": dumps,
        });
        print_json_or_exit(&payload, "dump");
        return;
    }

    println!("tracegate dump");
    println!("  Source: {}", loaded.source);
    println!("  Fingerprint: {fingerprint}");
    for dump in &dumps {
        println!("  {} ({}, {} unnamed)", dump.label, dump.count, dump.unnamed);
        for name in &dump.names {
            println!("    - {name}");
        }
    }
}
