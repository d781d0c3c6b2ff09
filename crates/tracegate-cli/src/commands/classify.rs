use crate::cli::HostArgs;
use crate::support::{load_host_or_exit, print_json_or_exit};
use serde_json::json;
use tracegate_kernel::{CallDecision, Classification};

const CLASSIFY_KIND: &str = "tracegate.classify.v1";

pub fn run(keys: Vec<String>, host: HostArgs, json_output: bool) {
    let loaded = load_host_or_exit(&host);

    let mut rows: Vec<(String, Classification)> = Vec::with_capacity(keys.len());
    for key in keys {
        let obj = loaded.image.object(&key).unwrap_or_else(|| {
            eprintln!("error: unknown host object key `{key}` in {}", loaded.source);
            std::process::exit(1);
        });
        let classification = loaded.registry.classify(obj);
        rows.push((key, classification));
    }

    if json_output {
        let items: Vec<_> = rows
            .iter()
            .map(|(key, classification)| json!({ "key": key, "classification": classification }))
            .collect();
        let payload = json!({
            "schema": 1,
            "kind": CLASSIFY_KIND,
            "source": loaded.source,
            "fingerprint": loaded.registry.fingerprint(),
            "items": items,
        });
        print_json_or_exit(&payload, "classify");
        return;
    }

    println!("tracegate classify");
    println!("  Source: {}", loaded.source);
    for (key, classification) in &rows {
        let name = classification.display_name.as_deref().unwrap_or("-");
        println!(
            "  {key}: {} (allowed: {}, name: {name})",
            decision_label(classification),
            classification.allowed
        );
    }
}

fn decision_label(classification: &Classification) -> &'static str {
    match classification.decision {
        CallDecision::Opaque => "opaque",
        CallDecision::Inline => "inline",
        CallDecision::Forbidden => "forbidden",
    }
}
