//! `discuss doctor` — diagnostic checks, grounded on the teacher's
//! `cli/doctor.rs` (one check function per concern, PASS/FAIL printed
//! inline, an overall boolean returned so `main` can set the exit code).

use discuss_domain::config::Config;
use discuss_providers::ProviderRegistry;

pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("discuss doctor");
    println!("==============\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_store_root(config, &mut all_passed);
    check_providers(config, &mut all_passed).await;

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists { config_path.to_owned() } else { format!("{config_path} not found (using defaults)") },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_store_root(config: &Config, all_passed: &mut bool) {
    let root = std::path::Path::new(&config.store.root);
    let created = std::fs::create_dir_all(root).is_ok();
    let writable = created
        && {
            let probe = root.join(".discuss_doctor_probe");
            let w = std::fs::write(&probe, b"probe").is_ok();
            let _ = std::fs::remove_file(&probe);
            w
        };
    print_check(
        "Store root writable",
        writable,
        if writable { config.store.root.clone() } else { format!("{} (not writable)", config.store.root) },
    );
    if !writable {
        *all_passed = false;
    }
}

async fn check_providers(config: &Config, all_passed: &mut bool) {
    let registry = ProviderRegistry::from_config(&config.providers);
    let init_errors = registry.init_errors();
    let models = registry.list_all_models().await;

    print_check(
        "LLM providers reachable",
        init_errors.is_empty(),
        if init_errors.is_empty() {
            format!("{} model(s) discovered", models.len())
        } else {
            format!("{} provider(s) failed to initialize", init_errors.len())
        },
    );
    for err in init_errors {
        println!("      {}: {}", err.provider_id, err.message);
    }
    if !init_errors.is_empty() {
        *all_passed = false;
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
