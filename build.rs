// Stamps the crate version into the binary and the HTTP user agent.
// A release pipeline may override the patch segment with LALA_PATCH_VERSION.

use std::env;

fn stamped_version(version: &str, patch_override: Option<String>) -> Result<String, String> {
    let segments: Vec<&str> = version.splitn(3, '.').collect();
    let [major, minor, patch] = segments.as_slice() else {
        return Err(format!("expected MAJOR.MINOR.PATCH, got {}", version));
    };
    let patch = match patch_override {
        Some(value) if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() => value,
        Some(value) => return Err(format!("LALA_PATCH_VERSION must be numeric, got {}", value)),
        None => (*patch).to_string(),
    };
    Ok(format!("{}.{}.{}", major, minor, patch))
}

fn main() {
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let stamped = match stamped_version(&version, env::var("LALA_PATCH_VERSION").ok()) {
        Ok(stamped) => stamped,
        Err(message) => panic!("cannot stamp version: {}", message),
    };

    println!("cargo:rustc-env=LALA_SOLR_VERSION={}", stamped);
    println!("cargo:rustc-env=LALA_SOLR_USER_AGENT=lala-solr/{}", stamped);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=LALA_PATCH_VERSION");
}
