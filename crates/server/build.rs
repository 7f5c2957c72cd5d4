//! Build script for the server crate.
//!
//! Hashes static assets so templates can reference them with a
//! content-based query string (`main.css?v=<hash>`).

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");

    emit_hash(&manifest_dir, "static/css/main.css", "CSS_HASH");
    emit_hash(&manifest_dir, "static/js/notifications.js", "JS_HASH");
}

/// Set `var` to the first 8 hex chars of the file's SHA-256.
///
/// A missing file yields an empty hash and a warning.
fn emit_hash(manifest_dir: &str, relative: &str, var: &str) {
    let path = Path::new(manifest_dir).join(relative);
    println!("cargo:rerun-if-changed={}", path.display());

    let content = match fs::read(&path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {relative}: {e}");
            println!("cargo:rustc-env={var}=");
            return;
        }
    };

    let hash = format!("{:x}", Sha256::digest(&content));
    println!("cargo:rustc-env={var}={}", &hash[..8]);
}
