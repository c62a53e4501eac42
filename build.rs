use std::{env, fs, path::Path};

const DEFAULT_DATA_DIR: &str = ".task-forest";

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let cargo_toml_path = Path::new(&manifest_dir).join("Cargo.toml");
    println!("cargo:rerun-if-changed={}", cargo_toml_path.display());

    let content = fs::read_to_string(&cargo_toml_path)
        .unwrap_or_else(|e| panic!("Failed to read Cargo.toml: {e}"));
    let parsed: toml::Value =
        toml::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse Cargo.toml: {e}"));
    let pkg = parsed
        .get("package")
        .and_then(|p| p.as_table())
        .expect("Cargo.toml missing [package]");

    let field = |key: &str, fallback: &'static str| -> String {
        pkg.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string()
    };
    let name = field("name", "task-forest");
    let version = field("version", "0.0.0");
    let description = field("description", "");

    // [package.metadata.task-forest] data-dir = "..."
    let data_dir = pkg
        .get("metadata")
        .and_then(|m| m.get("task-forest"))
        .and_then(|t| t.get("data-dir"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_DATA_DIR);

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest = Path::new(&out_dir).join("pkg_info.rs");
    let contents = format!(
        "pub const PKG_NAME: &str = {name:?};\n\
         pub const PKG_VERSION: &str = {version:?};\n\
         pub const PKG_DESCRIPTION: &str = {description:?};\n\
         pub const DATA_DIR_NAME: &str = {data_dir:?};\n"
    );
    fs::write(&dest, contents).expect("Failed to write pkg_info.rs");
}
