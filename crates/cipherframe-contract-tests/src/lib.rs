#![warn(missing_docs)]
//! # cipherframe-contract-tests
//!
//! ## Purpose
//! Loads the frozen wire contracts under `contracts/` for schema tests.
//!
//! ## Responsibilities
//! - Resolve contract and fixture paths relative to the workspace root.
//! - Compile JSON schemas into validators.
//!
//! ## Error model
//! Helpers are test support and panic on unreadable or invalid files.

use std::path::PathBuf;

use jsonschema::JSONSchema;
use serde_json::Value;

/// Absolute path of `contracts/<relative>`.
pub fn contract_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../contracts")
        .join(relative)
}

/// Reads and parses one JSON file under `contracts/`.
pub fn load_json(relative: &str) -> Value {
    let path = contract_path(relative);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|error| panic!("{} should be readable: {error}", path.display()));
    serde_json::from_str(&raw)
        .unwrap_or_else(|error| panic!("{} should be valid json: {error}", path.display()))
}

/// Compiles the schema at `contracts/<schema>`.
pub fn compile_validator(schema: &str) -> JSONSchema {
    let schema = load_json(schema);
    JSONSchema::compile(&schema).unwrap_or_else(|error| panic!("schema should compile: {error}"))
}
