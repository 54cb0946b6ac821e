//! WASM bindings for MTA Rust GoContext
//!
//! Browsers have no filesystem to walk, so these bindings work on source
//! text handed in by the caller: sanitize it, or read its package header.

use mta_rust_gocontext_core::{parse_source, ImportanceRules, Sanitizer, ScanPolicy};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Options accepted by `sanitize_source`. Missing fields use the defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmSanitizeOptions {
    pub policy: ScanPolicy,
    pub importance: ImportanceRules,
}

/// Result envelope returned to JavaScript
#[derive(Debug, Serialize, Deserialize)]
pub struct WasmResult {
    pub success: bool,
    pub data: Option<String>,
    pub error: Option<String>,
}

impl WasmResult {
    fn ok(data: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    fn into_js(self) -> JsValue {
        serde_wasm_bindgen::to_value(&self).unwrap_or(JsValue::NULL)
    }
}

/// Strip comments and compact whitespace in a Go source string.
///
/// `options` may be `undefined` or `null` for the default policy.
#[wasm_bindgen]
pub fn sanitize_source(source: &str, options: JsValue) -> JsValue {
    let options = if options.is_undefined() || options.is_null() {
        WasmSanitizeOptions::default()
    } else {
        match serde_wasm_bindgen::from_value(options) {
            Ok(options) => options,
            Err(e) => return WasmResult::err(format!("invalid options: {e}")).into_js(),
        }
    };

    WasmResult::ok(sanitize_with(source, options)).into_js()
}

/// Parse a Go source string and return its package name and imports as JSON
#[wasm_bindgen]
pub fn parse_go_source(source: &str) -> JsValue {
    parse_header(source).into_js()
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn sanitize_with(source: &str, options: WasmSanitizeOptions) -> String {
    Sanitizer::new(options.policy, options.importance).sanitize(source)
}

fn parse_header(source: &str) -> WasmResult {
    match parse_source(source) {
        Ok(header) => match serde_json::to_string(&header) {
            Ok(json) => WasmResult::ok(json),
            Err(e) => WasmResult::err(e),
        },
        Err(e) => WasmResult::err(e),
    }
}
