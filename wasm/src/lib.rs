use ifblock_shape::{
    NullSink, Reconciler, Session, ShapeConfig, ShapeDescriptor, export_mutation,
    parse_mutation_element, render_outline,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeOptions {
    auto_else: Option<bool>,
    max_else_if: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayResult {
    mutation: Option<String>,
    slots: Vec<String>,
    outline: String,
}

fn build_shape_config(options: ShapeOptions) -> ShapeConfig {
    let mut config = ShapeConfig::default();
    if let Some(auto_else) = options.auto_else {
        config.auto_else = auto_else;
    }
    if let Some(max_else_if) = options.max_else_if {
        config.max_else_if = max_else_if;
    }
    config
}

fn parse_options(options_json: Option<String>) -> Result<ShapeOptions, String> {
    match options_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|error| error.to_string()),
        None => Ok(ShapeOptions::default()),
    }
}

fn replay(session_json: &str, config: ShapeConfig) -> Result<ReplayResult, String> {
    let session = Session::parse(session_json).map_err(|error| error.to_string())?;
    let mut replay = session.replay(&config).map_err(|error| error.to_string())?;
    let reconciler = Reconciler::new(config);
    let mutation = export_mutation(&mut replay.shape, &reconciler, &mut NullSink);
    Ok(ReplayResult {
        mutation,
        slots: replay.shape.slot_ids(),
        outline: render_outline(&replay.shape),
    })
}

fn normalize(xml: &str, config: &ShapeConfig) -> Result<String, String> {
    let attrs = parse_mutation_element(xml).map_err(|error| error.to_string())?;
    let descriptor = ShapeDescriptor::from_attributes(&attrs, config);
    Ok(descriptor.to_xml().unwrap_or_default())
}

/// Replays a drag session and returns `{mutation, slots, outline}` as JSON.
#[wasm_bindgen]
pub fn replay_session(session_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = build_shape_config(parse_options(options_json).map_err(|e| JsValue::from_str(&e))?);
    let result = replay(session_json, config).map_err(|e| JsValue::from_str(&e))?;
    serde_json::to_string(&result).map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Rewrites any accepted mutation element in canonical form; empty for the default shape.
#[wasm_bindgen]
pub fn normalize_mutation(xml: &str) -> Result<String, JsValue> {
    normalize(xml, &ShapeConfig::default()).map_err(|e| JsValue::from_str(&e))
}
