//! JSON message catalog translation.
//!
//! Catalogs are flattened to `path -> leaf` pairs, the string and list leaves
//! are sent to the model in bounded batches, and the result is rebuilt into
//! the source's nested shape. With an existing translation only the leaves it
//! lacks are sent, so a complete catalog costs no model calls at all.

use super::TranslatorSettings;
use crate::error::TranslateError;
use crate::llm::ChatModel;
use anyhow::Result;
use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Joins key path segments in flattened keys.
pub const KEY_SEPARATOR: &str = "|~|";

/// Flatten nested objects into single-level `a|~|b|~|c` keys.
///
/// Strings, numbers, booleans, nulls, lists and empty objects are leaves.
pub fn flatten(nested: &Map<String, Value>) -> Map<String, Value> {
    fn walk(prefix: Option<&str>, map: &Map<String, Value>, out: &mut Map<String, Value>) {
        for (key, value) in map {
            let path = match prefix {
                Some(prefix) => format!("{}{}{}", prefix, KEY_SEPARATOR, key),
                None => key.clone(),
            };
            match value {
                Value::Object(child) if !child.is_empty() => walk(Some(path.as_str()), child, out),
                leaf => {
                    out.insert(path, leaf.clone());
                }
            }
        }
    }

    let mut out = Map::new();
    walk(None, nested, &mut out);
    out
}

/// Rebuild nested objects from flattened keys.
///
/// A leaf that sits where a later key needs an object is replaced by that
/// object.
pub fn unflatten(flat: &Map<String, Value>) -> Map<String, Value> {
    let mut root = Map::new();
    for (key, value) in flat {
        let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        insert_path(&mut root, &parts, value.clone());
    }
    root
}

fn insert_path(root: &mut Map<String, Value>, parts: &[&str], value: Value) {
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = root;
    for part in parents {
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Some(next) = slot.as_object_mut() else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

/// Leaves worth sending to the model.
fn is_translatable(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_))
}

/// Reorder top-level keys to follow the source catalog.
///
/// Keys the source does not have are dropped.
pub fn order_like_source(
    source: &Map<String, Value>,
    mut translated: Map<String, Value>,
) -> Map<String, Value> {
    source
        .keys()
        .filter_map(|key| translated.remove(key).map(|value| (key.clone(), value)))
        .collect()
}

/// Serialize a catalog the way the content tree stores it.
pub fn render(catalog: &Map<String, Value>) -> Result<String, TranslateError> {
    let mut text = serde_json::to_string_pretty(catalog)?;
    text.push('\n');
    Ok(text)
}

fn system_prompt(source_name: &str, target_name: &str) -> String {
    format!(
        "You are a professional translation engine fluent in many languages. \
         Translate every VALUE of the following JSON object from {} to {}. \
         Keep every KEY and the JSON structure exactly as they are. \
         Return only the translated JSON object, without explanations or code fences.",
        source_name, target_name
    )
}

/// Unwrap a reply that arrived inside a Markdown code fence.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Translate a parsed catalog.
///
/// Batches whose reply is not a JSON object are dropped with a warning and
/// their keys stay untranslated. Model errors propagate so the caller can
/// retry the whole locale.
pub async fn translate_catalog<M: ChatModel>(
    model: &M,
    settings: &TranslatorSettings,
    source: &Map<String, Value>,
    existing: Option<&Map<String, Value>>,
    source_name: &str,
    target_name: &str,
) -> Result<Map<String, Value>> {
    let flat_source = flatten(source);
    let flat_existing = existing.map(flatten).unwrap_or_default();
    if existing.is_some() {
        info!("Existing translation found, sending only missing keys");
    }

    let pending: Vec<(&String, &Value)> = flat_source
        .iter()
        .filter(|(key, value)| is_translatable(value) && !flat_existing.contains_key(*key))
        .collect();
    info!("{} of {} entries need translation", pending.len(), flat_source.len());

    let system_prompt = system_prompt(source_name, target_name);
    let chunk_size = settings.chunk_size.max(1);
    let batch_count = pending.len().div_ceil(chunk_size);
    let mut translated = Map::new();

    for (batch_index, batch) in pending.chunks(chunk_size).enumerate() {
        if batch_index > 0 && !settings.batch_delay.is_zero() {
            sleep(settings.batch_delay).await;
        }
        info!(
            "[{}/{}] Translating batch of {} entries",
            batch_index + 1,
            batch_count,
            batch.len()
        );

        let chunk: Map<String, Value> = batch
            .iter()
            .map(|(key, value)| ((*key).clone(), (*value).clone()))
            .collect();
        let user_prompt = settings.user_prompt(serde_json::to_string_pretty(&chunk)?);

        let reply = model.complete(&system_prompt, &user_prompt).await?;
        match serde_json::from_str::<Map<String, Value>>(strip_code_fence(&reply)) {
            Ok(result) => {
                for (key, value) in result {
                    if chunk.contains_key(&key) {
                        translated.insert(key, value);
                    } else {
                        debug!("Ignoring unexpected key '{}' in batch reply", key);
                    }
                }
            }
            Err(e) => {
                warn!(
                    "[{}/{}] ✗ Batch reply is not a valid JSON object ({}), skipping batch",
                    batch_index + 1,
                    batch_count,
                    e
                );
            }
        }
    }

    // Source order first: translated > existing > untranslatable source leaf
    let mut merged = Map::new();
    for (key, value) in &flat_source {
        let chosen = translated
            .remove(key)
            .or_else(|| flat_existing.get(key).cloned())
            .or_else(|| (!is_translatable(value)).then(|| value.clone()));
        if let Some(chosen) = chosen {
            merged.insert(key.clone(), chosen);
        }
    }
    for (key, value) in &flat_existing {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }

    Ok(unflatten(&merged))
}

fn parse_catalog(text: &str) -> Result<Map<String, Value>, TranslateError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(TranslateError::NotAnObject),
    }
}

/// Translate a catalog document and render it in source key order.
pub async fn translate_json_document<M: ChatModel>(
    model: &M,
    settings: &TranslatorSettings,
    source_text: &str,
    existing_text: Option<&str>,
    source_name: &str,
    target_name: &str,
) -> Result<String> {
    let source = parse_catalog(source_text)?;
    let existing = existing_text.map(parse_catalog).transpose()?;

    let translated = translate_catalog(
        model,
        settings,
        &source,
        existing.as_ref(),
        source_name,
        target_name,
    )
    .await?;

    Ok(render(&order_like_source(&source, translated))?)
}
