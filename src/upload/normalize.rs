//! Turns the storage API's response bodies into `RemoteAsset`s.
//!
//! The backend is inconsistent about where it puts things. The payload may
//! be wrapped in an envelope and the public URL may live under one of
//! several keys. Both are resolved by trying fixed candidate lists in order;
//! the first present, non-empty value wins.

use super::types::{AssetPage, RemoteAsset};
use crate::error::TransferError;
use serde::Deserialize;
use serde_json::Value;

/// Where the payload may sit, most specific first. The empty path is the
/// body itself.
pub const ENVELOPE_PATHS: &[&[&str]] = &[&["edge", "data"], &["edge"], &["data"], &[]];

pub const URL_FIELDS: &[&str] = &["file_url", "secure_url", "url"];
pub const NAME_FIELDS: &[&str] = &["original_name", "filename", "name"];
pub const TYPE_FIELDS: &[&str] = &["mimetype", "type"];

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .filter(|v| is_present(v))
}

pub fn unwrap_envelope(body: &Value) -> &Value {
    ENVELOPE_PATHS
        .iter()
        .find_map(|path| lookup(body, path))
        .unwrap_or(body)
}

fn first_string(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match value.get(*field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}

fn id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn asset_from_value(value: &Value) -> Result<RemoteAsset, TransferError> {
    let id = id_of(value).ok_or_else(|| {
        TransferError::MalformedResponse("response does not contain an asset id".to_string())
    })?;

    Ok(RemoteAsset {
        id,
        url: first_string(value, URL_FIELDS).unwrap_or_default(),
        name: first_string(value, NAME_FIELDS),
        size: value.get("size").and_then(Value::as_u64),
        mime_type: first_string(value, TYPE_FIELDS),
    })
}

fn parse_json(body: &[u8]) -> Result<Value, TransferError> {
    serde_json::from_slice(body).map_err(|e| TransferError::MalformedResponse(e.to_string()))
}

/// List entries come as `{ node, data }` edges; bare assets are accepted too.
fn edge_payload(item: &Value) -> &Value {
    if id_of(item).is_none() {
        if let Some(data) = lookup(item, &["data"]) {
            return data;
        }
    }
    item
}

pub fn parse_upload(body: &[u8]) -> Result<RemoteAsset, TransferError> {
    let value = parse_json(body)?;
    asset_from_value(unwrap_envelope(&value))
}

pub fn parse_upload_many(body: &[u8]) -> Result<Vec<RemoteAsset>, TransferError> {
    let value = parse_json(body)?;
    match unwrap_envelope(&value) {
        Value::Array(items) => items
            .iter()
            .map(|item| asset_from_value(edge_payload(item)))
            .collect(),
        single => Ok(vec![asset_from_value(single)?]),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metadata {
    offset: u64,
    limit: u64,
    total_items: u64,
    total_pages: u64,
    has_next: bool,
    has_previous: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Paginated {
    metadata: Metadata,
    edges: Vec<Value>,
}

pub fn parse_page(body: &[u8], offset: u64, limit: u64) -> Result<AssetPage, TransferError> {
    let value = parse_json(body)?;
    let data = lookup(&value, &["data"]).unwrap_or(&value);

    if let Value::Array(items) = data {
        let items = items
            .iter()
            .map(|item| asset_from_value(edge_payload(item)))
            .collect::<Result<Vec<_>, _>>()?;
        let total_items = items.len() as u64;
        return Ok(AssetPage {
            items,
            offset,
            limit,
            total_items,
            total_pages: u64::from(total_items > 0),
            has_next: false,
            has_previous: offset > 0,
        });
    }

    let page: Paginated = serde_json::from_value(data.clone())
        .map_err(|e| TransferError::MalformedResponse(e.to_string()))?;
    let items = page
        .edges
        .iter()
        .map(|edge| asset_from_value(edge_payload(edge)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AssetPage {
        items,
        offset: page.metadata.offset,
        limit: page.metadata.limit,
        total_items: page.metadata.total_items,
        total_pages: page.metadata.total_pages,
        has_next: page.metadata.has_next,
        has_previous: page.metadata.has_previous,
    })
}
