//! Loading the playbook command catalog.
//!
//! The catalog is a JSON file produced by the metadata extraction tool. Its
//! canonical shape is `{"commands": {"pb-start": {...}}}`, but a `commands`
//! array, a bare array, or a bare name -> entry object are accepted too.
//! Malformed entries are skipped and reported as warnings; a catalog with no
//! valid entry at all is rejected.

use crate::error::{PlaybookError, Result};
use crate::types::Tier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

pub const METADATA_FILE: &str = ".playbook-metadata.json";

const REQUIRED_FIELDS: [&str; 3] = ["title", "category", "purpose"];
const DEFAULT_TIME_ESTIMATE: &str = "varies";

// ---------------------------------------------------------------------------
// CommandDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub title: String,
    pub category: String,
    pub purpose: String,
    pub time_estimate: String,
    #[serde(default)]
    pub related_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable name -> descriptor map, ordered by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    commands: BTreeMap<String, CommandDescriptor>,
}

impl Catalog {
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = CommandDescriptor>) -> Self {
        let mut commands = BTreeMap::new();
        for d in descriptors {
            commands.entry(d.name.clone()).or_insert(d);
        }
        Self { commands }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// A non-fatal problem with one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataWarning {
    pub entry: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub warnings: Vec<MetadataWarning>,
}

pub fn load(path: &Path) -> Result<LoadedCatalog> {
    if !path.is_file() {
        return Err(PlaybookError::MetadataNotFound(path.to_path_buf()));
    }
    let data = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PlaybookError::MetadataNotFound(path.to_path_buf()),
        _ => PlaybookError::MetadataInvalid(format!("cannot read {}: {e}", path.display())),
    })?;
    let loaded = parse(&data)?;
    for w in &loaded.warnings {
        tracing::warn!(entry = %w.entry, "skipping metadata problem: {}", w.message);
    }
    tracing::info!(
        commands = loaded.catalog.len(),
        path = %path.display(),
        "loaded playbook metadata"
    );
    Ok(loaded)
}

pub fn parse(data: &str) -> Result<LoadedCatalog> {
    let value: Value = serde_json::from_str(data)
        .map_err(|e| PlaybookError::MetadataInvalid(format!("malformed JSON: {e}")))?;

    let raw = raw_entries(&value)?;
    if raw.is_empty() {
        return Err(PlaybookError::MetadataInvalid(
            "catalog contains no command entries".to_string(),
        ));
    }

    let total = raw.len();
    let mut warnings = Vec::new();
    let mut commands: BTreeMap<String, CommandDescriptor> = BTreeMap::new();

    for (index, (key, entry)) in raw.into_iter().enumerate() {
        let label = entry_label(index, key.as_deref(), entry);
        match parse_entry(key.as_deref(), entry, &label, &mut warnings) {
            Ok(desc) => {
                if commands.contains_key(&desc.name) {
                    warnings.push(MetadataWarning {
                        entry: label,
                        message: format!("duplicate command '{}', keeping the first", desc.name),
                    });
                } else {
                    commands.insert(desc.name.clone(), desc);
                }
            }
            Err(message) => warnings.push(MetadataWarning {
                entry: label,
                message,
            }),
        }
    }

    if commands.is_empty() {
        let first = warnings
            .first()
            .map(|w| format!("{}: {}", w.entry, w.message))
            .unwrap_or_default();
        return Err(PlaybookError::MetadataInvalid(format!(
            "none of the {total} catalog entries is valid (first problem: {first})"
        )));
    }

    for desc in commands.values() {
        for related in &desc.related_commands {
            if !commands.contains_key(related) {
                warnings.push(MetadataWarning {
                    entry: desc.name.clone(),
                    message: format!("related command '{related}' is not in the catalog"),
                });
            }
        }
    }

    Ok(LoadedCatalog {
        catalog: Catalog { commands },
        warnings,
    })
}

fn raw_entries(value: &Value) -> Result<Vec<(Option<String>, &Value)>> {
    match value {
        Value::Object(map) => match map.get("commands") {
            Some(Value::Object(cmds)) => Ok(keyed(cmds)),
            Some(Value::Array(items)) => Ok(items.iter().map(|v| (None, v)).collect()),
            Some(_) => Err(PlaybookError::MetadataInvalid(
                "`commands` must be an object or an array".to_string(),
            )),
            None => Ok(keyed(map)),
        },
        Value::Array(items) => Ok(items.iter().map(|v| (None, v)).collect()),
        _ => Err(PlaybookError::MetadataInvalid(
            "catalog root must be a JSON object or array".to_string(),
        )),
    }
}

fn keyed(map: &Map<String, Value>) -> Vec<(Option<String>, &Value)> {
    map.iter().map(|(k, v)| (Some(k.clone()), v)).collect()
}

fn entry_label(index: usize, key: Option<&str>, entry: &Value) -> String {
    non_empty_str(entry, "name")
        .or_else(|| non_empty_str(entry, "command"))
        .map(str::to_string)
        .or_else(|| key.map(str::to_string))
        .unwrap_or_else(|| format!("#{index}"))
}

fn non_empty_str<'a>(entry: &'a Value, field: &str) -> Option<&'a str> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn command_name(raw: &str) -> String {
    raw.trim().trim_start_matches('/').to_string()
}

fn parse_entry(
    key: Option<&str>,
    entry: &Value,
    label: &str,
    warnings: &mut Vec<MetadataWarning>,
) -> std::result::Result<CommandDescriptor, String> {
    if !entry.is_object() {
        return Err("entry is not a JSON object".to_string());
    }

    let name = non_empty_str(entry, "name")
        .or_else(|| non_empty_str(entry, "command"))
        .or(key)
        .map(command_name)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "missing required field `name`".to_string())?;

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| non_empty_str(entry, f).is_none())
        .collect();
    if !missing.is_empty() {
        let fields = missing
            .iter()
            .map(|f| format!("`{f}`"))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!("missing required field(s) {fields}"));
    }

    let tier = parse_tier(entry.get("tier"), label, warnings);

    let time_estimate = non_empty_str(entry, "time_estimate")
        .map(str::to_string)
        .or_else(|| tier.map(|t| t.time_estimate().to_string()))
        .unwrap_or_else(|| DEFAULT_TIME_ESTIMATE.to_string());

    let related_commands = match entry.get("related_commands") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut related: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(command_name)
                .filter(|n| !n.is_empty() && *n != name)
                .collect();
            related.sort();
            related.dedup();
            related
        }
        Some(_) => {
            warnings.push(MetadataWarning {
                entry: label.to_string(),
                message: "`related_commands` is not an array, ignoring it".to_string(),
            });
            Vec::new()
        }
    };

    Ok(CommandDescriptor {
        name,
        title: field(entry, "title"),
        category: field(entry, "category"),
        purpose: field(entry, "purpose"),
        time_estimate,
        related_commands,
        tier,
    })
}

fn field(entry: &Value, name: &str) -> String {
    non_empty_str(entry, name).unwrap_or_default().to_string()
}

/// `tier` is either `"S"` or `["S", "M"]`; the first element wins.
fn parse_tier(
    value: Option<&Value>,
    label: &str,
    warnings: &mut Vec<MetadataWarning>,
) -> Option<Tier> {
    let raw = match value? {
        Value::String(s) => s.as_str(),
        Value::Array(items) => items.first()?.as_str()?,
        Value::Null => return None,
        _ => {
            warnings.push(MetadataWarning {
                entry: label.to_string(),
                message: "`tier` is neither a string nor an array, ignoring it".to_string(),
            });
            return None;
        }
    };
    let tier = Tier::parse(raw);
    if tier.is_none() {
        warnings.push(MetadataWarning {
            entry: label.to_string(),
            message: format!("unknown tier '{raw}', expected XS, S, M or L"),
        });
    }
    tier
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
