use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read config: {p}"))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {p}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    Ok(finish(merged)?)
}

/// Same as [`load_layered_yaml`] but over in-memory strings, used to merge
/// an optional per-document config overlay on top of the process-wide file
/// layers without a filesystem round-trip.
pub fn merge_layered_yaml_str(layers: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for s in layers {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(s).context("parse yaml layer")?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }
    finish(merged)
}

fn finish(merged: Value) -> Result<LoadedConfig> {
    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Deep-merge: objects merge recursively; arrays replaced; scalars overwritten.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting compact JSON.
fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_merge_overrides_scalars_and_merges_objects() {
        let base = "a: 1\nb:\n  c: 2\n  d: 3\n";
        let overlay = "b:\n  c: 20\ne: 5\n";
        let merged = merge_layered_yaml_str(&[base, overlay]).unwrap();
        assert_eq!(merged.config_json["a"], 1);
        assert_eq!(merged.config_json["b"]["c"], 20);
        assert_eq!(merged.config_json["b"]["d"], 3);
        assert_eq!(merged.config_json["e"], 5);
    }

    #[test]
    fn hash_is_stable_regardless_of_key_order() {
        let a = merge_layered_yaml_str(&["a: 1\nb: 2\n"]).unwrap();
        let b = merge_layered_yaml_str(&["b: 2\na: 1\n"]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }
}
