//! JSON merge patch (RFC 7386) as applied by the API server

use serde_json::{Map, Value};

/// Apply `patch` onto `target` in place
pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch_nested_and_null_removal() {
        let mut target = json!({ "spec": { "role": "master", "bmc": { "address": "a" } } });
        merge_patch(
            &mut target,
            &json!({ "spec": { "role": null, "owner": { "name": "c1", "namespace": "c1" } } }),
        );
        assert_eq!(
            target,
            json!({ "spec": { "bmc": { "address": "a" }, "owner": { "name": "c1", "namespace": "c1" } } })
        );
    }

    #[test]
    fn test_merge_patch_replaces_non_objects() {
        let mut target = json!({ "data": ["x"] });
        merge_patch(&mut target, &json!({ "data": { "k": "v" } }));
        assert_eq!(target, json!({ "data": { "k": "v" } }));
    }
}
