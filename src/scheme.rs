//! Scheme
//!
//! Maps (group, version, kind) to registered type paths and holds the
//! conversion functions between versions of a kind. Objects are carried as
//! JSON values with `apiVersion` and `kind` fields.
//!
//! Conversions between two external versions go through the internal
//! version of the source group, then that of the target group, unless a
//! direct function was registered. Steps without a registered function copy
//! the object field for field.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::debug;

use crate::error::SchemeError;
use crate::version::{GroupVersion, GroupVersionKind};

/// Converts one object representation into another
pub type ConversionFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Maps a (label, value) field selector onto the internal field name
pub type FieldLabelFn = Arc<dyn Fn(&str, &str) -> Result<(String, String), String> + Send + Sync>;

/// Converts objects between versions of the same kind
pub trait ObjectConvertor: Send + Sync {
    /// Convert `obj` to the same kind in `target`
    fn convert_to_version(&self, obj: &Value, target: &GroupVersion) -> Result<Value, SchemeError>;

    /// Convert a field selector label for `kind` in `version`
    fn convert_field_label(
        &self,
        version: &GroupVersion,
        kind: &str,
        label: &str,
        value: &str,
    ) -> Result<(String, String), SchemeError>;
}

#[derive(Default)]
struct SchemeState {
    known_types: HashMap<GroupVersionKind, String>,
    type_to_kinds: HashMap<String, Vec<GroupVersionKind>>,
    conversions: HashMap<(GroupVersionKind, GroupVersionKind), ConversionFn>,
    field_labels: HashMap<(GroupVersion, String), FieldLabelFn>,
}

/// Registry of known types and conversions, shared across API groups
#[derive(Default)]
pub struct Scheme {
    state: RwLock<SchemeState>,
}

impl fmt::Debug for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Scheme")
            .field("known_types", &state.known_types.len())
            .field("conversions", &state.conversions.len())
            .finish()
    }
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SchemeState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SchemeState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `(kind, type_path)` pairs under `gv`.
    ///
    /// Re-registering the same type for a kind is a no-op; a different type
    /// for an existing kind is rejected and nothing from the call is applied.
    pub fn add_known_types(&self, gv: &GroupVersion, types: &[(&str, &str)]) -> Result<(), SchemeError> {
        let mut state = self.write();

        for (kind, type_path) in types {
            let gvk = gv.with_kind(*kind);
            if let Some(existing) = state.known_types.get(&gvk) {
                if existing.as_str() != *type_path {
                    return Err(SchemeError::TypeConflict {
                        gvk,
                        existing: existing.clone(),
                        requested: type_path.to_string(),
                    });
                }
            }
        }

        for (kind, type_path) in types {
            let gvk = gv.with_kind(*kind);
            if state.known_types.contains_key(&gvk) {
                continue;
            }
            debug!(gvk = %gvk, type_path = *type_path, "registering known type");
            state.known_types.insert(gvk.clone(), type_path.to_string());
            state
                .type_to_kinds
                .entry(type_path.to_string())
                .or_default()
                .push(gvk);
        }

        Ok(())
    }

    /// Kinds registered for `gv`, mapped to their type paths
    pub fn known_types(&self, gv: &GroupVersion) -> BTreeMap<String, String> {
        self.read()
            .known_types
            .iter()
            .filter(|(gvk, _)| gvk.group == gv.group && gvk.version == gv.version)
            .map(|(gvk, path)| (gvk.kind.clone(), path.clone()))
            .collect()
    }

    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.read().known_types.contains_key(gvk)
    }

    /// All group/version/kinds a type path is registered under
    pub fn object_kinds(&self, type_path: &str) -> Vec<GroupVersionKind> {
        self.read()
            .type_to_kinds
            .get(type_path)
            .cloned()
            .unwrap_or_default()
    }

    /// Every version with at least one known type in `group`, internal included
    pub fn versions_for_group(&self, group: &str) -> Vec<GroupVersion> {
        self.read()
            .known_types
            .keys()
            .filter(|gvk| gvk.group == group)
            .map(|gvk| gvk.group_version())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn add_conversion_fn<F>(&self, from: GroupVersionKind, to: GroupVersionKind, f: F)
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.write().conversions.insert((from, to), Arc::new(f));
    }

    pub fn add_field_label_conversion_fn<F>(&self, gv: &GroupVersion, kind: &str, f: F)
    where
        F: Fn(&str, &str) -> Result<(String, String), String> + Send + Sync + 'static,
    {
        self.write()
            .field_labels
            .insert((gv.clone(), kind.to_string()), Arc::new(f));
    }

    fn convert_step(&self, obj: &Value, from: &GroupVersionKind, to: &GroupVersionKind) -> Result<Value, SchemeError> {
        let f = self.read().conversions.get(&(from.clone(), to.clone())).cloned();
        let mut out = match f {
            Some(f) => f(obj).map_err(|reason| SchemeError::ConversionFailed {
                from: from.clone(),
                to: to.clone(),
                reason,
            })?,
            None => obj.clone(),
        };
        set_type_meta(&mut out, to);
        Ok(out)
    }
}

/// Read the group/version/kind an object declares
pub fn object_gvk(obj: &Value) -> Result<GroupVersionKind, SchemeError> {
    let api_version = obj.get("apiVersion").and_then(Value::as_str);
    let kind = obj.get("kind").and_then(Value::as_str);
    match (api_version, kind) {
        (Some(api_version), Some(kind)) if !kind.is_empty() => {
            Ok(GroupVersion::parse(api_version)?.with_kind(kind))
        }
        _ => Err(SchemeError::MissingTypeMeta),
    }
}

fn set_type_meta(obj: &mut Value, gvk: &GroupVersionKind) {
    if let Value::Object(map) = obj {
        map.insert(
            "apiVersion".to_string(),
            Value::String(gvk.group_version().to_string()),
        );
        map.insert("kind".to_string(), Value::String(gvk.kind.clone()));
    }
}

impl ObjectConvertor for Scheme {
    fn convert_to_version(&self, obj: &Value, target: &GroupVersion) -> Result<Value, SchemeError> {
        let from = object_gvk(obj)?;
        if !self.recognizes(&from) {
            return Err(SchemeError::NotRegistered {
                version: from.group_version().to_string(),
                kind: from.kind,
            });
        }

        let to = target.with_kind(from.kind.clone());
        if from == to {
            return Ok(obj.clone());
        }
        if !self.recognizes(&to) {
            return Err(SchemeError::NotRegistered {
                kind: to.kind,
                version: target.to_string(),
            });
        }

        let direct = self.read().conversions.contains_key(&(from.clone(), to.clone()));
        if direct {
            return self.convert_step(obj, &from, &to);
        }

        // from -> internal(from.group) -> internal(to.group) -> to, skipping
        // hubs the scheme does not know
        let mut current = obj.clone();
        let mut at = from;

        let source_hub = GroupVersion::internal(at.group.clone()).with_kind(at.kind.clone());
        if !at.group_version().is_internal() && self.recognizes(&source_hub) {
            current = self.convert_step(&current, &at, &source_hub)?;
            at = source_hub;
        }

        let target_hub = GroupVersion::internal(to.group.clone()).with_kind(to.kind.clone());
        if at != target_hub && to != target_hub && self.recognizes(&target_hub) {
            current = self.convert_step(&current, &at, &target_hub)?;
            at = target_hub;
        }

        if at != to {
            current = self.convert_step(&current, &at, &to)?;
        }
        Ok(current)
    }

    fn convert_field_label(
        &self,
        version: &GroupVersion,
        kind: &str,
        label: &str,
        value: &str,
    ) -> Result<(String, String), SchemeError> {
        let f = self
            .read()
            .field_labels
            .get(&(version.clone(), kind.to_string()))
            .cloned();

        let unsupported = || SchemeError::FieldLabelNotSupported {
            version: version.clone(),
            kind: kind.to_string(),
            label: label.to_string(),
        };

        match f {
            Some(f) => f(label, value).map_err(|_| unsupported()),
            None if label == "metadata.name" || label == "metadata.namespace" => {
                Ok((label.to_string(), value.to_string()))
            }
            None => Err(unsupported()),
        }
    }
}
