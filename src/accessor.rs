//! Object metadata access
//!
//! Reads and writes the standard `metadata` block of JSON objects.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::AccessorError;

type AccessResult<T> = Result<T, AccessorError>;

/// Generic access to object metadata fields
pub trait MetadataAccessor: Send + Sync {
    fn api_version(&self, obj: &Value) -> AccessResult<String>;
    fn kind(&self, obj: &Value) -> AccessResult<String>;

    fn name(&self, obj: &Value) -> AccessResult<String>;
    fn set_name(&self, obj: &mut Value, name: &str) -> AccessResult<()>;

    fn namespace(&self, obj: &Value) -> AccessResult<String>;
    fn set_namespace(&self, obj: &mut Value, namespace: &str) -> AccessResult<()>;

    fn uid(&self, obj: &Value) -> AccessResult<String>;
    fn set_uid(&self, obj: &mut Value, uid: &str) -> AccessResult<()>;

    fn resource_version(&self, obj: &Value) -> AccessResult<String>;
    fn set_resource_version(&self, obj: &mut Value, version: &str) -> AccessResult<()>;

    fn self_link(&self, obj: &Value) -> AccessResult<String>;
    fn set_self_link(&self, obj: &mut Value, link: &str) -> AccessResult<()>;

    fn labels(&self, obj: &Value) -> AccessResult<BTreeMap<String, String>>;
    fn set_labels(&self, obj: &mut Value, labels: &BTreeMap<String, String>) -> AccessResult<()>;

    fn annotations(&self, obj: &Value) -> AccessResult<BTreeMap<String, String>>;
    fn set_annotations(&self, obj: &mut Value, annotations: &BTreeMap<String, String>) -> AccessResult<()>;
}

/// Derives and stores an object's canonical URL
pub trait SelfLinker: Send + Sync {
    fn self_link(&self, obj: &Value) -> AccessResult<String>;
    fn set_self_link(&self, obj: &mut Value, link: &str) -> AccessResult<()>;
    fn name(&self, obj: &Value) -> AccessResult<String>;
    fn namespace(&self, obj: &Value) -> AccessResult<String>;
}

/// Metadata accessor for JSON objects. Missing fields read as empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct Accessor;

impl Accessor {
    pub fn new() -> Self {
        Self
    }

    fn metadata(obj: &Value) -> AccessResult<Option<&Map<String, Value>>> {
        let map = obj.as_object().ok_or(AccessorError::NotAnObject)?;
        match map.get("metadata") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(meta)) => Ok(Some(meta)),
            Some(_) => Err(AccessorError::InvalidField("metadata")),
        }
    }

    fn metadata_mut(obj: &mut Value) -> AccessResult<&mut Map<String, Value>> {
        let map = obj.as_object_mut().ok_or(AccessorError::NotAnObject)?;
        let meta = map
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if meta.is_null() {
            *meta = Value::Object(Map::new());
        }
        meta.as_object_mut()
            .ok_or(AccessorError::InvalidField("metadata"))
    }

    fn top_level_str(obj: &Value, field: &'static str) -> AccessResult<String> {
        let map = obj.as_object().ok_or(AccessorError::NotAnObject)?;
        match map.get(field) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(AccessorError::InvalidField(field)),
        }
    }

    fn meta_str(obj: &Value, field: &'static str) -> AccessResult<String> {
        match Self::metadata(obj)?.and_then(|meta| meta.get(field)) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(AccessorError::InvalidField(field)),
        }
    }

    fn set_meta_str(obj: &mut Value, field: &'static str, value: &str) -> AccessResult<()> {
        Self::metadata_mut(obj)?.insert(field.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    fn meta_map(obj: &Value, field: &'static str) -> AccessResult<BTreeMap<String, String>> {
        match Self::metadata(obj)?.and_then(|meta| meta.get(field)) {
            None | Some(Value::Null) => Ok(BTreeMap::new()),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    _ => Err(AccessorError::InvalidField(field)),
                })
                .collect(),
            Some(_) => Err(AccessorError::InvalidField(field)),
        }
    }

    fn set_meta_map(obj: &mut Value, field: &'static str, entries: &BTreeMap<String, String>) -> AccessResult<()> {
        let value = entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<_, _>>();
        Self::metadata_mut(obj)?.insert(field.to_string(), Value::Object(value));
        Ok(())
    }
}

impl MetadataAccessor for Accessor {
    fn api_version(&self, obj: &Value) -> AccessResult<String> {
        Self::top_level_str(obj, "apiVersion")
    }

    fn kind(&self, obj: &Value) -> AccessResult<String> {
        Self::top_level_str(obj, "kind")
    }

    fn name(&self, obj: &Value) -> AccessResult<String> {
        Self::meta_str(obj, "name")
    }

    fn set_name(&self, obj: &mut Value, name: &str) -> AccessResult<()> {
        Self::set_meta_str(obj, "name", name)
    }

    fn namespace(&self, obj: &Value) -> AccessResult<String> {
        Self::meta_str(obj, "namespace")
    }

    fn set_namespace(&self, obj: &mut Value, namespace: &str) -> AccessResult<()> {
        Self::set_meta_str(obj, "namespace", namespace)
    }

    fn uid(&self, obj: &Value) -> AccessResult<String> {
        Self::meta_str(obj, "uid")
    }

    fn set_uid(&self, obj: &mut Value, uid: &str) -> AccessResult<()> {
        Self::set_meta_str(obj, "uid", uid)
    }

    fn resource_version(&self, obj: &Value) -> AccessResult<String> {
        Self::meta_str(obj, "resourceVersion")
    }

    fn set_resource_version(&self, obj: &mut Value, version: &str) -> AccessResult<()> {
        Self::set_meta_str(obj, "resourceVersion", version)
    }

    fn self_link(&self, obj: &Value) -> AccessResult<String> {
        Self::meta_str(obj, "selfLink")
    }

    fn set_self_link(&self, obj: &mut Value, link: &str) -> AccessResult<()> {
        Self::set_meta_str(obj, "selfLink", link)
    }

    fn labels(&self, obj: &Value) -> AccessResult<BTreeMap<String, String>> {
        Self::meta_map(obj, "labels")
    }

    fn set_labels(&self, obj: &mut Value, labels: &BTreeMap<String, String>) -> AccessResult<()> {
        Self::set_meta_map(obj, "labels", labels)
    }

    fn annotations(&self, obj: &Value) -> AccessResult<BTreeMap<String, String>> {
        Self::meta_map(obj, "annotations")
    }

    fn set_annotations(&self, obj: &mut Value, annotations: &BTreeMap<String, String>) -> AccessResult<()> {
        Self::set_meta_map(obj, "annotations", annotations)
    }
}

impl SelfLinker for Accessor {
    fn self_link(&self, obj: &Value) -> AccessResult<String> {
        MetadataAccessor::self_link(self, obj)
    }

    fn set_self_link(&self, obj: &mut Value, link: &str) -> AccessResult<()> {
        MetadataAccessor::set_self_link(self, obj, link)
    }

    fn name(&self, obj: &Value) -> AccessResult<String> {
        MetadataAccessor::name(self, obj)
    }

    fn namespace(&self, obj: &Value) -> AccessResult<String> {
        MetadataAccessor::namespace(self, obj)
    }
}
