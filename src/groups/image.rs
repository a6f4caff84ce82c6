//! Image API group
//!
//! Installed twice: once under the legacy (empty) group name and once as
//! `image.openshift.io`. The legacy install triggers the named group's
//! install from its post-install hook.

use serde_json::{Map, Value};

use crate::context::FrameworkContext;
use crate::error::{Result, SchemeError};
use crate::install::{install_group, GroupSpec, InstallOutcome, SchemeAdder, VersionBinding};
use crate::scheme::Scheme;
use crate::version::GroupVersion;

pub const LEGACY_GROUP_NAME: &str = "";
pub const GROUP_NAME: &str = "image.openshift.io";

/// Type paths of this group's own kinds all contain this prefix
pub const IMPORT_PREFIX: &str = "apis::image";

const ROOT_SCOPED_KINDS: &[&str] = &["Image", "ImageSignature"];

const KINDS: &[&str] = &[
    "Image",
    "ImageList",
    "ImageSignature",
    "ImageStream",
    "ImageStreamList",
    "ImageStreamMapping",
    "ImageStreamTag",
    "ImageStreamTagList",
    "ImageStreamImage",
    "ImageStreamImport",
];

/// Shared meta kinds registered alongside every external version
const META_KINDS: &[&str] = &["Status", "ListOptions", "DeleteOptions"];

pub fn legacy_scheme_group_version() -> GroupVersion {
    GroupVersion::new(LEGACY_GROUP_NAME, "v1")
}

pub fn scheme_group_version() -> GroupVersion {
    GroupVersion::new(GROUP_NAME, "v1")
}

/// Install the legacy image group, then the named API group.
pub fn install(ctx: &FrameworkContext) -> Result<InstallOutcome> {
    install_group(ctx, &legacy_group_spec())
}

pub fn legacy_group_spec() -> GroupSpec {
    GroupSpec::new(LEGACY_GROUP_NAME, IMPORT_PREFIX)
        .with_internal(add_legacy_internal)
        .with_version(
            legacy_scheme_group_version(),
            VersionBinding::new(vec![add_legacy_v1 as SchemeAdder, add_docker10, add_dockerpre012]),
        )
        .with_root_scoped(ROOT_SCOPED_KINDS)
        .with_post_install(install_api_group)
}

pub fn api_group_spec() -> GroupSpec {
    GroupSpec::new(GROUP_NAME, IMPORT_PREFIX)
        .with_internal(add_group_internal)
        .with_version(scheme_group_version(), VersionBinding::new(vec![add_group_v1 as SchemeAdder]))
        .with_root_scoped(ROOT_SCOPED_KINDS)
}

fn install_api_group(ctx: &FrameworkContext) -> Result<()> {
    install_group(ctx, &api_group_spec()).map(|_| ())
}

fn add_legacy_internal(scheme: &Scheme) -> std::result::Result<(), SchemeError> {
    add_internal_types(scheme, LEGACY_GROUP_NAME)
}

fn add_legacy_v1(scheme: &Scheme) -> std::result::Result<(), SchemeError> {
    add_v1_types(scheme, LEGACY_GROUP_NAME)
}

fn add_group_internal(scheme: &Scheme) -> std::result::Result<(), SchemeError> {
    add_internal_types(scheme, GROUP_NAME)
}

fn add_group_v1(scheme: &Scheme) -> std::result::Result<(), SchemeError> {
    add_v1_types(scheme, GROUP_NAME)
}

/// Docker image metadata, schema 1.0
fn add_docker10(scheme: &Scheme) -> std::result::Result<(), SchemeError> {
    scheme.add_known_types(
        &GroupVersion::new(LEGACY_GROUP_NAME, "1.0"),
        &[("DockerImage", "apis::image::docker10::DockerImage")],
    )
}

/// Docker image metadata from registries older than 0.12
fn add_dockerpre012(scheme: &Scheme) -> std::result::Result<(), SchemeError> {
    scheme.add_known_types(
        &GroupVersion::new(LEGACY_GROUP_NAME, "pre012"),
        &[("DockerImage", "apis::image::dockerpre012::DockerImage")],
    )
}

fn add_internal_types(scheme: &Scheme, group: &str) -> std::result::Result<(), SchemeError> {
    let paths: Vec<String> = KINDS.iter().map(|k| format!("apis::image::{}", k)).collect();
    let types: Vec<(&str, &str)> = KINDS.iter().copied().zip(paths.iter().map(String::as_str)).collect();
    scheme.add_known_types(&GroupVersion::internal(group), &types)
}

fn add_v1_types(scheme: &Scheme, group: &str) -> std::result::Result<(), SchemeError> {
    let gv = GroupVersion::new(group, "v1");

    let mut paths: Vec<String> = KINDS.iter().map(|k| format!("apis::image::v1::{}", k)).collect();
    paths.extend(META_KINDS.iter().map(|k| format!("apis::meta::v1::{}", k)));
    let types: Vec<(&str, &str)> = KINDS
        .iter()
        .chain(META_KINDS)
        .copied()
        .zip(paths.iter().map(String::as_str))
        .collect();
    scheme.add_known_types(&gv, &types)?;

    let internal = GroupVersion::internal(group);
    scheme.add_conversion_fn(
        gv.with_kind("ImageStream"),
        internal.with_kind("ImageStream"),
        image_stream_to_internal,
    );
    scheme.add_conversion_fn(
        internal.with_kind("ImageStream"),
        gv.with_kind("ImageStream"),
        image_stream_from_internal,
    );

    scheme.add_field_label_conversion_fn(&gv, "ImageStream", |label, value| match label {
        "metadata.name"
        | "metadata.namespace"
        | "spec.dockerImageRepository"
        | "status.dockerImageRepository" => Ok((label.to_string(), value.to_string())),
        _ => Err(format!("field label not supported: {}", label)),
    });
    scheme.add_field_label_conversion_fn(&gv, "Image", |label, value| match label {
        "metadata.name" => Ok((label.to_string(), value.to_string())),
        _ => Err(format!("field label not supported: {}", label)),
    });

    Ok(())
}

/// Turn a list of named entries into a map keyed by `key`
fn list_to_map(list: &Value, key: &str) -> std::result::Result<Value, String> {
    let items = match list {
        Value::Null => return Ok(Value::Object(Map::new())),
        Value::Array(items) => items,
        _ => return Err(format!("expected a list of entries keyed by {}", key)),
    };

    let mut out = Map::new();
    for item in items {
        let mut entry = item
            .as_object()
            .cloned()
            .ok_or_else(|| format!("entry is not an object: {}", item))?;
        let name = match entry.remove(key) {
            Some(Value::String(name)) => name,
            _ => return Err(format!("entry has no {}", key)),
        };
        if out.contains_key(&name) {
            return Err(format!("duplicate {} {:?}", key, name));
        }
        out.insert(name, Value::Object(entry));
    }
    Ok(Value::Object(out))
}

/// Inverse of `list_to_map`; entries come out sorted by key
fn map_to_list(map: &Value, key: &str) -> std::result::Result<Value, String> {
    let entries = match map {
        Value::Null => return Ok(Value::Array(Vec::new())),
        Value::Object(entries) => entries,
        _ => return Err(format!("expected a map of entries keyed by {}", key)),
    };

    let mut names: Vec<&String> = entries.keys().collect();
    names.sort();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut entry = entries[name.as_str()]
            .as_object()
            .cloned()
            .ok_or_else(|| format!("entry {:?} is not an object", name))?;
        entry.insert(key.to_string(), Value::String(name.clone()));
        out.push(Value::Object(entry));
    }
    Ok(Value::Array(out))
}

fn convert_tags(
    obj: &Value,
    convert: fn(&Value, &str) -> std::result::Result<Value, String>,
) -> std::result::Result<Value, String> {
    let mut out = obj.clone();
    if let Some(spec) = out.get_mut("spec").and_then(Value::as_object_mut) {
        if let Some(tags) = spec.get("tags") {
            let converted = convert(tags, "name")?;
            spec.insert("tags".to_string(), converted);
        }
    }
    if let Some(status) = out.get_mut("status").and_then(Value::as_object_mut) {
        if let Some(tags) = status.get("tags") {
            let converted = convert(tags, "tag")?;
            status.insert("tags".to_string(), converted);
        }
    }
    Ok(out)
}

/// External image streams list their tags; internally tags are keyed by name
fn image_stream_to_internal(obj: &Value) -> std::result::Result<Value, String> {
    convert_tags(obj, list_to_map)
}

fn image_stream_from_internal(obj: &Value) -> std::result::Result<Value, String> {
    convert_tags(obj, map_to_list)
}
