//! Group installation tests
//!
//! Exercise the install protocol against a small demo group and the
//! built-in image groups.

use std::sync::Arc;

use apigroup_registry::groups::image;
use apigroup_registry::install::{enable_versions, external_versions, SchemeAdder};
use apigroup_registry::{
    install_group, ApiRegistry, FrameworkContext, GroupKind, GroupSpec, GroupVersion,
    GroupVersionResource, InstallError, InstallOutcome, MapperError, ObjectConvertor,
    RegistryError, RestScope, Scheme, SchemeError, VersionBinding,
};
use serde_json::json;

fn v(s: &str) -> GroupVersion {
    GroupVersion::parse(s).unwrap()
}

fn add_demo_internal(scheme: &Scheme) -> Result<(), SchemeError> {
    scheme.add_known_types(&GroupVersion::internal("demo"), &[("Widget", "apis::demo::Widget")])
}

fn add_demo_v2(scheme: &Scheme) -> Result<(), SchemeError> {
    scheme.add_known_types(
        &v("demo/v2"),
        &[
            ("Widget", "apis::demo::v2::Widget"),
            ("Gizmo", "apis::demo::v2::Gizmo"),
            ("Status", "apis::meta::v1::Status"),
        ],
    )
}

fn add_demo_v1(scheme: &Scheme) -> Result<(), SchemeError> {
    scheme.add_known_types(&v("demo/v1"), &[("Widget", "apis::demo::v1::Widget")])
}

fn add_conflicting(scheme: &Scheme) -> Result<(), SchemeError> {
    scheme.add_known_types(&v("demo/v2"), &[("Widget", "other::Widget")])
}

fn demo_spec() -> GroupSpec {
    GroupSpec::new("demo", "apis::demo")
        .with_internal(add_demo_internal)
        .with_version(v("demo/v2"), VersionBinding::new(vec![add_demo_v2 as SchemeAdder]))
        .with_version(v("demo/v1"), VersionBinding::new(vec![add_demo_v1 as SchemeAdder]))
        .with_root_scoped(&["Gizmo"])
}

// =============================================================================
// Version filtering
// =============================================================================

#[test]
fn test_external_versions_follow_candidate_order() {
    let candidates = vec![v("demo/v3"), v("demo/v2"), v("demo/v1")];

    let allow_lists = vec![
        vec![],
        vec![v("demo/v1")],
        vec![v("demo/v1"), v("demo/v3")],
        vec![v("other/v1")],
    ];

    for allowed in allow_lists {
        let registry = ApiRegistry::new(allowed.clone());
        let expected: Vec<_> = candidates
            .iter()
            .filter(|c| allowed.is_empty() || allowed.contains(c))
            .cloned()
            .collect();
        assert_eq!(external_versions(&registry, &candidates), expected);
    }
}

#[test]
fn test_no_allowed_versions_skips_group() {
    let ctx = FrameworkContext::new(vec![v("other/v1")]);
    let outcome = install_group(&ctx, &demo_spec()).unwrap();

    assert_eq!(outcome, InstallOutcome::Skipped);
    assert!(!ctx.registry().is_registered("demo"));
    assert!(ctx.registry().enabled_versions().is_empty());
    // Candidates are still declared
    assert!(ctx.registry().is_registered_version(&v("demo/v2")));
    assert!(ctx.scheme().known_types(&v("demo/v2")).is_empty());
}

// =============================================================================
// Installation
// =============================================================================

#[test]
fn test_install_enables_exactly_external_versions() {
    let ctx = FrameworkContext::default();
    let outcome = install_group(&ctx, &demo_spec()).unwrap();

    assert_eq!(
        outcome,
        InstallOutcome::Installed {
            preferred: v("demo/v2"),
            versions: vec![v("demo/v2"), v("demo/v1")],
        }
    );
    assert_eq!(ctx.registry().enabled_versions(), vec![v("demo/v1"), v("demo/v2")]);

    let meta = ctx.registry().group("demo").unwrap();
    assert_eq!(meta.group_version, v("demo/v2"));
    assert_eq!(meta.group_versions, vec![v("demo/v2"), v("demo/v1")]);
}

#[test]
fn test_scheme_only_gets_enabled_versions() {
    let ctx = FrameworkContext::new(vec![v("demo/v1")]);
    install_group(&ctx, &demo_spec()).unwrap();

    assert!(ctx.scheme().recognizes(&v("demo/v1").with_kind("Widget")));
    assert!(!ctx.scheme().recognizes(&v("demo/v2").with_kind("Widget")));
    assert!(ctx.scheme().recognizes(&GroupVersion::internal("demo").with_kind("Widget")));

    let meta = ctx.registry().group("demo").unwrap();
    assert_eq!(meta.group_version, v("demo/v1"));
}

#[test]
fn test_unknown_version_is_skipped() {
    let ctx = FrameworkContext::default();
    let mut spec = demo_spec();
    spec.available_versions.push(v("demo/v0"));

    install_group(&ctx, &spec).unwrap();

    assert!(ctx.registry().is_enabled_version(&v("demo/v0")));
    assert!(ctx.scheme().known_types(&v("demo/v0")).is_empty());
}

#[test]
fn test_enable_versions_skips_unenabled_versions() {
    let ctx = FrameworkContext::default();
    let spec = demo_spec();
    ctx.registry().register_versions(&spec.available_versions);
    ctx.registry().enable_versions(&[v("demo/v2")]).unwrap();

    enable_versions(&ctx, &spec, &[v("demo/v2")]).unwrap();

    assert!(ctx.scheme().recognizes(&v("demo/v2").with_kind("Widget")));
    assert!(!ctx.scheme().recognizes(&v("demo/v1").with_kind("Widget")));
}

#[test]
fn test_second_install_is_a_registry_conflict() {
    let ctx = FrameworkContext::default();
    install_group(&ctx, &demo_spec()).unwrap();

    let err = install_group(&ctx, &demo_spec()).unwrap_err();
    assert!(matches!(
        err,
        InstallError::Registry(RegistryError::GroupAlreadyRegistered(ref group)) if group == "demo"
    ));
}

#[test]
fn test_scheme_conflict_is_fatal() {
    let ctx = FrameworkContext::default();
    install_group(&ctx, &demo_spec()).unwrap();

    let conflicting = GroupSpec::new("demo", "apis::demo")
        .with_version(v("demo/v2"), VersionBinding::new(vec![add_conflicting as SchemeAdder]));
    let err = install_group(&ctx, &conflicting).unwrap_err();
    assert!(matches!(err, InstallError::Scheme(SchemeError::TypeConflict { .. })));
}

#[test]
fn test_versions_of_another_group_are_rejected() {
    let ctx = FrameworkContext::default();
    let misnamed = GroupSpec::new("Demo", "apis::demo")
        .with_version(v("demo/v1"), VersionBinding::new(vec![add_demo_v1 as SchemeAdder]));

    let err = install_group(&ctx, &misnamed).unwrap_err();
    assert!(matches!(
        err,
        InstallError::ForeignVersion { ref group, ref version } if group == "Demo" && *version == v("demo/v1")
    ));
    // Rejected before anything is declared
    assert!(!ctx.registry().is_registered_version(&v("demo/v1")));
    assert!(!ctx.registry().is_registered("demo"));
    assert!(!ctx.registry().is_registered("Demo"));
}

#[test]
fn test_failing_hook_is_reported() {
    fn failing_hook(_: &FrameworkContext) -> apigroup_registry::Result<()> {
        Err(InstallError::NoVersions("hooked".to_string()))
    }

    let ctx = FrameworkContext::default();
    let spec = demo_spec().with_post_install(failing_hook);
    let err = install_group(&ctx, &spec).unwrap_err();
    assert!(matches!(err, InstallError::Hook { ref group, .. } if group == "demo"));
    // The group itself was registered before the hook ran
    assert!(ctx.registry().is_registered("demo"));
}

// =============================================================================
// Interfaces resolution
// =============================================================================

#[test]
fn test_interfaces_for_supported_version() {
    let ctx = FrameworkContext::default();
    install_group(&ctx, &demo_spec()).unwrap();
    let meta = ctx.registry().group("demo").unwrap();

    for version in [v("demo/v2"), v("demo/v1")] {
        let interfaces = meta.interfaces_for(&version).unwrap();
        let obj = json!({"apiVersion": "demo/v1", "kind": "Widget", "metadata": {"name": "w"}});
        let converted = interfaces
            .object_convertor
            .convert_to_version(&obj, &v("demo/v2"))
            .unwrap();
        assert_eq!(converted["apiVersion"], "demo/v2");
        assert_eq!(interfaces.metadata_accessor.name(&converted).unwrap(), "w");
    }
}

#[test]
fn test_interfaces_for_unsupported_version() {
    let ctx = FrameworkContext::default();
    install_group(&ctx, &demo_spec()).unwrap();
    let meta = ctx.registry().group("demo").unwrap();

    let err = meta.interfaces_for(&v("demo/v9")).unwrap_err();
    assert_eq!(
        err,
        MapperError::UnsupportedStorageVersion {
            version: v("demo/v9"),
            valid: vec![v("demo/v2"), v("demo/v1")],
        }
    );
    let message = err.to_string();
    assert!(message.contains("demo/v9"));
    assert!(message.contains("demo/v2, demo/v1"));
}

// =============================================================================
// REST mapping
// =============================================================================

#[test]
fn test_rest_mapper_from_installed_group() {
    let ctx = FrameworkContext::default();
    install_group(&ctx, &demo_spec()).unwrap();
    let meta = ctx.registry().group("demo").unwrap();

    let mapping = meta
        .rest_mapper
        .rest_mapping(&GroupKind::new("demo", "Gizmo"), &[])
        .unwrap();
    assert_eq!(mapping.resource.resource, "gizmos");
    assert_eq!(mapping.scope, RestScope::Root);

    let widget = meta
        .rest_mapper
        .rest_mapping(&GroupKind::new("demo", "Widget"), &["v1"])
        .unwrap();
    assert_eq!(widget.gvk, v("demo/v1").with_kind("Widget"));
    assert_eq!(widget.scope, RestScope::Namespace);

    // Shared meta types are outside the import prefix
    assert!(meta
        .rest_mapper
        .kind_for(&GroupVersionResource::partial("statuses"))
        .is_err());
}

#[test]
fn test_self_linker_is_shared_accessor() {
    let ctx = FrameworkContext::default();
    install_group(&ctx, &demo_spec()).unwrap();
    let meta = ctx.registry().group("demo").unwrap();

    let mut obj = json!({"apiVersion": "demo/v2", "kind": "Widget", "metadata": {"name": "w", "namespace": "ns"}});
    meta.self_linker
        .set_self_link(&mut obj, "/apis/demo/v2/namespaces/ns/widgets/w")
        .unwrap();
    assert_eq!(meta.self_linker.namespace(&obj).unwrap(), "ns");
    assert_eq!(
        obj["metadata"]["selfLink"],
        "/apis/demo/v2/namespaces/ns/widgets/w"
    );
}

// =============================================================================
// Image group
// =============================================================================

#[test]
fn test_image_install_registers_both_groups() {
    let ctx = FrameworkContext::default();
    let outcome = image::install(&ctx).unwrap();

    assert_eq!(
        outcome,
        InstallOutcome::Installed {
            preferred: image::legacy_scheme_group_version(),
            versions: vec![image::legacy_scheme_group_version()],
        }
    );
    assert!(ctx.registry().is_registered(image::LEGACY_GROUP_NAME));
    assert!(ctx.registry().is_registered(image::GROUP_NAME));
    assert_eq!(
        ctx.registry().all_preferred_group_versions(),
        "v1,image.openshift.io/v1"
    );
    assert!(ctx
        .scheme()
        .recognizes(&GroupVersion::new("", "1.0").with_kind("DockerImage")));
}

#[test]
fn test_image_legacy_disallowed_skips_named_group_too() {
    let ctx = FrameworkContext::new(vec![image::scheme_group_version()]);
    let outcome = image::install(&ctx).unwrap();

    assert_eq!(outcome, InstallOutcome::Skipped);
    assert!(!ctx.registry().is_registered(image::GROUP_NAME));
}

#[test]
fn test_image_named_group_disallowed() {
    let ctx = FrameworkContext::new(vec![image::legacy_scheme_group_version()]);
    image::install(&ctx).unwrap();

    assert!(ctx.registry().is_registered(image::LEGACY_GROUP_NAME));
    assert!(!ctx.registry().is_registered(image::GROUP_NAME));
}

#[test]
fn test_image_install_twice_fails() {
    let ctx = FrameworkContext::default();
    image::install(&ctx).unwrap();
    assert!(matches!(
        image::install(&ctx),
        Err(InstallError::Registry(RegistryError::GroupAlreadyRegistered(_)))
    ));
}

#[test]
fn test_image_rest_mappings() {
    let ctx = FrameworkContext::default();
    image::install(&ctx).unwrap();
    let meta = ctx.registry().group(image::LEGACY_GROUP_NAME).unwrap();

    let image_mapping = meta.rest_mapper.rest_mapping(&GroupKind::new("", "Image"), &[]).unwrap();
    assert_eq!(image_mapping.scope, RestScope::Root);
    assert_eq!(image_mapping.resource.resource, "images");

    let signature = meta
        .rest_mapper
        .rest_mapping(&GroupKind::new("", "ImageSignature"), &[])
        .unwrap();
    assert_eq!(signature.scope, RestScope::Root);

    let stream = meta
        .rest_mapper
        .resource_for(&GroupVersionResource::partial("imagestream"))
        .unwrap();
    assert_eq!(stream.resource, "imagestreams");
    let stream_mapping = meta
        .rest_mapper
        .rest_mapping(&GroupKind::new("", "ImageStream"), &[])
        .unwrap();
    assert_eq!(stream_mapping.scope, RestScope::Namespace);

    let resources: Vec<_> = meta
        .rest_mapper
        .resource_entries()
        .into_iter()
        .map(|e| e.resource)
        .collect();
    assert!(!resources.contains(&"statuses".to_string()));
    assert!(!resources.contains(&"dockerimages".to_string()));
}

#[test]
fn test_image_stream_round_trip_between_groups() {
    let ctx = FrameworkContext::default();
    image::install(&ctx).unwrap();
    let scheme = Arc::clone(ctx.scheme());

    let stream = json!({
        "apiVersion": "v1",
        "kind": "ImageStream",
        "metadata": {"name": "ruby", "namespace": "openshift"},
        "spec": {"tags": [{"name": "latest", "from": {"kind": "DockerImage", "name": "ruby"}}]}
    });

    let internal = scheme
        .convert_to_version(&stream, &GroupVersion::internal(""))
        .unwrap();
    assert_eq!(internal["apiVersion"], "__internal");
    assert_eq!(internal["spec"]["tags"]["latest"]["from"]["name"], "ruby");

    let back = scheme
        .convert_to_version(&internal, &image::legacy_scheme_group_version())
        .unwrap();
    assert_eq!(back, stream);
}

#[test]
fn test_image_stream_converts_from_legacy_to_named_group() {
    let ctx = FrameworkContext::default();
    image::install(&ctx).unwrap();
    let scheme = Arc::clone(ctx.scheme());

    let stream = json!({
        "apiVersion": "v1",
        "kind": "ImageStream",
        "metadata": {"name": "ruby", "namespace": "openshift"},
        "spec": {"tags": [
            {"name": "latest", "from": {"kind": "DockerImage", "name": "ruby"}},
            {"name": "2.7", "from": {"kind": "DockerImage", "name": "ruby:2.7"}}
        ]}
    });

    let named = scheme
        .convert_to_version(&stream, &image::scheme_group_version())
        .unwrap();
    assert_eq!(named["apiVersion"], "image.openshift.io/v1");
    let tags = named["spec"]["tags"].as_array().expect("tags stay a list");
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0]["name"], "2.7");
    assert_eq!(tags[1]["name"], "latest");

    let legacy = scheme
        .convert_to_version(&named, &image::legacy_scheme_group_version())
        .unwrap();
    assert_eq!(legacy["apiVersion"], "v1");
    assert!(legacy["spec"]["tags"].is_array());
}

#[test]
fn test_image_field_labels() {
    let ctx = FrameworkContext::default();
    image::install(&ctx).unwrap();
    let meta = ctx.registry().group(image::GROUP_NAME).unwrap();
    let interfaces = meta.interfaces_for(&image::scheme_group_version()).unwrap();

    let (label, value) = interfaces
        .object_convertor
        .convert_field_label(&image::scheme_group_version(), "ImageStream", "spec.dockerImageRepository", "ruby")
        .unwrap();
    assert_eq!(label, "spec.dockerImageRepository");
    assert_eq!(value, "ruby");

    assert!(interfaces
        .object_convertor
        .convert_field_label(&image::scheme_group_version(), "Image", "spec.tags", "x")
        .is_err());
}
