//! Group Installer
//!
//! Registers one API group into a `FrameworkContext`: declare its versions,
//! keep the ones the registry allows, enable them, add their types to the
//! scheme and register the resulting `GroupMeta`.
//!
//! Errors returned from `install_group` leave the context partially
//! mutated; the host is expected to abort startup on `Err`. A group with no
//! allowed versions is skipped without error.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::context::FrameworkContext;
use crate::error::{InstallError, MapperError, Result, SchemeError};
use crate::registry::{ApiRegistry, GroupMeta, InterfacesFn, VersionInterfaces};
use crate::restmapper::DefaultRestMapper;
use crate::scheme::Scheme;
use crate::version::GroupVersion;

/// Adds a set of types and conversions to a scheme
pub type SchemeAdder = fn(&Scheme) -> std::result::Result<(), SchemeError>;

/// Supplies the interfaces for objects stored in one version
pub type InterfacesProvider = fn(&FrameworkContext) -> VersionInterfaces;

/// Runs after a group has been registered
pub type InstallHook = fn(&FrameworkContext) -> Result<()>;

/// The shared scheme as convertor and the shared accessor
pub fn shared_interfaces(ctx: &FrameworkContext) -> VersionInterfaces {
    VersionInterfaces {
        object_convertor: ctx.scheme().clone(),
        metadata_accessor: ctx.accessor().clone(),
    }
}

/// Scheme registrations and interfaces for one external version
#[derive(Clone)]
pub struct VersionBinding {
    pub scheme_adders: Vec<SchemeAdder>,
    pub interfaces: InterfacesProvider,
}

impl VersionBinding {
    pub fn new(scheme_adders: Vec<SchemeAdder>) -> Self {
        Self {
            scheme_adders,
            interfaces: shared_interfaces,
        }
    }
}

/// Static description of an API group
#[derive(Clone)]
pub struct GroupSpec {
    pub name: String,
    /// Candidate versions, most preferred first
    pub available_versions: Vec<GroupVersion>,
    pub bindings: HashMap<GroupVersion, VersionBinding>,
    pub internal_adders: Vec<SchemeAdder>,
    /// Only types whose path contains this prefix get REST mappings
    pub import_prefix: String,
    pub ignored_kinds: BTreeSet<String>,
    pub root_scoped_kinds: BTreeSet<String>,
    pub post_install: Vec<InstallHook>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>, import_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available_versions: Vec::new(),
            bindings: HashMap::new(),
            internal_adders: Vec::new(),
            import_prefix: import_prefix.into(),
            ignored_kinds: BTreeSet::new(),
            root_scoped_kinds: BTreeSet::new(),
            post_install: Vec::new(),
        }
    }

    /// Append a candidate version, less preferred than those already added
    pub fn with_version(mut self, gv: GroupVersion, binding: VersionBinding) -> Self {
        self.available_versions.push(gv.clone());
        self.bindings.insert(gv, binding);
        self
    }

    pub fn with_internal(mut self, adder: SchemeAdder) -> Self {
        self.internal_adders.push(adder);
        self
    }

    pub fn with_root_scoped(mut self, kinds: &[&str]) -> Self {
        self.root_scoped_kinds.extend(kinds.iter().map(|k| k.to_string()));
        self
    }

    pub fn with_ignored(mut self, kinds: &[&str]) -> Self {
        self.ignored_kinds.extend(kinds.iter().map(|k| k.to_string()));
        self
    }

    pub fn with_post_install(mut self, hook: InstallHook) -> Self {
        self.post_install.push(hook);
        self
    }
}

impl fmt::Debug for GroupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupSpec")
            .field("name", &self.name)
            .field("available_versions", &self.available_versions)
            .field("import_prefix", &self.import_prefix)
            .field("ignored_kinds", &self.ignored_kinds)
            .field("root_scoped_kinds", &self.root_scoped_kinds)
            .field("post_install", &self.post_install.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        preferred: GroupVersion,
        versions: Vec<GroupVersion>,
    },
    /// No candidate version is allowed; the group is unavailable
    Skipped,
}

/// Candidates the registry allows, in candidate order
pub fn external_versions(registry: &ApiRegistry, candidates: &[GroupVersion]) -> Vec<GroupVersion> {
    candidates
        .iter()
        .filter(|v| registry.is_allowed_version(v))
        .cloned()
        .collect()
}

/// Install `spec` into `ctx`.
pub fn install_group(ctx: &FrameworkContext, spec: &GroupSpec) -> Result<InstallOutcome> {
    if let Some(version) = spec.available_versions.iter().find(|v| v.group != spec.name) {
        return Err(InstallError::ForeignVersion {
            group: spec.name.clone(),
            version: version.clone(),
        });
    }

    let registry = ctx.registry();
    registry.register_versions(&spec.available_versions);

    let external = external_versions(registry, &spec.available_versions);
    if external.is_empty() {
        info!("No version is registered for group {:?}", spec.name);
        return Ok(InstallOutcome::Skipped);
    }

    registry.enable_versions(&external)?;
    let meta = enable_versions(ctx, spec, &external)?;

    for hook in &spec.post_install {
        hook(ctx).map_err(|e| InstallError::Hook {
            group: spec.name.clone(),
            source: Box::new(e),
        })?;
    }

    info!(group = %spec.name, preferred = %meta.group_version, "installed API group");
    Ok(InstallOutcome::Installed {
        preferred: meta.group_version.clone(),
        versions: meta.group_versions.clone(),
    })
}

/// Add the group's types to the scheme and register its `GroupMeta`.
///
/// `external` must be non-empty and already enabled in the registry; its
/// first entry becomes the preferred version.
pub fn enable_versions(
    ctx: &FrameworkContext,
    spec: &GroupSpec,
    external: &[GroupVersion],
) -> Result<Arc<GroupMeta>> {
    let preferred = external
        .first()
        .cloned()
        .ok_or_else(|| InstallError::NoVersions(spec.name.clone()))?;

    add_versions_to_scheme(ctx, spec)?;

    let interfaces_for = interfaces_resolver(ctx, spec);
    let rest_mapper = DefaultRestMapper::from_scheme(
        external.to_vec(),
        interfaces_for.clone(),
        &spec.import_prefix,
        &spec.ignored_kinds,
        &spec.root_scoped_kinds,
        ctx.scheme(),
    );

    let meta = GroupMeta {
        group_version: preferred,
        group_versions: external.to_vec(),
        rest_mapper: Arc::new(rest_mapper),
        self_linker: ctx.accessor().clone(),
        interfaces_for,
    };

    Ok(ctx.registry().register_group(meta)?)
}

fn add_versions_to_scheme(ctx: &FrameworkContext, spec: &GroupSpec) -> Result<()> {
    let scheme: &Scheme = ctx.scheme();
    for adder in &spec.internal_adders {
        adder(scheme)?;
    }

    for version in &spec.available_versions {
        if !ctx.registry().is_enabled_version(version) {
            error!("Version {} is not enabled, so it will not be added to the Scheme.", version);
            continue;
        }
        let Some(binding) = spec.bindings.get(version) else {
            error!("Version {} is not known, so it will not be added to the Scheme.", version);
            continue;
        };
        debug!(version = %version, "adding version to scheme");
        for adder in &binding.scheme_adders {
            adder(scheme)?;
        }
    }

    Ok(())
}

/// Interfaces for every bound version of `spec`.
///
/// Any other version fails with the group's registered versions, looked up
/// when the error is produced.
pub fn interfaces_resolver(ctx: &FrameworkContext, spec: &GroupSpec) -> InterfacesFn {
    let supported: HashMap<GroupVersion, VersionInterfaces> = spec
        .bindings
        .iter()
        .map(|(gv, binding)| (gv.clone(), (binding.interfaces)(ctx)))
        .collect();
    let registry = Arc::downgrade(ctx.registry());
    let group = spec.name.clone();

    Arc::new(move |version: &GroupVersion| {
        if let Some(interfaces) = supported.get(version) {
            return Ok(interfaces.clone());
        }
        let valid = registry
            .upgrade()
            .and_then(|registry| registry.group(&group))
            .map(|meta| meta.group_versions.clone())
            .unwrap_or_default();
        Err(MapperError::UnsupportedStorageVersion {
            version: version.clone(),
            valid,
        })
    })
}
