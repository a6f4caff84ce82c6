//! REST Mapper
//!
//! Resolves kinds to REST resources (and back) for a set of group versions.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::accessor::MetadataAccessor;
use crate::error::MapperError;
use crate::registry::InterfacesFn;
use crate::scheme::{ObjectConvertor, Scheme};
use crate::version::{GroupKind, GroupVersion, GroupVersionKind, GroupVersionResource};

/// Whether a resource lives inside a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestScope {
    Namespace,
    Root,
}

/// How to reach and handle one kind over REST
#[derive(Clone)]
pub struct RestMapping {
    pub resource: GroupVersionResource,
    pub gvk: GroupVersionKind,
    pub scope: RestScope,
    pub object_convertor: Arc<dyn ObjectConvertor>,
    pub metadata_accessor: Arc<dyn MetadataAccessor>,
}

impl fmt::Debug for RestMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestMapping")
            .field("resource", &self.resource)
            .field("gvk", &self.gvk)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// One kind known to a mapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub group_version: String,
    pub kind: String,
    pub resource: String,
    pub singular: String,
    pub scope: RestScope,
}

pub trait RestMapper: Send + Sync {
    /// Kind served by a (possibly partial) resource
    fn kind_for(&self, resource: &GroupVersionResource) -> Result<GroupVersionKind, MapperError>;

    /// Fully qualified plural resource for a (possibly partial) resource
    fn resource_for(&self, resource: &GroupVersionResource) -> Result<GroupVersionResource, MapperError>;

    /// Singular name of a plural resource
    fn resource_singularizer(&self, resource: &str) -> Result<String, MapperError>;

    /// Mapping for `group_kind` in the first of `versions` that serves it,
    /// or in the default versions when `versions` is empty
    fn rest_mapping(&self, group_kind: &GroupKind, versions: &[&str]) -> Result<RestMapping, MapperError>;

    fn resource_entries(&self) -> Vec<ResourceEntry>;
}

/// Lowercase singular and plural resource names for a kind
pub fn kind_to_resource(gvk: &GroupVersionKind) -> (GroupVersionResource, GroupVersionResource) {
    let singular = gvk.kind.to_lowercase();
    let plural = if singular.is_empty() {
        String::new()
    } else if singular.ends_with('s') {
        format!("{}es", singular)
    } else if let Some(stem) = singular.strip_suffix('y') {
        format!("{}ies", stem)
    } else {
        format!("{}s", singular)
    };
    let gv = gvk.group_version();
    (gv.with_resource(plural), gv.with_resource(singular))
}

/// Mapper over explicitly added kinds, ordered by default version preference
pub struct DefaultRestMapper {
    default_group_versions: Vec<GroupVersion>,
    resource_to_kind: HashMap<GroupVersionResource, GroupVersionKind>,
    kind_to_plural: HashMap<GroupVersionKind, GroupVersionResource>,
    kind_to_scope: HashMap<GroupVersionKind, RestScope>,
    singular_to_plural: HashMap<GroupVersionResource, GroupVersionResource>,
    plural_to_singular: HashMap<GroupVersionResource, GroupVersionResource>,
    interfaces_for: InterfacesFn,
}

impl DefaultRestMapper {
    pub fn new(default_group_versions: Vec<GroupVersion>, interfaces_for: InterfacesFn) -> Self {
        Self {
            default_group_versions,
            resource_to_kind: HashMap::new(),
            kind_to_plural: HashMap::new(),
            kind_to_scope: HashMap::new(),
            singular_to_plural: HashMap::new(),
            plural_to_singular: HashMap::new(),
            interfaces_for,
        }
    }

    /// Build a mapper from the kinds `scheme` knows for `versions`.
    ///
    /// Only types whose path contains `import_prefix` are mapped, which
    /// leaves out shared meta types registered under the same versions.
    pub fn from_scheme(
        versions: Vec<GroupVersion>,
        interfaces_for: InterfacesFn,
        import_prefix: &str,
        ignored_kinds: &BTreeSet<String>,
        root_scoped: &BTreeSet<String>,
        scheme: &Scheme,
    ) -> Self {
        let mut mapper = Self::new(versions.clone(), interfaces_for);
        for gv in &versions {
            for (kind, type_path) in scheme.known_types(gv) {
                if !type_path.contains(import_prefix) || ignored_kinds.contains(&kind) {
                    continue;
                }
                let scope = if root_scoped.contains(&kind) {
                    RestScope::Root
                } else {
                    RestScope::Namespace
                };
                mapper.add(gv.with_kind(kind), scope);
            }
        }
        mapper
    }

    pub fn add(&mut self, gvk: GroupVersionKind, scope: RestScope) {
        let (plural, singular) = kind_to_resource(&gvk);

        self.singular_to_plural.insert(singular.clone(), plural.clone());
        self.plural_to_singular.insert(plural.clone(), singular.clone());
        self.resource_to_kind.insert(singular, gvk.clone());
        self.resource_to_kind.insert(plural.clone(), gvk.clone());
        self.kind_to_plural.insert(gvk.clone(), plural);
        self.kind_to_scope.insert(gvk, scope);
    }

    fn version_rank(&self, gv: &GroupVersion) -> usize {
        self.default_group_versions
            .iter()
            .position(|v| v == gv)
            .unwrap_or(self.default_group_versions.len())
    }

    /// Candidates matching a partial resource, most preferred version first
    fn matching_resources(&self, query: &GroupVersionResource) -> Vec<&GroupVersionResource> {
        let resource = query.resource.to_lowercase();
        let mut matches: Vec<_> = self
            .resource_to_kind
            .keys()
            .filter(|r| r.resource == resource)
            .filter(|r| query.group.is_empty() || r.group == query.group)
            .filter(|r| query.version.is_empty() || r.version == query.version)
            .collect();
        matches.sort_by_key(|r| (self.version_rank(&r.group_version()), (*r).clone()));
        matches
    }
}

impl RestMapper for DefaultRestMapper {
    fn kind_for(&self, resource: &GroupVersionResource) -> Result<GroupVersionKind, MapperError> {
        let matches = self.matching_resources(resource);
        let kinds: BTreeSet<_> = matches
            .iter()
            .filter_map(|r| self.resource_to_kind.get(*r))
            .map(|gvk| gvk.group_kind())
            .collect();

        if kinds.len() > 1 {
            return Err(MapperError::AmbiguousResource {
                resource: resource.resource.clone(),
                matches: kinds.iter().map(|gk| gk.to_string()).collect(),
            });
        }

        matches
            .first()
            .and_then(|r| self.resource_to_kind.get(*r))
            .cloned()
            .ok_or_else(|| MapperError::NoResourceMatch(resource.to_string()))
    }

    fn resource_for(&self, resource: &GroupVersionResource) -> Result<GroupVersionResource, MapperError> {
        let gvk = self.kind_for(resource)?;
        self.kind_to_plural
            .get(&gvk)
            .cloned()
            .ok_or_else(|| MapperError::NoResourceMatch(resource.to_string()))
    }

    fn resource_singularizer(&self, resource: &str) -> Result<String, MapperError> {
        let query = GroupVersionResource::partial(resource);
        self.matching_resources(&query)
            .into_iter()
            .find_map(|r| {
                self.plural_to_singular
                    .get(r)
                    .or_else(|| self.singular_to_plural.contains_key(r).then_some(r))
            })
            .map(|r| r.resource.clone())
            .ok_or_else(|| MapperError::NoResourceMatch(resource.to_string()))
    }

    fn rest_mapping(&self, group_kind: &GroupKind, versions: &[&str]) -> Result<RestMapping, MapperError> {
        let candidates: Vec<GroupVersion> = if versions.is_empty() {
            self.default_group_versions
                .iter()
                .filter(|gv| gv.group == group_kind.group)
                .cloned()
                .collect()
        } else {
            versions
                .iter()
                .map(|v| GroupVersion::new(group_kind.group.clone(), *v))
                .collect()
        };

        let no_match = || MapperError::NoKindMatch {
            group: group_kind.group.clone(),
            kind: group_kind.kind.clone(),
        };

        let gvk = candidates
            .iter()
            .map(|gv| gv.with_kind(group_kind.kind.clone()))
            .find(|gvk| self.kind_to_plural.contains_key(gvk))
            .ok_or_else(no_match)?;

        let resource = self.kind_to_plural.get(&gvk).cloned().ok_or_else(no_match)?;
        let scope = self.kind_to_scope.get(&gvk).copied().ok_or_else(no_match)?;
        let interfaces = (self.interfaces_for)(&gvk.group_version())?;

        Ok(RestMapping {
            resource,
            gvk,
            scope,
            object_convertor: interfaces.object_convertor,
            metadata_accessor: interfaces.metadata_accessor,
        })
    }

    fn resource_entries(&self) -> Vec<ResourceEntry> {
        let mut entries: Vec<_> = self
            .kind_to_plural
            .iter()
            .map(|(gvk, plural)| {
                let singular = self
                    .plural_to_singular
                    .get(plural)
                    .map(|r| r.resource.clone())
                    .unwrap_or_default();
                ResourceEntry {
                    group_version: gvk.group_version().to_string(),
                    kind: gvk.kind.clone(),
                    resource: plural.resource.clone(),
                    singular,
                    scope: self.kind_to_scope.get(gvk).copied().unwrap_or(RestScope::Namespace),
                }
            })
            .collect();
        entries.sort_by(|a, b| (&a.group_version, &a.resource).cmp(&(&b.group_version, &b.resource)));
        entries
    }
}
