//! API Registry
//!
//! Tracks which group versions are registered, allowed and enabled, and
//! holds one `GroupMeta` per installed API group.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::accessor::{MetadataAccessor, SelfLinker};
use crate::error::{MapperError, RegistryError};
use crate::restmapper::RestMapper;
use crate::scheme::ObjectConvertor;
use crate::version::GroupVersion;

/// Per-version conversion and metadata access
#[derive(Clone)]
pub struct VersionInterfaces {
    pub object_convertor: Arc<dyn ObjectConvertor>,
    pub metadata_accessor: Arc<dyn MetadataAccessor>,
}

impl fmt::Debug for VersionInterfaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionInterfaces").finish_non_exhaustive()
    }
}

/// Resolves the interfaces used to store and convert objects of a version
pub type InterfacesFn = Arc<dyn Fn(&GroupVersion) -> Result<VersionInterfaces, MapperError> + Send + Sync>;

/// Everything the serving layer needs to know about one installed API group
#[derive(Clone)]
pub struct GroupMeta {
    /// Preferred external version
    pub group_version: GroupVersion,
    /// All enabled external versions, most preferred first
    pub group_versions: Vec<GroupVersion>,
    pub rest_mapper: Arc<dyn RestMapper>,
    pub self_linker: Arc<dyn SelfLinker>,
    pub interfaces_for: InterfacesFn,
}

impl GroupMeta {
    pub fn group(&self) -> &str {
        &self.group_version.group
    }

    pub fn interfaces_for(&self, version: &GroupVersion) -> Result<VersionInterfaces, MapperError> {
        (self.interfaces_for)(version)
    }
}

impl fmt::Debug for GroupMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupMeta")
            .field("group_version", &self.group_version)
            .field("group_versions", &self.group_versions)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryState {
    registered_versions: HashSet<GroupVersion>,
    enabled_versions: HashSet<GroupVersion>,
    groups: HashMap<String, Arc<GroupMeta>>,
}

/// Shared registry of API groups and their versions
pub struct ApiRegistry {
    /// Versions the deployment allows; empty allows everything
    allowed_versions: Vec<GroupVersion>,
    state: RwLock<RegistryState>,
}

impl ApiRegistry {
    pub fn new(allowed_versions: Vec<GroupVersion>) -> Self {
        Self {
            allowed_versions,
            state: RwLock::new(RegistryState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn allowed_versions(&self) -> &[GroupVersion] {
        &self.allowed_versions
    }

    /// Declare versions that may later be enabled
    pub fn register_versions(&self, versions: &[GroupVersion]) {
        let mut state = self.write();
        state.registered_versions.extend(versions.iter().cloned());
    }

    pub fn is_registered_version(&self, version: &GroupVersion) -> bool {
        self.read().registered_versions.contains(version)
    }

    pub fn is_allowed_version(&self, version: &GroupVersion) -> bool {
        self.allowed_versions.is_empty() || self.allowed_versions.contains(version)
    }

    /// Enable `versions`. Nothing is enabled if any of them is unregistered.
    pub fn enable_versions(&self, versions: &[GroupVersion]) -> Result<(), RegistryError> {
        let mut state = self.write();
        if let Some(missing) = versions
            .iter()
            .find(|v| !state.registered_versions.contains(*v))
        {
            return Err(RegistryError::UnregisteredVersion(missing.clone()));
        }
        state.enabled_versions.extend(versions.iter().cloned());
        Ok(())
    }

    pub fn is_enabled_version(&self, version: &GroupVersion) -> bool {
        self.read().enabled_versions.contains(version)
    }

    pub fn enabled_versions(&self) -> Vec<GroupVersion> {
        let mut versions: Vec<_> = self.read().enabled_versions.iter().cloned().collect();
        versions.sort();
        versions
    }

    pub fn enabled_versions_for_group(&self, group: &str) -> Vec<GroupVersion> {
        let mut versions: Vec<_> = self
            .read()
            .enabled_versions
            .iter()
            .filter(|v| v.group == group)
            .cloned()
            .collect();
        versions.sort();
        versions
    }

    /// Register an installed group. Each group name may be registered once.
    pub fn register_group(&self, meta: GroupMeta) -> Result<Arc<GroupMeta>, RegistryError> {
        let mut state = self.write();
        let name = meta.group().to_string();
        if state.groups.contains_key(&name) {
            return Err(RegistryError::GroupAlreadyRegistered(name));
        }
        let meta = Arc::new(meta);
        state.groups.insert(name, meta.clone());
        Ok(meta)
    }

    pub fn group(&self, name: &str) -> Option<Arc<GroupMeta>> {
        self.read().groups.get(name).cloned()
    }

    pub fn is_registered(&self, group: &str) -> bool {
        self.read().groups.contains_key(group)
    }

    /// Preferred version of every registered group, sorted
    pub fn registered_group_versions(&self) -> Vec<GroupVersion> {
        let mut versions: Vec<_> = self
            .read()
            .groups
            .values()
            .map(|meta| meta.group_version.clone())
            .collect();
        versions.sort();
        versions
    }

    pub fn all_preferred_group_versions(&self) -> String {
        self.registered_group_versions()
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Allowed versions that no group has registered
    pub fn unregistered_allowed_versions(&self) -> Vec<GroupVersion> {
        let state = self.read();
        self.allowed_versions
            .iter()
            .filter(|v| !state.registered_versions.contains(*v))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl fmt::Debug for ApiRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("ApiRegistry")
            .field("allowed_versions", &self.allowed_versions)
            .field("registered_versions", &state.registered_versions.len())
            .field("enabled_versions", &state.enabled_versions.len())
            .field("groups", &state.groups.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ApiRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
