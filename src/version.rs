//! Group/version/kind identifiers

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::VersionParseError;

/// Version string used for a group's internal (hub) representation
pub const INTERNAL_VERSION: &str = "__internal";

fn group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
            .expect("group pattern is valid")
    })
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9.]*[a-z0-9])?$").expect("version pattern is valid")
    })
}

/// One API version within one API group.
///
/// The legacy group is the empty string, so `v1` and `/v1` name the same
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    /// The internal version of `group`
    pub fn internal(group: impl Into<String>) -> Self {
        Self::new(group, INTERNAL_VERSION)
    }

    /// Parse `version`, `group/version` or the empty string.
    pub fn parse(s: &str) -> Result<Self, VersionParseError> {
        if s.is_empty() || s == "/" {
            return Ok(Self::default());
        }

        let (group, version) = match s.split_once('/') {
            None => ("", s),
            Some((_, rest)) if rest.contains('/') => {
                return Err(VersionParseError::TooManySegments(s.to_string()))
            }
            Some((group, version)) => (group, version),
        };

        if !group.is_empty() && !group_pattern().is_match(group) {
            return Err(VersionParseError::InvalidGroup(group.to_string()));
        }
        if version != INTERNAL_VERSION && !version_pattern().is_match(version) {
            return Err(VersionParseError::InvalidVersion(version.to_string()));
        }

        Ok(Self::new(group, version))
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.version.is_empty()
    }

    pub fn is_internal(&self) -> bool {
        self.version == INTERNAL_VERSION
    }

    pub fn with_kind(&self, kind: impl Into<String>) -> GroupVersionKind {
        GroupVersionKind {
            group: self.group.clone(),
            version: self.version.clone(),
            kind: kind.into(),
        }
    }

    pub fn with_resource(&self, resource: impl Into<String>) -> GroupVersionResource {
        GroupVersionResource {
            group: self.group.clone(),
            version: self.version.clone(),
            resource: resource.into(),
        }
    }
}

impl Default for GroupVersion {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

impl FromStr for GroupVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A kind within a group, independent of version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(self.group.clone(), self.version.clone())
    }

    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group.clone(), self.kind.clone())
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, Kind={}", self.group, self.version, self.kind)
    }
}

/// A resource path segment within a group version.
///
/// Empty group or version fields act as wildcards when used as a query
/// against a REST mapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    /// A query that matches `resource` in any group and version
    pub fn partial(resource: impl Into<String>) -> Self {
        Self {
            group: String::new(),
            version: String::new(),
            resource: resource.into(),
        }
    }

    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(self.group.clone(), self.version.clone())
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, Resource={}", self.group, self.version, self.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_version() {
        let gv = GroupVersion::parse("v1").unwrap();
        assert_eq!(gv, GroupVersion::new("", "v1"));
        assert_eq!(gv.to_string(), "v1");
    }

    #[test]
    fn test_parse_group_version() {
        let gv: GroupVersion = "image.openshift.io/v1".parse().unwrap();
        assert_eq!(gv.group, "image.openshift.io");
        assert_eq!(gv.version, "v1");
        assert_eq!(gv.to_string(), "image.openshift.io/v1");
    }

    #[test]
    fn test_parse_empty() {
        assert!(GroupVersion::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            GroupVersion::parse("a/b/c"),
            Err(VersionParseError::TooManySegments(_))
        ));
        assert!(matches!(
            GroupVersion::parse("Image.io/v1"),
            Err(VersionParseError::InvalidGroup(_))
        ));
        assert!(matches!(
            GroupVersion::parse("v 1"),
            Err(VersionParseError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_docker_versions_parse() {
        assert_eq!(GroupVersion::parse("1.0").unwrap().version, "1.0");
        assert_eq!(GroupVersion::parse("pre012").unwrap().version, "pre012");
    }

    #[test]
    fn test_internal_version() {
        let gv = GroupVersion::internal("");
        assert!(gv.is_internal());
        assert_eq!(GroupVersion::parse("__internal").unwrap(), gv);
    }

    #[test]
    fn test_gvk_display() {
        let gvk = GroupVersion::new("", "v1").with_kind("Image");
        assert_eq!(gvk.to_string(), "/v1, Kind=Image");
        assert_eq!(gvk.group_kind().to_string(), "Image");
    }
}
