//! API Group Registry
//!
//! Registers API groups into a shared registry at startup: their versions,
//! the scheme types and conversions for each version, and the REST mapping
//! the serving layer uses to find resources.
//!
//! ## Install flow
//!
//! ```text
//! register_versions(candidates)
//!   └─ filter by allowed versions ── none left ──> Skipped
//!        └─ enable_versions(external)
//!             └─ add enabled versions to the Scheme
//!                  └─ build RestMapper + GroupMeta ──> register_group
//!                       └─ post-install hooks
//! ```
//!
//! ## Example
//!
//! ```
//! use apigroup_registry::{groups::image, FrameworkContext, InstallOutcome};
//!
//! let ctx = FrameworkContext::default();
//! let outcome = image::install(&ctx).expect("image group installs");
//! assert!(matches!(outcome, InstallOutcome::Installed { .. }));
//! assert!(ctx.registry().is_registered(image::GROUP_NAME));
//! ```

pub mod accessor;
pub mod config;
pub mod context;
pub mod error;
pub mod groups;
pub mod install;
pub mod registry;
pub mod restmapper;
pub mod scheme;
pub mod version;

pub use accessor::{Accessor, MetadataAccessor, SelfLinker};
pub use config::FrameworkConfig;
pub use context::FrameworkContext;
pub use error::{AccessorError, InstallError, MapperError, RegistryError, Result, SchemeError, VersionParseError};
pub use install::{install_group, GroupSpec, InstallOutcome, VersionBinding};
pub use registry::{ApiRegistry, GroupMeta, VersionInterfaces};
pub use restmapper::{DefaultRestMapper, RestMapper, RestMapping, RestScope};
pub use scheme::{ObjectConvertor, Scheme};
pub use version::{GroupKind, GroupVersion, GroupVersionKind, GroupVersionResource};
