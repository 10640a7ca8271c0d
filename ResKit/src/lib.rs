//! # ResKit
//!
//! A pure-Rust library for reading application resource indexes and picking
//! the resource variant that best fits a device configuration.
//!
//! ## Overview
//!
//! - **Configurations** - locale, direction, device type, color mode, input device,
//!   screen density and MCC/MNC, with matching and ranking
//! - **Resource indexes** - eager and lazy binary layouts, plus a writer
//! - **Packages** - plain index files or `.hap`/`.hsp` archives, with overlays
//! - **Managers** - layered lookup across application, overlay and system packages
//! - **References** - `$type:id` chains and pattern/theme inheritance
//!
//! ## Quick Start
//!
//! ### Looking Up a String
//!
//! ```no_run
//! use std::sync::Arc;
//! use reskit::prelude::*;
//!
//! let manager = ResourcePackageManager::new(Arc::new(PackageCache::new()));
//! manager.add_resource("entry/resources.index", SelectedTypes::ALL)?;
//! manager.update_res_config(ResConfig::new().with_locale_tag("de-DE")?)?;
//!
//! let resolver = ReferenceResolver::new(&manager);
//! let title = resolver.get_string(("app_name", ResType::String))?;
//! println!("{title}");
//! # Ok::<(), reskit::Error>(())
//! ```
//!
//! ### Writing an Index
//!
//! ```no_run
//! use reskit::index::{IdItem, IndexFormat, IndexWriter, ResType};
//! use reskit::res_config::ResConfig;
//!
//! let mut writer = IndexWriter::new();
//! let key = writer.add_key(&"zh_CN-dark".parse::<ResConfig>()?)?;
//! writer.add_value(key, 0x0100_0000, IdItem::single(ResType::String, "app_name", "应用"))?;
//! writer.write_to("resources.index", IndexFormat::Lazy)?;
//! # Ok::<(), reskit::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `reskit` command-line binary

pub mod error;
pub mod settings;
pub mod res_config;
pub mod index;
pub mod package;
pub mod cache;
pub mod raw_file;
pub mod manager;
pub mod resolver;
pub mod plural;
pub mod system;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::res_config::{
        ColorMode, DeviceType, Direction, InputDevice, LocaleMatcher, ResConfig, ResLocale,
        ScreenDensity,
    };
    pub use crate::index::{IdItem, IndexFormat, IndexWriter, ResType, SelectedTypes};
    pub use crate::package::{PackageKind, QualifierVariant, ResourcePackage, ResourceQuery};
    pub use crate::cache::PackageCache;
    pub use crate::manager::{ManagerOptions, ResourcePackageManager};
    pub use crate::resolver::{FormatArg, ReferenceResolver, ResolvedValue};
    pub use crate::plural::{PluralCategory, PluralRuleProvider};
    pub use crate::settings::Settings;
    pub use crate::system::SystemResources;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module and log setup (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod logging;
