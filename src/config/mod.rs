//! Settings for kconfig-header.
//!
//! Three settings shape a run: the symbol prefix, the header comment, and
//! the source tree used to resolve `source` statements in the schema.
//!
//! ## config.kdl
//!
//! Located at `~/.config/kconfig-header/config.kdl` (per `dirs::config_dir`)
//! unless `--settings <file>` names another file. Contains:
//! - `prefix` - Symbol prefix in `.config` files and macros
//! - `header-comment` - Text written before the include guard
//! - `srctree` - Base directory for `source` statements
//!
//! ## Precedence
//!
//! CLI flag > environment > settings file > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    HEADER_COMMENT_ENV, PREFIX_ENV, Resolved, ResolvedSettings, SRCTREE_ENV, SettingsOverrides,
    ValueSource, resolve_settings, resolve_settings_with,
};
pub use schema::{HeaderSettings, default_settings_path};
