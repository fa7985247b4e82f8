//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! topology file (JSON)
//!     → loader.rs (parse & deserialize)
//!     → schema.rs apply_overrides (CLI flags win)
//!     → validation.rs (semantic checks, all errors collected)
//!     → RouterConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On admin reload:
//!     loader.rs re-reads the file
//!     → same override + validation pipeline
//!     → atomic swap of the RouterState built from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a full reload
//! - All sections except pools/routes/threshold have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{RouterConfig, RuntimeOverrides};
pub use validation::{validate_config, ValidationError};
