//! formwork-core: the form engine.
//!
//! Turns a form config and the user's form data into an active page
//! sequence, upgrades saved data through versioned migrations, validates
//! active pages, and builds submission payloads.
//!
//! # Public API
//!
//! - [`FormConfig`] -- chapters and pages, from JSON or built in code
//! - [`PageRouter`] -- active pages, routes, redirects, navigation
//! - [`Depends`] -- page visibility, evaluated through one dispatch point
//! - [`migrate()`] -- the saved-data migration pipeline
//! - [`SubmissionTransformer`] -- default and mapped payload builders
//! - [`validate_active_pages()`] -- JSON Schema validation per active page

pub mod config;
pub mod data;
pub mod depends;
pub mod migration;
pub mod router;
pub mod submit;
pub mod validate;

pub use config::{Chapter, ConfigError, FormConfig, Page};
pub use data::FormData;
pub use depends::{Depends, DependsError};
pub use migration::{migrate, Migration, MigrationError, SavedForm};
pub use router::{ActivePage, PageRouter, Resolution, INTRODUCTION_PATH, REVIEW_PATH};
pub use submit::{
    prepare_submission_data, transformer_for, DefaultTransformer, MappedTransformer,
    SubmissionTransformer, TransformError,
};
pub use validate::{validate_active_pages, PageErrors, ValidateError};
