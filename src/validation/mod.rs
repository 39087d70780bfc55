//! Validation functionality
//!
//! Provides structural validation of registered mappings:
//! - every configured member exists on the side it refers to
//! - every unconfigured source member has a destination counterpart
//! - every destination member is produced by something

pub mod mappings;

pub use mappings::MappingValidator;
