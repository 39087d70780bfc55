//! Member naming conventions
//!
//! A naming convention knows how to cut a member name into its word parts
//! (via a splitting expression) and how to join word parts back into a member
//! name. Auto-mapping uses the source convention of a profile to split a source
//! member name and the destination convention to join the parts again, which
//! turns e.g. `FullName` into `fullName`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static PASCAL_CASE_PARTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z]+[a-z0-9]*|[a-z0-9]+").unwrap());

static CAMEL_CASE_PARTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+|[A-Z]+[a-z0-9]*").unwrap());

/// Strategy for splitting and joining member names
pub trait NamingConvention: Send + Sync + fmt::Debug {
    /// Expression whose matches are the word parts of a member name
    fn splitting_expression(&self) -> &Regex;

    /// Join word parts into a member name following this convention
    fn transform_property_name(&self, parts: &[&str]) -> String;
}

/// `PascalCase` member names
#[derive(Debug, Clone, Copy, Default)]
pub struct PascalCaseNamingConvention;

impl NamingConvention for PascalCaseNamingConvention {
    fn splitting_expression(&self) -> &Regex {
        &PASCAL_CASE_PARTS
    }

    fn transform_property_name(&self, parts: &[&str]) -> String {
        parts.iter().map(|part| capitalize(part)).collect()
    }
}

/// `camelCase` member names
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCaseNamingConvention;

impl NamingConvention for CamelCaseNamingConvention {
    fn splitting_expression(&self) -> &Regex {
        &CAMEL_CASE_PARTS
    }

    fn transform_property_name(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .enumerate()
            .map(|(index, part)| {
                if index == 0 {
                    decapitalize(part)
                } else {
                    capitalize(part)
                }
            })
            .collect()
    }
}

/// Translate a member name from one convention into another.
///
/// Empty parts are discarded; a name without any parts is returned unchanged.
pub fn translate_member_name(
    name: &str,
    source: &dyn NamingConvention,
    destination: &dyn NamingConvention,
) -> String {
    let parts: Vec<&str> = source
        .splitting_expression()
        .find_iter(name)
        .map(|m| m.as_str())
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        return name.to_string();
    }

    destination.transform_property_name(&parts)
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
