//! Per-field form validation.
//!
//! Each validator inspects one field (or one repeated group of fields) and
//! reports errors under keys no other validator writes, so composing them with
//! [`validate_all`] gives the same result in any order.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use shared::protocol::Attributes;

use crate::models::{ContributorType, CoverageRange, IdentifierType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn absorb(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            debug_assert!(
                !self.0.contains_key(&field),
                "validators must own disjoint fields, {field} reported twice"
            );
            self.0.insert(field, message);
        }
    }
}

pub type Validator<V> = fn(&V) -> FieldErrors;

pub fn validate_all<V>(values: &V, validators: &[Validator<V>]) -> FieldErrors {
    validators
        .iter()
        .fold(FieldErrors::new(), |mut errors, validator| {
            errors.absorb(validator(values));
            errors
        })
}

fn too_long(value: &str, limit: usize) -> bool {
    value.chars().count() >= limit
}

fn length_message(limit: usize) -> String {
    format!("Must be less than {limit} characters.")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierField {
    pub kind: IdentifierType,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorField {
    pub kind: ContributorType,
    pub contributor: String,
}

/// Values of the custom title create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleFormValues {
    pub name: String,
    pub publisher_name: String,
    pub publication_type: String,
    pub description: String,
    pub edition: String,
    pub is_peer_reviewed: bool,
    pub identifiers: Vec<IdentifierField>,
    pub contributors: Vec<ContributorField>,
    pub package_id: Option<String>,
}

impl TitleFormValues {
    pub fn to_attributes(&self) -> Attributes {
        let identifiers: Vec<Value> = self
            .identifiers
            .iter()
            .map(|identifier| {
                json!({
                    "type": identifier.kind.as_str(),
                    "subtype": "Empty",
                    "id": identifier.id.trim(),
                })
            })
            .collect();
        let contributors: Vec<Value> = self
            .contributors
            .iter()
            .map(|contributor| {
                json!({
                    "type": contributor.kind.as_str(),
                    "contributor": contributor.contributor.trim(),
                })
            })
            .collect();

        let mut attributes = Attributes::new();
        attributes.insert("name".into(), json!(self.name.trim()));
        attributes.insert("publisherName".into(), json!(self.publisher_name.trim()));
        attributes.insert("publicationType".into(), json!(self.publication_type));
        attributes.insert("description".into(), json!(self.description.trim()));
        attributes.insert("edition".into(), json!(self.edition.trim()));
        attributes.insert("isPeerReviewed".into(), json!(self.is_peer_reviewed));
        attributes.insert("identifiers".into(), Value::Array(identifiers));
        attributes.insert("contributors".into(), Value::Array(contributors));
        attributes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderFormValues {
    pub proxy_id: Option<String>,
    pub provider_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFormValues {
    pub custom_coverages: Vec<CoverageRange>,
}

pub fn validate_name(values: &TitleFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if values.name.trim().is_empty() {
        errors.insert("name", "Custom title name cannot be blank.");
    } else if too_long(&values.name, 400) {
        errors.insert("name", length_message(400));
    }
    errors
}

pub fn validate_publisher_name(values: &TitleFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if too_long(&values.publisher_name, 250) {
        errors.insert("publisherName", length_message(250));
    }
    errors
}

pub fn validate_description(values: &TitleFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if too_long(&values.description, 400) {
        errors.insert("description", length_message(400));
    }
    errors
}

pub fn validate_edition(values: &TitleFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if too_long(&values.edition, 250) {
        errors.insert("edition", length_message(250));
    }
    errors
}

pub fn validate_identifiers(values: &TitleFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (index, identifier) in values.identifiers.iter().enumerate() {
        let field = format!("identifiers[{index}].id");
        if identifier.id.trim().is_empty() {
            errors.insert(field, "Value cannot be blank.");
        } else if too_long(&identifier.id, 20) {
            errors.insert(field, length_message(20));
        }
    }
    errors
}

pub fn validate_contributors(values: &TitleFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (index, contributor) in values.contributors.iter().enumerate() {
        let field = format!("contributors[{index}].contributor");
        if contributor.contributor.trim().is_empty() {
            errors.insert(field, "Contributor name cannot be blank.");
        } else if too_long(&contributor.contributor, 250) {
            errors.insert(field, length_message(250));
        }
    }
    errors
}

pub fn validate_package_select(values: &TitleFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let missing = values
        .package_id
        .as_deref()
        .map(str::trim)
        .map_or(true, str::is_empty);
    if missing {
        errors.insert("packageId", "Package is required.");
    }
    errors
}

pub fn validate_provider_token(values: &ProviderFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if let Some(token) = values.provider_token.as_deref() {
        if too_long(token, 500) {
            errors.insert("providerToken", length_message(500));
        }
    }
    errors
}

pub fn validate_custom_coverage(values: &PackageFormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (index, range) in values.custom_coverages.iter().enumerate() {
        let field = format!("customCoverages[{index}].beginCoverage");
        match (range.begin_coverage, range.end_coverage) {
            (None, Some(_)) => errors.insert(field, "Enter date"),
            (Some(begin), Some(end)) if begin > end => {
                errors.insert(field, "Start date must be before end date")
            }
            _ => {}
        }
    }
    errors
}

pub const TITLE_CREATE_VALIDATORS: &[Validator<TitleFormValues>] = &[
    validate_name,
    validate_publisher_name,
    validate_description,
    validate_edition,
    validate_identifiers,
    validate_contributors,
    validate_package_select,
];

pub const TITLE_EDIT_VALIDATORS: &[Validator<TitleFormValues>] = &[
    validate_name,
    validate_publisher_name,
    validate_description,
    validate_edition,
    validate_identifiers,
    validate_contributors,
];

pub const PROVIDER_EDIT_VALIDATORS: &[Validator<ProviderFormValues>] = &[validate_provider_token];

pub const PACKAGE_EDIT_VALIDATORS: &[Validator<PackageFormValues>] = &[validate_custom_coverage];

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
