//! Typed read views over cached entity attributes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::protocol::Attributes;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub inherited: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Provider {
    pub name: String,
    pub packages_selected: u64,
    pub packages_total: u64,
    pub proxy: Option<Proxy>,
    pub provider_token: Option<Token>,
}

impl Provider {
    /// Token settings only apply when the provider prompts for one.
    pub fn supports_tokens(&self) -> bool {
        self.provider_token
            .as_ref()
            .and_then(|token| token.prompt.as_deref())
            .is_some_and(|prompt| !prompt.is_empty())
    }
}

/// Custom coverage bounds; on the wire an unset bound is `""`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRange {
    #[serde(default, with = "coverage_date")]
    pub begin_coverage: Option<NaiveDate>,
    #[serde(default, with = "coverage_date")]
    pub end_coverage: Option<NaiveDate>,
}

impl CoverageRange {
    pub fn new(begin_coverage: Option<NaiveDate>, end_coverage: Option<NaiveDate>) -> Self {
        Self {
            begin_coverage,
            end_coverage,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.begin_coverage.is_none() && self.end_coverage.is_none()
    }

    /// Attribute changes for a package update carrying this coverage.
    pub fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(
            "customCoverage".into(),
            json!({
                "beginCoverage": coverage_date::format(self.begin_coverage),
                "endCoverage": coverage_date::format(self.end_coverage),
            }),
        );
        attributes
    }
}

mod coverage_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn format(date: Option<NaiveDate>) -> String {
        date.map(|date| date.format(FORMAT).to_string())
            .unwrap_or_default()
    }

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => NaiveDate::parse_from_str(value, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Package {
    pub name: String,
    pub content_type: String,
    pub is_selected: bool,
    pub is_custom: bool,
    pub selected_count: u64,
    pub title_count: u64,
    pub custom_coverage: CoverageRange,
    pub provider_id: String,
    pub provider_name: String,
    pub proxy: Option<Proxy>,
}

impl Package {
    pub fn title_count_label(&self) -> String {
        let noun = if self.title_count == 1 { "Title" } else { "Titles" };
        format!("{} / {} {noun}", self.selected_count, self.title_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierType {
    Isbn,
    Issn,
}

impl IdentifierType {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentifierType::Isbn => "ISBN",
            IdentifierType::Issn => "ISSN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributorType {
    Author,
    Editor,
    Illustrator,
}

impl ContributorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContributorType::Author => "author",
            ContributorType::Editor => "editor",
            ContributorType::Illustrator => "illustrator",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: Option<String>,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Contributor {
    #[serde(rename = "type")]
    pub kind: String,
    pub contributor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Subject {
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Title {
    pub name: String,
    pub edition: Option<String>,
    pub publisher_name: String,
    pub publication_type: String,
    pub is_peer_reviewed: bool,
    pub is_title_custom: bool,
    pub description: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub contributors: Vec<Contributor>,
    pub subjects: Vec<Subject>,
}

impl Title {
    /// ISBN/ISSN identifiers grouped by type and subtype, in first-seen order.
    /// Labels read `ISBN (Online)`; an `Empty` subtype is left off.
    pub fn identifier_groups(&self) -> Vec<(String, Vec<String>)> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for identifier in &self.identifiers {
            if !matches!(identifier.kind.as_str(), "ISBN" | "ISSN") {
                continue;
            }
            let label = match identifier.subtype.as_deref() {
                Some(subtype) if !subtype.is_empty() && subtype != "Empty" => {
                    format!("{} ({subtype})", identifier.kind)
                }
                _ => identifier.kind.clone(),
            };
            match groups.iter_mut().find(|(existing, _)| *existing == label) {
                Some((_, ids)) => ids.push(identifier.id.clone()),
                None => groups.push((label, vec![identifier.id.clone()])),
            }
        }
        groups
    }

    /// Contributors grouped by type; the label is pluralized for more than one name.
    pub fn contributor_groups(&self) -> Vec<(String, Vec<String>)> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for contributor in &self.contributors {
            match groups
                .iter_mut()
                .find(|(kind, _)| kind.eq_ignore_ascii_case(&contributor.kind))
            {
                Some((_, names)) => names.push(contributor.contributor.clone()),
                None => groups.push((contributor.kind.clone(), vec![contributor.contributor.clone()])),
            }
        }
        groups
            .into_iter()
            .map(|(kind, names)| {
                let mut label = capitalize(&kind);
                if names.len() > 1 {
                    label.push('s');
                }
                (label, names)
            })
            .collect()
    }

    pub fn subjects_label(&self) -> String {
        self.subjects
            .iter()
            .map(|subject| subject.subject.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerResource {
    pub name: String,
    pub is_selected: bool,
    pub url: Option<String>,
    pub title_id: String,
    pub package_id: String,
    pub package_name: String,
    pub provider_id: String,
    pub provider_name: String,
    pub content_type: String,
    pub publication_type: String,
    pub custom_coverages: Vec<CoverageRange>,
    pub proxy: Option<Proxy>,
}

impl CustomerResource {
    pub fn selection_label(&self) -> &'static str {
        if self.is_selected {
            "Selected"
        } else {
            "Not selected"
        }
    }
}

/// History state a host router attaches to in-app navigations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocationState {
    pub eholdings: bool,
}

impl LocationState {
    /// True only for navigations that started inside the eholdings app.
    pub fn shows_back_button(state: Option<&LocationState>) -> bool {
        state.is_some_and(|state| state.eholdings)
    }
}

#[cfg(test)]
#[path = "tests/models_tests.rs"]
mod tests;
