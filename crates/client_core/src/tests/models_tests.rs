use super::*;
use crate::store::Entity;
use shared::{domain::EntityType, protocol::Resource};

fn title() -> Title {
    let entity: Entity = Resource::new(EntityType::Titles, "1")
        .with_attribute("name", "Cool Title")
        .with_attribute(
            "identifiers",
            json!([
                { "type": "ISBN", "subtype": "Online", "id": "978-0-1" },
                { "type": "ISBN", "subtype": "Print", "id": "978-0-2" },
                { "type": "ISBN", "subtype": "Online", "id": "978-0-3" },
                { "type": "ISSN", "subtype": "Empty", "id": "1234-5678" },
                { "type": "Mid", "subtype": "Empty", "id": "mid-1" },
            ]),
        )
        .with_attribute(
            "contributors",
            json!([
                { "type": "author", "contributor": "Ada" },
                { "type": "editor", "contributor": "Grace" },
                { "type": "author", "contributor": "Barbara" },
            ]),
        )
        .with_attribute(
            "subjects",
            json!([
                { "type": "TLI", "subject": "Computers" },
                { "type": "TLI", "subject": "Languages" },
            ]),
        )
        .into();
    entity.project().expect("title projection")
}

#[test]
fn identifiers_group_by_type_and_subtype() {
    assert_eq!(
        title().identifier_groups(),
        vec![
            ("ISBN (Online)".to_string(), vec!["978-0-1".to_string(), "978-0-3".to_string()]),
            ("ISBN (Print)".to_string(), vec!["978-0-2".to_string()]),
            ("ISSN".to_string(), vec!["1234-5678".to_string()]),
        ]
    );
}

#[test]
fn contributors_group_with_plural_labels() {
    assert_eq!(
        title().contributor_groups(),
        vec![
            ("Authors".to_string(), vec!["Ada".to_string(), "Barbara".to_string()]),
            ("Editor".to_string(), vec!["Grace".to_string()]),
        ]
    );
    assert_eq!(title().subjects_label(), "Computers; Languages");
}

#[test]
fn coverage_reads_blank_bounds_as_unset() {
    let package: Package = serde_json::from_value(json!({
        "name": "Cool Package",
        "selectedCount": 1,
        "titleCount": 5,
        "customCoverage": { "beginCoverage": "2003-12-16", "endCoverage": "" },
    }))
    .expect("package");

    assert_eq!(
        package.custom_coverage,
        CoverageRange::new(NaiveDate::from_ymd_opt(2003, 12, 16), None)
    );
    assert_eq!(package.title_count_label(), "1 / 5 Titles");
}

#[test]
fn coverage_writes_unset_bounds_as_empty_strings() {
    let range = CoverageRange::new(None, NaiveDate::from_ymd_opt(2018, 12, 16));

    assert_eq!(
        range.to_attributes()["customCoverage"],
        json!({ "beginCoverage": "", "endCoverage": "2018-12-16" })
    );
    assert_eq!(
        serde_json::to_value(range).expect("serialize"),
        json!({ "beginCoverage": "", "endCoverage": "2018-12-16" })
    );
    assert!(CoverageRange::default().is_empty());
}

#[test]
fn malformed_coverage_date_is_rejected() {
    let parsed = serde_json::from_value::<CoverageRange>(json!({ "beginCoverage": "12/16/2003" }));
    assert!(parsed.is_err());
}

#[test]
fn provider_supports_tokens_only_with_a_prompt() {
    let with_prompt: Provider = serde_json::from_value(json!({
        "name": "Cool Provider",
        "providerToken": { "prompt": "/test1/", "helpText": "<p>help</p>" },
    }))
    .expect("provider");
    let without: Provider = serde_json::from_value(json!({ "name": "Plain Provider" }))
        .expect("provider");

    assert!(with_prompt.supports_tokens());
    assert_eq!(
        with_prompt
            .provider_token
            .as_ref()
            .and_then(|token| token.help_text.as_deref()),
        Some("<p>help</p>")
    );
    assert!(!without.supports_tokens());
}

#[test]
fn customer_resource_selection_label() {
    let resource: CustomerResource = serde_json::from_value(json!({
        "name": "Cool Title",
        "isSelected": true,
        "packageName": "Cool Package",
    }))
    .expect("resource");

    assert_eq!(resource.selection_label(), "Selected");
    assert_eq!(resource.package_name, "Cool Package");
}

#[test]
fn back_button_needs_in_app_navigation() {
    assert!(LocationState::shows_back_button(Some(&LocationState {
        eholdings: true
    })));
    assert!(!LocationState::shows_back_button(Some(&LocationState::default())));
    assert!(!LocationState::shows_back_button(None));
}
