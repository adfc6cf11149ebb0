use super::*;
use chrono::NaiveDate;

fn valid_title() -> TitleFormValues {
    TitleFormValues {
        name: "Practical Rust".into(),
        publisher_name: "Frontside Press".into(),
        publication_type: "Book".into(),
        description: "A book.".into(),
        edition: "2nd".into(),
        is_peer_reviewed: false,
        identifiers: vec![IdentifierField {
            kind: IdentifierType::Isbn,
            id: "978-3-16-148410-0".into(),
        }],
        contributors: vec![ContributorField {
            kind: ContributorType::Author,
            contributor: "Ferris".into(),
        }],
        package_id: Some("19-44".into()),
    }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[test]
fn valid_title_has_no_errors() {
    assert!(validate_all(&valid_title(), TITLE_CREATE_VALIDATORS).is_empty());
}

#[test]
fn empty_create_form_reports_every_required_field() {
    let values = TitleFormValues {
        identifiers: vec![IdentifierField {
            kind: IdentifierType::Issn,
            id: "  ".into(),
        }],
        contributors: vec![ContributorField {
            kind: ContributorType::Editor,
            contributor: String::new(),
        }],
        ..TitleFormValues::default()
    };

    let errors = validate_all(&values, TITLE_CREATE_VALIDATORS);

    assert_eq!(errors.len(), 4);
    assert_eq!(errors.get("name"), Some("Custom title name cannot be blank."));
    assert_eq!(errors.get("identifiers[0].id"), Some("Value cannot be blank."));
    assert_eq!(
        errors.get("contributors[0].contributor"),
        Some("Contributor name cannot be blank.")
    );
    assert_eq!(errors.get("packageId"), Some("Package is required."));
}

#[test]
fn edit_form_does_not_require_a_package() {
    let values = TitleFormValues {
        package_id: None,
        ..valid_title()
    };
    assert!(validate_all(&values, TITLE_EDIT_VALIDATORS).is_empty());
    assert_eq!(
        validate_all(&values, TITLE_CREATE_VALIDATORS).get("packageId"),
        Some("Package is required.")
    );
}

#[test]
fn length_limits_are_exclusive() {
    let values = TitleFormValues {
        name: "n".repeat(399),
        publisher_name: "p".repeat(250),
        description: "d".repeat(400),
        edition: "e".repeat(249),
        identifiers: vec![IdentifierField {
            kind: IdentifierType::Isbn,
            id: "1".repeat(20),
        }],
        ..valid_title()
    };

    let errors = validate_all(&values, TITLE_EDIT_VALIDATORS);

    assert_eq!(errors.get("name"), None);
    assert_eq!(errors.get("publisherName"), Some("Must be less than 250 characters."));
    assert_eq!(errors.get("description"), Some("Must be less than 400 characters."));
    assert_eq!(errors.get("edition"), None);
    assert_eq!(errors.get("identifiers[0].id"), Some("Must be less than 20 characters."));
}

#[test]
fn repeated_fields_are_keyed_by_index() {
    let values = TitleFormValues {
        contributors: vec![
            ContributorField {
                kind: ContributorType::Author,
                contributor: "Ferris".into(),
            },
            ContributorField {
                kind: ContributorType::Illustrator,
                contributor: "c".repeat(250),
            },
        ],
        ..valid_title()
    };

    let errors = validate_contributors(&values);

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.get("contributors[1].contributor"),
        Some("Must be less than 250 characters.")
    );
}

#[test]
fn composition_order_does_not_matter() {
    let values = TitleFormValues::default();
    let reversed: Vec<Validator<TitleFormValues>> =
        TITLE_CREATE_VALIDATORS.iter().rev().copied().collect();

    assert_eq!(
        validate_all(&values, TITLE_CREATE_VALIDATORS),
        validate_all(&values, &reversed)
    );
}

#[test]
fn provider_token_limit() {
    let ok = ProviderFormValues {
        proxy_id: Some("bigTestJS".into()),
        provider_token: Some("t".repeat(499)),
    };
    let too_long = ProviderFormValues {
        provider_token: Some("t".repeat(500)),
        ..ok.clone()
    };

    assert!(validate_all(&ok, PROVIDER_EDIT_VALIDATORS).is_empty());
    assert_eq!(
        validate_all(&too_long, PROVIDER_EDIT_VALIDATORS).get("providerToken"),
        Some("Must be less than 500 characters.")
    );
}

#[test]
fn custom_coverage_needs_a_start_before_the_end() {
    let values = PackageFormValues {
        custom_coverages: vec![
            CoverageRange::new(date(2003, 12, 16), date(2018, 12, 16)),
            CoverageRange::new(None, date(2018, 12, 16)),
            CoverageRange::new(date(2018, 12, 16), date(2003, 12, 16)),
            CoverageRange::new(date(2003, 12, 16), None),
            CoverageRange::default(),
        ],
    };

    let errors = validate_all(&values, PACKAGE_EDIT_VALIDATORS);

    assert_eq!(errors.len(), 2);
    assert_eq!(errors.get("customCoverages[1].beginCoverage"), Some("Enter date"));
    assert_eq!(
        errors.get("customCoverages[2].beginCoverage"),
        Some("Start date must be before end date")
    );
}

#[test]
fn title_attributes_are_trimmed_for_the_wire() {
    let values = TitleFormValues {
        name: "  Practical Rust ".into(),
        ..valid_title()
    };

    let attributes = values.to_attributes();

    assert_eq!(attributes["name"], json!("Practical Rust"));
    assert_eq!(
        attributes["identifiers"],
        json!([{ "type": "ISBN", "subtype": "Empty", "id": "978-3-16-148410-0" }])
    );
    assert_eq!(
        attributes["contributors"],
        json!([{ "type": "author", "contributor": "Ferris" }])
    );
}
