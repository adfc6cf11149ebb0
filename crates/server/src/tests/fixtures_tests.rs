use super::*;

fn ids(resources: &[Resource]) -> Vec<&str> {
    resources.iter().map(|resource| resource.id.as_str()).collect()
}

fn query(q: &str) -> SearchQuery {
    SearchQuery {
        q: Some(q.into()),
        ..SearchQuery::default()
    }
}

#[test]
fn content_types_compare_loosely() {
    assert_eq!(normalize_type("E-Book"), "ebook");
    assert_eq!(normalize_type("Online Reference"), "onlinereference");
}

#[test]
fn from_json_reads_the_data_array() {
    let fixtures = Fixtures::from_json(
        r#"{"data":[{"type":"titles","id":"7","attributes":{"name":"Seven"}}]}"#,
    )
    .expect("fixtures");
    assert_eq!(fixtures.len(), 1);
    let title = fixtures
        .get(&EntityKey::new(EntityType::Titles, "7"))
        .expect("title");
    assert_eq!(title.attributes["name"], json!("Seven"));
    assert_eq!(
        title.relationships["customerResources"],
        Relationship::many(Vec::new())
    );

    assert!(Fixtures::from_json(r#"{"items":[]}"#).is_err());
}

#[test]
fn load_reports_the_missing_path() {
    let err = Fixtures::load(Path::new("/nonexistent/fixtures.json")).expect_err("missing file");
    assert!(err.to_string().contains("/nonexistent/fixtures.json"));
}

#[test]
fn customer_resources_link_to_their_parents() {
    let fixtures = Fixtures::demo();
    let resource = fixtures
        .get(&EntityKey::new(EntityType::CustomerResources, "19-2-1001"))
        .expect("resource");
    assert_eq!(
        resource.relationships["package"],
        Relationship::one(EntityType::Packages, "19-2")
    );
    assert_eq!(
        resource.relationships["title"],
        Relationship::one(EntityType::Titles, "1001")
    );
    assert_eq!(
        resource.relationships["provider"],
        Relationship::one(EntityType::Providers, "19")
    );

    let provider = fixtures
        .get(&EntityKey::new(EntityType::Providers, "19"))
        .expect("provider");
    assert_eq!(provider.relationships["packages"].keys().len(), 3);
    assert!(!provider.relationships.contains_key("provider"));
}

#[test]
fn search_ranks_by_matching_terms() {
    let fixtures = Fixtures::demo();
    let (found, total) = fixtures.search(EntityType::Packages, None, &query("other ordinary"));
    assert_eq!(ids(&found), vec!["19-2", "19-1"]);
    assert_eq!(total, 2);

    let (found, _) = fixtures.search(EntityType::Packages, None, &query("COOL"));
    assert_eq!(ids(&found), vec!["19-3"]);

    let (found, total) = fixtures.search(EntityType::Packages, None, &query("nothing"));
    assert!(found.is_empty());
    assert_eq!(total, 0);
}

#[test]
fn search_filters_compose() {
    let fixtures = Fixtures::demo();
    let unselected = SearchQuery {
        selected: Some("false".into()),
        ..query("package")
    };
    let (found, _) = fixtures.search(EntityType::Packages, None, &unselected);
    assert_eq!(ids(&found), vec!["19-1", "19-3"]);

    let journals = SearchQuery {
        content_type: Some("e-journal".into()),
        ..unselected.clone()
    };
    let (found, _) = fixtures.search(EntityType::Packages, None, &journals);
    assert_eq!(ids(&found), vec!["19-3"]);

    let everything = SearchQuery {
        content_type: Some("all".into()),
        selected: Some("maybe".into()),
        ..query("package")
    };
    let (_, total) = fixtures.search(EntityType::Packages, None, &everything);
    assert_eq!(total, 3);
}

#[test]
fn search_pages_clamp_to_one() {
    let fixtures = Fixtures::demo();
    let first = SearchQuery {
        page: Some(0),
        count: Some(0),
        ..SearchQuery::default()
    };
    let (found, total) = fixtures.search(EntityType::Packages, None, &first);
    assert_eq!(ids(&found), vec!["19-1"]);
    assert_eq!(total, 3);

    let beyond = SearchQuery {
        page: Some(9),
        ..SearchQuery::default()
    };
    let (found, total) = fixtures.search(EntityType::Packages, None, &beyond);
    assert!(found.is_empty());
    assert_eq!(total, 3);
}

#[test]
fn search_pages_past_the_address_space_are_empty() {
    let fixtures = Fixtures::demo();
    let huge = SearchQuery {
        page: Some(usize::MAX),
        count: Some(usize::MAX),
        ..SearchQuery::default()
    };
    let (found, total) = fixtures.search(EntityType::Packages, None, &huge);
    assert!(found.is_empty());
    assert_eq!(total, 3);

    let last_page = SearchQuery {
        page: Some(usize::MAX),
        count: Some(1),
        ..SearchQuery::default()
    };
    let (found, total) = fixtures.search(EntityType::Packages, None, &last_page);
    assert!(found.is_empty());
    assert_eq!(total, 3);
}

#[test]
fn deselecting_a_resource_lowers_the_package_count() {
    let mut fixtures = Fixtures::demo();
    let mut changes = Attributes::new();
    changes.insert("isSelected".into(), json!(false));

    let updated = fixtures
        .update(&EntityKey::new(EntityType::CustomerResources, "19-2-1001"), changes.clone())
        .expect("updated");
    assert_eq!(updated.attributes["isSelected"], json!(false));

    let package = fixtures
        .get(&EntityKey::new(EntityType::Packages, "19-2"))
        .expect("package");
    assert_eq!(package.attributes["selectedCount"], json!(0));

    // unchanged selection leaves the count alone
    fixtures
        .update(&EntityKey::new(EntityType::CustomerResources, "19-2-1001"), changes)
        .expect("updated");
    let package = fixtures
        .get(&EntityKey::new(EntityType::Packages, "19-2"))
        .expect("package");
    assert_eq!(package.attributes["selectedCount"], json!(0));
}

#[test]
fn update_of_an_unknown_key_changes_nothing() {
    let mut fixtures = Fixtures::demo();
    let before = fixtures.len();
    assert!(fixtures
        .update(&EntityKey::new(EntityType::Titles, "404"), Attributes::new())
        .is_none());
    assert_eq!(fixtures.len(), before);
}

#[test]
fn created_titles_join_their_package() {
    let mut fixtures = Fixtures::demo();
    let mut write = ResourceWrite {
        kind: EntityType::Titles,
        id: None,
        attributes: Attributes::new(),
        relationships: Default::default(),
    };
    write.attributes.insert("name".into(), json!("Crab Handbook"));
    write.attributes.insert("publicationType".into(), json!("Book"));
    write.relationships.insert(
        "packages".into(),
        Relationship::one(EntityType::Packages, "19-1"),
    );

    let (title, resource) = fixtures.create_title(write).expect("created");
    let resource = resource.expect("customer resource");
    assert_eq!(resource.id.as_str(), format!("19-1-{}", title.id));
    assert_eq!(resource.attributes["name"], json!("Crab Handbook"));
    assert_eq!(resource.attributes["contentType"], json!("E-Book"));
    assert_eq!(resource.attributes["providerName"], json!("Cool Provider"));
    assert_eq!(title.relationships["customerResources"].keys(), vec![resource.key()]);

    let package = fixtures
        .get(&EntityKey::new(EntityType::Packages, "19-1"))
        .expect("package");
    assert_eq!(package.attributes["titleCount"], json!(2));
    assert_eq!(package.attributes["selectedCount"], json!(1));
    assert_eq!(package.relationships["customerResources"].keys().len(), 2);
}
