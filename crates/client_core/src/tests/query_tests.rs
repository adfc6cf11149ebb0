use super::*;

fn provider_packages() -> QueryScope {
    QueryScope::Related {
        parent: EntityKey::new(EntityType::Providers, "19"),
        kind: EntityType::Packages,
    }
}

fn keys(ids: &[&str]) -> Vec<EntityKey> {
    ids.iter()
        .map(|id| EntityKey::new(EntityType::Packages, *id))
        .collect()
}

#[test]
fn query_string_keeps_a_fixed_parameter_order() {
    let params = SearchParams {
        q: Some(" other ordinary ".into()),
        selected: SelectedFilter::NotSelected,
        content_type: Some("E-Book".into()),
        sort: SortOrder::Name,
    };

    assert_eq!(
        params.to_query_string(2, 25),
        "q=other+ordinary&filter%5Bselected%5D=false&filter%5Btype%5D=e-book&sort=name&page=2&count=25"
    );
}

#[test]
fn defaults_are_left_off_the_query_string() {
    assert_eq!(
        SearchParams::term("ordinary").to_query_string(1, 25),
        "q=ordinary&page=1&count=25"
    );
}

#[test]
fn empty_term_cannot_search() {
    assert!(!SearchParams::default().can_search());
    assert!(!SearchParams::term("   ").can_search());
    assert!(SearchParams::term("ordinary").can_search());
}

#[test]
fn filter_count_ignores_sort() {
    let mut params = SearchParams::term("ordinary");
    assert_eq!(params.filter_count(), 1);

    params.sort = SortOrder::Name;
    assert_eq!(params.filter_count(), 1);

    params.selected = SelectedFilter::Selected;
    params.content_type = Some("ebook".into());
    assert_eq!(params.filter_count(), 3);
}

#[test]
fn related_scope_path() {
    assert_eq!(provider_packages().path(), "providers/19/packages");
    assert_eq!(
        QueryScope::Root(EntityType::CustomerResources).path(),
        "customer-resources"
    );
}

#[test]
fn page_path_carries_page_size() {
    let collection = QueryCollection::new(provider_packages(), SearchParams::term("ordinary"), 10);
    assert_eq!(
        collection.page_path(3),
        "providers/19/packages?q=ordinary&page=3&count=10"
    );
}

#[test]
fn cache_key_ignores_page() {
    let params = SearchParams::term("ordinary");
    let a = QueryCollection::new(provider_packages(), params.clone(), 25);
    assert_eq!(
        QueryCollection::cache_key(&a.scope, &a.params),
        QueryCollection::cache_key(&provider_packages(), &params)
    );
    assert_ne!(
        QueryCollection::cache_key(&provider_packages(), &params),
        QueryCollection::cache_key(&provider_packages(), &SearchParams::term("cool"))
    );
}

#[test]
fn items_are_addressed_by_offset() {
    let mut collection = QueryCollection::new(provider_packages(), SearchParams::default(), 2);
    assert_eq!(collection.item_at(0), ItemSlot::NotLoaded);
    assert_eq!(collection.record_count_label(), "Loading...");

    collection.record_page(2, keys(&["c", "d"]), 5);

    assert_eq!(collection.page_for_offset(3), 2);
    assert_eq!(collection.item_at(0), ItemSlot::NotLoaded);
    assert_eq!(collection.item_at(3), ItemSlot::Loaded(keys(&["d"])[0].clone()));
    assert_eq!(collection.item_at(5), ItemSlot::OutOfRange);
    assert_eq!(collection.record_count_label(), "5 records found");
}

#[test]
fn pages_in_range_skips_loaded_and_out_of_range_pages() {
    let mut collection = QueryCollection::new(provider_packages(), SearchParams::default(), 25);
    collection.record_page(1, keys(&["a"]), 80);

    assert_eq!(collection.pages_in_range(0, 60), vec![2, 3]);
    assert_eq!(collection.pages_in_range(60, 100), vec![3, 4]);
    assert_eq!(collection.pages_in_range(80, 10), Vec::<u32>::new());

    collection.record_page(2, keys(&["b"]), 30);

    assert_eq!(collection.pages_in_range(0, 60), Vec::<u32>::new());
    assert_eq!(collection.pages_in_range(30, 10), Vec::<u32>::new());
    assert_eq!(collection.pages_in_range(0, 0), Vec::<u32>::new());
}

#[test]
fn unknown_total_plans_only_the_first_page() {
    let collection = QueryCollection::new(provider_packages(), SearchParams::default(), 25);
    assert_eq!(collection.pages_in_range(0, 1000), vec![1]);
    assert_eq!(collection.pages_in_range(50, 1000), vec![3]);
}

#[test]
fn huge_offsets_do_not_overflow() {
    let mut collection = QueryCollection::new(provider_packages(), SearchParams::default(), 1);
    assert_eq!(collection.page_for_offset(u64::MAX), u32::MAX);
    assert_eq!(collection.page_for_offset(u64::from(u32::MAX) - 1), u32::MAX);
    assert_eq!(collection.pages_in_range(u64::MAX, u64::MAX), vec![u32::MAX]);

    collection.record_page(1, keys(&["a"]), u64::MAX);
    assert_eq!(collection.pages_in_range(u64::MAX - 1, u64::MAX), vec![u32::MAX]);
    assert_eq!(collection.item_at(u64::MAX - 1), ItemSlot::NotLoaded);
}

#[test]
fn blank_content_type_is_no_filter() {
    let params = SearchParams {
        content_type: Some("  ".into()),
        ..SearchParams::term("ordinary")
    };
    assert_eq!(params.filter_count(), 1);
    assert_eq!(params.to_query_string(1, 25), "q=ordinary&page=1&count=25");

    let params = SearchParams {
        content_type: Some(" E-Journal ".into()),
        ..params
    };
    assert_eq!(params.filter_count(), 2);
    assert_eq!(
        params.to_query_string(1, 25),
        "q=ordinary&filter%5Btype%5D=e-journal&page=1&count=25"
    );
}

#[test]
fn loaded_keys_follow_page_order() {
    let mut collection = QueryCollection::new(provider_packages(), SearchParams::default(), 1);
    collection.record_page(2, keys(&["b"]), 2);
    collection.record_page(1, keys(&["a"]), 2);

    assert_eq!(collection.loaded_keys(), keys(&["a", "b"]));
}

#[test]
fn empty_results_explain_the_search() {
    let mut collection =
        QueryCollection::new(provider_packages(), SearchParams::term("nothing"), 25);
    collection.record_page(1, Vec::new(), 0);

    assert!(collection.is_empty());
    assert_eq!(collection.record_count_label(), "0 records found");
    assert_eq!(collection.not_found_message(), "No packages found for \"nothing\".");
}
