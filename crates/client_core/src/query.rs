use std::collections::BTreeMap;

use shared::domain::{EntityKey, EntityType};
use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectedFilter {
    #[default]
    All,
    Selected,
    NotSelected,
}

impl SelectedFilter {
    pub fn as_param(self) -> &'static str {
        match self {
            SelectedFilter::All => "all",
            SelectedFilter::Selected => "true",
            SelectedFilter::NotSelected => "false",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Relevance,
    Name,
}

impl SortOrder {
    pub fn as_param(self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevance",
            SortOrder::Name => "name",
        }
    }
}

/// Search term plus the filters of a search pane.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub selected: SelectedFilter,
    /// `None` means every content type.
    pub content_type: Option<String>,
    pub sort: SortOrder,
}

impl SearchParams {
    pub fn term(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    fn trimmed_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// A blank type filters nothing.
    fn type_filter(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|content_type| !content_type.is_empty())
    }

    /// An empty term disables the search button.
    pub fn can_search(&self) -> bool {
        self.trimmed_term().is_some()
    }

    /// The badge count: a search term and each filter away from its default. Sort is not a filter.
    pub fn filter_count(&self) -> usize {
        usize::from(self.can_search())
            + usize::from(self.selected != SelectedFilter::All)
            + usize::from(self.type_filter().is_some())
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = self.trimmed_term() {
            pairs.push(("q", q.to_string()));
        }
        if self.selected != SelectedFilter::All {
            pairs.push(("filter[selected]", self.selected.as_param().to_string()));
        }
        if let Some(content_type) = self.type_filter() {
            pairs.push(("filter[type]", content_type.to_lowercase()));
        }
        if self.sort != SortOrder::Relevance {
            pairs.push(("sort", self.sort.as_param().to_string()));
        }
        pairs
    }

    /// Encoded query string for one page; parameters come in a fixed order.
    pub fn to_query_string(&self, page: u32, count: u32) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.pairs() {
            serializer.append_pair(name, &value);
        }
        serializer.append_pair("page", &page.to_string());
        serializer.append_pair("count", &count.to_string());
        serializer.finish()
    }
}

/// Where a collection is served from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryScope {
    Root(EntityType),
    Related { parent: EntityKey, kind: EntityType },
}

impl QueryScope {
    pub fn kind(&self) -> EntityType {
        match self {
            QueryScope::Root(kind) => *kind,
            QueryScope::Related { kind, .. } => *kind,
        }
    }

    pub fn path(&self) -> String {
        match self {
            QueryScope::Root(kind) => kind.path().to_string(),
            QueryScope::Related { parent, kind } => {
                format!("{}/{}", parent.resource_path(), kind.path())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSlot {
    Loaded(EntityKey),
    /// Inside the result count but its page has not been fetched.
    NotLoaded,
    OutOfRange,
}

/// Offset-addressed results of one search, filled a page at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCollection {
    pub scope: QueryScope,
    pub params: SearchParams,
    pub page_size: u32,
    total_results: Option<u64>,
    pages: BTreeMap<u32, Vec<EntityKey>>,
}

impl QueryCollection {
    pub fn new(scope: QueryScope, params: SearchParams, page_size: u32) -> Self {
        Self {
            scope,
            params,
            page_size: page_size.max(1),
            total_results: None,
            pages: BTreeMap::new(),
        }
    }

    /// Identity of the collection regardless of page.
    pub fn cache_key(scope: &QueryScope, params: &SearchParams) -> String {
        format!("{}?{}", scope.path(), params.to_query_string(0, 0))
    }

    pub fn page_path(&self, page: u32) -> String {
        format!(
            "{}?{}",
            self.scope.path(),
            self.params.to_query_string(page, self.page_size)
        )
    }

    /// One-based page holding `offset`, saturating at the last addressable page.
    pub fn page_for_offset(&self, offset: u64) -> u32 {
        u32::try_from(offset / u64::from(self.page_size))
            .ok()
            .and_then(|page| page.checked_add(1))
            .unwrap_or(u32::MAX)
    }

    pub fn record_page(&mut self, page: u32, keys: Vec<EntityKey>, total_results: u64) {
        self.total_results = Some(total_results);
        self.pages.insert(page, keys);
    }

    pub fn is_page_loaded(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    pub fn total_results(&self) -> Option<u64> {
        self.total_results
    }

    pub fn is_empty(&self) -> bool {
        self.total_results == Some(0)
    }

    pub fn item_at(&self, offset: u64) -> ItemSlot {
        if let Some(total) = self.total_results {
            if offset >= total {
                return ItemSlot::OutOfRange;
            }
        }
        let page = self.page_for_offset(offset);
        let index = (offset % u64::from(self.page_size)) as usize;
        match self.pages.get(&page) {
            Some(keys) => keys
                .get(index)
                .cloned()
                .map_or(ItemSlot::OutOfRange, ItemSlot::Loaded),
            None => ItemSlot::NotLoaded,
        }
    }

    /// Pages needed to show `len` rows starting at `offset` that are not loaded yet.
    ///
    /// Until a page has reported the result count only the page holding
    /// `offset` is planned.
    pub fn pages_in_range(&self, offset: u64, len: u64) -> Vec<u32> {
        let Some(span) = len.checked_sub(1) else {
            return Vec::new();
        };
        let first = self.page_for_offset(offset);
        let Some(total) = self.total_results else {
            return if self.is_page_loaded(first) {
                Vec::new()
            } else {
                vec![first]
            };
        };
        if total == 0 || offset >= total {
            return Vec::new();
        }
        let last = offset.saturating_add(span).min(total - 1);
        (first..=self.page_for_offset(last))
            .filter(|page| !self.is_page_loaded(*page))
            .collect()
    }

    /// Every loaded key in offset order.
    pub fn loaded_keys(&self) -> Vec<EntityKey> {
        self.pages.values().flatten().cloned().collect()
    }

    pub fn record_count_label(&self) -> String {
        match self.total_results {
            Some(1) => "1 record found".to_string(),
            Some(total) => format!("{total} records found"),
            None => "Loading...".to_string(),
        }
    }

    /// Message shown for an empty result set.
    pub fn not_found_message(&self) -> String {
        match self.params.q.as_deref() {
            Some(q) => format!("No {} found for \"{q}\".", self.scope.kind().path()),
            None => format!("No {} found.", self.scope.kind().path()),
        }
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
