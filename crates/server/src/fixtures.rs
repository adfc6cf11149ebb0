//! In-memory resource set the mock backend serves.

use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::{EntityKey, EntityType},
    protocol::{Attributes, Relationship, Resource, ResourceWrite},
};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Query parameters of a search or relationship collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "filter[selected]")]
    pub selected: Option<String>,
    #[serde(rename = "filter[type]")]
    pub content_type: Option<String>,
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub count: Option<usize>,
}

impl SearchQuery {
    fn terms(&self) -> Vec<String> {
        self.q
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }

    fn selected_filter(&self) -> Option<bool> {
        match self.selected.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    fn type_filter(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .filter(|value| !value.is_empty() && *value != "all")
            .map(normalize_type)
    }
}

/// `E-Book` and `ebook` name the same content type.
fn normalize_type(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Attribute on a child resource naming its parent of `kind`.
fn parent_attribute(kind: EntityType) -> Option<&'static str> {
    match kind {
        EntityType::Providers => Some("providerId"),
        EntityType::Packages => Some("packageId"),
        EntityType::Titles => Some("titleId"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    data: Vec<Resource>,
}

#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    resources: Vec<Resource>,
}

impl Fixtures {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Reads a `{ "data": [...] }` file of resource objects.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixtures file '{}'", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("invalid fixtures file '{}'", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let file: FixtureFile = serde_json::from_str(raw)?;
        Ok(Self::new(file.data))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn position(&self, key: &EntityKey) -> Option<usize> {
        self.resources
            .iter()
            .position(|resource| resource.kind == key.kind && resource.id == key.id)
    }

    fn attr_str<'a>(resource: &'a Resource, name: &str) -> Option<&'a str> {
        resource.attributes.get(name).and_then(Value::as_str)
    }

    /// The resource with relationship linkage derived from the current set.
    pub fn get(&self, key: &EntityKey) -> Option<Resource> {
        self.position(key)
            .map(|index| self.with_relationships(&self.resources[index]))
    }

    fn with_relationships(&self, resource: &Resource) -> Resource {
        let mut resource = resource.clone();
        let key = resource.key();
        let children = match resource.kind {
            EntityType::Providers => vec![("packages", EntityType::Packages)],
            EntityType::Packages | EntityType::Titles => {
                vec![("customerResources", EntityType::CustomerResources)]
            }
            _ => Vec::new(),
        };
        for (name, kind) in children {
            let keys: Vec<EntityKey> = self.children(&key, kind).map(Resource::key).collect();
            resource
                .relationships
                .insert(name.to_string(), Relationship::many(keys));
        }
        for (name, kind) in [
            ("provider", EntityType::Providers),
            ("package", EntityType::Packages),
            ("title", EntityType::Titles),
        ] {
            let parent_id = parent_attribute(kind)
                .and_then(|attribute| Self::attr_str(&resource, attribute))
                .map(str::to_string);
            if let Some(id) = parent_id {
                if resource.kind != kind {
                    resource
                        .relationships
                        .insert(name.to_string(), Relationship::one(kind, id));
                }
            }
        }
        resource
    }

    fn children<'a>(
        &'a self,
        parent: &'a EntityKey,
        kind: EntityType,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        let attribute = parent_attribute(parent.kind);
        self.resources.iter().filter(move |resource| {
            resource.kind == kind
                && attribute.is_some_and(|attribute| {
                    Self::attr_str(resource, attribute) == Some(parent.id.as_str())
                })
        })
    }

    /// Filtered, ordered and paginated resources plus the pre-pagination count.
    pub fn search(
        &self,
        kind: EntityType,
        parent: Option<&EntityKey>,
        query: &SearchQuery,
    ) -> (Vec<Resource>, u64) {
        let candidates: Vec<&Resource> = match parent {
            Some(parent) => self.children(parent, kind).collect(),
            None => self
                .resources
                .iter()
                .filter(|resource| resource.kind == kind)
                .collect(),
        };

        let terms = query.terms();
        let selected = query.selected_filter();
        let content_type = query.type_filter();

        let mut matches: Vec<(&Resource, usize)> = candidates
            .into_iter()
            .filter_map(|resource| {
                let name = Self::attr_str(resource, "name")
                    .unwrap_or_default()
                    .to_lowercase();
                let relevance = terms.iter().filter(|term| name.contains(term.as_str())).count();
                if !terms.is_empty() && relevance == 0 {
                    return None;
                }
                if let Some(selected) = selected {
                    let is_selected = resource
                        .attributes
                        .get("isSelected")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    if is_selected != selected {
                        return None;
                    }
                }
                if let Some(content_type) = &content_type {
                    let actual = Self::attr_str(resource, "contentType").unwrap_or_default();
                    if normalize_type(actual) != *content_type {
                        return None;
                    }
                }
                Some((resource, relevance))
            })
            .collect();

        if query.sort.as_deref() == Some("name") {
            matches.sort_by_key(|(resource, _)| {
                Self::attr_str(resource, "name")
                    .unwrap_or_default()
                    .to_lowercase()
            });
        } else {
            // stable: equal relevance keeps insertion order
            matches.sort_by(|(_, a), (_, b)| b.cmp(a));
        }

        let total = matches.len() as u64;
        let count = query.count.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = query.page.unwrap_or(1).max(1);
        // a page past addressable memory is simply empty
        let Some(skip) = (page - 1).checked_mul(count) else {
            return (Vec::new(), total);
        };
        let data = matches
            .into_iter()
            .skip(skip)
            .take(count)
            .map(|(resource, _)| self.with_relationships(resource))
            .collect();
        (data, total)
    }

    /// Merges `changes` onto the stored attributes and returns the result.
    ///
    /// A customer resource changing `isSelected` moves its package's
    /// `selectedCount` with it.
    pub fn update(&mut self, key: &EntityKey, changes: Attributes) -> Option<Resource> {
        let index = self.position(key)?;
        let was_selected = self.resources[index]
            .attributes
            .get("isSelected")
            .and_then(Value::as_bool);

        let resource = &mut self.resources[index];
        for (name, value) in changes {
            resource.attributes.insert(name, value);
        }
        let now_selected = resource
            .attributes
            .get("isSelected")
            .and_then(Value::as_bool);
        let package_id = Self::attr_str(resource, "packageId").map(str::to_string);

        if key.kind == EntityType::CustomerResources && was_selected != now_selected {
            if let (Some(package_id), Some(now_selected)) = (package_id, now_selected) {
                self.adjust_selected_count(&package_id, now_selected);
            }
        }
        self.get(key)
    }

    fn adjust_selected_count(&mut self, package_id: &str, selected: bool) {
        let key = EntityKey::new(EntityType::Packages, package_id);
        let Some(index) = self.position(&key) else {
            return;
        };
        let attributes = &mut self.resources[index].attributes;
        let count = attributes
            .get("selectedCount")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let count = if selected {
            count + 1
        } else {
            count.saturating_sub(1)
        };
        attributes.insert("selectedCount".into(), json!(count));
    }

    pub fn insert(&mut self, resource: Resource) {
        match self.position(&resource.key()) {
            Some(index) => self.resources[index] = resource,
            None => self.resources.push(resource),
        }
    }

    /// Stores a new custom title; with a package linked, also the customer
    /// resource joining them. Returns the title and the created resource.
    pub fn create_title(
        &mut self,
        write: ResourceWrite,
    ) -> Result<(Resource, Option<Resource>), String> {
        let package_key = write
            .relationships
            .get("packages")
            .and_then(|relationship| relationship.keys().into_iter().next());
        let package = match &package_key {
            Some(key) => Some(
                self.get(key)
                    .ok_or_else(|| format!("Package {} not found", key.id))?,
            ),
            None => None,
        };

        let title_id = Uuid::new_v4().to_string();
        let mut title = Resource::new(EntityType::Titles, title_id.clone());
        title.attributes = write.attributes;
        title
            .attributes
            .insert("isTitleCustom".into(), Value::Bool(true));
        self.insert(title.clone());

        let resource = package.map(|package| {
            let mut resource = Resource::new(
                EntityType::CustomerResources,
                format!("{}-{title_id}", package.id),
            )
            .with_attribute("isSelected", true)
            .with_attribute("titleId", title_id.clone())
            .with_attribute("packageId", package.id.to_string());
            for (from, to) in [("name", "name"), ("publicationType", "publicationType")] {
                if let Some(value) = title.attributes.get(from) {
                    resource.attributes.insert(to.into(), value.clone());
                }
            }
            for (from, to) in [
                ("name", "packageName"),
                ("contentType", "contentType"),
                ("providerId", "providerId"),
                ("providerName", "providerName"),
            ] {
                if let Some(value) = package.attributes.get(from) {
                    resource.attributes.insert(to.into(), value.clone());
                }
            }
            resource
        });

        if let Some(resource) = &resource {
            self.insert(resource.clone());
            if let Some(package_id) = Self::attr_str(resource, "packageId").map(str::to_string) {
                self.adjust_selected_count(&package_id, true);
                self.bump_title_count(&package_id);
            }
        }

        let title_key = title.key();
        let title = self.get(&title_key).unwrap_or(title);
        let resource = resource.and_then(|resource| self.get(&resource.key()));
        Ok((title, resource))
    }

    fn bump_title_count(&mut self, package_id: &str) {
        let key = EntityKey::new(EntityType::Packages, package_id);
        if let Some(index) = self.position(&key) {
            let attributes = &mut self.resources[index].attributes;
            let count = attributes
                .get("titleCount")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            attributes.insert("titleCount".into(), json!(count + 1));
        }
    }

    /// A small provider, package and title set for local runs.
    pub fn demo() -> Self {
        let provider = Resource::new(EntityType::Providers, "19")
            .with_attribute("name", "Cool Provider")
            .with_attribute("packagesSelected", 1)
            .with_attribute("packagesTotal", 3)
            .with_attribute("proxy", json!({ "id": "bigTestJS", "inherited": true }))
            .with_attribute(
                "providerToken",
                json!({ "prompt": "/test1/", "helpText": "<p>Provider token help</p>", "value": "" }),
            );

        let package = |id: &str, name: &str, content_type: &str, selected: bool| {
            Resource::new(EntityType::Packages, id)
                .with_attribute("name", name)
                .with_attribute("contentType", content_type)
                .with_attribute("isSelected", selected)
                .with_attribute("isCustom", false)
                .with_attribute("selectedCount", u64::from(selected))
                .with_attribute("titleCount", 1)
                .with_attribute("providerId", "19")
                .with_attribute("providerName", "Cool Provider")
                .with_attribute(
                    "customCoverage",
                    json!({ "beginCoverage": "", "endCoverage": "" }),
                )
        };

        let title = Resource::new(EntityType::Titles, "1001")
            .with_attribute("name", "Cool Title")
            .with_attribute("edition", "Cool Edition")
            .with_attribute("publisherName", "Cool Publisher")
            .with_attribute("publicationType", "Book")
            .with_attribute("isPeerReviewed", false)
            .with_attribute("isTitleCustom", false)
            .with_attribute(
                "identifiers",
                json!([
                    { "type": "ISBN", "subtype": "Print", "id": "978-3-16-148410-0" },
                    { "type": "ISSN", "subtype": "Empty", "id": "1234-5678" },
                ]),
            )
            .with_attribute(
                "contributors",
                json!([{ "type": "author", "contributor": "Ferris Crab" }]),
            )
            .with_attribute("subjects", json!([{ "type": "TLI", "subject": "Computers" }]));

        let customer_resource = |package_id: &str, package_name: &str, selected: bool| {
            Resource::new(EntityType::CustomerResources, format!("{package_id}-1001"))
                .with_attribute("name", "Cool Title")
                .with_attribute("isSelected", selected)
                .with_attribute("url", "https://frontside.io")
                .with_attribute("titleId", "1001")
                .with_attribute("packageId", package_id)
                .with_attribute("packageName", package_name)
                .with_attribute("providerId", "19")
                .with_attribute("providerName", "Cool Provider")
                .with_attribute("contentType", "E-Book")
                .with_attribute("publicationType", "Book")
                .with_attribute("customCoverages", json!([]))
        };

        let root_proxy = Resource::new(EntityType::RootProxies, "root-proxy")
            .with_attribute("proxyTypeId", "bigTestJS");
        let proxy_type = |id: &str, name: &str| {
            Resource::new(EntityType::ProxyTypes, id)
                .with_attribute("id", id)
                .with_attribute("name", name)
                .with_attribute("urlMask", "")
        };

        Self::new(vec![
            provider,
            package("19-1", "Ordinary Package", "E-Book", false),
            package("19-2", "Other Ordinary Package", "Online Reference", true),
            package("19-3", "Cool Package", "E-Journal", false),
            title,
            customer_resource("19-1", "Ordinary Package", false),
            customer_resource("19-2", "Other Ordinary Package", true),
            root_proxy,
            proxy_type("<n/a>", "None"),
            proxy_type("bigTestJS", "bigTestJS"),
            proxy_type("microstates", "microstates"),
        ])
    }
}

#[cfg(test)]
#[path = "tests/fixtures_tests.rs"]
mod tests;
