use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{EntityId, EntityKey, EntityType};

pub type Attributes = Map<String, Value>;

pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub id: EntityId,
}

impl From<ResourceIdentifier> for EntityKey {
    fn from(value: ResourceIdentifier) -> Self {
        EntityKey {
            kind: value.kind,
            id: value.id,
        }
    }
}

impl From<EntityKey> for ResourceIdentifier {
    fn from(value: EntityKey) -> Self {
        ResourceIdentifier {
            kind: value.kind,
            id: value.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Linkage>,
}

impl Relationship {
    pub fn one(kind: EntityType, id: impl Into<String>) -> Self {
        Self {
            data: Some(Linkage::One(ResourceIdentifier {
                kind,
                id: EntityId::new(id),
            })),
        }
    }

    pub fn many(ids: impl IntoIterator<Item = EntityKey>) -> Self {
        Self {
            data: Some(Linkage::Many(ids.into_iter().map(Into::into).collect())),
        }
    }

    /// Keys of every linked resource, in payload order.
    pub fn keys(&self) -> Vec<EntityKey> {
        match &self.data {
            Some(Linkage::One(identifier)) => vec![identifier.clone().into()],
            Some(Linkage::Many(identifiers)) => {
                identifiers.iter().cloned().map(Into::into).collect()
            }
            None => Vec::new(),
        }
    }
}

/// A resource object as it appears in `data` or `included`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub id: EntityId,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
}

impl Resource {
    pub fn new(kind: EntityType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: EntityId::new(id),
            attributes: Attributes::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey {
            kind: self.kind,
            id: self.id.clone(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_relationship(mut self, name: &str, relationship: Relationship) -> Self {
        self.relationships.insert(name.to_string(), relationship);
        self
    }
}

/// Success envelope for a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub data: Resource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
}

impl Document {
    pub fn new(data: Resource) -> Self {
        Self {
            data,
            included: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectionMeta {
    #[serde(rename = "totalResults", default)]
    pub total_results: u64,
}

/// Success envelope for a search or relationship collection page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDocument {
    pub data: Vec<Resource>,
    #[serde(default)]
    pub meta: CollectionMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
}

/// Resource object sent in create/update bodies; `id` is absent on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceWrite {
    #[serde(rename = "type")]
    pub kind: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteDocument {
    pub data: ResourceWrite,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relationships_accept_single_and_list_linkage() {
        let resource: Resource = serde_json::from_value(json!({
            "type": "customerResources",
            "id": "19-44-1",
            "attributes": { "isSelected": false },
            "relationships": {
                "package": { "data": { "type": "packages", "id": "19-44" } },
                "titles": { "data": [
                    { "type": "titles", "id": "1" },
                    { "type": "titles", "id": "2" }
                ] },
                "provider": {}
            }
        }))
        .expect("resource");

        assert_eq!(
            resource.relationships["package"].keys(),
            vec![EntityKey::new(EntityType::Packages, "19-44")]
        );
        assert_eq!(resource.relationships["titles"].keys().len(), 2);
        assert!(resource.relationships["provider"].keys().is_empty());
    }

    #[test]
    fn collection_meta_uses_camel_case_total() {
        let doc: CollectionDocument = serde_json::from_value(json!({
            "data": [],
            "meta": { "totalResults": 42 }
        }))
        .expect("collection");
        assert_eq!(doc.meta.total_results, 42);
    }
}
