use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{EntityId, EntityKey, EntityType},
    protocol::{Attributes, Relationship, Resource, ResourceWrite},
};

/// Last server-confirmed state of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub key: EntityKey,
    pub attributes: Attributes,
    pub relationships: BTreeMap<String, Relationship>,
}

impl Entity {
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).and_then(Value::as_bool)
    }

    pub fn is_selected(&self) -> bool {
        self.attr_bool("isSelected").unwrap_or(false)
    }

    pub fn related(&self, name: &str) -> Vec<EntityKey> {
        self.relationships
            .get(name)
            .map(Relationship::keys)
            .unwrap_or_default()
    }

    /// Deserializes the attribute record into a typed projection.
    pub fn project<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.attributes.clone()))
    }

    /// Write body carrying every attribute, with `changes` laid over the top.
    pub fn to_write(&self, changes: &Attributes) -> ResourceWrite {
        let mut attributes = self.attributes.clone();
        for (name, value) in changes {
            attributes.insert(name.clone(), value.clone());
        }
        ResourceWrite {
            kind: self.key.kind,
            id: Some(self.key.id.clone()),
            attributes,
            relationships: BTreeMap::new(),
        }
    }
}

impl From<Resource> for Entity {
    fn from(resource: Resource) -> Self {
        Self {
            key: EntityKey {
                kind: resource.kind,
                id: resource.id,
            },
            attributes: resource.attributes,
            relationships: resource.relationships,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    entities: HashMap<EntityKey, Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: EntityType, id: &EntityId) -> Option<&Entity> {
        self.entities.get(&EntityKey {
            kind,
            id: id.clone(),
        })
    }

    pub fn get_key(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Replaces whatever is cached for the entity; the most recently arrived payload wins.
    pub fn put(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.key.clone(), entity)
    }

    pub fn put_all(&mut self, resources: impl IntoIterator<Item = Resource>) -> Vec<EntityKey> {
        resources
            .into_iter()
            .map(|resource| {
                let entity = Entity::from(resource);
                let key = entity.key.clone();
                self.put(entity);
                key
            })
            .collect()
    }

    /// Drops the given ids; returns the keys that were actually cached.
    pub fn unload<'a>(
        &mut self,
        kind: EntityType,
        ids: impl IntoIterator<Item = &'a EntityId>,
    ) -> Vec<EntityKey> {
        ids.into_iter()
            .filter_map(|id| {
                let key = EntityKey {
                    kind,
                    id: id.clone(),
                };
                self.entities.remove(&key).map(|_| key)
            })
            .collect()
    }

    pub fn unload_keys<'a>(&mut self, keys: impl IntoIterator<Item = &'a EntityKey>) -> Vec<EntityKey> {
        keys.into_iter()
            .filter(|key| self.entities.remove(*key).is_some())
            .cloned()
            .collect()
    }

    pub fn of_type(&self, kind: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |entity| entity.key.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
