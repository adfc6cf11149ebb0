use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(EntityId);

/// Resource types served by the eholdings backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Providers,
    Packages,
    Titles,
    CustomerResources,
    RootProxies,
    ProxyTypes,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Providers,
        EntityType::Packages,
        EntityType::Titles,
        EntityType::CustomerResources,
        EntityType::RootProxies,
        EntityType::ProxyTypes,
    ];

    /// URL path segment for the collection, e.g. `customer-resources`.
    pub fn path(self) -> &'static str {
        match self {
            EntityType::Providers => "providers",
            EntityType::Packages => "packages",
            EntityType::Titles => "titles",
            EntityType::CustomerResources => "customer-resources",
            EntityType::RootProxies => "root-proxies",
            EntityType::ProxyTypes => "proxy-types",
        }
    }

    /// Name used in the `type` member of a resource object.
    pub fn json_name(self) -> &'static str {
        match self {
            EntityType::Providers => "providers",
            EntityType::Packages => "packages",
            EntityType::Titles => "titles",
            EntityType::CustomerResources => "customerResources",
            EntityType::RootProxies => "rootProxies",
            EntityType::ProxyTypes => "proxyTypes",
        }
    }

    /// Whether entities of this type carry a user-togglable `isSelected`.
    pub fn is_selectable(self) -> bool {
        matches!(self, EntityType::Packages | EntityType::CustomerResources)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        EntityType::ALL
            .into_iter()
            .find(|kind| {
                kind.path().eq_ignore_ascii_case(trimmed)
                    || kind.json_name().eq_ignore_ascii_case(trimmed)
            })
            .or(match trimmed {
                "resources" | "resource" => Some(EntityType::CustomerResources),
                "vendors" | "vendor" => Some(EntityType::Providers),
                _ => None,
            })
            .ok_or_else(|| UnknownEntityType(trimmed.to_string()))
    }
}

/// Identity of a cached entity: `(type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub id: EntityId,
}

impl EntityKey {
    pub fn new(kind: EntityType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: EntityId(id.into()),
        }
    }

    pub fn resource_path(&self) -> String {
        format!("{}/{}", self.kind.path(), self.id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.path(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_json_names_and_legacy_aliases() {
        assert_eq!(
            "customer-resources".parse::<EntityType>(),
            Ok(EntityType::CustomerResources)
        );
        assert_eq!(
            "customerResources".parse::<EntityType>(),
            Ok(EntityType::CustomerResources)
        );
        assert_eq!("resources".parse::<EntityType>(), Ok(EntityType::CustomerResources));
        assert_eq!("vendors".parse::<EntityType>(), Ok(EntityType::Providers));
        assert!("widgets".parse::<EntityType>().is_err());
    }

    #[test]
    fn type_serializes_as_json_name() {
        let json = serde_json::to_string(&EntityType::CustomerResources).expect("json");
        assert_eq!(json, "\"customerResources\"");
    }
}
