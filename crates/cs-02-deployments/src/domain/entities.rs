//! Core entities: `Entity` (what a deployer signs) and `Deployment` (what this
//! replica recorded when it accepted one).

use crate::domain::errors::DeploymentError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Content hash identifying an entity.
pub type EntityId = String;
/// Mutable key an entity claims (parcel coordinate, address, URN...).
pub type Pointer = String;
/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
/// Local auto-increment id. Not comparable across replicas.
pub type DeploymentId = u64;
/// Hash of one stored content file.
pub type ContentHash = String;

/// Kind of entity. Pointers are only ever compared within one type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Scene,
    Profile,
    Wearable,
    Store,
    Emote,
    Outfits,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Scene,
        EntityType::Profile,
        EntityType::Wearable,
        EntityType::Store,
        EntityType::Emote,
        EntityType::Outfits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Scene => "scene",
            EntityType::Profile => "profile",
            EntityType::Wearable => "wearable",
            EntityType::Store => "store",
            EntityType::Emote => "emote",
            EntityType::Outfits => "outfits",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DeploymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DeploymentError::InvalidEntity(format!("unknown entity type: {}", s)))
    }
}

/// One file referenced by an entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFile {
    pub file: String,
    pub hash: ContentHash,
}

impl ContentFile {
    pub fn new(file: impl Into<String>, hash: impl Into<ContentHash>) -> Self {
        Self {
            file: file.into(),
            hash: hash.into(),
        }
    }
}

/// Immutable, content-addressed document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: EntityType,
    pub pointers: Vec<Pointer>,
    pub timestamp: Timestamp,
    pub content: Vec<ContentFile>,
    pub metadata: Option<serde_json::Value>,
}

impl Entity {
    pub fn new(
        id: impl Into<EntityId>,
        entity_type: EntityType,
        pointers: impl IntoIterator<Item = impl Into<Pointer>>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            entity_type,
            pointers: normalize_pointers(pointers.into_iter().map(Into::into)),
            timestamp,
            content: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_content(mut self, content: Vec<ContentFile>) -> Self {
        self.content = content;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Normalize pointers and reject entities the engine cannot order.
    pub fn validated(mut self) -> Result<Self, DeploymentError> {
        if self.id.trim().is_empty() {
            return Err(DeploymentError::InvalidEntity("empty entity id".to_string()));
        }
        self.pointers = normalize_pointers(std::mem::take(&mut self.pointers));
        if self.pointers.is_empty() {
            return Err(DeploymentError::InvalidEntity(format!(
                "entity {} claims no pointers",
                self.id
            )));
        }
        // NUL is the storage key separator
        let keyed = std::iter::once(self.id.as_str())
            .chain(self.pointers.iter().map(String::as_str))
            .chain(self.content.iter().map(|c| c.hash.as_str()));
        for part in keyed {
            if part.contains('\0') {
                return Err(DeploymentError::InvalidEntity(format!(
                    "entity {} has a NUL byte in {:?}",
                    self.id, part
                )));
            }
        }
        Ok(self)
    }
}

/// Lower-case, trim and dedupe pointers, keeping first-seen order.
pub fn normalize_pointers(pointers: impl IntoIterator<Item = Pointer>) -> Vec<Pointer> {
    let mut seen = HashSet::new();
    pointers
        .into_iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// One link of the signature chain proving the deployer's authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthLink {
    pub link_type: String,
    pub payload: String,
    pub signature: String,
}

/// Who deployed an entity and when the origin node accepted it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub deployer_address: String,
    pub auth_chain: Vec<AuthLink>,
    /// Time the origin node accepted the deployment
    pub origin_timestamp: Timestamp,
}

impl AuditInfo {
    pub fn new(deployer_address: impl Into<String>, origin_timestamp: Timestamp) -> Self {
        Self {
            deployer_address: deployer_address.into(),
            auth_chain: Vec::new(),
            origin_timestamp,
        }
    }
}

/// A replica's record of having accepted one entity.
///
/// `deleter_deployment` is the only mutable field; once set it is never
/// changed or cleared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub entity_pointers: Vec<Pointer>,
    pub entity_timestamp: Timestamp,
    pub deployer_address: String,
    pub origin_timestamp: Timestamp,
    pub local_timestamp: Timestamp,
    pub auth_chain: Vec<AuthLink>,
    /// Entity metadata as JSON text
    pub metadata: Option<String>,
    pub deleter_deployment: Option<DeploymentId>,
}

impl Deployment {
    pub fn is_overwritten(&self) -> bool {
        self.deleter_deployment.is_some()
    }

    /// True if this deployment claims at least one of `pointers`.
    pub fn shares_pointer_with(&self, pointers: &[Pointer]) -> bool {
        self.entity_pointers.iter().any(|p| pointers.contains(p))
    }
}
