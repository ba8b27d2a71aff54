//! Identifier types for the metro network simulator
//!
//! Stations, lines and trains are named by the configuration that creates them, so
//! their identifiers wrap the configured string. Incidents are created at runtime and
//! carry a UUID rendered with an `INC_` prefix.

use super::EntityKind;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Identifier of a station, as written in the network configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub String);

impl StationId {
    /// Create a station identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a line, as written in the network configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub String);

impl LineId {
    /// Create a line identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LineId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a train
///
/// Trains spawned from a line's default train count are numbered `train_1`,
/// `train_2`, ... in line order; explicitly configured trains keep their own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainId(pub String);

impl TrainId {
    /// Create a train identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for the n-th generated train (1-based)
    pub fn numbered(n: usize) -> Self {
        Self(format!("train_{}", n))
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrainId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique identifier for an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncidentId(pub Uuid);

impl IncidentId {
    /// Create a new random incident ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an incident ID from caller-supplied random bytes
    ///
    /// Seeded runs draw these bytes from the simulation RNG so that ids are
    /// reproducible along with everything else.
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INC_{}", self.0.simple())
    }
}

impl Serialize for IncidentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("INC_{}", self.0.simple()))
    }
}

impl<'de> Deserialize<'de> for IncidentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("INC_").unwrap_or(&s);
        let uuid = Uuid::parse_str(raw).map_err(serde::de::Error::custom)?;
        Ok(IncidentId(uuid))
    }
}

/// Reference to any entity that can be targeted by an incident or an interaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    /// A station
    Station(StationId),
    /// A line
    Line(LineId),
    /// A train
    Train(TrainId),
}

impl EntityRef {
    /// Kind of the referenced entity
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Station(_) => EntityKind::Station,
            EntityRef::Line(_) => EntityKind::Line,
            EntityRef::Train(_) => EntityKind::Train,
        }
    }

    /// Raw identifier of the referenced entity
    pub fn id_str(&self) -> &str {
        match self {
            EntityRef::Station(id) => id.as_str(),
            EntityRef::Line(id) => id.as_str(),
            EntityRef::Train(id) => id.as_str(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id_str())
    }
}

impl From<StationId> for EntityRef {
    fn from(id: StationId) -> Self {
        EntityRef::Station(id)
    }
}

impl From<LineId> for EntityRef {
    fn from(id: LineId) -> Self {
        EntityRef::Line(id)
    }
}

impl From<TrainId> for EntityRef {
    fn from(id: TrainId) -> Self {
        EntityRef::Train(id)
    }
}
