use serde::{Deserialize, Serialize};

/// A participant in the nightly bath rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kid {
    /// Opaque unique identifier, stable for the kid's lifetime
    pub id: String,
    /// Display name (non-empty)
    pub name: String,
    /// Optional avatar image bytes (PNG), stored alongside the kid record
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar: Option<Vec<u8>>,
    /// Creation timestamp (RFC 3339); establishes the stable roster ordering
    pub created_at: String,
}

impl Kid {
    /// Generate a new random kid ID
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// An immutable record of one completed bath rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque unique identifier
    pub id: String,
    /// Completion timestamp (RFC 3339)
    pub timestamp: String,
    /// The finalized order for that night, as kid IDs
    pub kid_order: Vec<String>,
    /// Whether the one-time lucky splash was used during this session
    pub lucky_used: bool,
    /// Which kid triggered the lucky splash, if any
    pub lucky_by_kid_id: Option<String>,
}

impl Session {
    /// Generate a new random session ID
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// The persisted rotation singleton: round-robin pointer plus the
/// in-progress (not yet committed) session fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationState {
    /// Round-robin pointer into the roster (ordered by creation time),
    /// defining the next default starting kid
    pub rotation_index: u32,
    /// In-progress order for the active session, absent when no session
    /// is being composed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_order: Option<Vec<String>>,
    /// Whether the lucky splash has been consumed for the in-progress session
    #[serde(default)]
    pub current_lucky_used: bool,
    /// Kid who triggered the lucky splash, for display attribution
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_lucky_by_kid_id: Option<String>,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            rotation_index: 0,
            current_order: None,
            current_lucky_used: false,
            current_lucky_by_kid_id: None,
        }
    }
}

/// Direction of a manual reorder of tonight's list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MoveDirection {
    /// Towards the front of the order (swap with the previous entry)
    Earlier,
    /// Towards the back of the order (swap with the next entry)
    Later,
}

/// Tonight's order as derived from the roster and the rotation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedOrder {
    /// Kids in bath order for tonight
    pub kids: Vec<Kid>,
    /// Whether the lucky splash has already been used tonight
    pub lucky_used: bool,
    /// Who triggered the lucky splash, if anyone
    pub lucky_by_kid_id: Option<String>,
    /// True when this order was resumed from a saved in-progress session
    /// rather than computed from the rotation index
    pub resumed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateKidRequest {
    /// Display name (non-empty, max 100 characters)
    pub name: String,
    /// Optional avatar image bytes
    pub avatar: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateKidRequest {
    pub name: Option<String>,
    pub avatar: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KidResponse {
    pub kid: Kid,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KidListResponse {
    pub kids: Vec<Kid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
}

/// Per-kid position counts derived from the full session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KidPositionStats {
    pub kid_id: String,
    pub name: String,
    /// Count of sessions at each ordinal position; index 0 is first bath
    pub position_counts: Vec<u32>,
    /// Total sessions this kid appeared in
    pub total: u32,
}
