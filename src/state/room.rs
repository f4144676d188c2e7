use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Waiting for participants to fill the room.
    Waiting,
    /// Capacity reached (or promoted by the host); the quiz is about to start.
    Active,
    /// Questions are being played.
    InGame,
    /// Final results were computed; terminal.
    Finished,
}

impl RoomStatus {
    /// Whether the room accepts no further answers or status changes.
    pub fn is_terminal(self) -> bool {
        matches!(self, RoomStatus::Finished)
    }
}

/// Difficulty requested for the generated questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    /// Easy questions.
    #[serde(alias = "easy", alias = "Easy")]
    Easy,
    /// Medium questions.
    #[default]
    #[serde(alias = "medium", alias = "Medium")]
    Medium,
    /// Hard questions.
    #[serde(alias = "hard", alias = "Hard")]
    Hard,
}

impl Difficulty {
    /// Upper-case label used in prompts and persisted records.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

/// Settings chosen by the creator of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    /// Free-form topic of the quiz.
    pub topic: String,
    /// Requested difficulty.
    pub difficulty: Difficulty,
    /// Number of questions to play.
    pub question_count: usize,
    /// Maximum number of participants; reaching it starts the quiz.
    pub capacity: usize,
    /// Declared overall time limit of the room, in seconds (informational).
    pub room_time_limit: u32,
}

/// A stable user identity holding a seat in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Stable user identifier, distinct from any connection id.
    pub id: String,
    /// Display name shown to the other participants.
    pub display_name: String,
}

/// Membership failures raised by [`Room`] and the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// No room with this code exists.
    #[error("Room not found")]
    NotFound,
    /// The room has reached its capacity.
    #[error("Room is full")]
    Full,
    /// The participant already holds a seat in this room.
    #[error("participant `{0}` already joined this room")]
    AlreadyJoined(String),
    /// The quiz of this room is over.
    #[error("Room has already finished")]
    Finished,
    /// Settings rejected at creation time.
    #[error("invalid room settings: {0}")]
    InvalidSettings(String),
}

/// In-memory state of a single room.
#[derive(Debug, Clone)]
pub struct Room {
    /// Short alphanumeric room code.
    pub id: String,
    /// Settings chosen at creation.
    pub settings: RoomSettings,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Identifier of the creator.
    pub host_id: String,
    participants: IndexMap<String, Participant>,
}

impl Room {
    /// Build a room seating its creator as first participant.
    pub fn new(id: String, settings: RoomSettings, creator: Participant) -> Result<Self, RoomError> {
        if settings.capacity < 1 {
            return Err(RoomError::InvalidSettings(
                "capacity must be at least 1".into(),
            ));
        }
        if settings.question_count < 1 {
            return Err(RoomError::InvalidSettings(
                "a quiz needs at least one question".into(),
            ));
        }

        let host_id = creator.id.clone();
        let mut participants = IndexMap::new();
        participants.insert(creator.id.clone(), creator);

        Ok(Self {
            id,
            settings,
            status: RoomStatus::Waiting,
            host_id,
            participants,
        })
    }

    /// Seat a new participant, enforcing capacity and uniqueness.
    pub fn join(&mut self, participant: Participant) -> Result<(), RoomError> {
        if self.status.is_terminal() {
            return Err(RoomError::Finished);
        }
        if self.participants.contains_key(&participant.id) {
            return Err(RoomError::AlreadyJoined(participant.id));
        }
        if self.is_full() {
            return Err(RoomError::Full);
        }
        self.participants.insert(participant.id.clone(), participant);
        Ok(())
    }

    /// Remove a participant, returning it when it was seated.
    pub fn leave(&mut self, participant_id: &str) -> Option<Participant> {
        self.participants.shift_remove(participant_id)
    }

    /// Update the status; a finished room never changes again.
    pub fn set_status(&mut self, status: RoomStatus) -> Result<(), RoomError> {
        if self.status.is_terminal() && status != RoomStatus::Finished {
            return Err(RoomError::Finished);
        }
        self.status = status;
        Ok(())
    }

    /// Whether the participant currently holds a seat.
    pub fn contains(&self, participant_id: &str) -> bool {
        self.participants.contains_key(participant_id)
    }

    /// Whether membership reached capacity.
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.settings.capacity
    }

    /// Whether nobody is seated anymore.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Seated participants in join order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Identifiers of the seated participants in join order.
    pub fn participant_ids(&self) -> Vec<String> {
        self.participants.keys().cloned().collect()
    }

    /// Number of seated participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }
}
