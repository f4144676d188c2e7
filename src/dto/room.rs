use serde::Serialize;
use utoipa::ToSchema;

use crate::state::room::{Difficulty, Participant, Room, RoomStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Participant entry of a room snapshot.
pub struct ParticipantView {
    pub id: String,
    pub username: String,
}

impl From<&Participant> for ParticipantView {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id.clone(),
            username: participant.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Room state sent with `updatePlayers` and returned by the room routes.
pub struct RoomSnapshot {
    pub id: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
    pub room_time_limit: u32,
    pub status: RoomStatus,
    pub host_id: String,
    pub current_participants: usize,
    pub max_participants: usize,
    pub participants: Vec<ParticipantView>,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            topic: room.settings.topic.clone(),
            difficulty: room.settings.difficulty,
            question_count: room.settings.question_count,
            room_time_limit: room.settings.room_time_limit,
            status: room.status,
            host_id: room.host_id.clone(),
            current_participants: room.len(),
            max_participants: room.settings.capacity,
            participants: room.participants().map(ParticipantView::from).collect(),
        }
    }
}
