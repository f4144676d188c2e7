//! Authoritative in-memory map of room code to room state.

use dashmap::{DashMap, mapref::entry::Entry};
use rand::{Rng, distr::Alphanumeric};

use crate::state::{
    quiz::QuizSession,
    room::{Participant, Room, RoomError, RoomSettings, RoomStatus},
    timer::RoomTimers,
};

/// Everything the coordinator owns for one room.
#[derive(Debug)]
pub struct RoomEntry {
    /// Membership and lifecycle.
    pub room: Room,
    /// Quiz session, present while questions are played.
    pub session: Option<QuizSession>,
    /// Pending timers; dropped (and thus cancelled) with the entry.
    pub timers: RoomTimers,
}

/// Result of removing a participant from a room.
#[derive(Debug, Clone)]
pub enum LeaveOutcome {
    /// The participant was not seated in that room (or the room does not exist).
    NotMember,
    /// The participant left; snapshot of the remaining room.
    Left(Room),
    /// The last participant left; the room and its timers are gone.
    RoomDeleted,
}

/// Room registry keyed by room code.
pub struct RoomRegistry {
    rooms: DashMap<String, RoomEntry>,
    code_length: usize,
}

impl RoomRegistry {
    /// Build an empty registry generating codes of `code_length` characters.
    pub fn new(code_length: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            code_length,
        }
    }

    /// Create a room seating `creator`, retrying code generation on collision.
    pub fn create_room(
        &self,
        settings: RoomSettings,
        creator: Participant,
    ) -> Result<Room, RoomError> {
        let mut room = Room::new(String::new(), settings, creator)?;
        loop {
            let code = generate_room_code(self.code_length);
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    room.id = code;
                    slot.insert(RoomEntry {
                        room: room.clone(),
                        session: None,
                        timers: RoomTimers::default(),
                    });
                    return Ok(room);
                }
            }
        }
    }

    /// Seat a participant and return the updated room.
    pub fn join_room(&self, room_id: &str, participant: Participant) -> Result<Room, RoomError> {
        let mut entry = self.rooms.get_mut(room_id).ok_or(RoomError::NotFound)?;
        entry.room.join(participant)?;
        Ok(entry.room.clone())
    }

    /// Remove a participant; an emptied room is deleted together with its timers.
    pub fn leave_room(&self, room_id: &str, participant_id: &str) -> LeaveOutcome {
        let mut outcome = LeaveOutcome::NotMember;
        let removed = self.rooms.remove_if_mut(room_id, |_, entry| {
            if entry.room.leave(participant_id).is_none() {
                return false;
            }
            if entry.room.is_empty() {
                entry.timers.cancel_all();
                return true;
            }
            outcome = LeaveOutcome::Left(entry.room.clone());
            false
        });

        match removed {
            Some(_) => LeaveOutcome::RoomDeleted,
            None => outcome,
        }
    }

    /// Update the status of a room; a finished room rejects further changes.
    pub fn set_status(&self, room_id: &str, status: RoomStatus) -> Result<(), RoomError> {
        let mut entry = self.rooms.get_mut(room_id).ok_or(RoomError::NotFound)?;
        entry.room.set_status(status)
    }

    /// Clone the current state of a room.
    pub fn snapshot(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).map(|entry| entry.room.clone())
    }

    /// Run `f` inside the room's critical section. Returns `None` for unknown rooms.
    ///
    /// `f` must not await nor touch the registry again.
    pub fn with_entry_mut<R>(&self, room_id: &str, f: impl FnOnce(&mut RoomEntry) -> R) -> Option<R> {
        let mut entry = self.rooms.get_mut(room_id)?;
        Some(f(entry.value_mut()))
    }

    /// Whether a room with this code exists.
    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Random alphanumeric room code.
fn generate_room_code(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room::Difficulty;

    fn settings(capacity: usize) -> RoomSettings {
        RoomSettings {
            topic: "history".into(),
            difficulty: Difficulty::Medium,
            question_count: 2,
            capacity,
            room_time_limit: 120,
        }
    }

    fn player(id: &str) -> Participant {
        Participant {
            id: id.into(),
            display_name: id.into(),
        }
    }

    #[test]
    fn created_rooms_get_unique_codes() {
        let registry = RoomRegistry::new(6);
        let mut codes = std::collections::HashSet::new();
        for i in 0..200 {
            let room = registry
                .create_room(settings(2), player(&format!("host{i}")))
                .unwrap();
            assert_eq!(room.id.len(), 6);
            assert!(room.id.chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(codes.insert(room.id));
        }
        assert_eq!(registry.len(), 200);
    }

    #[test]
    fn invalid_settings_do_not_create_a_room() {
        let registry = RoomRegistry::new(6);
        assert!(registry.create_room(settings(0), player("host")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn join_errors_leave_membership_untouched() {
        let registry = RoomRegistry::new(6);
        let room = registry.create_room(settings(2), player("host")).unwrap();

        assert_eq!(
            registry.join_room("missing", player("x")).unwrap_err(),
            RoomError::NotFound
        );
        let joined = registry.join_room(&room.id, player("guest")).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(
            registry.join_room(&room.id, player("late")).unwrap_err(),
            RoomError::Full
        );
        assert_eq!(registry.snapshot(&room.id).unwrap().len(), 2);
    }

    #[test]
    fn last_leave_deletes_the_room() {
        let registry = RoomRegistry::new(6);
        let room = registry.create_room(settings(2), player("host")).unwrap();
        registry.join_room(&room.id, player("guest")).unwrap();

        assert!(matches!(
            registry.leave_room(&room.id, "nobody"),
            LeaveOutcome::NotMember
        ));
        match registry.leave_room(&room.id, "host") {
            LeaveOutcome::Left(remaining) => assert_eq!(remaining.participant_ids(), vec!["guest"]),
            other => panic!("expected remaining room, got {other:?}"),
        }
        assert!(matches!(
            registry.leave_room(&room.id, "guest"),
            LeaveOutcome::RoomDeleted
        ));
        assert!(!registry.contains(&room.id));
    }

    #[test]
    fn finished_status_is_terminal() {
        let registry = RoomRegistry::new(6);
        let room = registry.create_room(settings(1), player("host")).unwrap();
        registry.set_status(&room.id, RoomStatus::Finished).unwrap();
        assert_eq!(
            registry.set_status(&room.id, RoomStatus::Active),
            Err(RoomError::Finished)
        );
    }

    #[test]
    fn leave_and_join_race_never_reports_a_live_room_deleted() {
        let registry = RoomRegistry::new(6);
        for _ in 0..200 {
            let room = registry.create_room(settings(4), player("host")).unwrap();
            let (left, joined) = std::thread::scope(|scope| {
                let leave = scope.spawn(|| registry.leave_room(&room.id, "host"));
                let join = scope.spawn(|| registry.join_room(&room.id, player("guest")));
                (leave.join().unwrap(), join.join().unwrap())
            });

            match left {
                LeaveOutcome::RoomDeleted => {
                    assert!(joined.is_err());
                    assert!(!registry.contains(&room.id));
                }
                LeaveOutcome::Left(snapshot) => {
                    assert!(joined.is_ok());
                    assert!(snapshot.contains("guest"));
                    assert!(registry.contains(&room.id));
                    registry.leave_room(&room.id, "guest");
                }
                LeaveOutcome::NotMember => panic!("host was seated"),
            }
        }
        assert!(registry.is_empty());
    }
}
