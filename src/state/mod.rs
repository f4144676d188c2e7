pub mod gateway;
pub mod quiz;
pub mod registry;
pub mod room;
pub mod timer;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::{
        persistence::{DetachedBridge, PersistenceBridge},
        questions::{DisabledSource, QuestionSource},
    },
};

use self::{gateway::BroadcastGateway, registry::RoomRegistry};

pub type SharedState = Arc<AppState>;

/// Central application state: live rooms, their broadcast groups and the external collaborators.
pub struct AppState {
    config: Arc<AppConfig>,
    registry: RoomRegistry,
    gateway: BroadcastGateway,
    questions: Arc<dyn QuestionSource>,
    persistence: Arc<dyn PersistenceBridge>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        questions: Arc<dyn QuestionSource>,
        persistence: Arc<dyn PersistenceBridge>,
    ) -> SharedState {
        Arc::new(Self {
            registry: RoomRegistry::new(config.room_code_length),
            gateway: BroadcastGateway::new(),
            config: Arc::new(config),
            questions,
            persistence,
        })
    }

    /// State running on placeholder questions without a persistence collaborator.
    pub fn detached(config: AppConfig) -> SharedState {
        Self::new(config, Arc::new(DisabledSource), Arc::new(DetachedBridge))
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Live rooms.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Broadcast groups of the live rooms.
    pub fn gateway(&self) -> &BroadcastGateway {
        &self.gateway
    }

    /// Question source used when a quiz starts.
    pub fn questions(&self) -> Arc<dyn QuestionSource> {
        self.questions.clone()
    }

    /// Persistence collaborator.
    pub fn persistence(&self) -> Arc<dyn PersistenceBridge> {
        self.persistence.clone()
    }
}
