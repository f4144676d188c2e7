use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        persistence::{
            PersistenceBridge,
            models::{AnswerEntity, FinalResultsEntity, QuestionEntity, RoomRecord},
        },
        storage::{StorageError, StorageResult},
    },
    state::room::RoomStatus,
};

use super::{
    config::BridgeConfig,
    error::{BridgeError, BridgeResult},
};

const CREATE_ROOM_PATH: &str = "api/room/create-room";
const JOIN_ROOM_PATH: &str = "api/room/join-room";

/// Persistence bridge talking JSON over HTTP to the collaborator's room API.
#[derive(Clone)]
pub struct HttpPersistenceBridge {
    client: Client,
    base_url: Arc<str>,
    /// Creation records replayed when the collaborator answers 404 for a room.
    created: Arc<DashMap<String, RoomRecord>>,
}

impl HttpPersistenceBridge {
    /// Build the HTTP client for the configured collaborator.
    pub fn connect(config: BridgeConfig) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| BridgeError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            created: Arc::new(DashMap::new()),
        })
    }

    async fn send<T>(&self, method: Method, path: &str, body: &T) -> BridgeResult<()>
    where
        T: ?Sized + Serialize,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|source| BridgeError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BridgeError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }

    /// Send a room-scoped call; on 404 re-create the room once and retry.
    async fn send_room_scoped<T>(
        &self,
        room_id: &str,
        method: Method,
        path: String,
        body: &T,
    ) -> StorageResult<()>
    where
        T: ?Sized + Serialize,
    {
        match self.send(method.clone(), &path, body).await {
            Err(BridgeError::RequestStatus { status, .. }) if status == StatusCode::NOT_FOUND => {
                let Some(record) = self.created.get(room_id).map(|entry| entry.value().clone()) else {
                    warn!(%room_id, %path, "room unknown to collaborator and no creation record cached");
                    return Err(StorageError::Rejected {
                        path,
                        status: StatusCode::NOT_FOUND.as_u16(),
                    });
                };
                info!(%room_id, %path, "room not yet persisted; creating it before retrying");
                self.send(Method::POST, CREATE_ROOM_PATH, &record).await?;
                self.send(method, &path, body).await.map_err(Into::into)
            }
            other => other.map_err(Into::into),
        }
    }
}

impl PersistenceBridge for HttpPersistenceBridge {
    fn record_room_created(&self, room: RoomRecord) -> BoxFuture<'static, StorageResult<()>> {
        let bridge = self.clone();
        Box::pin(async move {
            bridge.created.insert(room.room_id.clone(), room.clone());
            bridge
                .send(Method::POST, CREATE_ROOM_PATH, &room)
                .await
                .map_err(Into::into)
        })
    }

    fn record_participant_joined(
        &self,
        room_id: String,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let bridge = self.clone();
        Box::pin(async move {
            let body = json!({ "roomId": room_id, "user": participant_id });
            bridge
                .send_room_scoped(&room_id, Method::POST, JOIN_ROOM_PATH.to_string(), &body)
                .await
        })
    }

    fn update_room_status(
        &self,
        room_id: String,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let bridge = self.clone();
        Box::pin(async move {
            if let Some(mut record) = bridge.created.get_mut(&room_id) {
                record.room_data.status = status;
            }
            let path = format!("api/room/{room_id}/status");
            bridge
                .send_room_scoped(&room_id, Method::PATCH, path, &json!({ "status": status }))
                .await
        })
    }

    fn store_questions(
        &self,
        room_id: String,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let bridge = self.clone();
        Box::pin(async move {
            let path = format!("api/room/{room_id}/questions");
            bridge
                .send_room_scoped(&room_id, Method::POST, path, &json!({ "questions": questions }))
                .await
        })
    }

    fn store_answer(
        &self,
        room_id: String,
        answer: AnswerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let bridge = self.clone();
        Box::pin(async move {
            let path = format!("api/room/{room_id}/answers");
            let body = json!({ "questionIndex": answer.question_index, "answers": [answer] });
            bridge
                .send_room_scoped(&room_id, Method::POST, path, &body)
                .await
        })
    }

    fn store_final_results(
        &self,
        room_id: String,
        results: FinalResultsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let bridge = self.clone();
        Box::pin(async move {
            let path = format!("api/room/{room_id}/results");
            bridge
                .send_room_scoped(&room_id, Method::POST, path, &results)
                .await
        })
    }

    fn forget_room(&self, room_id: &str) {
        if self.created.remove(room_id).is_some() {
            debug!(%room_id, "creation record evicted");
        }
    }
}
