use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz room coordinator.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::get_room,
        crate::routes::rooms::start_room,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::RoomSnapshot,
            crate::dto::room::ParticipantView,
            crate::dto::ws::CreateRoomPayload,
            crate::dto::ws::JoinRoomPayload,
            crate::dto::ws::SubmitAnswerPayload,
            crate::dto::ws::RequestQuestionsPayload,
            crate::dto::ws::StartQuizPayload,
            crate::dto::ws::RoomErrorEvent,
            crate::dto::quiz::QuestionView,
            crate::dto::quiz::QuizStartEvent,
            crate::dto::quiz::NextQuestionEvent,
            crate::dto::quiz::TimeUpdateEvent,
            crate::dto::quiz::AnswerFeedbackEvent,
            crate::dto::quiz::QuestionResultsEvent,
            crate::dto::quiz::ParticipantAnswerView,
            crate::dto::quiz::QuizResultsEvent,
            crate::dto::quiz::ParticipantResultView,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room inspection and administration"),
        (name = "realtime", description = "WebSocket channel carrying room and quiz events"),
    )
)]
pub struct ApiDoc;
