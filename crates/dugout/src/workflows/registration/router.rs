use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{AthleteId, EntryId, PaymentMethod, TeamId, UserId};
use super::orchestrator::{DeclineCommand, DraftCommand};
use super::repository::{
    AthleteDirectory, DraftPoolRepository, NotificationSink, RegistrationLedger, TeamDirectory,
};
use super::store::{DraftPoolError, PaymentPatch};
use super::workflow::{
    RegistrationError, RegistrationForm, RegistrationService, RegistrationStep,
    RegistrationWorkflow, ValidationError,
};

/// Full registration submission: the form, an optional waiver signature, and
/// the chosen payment channel. The router drives the step machine server
/// side so one request finalizes the whole flow.
#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub form: RegistrationForm,
    #[serde(default)]
    pub waiver_signature: Option<String>,
    pub payment: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub acted_by: UserId,
    #[serde(default)]
    pub target_team_id: Option<TeamId>,
}

#[derive(Debug, Deserialize)]
pub struct DeclineRequest {
    pub acted_by: UserId,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PoolFilter {
    pub sport: Option<String>,
    pub age_group: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegistrationResponse {
    entry: super::domain::EntryStatusView,
    confirmation_code: String,
    auto_drafted_player_id: Option<super::domain::PlayerId>,
}

/// Router builder exposing the registration and draft-pool endpoints.
pub fn registration_router<D, T, P, O, N>(
    service: Arc<RegistrationService<D, T, P, O, N>>,
) -> Router
where
    D: DraftPoolRepository + 'static,
    T: TeamDirectory + 'static,
    P: AthleteDirectory + 'static,
    O: RegistrationLedger + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/teams/:team_id/registrations",
            post(register_handler::<D, T, P, O, N>),
        )
        .route(
            "/api/v1/teams/:team_id/draft-pool",
            get(team_pool_handler::<D, T, P, O, N>),
        )
        .route(
            "/api/v1/owners/:owner_id/draft-pool",
            get(owner_pool_handler::<D, T, P, O, N>),
        )
        .route(
            "/api/v1/teams/:team_id/draft-pool/:entry_id/draft",
            post(draft_handler::<D, T, P, O, N>),
        )
        .route(
            "/api/v1/teams/:team_id/draft-pool/:entry_id/decline",
            post(decline_handler::<D, T, P, O, N>),
        )
        .route(
            "/api/v1/teams/:team_id/draft-pool/:entry_id/payment",
            post(payment_handler::<D, T, P, O, N>),
        )
        .route(
            "/api/v1/athletes/:athlete_id/registration-status",
            get(athlete_status_handler::<D, T, P, O, N>),
        )
        .with_state(service)
}

pub(crate) async fn register_handler<D, T, P, O, N>(
    State(service): State<Arc<RegistrationService<D, T, P, O, N>>>,
    Path(team_id): Path<String>,
    axum::Json(request): axum::Json<RegistrationRequest>,
) -> Response
where
    D: DraftPoolRepository + 'static,
    T: TeamDirectory + 'static,
    P: AthleteDirectory + 'static,
    O: RegistrationLedger + 'static,
    N: NotificationSink + 'static,
{
    let team_id = TeamId(team_id);
    let event = match service.open_event(&team_id) {
        Ok(Some(event)) => event,
        Ok(None) => {
            let payload = json!({ "error": "no open registration for this team" });
            return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
        }
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
    };

    let mut workflow = RegistrationWorkflow::new(event);
    let step = match workflow.submit_form(request.form) {
        Ok(step) => step,
        Err(err) => return validation_response(err),
    };
    if step == RegistrationStep::Waiver {
        let signature = match request.waiver_signature.as_deref() {
            Some(signature) => signature,
            None => {
                return validation_response(ValidationError::MissingField {
                    field: "waiver_signature",
                })
            }
        };
        if let Err(err) = workflow.sign_waiver(signature) {
            return validation_response(err);
        }
    }
    let completed = match workflow.choose_payment(request.payment) {
        Ok(completed) => completed,
        Err(err) => return registration_error_response(err),
    };

    match service.register(completed) {
        Ok(outcome) => {
            let view = RegistrationResponse {
                entry: outcome.entry.status_view(),
                confirmation_code: outcome.confirmation_code,
                auto_drafted_player_id: outcome.auto_drafted.map(|player| player.player_id),
            };
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(err) => registration_error_response(err),
    }
}

pub(crate) async fn team_pool_handler<D, T, P, O, N>(
    State(service): State<Arc<RegistrationService<D, T, P, O, N>>>,
    Path(team_id): Path<String>,
) -> Response
where
    D: DraftPoolRepository + 'static,
    T: TeamDirectory + 'static,
    P: AthleteDirectory + 'static,
    O: RegistrationLedger + 'static,
    N: NotificationSink + 'static,
{
    match service.list_team_pool(&TeamId(team_id)) {
        Ok(entries) => {
            let views: Vec<_> = entries.iter().map(|entry| entry.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => draft_pool_error_response(err),
    }
}

pub(crate) async fn owner_pool_handler<D, T, P, O, N>(
    State(service): State<Arc<RegistrationService<D, T, P, O, N>>>,
    Path(owner_id): Path<String>,
    Query(filter): Query<PoolFilter>,
) -> Response
where
    D: DraftPoolRepository + 'static,
    T: TeamDirectory + 'static,
    P: AthleteDirectory + 'static,
    O: RegistrationLedger + 'static,
    N: NotificationSink + 'static,
{
    match service.list_owner_pool(
        &UserId(owner_id),
        filter.sport.as_deref(),
        filter.age_group.as_deref(),
    ) {
        Ok(entries) => {
            let views: Vec<_> = entries.iter().map(|entry| entry.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => draft_pool_error_response(err),
    }
}

pub(crate) async fn draft_handler<D, T, P, O, N>(
    State(service): State<Arc<RegistrationService<D, T, P, O, N>>>,
    Path((team_id, entry_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<DraftRequest>,
) -> Response
where
    D: DraftPoolRepository + 'static,
    T: TeamDirectory + 'static,
    P: AthleteDirectory + 'static,
    O: RegistrationLedger + 'static,
    N: NotificationSink + 'static,
{
    match service.draft(DraftCommand {
        team_id: TeamId(team_id),
        entry_id: EntryId(entry_id),
        acted_by: request.acted_by,
        target_team_id: request.target_team_id,
    }) {
        Ok(player) => (StatusCode::OK, axum::Json(player)).into_response(),
        Err(err) => draft_pool_error_response(err),
    }
}

pub(crate) async fn decline_handler<D, T, P, O, N>(
    State(service): State<Arc<RegistrationService<D, T, P, O, N>>>,
    Path((team_id, entry_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<DeclineRequest>,
) -> Response
where
    D: DraftPoolRepository + 'static,
    T: TeamDirectory + 'static,
    P: AthleteDirectory + 'static,
    O: RegistrationLedger + 'static,
    N: NotificationSink + 'static,
{
    match service.decline(DeclineCommand {
        team_id: TeamId(team_id),
        entry_id: EntryId(entry_id),
        reason: request.reason,
        acted_by: request.acted_by,
    }) {
        Ok(entry) => (StatusCode::OK, axum::Json(entry.status_view())).into_response(),
        Err(err) => draft_pool_error_response(err),
    }
}

pub(crate) async fn payment_handler<D, T, P, O, N>(
    State(service): State<Arc<RegistrationService<D, T, P, O, N>>>,
    Path((team_id, entry_id)): Path<(String, String)>,
    axum::Json(patch): axum::Json<PaymentPatch>,
) -> Response
where
    D: DraftPoolRepository + 'static,
    T: TeamDirectory + 'static,
    P: AthleteDirectory + 'static,
    O: RegistrationLedger + 'static,
    N: NotificationSink + 'static,
{
    match service.update_payment(&TeamId(team_id), &EntryId(entry_id), patch) {
        Ok(entry) => (StatusCode::OK, axum::Json(entry.status_view())).into_response(),
        Err(err) => draft_pool_error_response(err),
    }
}

pub(crate) async fn athlete_status_handler<D, T, P, O, N>(
    State(service): State<Arc<RegistrationService<D, T, P, O, N>>>,
    Path(athlete_id): Path<String>,
) -> Response
where
    D: DraftPoolRepository + 'static,
    T: TeamDirectory + 'static,
    P: AthleteDirectory + 'static,
    O: RegistrationLedger + 'static,
    N: NotificationSink + 'static,
{
    match service.registration_status(&AthleteId(athlete_id)) {
        Ok(status) => (StatusCode::OK, axum::Json(status)).into_response(),
        Err(err) => draft_pool_error_response(err),
    }
}

fn validation_response(err: ValidationError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn registration_error_response(err: RegistrationError) -> Response {
    let status = match &err {
        RegistrationError::Validation(_) | RegistrationError::Payment(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RegistrationError::Ineligible { .. } => StatusCode::CONFLICT,
        RegistrationError::DraftPool(inner) => draft_pool_status(inner),
        RegistrationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn draft_pool_error_response(err: DraftPoolError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (draft_pool_status(&err), axum::Json(payload)).into_response()
}

fn draft_pool_status(err: &DraftPoolError) -> StatusCode {
    match err {
        DraftPoolError::EntryNotFound | DraftPoolError::TeamNotFound => StatusCode::NOT_FOUND,
        DraftPoolError::InvalidState { .. } => StatusCode::CONFLICT,
        DraftPoolError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
