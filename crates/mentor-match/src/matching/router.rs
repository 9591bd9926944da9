use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    DemandId, DemandProfileDraft, ProposalId, ProposalState, SupplyId, SupplyProfileDraft,
};
use super::error::MatchingError;
use super::repository::{AuditSink, MatchingRepository};
use super::service::{MatchingService, RecommendQuery};

type SharedService<R, A> = State<Arc<MatchingService<R, A>>>;

/// Router builder exposing the matching core over HTTP.
pub fn matching_router<R, A>(service: Arc<MatchingService<R, A>>) -> Router
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/demand/:demand_id/profile",
            put(save_demand_handler::<R, A>),
        )
        .route(
            "/api/v1/demand/:demand_id/recommendations",
            get(recommend_handler::<R, A>),
        )
        .route(
            "/api/v1/demand/:demand_id/proposals",
            get(demand_proposals_handler::<R, A>),
        )
        .route(
            "/api/v1/demand/:demand_id/retry-credits",
            get(retry_credits_handler::<R, A>),
        )
        .route(
            "/api/v1/supply/:supply_id/profile",
            put(save_supply_handler::<R, A>),
        )
        .route(
            "/api/v1/supply/:supply_id/verification",
            post(verification_handler::<R, A>),
        )
        .route(
            "/api/v1/supply/:supply_id/capacity",
            get(capacity_handler::<R, A>),
        )
        .route(
            "/api/v1/supply/:supply_id/proposals",
            get(supply_inbox_handler::<R, A>),
        )
        .route(
            "/api/v1/supply/:supply_id/assignments",
            get(assignments_handler::<R, A>),
        )
        .route(
            "/api/v1/scores/:demand_id/:supply_id",
            get(score_handler::<R, A>),
        )
        .route("/api/v1/proposals", post(create_proposal_handler::<R, A>))
        .route(
            "/api/v1/proposals/:proposal_id",
            get(proposal_handler::<R, A>),
        )
        .route(
            "/api/v1/proposals/:proposal_id/accept",
            post(accept_handler::<R, A>),
        )
        .route(
            "/api/v1/proposals/:proposal_id/decline",
            post(decline_handler::<R, A>),
        )
        .with_state(service)
}

/// Body of `POST /api/v1/proposals`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProposalRequest {
    pub demand_id: DemandId,
    pub supply_id: SupplyId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of the accept and decline endpoints; `supply_id` is the acting supply unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub supply_id: SupplyId,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub verified: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub state: Option<ProposalState>,
}

pub(crate) fn error_status(error: &MatchingError) -> StatusCode {
    match error {
        MatchingError::ProfileIncomplete(_) | MatchingError::InvalidProfile(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MatchingError::AlreadyPending { .. }
        | MatchingError::NoCapacity { .. }
        | MatchingError::AlreadyProcessed { .. } => StatusCode::CONFLICT,
        MatchingError::Unauthorized => StatusCode::FORBIDDEN,
        MatchingError::NotFound(_) => StatusCode::NOT_FOUND,
        MatchingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for MatchingError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (error_status(&self), axum::Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, MatchingError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn save_demand_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(demand_id): Path<String>,
    axum::Json(draft): axum::Json<DemandProfileDraft>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.save_demand_profile(DemandId(demand_id), draft),
    )
}

pub(crate) async fn save_supply_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(supply_id): Path<String>,
    axum::Json(draft): axum::Json<SupplyProfileDraft>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.save_supply_profile(SupplyId(supply_id), draft),
    )
}

pub(crate) async fn verification_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(supply_id): Path<String>,
    axum::Json(request): axum::Json<VerificationRequest>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.set_supply_verified(&SupplyId(supply_id), request.verified),
    )
}

pub(crate) async fn capacity_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(supply_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.capacity(&SupplyId(supply_id)))
}

pub(crate) async fn supply_inbox_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(supply_id): Path<String>,
    Query(query): Query<InboxQuery>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.supply_inbox(&SupplyId(supply_id), query.state),
    )
}

pub(crate) async fn assignments_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(supply_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.supply_assignments(&SupplyId(supply_id)),
    )
}

pub(crate) async fn recommend_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(demand_id): Path<String>,
    Query(query): Query<RecommendQuery>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.recommend(&DemandId(demand_id), &query),
    )
}

pub(crate) async fn demand_proposals_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(demand_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.demand_proposals(&DemandId(demand_id)),
    )
}

pub(crate) async fn retry_credits_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(demand_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.retry_credits(&DemandId(demand_id)))
}

pub(crate) async fn score_handler<R, A>(
    State(service): SharedService<R, A>,
    Path((demand_id, supply_id)): Path<(String, String)>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.score_match(&DemandId(demand_id), &SupplyId(supply_id)),
    )
}

pub(crate) async fn create_proposal_handler<R, A>(
    State(service): SharedService<R, A>,
    axum::Json(request): axum::Json<CreateProposalRequest>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    let CreateProposalRequest {
        demand_id,
        supply_id,
        message,
    } = request;

    match service.create_proposal(&demand_id, &supply_id, message) {
        Ok(proposal) => {
            let payload = json!({
                "proposal_id": proposal.proposal_id,
                "state": proposal.state,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn proposal_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(proposal_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.get_proposal(&ProposalId(proposal_id)),
    )
}

pub(crate) async fn accept_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(proposal_id): Path<String>,
    axum::Json(request): axum::Json<RespondRequest>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.accept_proposal(
            &ProposalId(proposal_id),
            &request.supply_id,
            request.response,
        ),
    )
}

pub(crate) async fn decline_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(proposal_id): Path<String>,
    axum::Json(request): axum::Json<RespondRequest>,
) -> Response
where
    R: MatchingRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.decline_proposal(
            &ProposalId(proposal_id),
            &request.supply_id,
            request.response,
        ),
    )
}
