//! Metered proposal generation handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use pitch_credits_core::{GeneratedProposal, ProposalBrief, ProposalId};

use super::PageQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Proposal response.
#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    /// Proposal ID.
    pub id: String,
    /// Target platform.
    pub platform: String,
    /// Tone used.
    pub tone: String,
    /// Job title.
    pub job_title: String,
    /// Job description.
    pub job_description: String,
    /// Generated text.
    pub proposal_text: String,
    /// Timestamp.
    pub created_at: String,
}

impl From<&GeneratedProposal> for ProposalResponse {
    fn from(proposal: &GeneratedProposal) -> Self {
        Self {
            id: proposal.id.to_string(),
            platform: proposal.platform.label().to_string(),
            tone: proposal.tone.clone(),
            job_title: proposal.job_title.clone(),
            job_description: proposal.job_description.clone(),
            proposal_text: proposal.proposal_text.clone(),
            created_at: proposal.created_at.to_rfc3339(),
        }
    }
}

/// Generate proposal response.
#[derive(Debug, Serialize)]
pub struct GenerateProposalResponse {
    /// The saved proposal.
    pub proposal: ProposalResponse,
    /// Credits charged.
    pub charged: i64,
    /// Balance after the charge.
    pub balance: i64,
}

/// Draft a proposal with the generator and charge for it.
///
/// Nothing is charged when generation fails (502). When the balance does not
/// cover the cost, either before generating or because it was spent while
/// generating, the response is 402 and no proposal is kept.
pub async fn generate_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(brief): Json<ProposalBrief>,
) -> Result<(StatusCode, Json<GenerateProposalResponse>), ApiError> {
    if brief.job_description.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "job_description must not be empty".into(),
        ));
    }

    let author = brief
        .author_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| auth.user_id.to_string(), str::to_string);
    let cost = state.config.generation_cost_credits;

    let receipt = state
        .ledger
        .generate_proposal(auth.user_id, cost, &brief, &author, || {
            state.generator.generate(&brief)
        })
        .await?;

    tracing::info!(
        user_id = %auth.user_id,
        proposal_id = %receipt.artifact.id,
        balance = receipt.balance(),
        "Proposal generated"
    );

    Ok((
        StatusCode::CREATED,
        Json(GenerateProposalResponse {
            proposal: ProposalResponse::from(&receipt.artifact),
            charged: cost,
            balance: receipt.balance(),
        }),
    ))
}

/// Get one of the caller's proposals.
pub async fn get_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(proposal_id): Path<String>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let proposal_id: ProposalId = proposal_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid proposal ID".into()))?;

    let proposal = state.ledger.proposal(&auth.user_id, &proposal_id)?;

    Ok(Json(ProposalResponse::from(&proposal)))
}

/// List proposals response.
#[derive(Debug, Serialize)]
pub struct ListProposalsResponse {
    /// Proposals, newest first.
    pub proposals: Vec<ProposalResponse>,
}

/// List the caller's generated proposals.
pub async fn list_proposals(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListProposalsResponse>, ApiError> {
    let proposals = state
        .ledger
        .proposals_for(&auth.user_id, query.capped_limit(), query.offset)?;

    Ok(Json(ListProposalsResponse {
        proposals: proposals.iter().map(ProposalResponse::from).collect(),
    }))
}
