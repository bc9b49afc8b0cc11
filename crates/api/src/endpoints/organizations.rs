//! Organization endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use huddle_common::AppResult;
use huddle_core::CreateOrganizationInput;
use huddle_db::entities::{org_member, org_member::OrgRole, organization};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create organizations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_organization))
        .route("/", get(list_my_organizations))
        .route("/{org_id}", get(get_organization))
        .route("/{org_id}/members", get(list_members))
        .route("/{org_id}/members", post(add_member))
        .route("/{org_id}/members/{user_id}", delete(remove_member))
}

/// Organization response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub industry: Option<String>,
    pub logo_url: Option<String>,
    pub allow_guest_users: bool,
    pub default_role: OrgRole,
    pub created_at: DateTime<Utc>,
}

impl From<organization::Model> for OrganizationResponse {
    fn from(org: organization::Model) -> Self {
        Self {
            id: org.id,
            name: org.name,
            owner_id: org.owner_id,
            industry: org.industry,
            logo_url: org.logo_url,
            allow_guest_users: org.allow_guest_users,
            default_role: org.default_role,
            created_at: org.created_at.into(),
        }
    }
}

/// Membership response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub org_id: String,
    pub user_id: String,
    pub role: OrgRole,
    pub joined_at: DateTime<Utc>,
}

impl From<org_member::Model> for MembershipResponse {
    fn from(member: org_member::Model) -> Self {
        Self {
            org_id: member.org_id,
            user_id: member.user_id,
            role: member.role,
            joined_at: member.joined_at.into(),
        }
    }
}

/// Create an organization.
async fn create_organization(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateOrganizationInput>,
) -> AppResult<ApiResponse<OrganizationResponse>> {
    let org = state.organization_service.create(&identity.id, input).await?;

    info!(org_id = %org.id, creator = %identity.id, "Organization created");

    Ok(ApiResponse::ok(OrganizationResponse::from(org)))
}

/// List the authenticated user's memberships.
async fn list_my_organizations(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<MembershipResponse>>> {
    let memberships = state.organization_service.list_for_user(&identity.id).await?;

    Ok(ApiResponse::ok(
        memberships.into_iter().map(MembershipResponse::from).collect(),
    ))
}

/// Get an organization.
async fn get_organization(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> AppResult<ApiResponse<OrganizationResponse>> {
    let org = state.organization_service.get(&identity.id, &org_id).await?;
    Ok(ApiResponse::ok(OrganizationResponse::from(org)))
}

/// List an organization's members.
async fn list_members(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> AppResult<ApiResponse<Vec<MembershipResponse>>> {
    let members = state
        .organization_service
        .list_members(&identity.id, &org_id)
        .await?;

    Ok(ApiResponse::ok(
        members.into_iter().map(MembershipResponse::from).collect(),
    ))
}

/// Add member request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddMemberRequest {
    user_id: String,
    role: Option<OrgRole>,
}

/// Add a member to an organization. Admin-gated.
async fn add_member(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> AppResult<ApiResponse<MembershipResponse>> {
    let member = state
        .organization_service
        .add_member(&identity.id, &org_id, &req.user_id, req.role)
        .await?;

    info!(org_id = %org_id, user_id = %member.user_id, "Member added");

    Ok(ApiResponse::ok(MembershipResponse::from(member)))
}

/// Remove a member from an organization.
async fn remove_member(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((org_id, user_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<()>> {
    state
        .organization_service
        .remove_member(&identity.id, &org_id, &user_id)
        .await?;

    info!(org_id = %org_id, user_id = %user_id, "Member removed");

    Ok(ApiResponse::ok(()))
}
