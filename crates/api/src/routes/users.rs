//! Staff user API routes
//!
//! User management requires an administrative role, and creating a user is
//! gated by the plan's seat cap.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use clinova_shared::{PaginatedResponse, ResourceKind, User, UserRole};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Query params for the user list
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub include_inactive: Option<bool>,
}

/// Create user request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub full_name: String,
    pub role: String,
}

/// Update user request
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<String>,
}

fn require_admin(auth_user: &AuthUser) -> ApiResult<()> {
    if UserRole::from_str_lossy(&auth_user.role).can_administer() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// List staff users for the clinic
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<PaginatedResponse<User>>> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);
    let include_inactive = query.include_inactive.unwrap_or(false);

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM users WHERE org_id = $1 AND (active = true OR $2)",
    )
    .bind(auth_user.org_id)
    .bind(include_inactive)
    .fetch_one(&state.pool)
    .await?;

    let users: Vec<User> = sqlx::query_as(
        r#"
        SELECT id, org_id, email, full_name, role, active, created_at, updated_at
        FROM users
        WHERE org_id = $1 AND (active = true OR $2)
        ORDER BY full_name ASC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(auth_user.org_id)
    .bind(include_inactive)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(PaginatedResponse::new(users, total.0, page, per_page)))
}

/// Invite a staff user. Blocked with 402 when the plan's seat cap is reached.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<Json<User>> {
    require_admin(&auth_user)?;

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".to_string()));
    }
    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(ApiError::Validation("Full name is required".to_string()));
    }
    let role: UserRole = req
        .role
        .parse()
        .map_err(|_| ApiError::Validation(format!("Unknown role: {}", req.role)))?;

    state
        .plans
        .ensure_can_add(auth_user.org_id, ResourceKind::Users)
        .await?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, org_id, email, full_name, role, active)
        VALUES ($1, $2, $3, $4, $5, true)
        RETURNING id, org_id, email, full_name, role, active, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.org_id)
    .bind(&email)
    .bind(full_name)
    .bind(role.to_string())
    .fetch_one(&state.pool)
    .await?;

    state.plans.invalidate_usage(auth_user.org_id);

    tracing::info!(org_id = %auth_user.org_id, user_id = %user.id, role = %role, "user created");
    Ok(Json(user))
}

/// Update a staff user's name or role
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    require_admin(&auth_user)?;

    let role = match req.role {
        Some(raw) => Some(
            raw.parse::<UserRole>()
                .map_err(|_| ApiError::Validation(format!("Unknown role: {}", raw)))?
                .to_string(),
        ),
        None => None,
    };

    let user: User = sqlx::query_as(
        r#"
        UPDATE users SET
            full_name = COALESCE($3, full_name),
            role = COALESCE($4, role),
            updated_at = NOW()
        WHERE id = $1 AND org_id = $2
        RETURNING id, org_id, email, full_name, role, active, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(auth_user.org_id)
    .bind(req.full_name)
    .bind(role)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(user))
}

/// Deactivate a staff user. Frees a seat against the user cap.
pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    require_admin(&auth_user)?;

    if user_id == auth_user.user_id {
        return Err(ApiError::Validation(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let user: User = sqlx::query_as(
        r#"
        UPDATE users SET active = false, updated_at = NOW()
        WHERE id = $1 AND org_id = $2
        RETURNING id, org_id, email, full_name, role, active, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(auth_user.org_id)
    .fetch_one(&state.pool)
    .await?;

    state.plans.invalidate_usage(auth_user.org_id);

    Ok(Json(user))
}
