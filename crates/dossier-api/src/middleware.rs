use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use tracing::debug;
use uuid::Uuid;

use dossier_types::Role;

use crate::auth::decode_token;
use crate::error::AppError;
use crate::state::{AppState, with_db};

/// Identity of the caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Validates the bearer token and re-reads the account so deleted or
/// deactivated users lose access immediately.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| AppError::Authentication("Access denied. No token provided.".into()))?;

    let claims = decode_token(&state.config.jwt_secret, bearer.token())
        .map_err(|_| AppError::Authentication("Invalid token.".into()))?;

    let user_id = claims.sub;
    let user = with_db(&state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid token. User not found.".into()))?;

    if !user.is_active {
        return Err(AppError::Authentication("Account is deactivated.".into()));
    }

    let auth = AuthUser {
        id: user_id,
        email: user.email.clone(),
        role: user.role()?,
    };
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Role gate for a whole route group. Layer it inside [`require_auth`]:
///
/// ```ignore
/// router.route_layer(middleware::from_fn_with_state(ADMIN_ONLY, require_role))
/// ```
pub async fn require_role(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::Authentication("Access denied. No token provided.".into()))?;

    if !allowed.contains(&user.role) {
        debug!(user_id = %user.id, role = %user.role, "Role gate denied request");
        return Err(AppError::Authorization(
            "Access denied. Insufficient permissions.".into(),
        ));
    }

    Ok(next.run(req).await)
}
