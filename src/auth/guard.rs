//! Role-based authorization guard.
//!
//! A pure predicate over the attached identity and a role allow-list.
//! Runs strictly after the auth middleware; a missing identity here is a
//! wiring mistake and is answered with 401 as a defensive double-check.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::models::{Identity, Role};
use crate::errors::ApiError;

/// Check a role against an allow-list. The only side effect is an audit
/// log entry on denial.
pub fn authorize(identity: Option<&Identity>, allowed: &[Role]) -> Result<(), ApiError> {
    let identity = identity
        .ok_or_else(|| ApiError::unauthenticated("authentication required", "TOKEN_MISSING"))?;

    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        tracing::warn!(
            subject = %identity.subject,
            role = %identity.role,
            required = ?allowed.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
            "Authorization denied"
        );
        Err(ApiError::Forbidden)
    }
}

/// Middleware restricting a route subtree to the given roles. Wire it as
/// `middleware::from_fn_with_state(allowed, require_roles)` inside a
/// `require_auth` layer.
pub async fn require_roles(
    axum::extract::State(allowed): axum::extract::State<&'static [Role]>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(request.extensions().get::<Identity>(), allowed)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            subject: "user-1".into(),
            email: "user@fleet.example".into(),
            role,
        }
    }

    #[test]
    fn test_allowed_role_passes() {
        let id = identity(Role::Manager);
        assert!(authorize(Some(&id), &[Role::Admin, Role::Manager]).is_ok());
    }

    #[test]
    fn test_disallowed_role_is_forbidden() {
        let id = identity(Role::Customer);
        assert!(matches!(
            authorize(Some(&id), &[Role::Admin]),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn test_missing_identity_is_unauthenticated() {
        assert!(matches!(
            authorize(None, &[Role::Admin]),
            Err(ApiError::Unauthenticated { .. })
        ));
    }
}
