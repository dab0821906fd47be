// security/src/middleware.rs

//! Bearer-token checks shared by every protected route.

use log::warn;

use models::medical::Actor;

use crate::roles::RolesConfig;
use crate::{validate_jwt_token, AuthError};

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Validates the caller's token and checks that their role grants
/// `permission`. Returns the actor on success.
pub fn authorize(
    header: Option<&str>,
    secret: &[u8],
    roles: &RolesConfig,
    permission: &str,
) -> Result<Actor, AuthError> {
    let token = bearer_token(header)?;
    let claims = validate_jwt_token(token, secret)?;

    if roles.permissions(claims.role).is_none() {
        warn!("Token for {} carries unconfigured role {}", claims.sub, claims.role);
        return Err(AuthError::UnknownRole(claims.role.to_string()));
    }
    if !roles.has_permission(claims.role, permission) {
        warn!("{} ({}) denied {}", claims.sub, claims.role, permission);
        return Err(AuthError::PermissionDenied(permission.to_string()));
    }

    let mut actor = Actor::new(claims.sub, claims.role);
    actor.username = claims.username;
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue_token;
    use crate::roles::permissions::{AUDIT_READ, VISITS_READ};
    use chrono::Duration;
    use models::medical::Role;

    const SECRET: &[u8] = b"middleware-test-secret";

    fn header_for(role: Role) -> String {
        let token = issue_token(SECRET, "u-1", Some("user"), role, Duration::minutes(5)).unwrap();
        format!("Bearer {}", token)
    }

    #[test]
    fn should_require_bearer_prefix() {
        assert_eq!(bearer_token(None), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
    }

    #[test]
    fn should_authorize_permitted_role() {
        let header = header_for(Role::Nurse);
        let actor = authorize(Some(&header), SECRET, &RolesConfig::default(), VISITS_READ).unwrap();
        assert_eq!(actor.id, "u-1");
        assert_eq!(actor.role, Role::Nurse);
        assert_eq!(actor.username.as_deref(), Some("user"));
    }

    #[test]
    fn should_deny_missing_permission() {
        let header = header_for(Role::Nurse);
        let err = authorize(Some(&header), SECRET, &RolesConfig::default(), AUDIT_READ).unwrap_err();
        assert_eq!(err, AuthError::PermissionDenied(AUDIT_READ.to_string()));
    }

    #[test]
    fn should_reject_role_missing_from_config() {
        let roles = RolesConfig::from_yaml_str("roles:\n  admin:\n    permissions: [superuser]").unwrap();
        let header = header_for(Role::Doctor);
        let err = authorize(Some(&header), SECRET, &roles, VISITS_READ).unwrap_err();
        assert!(matches!(err, AuthError::UnknownRole(_)));
    }
}
