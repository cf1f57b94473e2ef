//! # Authentication Middleware
//!
//! Bearer tokens carry the caller's role and principal id:
//!
//! ```text
//! Bearer {role}:{principal_uuid}:{secret}
//! ```
//!
//! Role names accept the legacy profile names as aliases (`student`,
//! `admin`, `guard`). When no secret is configured (development mode) the
//! `{secret}` segment may be omitted and is not checked, but the role and
//! principal are still required: every operation needs to know who is
//! calling.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it and mint the capability handle
//! their operation requires; a wrong role surfaces as 403.

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use subtle::ConstantTimeEq;

use outpass_core::{
    CheckpointOperator, Identity, IdentityContext, PrincipalId, ReadsApproved, ReadsLedger,
    Resident, Role, Supervisor,
};

use crate::error::AppError;

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, available to all route handlers
/// via Axum's `FromRequestParts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity(pub Identity);

impl CallerIdentity {
    /// The underlying identity.
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    /// Require the resident role.
    pub fn resident(&self) -> Result<Resident, AppError> {
        Ok(self.0.resident()?)
    }

    /// Require the supervisor role.
    pub fn supervisor(&self) -> Result<Supervisor, AppError> {
        Ok(self.0.supervisor()?)
    }

    /// Require the checkpoint operator role.
    pub fn checkpoint_operator(&self) -> Result<CheckpointOperator, AppError> {
        Ok(self.0.checkpoint_operator()?)
    }

    /// A handle allowed to list approved requests (supervisor or operator).
    pub fn approved_reader(&self) -> Result<Box<dyn ReadsApproved>, AppError> {
        match self.0.role {
            Role::Supervisor => Ok(Box::new(self.supervisor()?)),
            Role::CheckpointOperator => Ok(Box::new(self.checkpoint_operator()?)),
            Role::Resident => Err(forbidden_for_resident()),
        }
    }

    /// A handle allowed to read the checkpoint ledger (supervisor or
    /// operator).
    pub fn ledger_reader(&self) -> Result<Box<dyn ReadsLedger>, AppError> {
        match self.0.role {
            Role::Supervisor => Ok(Box::new(self.supervisor()?)),
            Role::CheckpointOperator => Ok(Box::new(self.checkpoint_operator()?)),
            Role::Resident => Err(forbidden_for_resident()),
        }
    }
}

fn forbidden_for_resident() -> AppError {
    AppError::Forbidden(
        "role 'supervisor' or 'checkpoint_operator' required, caller has 'resident'".into(),
    )
}

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let injected: Option<Identity> = parts.extensions.get::<CallerIdentity>().map(|c| c.0);
        Ok(Self(injected.require_identity()?))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Whether `provided` equals the configured secret, in time independent of
/// where the first differing byte is.
///
/// On a length mismatch the expected secret is compared with itself so the
/// same amount of work is done.
fn secret_matches(provided: &str, expected: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    let same_len = provided.len() == expected.len();
    let candidate = if same_len { provided } else { expected };
    same_len & bool::from(candidate.ct_eq(expected))
}

/// Parse a bearer token of the form `{role}:{principal_uuid}:{secret}`.
///
/// With `expected_secret = None` the secret segment is optional and
/// ignored.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<Identity, String> {
    let parts: Vec<&str> = provided.trim().splitn(3, ':').collect();
    let (role_str, principal_str, secret) = match parts.as_slice() {
        [role, principal, secret] => (*role, *principal, Some(*secret)),
        [role, principal] => (*role, *principal, None),
        _ => {
            return Err(
                "invalid token format, expected {role}:{principal_id}:{secret}".into(),
            )
        }
    };

    if let Some(expected) = expected_secret {
        let matches = secret.is_some_and(|s| secret_matches(s, expected));
        if !matches {
            return Err("invalid bearer token".into());
        }
    }

    let role: Role = role_str.parse().map_err(|e| format!("{e}"))?;
    let principal: PrincipalId = principal_str
        .parse()
        .map_err(|e| format!("invalid principal id: {e}"))?;
    Ok(Identity::new(principal, role))
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject the caller's identity.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    if !request.headers().contains_key(header::AUTHORIZATION) {
        tracing::warn!("authentication failed: missing authorization header");
        return unauthorized_response("missing authorization header");
    }
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>()
    else {
        tracing::warn!("authentication failed: non-Bearer authorization scheme");
        return unauthorized_response("authorization header must use Bearer scheme");
    };

    match parse_bearer_token(bearer.token(), config.token.as_deref()) {
        Ok(identity) => {
            tracing::debug!(principal = %identity.id, role = %identity.role, "caller authenticated");
            request.extensions_mut().insert(CallerIdentity(identity));
            next.run(request).await
        }
        Err(msg) => {
            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
            unauthorized_response(&msg)
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const PRINCIPAL: &str = "6a1f1d2e-3b4c-4d5e-8f90-a1b2c3d4e5f6";

    fn test_app(token: Option<&str>) -> Router {
        let auth_config = AuthConfig {
            token: token.map(str::to_string),
        };
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move { caller.0.role.to_string() }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn parses_role_principal_and_secret() {
        let identity =
            parse_bearer_token(&format!("supervisor:{PRINCIPAL}:s3cret"), Some("s3cret")).unwrap();
        assert_eq!(identity.role, Role::Supervisor);
        assert_eq!(identity.id.to_string(), format!("principal:{PRINCIPAL}"));
    }

    #[test]
    fn accepts_legacy_role_names() {
        for (name, role) in [
            ("student", Role::Resident),
            ("admin", Role::Supervisor),
            ("guard", Role::CheckpointOperator),
        ] {
            let identity = parse_bearer_token(&format!("{name}:{PRINCIPAL}:k"), Some("k")).unwrap();
            assert_eq!(identity.role, role);
        }
    }

    #[test]
    fn secret_may_contain_colons() {
        let identity =
            parse_bearer_token(&format!("resident:{PRINCIPAL}:a:b:c"), Some("a:b:c")).unwrap();
        assert_eq!(identity.role, Role::Resident);
    }

    #[test]
    fn wrong_or_missing_secret_rejected() {
        assert!(parse_bearer_token(&format!("resident:{PRINCIPAL}:nope"), Some("k")).is_err());
        assert!(parse_bearer_token(&format!("resident:{PRINCIPAL}"), Some("k")).is_err());
    }

    #[test]
    fn dev_mode_ignores_secret() {
        assert!(parse_bearer_token(&format!("resident:{PRINCIPAL}"), None).is_ok());
        assert!(parse_bearer_token(&format!("resident:{PRINCIPAL}:anything"), None).is_ok());
    }

    #[test]
    fn malformed_tokens_rejected() {
        assert!(parse_bearer_token("just-a-secret", None).is_err());
        assert!(parse_bearer_token(&format!("warden:{PRINCIPAL}:k"), Some("k")).is_err());
        assert!(parse_bearer_token("resident:not-a-uuid:k", Some("k")).is_err());
    }

    #[test]
    fn secret_comparison_matches_equality() {
        assert!(secret_matches("abc", "abc"));
        assert!(!secret_matches("abc", "abd"));
        assert!(!secret_matches("abc", "abcd"));
        assert!(!secret_matches("", "abc"));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = AuthConfig {
            token: Some("hunter2".into()),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[tokio::test]
    async fn valid_token_injects_identity() {
        let (status, body) = call(
            test_app(Some("k")),
            Some(&format!("Bearer guard:{PRINCIPAL}:k")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "checkpoint_operator");
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let (status, body) = call(test_app(Some("k")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let (status, body) = call(test_app(Some("k")), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let (status, _) = call(
            test_app(Some("k")),
            Some(&format!("Bearer admin:{PRINCIPAL}:wrong")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dev_mode_still_requires_identity() {
        let (status, _) = call(test_app(None), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body) = call(test_app(None), Some(&format!("Bearer student:{PRINCIPAL}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "resident");
    }

    #[test]
    fn readers_are_denied_to_residents() {
        let resident = CallerIdentity(Identity::new(PrincipalId::new(), Role::Resident));
        assert!(matches!(resident.approved_reader(), Err(AppError::Forbidden(_))));
        assert!(matches!(resident.ledger_reader(), Err(AppError::Forbidden(_))));

        let operator = CallerIdentity(Identity::new(PrincipalId::new(), Role::CheckpointOperator));
        assert!(operator.approved_reader().is_ok());
        assert!(operator.supervisor().is_err());
    }

    #[tokio::test]
    async fn caller_identity_requires_injected_identity() {
        use axum::extract::FromRequestParts;

        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = CallerIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let identity = Identity::new(PrincipalId::new(), Role::Supervisor);
        parts.extensions.insert(CallerIdentity(identity));
        let caller = CallerIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(caller.identity(), &identity);
    }
}
