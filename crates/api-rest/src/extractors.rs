//! Extractors for the authenticated caller and its tenant scope.

use crate::error::ApiError;
use api_shared::{Principal, BRANCH_ID_HEADER};
use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Query};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use clinic_core::{ClinicError, RecordId, TenantScope};

/// JSON body whose rejections use the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: serde::Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `multipart/form-data` body; a missing or bad boundary answers with the error envelope.
#[derive(FromRequest)]
#[from_request(rejection(ApiError))]
pub struct ApiMultipart(pub Multipart);

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| ClinicError::Unauthorized("API key is missing".into()).into())
    }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(principal) = Authenticated::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            return Err(ClinicError::Forbidden("admin role required".into()).into());
        }
        Ok(AdminOnly(principal))
    }
}

/// The caller's tenant, narrowed to `X-Branch-ID` when that header is sent.
#[derive(Debug, Clone)]
pub struct Scope(pub TenantScope);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Scope {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(principal) = Authenticated::from_request_parts(parts, state).await?;
        let mut scope = TenantScope::new(principal.tenant_id);

        if let Some(value) = parts.headers.get(BRANCH_ID_HEADER) {
            let branch = value
                .to_str()
                .ok()
                .and_then(|v| RecordId::parse_lenient(v).ok())
                .ok_or_else(|| ClinicError::invalid("X-Branch-ID", "must be a UUID"))?;
            scope = scope.with_branch(branch);
        }
        Ok(Scope(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_shared::Role;
    use axum::http::Request;
    use clinic_core::{ErrorKind, TenantId};

    fn parts_with(principal: Option<Principal>, branch: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/patients");
        if let Some(b) = branch {
            builder = builder.header(BRANCH_ID_HEADER, b);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(p) = principal {
            parts.extensions.insert(p);
        }
        parts
    }

    fn staff() -> Principal {
        Principal {
            user_id: "u-1".into(),
            tenant_id: TenantId::new("acme").unwrap(),
            role: Role::Staff,
        }
    }

    #[tokio::test]
    async fn missing_principal_is_unauthorized() {
        let mut parts = parts_with(None, None);
        let err = Scope::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.0.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn staff_is_not_admin() {
        let mut parts = parts_with(Some(staff()), None);
        let err = AdminOnly::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.0.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn branch_header_narrows_scope() {
        let branch = RecordId::new();
        let mut parts = parts_with(Some(staff()), Some(&branch.to_string()));
        let Scope(scope) = Scope::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(scope.tenant_id().as_str(), "acme");
        assert_eq!(scope.branch_id(), Some(branch));

        let mut parts = parts_with(Some(staff()), Some("not-a-branch"));
        let err = Scope::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.0.kind(), ErrorKind::Validation);
    }
}
