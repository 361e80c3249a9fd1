use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Error;
use crate::rest::AppError;

/// Header set by the gateway after it has verified the session token.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Caller identity taken from [`OWNER_HEADER`]. Token verification happens
/// upstream; a missing or malformed header is rejected here with the same
/// message the gateway uses so clients see one failure mode.
pub struct OwnerIdentity(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for OwnerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError(Error::unauthorized()))?;

        let owner = Uuid::parse_str(raw).map_err(|_| AppError(Error::unauthorized()))?;
        Ok(OwnerIdentity(owner))
    }
}

/// Confirms the claimed owner actually exists before any account-scoped
/// operation runs. A stale or fabricated id fails exactly like a missing
/// header.
pub async fn require_user(pool: &PgPool, owner: Uuid) -> crate::errors::Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(owner)
        .fetch_one(pool)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(Error::unauthorized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_rejected() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(OwnerIdentity::from_request_parts(&mut parts, &())
            .await
            .is_err());

        let (mut parts, _) = Request::builder()
            .header(OWNER_HEADER, "not-a-uuid")
            .body(())
            .unwrap()
            .into_parts();
        assert!(OwnerIdentity::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_valid_header_is_accepted() {
        let owner = Uuid::new_v4();
        let (mut parts, _) = Request::builder()
            .header(OWNER_HEADER, owner.to_string())
            .body(())
            .unwrap()
            .into_parts();

        let OwnerIdentity(parsed) = OwnerIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(parsed, owner);
    }
}
