use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::error::AppError;

/// Header carrying the wallet address verified by the gateway
pub const WALLET_ADDRESS_HEADER: &str = "x-wallet-address";

/// The authenticated caller, identified by wallet address
///
/// Addresses are compared case-insensitively, so the stored form is lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Fails with 403 unless the caller is `user_id`
    pub fn ensure_owner(&self, user_id: &str) -> Result<(), AppError> {
        if normalize_user_id(user_id) == self.0 {
            Ok(())
        } else {
            tracing::warn!(caller = %self.0, target = %user_id, "Access to another user's data");
            Err(AppError::Forbidden)
        }
    }
}

pub fn normalize_user_id(user_id: &str) -> String {
    user_id.trim().to_lowercase()
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let address = parts
            .headers
            .get(WALLET_ADDRESS_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(normalize_user_id)
            .filter(|address| !address.is_empty())
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<CurrentUser, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(WALLET_ADDRESS_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_is_normalized() {
        let user = extract(Some(" 0xABC ")).await.unwrap();
        assert_eq!(user.id(), "0xabc");
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(AppError::Unauthorized)));
        assert!(matches!(extract(Some("  ")).await, Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_ensure_owner() {
        let user = CurrentUser("0xabc".to_string());
        assert!(user.ensure_owner("0xABC").is_ok());
        assert!(matches!(
            user.ensure_owner("0xdef"),
            Err(AppError::Forbidden)
        ));
    }
}
