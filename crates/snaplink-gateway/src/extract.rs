//! Request extractors for the caller identity and the click context.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts, OptionalFromRequestParts};
use axum::http::header::{REFERER, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use snaplink_core::{ClickContext, OwnerId, Requester, Role};

use crate::error::AppError;

/// Set by the authenticating proxy in front of the gateway.
pub const USER_HEADER: &str = "x-snaplink-user";
/// `user` (default) or `admin`.
pub const ROLE_HEADER: &str = "x-snaplink-role";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// The authenticated caller of a management route.
#[derive(Debug, Clone)]
pub struct Caller(pub Requester);

impl Caller {
    fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, AppError> {
        let Some(user) = header_str(headers, USER_HEADER) else {
            return Ok(None);
        };

        let role = match header_str(headers, ROLE_HEADER) {
            None => Role::User,
            Some(role) if role.eq_ignore_ascii_case("user") => Role::User,
            Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            Some(other) => {
                return Err(AppError::BadRequest(format!("unknown role: {other}")));
            }
        };

        Ok(Some(Caller(Requester {
            id: OwnerId::new(user),
            role,
        })))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)?.ok_or(AppError::Unauthenticated)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}

/// Visitor details recorded with a click. Never rejects.
#[derive(Debug, Clone)]
pub struct Visitor(pub ClickContext);

impl<S: Send + Sync> FromRequestParts<S> for Visitor {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        // first hop of x-forwarded-for wins over the socket peer
        let ip = header_str(headers, FORWARDED_FOR_HEADER)
            .and_then(|value| value.split(',').next())
            .map(|ip| ip.trim().to_string())
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_default();

        Ok(Visitor(snaplink_analytics::classify(
            header_str(headers, USER_AGENT.as_str()),
            header_str(headers, REFERER.as_str()),
            ip,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/abc");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn caller_defaults_to_user_role() {
        let mut parts = parts(&[(USER_HEADER, "alice")]);
        let Caller(requester) = <Caller as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(requester, Requester::user("alice"));
    }

    #[tokio::test]
    async fn caller_accepts_admin_role() {
        let mut parts = parts(&[(USER_HEADER, "root"), (ROLE_HEADER, "Admin")]);
        let Caller(requester) = <Caller as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(requester, Requester::admin("root"));
    }

    #[tokio::test]
    async fn missing_user_is_rejected_unless_optional() {
        let mut required = parts(&[]);
        let err = <Caller as FromRequestParts<()>>::from_request_parts(&mut required, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));

        let mut optional = parts(&[]);
        let caller =
            <Caller as OptionalFromRequestParts<()>>::from_request_parts(&mut optional, &())
                .await
                .unwrap();
        assert!(caller.is_none());
    }

    #[tokio::test]
    async fn unknown_role_is_a_bad_request() {
        let mut parts = parts(&[(USER_HEADER, "alice"), (ROLE_HEADER, "owner")]);
        let err = <Caller as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn visitor_prefers_forwarded_for() {
        let mut parts = parts(&[
            (FORWARDED_FOR_HEADER, "198.51.100.4, 10.0.0.1"),
            ("referer", "https://news.example"),
        ]);
        let Visitor(context) = Visitor::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context.ip, "198.51.100.4");
        assert_eq!(context.referrer, "https://news.example");
        assert_eq!(context.device, "desktop");
    }
}
