//! Per-request principal resolution.
//!
//! One state machine decides who is calling:
//!
//! - no credential → visitor (rate-checked)
//! - credential, valid and active → authenticated principal
//! - credential, valid but inactive account → visitor (rate-checked)
//! - credential invalid or expired → visitor (rate-checked)
//!
//! Every visitor path runs the limiter before returning, so a throttled
//! address cannot probe with junk tokens either.

use std::net::IpAddr;

use platform_access::Principal;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::limiter::{RateExceeded, VisitorLimiter};
use crate::token::{TokenConfig, verify_token};

/// Loads principal snapshots from the identity store.
pub trait PrincipalStore {
    fn find_principal(
        &self,
        id: Uuid,
    ) -> impl Future<Output = anyhow::Result<Option<Principal>>> + Send;
}

/// Who ended up on the other side of the request.
#[derive(Clone, Debug)]
pub enum RequestPrincipal {
    Authenticated(Principal),
    Visitor,
}

impl RequestPrincipal {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            RequestPrincipal::Authenticated(principal) => Some(principal),
            RequestPrincipal::Visitor => None,
        }
    }

    pub fn is_visitor(&self) -> bool {
        matches!(self, RequestPrincipal::Visitor)
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    /// Distinct from an access decision: resolution itself refused the
    /// request. Retryable once the window elapses.
    #[error(transparent)]
    Throttled(#[from] RateExceeded),
    #[error("principal store failure")]
    Store(#[source] anyhow::Error),
}

/// Resolves the calling principal for one request.
pub struct AccessContext {
    token: TokenConfig,
    limiter: VisitorLimiter,
}

impl AccessContext {
    pub fn new(token: TokenConfig, limiter: VisitorLimiter) -> Self {
        Self { token, limiter }
    }

    pub fn token_config(&self) -> &TokenConfig {
        &self.token
    }

    pub async fn resolve<S>(
        &self,
        remote: IpAddr,
        bearer: Option<&str>,
        store: &S,
    ) -> Result<RequestPrincipal, ContextError>
    where
        S: PrincipalStore,
    {
        let Some(bearer) = bearer else {
            return self.visitor(remote);
        };
        let claims = match verify_token(bearer, &self.token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(%remote, %err, "credential rejected; downgrading to visitor");
                return self.visitor(remote);
            }
        };
        let principal = store
            .find_principal(claims.sub)
            .await
            .map_err(ContextError::Store)?;
        match principal {
            Some(principal) if principal.is_active => {
                Ok(RequestPrincipal::Authenticated(principal))
            }
            Some(principal) => {
                debug!(user_id = %principal.id, "inactive account; downgrading to visitor");
                self.visitor(remote)
            }
            None => {
                debug!(user_id = %claims.sub, "token subject unknown; downgrading to visitor");
                self.visitor(remote)
            }
        }
    }

    fn visitor(&self, remote: IpAddr) -> Result<RequestPrincipal, ContextError> {
        self.limiter.check(remote)?;
        Ok(RequestPrincipal::Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::issue_token;
    use platform_access::AccessLevel;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MapStore(HashMap<Uuid, Principal>);

    impl PrincipalStore for MapStore {
        async fn find_principal(&self, id: Uuid) -> anyhow::Result<Option<Principal>> {
            Ok(self.0.get(&id).cloned())
        }
    }

    fn context(limit: usize) -> AccessContext {
        AccessContext::new(
            TokenConfig::new("context-test-secret-32-bytes-long!", 30),
            VisitorLimiter::new(Duration::from_secs(3600), limit),
        )
    }

    fn remote() -> IpAddr {
        IpAddr::from([198, 51, 100, 7])
    }

    #[tokio::test]
    async fn missing_credential_resolves_to_visitor() {
        let ctx = context(10);
        let store = MapStore(HashMap::new());
        let resolved = ctx.resolve(remote(), None, &store).await.expect("resolve");
        assert!(resolved.is_visitor());
    }

    #[tokio::test]
    async fn valid_token_for_active_account_authenticates() {
        let ctx = context(10);
        let principal = Principal::with_level(Uuid::new_v4(), AccessLevel::Standard);
        let token = issue_token(principal.id, ctx.token_config()).expect("issue");
        let store = MapStore(HashMap::from([(principal.id, principal.clone())]));
        let resolved = ctx
            .resolve(remote(), Some(&token), &store)
            .await
            .expect("resolve");
        assert_eq!(resolved.principal().map(|p| p.id), Some(principal.id));
    }

    #[tokio::test]
    async fn inactive_account_downgrades_to_visitor() {
        let ctx = context(10);
        let mut principal = Principal::with_level(Uuid::new_v4(), AccessLevel::Admin);
        principal.is_active = false;
        let token = issue_token(principal.id, ctx.token_config()).expect("issue");
        let store = MapStore(HashMap::from([(principal.id, principal)]));
        let resolved = ctx
            .resolve(remote(), Some(&token), &store)
            .await
            .expect("resolve");
        assert!(resolved.is_visitor());
    }

    #[tokio::test]
    async fn junk_token_downgrades_to_visitor_and_counts_against_quota() {
        let ctx = context(1);
        let store = MapStore(HashMap::new());
        let resolved = ctx
            .resolve(remote(), Some("junk"), &store)
            .await
            .expect("resolve");
        assert!(resolved.is_visitor());
        let second = ctx.resolve(remote(), Some("junk"), &store).await;
        assert!(matches!(second, Err(ContextError::Throttled(_))));
    }

    #[tokio::test]
    async fn authenticated_requests_do_not_touch_the_limiter() {
        let ctx = context(1);
        let principal = Principal::with_level(Uuid::new_v4(), AccessLevel::Basic);
        let token = issue_token(principal.id, ctx.token_config()).expect("issue");
        let store = MapStore(HashMap::from([(principal.id, principal)]));
        for _ in 0..5 {
            let resolved = ctx
                .resolve(remote(), Some(&token), &store)
                .await
                .expect("resolve");
            assert!(!resolved.is_visitor());
        }
    }
}
