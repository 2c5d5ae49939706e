//! # Credential Session Manager
//!
//! Owns the single bearer token of the process.
//!
//! ## Lifecycle
//! `NO_TOKEN -> AUTHENTICATING -> ACTIVE`. An active token is probed with a
//! keepalive before every hand-out; a rejected probe drops it and the next
//! `get_token` re-runs the two-phase challenge-response. A background task
//! pings the server every 22 s and rotates the token every 18 min.
//!
//! All state changes happen under one async mutex, so concurrent callers
//! wait for the same authentication instead of racing their own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::api::{AuthorizeRequest, VendorApi, VendorError};
use super::signature::{login_signature, rotation_signature};
use crate::configs::{keys, ParamError, Settings};

/// Period of the background keepalive.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(22);
/// Period of the proactive token rotation.
pub const ROTATION_INTERVAL: Duration = Duration::from_secs(1080);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credentials unavailable: {0}")]
    Params(#[from] ParamError),

    #[error("authorize call failed: {0}")]
    Vendor(#[from] VendorError),

    #[error("challenge response lacks {0}")]
    MissingChallenge(&'static str),

    #[error("authorize response carried no token")]
    NoToken,
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    acquired_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn install(&mut self, token: String) {
        self.token = Some(token);
        self.acquired_at = Some(Utc::now());
    }

    fn clear(&mut self) {
        self.token = None;
        self.acquired_at = None;
    }
}

/// Shared session; hand it around as `Arc<SessionManager>`.
pub struct SessionManager {
    api: Arc<dyn VendorApi>,
    settings: Settings,
    state: Mutex<SessionState>,
    keepalive_every: Duration,
    rotate_every: Duration,
}

impl SessionManager {
    pub fn new(api: Arc<dyn VendorApi>, settings: Settings) -> Self {
        Self {
            api,
            settings,
            state: Mutex::new(SessionState::default()),
            keepalive_every: KEEPALIVE_INTERVAL,
            rotate_every: ROTATION_INTERVAL,
        }
    }

    /// Overrides the maintenance periods.
    pub fn with_intervals(mut self, keepalive_every: Duration, rotate_every: Duration) -> Self {
        self.keepalive_every = keepalive_every;
        self.rotate_every = rotate_every;
        self
    }

    /// The token currently held, without probing it.
    pub async fn current_token(&self) -> Option<String> {
        self.state.lock().await.token.clone()
    }

    /// When the current token was obtained.
    pub async fn acquired_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.acquired_at
    }

    /// Returns a live token, authenticating when there is none or the held
    /// one fails its liveness probe.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.token.clone() {
            match self.api.keepalive(&token).await {
                Ok(200) => return Ok(token),
                Ok(status) => warn!(status, "token probe rejected, re-authenticating"),
                Err(e) => warn!(error = %e, "token probe failed, re-authenticating"),
            }
            state.clear();
        }

        let token = self.authenticate().await?;
        state.install(token.clone());
        info!("DSS session established");
        Ok(token)
    }

    /// Two-phase challenge-response login.
    async fn authenticate(&self) -> Result<String, AuthError> {
        let user = self.settings.text(keys::DSS_USER).await?;
        let password = self.settings.text(keys::DSS_PASSWORD).await?;

        // --- Phase 1: challenge ---
        let challenge = self.api.request_challenge(&user).await?;
        let realm = challenge.realm.ok_or(AuthError::MissingChallenge("realm"))?;
        let random_key = challenge
            .random_key
            .ok_or(AuthError::MissingChallenge("randomKey"))?;

        // --- Phase 2: signed exchange ---
        let signature = login_signature(&user, &password, &realm, &random_key);
        let request = AuthorizeRequest::new(
            user,
            signature,
            random_key,
            challenge.publickey.unwrap_or_default(),
        );
        let grant = self.api.exchange(&request).await?;
        grant.into_token().ok_or(AuthError::NoToken)
    }

    /// Best-effort ping; failures are only logged and the token is kept.
    pub async fn keepalive(&self) {
        let Some(token) = self.current_token().await else {
            return;
        };
        match self.api.keepalive(&token).await {
            Ok(200) => debug!("keepalive ok"),
            Ok(status) => warn!(status, "keepalive rejected"),
            Err(e) => warn!(error = %e, "keepalive failed"),
        }
    }

    /// Rotates the token. On any failure the current token stays in place.
    pub async fn update_token(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        let token = state.token.clone()?;

        let secret = match self.settings.text(keys::DSS_ROTATION_SECRET).await {
            Ok(secret) => secret,
            Err(e) => {
                warn!(error = %e, "cannot rotate token");
                return None;
            }
        };

        let signature = rotation_signature(&secret, &token);
        match self.api.update_token(&token, &signature).await {
            Ok(Some(new_token)) => {
                state.install(new_token.clone());
                info!("DSS token rotated");
                Some(new_token)
            }
            Ok(None) => {
                warn!("token rotation returned no token");
                None
            }
            Err(e) => {
                warn!(error = %e, "token rotation failed");
                None
            }
        }
    }

    /// Runs keepalive and rotation on their own tickers until cancelled.
    /// Both tickers fire once immediately.
    pub async fn run_maintenance(self: Arc<Self>, cancel: CancellationToken) {
        let mut keepalive = interval(self.keepalive_every);
        let mut rotation = interval(self.rotate_every);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        rotation.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            keepalive_secs = self.keepalive_every.as_secs(),
            rotation_secs = self.rotate_every.as_secs(),
            "session maintenance started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = keepalive.tick() => self.keepalive().await,
                _ = rotation.tick() => {
                    self.update_token().await;
                }
            }
        }
        info!("session maintenance stopped");
    }

    /// Spawns `run_maintenance` as a detached task.
    pub fn spawn_maintenance(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run_maintenance(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dss::signature::md5_hex;
    use crate::testing::{test_settings, MockVendor};

    fn manager(vendor: &Arc<MockVendor>) -> SessionManager {
        SessionManager::new(vendor.clone(), test_settings())
    }

    #[tokio::test]
    async fn test_first_call_runs_two_phase_login() {
        let vendor = Arc::new(MockVendor::new());
        let session = manager(&vendor);

        let token = session.get_token().await.unwrap();
        assert_eq!(token, "token-1");
        assert_eq!(vendor.challenge_calls(), 1);
        assert_eq!(vendor.exchange_calls(), 1);
        assert_eq!(vendor.keepalive_calls(), 0);
        assert!(session.acquired_at().await.is_some());

        let request = vendor.last_exchange().unwrap();
        assert_eq!(request.user_name, "system");
        assert_eq!(request.public_key, "pk-1");
        assert_eq!(
            request.signature,
            login_signature("system", "secret", "DSS-realm", "rk-1")
        );
    }

    #[tokio::test]
    async fn test_valid_token_is_probed_not_reissued() {
        let vendor = Arc::new(MockVendor::new());
        let session = manager(&vendor);
        session.get_token().await.unwrap();

        let token = session.get_token().await.unwrap();
        assert_eq!(token, "token-1");
        assert_eq!(vendor.keepalive_calls(), 1);
        assert_eq!(vendor.exchange_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_probe_triggers_one_reauthentication() {
        let vendor = Arc::new(MockVendor::new());
        let session = manager(&vendor);
        session.get_token().await.unwrap();

        vendor.set_keepalive_status(401);
        let token = session.get_token().await.unwrap();
        assert_eq!(token, "token-2");
        assert_eq!(vendor.keepalive_calls(), 1);
        assert_eq!(vendor.challenge_calls(), 2);
        assert_eq!(vendor.exchange_calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_realm_yields_no_token() {
        let vendor = Arc::new(MockVendor::new());
        vendor.drop_realm();
        let session = manager(&vendor);

        let err = session.get_token().await.unwrap_err();
        assert!(matches!(err, AuthError::MissingChallenge("realm")));
        assert_eq!(vendor.exchange_calls(), 0);
        assert!(session.current_token().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_login() {
        let vendor = Arc::new(MockVendor::new());
        let session = Arc::new(manager(&vendor));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.get_token().await.unwrap() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "token-1");
        }
        assert_eq!(vendor.exchange_calls(), 1);
    }

    #[tokio::test]
    async fn test_rotation_replaces_token_and_keeps_it_on_failure() {
        let vendor = Arc::new(MockVendor::new());
        let session = manager(&vendor);
        assert!(session.update_token().await.is_none());

        session.get_token().await.unwrap();
        let rotated = session.update_token().await.unwrap();
        assert_eq!(rotated, "rotated-1");
        assert_eq!(
            vendor.last_rotation_signature().unwrap(),
            md5_hex("rotation-secret:token-1")
        );
        assert_eq!(session.current_token().await.as_deref(), Some("rotated-1"));

        vendor.fail_rotation();
        assert!(session.update_token().await.is_none());
        assert_eq!(session.current_token().await.as_deref(), Some("rotated-1"));
    }

    #[tokio::test]
    async fn test_keepalive_failure_keeps_token() {
        let vendor = Arc::new(MockVendor::new());
        let session = manager(&vendor);
        session.keepalive().await;
        assert_eq!(vendor.keepalive_calls(), 0);

        session.get_token().await.unwrap();
        vendor.set_keepalive_status(500);
        session.keepalive().await;
        assert_eq!(session.current_token().await.as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_maintenance_ticks_until_cancelled() {
        let vendor = Arc::new(MockVendor::new());
        let session = Arc::new(
            manager(&vendor).with_intervals(Duration::from_millis(20), Duration::from_secs(3600)),
        );
        session.get_token().await.unwrap();

        let cancel = CancellationToken::new();
        let handle = session.spawn_maintenance(cancel.clone());
        tokio::time::sleep(Duration::from_millis(90)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(vendor.keepalive_calls() >= 2);
        // The rotation ticker fires once on start.
        assert_eq!(vendor.rotation_calls(), 1);
    }
}
