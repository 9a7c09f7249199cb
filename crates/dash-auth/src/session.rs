//! Authentication session: authorization handshake and valid-token access
//!
//! One session per process, shared as `Arc<AuthSession>`. Token state and the
//! pending handshake sit behind one mutex; refreshes are serialized through a
//! second "gate" mutex that also remembers the last refresh outcome, so
//! callers that queued behind an in-flight refresh reuse its result instead
//! of spending the refresh token again.

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::account::{self, AccountIdentity};
use crate::constants::{AUTHORIZATION_TTL, AppCredentials, Endpoints, REFRESH_MARGIN};
use crate::credentials::{TokenRecord, TokenStore, now_millis};
use crate::error::{Error, Result};
use crate::{pkce, token};

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    AuthorizationPending,
    Authenticated,
    Expired,
}

/// An issued authorization URL and the state nonce embedded in it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

struct PendingAuthorization {
    verifier: String,
    state: String,
    created_at: Instant,
}

enum Handshake {
    NotStarted,
    Pending(PendingAuthorization),
    Completed,
}

struct Inner {
    token: Option<TokenRecord>,
    handshake: Handshake,
    /// Bumped on every refresh attempt and every token install.
    generation: u64,
}

struct RefreshOutcome {
    generation: u64,
    result: Result<String>,
}

pub struct AuthSession {
    http: reqwest::Client,
    endpoints: Endpoints,
    app: Option<AppCredentials>,
    store: TokenStore,
    inner: Mutex<Inner>,
    refresh_gate: Mutex<Option<RefreshOutcome>>,
}

impl AuthSession {
    /// Create an unauthenticated session. Call [`initialize`](Self::initialize)
    /// to pick up a stored token.
    pub fn new(
        http: reqwest::Client,
        endpoints: Endpoints,
        app: Option<AppCredentials>,
        store: TokenStore,
    ) -> Self {
        Self {
            http,
            endpoints,
            app,
            store,
            inner: Mutex::new(Inner {
                token: None,
                handshake: Handshake::NotStarted,
                generation: 0,
            }),
            refresh_gate: Mutex::new(None),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Hydrate from the token store.
    ///
    /// An expired record is kept as-is and refreshed on first use. An
    /// unreadable record is logged and ignored.
    pub async fn initialize(&self) -> SessionState {
        match self.store.load().await {
            Ok(Some(record)) => {
                let mut inner = self.inner.lock().await;
                inner.token = Some(record);
                inner.generation += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "stored token unreadable, starting unauthenticated");
            }
        }
        let state = self.state().await;
        info!(state = ?state, "auth session initialized");
        state
    }

    pub async fn state(&self) -> SessionState {
        let inner = self.inner.lock().await;
        match (&inner.token, &inner.handshake) {
            (Some(record), _) if record.is_expired_at(now_millis()) => SessionState::Expired,
            (Some(_), _) => SessionState::Authenticated,
            (None, Handshake::Pending(_)) => SessionState::AuthorizationPending,
            (None, _) => SessionState::Unauthenticated,
        }
    }

    fn app_credentials(&self) -> Result<&AppCredentials> {
        self.app.as_ref().ok_or_else(|| {
            Error::Config("Dropbox app credentials missing; set APP_KEY (and APP_SECRET for confidential apps)".into())
        })
    }

    /// Start an authorization: fresh PKCE verifier, challenge and state nonce.
    ///
    /// Replaces any earlier pending authorization, so a code obtained from an
    /// older URL no longer matches.
    pub async fn authorization_url(&self) -> Result<AuthorizationRequest> {
        let app = self.app_credentials()?;

        let verifier = pkce::generate_verifier();
        let challenge = pkce::compute_challenge(&verifier);
        let state = pkce::generate_state();
        let url = pkce::build_authorization_url(
            &self.endpoints.authorize_url,
            &app.client_id,
            &state,
            &challenge,
        )?;

        let mut inner = self.inner.lock().await;
        if matches!(inner.handshake, Handshake::Pending(_)) {
            debug!("replacing pending authorization");
        }
        inner.handshake = Handshake::Pending(PendingAuthorization {
            verifier,
            state: state.clone(),
            created_at: Instant::now(),
        });
        info!("authorization URL issued");

        Ok(AuthorizationRequest { url, state })
    }

    /// Redeem an authorization code against the pending authorization.
    ///
    /// Handshake errors are reported before any network call. A failed
    /// exchange keeps the pending authorization so the user can retry with a
    /// fresh code from the same URL.
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> Result<AccountIdentity> {
        let app = self.app_credentials()?;

        let (verifier, pending_state) = {
            let inner = self.inner.lock().await;
            match &inner.handshake {
                Handshake::NotStarted => return Err(Error::NoPendingAuthorization),
                Handshake::Completed => return Err(Error::AuthorizationAlreadyCompleted),
                Handshake::Pending(pending) => {
                    if pending.created_at.elapsed() >= AUTHORIZATION_TTL {
                        return Err(Error::AuthorizationExpired);
                    }
                    if let Some(supplied) = state
                        && supplied != pending.state
                    {
                        return Err(Error::StateMismatch);
                    }
                    (pending.verifier.clone(), pending.state.clone())
                }
            }
        };

        let response =
            token::exchange_code(&self.http, &self.endpoints, app, code, &verifier).await?;
        let record = response.into_record(None, None, now_millis());
        let access_token = record.access_token.clone();
        let account_id = record.account_id.clone();

        let persisted = self.store.save(&record).await;

        {
            let mut inner = self.inner.lock().await;
            inner.token = Some(record);
            inner.generation += 1;
            if matches!(&inner.handshake, Handshake::Pending(p) if p.state == pending_state) {
                inner.handshake = Handshake::Completed;
            }
        }

        if let Err(e) = persisted {
            warn!(error = %e, "authorized but failed to persist token");
            return Err(e);
        }
        info!(account_id = ?account_id, "authorization completed");

        match account::fetch_current_account(&self.http, &self.endpoints, &access_token).await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                warn!(error = %e, "account lookup failed after authorization");
                Ok(AccountIdentity::unresolved(account_id))
            }
        }
    }

    /// Return a usable access token, refreshing it first if it has expired
    /// or expires within the refresh margin.
    pub async fn access_token(&self) -> Result<String> {
        let observed = match self.fresh_token().await? {
            Fresh::Token(token) => return Ok(token),
            Fresh::Stale { generation, .. } => generation,
        };

        let mut gate = self.refresh_gate.lock().await;
        if let Some(outcome) = gate.as_ref()
            && outcome.generation > observed
        {
            debug!("reusing concurrent refresh outcome");
            return outcome.result.clone();
        }

        // The token may have been replaced while waiting for the gate
        let current = match self.fresh_token().await? {
            Fresh::Token(token) => return Ok(token),
            Fresh::Stale { record, .. } => record,
        };

        let (generation, result) = self.refresh(current).await;
        *gate = Some(RefreshOutcome {
            generation,
            result: result.clone(),
        });
        result
    }

    /// Mark `rejected` as expired after the API answered 401 for it.
    ///
    /// No-op if the session already holds a different token.
    pub async fn invalidate_access_token(&self, rejected: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.token.as_mut()
            && record.access_token == rejected
        {
            record.expires_at = Some(0);
            debug!("access token invalidated after rejection");
        }
    }

    async fn fresh_token(&self) -> Result<Fresh> {
        let inner = self.inner.lock().await;
        match &inner.token {
            None => Err(Error::AuthRequired(
                "not authenticated with Dropbox".into(),
            )),
            Some(record)
                if !record.needs_refresh_at(now_millis(), REFRESH_MARGIN.as_millis() as u64) =>
            {
                Ok(Fresh::Token(record.access_token.clone()))
            }
            Some(record) => Ok(Fresh::Stale {
                record: record.clone(),
                generation: inner.generation,
            }),
        }
    }

    /// Run one refresh against the token endpoint and apply the result.
    ///
    /// Returns the generation assigned to this attempt.
    async fn refresh(&self, current: TokenRecord) -> (u64, Result<String>) {
        let attempt = match (&current.refresh_token, self.app_credentials()) {
            (None, _) => Err(Error::AuthRequired(
                "stored token has expired and has no refresh token".into(),
            )),
            (Some(_), Err(e)) => Err(e),
            (Some(refresh), Ok(app)) => {
                token::refresh_token(&self.http, &self.endpoints, app, refresh)
                    .await
                    .map(|response| {
                        response.into_record(
                            current.refresh_token.clone(),
                            current.account_id.clone(),
                            now_millis(),
                        )
                    })
            }
        };

        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        let generation = inner.generation;
        let replaced = inner
            .token
            .as_ref()
            .is_some_and(|t| t.access_token != current.access_token);

        match attempt {
            Ok(_) if replaced => {
                debug!("token replaced during refresh, discarding refreshed token");
                let token = inner
                    .token
                    .as_ref()
                    .map(|t| t.access_token.clone())
                    .ok_or_else(|| Error::AuthRequired("not authenticated with Dropbox".into()));
                (generation, token)
            }
            Ok(record) => {
                let token = record.access_token.clone();
                inner.token = Some(record.clone());
                drop(inner);

                info!("access token refreshed");
                if let Err(e) = self.store.save(&record).await {
                    warn!(error = %e, "failed to persist refreshed token");
                }
                (generation, Ok(token))
            }
            Err(Error::InvalidCredentials(msg)) | Err(Error::AuthRequired(msg)) => {
                if !replaced {
                    inner.token = None;
                }
                warn!(reason = %msg, "refresh not possible, re-authorization required");
                (generation, Err(Error::AuthRequired(msg)))
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                (generation, Err(e))
            }
        }
    }
}

enum Fresh {
    Token(String),
    Stale { record: TokenRecord, generation: u64 },
}
