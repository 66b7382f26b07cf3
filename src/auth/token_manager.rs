//! Single-flight access token refresh
//!
//! At most one refresh call is in flight at a time. A request that hits an
//! expired access token while a refresh is running is parked in a queue and
//! resumed with the outcome of that same refresh.

use crate::api::client::{ApiFailure, RequestConfig};
use crate::auth::error::{parse_auth_error, should_logout, AuthError, AuthErrorCode};
use crate::auth::navigator::Navigator;
use crate::auth::refresh::{RefreshError, RefreshResponse, RefreshTokenFn};
use crate::error::AppError;
use crate::routes;
use crate::session::SessionRepository;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::mem;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

type RefreshOutcome = Result<RefreshResponse, RefreshError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Whether a refresh is currently in flight
enum RefreshState {
    Idle,
    /// Callers may await the shared outcome of the running refresh
    Refreshing(SharedRefresh),
}

/// A request waiting for the running refresh to settle
struct PendingRequest {
    config: RequestConfig,
    responder: oneshot::Sender<Result<RequestConfig, RefreshError>>,
}

struct RefreshSlot {
    state: RefreshState,
    pending: Vec<PendingRequest>,
}

impl RefreshSlot {
    /// Back to idle, handing out everything that queued during the refresh.
    /// Both happen under one lock so no request can queue after the drain.
    fn settle(&mut self) -> Vec<PendingRequest> {
        self.state = RefreshState::Idle;
        mem::take(&mut self.pending)
    }
}

/// Ends the session: clears it and sends the user to the login route
#[derive(Clone)]
pub struct LogoutHandler {
    sessions: Arc<dyn SessionRepository>,
    navigator: Arc<dyn Navigator>,
}

impl LogoutHandler {
    pub fn new(sessions: Arc<dyn SessionRepository>, navigator: Arc<dyn Navigator>) -> Self {
        Self { sessions, navigator }
    }

    pub fn handle_logout(&self, auth_error: Option<&AuthError>) {
        warn!(code = ?auth_error.map(|e| e.code), "Ending session");
        if let Err(e) = self.sessions.clear() {
            warn!("Failed to clear session: {}", e);
        }

        let current = self.navigator.current_path();
        let pathname = current.split('?').next().unwrap_or_default();
        if pathname == routes::LOGIN {
            return;
        }

        self.navigator.redirect(&routes::login_with_redirect(&current));

        if auth_error.map(|e| e.code) == Some(AuthErrorCode::RefreshTokenRevoked) {
            self.navigator.notify(SESSION_EXPIRED_MESSAGE);
        }
    }
}

/// Coordinates access token refreshes for every request of a client
pub struct TokenManager {
    slot: Arc<Mutex<RefreshSlot>>,
    refresh_fn: RwLock<Option<Arc<dyn RefreshTokenFn>>>,
    sessions: Arc<dyn SessionRepository>,
    logout: LogoutHandler,
    refresh_timeout: Duration,
}

enum Ticket {
    /// This caller started the refresh
    Owner(SharedRefresh, RequestConfig),
    /// Another caller's refresh is running
    Queued(oneshot::Receiver<Result<RequestConfig, RefreshError>>),
}

impl TokenManager {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        navigator: Arc<dyn Navigator>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            slot: Arc::new(Mutex::new(RefreshSlot {
                state: RefreshState::Idle,
                pending: Vec::new(),
            })),
            refresh_fn: RwLock::new(None),
            logout: LogoutHandler::new(Arc::clone(&sessions), navigator),
            sessions,
            refresh_timeout,
        }
    }

    /// Inject the function that performs the refresh call
    pub fn initialize(&self, refresh_fn: Arc<dyn RefreshTokenFn>) {
        *self.refresh_fn.write().unwrap_or_else(PoisonError::into_inner) = Some(refresh_fn);
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self.lock_slot().state, RefreshState::Refreshing(_))
    }

    /// Number of requests waiting on the running refresh
    pub fn pending_len(&self) -> usize {
        self.lock_slot().pending.len()
    }

    pub fn handle_logout(&self, auth_error: Option<&AuthError>) {
        self.logout.handle_logout(auth_error);
    }

    /// Recover a request that failed with 401.
    ///
    /// Resolves with `config` carrying a fresh bearer token, ready to be sent
    /// again. Fails with the original error when the failure ends the session,
    /// or with the refresh error when the refresh did not succeed.
    pub async fn handle_401_error(
        &self,
        failure: &ApiFailure,
        config: RequestConfig,
    ) -> Result<RequestConfig, AppError> {
        let auth_error = parse_auth_error(failure);
        if should_logout(auth_error.as_ref()) {
            self.handle_logout(auth_error.as_ref());
            return Err(AppError::Http(failure.clone()));
        }

        let ticket = {
            let mut slot = self.lock_slot();
            if matches!(slot.state, RefreshState::Refreshing(_)) {
                let (responder, receiver) = oneshot::channel();
                slot.pending.push(PendingRequest { config, responder });
                debug!(queue_size = slot.pending.len(), "Request queued behind token refresh");
                Ticket::Queued(receiver)
            } else {
                let refresh_fn = self.injected_refresh_fn()?;
                Ticket::Owner(self.begin_refresh(&mut slot, refresh_fn), config)
            }
        };

        match ticket {
            Ticket::Owner(refresh, mut config) => {
                let response = refresh.await?;
                config.set_bearer(&response.token);
                Ok(config)
            }
            Ticket::Queued(receiver) => match receiver.await {
                Ok(result) => result.map_err(AppError::from),
                Err(_) => Err(AppError::Refresh(RefreshError::Aborted)),
            },
        }
    }

    /// Refresh now, or join the refresh already in flight
    pub async fn refresh(&self) -> Result<RefreshResponse, AppError> {
        let refresh = self.refresh_token()?;
        refresh.await.map_err(AppError::from)
    }

    fn refresh_token(&self) -> Result<SharedRefresh, AppError> {
        let mut slot = self.lock_slot();
        if let RefreshState::Refreshing(running) = &slot.state {
            return Ok(running.clone());
        }
        let refresh_fn = self.injected_refresh_fn()?;
        Ok(self.begin_refresh(&mut slot, refresh_fn))
    }

    fn injected_refresh_fn(&self) -> Result<Arc<dyn RefreshTokenFn>, AppError> {
        self.refresh_fn
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(AppError::Uninitialized("call initialize() before refreshing tokens"))
    }

    /// Start a refresh on its own task and mark the slot as refreshing.
    ///
    /// The task settles the slot itself, so queued requests are released even
    /// if every caller awaiting the shared outcome goes away.
    fn begin_refresh(
        &self,
        slot: &mut RefreshSlot,
        refresh_fn: Arc<dyn RefreshTokenFn>,
    ) -> SharedRefresh {
        let shared_slot = Arc::clone(&self.slot);
        let sessions = Arc::clone(&self.sessions);
        let logout = self.logout.clone();
        let timeout = self.refresh_timeout;

        info!("Token refresh started");
        let task = tokio::spawn(async move {
            let outcome = run_refresh(refresh_fn, timeout).await;

            match &outcome {
                Ok(response) => {
                    info!("Token refresh succeeded");
                    if let Some(session) = sessions.current() {
                        if let Err(e) = sessions.set(session.with_token(&response.token)) {
                            warn!("Failed to store refreshed token: {}", e);
                        }
                    }
                }
                Err(e) => {
                    error!("Token refresh failed: {}", e);
                    // A 401 from the refresh endpoint ends the session whatever
                    // its code; `should_logout` is not consulted here
                    if e.is_unauthorized() {
                        let auth_error = match e {
                            RefreshError::Rejected(failure) => parse_auth_error(failure),
                            _ => None,
                        };
                        logout.handle_logout(auth_error.as_ref());
                    }
                }
            }

            let pending = shared_slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .settle();
            release(pending, &outcome);
            outcome
        });

        let shared = async move { task.await.unwrap_or(Err(RefreshError::Aborted)) }
            .boxed()
            .shared();
        slot.state = RefreshState::Refreshing(shared.clone());
        shared
    }

    fn lock_slot(&self) -> MutexGuard<'_, RefreshSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_refresh(refresh_fn: Arc<dyn RefreshTokenFn>, timeout: Duration) -> RefreshOutcome {
    let call = AssertUnwindSafe(tokio::time::timeout(timeout, refresh_fn.refresh())).catch_unwind();
    match call.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err(RefreshError::TimedOut(timeout)),
        Err(_) => Err(RefreshError::Aborted),
    }
}

/// Resume every queued request with the refresh outcome, in queue order
fn release(pending: Vec<PendingRequest>, outcome: &RefreshOutcome) {
    if !pending.is_empty() {
        debug!(count = pending.len(), success = outcome.is_ok(), "Releasing queued requests");
    }
    for PendingRequest { mut config, responder } in pending {
        let result = match outcome {
            Ok(response) => {
                config.set_bearer(&response.token);
                Ok(config)
            }
            Err(e) => Err(e.clone()),
        };
        // The waiting caller may have gone away
        let _ = responder.send(result);
    }
}
