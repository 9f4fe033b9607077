//! Policy orchestrator: the fixed pipeline every privileged request runs.
//!
//! Stages run in order and stop at the first rejection:
//! 1. Source address allow-list
//! 2. Role validation
//! 3. Resource ownership (when a conversation is named)
//! 4. Rate limit
//! 5. Input sanitization (when the operation carries text)
//!
//! The wrapped operation only runs after every stage passes. Exactly one
//! audit record is written per request, carrying the last state reached.

use crate::audit::OPERATIONAL_TARGET;
use crate::{
    AccessValidator, AuditRecorder, IpGate, RateLimiter, Sanitizer, SecurityError,
    SecurityErrorKind, SecurityResult, WardenConfig,
};
use derive_getters::Getters;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use warden_core::{
    AuditAction, AuditOutcome, AuditRecord, Operation, Principal, RequestContext, RequestState,
    SanitizationResult,
};
use warden_interface::{AuditSink, ConversationStore, IdentityOracle};

/// Longest pause between idle-eviction sweeps.
const MAX_JANITOR_INTERVAL_SECS: u64 = 60;

/// One privileged request as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct PrivilegedRequest {
    /// Who is calling and from where
    context: RequestContext,
    /// What is being attempted
    operation: Operation,
    /// Conversation the request touches
    resource_id: Option<String>,
    /// Free text to sanitize before execution
    input: Option<String>,
}

impl PrivilegedRequest {
    /// Create a request with no resource and no input.
    pub fn new(context: RequestContext, operation: Operation) -> Self {
        Self {
            context,
            operation,
            resource_id: None,
            input: None,
        }
    }

    /// Name the conversation the request touches.
    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Attach free text input.
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }
}

/// What the wrapped operation receives once every check has passed.
#[derive(Debug, Clone, Getters)]
pub struct Admitted {
    /// The resolved, elevated principal
    principal: Principal,
    /// Sanitized input, if the request carried any
    input: Option<String>,
}

impl Admitted {
    /// Split into principal and sanitized input.
    pub fn into_parts(self) -> (Principal, Option<String>) {
        (self.principal, self.input)
    }
}

/// Tracks one request through the pipeline and writes its audit record.
///
/// If dropped before settling (the request future was cancelled), an ERROR
/// record is written on a spawned task.
struct AuditTrail {
    recorder: Arc<AuditRecorder>,
    principal_id: String,
    operation: Operation,
    resource_id: Option<String>,
    source_ip: String,
    user_agent: String,
    state: RequestState,
    input_flagged: bool,
    sanitizer_detail: String,
    started: Instant,
    settled: bool,
}

impl AuditTrail {
    fn new(recorder: Arc<AuditRecorder>, request: &PrivilegedRequest) -> Self {
        Self {
            recorder,
            principal_id: request.context.principal_id().clone(),
            operation: request.operation,
            resource_id: request.resource_id.clone(),
            source_ip: request.context.source_ip().clone(),
            user_agent: request.context.user_agent().clone(),
            state: RequestState::Received,
            input_flagged: false,
            sanitizer_detail: String::new(),
            started: Instant::now(),
            settled: false,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    fn note_sanitization(&mut self, result: &SanitizationResult) {
        self.input_flagged = result.flagged();
        if result.flagged() {
            let kinds: Vec<String> = result
                .findings()
                .iter()
                .map(|finding| finding.kind().to_string())
                .collect();
            self.sanitizer_detail = format!("input sanitized: {}", kinds.join(", "));
        }
    }

    fn compose(
        &self,
        action: AuditAction,
        outcome: AuditOutcome,
        detail: String,
    ) -> Option<AuditRecord> {
        let mut builder = AuditRecord::builder();
        builder
            .principal_id(self.principal_id.clone())
            .action(action)
            .outcome(outcome)
            .final_state(self.state)
            .detail(detail)
            .source_ip(self.source_ip.clone())
            .user_agent(self.user_agent.clone())
            .input_flagged(self.input_flagged)
            .duration_ms(self.started.elapsed().as_millis() as u64);
        if let Some(resource_id) = &self.resource_id {
            builder.resource_id(resource_id.clone());
        }

        match builder.build() {
            Ok(record) => Some(record),
            Err(e) => {
                error!(
                    target: OPERATIONAL_TARGET,
                    principal_id = %self.principal_id,
                    action = %action,
                    error = %e,
                    "Could not assemble audit record"
                );
                None
            }
        }
    }

    /// Write the single record for this request.
    async fn settle(mut self, action: AuditAction, outcome: AuditOutcome, detail: String) {
        self.settled = true;
        let Some(record) = self.compose(action, outcome, detail) else {
            return;
        };
        if let Err(e) = self.recorder.record_detached(record).await {
            error!(target: OPERATIONAL_TARGET, error = %e, "Audit task failed");
        }
    }

    /// Record a policy rejection and hand the error back.
    async fn reject(self, action: AuditAction, error: SecurityError) -> SecurityError {
        warn!(
            action = %action,
            state = %self.state,
            reason = %error.kind(),
            "Request rejected"
        );
        self.settle(action, AuditOutcome::Failure, error.kind().to_string())
            .await;
        error
    }

    async fn succeed(mut self) {
        self.advance(RequestState::Succeeded);
        let detail = std::mem::take(&mut self.sanitizer_detail);
        let action = self.operation.success_action();
        self.settle(action, AuditOutcome::Success, detail).await;
    }

    async fn fail(mut self, error: &SecurityError) {
        self.advance(RequestState::Failed);
        let action = self.operation.error_action();
        self.settle(action, AuditOutcome::Error, error.kind().to_string())
            .await;
    }
}

impl Drop for AuditTrail {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        warn!(state = %self.state, "Request cancelled before completion");
        let detail = format!("request cancelled in state {}", self.state);
        let Some(record) = self.compose(self.operation.error_action(), AuditOutcome::Error, detail)
        else {
            return;
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            drop(self.recorder.record_detached(record));
        } else {
            error!(
                target: OPERATIONAL_TARGET,
                principal_id = %self.principal_id,
                record_id = %record.id(),
                "No runtime available to record cancelled request"
            );
        }
    }
}

/// Runs privileged operations through the policy pipeline.
pub struct PolicyOrchestrator {
    ip_gate: IpGate,
    validator: AccessValidator,
    rate_limiter: Arc<RateLimiter>,
    sanitizer: Sanitizer,
    recorder: Arc<AuditRecorder>,
}

impl PolicyOrchestrator {
    /// Create an orchestrator from its components.
    pub fn new(
        ip_gate: IpGate,
        validator: AccessValidator,
        rate_limiter: Arc<RateLimiter>,
        sanitizer: Sanitizer,
        recorder: Arc<AuditRecorder>,
    ) -> Self {
        Self {
            ip_gate,
            validator,
            rate_limiter,
            sanitizer,
            recorder,
        }
    }

    /// Wire every component from configuration and collaborators.
    ///
    /// Inside a tokio runtime this also starts the idle-eviction janitor,
    /// which runs until the rate limiter is dropped.
    pub fn from_config(
        config: &WardenConfig,
        identity: Arc<dyn IdentityOracle>,
        conversations: Arc<dyn ConversationStore>,
        sink: Arc<dyn AuditSink>,
    ) -> SecurityResult<Self> {
        config.validate().map_err(|e| {
            SecurityError::new(SecurityErrorKind::Configuration(e.to_string()))
        })?;

        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit().clone()));
        if tokio::runtime::Handle::try_current().is_ok() {
            let interval = (*config.rate_limit().idle_ttl_secs()).min(MAX_JANITOR_INTERVAL_SECS);
            rate_limiter.spawn_janitor(Duration::from_secs(interval));
        } else {
            warn!("No tokio runtime, idle rate limit entries will not be evicted");
        }

        Ok(Self::new(
            IpGate::from_config(config.ip_whitelist())?,
            AccessValidator::new(identity, conversations),
            rate_limiter,
            Sanitizer::new(config.sanitizer()),
            Arc::new(AuditRecorder::new(sink)),
        ))
    }

    /// The audit recorder.
    pub fn recorder(&self) -> &Arc<AuditRecorder> {
        &self.recorder
    }

    /// The rate limiter.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// The access validator.
    pub fn validator(&self) -> &AccessValidator {
        &self.validator
    }

    /// The sanitizer.
    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Run `work` if the request passes every policy stage.
    ///
    /// Policy rejections are audited as FAILURE and returned as the
    /// specific error kind. Errors from `work` are audited as ERROR and
    /// returned as [`SecurityErrorKind::UpstreamExecution`].
    #[instrument(
        skip(self, request, work),
        fields(
            principal_id = %request.context().principal_id(),
            operation = %request.operation()
        )
    )]
    pub async fn execute<T, E, F, Fut>(&self, request: PrivilegedRequest, work: F) -> SecurityResult<T>
    where
        F: FnOnce(Admitted) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        info!("Starting policy pipeline");
        let mut trail = AuditTrail::new(Arc::clone(&self.recorder), &request);
        let PrivilegedRequest {
            context,
            operation,
            resource_id,
            input,
        } = request;

        debug!("Stage 1: Checking source address");
        if let Err(e) = self.ip_gate.check(context.source_ip()) {
            return Err(trail.reject(AuditAction::IpRejected, e).await);
        }
        trail.advance(RequestState::IpChecked);

        debug!("Stage 2: Validating role");
        let principal = match self.validator.resolve_elevated(context.principal_id()).await {
            Ok(principal) => principal,
            Err(e) => return Err(trail.reject(AuditAction::RoleValidationFailed, e).await),
        };
        trail.advance(RequestState::RoleChecked);

        debug!("Stage 3: Checking resource access");
        match resource_id.as_deref() {
            Some(resource) => {
                if let Err(e) = self.validator.check_ownership(&principal, resource).await {
                    return Err(trail.reject(AuditAction::AccessDenied, e).await);
                }
            }
            None if operation.requires_resource() => {
                let e = SecurityError::new(SecurityErrorKind::ResourceAccessDenied {
                    principal_id: context.principal_id().clone(),
                    resource: String::new(),
                    reason: format!("{} requires a conversation id", operation),
                });
                return Err(trail.reject(AuditAction::AccessDenied, e).await);
            }
            None => debug!("No resource named"),
        }
        trail.advance(RequestState::ResourceChecked);

        debug!("Stage 4: Checking rate limit");
        if let Err(e) = self.rate_limiter.admit(context.principal_id()) {
            return Err(trail.reject(AuditAction::RateLimitExceeded, e).await);
        }
        trail.advance(RequestState::RateChecked);

        debug!("Stage 5: Sanitizing input");
        let input = match input {
            Some(_) if !operation.carries_input() => {
                debug!("Operation carries no input, discarding it");
                None
            }
            Some(raw) => {
                let result = self.sanitizer.sanitize(&raw);
                trail.note_sanitization(&result);
                if result.is_rejected() {
                    let mut kinds: Vec<String> = Vec::new();
                    for finding in result.injection_findings() {
                        let kind = finding.kind().to_string();
                        if !kinds.contains(&kind) {
                            kinds.push(kind);
                        }
                    }
                    let reason = kinds.join(", ");
                    let e = SecurityError::new(SecurityErrorKind::SanitizationFlagged { reason });
                    return Err(trail.reject(AuditAction::ChatBlocked, e).await);
                }
                Some(result.into_text())
            }
            None => None,
        };
        trail.advance(RequestState::Sanitized);

        trail.advance(RequestState::Executing);
        info!("Policy checks passed, executing operation");
        match work(Admitted { principal, input }).await {
            Ok(value) => {
                trail.succeed().await;
                info!("Request succeeded");
                Ok(value)
            }
            Err(e) => {
                let error = SecurityError::new(SecurityErrorKind::UpstreamExecution(e.to_string()));
                warn!(error = %e, "Operation failed");
                trail.fail(&error).await;
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for PolicyOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyOrchestrator")
            .field("ip_gate", &self.ip_gate)
            .field("rate_limiter", &self.rate_limiter)
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}
