use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::feedback::{Notice, NoticeManager};
use crate::form::{FormResult, ValidationError};

use super::identity::{
    DASHBOARD_TARGET, IdentityError, IdentityGateway, Navigator, ReasonKey, SubmissionOutcome,
};

/// Collaborators shared by the login and register flows, plus the liveness
/// flag that guards resolutions arriving after the host form went away.
pub(super) struct FlowCore<G> {
    pub(super) gateway: Arc<G>,
    pub(super) notices: NoticeManager,
    pub(super) navigator: Arc<dyn Navigator>,
    pub(super) namespace: &'static str,
    active: AtomicBool,
}

impl<G> FlowCore<G>
where
    G: IdentityGateway,
{
    pub(super) fn new(
        gateway: Arc<G>,
        notices: NoticeManager,
        navigator: Arc<dyn Navigator>,
        namespace: &'static str,
    ) -> Self {
        Self {
            gateway,
            notices,
            navigator,
            namespace,
            active: AtomicBool::new(true),
        }
    }

    pub(super) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(super) fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub(super) fn notify_error(&self, reason: ReasonKey) {
        self.notices.show(Notice::error(
            format!("{}.error", self.namespace),
            format!("{}.{}", self.namespace, reason.as_str()),
        ));
    }

    pub(super) fn notify_success(&self, message: &str) {
        self.notices.show(Notice::success(
            format!("{}.success", self.namespace),
            format!("{}.{message}", self.namespace),
        ));
    }

    /// Translates a credential resolution into exactly one notice and one
    /// status transition on `controller`. Resolutions against a disposed
    /// flow are dropped without touching any state.
    pub(super) fn apply_credential_resolution<T, E>(
        &self,
        controller: &crate::form::FormController<T, E>,
        result: Result<SubmissionOutcome, IdentityError>,
        success_message: &str,
    ) -> FormResult<()>
    where
        T: Clone + Send + Sync + 'static,
        E: ValidationError,
    {
        if !self.is_active() {
            tracing::debug!(
                namespace = self.namespace,
                "credential resolution for disposed flow dropped"
            );
            return Ok(());
        }

        match result {
            Ok(SubmissionOutcome::Success { redirect }) => {
                controller.resolve_submit(true)?;
                self.notify_success(success_message);
                let target = redirect.as_deref().unwrap_or(DASHBOARD_TARGET);
                tracing::debug!(namespace = self.namespace, target, "sign-in succeeded");
                self.navigator.go(target);
            }
            Ok(SubmissionOutcome::Failure { reason }) => {
                controller.resolve_submit(false)?;
                tracing::debug!(namespace = self.namespace, %reason, "sign-in rejected");
                self.notify_error(reason);
            }
            Err(error) => {
                controller.resolve_submit(false)?;
                tracing::warn!(namespace = self.namespace, %error, "sign-in raised");
                self.notify_error(ReasonKey::SomethingWrong);
            }
        }
        Ok(())
    }

    /// Provider sign-in is fire-and-forget on success: the gateway navigates
    /// the whole page away, so only the raising case is observable here.
    pub(super) fn apply_provider_resolution<T, E>(
        &self,
        controller: &crate::form::FormController<T, E>,
        result: Result<(), IdentityError>,
    ) -> FormResult<()>
    where
        T: Clone + Send + Sync + 'static,
        E: ValidationError,
    {
        if !self.is_active() {
            tracing::debug!(
                namespace = self.namespace,
                "provider resolution for disposed flow dropped"
            );
            return Ok(());
        }

        if let Err(error) = result {
            controller.resolve_submit(false)?;
            tracing::warn!(namespace = self.namespace, %error, "provider sign-in raised");
            self.notify_error(ReasonKey::SomethingWrong);
        }
        Ok(())
    }
}
