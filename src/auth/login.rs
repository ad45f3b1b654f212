use std::sync::Arc;

use crate::feedback::NoticeManager;
use crate::form::{
    FormController, FormError, FormModel, FormOptions, FormResult, SubmitStatus,
};

use super::flow::FlowCore;
use super::identity::{IdentityGateway, Navigator, ProviderId, ReasonKey};

/// Credential fields of the login form. Validation is left to the host's
/// required-field rendering (the registry below); the flow itself runs no
/// rule engine before calling the gateway.
#[derive(Clone, Debug, Default, Eq, PartialEq, FormModel)]
pub struct LoginModel {
    pub email: String,
    pub password: String,
}

/// Drives the login form: password path, OAuth path, notices and the
/// post-auth redirect.
pub struct LoginFlow<G>
where
    G: IdentityGateway,
{
    controller: FormController<LoginModel, ReasonKey>,
    core: FlowCore<G>,
}

impl<G> LoginFlow<G>
where
    G: IdentityGateway,
{
    pub fn new(
        gateway: Arc<G>,
        notices: NoticeManager,
        navigator: Arc<dyn Navigator>,
    ) -> FormResult<Self> {
        let controller =
            FormController::new(LoginModel::default(), FormOptions::default());
        let fields = LoginModel::fields();
        controller.register_required_field(fields.email())?;
        controller.register_required_field(fields.password())?;

        Ok(Self {
            controller,
            core: FlowCore::new(gateway, notices, navigator, "auth.login"),
        })
    }

    pub fn controller(&self) -> &FormController<LoginModel, ReasonKey> {
        &self.controller
    }

    pub fn status(&self) -> FormResult<SubmitStatus> {
        self.controller.status()
    }

    /// Password sign-in. Exactly one backing operation is in flight per
    /// attempt; a second call while `Submitting` is rejected without
    /// touching the gateway.
    pub async fn submit(&self) -> FormResult<()> {
        self.controller.begin_submit()?;
        let model = self.controller.snapshot()?.model;
        tracing::debug!("login submit issued");

        let result = self
            .core
            .gateway
            .sign_in_with_credentials(&model.email, &model.password)
            .await;
        self.core
            .apply_credential_resolution(&self.controller, result, "welcomeBack")
    }

    /// OAuth sign-in for `provider`. On success the gateway navigates away
    /// and the flow stays `Submitting`; only a raised fault resolves locally.
    pub async fn submit_with_provider(&self, provider: ProviderId) -> FormResult<()> {
        self.controller.begin_submit()?;
        tracing::debug!(%provider, "login provider sign-in issued");

        let result = self
            .core
            .gateway
            .sign_in_with_provider(provider, super::identity::DASHBOARD_TARGET)
            .await;
        self.core.apply_provider_resolution(&self.controller, result)
    }

    /// Marks the flow as gone. Any resolution that fires afterwards is a
    /// no-op, so a form unmounting mid-flight never mutates released state.
    pub fn dispose(&self) {
        self.core.deactivate();
    }

    pub fn is_disposed(&self) -> bool {
        !self.core.is_active()
    }
}

impl<G> LoginFlow<G>
where
    G: IdentityGateway,
{
    /// Convenience used by hosts reacting to a double-click: maps the guard
    /// rejection to a quiet no-op while keeping every other error loud.
    pub async fn submit_ignoring_repeat(&self) -> FormResult<()> {
        match self.submit().await {
            Err(FormError::AlreadySubmitting) => Ok(()),
            other => other,
        }
    }
}
