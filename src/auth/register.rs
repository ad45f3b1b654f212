use std::sync::Arc;

use crate::feedback::NoticeManager;
use crate::form::{
    FieldKey, FormController, FormError, FormModel, FormOptions, FormResult, FormSnapshot,
    SubmitStatus,
};

use super::flow::FlowCore;
use super::identity::{IdentityGateway, Navigator, ProviderId, ReasonKey};

pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Clone, Debug, Default, Eq, PartialEq, FormModel)]
pub struct RegisterModel {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accept_terms: bool,
}

/// Rule order for the registration form. Validation is short-circuit: when
/// several rules fail at once, only the first one in this order is reported.
/// Field-key sort order must never decide which reason the user sees.
const RULE_ORDER: [FieldKey; 5] = [
    FieldKey::new("name"),
    FieldKey::new("email"),
    FieldKey::new("password"),
    FieldKey::new("confirm_password"),
    FieldKey::new("accept_terms"),
];

/// Drives the registration form: the five-rule validator, the credential
/// sign-in that follows a successful registration, and the OAuth path.
pub struct RegisterFlow<G>
where
    G: IdentityGateway,
{
    controller: FormController<RegisterModel, ReasonKey>,
    core: FlowCore<G>,
}

impl<G> RegisterFlow<G>
where
    G: IdentityGateway,
{
    pub fn new(
        gateway: Arc<G>,
        notices: NoticeManager,
        navigator: Arc<dyn Navigator>,
    ) -> FormResult<Self> {
        let controller =
            FormController::new(RegisterModel::default(), FormOptions::default());
        let fields = RegisterModel::fields();

        controller.register_field_validator(
            fields.name(),
            |_model: &RegisterModel, value: &String| {
                if value.trim().is_empty() {
                    Err(ReasonKey::NameRequired)
                } else {
                    Ok(())
                }
            },
        )?;
        controller.register_field_validator(
            fields.email(),
            |_model: &RegisterModel, value: &String| {
                if value.trim().is_empty() {
                    Err(ReasonKey::EmailRequired)
                } else {
                    Ok(())
                }
            },
        )?;
        controller.register_field_validator(
            fields.password(),
            |_model: &RegisterModel, value: &String| {
                if value.chars().count() < MIN_PASSWORD_CHARS {
                    Err(ReasonKey::PasswordTooShort)
                } else {
                    Ok(())
                }
            },
        )?;
        controller.register_field_validator(
            fields.confirm_password(),
            |model: &RegisterModel, value: &String| {
                if value != &model.password {
                    Err(ReasonKey::PasswordMismatch)
                } else {
                    Ok(())
                }
            },
        )?;
        controller.register_field_validator(
            fields.accept_terms(),
            |_model: &RegisterModel, value: &bool| {
                if *value {
                    Ok(())
                } else {
                    Err(ReasonKey::AcceptTermsRequired)
                }
            },
        )?;

        // Editing the password invalidates a previously-accepted confirmation.
        controller.register_dependency(fields.password(), fields.confirm_password())?;

        controller.register_required_field(fields.name())?;
        controller.register_required_field(fields.email())?;
        controller.register_required_field(fields.password())?;
        controller.register_required_field(fields.confirm_password())?;

        Ok(Self {
            controller,
            core: FlowCore::new(gateway, notices, navigator, "auth.register"),
        })
    }

    pub fn controller(&self) -> &FormController<RegisterModel, ReasonKey> {
        &self.controller
    }

    pub fn status(&self) -> FormResult<SubmitStatus> {
        self.controller.status()
    }

    /// Registration submit. Runs the five rules first; on rejection the
    /// gateway is never invoked, exactly one notice carries the first
    /// violated rule, and the machine settles back on `Idle`.
    pub async fn submit(&self) -> FormResult<()> {
        if self.controller.status()? == SubmitStatus::Submitting {
            return Err(FormError::AlreadySubmitting);
        }

        if !self.controller.validate_form()? {
            let snapshot = self.controller.snapshot()?;
            let reason = first_violation(&snapshot).unwrap_or(ReasonKey::SomethingWrong);
            self.controller.reject_submit()?;
            tracing::debug!(%reason, "register submit rejected by validation");
            self.core.notify_error(reason);
            return Ok(());
        }

        self.controller.begin_submit()?;
        let model = self.controller.snapshot()?.model;
        tracing::debug!("register submit issued");

        let result = self
            .core
            .gateway
            .sign_in_with_credentials(&model.email, &model.password)
            .await;
        self.core
            .apply_credential_resolution(&self.controller, result, "accountCreated")
    }

    pub async fn submit_with_provider(&self, provider: ProviderId) -> FormResult<()> {
        self.controller.begin_submit()?;
        tracing::debug!(%provider, "register provider sign-in issued");

        let result = self
            .core
            .gateway
            .sign_in_with_provider(provider, super::identity::DASHBOARD_TARGET)
            .await;
        self.core.apply_provider_resolution(&self.controller, result)
    }

    pub fn dispose(&self) {
        self.core.deactivate();
    }

    pub fn is_disposed(&self) -> bool {
        !self.core.is_active()
    }
}

/// First violated rule in the fixed order, independent of field-key sort
/// order.
fn first_violation(snapshot: &FormSnapshot<RegisterModel, ReasonKey>) -> Option<ReasonKey> {
    RULE_ORDER.iter().find_map(|key| {
        snapshot
            .field_meta
            .get(key)
            .and_then(|meta| meta.errors.first().copied())
    })
}
