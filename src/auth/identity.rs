use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::form::ValidationError;

/// Fixed post-auth destination for every flow in this crate.
pub const DASHBOARD_TARGET: &str = "/dashboard";

/// Stable identifier selecting user-facing notification text, independent of
/// display language. The wire values match the translation catalog keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReasonKey {
    InvalidCredentials,
    SomethingWrong,
    NameRequired,
    EmailRequired,
    PasswordTooShort,
    PasswordMismatch,
    AcceptTermsRequired,
}

impl ReasonKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            ReasonKey::InvalidCredentials => "invalidCredentials",
            ReasonKey::SomethingWrong => "somethingWrong",
            ReasonKey::NameRequired => "nameRequired",
            ReasonKey::EmailRequired => "emailRequired",
            ReasonKey::PasswordTooShort => "passwordTooShort",
            ReasonKey::PasswordMismatch => "passwordMismatch",
            ReasonKey::AcceptTermsRequired => "acceptTermsRequired",
        }
    }
}

impl Display for ReasonKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidationError for ReasonKey {
    fn message(&self) -> String {
        self.as_str().to_string()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderId {
    Github,
    Google,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProviderId::Github => "github",
            ProviderId::Google => "google",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a backing identity operation. Created by the gateway, consumed
/// exactly once by the flow that issued the call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmissionOutcome {
    /// The operation accepted the credentials. `redirect` overrides the
    /// default post-auth destination when present.
    Success { redirect: Option<String> },
    /// The operation ran but rejected the attempt (e.g. bad credentials).
    Failure { reason: ReasonKey },
}

/// Raised fault from a backing identity operation: transport failure,
/// provider misconfiguration or anything else that kept the operation from
/// resolving. Never shown to the host as-is.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IdentityError {
    Transport(String),
    Misconfigured(String),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::Transport(detail) => write!(f, "identity transport failure: {detail}"),
            IdentityError::Misconfigured(detail) => {
                write!(f, "identity provider misconfigured: {detail}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

pub type BoxedIdentityFuture<T> =
    Pin<Box<dyn Future<Output = Result<T, IdentityError>> + Send + 'static>>;

/// External backing identity operations. Implementations are expected to
/// resolve with [`SubmissionOutcome::Failure`] for invalid credentials and
/// reserve `Err` for transport-level faults.
pub trait IdentityGateway: Send + Sync + 'static {
    fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> BoxedIdentityFuture<SubmissionOutcome>;

    /// Redirect-based provider sign-in. On success the gateway performs a
    /// full navigation away, so the caller never observes a local success.
    fn sign_in_with_provider(
        &self,
        provider: ProviderId,
        redirect_target: &str,
    ) -> BoxedIdentityFuture<()>;
}

/// Navigation side effect performed after a successful credential sign-in.
pub trait Navigator: Send + Sync + 'static {
    fn go(&self, target: &str);
}
