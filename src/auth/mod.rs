mod flow;
pub mod identity;
pub mod login;
pub mod register;

#[cfg(test)]
mod tests;

pub use identity::{
    BoxedIdentityFuture, DASHBOARD_TARGET, IdentityError, IdentityGateway, Navigator, ProviderId,
    ReasonKey, SubmissionOutcome,
};
pub use login::{LoginFlow, LoginModel};
pub use register::{MIN_PASSWORD_CHARS, RegisterFlow, RegisterModel};
