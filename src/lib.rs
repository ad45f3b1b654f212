pub mod auth;
pub mod feedback;
pub mod form;
pub mod i18n;
pub mod util;

pub use auth::{LoginFlow, RegisterFlow};
pub use feedback::{Notice, NoticeKind, NoticeManager};
pub use form::{FormController, SubmitStatus};
pub use i18n::Translator;
