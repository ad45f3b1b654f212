mod controller;
mod draft;
mod validation;


pub use authflow_form_derive::FormModel;
pub use controller::{
    FieldKey, FieldMeta, FormController, FormError, FormId, FormOptions, FormResult, FormSnapshot,
    RevalidateMode, SubmitStatus, ValidationMode, ValidationTicket,
};
pub use draft::{FormDraftStore, InMemoryDraftStore};
pub use validation::{
    AsyncFieldValidator, BoxedValidationFuture, FieldLens, FieldValidator, FormModel,
    FormValidator, ValidationError,
};
