use authflow::form::{FieldLens, FormModel};

#[derive(Clone, authflow::form::FormModel)]
struct CredentialsForm {
    email: String,
    accept_terms: bool,
}

fn main() {
    let fields = CredentialsForm::fields();
    let lens = fields.email();
    let mut model = CredentialsForm {
        email: "a@example.com".to_string(),
        accept_terms: false,
    };
    lens.set(&mut model, "b@example.com".to_string());
    assert_eq!(lens.key().as_str(), "email");
    assert_eq!(lens.get(&model), "b@example.com");
    assert_eq!(fields.accept_terms().key().as_str(), "accept_terms");
}
