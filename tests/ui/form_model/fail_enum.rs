#[allow(dead_code)]
#[derive(Clone, authflow::form::FormModel)]
enum ChoiceForm {
    Email,
    Password,
}

fn main() {}
