#[allow(dead_code)]
#[derive(Clone, authflow::form::FormModel)]
struct TupleForm(String, bool);

fn main() {}
