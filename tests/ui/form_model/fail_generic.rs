#[allow(dead_code)]
#[derive(Clone, authflow::form::FormModel)]
struct GenericForm<T> {
    value: T,
}

fn main() {}
