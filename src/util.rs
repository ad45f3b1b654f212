/// Lowercase, strip everything but alphanumerics/spaces/hyphens, collapse
/// whitespace runs into single hyphens.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut output = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !output.is_empty() {
                output.push('-');
            }
            pending_hyphen = false;
            output.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        }
    }

    output
}

pub fn truncate(input: &str, length: usize) -> String {
    if input.chars().count() > length {
        let kept: String = input.chars().take(length).collect();
        format!("{kept}...")
    } else {
        input.to_string()
    }
}

pub fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Up to two uppercase initials from a display name, for avatar fallbacks.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

/// Light-weight shape check: one `@`, non-empty local part, a dot in the
/// domain. Not a deliverability guarantee.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && !tld.is_empty()
        && !domain.chars().any(|ch| ch.is_whitespace() || ch == '@')
}
