use std::borrow::Cow;

/// Quotes a string so a POSIX shell reads it back as a single word
pub fn quote(s: &str) -> Cow<'_, str> {
    if s.is_empty() {
        return Cow::Borrowed("''");
    }

    if s.chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c))
    {
        return Cow::Borrowed(s);
    }

    Cow::Owned(format!("'{}'", s.replace('\'', r#"'"'"'"#)))
}

/// Whether `name` is a portable environment variable name, i.e. `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();

    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
