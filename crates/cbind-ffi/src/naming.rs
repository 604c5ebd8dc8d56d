//! Identifier case helpers.

/// `foo_Bar` for `Foo_Bar`. Only an ASCII first letter changes.
pub fn lower_case_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `Foo_bar` for `foo_bar`. Only an ASCII first letter changes.
pub fn upper_case_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Strip `prefix` (when present) and lower-case the first letter.
pub fn host_name(c_name: &str, prefix: &str) -> String {
    let stripped = c_name.strip_prefix(prefix).unwrap_or(c_name);
    if stripped.is_empty() {
        return lower_case_first(c_name);
    }
    lower_case_first(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_only_the_first_letter() {
        assert_eq!(lower_case_first("Dgemm"), "dgemm");
        assert_eq!(lower_case_first("ABC"), "aBC");
        assert_eq!(upper_case_first("scale_vec"), "Scale_vec");
        assert_eq!(upper_case_first(""), "");
        assert_eq!(lower_case_first("émile"), "émile");
    }

    #[test]
    fn host_name_strips_prefix() {
        assert_eq!(host_name("cblas_Dgemm", "cblas_"), "dgemm");
        assert_eq!(host_name("Dgemm", "cblas_"), "dgemm");
        assert_eq!(host_name("Run", ""), "run");
        assert_eq!(host_name("cblas_", "cblas_"), "cblas_");
    }
}
