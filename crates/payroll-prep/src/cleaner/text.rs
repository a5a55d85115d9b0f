//! Text normalization for employee records.

/// Title-case a name: the first letter after any non-letter is uppercased,
/// every other letter lowercased.
///
/// `"o'neil SMITH"` becomes `"O'Neil Smith"`.
pub fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut previous_is_letter = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }

    result
}

/// Lowercase an email address.
pub fn normalize_email(value: &str) -> String {
    value.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("john smith"), "John Smith");
        assert_eq!(title_case("JANE DOE"), "Jane Doe");
        assert_eq!(title_case("o'neil smith-jones"), "O'Neil Smith-Jones");
        assert_eq!(title_case("élodie durand"), "Élodie Durand");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_title_case_after_digits() {
        assert_eq!(title_case("agent 007bond"), "Agent 007Bond");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("John.Smith@Example.COM"), "john.smith@example.com");
    }
}
