use std::collections::{HashMap, HashSet};
use regex::{Captures, Regex};
use lazy_static::lazy_static;

lazy_static! {
    /// Matches `{{name}}` where the name does not span lines.
    pub(crate) static ref PLACEHOLDER_MATCH_RE: Regex = Regex::new(r"\{\{([^\r\n]*?)\}\}").unwrap();
}

/// Replaces every placeholder that has a filling value. Placeholders without a value are kept verbatim.
pub(crate) fn replace_all_placeholders(original: &str, mapping: &HashMap<String, Option<String>>) -> String {
    PLACEHOLDER_MATCH_RE
        .replace_all(original, |captures: &Captures| {
            match mapping.get(&captures[1]) {
                Some(Some(value)) => value.clone(),
                _ => captures[0].to_string(),
            }
        })
        .into_owned()
}

pub fn get_placeholders(string: &str) -> HashSet<String> {
    PLACEHOLDER_MATCH_RE.captures_iter(string)
        .map(|captures| captures[1].to_string())
        .collect()
}

#[cfg(test)]
mod string_tests {
    use std::collections::{HashMap, HashSet};
    use super::{get_placeholders, replace_all_placeholders};

    #[test]
    fn test_get_keys() {
        let string = "{{a}}";
        let keys = get_placeholders(string);
        let expect_keys = HashSet::from(["a".to_string()]);
        assert_eq!(expect_keys, keys);

        let string = "{{a\n}}";
        let keys = get_placeholders(string);
        assert_eq!(0, keys.len());

        let string = "{{a}}    {{b}}";
        let keys = get_placeholders(string);
        let expect_keys = HashSet::from(["a".to_string(), "b".to_string()]);
        assert_eq!(expect_keys, keys);

        // single braces such as JSON examples are not placeholders
        let string = r#"respond with {"users": ["Doctor"]}"#;
        assert!(get_placeholders(string).is_empty());
    }

    #[test]
    fn test_replace() {
        let string = "{{a}} and {{b}} and {{a}}";
        let mapping = HashMap::from([
            ("a".to_string(), Some("alice".to_string())),
            ("b".to_string(), Some("bob".to_string())),
        ]);
        assert_eq!("alice and bob and alice", replace_all_placeholders(string, &mapping));
    }

    #[test]
    fn test_replace_does_not_expand_values() {
        let string = "{{a}} then {{b}}";
        let mapping = HashMap::from([
            ("a".to_string(), Some("{{b}}".to_string())),
            ("b".to_string(), Some("bob".to_string())),
        ]);
        assert_eq!("{{b}} then bob", replace_all_placeholders(string, &mapping));
    }

    #[test]
    fn test_unfilled_kept() {
        let mapping = HashMap::from([("a".to_string(), None)]);
        assert_eq!("x {{a}} y", replace_all_placeholders("x {{a}} y", &mapping));
    }
}
