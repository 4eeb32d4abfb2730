use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FIRST_CAP: Regex = Regex::new("([a-z0-9])([A-Z])").unwrap();
    static ref ALL_CAP:   Regex = Regex::new("([A-Z])([A-Z][a-z])").unwrap();
}

/// Converts a string to snake_case.
/// Consecutive uppercase letters stay together, so acronyms remain intact
/// (e.g. "sessionID" becomes "session_id", "HTTPServer" becomes "http_server").
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::with_capacity(s.len() + 4);
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_lower = i + 1 < chars.len() && chars[i + 1].is_lowercase();
                if prev != '_' && (!prev.is_uppercase() || next_lower) {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// The `ENUM_NAME_` token protobuf style guides prefix enum values with,
/// derived from the enum's CamelCase name (`HTTPMethod` → `HTTP_METHOD_`).
pub fn enum_value_prefix(enum_name: &str) -> String {
    let snake = FIRST_CAP.replace_all(enum_name, "${1}_${2}");
    let snake = ALL_CAP.replace_all(&snake, "${1}_${2}");
    format!("{}_", snake.to_uppercase())
}

/// Flattens a nested declaration into one identifier: the full name minus
/// the package, with dots replaced (`pkg.Outer.Inner` → `Outer_Inner`).
pub fn flatten_type_name(full_name: &str, package: &str) -> String {
    let local = if package.is_empty() {
        full_name
    } else {
        full_name
            .strip_prefix(package)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(full_name)
    };
    local.replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_keeps_acronyms() {
        assert_eq!(to_snake_case("firstName"), "first_name");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("Camel_Case"), "camel_case");
    }

    #[test]
    fn enum_prefixes() {
        assert_eq!(enum_value_prefix("Status"), "STATUS_");
        assert_eq!(enum_value_prefix("NestedEnum"), "NESTED_ENUM_");
        assert_eq!(enum_value_prefix("HTTPMethod"), "HTTP_METHOD_");
        assert_eq!(enum_value_prefix("Ipv4Kind"), "IPV4_KIND_");
    }

    #[test]
    fn flattened_names() {
        assert_eq!(flatten_type_name("api.v1.Foo.Bar", "api.v1"), "Foo_Bar");
        assert_eq!(flatten_type_name("Foo.Bar", ""), "Foo_Bar");
    }
}
