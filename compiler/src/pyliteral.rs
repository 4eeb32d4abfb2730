use protoc_gen_pydantic_schema::OptionValue;

use std::fmt::Write;

fn escape_into(out: &mut String, s: &str, quote: char) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Python string literal for `s`. Double-quoted unless `s` contains double
/// quotes but no single quotes, in which case single quotes avoid escaping.
pub fn py_quote(s: &str) -> String {
    if s.contains('"') && !s.contains('\'') {
        return py_quote_single(s);
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    escape_into(&mut out, s, '"');
    out.push('"');
    out
}

/// Always single-quoted; used inside double-quoted annotation strings.
pub fn py_quote_single(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    escape_into(&mut out, s, '\'');
    out.push('\'');
    out
}

pub fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Python float literal: always carries a decimal point or exponent.
pub fn py_float(f: f64) -> String {
    if f.is_nan() {
        return "float(\"nan\")".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "float(\"inf\")".to_string() } else { "float(\"-inf\")".to_string() };
    }
    let s = format!("{}", f);
    if s.contains('.') || s.contains('e') {
        s
    } else {
        format!("{}.0", s)
    }
}

pub fn py_bytes(bytes: &[u8]) -> String {
    let mut out = String::from("b\"");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push('"');
    out
}

/// Renders a custom option value. Lists become tuples and maps become
/// read-only `_MappingProxyType` views so the generated metadata cannot be
/// mutated at runtime.
pub fn option_literal(value: &OptionValue) -> String {
    match value {
        OptionValue::Unset => "None".to_string(),
        OptionValue::Bool(b) => py_bool(*b).to_string(),
        OptionValue::Int(i) => i.to_string(),
        OptionValue::UInt(u) => u.to_string(),
        OptionValue::Float(f) => py_float(*f),
        OptionValue::Str(s) => py_quote(s),
        OptionValue::Bytes(b) => py_bytes(b),
        OptionValue::List(items) => {
            let inner: Vec<String> = items.iter().map(option_literal).collect();
            match inner.len() {
                1 => format!("({},)", inner[0]),
                _ => format!("({})", inner.join(", ")),
            }
        }
        OptionValue::Map(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", py_quote(k), option_literal(v)))
                .collect();
            format!("_MappingProxyType({{{}}})", inner.join(", "))
        }
    }
}

/// Renders a value for `json_schema_extra`, which expects plain JSON-like
/// containers rather than read-only views.
pub fn json_literal(value: &OptionValue) -> String {
    match value {
        OptionValue::List(items) => {
            let inner: Vec<String> = items.iter().map(json_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        OptionValue::Map(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", py_quote(k), json_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        scalar => option_literal(scalar),
    }
}

/// True when [option_literal] output needs `_MappingProxyType` in scope.
pub fn uses_mapping_proxy(value: &OptionValue) -> bool {
    match value {
        OptionValue::Map(_) => true,
        OptionValue::List(items) => items.iter().any(uses_mapping_proxy),
        _ => false,
    }
}

/// Escapes text for a triple-quoted docstring.
pub fn docstring_line(s: &str) -> String {
    s.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}
