//! Constraint translator.
//!
//! Rules are read from the `buf.validate.field` extension into
//! [ConstraintRule]s when the IR is built, and translated into Pydantic
//! primitives here. A rule with no native equivalent is recorded as
//! unsupported so the emitter can leave a comment next to the field.

use prost_reflect::{DynamicMessage, ExtensionDescriptor, ReflectMessage, Value};
use protoc_gen_pydantic_schema::{ConstraintRule, FieldDescriptor, FieldShape, RuleValue, ScalarKind, TypeRef};

use crate::options::widen_f32;
use crate::pyliteral::{py_bool, py_float, py_quote, py_quote_single};
use crate::runtime::RuntimeSymbol;

pub const FIELD_RULES_EXTENSION: &str = "buf.validate.field";

/// Flattens the rules set on a field's options. Type-specific rules keep the
/// name of the family sub-message they came from (`string`, `int64`, ...).
pub fn read_rules(rules_ext: Option<&ExtensionDescriptor>, options: &DynamicMessage) -> Vec<ConstraintRule> {
    let Some(ext) = rules_ext else {
        return Vec::new();
    };
    if !options.has_extension(ext) {
        return Vec::new();
    }
    let value = options.get_extension(ext);
    let Value::Message(rules) = value.as_ref() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (field, value) in rules.fields() {
        match value {
            Value::Message(family) if field.containing_oneof().is_some() => {
                for (rule, raw) in family.fields() {
                    out.push(ConstraintRule {
                        family: Some(field.name().to_string()),
                        name:   rule.name().to_string(),
                        value:  rule_value(raw),
                    });
                }
            }
            _ => out.push(ConstraintRule {
                family: None,
                name:   field.name().to_string(),
                value:  rule_value(value),
            }),
        }
    }
    out
}

fn rule_value(value: &Value) -> RuleValue {
    match value {
        Value::Bool(b) => RuleValue::Bool(*b),
        Value::I32(i) => RuleValue::Int(*i as i64),
        Value::I64(i) => RuleValue::Int(*i),
        Value::U32(u) => RuleValue::UInt(*u as u64),
        Value::U64(u) => RuleValue::UInt(*u),
        Value::F32(f) => RuleValue::Float(widen_f32(*f)),
        Value::F64(f) => RuleValue::Float(*f),
        Value::String(s) => RuleValue::Str(s.clone()),
        Value::Bytes(b) => RuleValue::Bytes(b.to_vec()),
        Value::EnumNumber(n) => RuleValue::Enum(*n),
        Value::List(items) => RuleValue::List(items.iter().map(rule_value).collect()),
        Value::Message(msg) => RuleValue::Message(msg.descriptor().full_name().to_string()),
        Value::Map(_) => RuleValue::List(Vec::new()),
    }
}

/// Whether a rule made it into generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub name:      String,
    pub supported: bool,
}

/// Native constraints for one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    pub ge:            Option<String>,
    pub gt:            Option<String>,
    pub le:            Option<String>,
    pub lt:            Option<String>,
    pub min_length:    Option<u64>,
    pub max_length:    Option<u64>,
    pub pattern:       Option<String>,
    pub examples:      Vec<String>,
    /// Literal for `_Literal[...]`; strings are single-quoted.
    pub const_literal: Option<String>,
    /// Value compared by `_make_const_validator` when `Literal` can't hold it.
    pub const_value:   Option<String>,
    /// Default implied by a `const` rule.
    pub const_default: Option<String>,
    pub in_values:     Vec<String>,
    pub not_in_values: Vec<String>,
    pub unique:        bool,
    pub finite:        bool,
    pub format:        Option<RuntimeSymbol>,
    pub outcomes:      Vec<RuleOutcome>,
}

impl Translation {
    /// Keyword arguments for `_Field(...)`, in a fixed order.
    pub fn field_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(v) = &self.ge {
            args.push(format!("ge={}", v));
        }
        if let Some(v) = &self.gt {
            args.push(format!("gt={}", v));
        }
        if let Some(v) = &self.le {
            args.push(format!("le={}", v));
        }
        if let Some(v) = &self.lt {
            args.push(format!("lt={}", v));
        }
        if let Some(n) = self.min_length {
            args.push(format!("min_length={}", n));
        }
        if let Some(n) = self.max_length {
            args.push(format!("max_length={}", n));
        }
        if let Some(p) = &self.pattern {
            args.push(format!("pattern={}", py_quote(p)));
        }
        if !self.examples.is_empty() {
            args.push(format!("examples=[{}]", self.examples.join(", ")));
        }
        args
    }

    /// `_AfterValidator(...)` expressions to wrap the field type with.
    pub fn validators(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.in_values.is_empty() {
            out.push(format!(
                "_AfterValidator(_make_in_validator(frozenset({{{}}})))",
                self.in_values.join(", ")
            ));
        }
        if !self.not_in_values.is_empty() {
            out.push(format!(
                "_AfterValidator(_make_not_in_validator(frozenset({{{}}})))",
                self.not_in_values.join(", ")
            ));
        }
        if self.unique {
            out.push("_AfterValidator(_require_unique)".to_string());
        }
        if let Some(format) = self.format {
            out.push(format!("_AfterValidator({})", format.name()));
        }
        if self.finite {
            out.push("_AfterValidator(_require_finite)".to_string());
        }
        if let Some(value) = &self.const_value {
            out.push(format!("_AfterValidator(_make_const_validator({}))", value));
        }
        out
    }

    pub fn runtime_symbols(&self) -> Vec<RuntimeSymbol> {
        let mut out = Vec::new();
        if !self.in_values.is_empty() {
            out.push(RuntimeSymbol::MakeInValidator);
        }
        if !self.not_in_values.is_empty() {
            out.push(RuntimeSymbol::MakeNotInValidator);
        }
        if self.unique {
            out.push(RuntimeSymbol::RequireUnique);
        }
        if let Some(format) = self.format {
            out.push(format);
        }
        if self.finite {
            out.push(RuntimeSymbol::RequireFinite);
        }
        if self.const_value.is_some() {
            out.push(RuntimeSymbol::MakeConstValidator);
        }
        out
    }

    /// Names of untranslated rules, sorted and deduplicated.
    pub fn dropped(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .outcomes
            .iter()
            .filter(|o| !o.supported)
            .map(|o| o.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Whether the proto zero value of `field` passes these constraints. A
    /// non-nullable field whose zero would be rejected gets no default.
    pub fn admits_zero(&self, field: &FieldDescriptor) -> bool {
        if self.const_default.is_some() {
            return true;
        }
        match (&field.shape, &field.ty) {
            (FieldShape::Repeated | FieldShape::Map { .. }, _) => self.min_length.unwrap_or(0) == 0,
            (_, TypeRef::Scalar(ScalarKind::String)) => {
                self.min_length.unwrap_or(0) == 0
                    && self.pattern.as_deref().map(matches_empty).unwrap_or(true)
                    && self.admits_literal("''")
            }
            (_, TypeRef::Scalar(ScalarKind::Bytes)) => self.min_length.unwrap_or(0) == 0,
            (_, TypeRef::Scalar(ScalarKind::Bool)) => self.admits_literal("False"),
            (_, TypeRef::Scalar(_)) => {
                let holds = |bound: &Option<String>, accepts: fn(f64) -> bool| match bound {
                    Some(b) => b.parse::<f64>().map(accepts).unwrap_or(false),
                    None => true,
                };
                holds(&self.gt, |b| 0.0 > b)
                    && holds(&self.ge, |b| 0.0 >= b)
                    && holds(&self.lt, |b| 0.0 < b)
                    && holds(&self.le, |b| 0.0 <= b)
                    && self.admits_numeric_zero()
            }
            _ => true,
        }
    }

    fn admits_literal(&self, zero: &str) -> bool {
        (self.in_values.is_empty() || self.in_values.iter().any(|v| v == zero))
            && !self.not_in_values.iter().any(|v| v == zero)
    }

    fn admits_numeric_zero(&self) -> bool {
        let is_zero = |v: &String| v.parse::<f64>().map(|f| f == 0.0).unwrap_or(false);
        (self.in_values.is_empty() || self.in_values.iter().any(is_zero)) && !self.not_in_values.iter().any(is_zero)
    }

    fn record(&mut self, name: &str, supported: bool) {
        self.outcomes.push(RuleOutcome { name: name.to_string(), supported });
    }

    fn mark_unsupported(&mut self, name: &str) {
        for outcome in self.outcomes.iter_mut().filter(|o| o.name == name) {
            outcome.supported = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i128),
    Float(f64),
}

impl Num {
    fn literal(self) -> String {
        match self {
            Num::Int(i) => i.to_string(),
            Num::Float(f) => py_float(f),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

/// Reads a numeric rule value. 64-bit bounds may arrive as decimal strings.
fn numeric(value: &RuleValue, float: bool) -> Option<Num> {
    let num = match value {
        RuleValue::Int(i) => Num::Int(*i as i128),
        RuleValue::UInt(u) => Num::Int(*u as i128),
        RuleValue::Enum(n) => Num::Int(*n as i128),
        RuleValue::Float(f) => Num::Float(*f),
        RuleValue::Str(s) if float => Num::Float(s.trim().parse().ok()?),
        RuleValue::Str(s) => Num::Int(s.trim().parse().ok()?),
        _ => return None,
    };
    Some(match num {
        Num::Int(i) if float => Num::Float(i as f64),
        other => other,
    })
}

fn length(value: &RuleValue) -> Option<u64> {
    match value {
        RuleValue::UInt(u) => Some(*u),
        RuleValue::Int(i) => u64::try_from(*i).ok(),
        RuleValue::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_list(value: &RuleValue) -> &[RuleValue] {
    match value {
        RuleValue::List(items) => items,
        other => std::slice::from_ref(other),
    }
}

/// Literal usable inside a double-quoted annotation string.
fn annotation_literal(value: &RuleValue, float: bool) -> Option<String> {
    match value {
        RuleValue::Str(s) => Some(py_quote_single(s)),
        RuleValue::Bool(b) => Some(py_bool(*b).to_string()),
        RuleValue::Float(f) if f.is_finite() => Some(py_float(*f)),
        RuleValue::Int(_) | RuleValue::UInt(_) => numeric(value, float).map(Num::literal),
        _ => None,
    }
}

fn example_literal(value: &RuleValue) -> Option<String> {
    match value {
        RuleValue::Str(s) => Some(py_quote(s)),
        RuleValue::Bool(b) => Some(py_bool(*b).to_string()),
        RuleValue::Float(f) => Some(py_float(*f)),
        RuleValue::Int(i) => Some(i.to_string()),
        RuleValue::UInt(u) => Some(u.to_string()),
        RuleValue::Enum(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_of(field: &FieldDescriptor) -> Option<ScalarKind> {
    match field.ty {
        TypeRef::Scalar(kind) => Some(kind),
        _ => None,
    }
}

/// Translates every rule on `field`.
pub fn translate(field: &FieldDescriptor) -> Translation {
    let mut t = Translation::default();
    let scalar = scalar_of(field);
    let mut prefix = None;
    let mut suffix = None;
    let mut contains = None;

    for rule in &field.rules {
        let name = rule.name.as_str();
        if rule.value == RuleValue::Bool(false) && name != "const" {
            continue;
        }
        let family = rule.family.as_deref();
        let float = matches!(family, Some("float" | "double"))
            || scalar.map(ScalarKind::is_float).unwrap_or(false);

        let supported = match (family, name) {
            (None, _) => false,
            (Some("duration" | "timestamp" | "any"), _) => false,
            (_, "gt" | "gte" | "lt" | "lte") => match numeric(&rule.value, float) {
                Some(num) => {
                    let slot = match name {
                        "gt" => &mut t.gt,
                        "gte" => &mut t.ge,
                        "lt" => &mut t.lt,
                        _ => &mut t.le,
                    };
                    *slot = Some(num.literal());
                    true
                }
                None => false,
            },
            (Some("string" | "bytes"), "min_len") | (Some("repeated"), "min_items") | (Some("map"), "min_pairs") => {
                match length(&rule.value) {
                    Some(n) => {
                        t.min_length = Some(n);
                        true
                    }
                    None => false,
                }
            }
            (Some("string" | "bytes"), "max_len") | (Some("repeated"), "max_items") | (Some("map"), "max_pairs") => {
                match length(&rule.value) {
                    Some(n) => {
                        t.max_length = Some(n);
                        true
                    }
                    None => false,
                }
            }
            (Some("string" | "bytes"), "len") => match length(&rule.value) {
                Some(n) => {
                    t.min_length = Some(n);
                    t.max_length = Some(n);
                    true
                }
                None => false,
            },
            (Some("string"), "pattern") => match &rule.value {
                RuleValue::Str(p) => {
                    t.pattern = Some(p.clone());
                    true
                }
                _ => false,
            },
            (Some("string"), "prefix" | "suffix" | "contains") => match &rule.value {
                RuleValue::Str(s) => {
                    let slot = match name {
                        "prefix" => &mut prefix,
                        "suffix" => &mut suffix,
                        _ => &mut contains,
                    };
                    *slot = Some(s.clone());
                    true
                }
                _ => false,
            },
            (_, "example") => {
                let rendered: Vec<String> = as_list(&rule.value).iter().filter_map(example_literal).collect();
                let any = !rendered.is_empty();
                t.examples.extend(rendered);
                any
            }
            (Some(family), "const") => translate_const(&mut t, family, &rule.value, scalar),
            (Some(family), "in" | "not_in") if family != "enum" => {
                let items: Option<Vec<String>> = as_list(&rule.value)
                    .iter()
                    .map(|v| annotation_literal(v, float))
                    .collect();
                match items {
                    Some(items) if !items.is_empty() => {
                        if name == "in" {
                            t.in_values.extend(items);
                        } else {
                            t.not_in_values.extend(items);
                        }
                        true
                    }
                    _ => false,
                }
            }
            (Some("repeated"), "unique") => {
                let hashable = matches!(field.ty, TypeRef::Scalar(_) | TypeRef::Enum(_));
                t.unique = hashable && field.shape == FieldShape::Repeated;
                t.unique
            }
            (Some("float" | "double"), "finite") => {
                t.finite = true;
                true
            }
            (Some("string"), format) => match RuntimeSymbol::format_validator(format) {
                Some(symbol) => {
                    t.format = Some(symbol);
                    true
                }
                None => false,
            },
            _ => false,
        };
        t.record(name, supported);
    }

    combine_patterns(&mut t, prefix, suffix, contains);
    drop_inverted_range(&mut t, field);
    t
}

fn translate_const(t: &mut Translation, family: &str, value: &RuleValue, scalar: Option<ScalarKind>) -> bool {
    match (family, value) {
        ("string", RuleValue::Str(s)) => {
            t.const_literal = Some(py_quote_single(s));
            t.const_default = Some(py_quote(s));
            true
        }
        ("bool", RuleValue::Bool(b)) => {
            t.const_literal = Some(py_bool(*b).to_string());
            t.const_default = Some(py_bool(*b).to_string());
            true
        }
        ("float" | "double", _) => match numeric(value, true) {
            Some(num) if num.as_f64().is_finite() => {
                t.const_value = Some(num.literal());
                t.const_default = Some(num.literal());
                true
            }
            _ => false,
        },
        ("enum" | "bytes", _) => false,
        (_, _) => match numeric(value, false) {
            // 64-bit fields keep their string codec, so compare instead of
            // narrowing the type to a Literal.
            Some(num) if scalar.map(ScalarKind::is_64bit).unwrap_or(false) => {
                t.const_value = Some(num.literal());
                t.const_default = Some(num.literal());
                true
            }
            Some(num) => {
                t.const_literal = Some(num.literal());
                t.const_default = Some(num.literal());
                true
            }
            None => false,
        },
    }
}

/// Folds `prefix`/`suffix`/`contains` into one pattern. An explicit pattern
/// wins and the affix rules stay documented but unenforced.
fn combine_patterns(t: &mut Translation, prefix: Option<String>, suffix: Option<String>, contains: Option<String>) {
    if prefix.is_none() && suffix.is_none() && contains.is_none() {
        return;
    }
    if t.pattern.is_some() {
        for (name, value) in [("prefix", &prefix), ("suffix", &suffix), ("contains", &contains)] {
            if value.is_some() {
                t.mark_unsupported(name);
            }
        }
        return;
    }
    let pattern = match (&prefix, &suffix) {
        (Some(p), Some(s)) => Some(format!("^{}.*{}$", regex::escape(p), regex::escape(s))),
        (Some(p), None) => Some(format!("^{}", regex::escape(p))),
        (None, Some(s)) => Some(format!("{}$", regex::escape(s))),
        (None, None) => None,
    };
    match pattern {
        Some(pattern) => {
            t.pattern = Some(pattern);
            if contains.is_some() {
                t.mark_unsupported("contains");
            }
        }
        None => t.pattern = contains.as_deref().map(regex::escape),
    }
}

/// Patterns the regex engine can't compile count as rejecting `""`.
fn matches_empty(pattern: &str) -> bool {
    regex::Regex::new(pattern).map(|re| re.is_match("")).unwrap_or(false)
}

/// A lower bound above the upper bound means "outside the range", which
/// `ge`/`le` cannot express.
fn drop_inverted_range(t: &mut Translation, field: &FieldDescriptor) {
    let bound = |name: &str| {
        field
            .rules
            .iter()
            .rev()
            .find(|r| r.name == name && r.family.is_some())
            .and_then(|r| numeric(&r.value, true))
            .map(Num::as_f64)
    };
    let lower = if t.gt.is_some() { bound("gt") } else if t.ge.is_some() { bound("gte") } else { None };
    let upper = if t.lt.is_some() { bound("lt") } else if t.le.is_some() { bound("lte") } else { None };

    if let (Some(lower), Some(upper)) = (lower, upper) {
        if lower > upper {
            for name in ["gt", "gte", "lt", "lte"] {
                t.mark_unsupported(name);
            }
            t.gt = None;
            t.ge = None;
            t.lt = None;
            t.le = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use protoc_gen_pydantic_schema::{Docs, OptionBag};

    fn rule(family: &str, name: &str, value: RuleValue) -> ConstraintRule {
        ConstraintRule { family: Some(family.to_string()), name: name.to_string(), value }
    }

    fn field(ty: TypeRef, shape: FieldShape, rules: Vec<ConstraintRule>) -> FieldDescriptor {
        FieldDescriptor {
            name: "f".to_string(),
            json_name: "f".to_string(),
            number: 1,
            ty,
            shape,
            oneof: None,
            docs: Docs::default(),
            deprecated: false,
            rules,
            options: OptionBag::default(),
        }
    }

    fn string_field(rules: Vec<ConstraintRule>) -> FieldDescriptor {
        field(TypeRef::Scalar(ScalarKind::String), FieldShape::Singular, rules)
    }

    #[test]
    fn numeric_bounds() {
        let f = field(
            TypeRef::Scalar(ScalarKind::Int32),
            FieldShape::Singular,
            vec![rule("int32", "gt", RuleValue::Int(0)), rule("int32", "lte", RuleValue::Int(150))],
        );
        let t = translate(&f);
        assert_eq!(t.field_args(), vec!["gt=0", "le=150"]);
        assert!(t.dropped().is_empty());
    }

    #[test]
    fn zero_must_satisfy_bounds_to_stay_the_default() {
        let int_field = |rules| field(TypeRef::Scalar(ScalarKind::Int32), FieldShape::Singular, rules);
        let f = int_field(vec![rule("int32", "gt", RuleValue::Int(0))]);
        assert!(!translate(&f).admits_zero(&f));
        let f = int_field(vec![rule("int32", "gte", RuleValue::Int(-5)), rule("int32", "lt", RuleValue::Int(5))]);
        assert!(translate(&f).admits_zero(&f));
        let f = int_field(vec![rule("int32", "const", RuleValue::Int(7))]);
        assert!(translate(&f).admits_zero(&f));

        let f = string_field(vec![rule("string", "min_len", RuleValue::UInt(1))]);
        assert!(!translate(&f).admits_zero(&f));
        let f = string_field(vec![rule("string", "pattern", RuleValue::Str("^[a-z]+$".to_string()))]);
        assert!(!translate(&f).admits_zero(&f));
        let f = string_field(vec![rule("string", "pattern", RuleValue::Str("^[a-z]*$".to_string()))]);
        assert!(translate(&f).admits_zero(&f));
        let f = string_field(vec![rule("string", "email", RuleValue::Bool(true))]);
        assert!(translate(&f).admits_zero(&f));
    }

    #[test]
    fn string_encoded_64bit_bounds_are_parsed() {
        let f = field(
            TypeRef::Scalar(ScalarKind::Int64),
            FieldShape::Singular,
            vec![rule("int64", "gte", RuleValue::Str("-9000000000".to_string()))],
        );
        assert_eq!(translate(&f).field_args(), vec!["ge=-9000000000"]);
    }

    #[test]
    fn float_bounds_render_as_floats() {
        let f = field(
            TypeRef::Scalar(ScalarKind::Double),
            FieldShape::Singular,
            vec![rule("double", "gte", RuleValue::Float(0.0)), rule("double", "lt", RuleValue::Float(1.5))],
        );
        assert_eq!(translate(&f).field_args(), vec!["ge=0.0", "lt=1.5"]);
    }

    #[test]
    fn inverted_range_is_not_translated() {
        let f = field(
            TypeRef::Scalar(ScalarKind::Int32),
            FieldShape::Singular,
            vec![rule("int32", "gt", RuleValue::Int(10)), rule("int32", "lt", RuleValue::Int(5))],
        );
        let t = translate(&f);
        assert!(t.field_args().is_empty());
        assert_eq!(t.dropped(), vec!["gt", "lt"]);
    }

    #[test]
    fn explicit_pattern_beats_prefix() {
        let t = translate(&string_field(vec![
            rule("string", "pattern", RuleValue::Str("^[a-z]+$".to_string())),
            rule("string", "prefix", RuleValue::Str("ab".to_string())),
        ]));
        assert_eq!(t.field_args(), vec!["pattern=\"^[a-z]+$\""]);
        assert_eq!(t.dropped(), vec!["prefix"]);
    }

    #[test]
    fn affixes_fold_into_one_pattern() {
        let t = translate(&string_field(vec![
            rule("string", "prefix", RuleValue::Str("a.".to_string())),
            rule("string", "suffix", RuleValue::Str("z".to_string())),
            rule("string", "contains", RuleValue::Str("m".to_string())),
        ]));
        assert_eq!(t.pattern.as_deref(), Some("^a\\..*z$"));
        assert_eq!(t.dropped(), vec!["contains"]);

        let t = translate(&string_field(vec![rule("string", "contains", RuleValue::Str("+".to_string()))]));
        assert_eq!(t.pattern.as_deref(), Some("\\+"));
        assert!(t.dropped().is_empty());
    }

    #[test]
    fn lengths_and_formats() {
        let t = translate(&string_field(vec![
            rule("string", "len", RuleValue::UInt(4)),
            rule("string", "email", RuleValue::Bool(true)),
            rule("string", "hostname", RuleValue::Bool(true)),
        ]));
        assert_eq!(t.field_args(), vec!["min_length=4", "max_length=4"]);
        assert_eq!(t.validators(), vec!["_AfterValidator(_validate_email)"]);
        assert_eq!(t.runtime_symbols(), vec![RuntimeSymbol::ValidateEmail]);
        assert_eq!(t.dropped(), vec!["hostname"]);
    }

    #[test]
    fn false_flags_are_no_ops() {
        let t = translate(&string_field(vec![
            ConstraintRule { family: None, name: "required".to_string(), value: RuleValue::Bool(false) },
            rule("string", "uuid", RuleValue::Bool(false)),
        ]));
        assert_eq!(t, Translation::default());
    }

    #[test]
    fn type_independent_rules_are_dropped() {
        let t = translate(&string_field(vec![
            ConstraintRule { family: None, name: "required".to_string(), value: RuleValue::Bool(true) },
            ConstraintRule {
                family: None,
                name:   "cel".to_string(),
                value:  RuleValue::List(vec![RuleValue::Message("buf.validate.Rule".to_string())]),
            },
        ]));
        assert_eq!(t.dropped(), vec!["cel", "required"]);
    }

    #[test]
    fn const_and_membership() {
        let t = translate(&string_field(vec![rule("string", "const", RuleValue::Str("fixed".to_string()))]));
        assert_eq!(t.const_literal.as_deref(), Some("'fixed'"));
        assert_eq!(t.const_default.as_deref(), Some("\"fixed\""));

        let f = field(
            TypeRef::Scalar(ScalarKind::Float),
            FieldShape::Singular,
            vec![rule("float", "const", RuleValue::Float(1.5)), rule("float", "finite", RuleValue::Bool(true))],
        );
        let t = translate(&f);
        assert_eq!(
            t.validators(),
            vec!["_AfterValidator(_require_finite)", "_AfterValidator(_make_const_validator(1.5))"]
        );
        assert_eq!(t.const_default.as_deref(), Some("1.5"));

        let t = translate(&string_field(vec![rule(
            "string",
            "in",
            RuleValue::List(vec![RuleValue::Str("a".to_string()), RuleValue::Str("b".to_string())]),
        )]));
        assert_eq!(t.validators(), vec!["_AfterValidator(_make_in_validator(frozenset({'a', 'b'})))"]);
    }

    #[test]
    fn structured_bounds_are_unsupported() {
        let f = field(
            TypeRef::Scalar(ScalarKind::String),
            FieldShape::Singular,
            vec![rule("duration", "gt", RuleValue::Message("google.protobuf.Duration".to_string()))],
        );
        let t = translate(&f);
        assert!(t.field_args().is_empty());
        assert_eq!(t.dropped(), vec!["gt"]);
    }

    #[test]
    fn unique_needs_hashable_items() {
        let scalars = field(
            TypeRef::Scalar(ScalarKind::String),
            FieldShape::Repeated,
            vec![rule("repeated", "unique", RuleValue::Bool(true)), rule("repeated", "min_items", RuleValue::UInt(1))],
        );
        let t = translate(&scalars);
        assert!(t.unique);
        assert_eq!(t.field_args(), vec!["min_length=1"]);

        let messages = field(
            TypeRef::Message(protoc_gen_pydantic_schema::MessageId(0)),
            FieldShape::Repeated,
            vec![rule("repeated", "unique", RuleValue::Bool(true))],
        );
        assert_eq!(translate(&messages).dropped(), vec!["unique"]);
    }

    #[test]
    fn examples_render_as_python_literals() {
        let f = field(
            TypeRef::Scalar(ScalarKind::Int32),
            FieldShape::Singular,
            vec![rule("int32", "example", RuleValue::List(vec![RuleValue::Int(1), RuleValue::Int(42)]))],
        );
        assert_eq!(translate(&f).field_args(), vec!["examples=[1, 42]"]);
    }
}
