use serde::Serialize;

use std::collections::BTreeMap;
use std::fmt;

/// A custom option value lifted out of the descriptor.
///
/// Absent keys resolve to [OptionValue::Unset], never to a zero value, so an
/// option explicitly set to `false`, `0` or `""` stays distinguishable from
/// one that was never declared. Message-typed options (including
/// `google.protobuf.Struct` catch-alls) become nested [OptionValue::Map]s.
#[derive(Clone, PartialEq, Serialize)]
pub enum OptionValue {
    Unset,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<OptionValue>),
    Map(BTreeMap<String, OptionValue>),
}

static UNSET: OptionValue = OptionValue::Unset;

impl OptionValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, OptionValue::Unset)
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptionValue::Unset => write!(f, "unset"),
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::UInt(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Str(v) => write!(f, "{:?}", v),
            OptionValue::Bytes(v) => write!(f, "{:?}", v),
            OptionValue::List(items) => f.debug_list().entries(items).finish(),
            OptionValue::Map(entries) => f.debug_map().entries(entries).finish(),
        }
    }
}

/// Read-only bag of custom options attached to one declaration.
///
/// Built once by the option extractor and never handed out mutably.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionBag {
    entries: BTreeMap<String, OptionValue>,
}

impl OptionBag {
    /// Builds a bag from `(key, value)` pairs. Pairs whose value is
    /// [OptionValue::Unset] are not stored.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, OptionValue)>,
    {
        OptionBag {
            entries: entries.into_iter().filter(|(_, v)| !v.is_unset()).collect(),
        }
    }

    /// Value for `key`, or [OptionValue::Unset] when the declaration did not
    /// set it.
    pub fn get(&self, key: &str) -> &OptionValue {
        self.entries.get(key).unwrap_or(&UNSET)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_keys_are_unset_not_zero() {
        let bag = OptionBag::from_entries(vec![
            ("priority".to_string(), OptionValue::Int(0)),
            ("is_default".to_string(), OptionValue::Bool(false)),
        ]);

        assert_eq!(bag.get("priority"), &OptionValue::Int(0));
        assert_eq!(bag.get("is_default"), &OptionValue::Bool(false));
        assert!(bag.get("display_name").is_unset());
    }

    #[test]
    fn unset_entries_are_dropped() {
        let bag = OptionBag::from_entries(vec![
            ("a".to_string(), OptionValue::Unset),
            ("b".to_string(), OptionValue::Str("x".to_string())),
        ]);
        assert_eq!(bag.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["b"]);
    }
}
