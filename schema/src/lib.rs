//! Intermediate representation for protoc-gen-pydantic.
//!
//! The compiler builds an [Ir] from a descriptor set, resolves every
//! declaration into a [NameTable], and renders from those two read-only
//! structures. Nothing here knows about protobuf encodings or Python.
//!
//! ```
//! use protoc_gen_pydantic_schema::*;
//!
//! let bag = OptionBag::from_entries(vec![
//!     ("display_name".to_owned(), OptionValue::Str("US Dollar".to_owned())),
//! ]);
//! assert_eq!(bag.get("display_name"), &OptionValue::Str("US Dollar".to_owned()));
//! assert!(bag.get("priority").is_unset());
//! ```

pub mod ir;
pub mod names;
pub mod options;
pub mod value;

pub use ir::*;
pub use names::*;
pub use options::*;
pub use value::*;
