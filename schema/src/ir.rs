use serde::Serialize;

use crate::value::OptionBag;

/// Index of a [FileUnit] inside [Ir::files].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub usize);

/// Index of a [MessageType] inside [Ir::messages].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId(pub usize);

/// Index of an [EnumType] inside [Ir::enums].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnumId(pub usize);

/// The resolved object graph for one generation run.
///
/// Every declaration lives in a flat arena and refers to others by id, so a
/// message may hold a field of its own type without any by-value nesting.
#[derive(Debug, Default, Serialize)]
pub struct Ir {
    pub packages: Vec<Package>,
    pub files:    Vec<FileUnit>,
    pub messages: Vec<MessageType>,
    pub enums:    Vec<EnumType>,
}

impl Ir {
    pub fn file(&self, id: FileId) -> &FileUnit {
        &self.files[id.0]
    }

    pub fn message(&self, id: MessageId) -> &MessageType {
        &self.messages[id.0]
    }

    pub fn enum_type(&self, id: EnumId) -> &EnumType {
        &self.enums[id.0]
    }

    /// Files protoc asked us to emit, in request order.
    pub fn files_to_generate(&self) -> impl Iterator<Item = (FileId, &FileUnit)> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.generate)
            .map(|(i, f)| (FileId(i), f))
    }

    /// Enums of a file in emission order: each top-level enum, then the
    /// enums nested in each message depth first.
    pub fn enums_in_file(&self, file: FileId) -> Vec<EnumId> {
        let unit = self.file(file);
        let mut out = unit.enums.clone();
        for &msg in &unit.messages {
            self.collect_nested_enums(msg, &mut out);
        }
        out
    }

    fn collect_nested_enums(&self, msg: MessageId, out: &mut Vec<EnumId>) {
        let message = self.message(msg);
        out.extend(message.enums.iter().copied());
        for &child in &message.messages {
            self.collect_nested_enums(child, out);
        }
    }

    /// Messages of a file in emission order: nested messages precede the
    /// message that contains them.
    pub fn messages_in_file(&self, file: FileId) -> Vec<MessageId> {
        let mut out = Vec::new();
        for &msg in &self.file(file).messages {
            self.collect_messages(msg, &mut out);
        }
        out
    }

    fn collect_messages(&self, msg: MessageId, out: &mut Vec<MessageId>) {
        for &child in &self.message(msg).messages {
            self.collect_messages(child, out);
        }
        out.push(msg);
    }
}

/// A protobuf package and the files declaring it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub name:  String,
    pub files: Vec<FileId>,
}

/// Leading and trailing source comments, one entry per trimmed line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Docs {
    pub leading:  Vec<String>,
    pub trailing: Vec<String>,
}

impl Docs {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileUnit {
    /// Path of the `.proto` file, e.g. `api/v1/user.proto`.
    pub name:     String,
    pub package:  String,
    /// False for files present only to resolve references.
    pub generate: bool,
    /// Comments attached to the `syntax` statement.
    pub docs:     Docs,
    pub messages: Vec<MessageId>,
    pub enums:    Vec<EnumId>,
}

impl FileUnit {
    /// Output path without extension, e.g. `api/v1/user`.
    pub fn stem(&self) -> &str {
        self.name.strip_suffix(".proto").unwrap_or(&self.name)
    }

    /// Directory of the output path, empty for files at the root.
    pub fn directory(&self) -> &str {
        match self.name.rfind('/') {
            Some(idx) => &self.name[..idx],
            None => "",
        }
    }

    /// Python module name of the generated file, e.g. `user_pydantic`.
    pub fn module_name(&self) -> String {
        let stem = self.stem();
        let base = match stem.rfind('/') {
            Some(idx) => &stem[idx + 1..],
            None => stem,
        };
        format!("{}_pydantic", base)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageType {
    pub name:      String,
    pub full_name: String,
    pub file:      FileId,
    pub parent:    Option<MessageId>,
    pub docs:      Docs,
    pub fields:    Vec<FieldDescriptor>,
    pub oneofs:    Vec<OneofGroup>,
    pub messages:  Vec<MessageId>,
    pub enums:     Vec<EnumId>,
    /// Custom `MessageOptions` extensions.
    pub options:   OptionBag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumType {
    pub name:      String,
    pub full_name: String,
    pub file:      FileId,
    pub parent:    Option<MessageId>,
    pub docs:      Docs,
    pub values:    Vec<EnumValue>,
}

impl EnumType {
    /// True when any value carries built-in or custom options, which switches
    /// the whole enum to the options-bearing member form.
    pub fn has_value_options(&self) -> bool {
        self.values.iter().any(EnumValue::has_options)
    }

    pub fn zero_value(&self) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.number == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValue {
    pub name:         String,
    pub number:       i32,
    pub docs:         Docs,
    pub deprecated:   bool,
    pub debug_redact: bool,
    /// Custom `EnumValueOptions` extensions.
    pub options:      OptionBag,
}

impl EnumValue {
    pub fn has_options(&self) -> bool {
        self.deprecated || self.debug_redact || !self.options.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name:       String,
    pub json_name:  String,
    pub number:     i32,
    pub ty:         TypeRef,
    pub shape:      FieldShape,
    /// Index into the parent's [MessageType::oneofs].
    pub oneof:      Option<usize>,
    pub docs:       Docs,
    pub deprecated: bool,
    pub rules:      Vec<ConstraintRule>,
    /// Custom `FieldOptions` extensions, validation rules excluded.
    pub options:    OptionBag,
}

impl FieldDescriptor {
    /// Whether absence is distinguishable from the zero value.
    pub fn is_present_tracked(&self) -> bool {
        match self.shape {
            FieldShape::Repeated | FieldShape::Map { .. } => false,
            FieldShape::Optional => true,
            FieldShape::Singular => {
                self.oneof.is_some()
                    || matches!(self.ty, TypeRef::Message(_) | TypeRef::WellKnown(_))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldShape {
    Singular,
    /// Declared with the proto3 `optional` keyword.
    Optional,
    Repeated,
    /// `map<key, _>`; the value type is the field's [TypeRef].
    Map { key: ScalarKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeRef {
    Scalar(ScalarKind),
    Enum(EnumId),
    Message(MessageId),
    WellKnown(WellKnownType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::Double | ScalarKind::Float)
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            ScalarKind::Double | ScalarKind::Float | ScalarKind::Bool | ScalarKind::String | ScalarKind::Bytes
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ScalarKind::Uint32 | ScalarKind::Uint64 | ScalarKind::Fixed32 | ScalarKind::Fixed64
        )
    }

    /// 64-bit integers travel as decimal strings in JSON.
    pub fn is_64bit(self) -> bool {
        matches!(
            self,
            ScalarKind::Int64
                | ScalarKind::Uint64
                | ScalarKind::Sint64
                | ScalarKind::Fixed64
                | ScalarKind::Sfixed64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }
}

/// The `google.protobuf` messages that get bespoke shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WellKnownType {
    Timestamp,
    Duration,
    Struct,
    Value,
    ListValue,
    Any,
    Empty,
    FieldMask,
    BoolValue,
    Int32Value,
    Int64Value,
    UInt32Value,
    UInt64Value,
    FloatValue,
    DoubleValue,
    StringValue,
    BytesValue,
}

impl WellKnownType {
    pub fn from_full_name(name: &str) -> Option<Self> {
        let short = name.strip_prefix("google.protobuf.")?;
        Some(match short {
            "Timestamp" => WellKnownType::Timestamp,
            "Duration" => WellKnownType::Duration,
            "Struct" => WellKnownType::Struct,
            "Value" => WellKnownType::Value,
            "ListValue" => WellKnownType::ListValue,
            "Any" => WellKnownType::Any,
            "Empty" => WellKnownType::Empty,
            "FieldMask" => WellKnownType::FieldMask,
            "BoolValue" => WellKnownType::BoolValue,
            "Int32Value" => WellKnownType::Int32Value,
            "Int64Value" => WellKnownType::Int64Value,
            "UInt32Value" => WellKnownType::UInt32Value,
            "UInt64Value" => WellKnownType::UInt64Value,
            "FloatValue" => WellKnownType::FloatValue,
            "DoubleValue" => WellKnownType::DoubleValue,
            "StringValue" => WellKnownType::StringValue,
            "BytesValue" => WellKnownType::BytesValue,
            _ => return None,
        })
    }
}

/// A oneof as declared in the schema. Synthetic proto3-optional oneofs are
/// never recorded here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneofGroup {
    pub name:   String,
    /// Schema names of the members, in declaration order.
    pub fields: Vec<String>,
}

/// One validation rule read from the `buf.validate.field` extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintRule {
    /// Rule family (`string`, `int64`, `repeated`, ...), or `None` for the
    /// type-independent rules such as `required` and `cel`.
    pub family: Option<String>,
    pub name:   String,
    pub value:  RuleValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RuleValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Enum(i32),
    List(Vec<RuleValue>),
    /// A structured value; carries the message's full name.
    Message(String),
}
