//! Python code emitter.
//!
//! Renders one `<name>_pydantic.py` module per requested file. The body is
//! rendered first so the import block lists exactly what it references.

use protoc_gen_pydantic_schema::{
    EnumId, FieldDescriptor, FileId, Ir, MessageId, MessageType, NameTable, OptionBag, PluginOptions, ResolvedName,
};

use std::collections::{BTreeMap, BTreeSet};

use crate::constraints::translate;
use crate::error::CompileError;
use crate::options::{display_key, OptionRegistry};
use crate::pyliteral::{docstring_line, json_literal, option_literal, py_quote, uses_mapping_proxy};
use crate::runtime::{RuntimeSymbol, RUNTIME_MODULE};
use crate::type_mapper::{literal_type, wrap_with_annotated, TypeMapper, TypeUses};

pub const HEADER: &str = "# DO NOT EDIT. Generated by protoc-gen-pydantic.";
const MAX_LINE: usize = 88;

/// Rendered module plus what its directory's runtime module must provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path:      String,
    pub directory: String,
    pub content:   String,
    pub runtime:   BTreeSet<RuntimeSymbol>,
}

/// `from x import a, b`, wrapped one name per line when the single-line
/// form would exceed 88 columns.
pub fn format_import_block(prefix: &str, symbols: &[String]) -> String {
    let one_line = format!("{}{}", prefix, symbols.join(", "));
    if one_line.len() <= MAX_LINE {
        return one_line;
    }
    let mut block = format!("{}(\n", prefix);
    for symbol in symbols {
        block.push_str("    ");
        block.push_str(symbol);
        block.push_str(",\n");
    }
    block.push(')');
    block
}

/// Strips trailing whitespace, allows at most two consecutive blank lines and
/// ends the text with exactly one newline.
pub fn post_process(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut blank_run = 0;
    for line in source.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    let trimmed = out.trim_end_matches('\n');
    format!("{}\n", trimmed)
}

/// Escapes an annotation for use inside a double-quoted forward reference.
fn annotation_string(annotation: &str) -> String {
    format!("\"{}\"", annotation.replace('\\', "\\\\").replace('"', "\\\""))
}

#[derive(Debug, Default)]
struct Uses {
    types:           TypeUses,
    annotated:       bool,
    literal:         bool,
    after_validator: bool,
    mapping_proxy:   bool,
}

struct RenderedField {
    ident:      String,
    annotation: String,
    leading:    Vec<String>,
    lines:      Vec<String>,
    aliased:    bool,
}

/// Everything a render needs; shared read-only across worker threads.
pub struct Generator<'a> {
    pub ir:       &'a Ir,
    pub names:    &'a NameTable,
    pub options:  &'a PluginOptions,
    pub registry: &'a OptionRegistry,
}

impl<'a> Generator<'a> {
    pub fn render_file(&self, file_id: FileId) -> Result<RenderedFile, CompileError> {
        let unit = self.ir.file(file_id);
        let mapper = TypeMapper {
            ir:      self.ir,
            names:   self.names,
            options: self.options,
            file:    file_id,
        };
        let mut uses = Uses::default();

        let enums = self.ir.enums_in_file(file_id);
        let messages = self.ir.messages_in_file(file_id);
        let enum_options = enums.iter().any(|id| self.ir.enum_type(*id).has_value_options());

        // 1) declarations
        let mut body: Vec<String> = Vec::new();
        if !messages.is_empty() {
            body.push(String::new());
            body.push(String::new());
            body.extend(PROTO_MODEL.lines().map(str::to_string));
        }
        if enum_options {
            self.render_enum_support(&mut body, &mut uses);
        }
        for id in &enums {
            self.render_enum(&mut body, *id, &mut uses)?;
        }
        for id in &messages {
            self.render_message(&mut body, &mapper, *id, &mut uses)?;
        }
        if !unit.docs.trailing.is_empty() {
            body.push(String::new());
            for line in &unit.docs.trailing {
                body.push(format!("# {}", line));
            }
        }

        // 2) header and imports
        let mut out: Vec<String> = vec![HEADER.to_string()];
        if !unit.docs.leading.is_empty() {
            out.push("\"\"\"".to_string());
            out.extend(unit.docs.leading.iter().map(|l| docstring_line(l)));
            out.push("\"\"\"".to_string());
        }
        for group in self.import_groups(file_id, !enums.is_empty(), enum_options, !messages.is_empty(), &uses) {
            out.push(String::new());
            out.extend(group);
        }
        out.extend(body);

        let content = post_process(&out.join("\n"));
        tracing::debug!(file = %unit.name, bytes = content.len(), "rendered module");
        Ok(RenderedFile {
            path: format!("{}_pydantic.py", unit.stem()),
            directory: unit.directory().to_string(),
            content,
            runtime: uses.types.runtime,
        })
    }

    fn ident(&self, path: &str) -> Result<&ResolvedName, CompileError> {
        self.names.get(path).ok_or_else(|| CompileError::MissingType {
            type_name:     path.to_string(),
            referenced_by: "name table".to_string(),
        })
    }

    /// Import statements grouped as stdlib, pydantic, absolute and relative.
    fn import_groups(
        &self,
        file_id: FileId,
        has_enums: bool,
        enum_options: bool,
        has_messages: bool,
        uses: &Uses,
    ) -> Vec<Vec<String>> {
        let mut groups = Vec::new();

        // 1) stdlib
        let mut stdlib = Vec::new();
        if enum_options {
            stdlib.push("from dataclasses import dataclass as _dataclass".to_string());
        }
        if has_enums {
            stdlib.push("from enum import Enum as _Enum".to_string());
        }
        if uses.mapping_proxy {
            stdlib.push("from types import MappingProxyType as _MappingProxyType".to_string());
        }
        let mut typing = Vec::new();
        if uses.annotated {
            typing.push("Annotated as _Annotated".to_string());
        }
        if uses.types.any {
            typing.push("Any as _Any".to_string());
        }
        if uses.literal {
            typing.push("Literal as _Literal".to_string());
        }
        if uses.types.optional {
            typing.push("Optional as _Optional".to_string());
        }
        if !typing.is_empty() {
            stdlib.push(format_import_block("from typing import ", &typing));
        }
        if !stdlib.is_empty() {
            groups.push(stdlib);
        }

        // 2) pydantic
        if has_messages {
            let mut pydantic = Vec::new();
            if uses.after_validator {
                pydantic.push("AfterValidator as _AfterValidator".to_string());
            }
            pydantic.extend(
                ["BaseModel as _BaseModel", "ConfigDict as _ConfigDict", "Field as _Field"]
                    .iter()
                    .map(|s| s.to_string()),
            );
            groups.push(vec![format_import_block("from pydantic import ", &pydantic)]);
        }

        // 3) other generated modules, then 4) siblings and the runtime module
        let unit = self.ir.file(file_id);
        let mut absolute: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut relative: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (target, idents) in &uses.types.imports {
            let target = self.ir.file(*target);
            let symbols: Vec<String> = idents.iter().cloned().collect();
            if target.directory() == unit.directory() {
                relative.insert(format!(".{}", target.module_name()), symbols);
            } else if target.directory().is_empty() {
                absolute.insert(target.module_name(), symbols);
            } else {
                let module = format!("{}.{}", target.directory().replace('/', "."), target.module_name());
                absolute.insert(module, symbols);
            }
        }
        if !uses.types.runtime.is_empty() {
            let mut symbols: Vec<String> = uses.types.runtime.iter().map(|s| s.name().to_string()).collect();
            symbols.sort();
            relative.insert(format!(".{}", RUNTIME_MODULE), symbols);
        }
        for modules in [absolute, relative] {
            if modules.is_empty() {
                continue;
            }
            groups.push(
                modules
                    .iter()
                    .map(|(module, symbols)| format_import_block(&format!("from {} import ", module), symbols))
                    .collect(),
            );
        }
        groups
    }

    fn render_enum_support(&self, out: &mut Vec<String>, uses: &mut Uses) {
        let scalar = self.enum_scalar();
        out.push(String::new());
        out.push(String::new());
        out.push("@_dataclass(frozen=True)".to_string());
        out.push("class _EnumValueOptions:".to_string());
        out.push("    number: int".to_string());
        out.push("    deprecated: bool = False".to_string());
        out.push("    debug_redact: bool = False".to_string());
        for option in &self.registry.enum_value {
            if option.py_type.contains("_Any") {
                uses.types.any = true;
            }
            out.push(format!("    {}: {} | None = None", option.name, option.py_type));
        }
        out.push(String::new());
        out.push(String::new());
        out.extend(PROTO_ENUM.replace("{scalar}", scalar).lines().map(str::to_string));
    }

    fn enum_scalar(&self) -> &'static str {
        if self.options.use_integers_for_enums {
            "int"
        } else {
            "str"
        }
    }

    fn render_enum(&self, out: &mut Vec<String>, id: EnumId, uses: &mut Uses) -> Result<(), CompileError> {
        let enum_type = self.ir.enum_type(id);
        let class_name = &self.ident(&enum_type.full_name)?.ident;
        let with_options = enum_type.has_value_options();
        let integers = self.options.use_integers_for_enums;

        out.push(String::new());
        out.push(String::new());
        if with_options {
            out.push(format!("class {}(_ProtoEnum):", class_name));
        } else {
            out.push(format!("class {}({}, _Enum):", class_name, self.enum_scalar()));
        }
        push_docstring(out, &enum_type.docs.leading);
        if !enum_type.docs.trailing.is_empty() {
            out.push(String::new());
            out.extend(enum_type.docs.trailing.iter().map(|l| format!("    # {}", l)));
        }

        for value in &enum_type.values {
            let member = &self.ident(&format!("{}.{}", enum_type.full_name, value.name))?.ident;
            let (literal, note) = if integers {
                (value.number.to_string(), value.name.clone())
            } else {
                (py_quote(&value.name), value.number.to_string())
            };

            out.push(String::new());
            out.extend(value.docs.leading.iter().map(|l| format!("    # {}", l)));
            if !with_options {
                out.push(format!("    {} = {}  # {}", member, literal, note));
            } else {
                out.push(format!("    {} = (", member));
                out.push(format!("        {},", literal));
                if value.options.is_empty() {
                    let mut options = format!("_EnumValueOptions(number={}", value.number);
                    if value.deprecated {
                        options.push_str(", deprecated=True");
                    }
                    if value.debug_redact {
                        options.push_str(", debug_redact=True");
                    }
                    out.push(format!("        {}),", options));
                } else {
                    out.push("        _EnumValueOptions(".to_string());
                    out.push(format!("            number={},", value.number));
                    if value.deprecated {
                        out.push("            deprecated=True,".to_string());
                    }
                    if value.debug_redact {
                        out.push("            debug_redact=True,".to_string());
                    }
                    for option in &self.registry.enum_value {
                        let set = value.options.get(&option.full_name);
                        if set.is_unset() {
                            continue;
                        }
                        uses.mapping_proxy |= uses_mapping_proxy(set);
                        out.push(format!("            {}={},", option.name, option_literal(set)));
                    }
                    out.push("        ),".to_string());
                }
                out.push(format!("    )  # {}", note));
            }
            out.extend(value.docs.trailing.iter().map(|l| format!("    # {}", l)));
        }
        Ok(())
    }

    fn render_message(
        &self,
        out: &mut Vec<String>,
        mapper: &TypeMapper,
        id: MessageId,
        uses: &mut Uses,
    ) -> Result<(), CompileError> {
        let message = self.ir.message(id);
        let class_name = &self.ident(&message.full_name)?.ident;

        let mut fields = Vec::with_capacity(message.fields.len());
        for field in &message.fields {
            fields.push(self.render_field(mapper, message, field, uses)?);
        }

        out.push(String::new());
        out.push(String::new());
        out.push(format!("class {}(_ProtoModel):", class_name));

        // 1) docstring with an Attributes section
        out.push("    \"\"\"".to_string());
        out.extend(message.docs.leading.iter().map(|l| format!("    {}", docstring_line(l))));
        out.push(String::new());
        out.push("    Attributes:".to_string());
        for field in &fields {
            out.push(format!("      {} ({}):", field.ident, docstring_line(&field.annotation)));
            out.extend(field.leading.iter().map(|l| format!("        {}", docstring_line(l))));
        }
        out.push("    \"\"\"".to_string());

        // 2) model_config
        out.push(String::new());
        out.push("    model_config = _ConfigDict(".to_string());
        if fields.iter().any(|f| f.aliased) {
            out.push("        populate_by_name=True,".to_string());
        }
        out.push("        ser_json_bytes=\"base64\",".to_string());
        out.push("        val_json_bytes=\"base64\",".to_string());
        out.push("        ser_json_inf_nan=\"strings\",".to_string());
        if !message.options.is_empty() {
            out.push(format!("        json_schema_extra={},", schema_extra(&message.options)));
        }
        out.push("    )".to_string());

        if !message.docs.trailing.is_empty() {
            out.push(String::new());
            out.extend(message.docs.trailing.iter().map(|l| format!("    # {}", l)));
        }

        // 3) fields, one blank line apart
        for field in fields {
            out.push(String::new());
            out.extend(field.lines);
        }
        Ok(())
    }

    fn render_field(
        &self,
        mapper: &TypeMapper,
        message: &MessageType,
        field: &FieldDescriptor,
        uses: &mut Uses,
    ) -> Result<RenderedField, CompileError> {
        let name = self.ident(&format!("{}.{}", message.full_name, field.name))?;
        let mapped = mapper.map_field(field, &mut uses.types)?;
        let translation = translate(field);

        let mut annotation = mapped.annotation;
        let mut default = Some(mapped.default);

        // 1) constraints that change the type
        if let Some(literal) = &translation.const_literal {
            annotation = literal_type(&annotation, literal);
            uses.literal = true;
        }
        let validators = translation.validators();
        if !validators.is_empty() {
            annotation = wrap_with_annotated(&annotation, &validators);
            uses.annotated = true;
            uses.after_validator = true;
            uses.types.runtime.extend(translation.runtime_symbols());
        }
        if let (Some(value), false) = (&translation.const_default, mapped.nullable) {
            default = Some(value.clone());
        }
        // A zero the constraints reject would not survive a round trip.
        if !mapped.nullable && !translation.admits_zero(field) {
            default = None;
        }

        // 2) keyword arguments
        let mut args = Vec::new();
        if !self.options.disable_field_description {
            if let Some(description) = self.description(message, field) {
                args.push(format!("description={}", py_quote(&description)));
            }
        }
        if let Some(alias) = &name.alias {
            args.push(format!("alias={}", py_quote(alias)));
        }
        if field.deprecated {
            args.push("deprecated=True".to_string());
        }
        if !field.options.is_empty() {
            args.push(format!("json_schema_extra={}", schema_extra(&field.options)));
        }
        args.extend(translation.field_args());
        let dropped: Vec<String> = translation
            .dropped()
            .iter()
            .map(|rule| format!("# buf.validate: {} (not translated)", rule))
            .collect();

        // 3) the declaration itself
        let head = format!("    {}: {} = _Field(", name.ident, annotation_string(&annotation));
        let mut lines: Vec<String> = field.docs.leading.iter().map(|l| format!("    # {}", l)).collect();
        let short = format!("{}{})", head, default.as_deref().unwrap_or_default());
        let needs_long_form = !args.is_empty()
            || !dropped.is_empty()
            || default.as_deref().is_some_and(|d| d.starts_with("default_factory="));
        // Nothing to wrap onto its own line when there is no default.
        if !needs_long_form && (short.len() <= MAX_LINE || default.is_none()) {
            lines.push(short);
        } else {
            lines.push(head);
            if let Some(default) = &default {
                lines.push(format!("        {},", default));
            }
            lines.extend(args.iter().map(|a| format!("        {},", a)));
            lines.extend(dropped.iter().map(|c| format!("        {}", c)));
            lines.push("    )".to_string());
        }
        lines.extend(field.docs.trailing.iter().map(|l| format!("    # {}", l)));

        Ok(RenderedField {
            ident: name.ident.clone(),
            annotation,
            leading: field.docs.leading.clone(),
            lines,
            aliased: name.alias.is_some(),
        })
    }

    /// Leading and trailing comments, plus a note naming the oneof siblings.
    fn description(&self, message: &MessageType, field: &FieldDescriptor) -> Option<String> {
        let mut parts: Vec<String> = field.docs.leading.iter().chain(&field.docs.trailing).cloned().collect();
        if let Some(group) = field.oneof.and_then(|i| message.oneofs.get(i)) {
            parts.push(format!(
                "Only one of the fields can be specified with: [{}] (oneof {})",
                group.fields.join(" "),
                group.name
            ));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

fn push_docstring(out: &mut Vec<String>, lines: &[String]) {
    if lines.is_empty() {
        out.push("    \"\"\" \"\"\"".to_string());
        return;
    }
    out.push("    \"\"\"".to_string());
    out.extend(lines.iter().map(|l| format!("    {}", docstring_line(l))));
    out.push("    \"\"\"".to_string());
}

fn schema_extra(bag: &OptionBag) -> String {
    let keys: Vec<&str> = bag.iter().map(|(key, _)| key).collect();
    let entries: Vec<String> = bag
        .iter()
        .map(|(key, value)| format!("{}: {}", py_quote(display_key(key, &keys)), json_literal(value)))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

const PROTO_MODEL: &str = r#"class _ProtoModel(_BaseModel):
    """Base class for generated Pydantic models with ProtoJSON helpers."""

    def to_proto_dict(self, **kwargs) -> dict:
        """Serialize to a dict using ProtoJSON conventions.

        Omits fields with default (zero) values and uses original proto
        field names (camelCase aliases).
        """
        kwargs.setdefault("exclude_defaults", True)
        kwargs.setdefault("by_alias", True)
        return super().model_dump(**kwargs)

    def to_proto_json(self, **kwargs) -> str:
        """Serialize to a JSON string using ProtoJSON conventions.

        Omits fields with default (zero) values and uses original proto
        field names (camelCase aliases).
        """
        kwargs.setdefault("exclude_defaults", True)
        kwargs.setdefault("by_alias", True)
        return super().model_dump_json(**kwargs)

    @classmethod
    def from_proto_dict(cls, data: dict, **kwargs):
        """Deserialize from a dict using ProtoJSON conventions."""
        return cls.model_validate(data, **kwargs)

    @classmethod
    def from_proto_json(cls, json_str: str, **kwargs):
        """Deserialize from a JSON string using ProtoJSON conventions."""
        return cls.model_validate_json(json_str, **kwargs)"#;

const PROTO_ENUM: &str = r#"class _ProtoEnum({scalar}, _Enum):
    _options_: _EnumValueOptions

    def __new__(cls, value: {scalar}, options: _EnumValueOptions | None = None):
        obj = {scalar}.__new__(cls, value)
        obj._value_ = value
        if options is not None:
            obj._options_ = options
        return obj

    @property
    def options(self) -> _EnumValueOptions:
        return self._options_"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn imports_wrap_past_88_columns() {
        let short = vec!["BaseModel as _BaseModel".to_string(), "Field as _Field".to_string()];
        assert_eq!(
            format_import_block("from pydantic import ", &short),
            "from pydantic import BaseModel as _BaseModel, Field as _Field"
        );

        let long = vec![
            "AfterValidator as _AfterValidator".to_string(),
            "BaseModel as _BaseModel".to_string(),
            "ConfigDict as _ConfigDict".to_string(),
            "Field as _Field".to_string(),
        ];
        assert_eq!(
            format_import_block("from pydantic import ", &long),
            "from pydantic import (\n    AfterValidator as _AfterValidator,\n    BaseModel as _BaseModel,\n    ConfigDict as _ConfigDict,\n    Field as _Field,\n)"
        );
    }

    #[test]
    fn post_processing_normalizes_whitespace() {
        let raw = "a   \n\n\n\n\nb\t\n\n\n";
        assert_eq!(post_process(raw), "a\n\n\nb\n");
    }

    #[test]
    fn annotations_are_escaped_for_forward_references() {
        assert_eq!(annotation_string("_Literal['a\"b']"), "\"_Literal['a\\\"b']\"");
        assert_eq!(annotation_string("int"), "\"int\"");
    }
}
