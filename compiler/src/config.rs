use protoc_gen_pydantic_schema::{FieldCasing, PluginOptions};

use crate::error::CompileError;

/// Parses the protoc parameter string, e.g.
/// `preserving_proto_field_name=false,auto_trim_enum_prefix`.
///
/// A bare key means `key=true`. Keys are applied left to right, so when both
/// `preserving_proto_field_name` and `field_casing` appear the later wins.
pub fn parse_parameter(parameter: Option<&str>) -> Result<PluginOptions, CompileError> {
    let mut options = PluginOptions::default();
    let Some(parameter) = parameter else {
        return Ok(options);
    };

    for part in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = match part.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (part, None),
        };

        match key {
            "preserving_proto_field_name" => {
                options.field_casing = if parse_bool(key, value)? {
                    FieldCasing::Preserve
                } else {
                    FieldCasing::LowerCamel
                };
            }
            "field_casing" => {
                options.field_casing = match value {
                    Some("preserve") => FieldCasing::Preserve,
                    Some("snake_case") => FieldCasing::SnakeCase,
                    Some("lower_camel") | Some("lowerCamel") => FieldCasing::LowerCamel,
                    other => {
                        return Err(CompileError::InvalidParameter {
                            key:    key.to_string(),
                            reason: format!(
                                "expected one of preserve, snake_case, lower_camel, got {:?}",
                                other.unwrap_or("")
                            ),
                        })
                    }
                };
            }
            "auto_trim_enum_prefix" => options.auto_trim_enum_prefix = parse_bool(key, value)?,
            "use_integers_for_enums" => options.use_integers_for_enums = parse_bool(key, value)?,
            "disable_field_description" => {
                options.disable_field_description = parse_bool(key, value)?
            }
            "use_none_union_syntax_instead_of_optional" => {
                options.use_none_union_syntax = parse_bool(key, value)?
            }
            _ => {
                return Err(CompileError::InvalidParameter {
                    key:    key.to_string(),
                    reason: "unknown option".to_string(),
                })
            }
        }
    }

    Ok(options)
}

fn parse_bool(key: &str, value: Option<&str>) -> Result<bool, CompileError> {
    match value {
        None => Ok(true),
        Some("1" | "t" | "T" | "TRUE" | "true" | "True") => Ok(true),
        Some("0" | "f" | "F" | "FALSE" | "false" | "False") => Ok(false),
        Some(other) => Err(CompileError::InvalidParameter {
            key:    key.to_string(),
            reason: format!("expected a boolean, got {:?}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_parameter_uses_defaults() {
        assert_eq!(parse_parameter(None).unwrap(), PluginOptions::default());
        assert_eq!(parse_parameter(Some("")).unwrap(), PluginOptions::default());
    }

    #[test]
    fn parses_known_keys() {
        let options = parse_parameter(Some(
            "preserving_proto_field_name=false, auto_trim_enum_prefix=0,use_integers_for_enums,\
             disable_field_description=True,use_none_union_syntax_instead_of_optional=f",
        ))
        .unwrap();

        assert_eq!(
            options,
            PluginOptions {
                field_casing:              FieldCasing::LowerCamel,
                auto_trim_enum_prefix:     false,
                use_integers_for_enums:    true,
                disable_field_description: true,
                use_none_union_syntax:     false,
            }
        );
    }

    #[test]
    fn later_casing_key_wins() {
        let options =
            parse_parameter(Some("preserving_proto_field_name=false,field_casing=snake_case")).unwrap();
        assert_eq!(options.field_casing, FieldCasing::SnakeCase);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let err = parse_parameter(Some("emit_everything=true")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidParameter { ref key, .. } if key == "emit_everything"));

        let err = parse_parameter(Some("auto_trim_enum_prefix=maybe")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid plugin parameter \"auto_trim_enum_prefix\": expected a boolean, got \"maybe\""
        );

        let err = parse_parameter(Some("field_casing=kebab")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidParameter { .. }));
    }
}
