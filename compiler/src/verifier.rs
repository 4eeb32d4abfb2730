use prost::Message;
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

use std::collections::HashSet;

use crate::error::CompileError;

/// Checks the raw descriptor set before the pool is built.
///
/// Returns `Ok(())` when every requested file is present and every message or
/// enum reference names a type declared somewhere in the set, or the first
/// violation as [CompileError::MissingFile] / [CompileError::MissingType].
pub fn verify_descriptor_set(
    proto_files: &[Vec<u8>],
    file_to_generate: &[String],
) -> Result<(), CompileError> {
    let files = proto_files
        .iter()
        .map(|bytes| FileDescriptorProto::decode(bytes.as_slice()))
        .collect::<Result<Vec<_>, _>>()?;

    // 1) Every requested file must be in the set
    let file_names: HashSet<&str> = files.iter().map(|f| f.name()).collect();
    for name in file_to_generate {
        if !file_names.contains(name.as_str()) {
            return Err(CompileError::MissingFile(name.clone()));
        }
    }

    // 2) Collect every declared type by fully-qualified name
    let mut defined: HashSet<String> = HashSet::new();
    for file in &files {
        let scope = file.package();
        for message in &file.message_type {
            collect_message(scope, message, &mut defined);
        }
        for en in &file.enum_type {
            defined.insert(qualify(scope, en.name()));
        }
    }

    // 3) Check that each typed field refers to a declared type
    for file in &files {
        let scope = file.package();
        for ext in &file.extension {
            check_field(scope, ext, &defined)?;
        }
        for message in &file.message_type {
            check_message(scope, message, &defined)?;
        }
    }

    Ok(())
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

fn collect_message(scope: &str, message: &DescriptorProto, defined: &mut HashSet<String>) {
    let full = qualify(scope, message.name());
    for nested in &message.nested_type {
        collect_message(&full, nested, defined);
    }
    for en in &message.enum_type {
        defined.insert(qualify(&full, en.name()));
    }
    defined.insert(full);
}

fn check_message(scope: &str, message: &DescriptorProto, defined: &HashSet<String>) -> Result<(), CompileError> {
    let full = qualify(scope, message.name());
    for field in message.field.iter().chain(&message.extension) {
        check_field(&full, field, defined)?;
    }
    for nested in &message.nested_type {
        check_message(&full, nested, defined)?;
    }
    Ok(())
}

fn check_field(scope: &str, field: &FieldDescriptorProto, defined: &HashSet<String>) -> Result<(), CompileError> {
    let type_name = field.type_name();
    if type_name.is_empty() {
        return Ok(());
    }
    let wanted = type_name.trim_start_matches('.');
    if defined.contains(wanted) {
        return Ok(());
    }
    Err(CompileError::MissingType {
        type_name:     wanted.to_string(),
        referenced_by: qualify(scope, field.name()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::field_descriptor_proto::{Label, Type};

    fn field(name: &str, type_name: &str) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name:      Some(name.to_string()),
            number:    Some(1),
            label:     Some(Label::Optional as i32),
            r#type:    Some(Type::Message as i32),
            type_name: Some(type_name.to_string()),
            ..Default::default()
        }
    }

    fn file(name: &str, messages: Vec<DescriptorProto>) -> Vec<u8> {
        FileDescriptorProto {
            name:         Some(name.to_string()),
            package:      Some("api.v1".to_string()),
            message_type: messages,
            syntax:       Some("proto3".to_string()),
            ..Default::default()
        }
        .encode_to_vec()
    }

    #[test]
    fn accepts_resolved_and_self_references() {
        let node = DescriptorProto {
            name:  Some("Node".to_string()),
            field: vec![field("parent", ".api.v1.Node")],
            ..Default::default()
        };
        let files = vec![file("a.proto", vec![node])];
        verify_descriptor_set(&files, &["a.proto".to_string()]).unwrap();
    }

    #[test]
    fn reports_missing_type_with_its_referrer() {
        let user = DescriptorProto {
            name:  Some("User".to_string()),
            field: vec![field("address", ".api.v1.Address")],
            ..Default::default()
        };
        let files = vec![file("a.proto", vec![user])];
        let err = verify_descriptor_set(&files, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The type \"api.v1.Address\" is not defined (referenced by api.v1.User.address)"
        );
    }

    #[test]
    fn reports_missing_requested_file() {
        let err = verify_descriptor_set(&[], &["b.proto".to_string()]).unwrap_err();
        assert!(matches!(err, CompileError::MissingFile(ref f) if f == "b.proto"));
    }
}
