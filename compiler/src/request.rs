//! protoc plugin protocol.
//!
//! The request is decoded with each `proto_file` kept as raw bytes rather
//! than as `prost_types::FileDescriptorProto`, so custom options survive
//! until the descriptor pool can interpret them as extensions.

use prost::Message;
use prost_types::compiler::{code_generator_response, CodeGeneratorResponse};

use crate::error::CompileError;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCodeGeneratorRequest {
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: ::prost::alloc::vec::Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    #[prost(bytes = "vec", repeated, tag = "15")]
    pub proto_file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawFileDescriptorSet {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name:    String,
    pub content: String,
}

pub fn decode_request(bytes: &[u8]) -> Result<RawCodeGeneratorRequest, CompileError> {
    Ok(RawCodeGeneratorRequest::decode(bytes)?)
}

/// Builds a request from a serialized `FileDescriptorSet`, the way protoc's
/// `--descriptor_set_out` writes it.
pub fn request_from_descriptor_set(
    descriptor_set: &[u8],
    file_to_generate: Vec<String>,
    parameter: Option<String>,
) -> Result<RawCodeGeneratorRequest, CompileError> {
    let set = RawFileDescriptorSet::decode(descriptor_set)?;
    Ok(RawCodeGeneratorRequest {
        file_to_generate,
        parameter,
        proto_file: set.file,
    })
}

/// Re-wraps the request's files as a `FileDescriptorSet` for the pool.
pub fn descriptor_set_bytes(request: &RawCodeGeneratorRequest) -> Vec<u8> {
    RawFileDescriptorSet { file: request.proto_file.clone() }.encode_to_vec()
}

pub fn success_response(files: Vec<GeneratedFile>) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        file: files
            .into_iter()
            .map(|f| code_generator_response::File {
                name:                Some(f.name),
                insertion_point:     None,
                content:             Some(f.content),
                generated_code_info: None,
            })
            .collect(),
        supported_features: Some(code_generator_response::Feature::Proto3Optional as u64),
        ..Default::default()
    }
}

/// A failed run reports through `error` and carries no files.
pub fn error_response(err: &CompileError) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        error: Some(err.to_string()),
        supported_features: Some(code_generator_response::Feature::Proto3Optional as u64),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_become_error_responses() {
        let err = CompileError::MissingFile("a.proto".to_string());
        let response = error_response(&err);
        assert!(response.file.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("File \"a.proto\" was requested for generation but is not in the descriptor set")
        );
        assert_eq!(response.supported_features, Some(1));
    }

    #[test]
    fn malformed_bytes_fail_to_decode() {
        let err = decode_request(&[0x0a, 0xff]).unwrap_err();
        assert!(matches!(err, CompileError::MalformedRequest(_)));
    }
}
