#![allow(dead_code)]

use protox::file::{ChainFileResolver, File, FileResolver, GoogleFileResolver};

use protoc_gen_pydantic_compiler::{generate_from_descriptor_set, CompileError, GeneratedFile};

/// The part of `buf/validate/validate.proto` the generator reads.
pub const VALIDATE_PROTO: &str = r#"
syntax = "proto2";

package buf.validate;

import "google/protobuf/descriptor.proto";
import "google/protobuf/duration.proto";
import "google/protobuf/timestamp.proto";

extend google.protobuf.FieldOptions {
  optional FieldRules field = 1159;
}

message Rule {
  optional string id = 1;
  optional string message = 2;
  optional string expression = 3;
}

message FieldRules {
  repeated Rule cel = 23;
  optional bool required = 25;
  oneof type {
    FloatRules float = 1;
    DoubleRules double = 2;
    Int32Rules int32 = 3;
    Int64Rules int64 = 4;
    UInt32Rules uint32 = 5;
    UInt64Rules uint64 = 6;
    BoolRules bool = 13;
    StringRules string = 14;
    BytesRules bytes = 15;
    EnumRules enum = 16;
    RepeatedRules repeated = 18;
    MapRules map = 19;
    DurationRules duration = 21;
    TimestampRules timestamp = 22;
  }
}

message FloatRules {
  optional float const = 1;
  oneof less_than {
    float lt = 2;
    float lte = 3;
  }
  oneof greater_than {
    float gt = 4;
    float gte = 5;
  }
  repeated float in = 6;
  repeated float not_in = 7;
  optional bool finite = 8;
  repeated float example = 9;
}

message DoubleRules {
  optional double const = 1;
  oneof less_than {
    double lt = 2;
    double lte = 3;
  }
  oneof greater_than {
    double gt = 4;
    double gte = 5;
  }
  repeated double in = 6;
  repeated double not_in = 7;
  optional bool finite = 8;
  repeated double example = 9;
}

message Int32Rules {
  optional int32 const = 1;
  oneof less_than {
    int32 lt = 2;
    int32 lte = 3;
  }
  oneof greater_than {
    int32 gt = 4;
    int32 gte = 5;
  }
  repeated int32 in = 6;
  repeated int32 not_in = 7;
  repeated int32 example = 8;
}

message Int64Rules {
  optional int64 const = 1;
  oneof less_than {
    int64 lt = 2;
    int64 lte = 3;
  }
  oneof greater_than {
    int64 gt = 4;
    int64 gte = 5;
  }
  repeated int64 in = 6;
  repeated int64 not_in = 7;
  repeated int64 example = 9;
}

message UInt32Rules {
  optional uint32 const = 1;
  oneof less_than {
    uint32 lt = 2;
    uint32 lte = 3;
  }
  oneof greater_than {
    uint32 gt = 4;
    uint32 gte = 5;
  }
  repeated uint32 in = 6;
  repeated uint32 not_in = 7;
}

message UInt64Rules {
  optional uint64 const = 1;
  oneof less_than {
    uint64 lt = 2;
    uint64 lte = 3;
  }
  oneof greater_than {
    uint64 gt = 4;
    uint64 gte = 5;
  }
  repeated uint64 in = 6;
  repeated uint64 not_in = 7;
}

message BoolRules {
  optional bool const = 1;
}

message StringRules {
  optional string const = 1;
  optional uint64 len = 19;
  optional uint64 min_len = 2;
  optional uint64 max_len = 3;
  optional string pattern = 6;
  optional string prefix = 7;
  optional string suffix = 8;
  optional string contains = 9;
  repeated string in = 10;
  repeated string not_in = 11;
  oneof well_known {
    bool email = 12;
    bool hostname = 13;
    bool ip = 14;
    bool ipv4 = 15;
    bool ipv6 = 16;
    bool uri = 17;
    bool uuid = 22;
  }
  repeated string example = 34;
}

message BytesRules {
  optional bytes const = 1;
  optional uint64 len = 13;
  optional uint64 min_len = 2;
  optional uint64 max_len = 3;
}

message EnumRules {
  optional int32 const = 1;
  optional bool defined_only = 2;
  repeated int32 in = 3;
  repeated int32 not_in = 4;
}

message RepeatedRules {
  optional uint64 min_items = 1;
  optional uint64 max_items = 2;
  optional bool unique = 3;
}

message MapRules {
  optional uint64 min_pairs = 1;
  optional uint64 max_pairs = 2;
}

message DurationRules {
  optional google.protobuf.Duration const = 2;
  oneof less_than {
    google.protobuf.Duration lt = 3;
    google.protobuf.Duration lte = 4;
  }
  oneof greater_than {
    google.protobuf.Duration gt = 5;
    google.protobuf.Duration gte = 6;
  }
}

message TimestampRules {
  optional google.protobuf.Timestamp const = 2;
  oneof less_than {
    google.protobuf.Timestamp lt = 3;
    google.protobuf.Timestamp lte = 4;
  }
  oneof greater_than {
    google.protobuf.Timestamp gt = 5;
    google.protobuf.Timestamp gte = 6;
  }
}
"#;

/// Serves `.proto` sources from memory.
struct Sources(Vec<(String, String)>);

impl FileResolver for Sources {
    fn open_file(&self, name: &str) -> Result<File, protox::Error> {
        match self.0.iter().find(|(path, _)| path == name) {
            Some((path, source)) => File::from_source(path, source),
            None => Err(protox::Error::file_not_found(name)),
        }
    }
}

/// Compiles `files` (path, source) into a serialized `FileDescriptorSet`
/// with imports and source comments, like `protoc --include_imports
/// --include_source_info --descriptor_set_out`.
pub fn descriptor_set(files: &[(&str, &str)]) -> Vec<u8> {
    let mut sources: Vec<(String, String)> = files
        .iter()
        .map(|(path, source)| (path.to_string(), source.to_string()))
        .collect();
    sources.push(("buf/validate/validate.proto".to_string(), VALIDATE_PROTO.to_string()));

    let mut resolver = ChainFileResolver::new();
    resolver.add(Sources(sources));
    resolver.add(GoogleFileResolver::new());

    let mut compiler = protox::Compiler::with_file_resolver(resolver);
    compiler.include_imports(true);
    compiler.include_source_info(true);
    compiler
        .open_files(files.iter().map(|(path, _)| *path))
        .expect("protox compile failed");
    compiler.encode_file_descriptor_set()
}

/// Runs the generator over `files`, generating every one of them.
pub fn try_generate(files: &[(&str, &str)], parameter: Option<&str>) -> Result<Vec<GeneratedFile>, CompileError> {
    let bytes = descriptor_set(files);
    let names = files.iter().map(|(path, _)| path.to_string()).collect();
    generate_from_descriptor_set(&bytes, names, parameter.map(str::to_string))
}

pub fn generate(files: &[(&str, &str)], parameter: Option<&str>) -> Vec<GeneratedFile> {
    try_generate(files, parameter).expect("generation failed")
}

/// Content of the output named `name`.
pub fn output<'a>(files: &'a [GeneratedFile], name: &str) -> &'a str {
    files
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.content.as_str())
        .unwrap_or_else(|| panic!("no output named {}", name))
}

pub fn output_names(files: &[GeneratedFile]) -> Vec<&str> {
    files.iter().map(|f| f.name.as_str()).collect()
}
