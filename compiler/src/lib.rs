//! protoc-gen-pydantic-compiler
//!
//! This crate implements:
//!  1) The protoc plugin protocol (`CodeGeneratorRequest` in, `CodeGeneratorResponse` out),
//!  2) Plugin parameter parsing into `PluginOptions`,
//!  3) A descriptor verifier (requested files present, every type reference defined),
//!  4) The IR builder over a `prost-reflect` descriptor pool,
//!  5) The name resolver (casing, denylists, aliases, collision detection),
//!  6) Type mapping and `buf.validate` constraint translation,
//!  7) Python emission (`gen_python`) plus the per-directory `_proto_types.py` runtime,
//!  8) Error types (`CompileError`).

pub mod error;
pub mod config;
pub mod request;
pub mod verifier;
pub mod builder;
pub mod resolver;
pub mod casing;
pub mod type_mapper;
pub mod constraints;
pub mod options;
pub mod pyliteral;
pub mod runtime;
pub mod gen_python;
pub mod compiler;

pub use compiler::generate;
pub use compiler::generate_from_descriptor_set;
pub use compiler::load_ir;
pub use compiler::run_plugin;
pub use error::CompileError;
pub use request::GeneratedFile;
