use prost::Message;
use prost_reflect::DescriptorPool;
use rayon::prelude::*;

use std::collections::{BTreeMap, BTreeSet};

use protoc_gen_pydantic_schema::{FileId, Ir};

use crate::{
    builder::build_ir,
    config::parse_parameter,
    constraints::FIELD_RULES_EXTENSION,
    error::CompileError,
    gen_python::{Generator, RenderedFile},
    options::OptionRegistry,
    request::{
        decode_request, descriptor_set_bytes, error_response, request_from_descriptor_set, success_response,
        GeneratedFile, RawCodeGeneratorRequest,
    },
    resolver::resolve_names,
    runtime::{render_runtime_module, RuntimeSymbol, RUNTIME_MODULE},
    verifier::verify_descriptor_set,
};

pub const PACKAGE_MARKER: &str = "# Generated by protoc-gen-pydantic.\n";

/// Runs one protoc plugin invocation: serialized `CodeGeneratorRequest` in,
/// serialized `CodeGeneratorResponse` out. Failures are reported in the
/// response's `error` field and never carry partial output.
pub fn run_plugin(request: &[u8]) -> Vec<u8> {
    let response = match decode_request(request).and_then(|req| generate(&req)) {
        Ok(files) => success_response(files),
        Err(err) => {
            tracing::debug!(category = ?err.category(), "generation failed: {}", err);
            error_response(&err)
        }
    };
    response.encode_to_vec()
}

/// Compiles a `protoc --descriptor_set_out` file without going through the
/// plugin protocol.
pub fn generate_from_descriptor_set(
    descriptor_set: &[u8],
    file_to_generate: Vec<String>,
    parameter: Option<String>,
) -> Result<Vec<GeneratedFile>, CompileError> {
    let request = request_from_descriptor_set(descriptor_set, file_to_generate, parameter)?;
    generate(&request)
}

/// Decodes the descriptor set and builds the IR without resolving or
/// rendering anything.
pub fn load_ir(request: &RawCodeGeneratorRequest) -> Result<Ir, CompileError> {
    let pool = load_pool(request)?;
    let rules_ext = pool.get_extension_by_name(FIELD_RULES_EXTENSION);
    build_ir(&pool, &request.file_to_generate, rules_ext.as_ref())
}

/// Full pipeline. Output order: modules in request order, then package
/// markers and runtime modules sorted by directory.
#[tracing::instrument(level = "debug", skip_all, fields(files = request.file_to_generate.len()))]
pub fn generate(request: &RawCodeGeneratorRequest) -> Result<Vec<GeneratedFile>, CompileError> {
    // 1) configuration
    let options = parse_parameter(request.parameter.as_deref())?;

    // 2) descriptors into the IR
    let pool = load_pool(request)?;
    let rules_ext = pool.get_extension_by_name(FIELD_RULES_EXTENSION);
    let registry = OptionRegistry::from_pool(&pool);
    let ir = build_ir(&pool, &request.file_to_generate, rules_ext.as_ref())?;

    // 3) global name resolution must finish before any file renders
    let names = resolve_names(&ir, &options)?;

    // 4) per-file rendering
    let generator = Generator {
        ir:       &ir,
        names:    &names,
        options:  &options,
        registry: &registry,
    };
    let rendered = render_all(&generator, &ir, &request.file_to_generate)?;

    // 5) per-directory support files
    let mut directories: BTreeMap<String, BTreeSet<RuntimeSymbol>> = BTreeMap::new();
    for file in &rendered {
        directories
            .entry(file.directory.clone())
            .or_default()
            .extend(file.runtime.iter().copied());
    }

    let mut out: Vec<GeneratedFile> = rendered
        .into_iter()
        .map(|f| GeneratedFile { name: f.path, content: f.content })
        .collect();
    for directory in directories.keys() {
        out.push(GeneratedFile {
            name:    join_path(directory, "__init__.py"),
            content: PACKAGE_MARKER.to_string(),
        });
    }
    for (directory, symbols) in &directories {
        if let Some(content) = render_runtime_module(symbols) {
            out.push(GeneratedFile {
                name: join_path(directory, &format!("{}.py", RUNTIME_MODULE)),
                content,
            });
        }
    }

    tracing::debug!(outputs = out.len(), "generation finished");
    Ok(out)
}

fn load_pool(request: &RawCodeGeneratorRequest) -> Result<DescriptorPool, CompileError> {
    verify_descriptor_set(&request.proto_file, &request.file_to_generate)?;
    Ok(DescriptorPool::decode(descriptor_set_bytes(request).as_slice())?)
}

fn render_all(
    generator: &Generator,
    ir: &Ir,
    file_to_generate: &[String],
) -> Result<Vec<RenderedFile>, CompileError> {
    let ids: Vec<FileId> = file_to_generate
        .iter()
        .map(|name| {
            ir.files_to_generate()
                .find(|(_, unit)| &unit.name == name)
                .map(|(id, _)| id)
                .ok_or_else(|| CompileError::MissingFile(name.clone()))
        })
        .collect::<Result<_, _>>()?;

    ids.par_iter()
        .map(|id| {
            let span = tracing::debug_span!("render", file = %ir.file(*id).name);
            let _enter = span.enter();
            generator.render_file(*id)
        })
        .collect()
}

fn join_path(directory: &str, file: &str) -> String {
    if directory.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", directory, file)
    }
}
