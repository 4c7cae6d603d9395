//! Transpiler adapter.
//!
//! The grammar work itself is delegated to the oxc source-to-source stack:
//! parse, strip TypeScript, lower JSX to classic `React.createElement`
//! calls, print. The rest of the pipeline treats this as a black box
//! `transpile(source) -> Result<code, TranspileError>`.

use crate::error::CompileError;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{JsxOptions, JsxRuntime, TransformOptions, Transformer};
use std::path::Path;

pub fn transpile(source: &str, unit_id: &str) -> Result<String, CompileError> {
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_typescript(true)
        .with_jsx(true)
        .with_module(true);

    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .take(3)
            .map(|e| format!("{:?}", e))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CompileError::TranspileError {
            unit_id: unit_id.to_string(),
            message: if message.is_empty() {
                "parser gave up on the input".to_string()
            } else {
                message
            },
        });
    }

    let mut program = ret.program;
    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();

    let options = TransformOptions {
        jsx: JsxOptions {
            runtime: JsxRuntime::Classic,
            pragma: Some("React.createElement".to_string()),
            pragma_frag: Some("React.Fragment".to_string()),
            ..JsxOptions::default()
        },
        ..TransformOptions::default()
    };

    let result = Transformer::new(&allocator, Path::new("scene.tsx"), &options)
        .build_with_scoping(scoping, &mut program);
    if !result.errors.is_empty() {
        let message = result
            .errors
            .iter()
            .take(3)
            .map(|e| format!("{:?}", e))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CompileError::TranspileError {
            unit_id: unit_id.to_string(),
            message,
        });
    }

    Ok(Codegen::new().build(&program).code)
}
