//! Script stage: syntax-check and concatenate custom scripts.
//!
//! Files matched by `scripts.source` are read in sorted relative-path order,
//! parsed with oxc as classic (non-module) scripts, and joined with `\n`.
//! A syntax error anywhere fails the stage before anything is written.
//! Outputs of any stage are never read back as sources, so a bundle written
//! inside its own source glob is not concatenated into itself.

use std::fs;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::output::OutputWriter;
use super::{Stage, StageError, StageOutput};
use crate::config::ProjectConfig;
use crate::source::SourceGlob;
use crate::utils::path::to_slash;
use crate::{debug, log};

/// Concatenate the configured scripts into the bundle.
pub fn concatenate(
    config: &ProjectConfig,
    writer: &OutputWriter,
) -> Result<StageOutput, StageError> {
    let scripts = &config.scripts;
    let glob = SourceGlob::new(&config.root, &scripts.source)?;
    let derived = config.derived_outputs();
    let mut files = glob.resolve();
    files.retain(|file| !derived.contains(&file.path));

    if files.is_empty() {
        log!("scripts"; "no files match {}", scripts.source);
    }

    let mut sources = Vec::with_capacity(files.len());
    let mut issues = Vec::new();
    for file in &files {
        let source = fs::read_to_string(&file.path).map_err(|source| StageError::Read {
            path: file.path.clone(),
            source,
        })?;
        let name = to_slash(&file.relative);
        issues.extend(
            check_syntax(&source)
                .into_iter()
                .map(|message| format!("{name}: {message}")),
        );
        sources.push(source);
    }

    if !issues.is_empty() {
        return Err(StageError::Syntax(issues));
    }

    let bundle = join_sources(&sources);
    debug!("scripts"; "joined {} file(s), {} bytes", files.len(), bundle.len());

    let mut output = StageOutput::new(Stage::Scripts);
    output.inputs = files.into_iter().map(|f| f.path).collect();

    // Minify first: a bundle that only breaks once joined (a `'use strict'`
    // file ahead of sloppy code) must leave both outputs untouched.
    let minified = if scripts.minify {
        let minified = minify_script(&bundle).ok_or_else(|| {
            StageError::Syntax(vec![format!("{}: bundle does not parse", scripts.file)])
        })?;
        Some(minified)
    } else {
        None
    };

    let js_path = scripts.output_js();
    let outcome = writer
        .write_text(&js_path, &bundle)
        .map_err(|source| StageError::Write {
            path: js_path.clone(),
            source,
        })?;
    output.record(js_path, outcome);

    if let Some(minified) = minified {
        let min_path = scripts.output_min_js();
        let outcome = writer
            .write_text(&min_path, &minified)
            .map_err(|source| StageError::Write {
                path: min_path.clone(),
                source,
            })?;
        output.record(min_path, outcome);
    }

    Ok(output)
}

/// Join file contents with a newline between each pair.
pub fn join_sources<S: AsRef<str>>(sources: &[S]) -> String {
    let len = sources.iter().map(|s| s.as_ref().len() + 1).sum();
    let mut out = String::with_capacity(len);
    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(source.as_ref());
    }
    out
}

/// Parse a classic script, returning its syntax error messages.
pub fn check_syntax(source: &str) -> Vec<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    ret.errors.iter().map(ToString::to_string).collect()
}

/// Minify a classic script. Returns `None` if it does not parse.
pub fn minify_script(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}
