//! Build script for minifying the embedded live-reload client.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use std::fs;
use std::path::Path;

const OVERLAY_CSS_PLACEHOLDER: &str = "__BRISK_OVERLAY_CSS__";
const WS_PORT_PLACEHOLDER: &str = "__BRISK_WS_PORT__";

fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir);

    minify_livereload_js(
        "src/embed/serve/livereload.js",
        "src/embed/serve/overlay.css",
        &out_path.join("livereload.min.js"),
    );

    println!("cargo:rerun-if-changed=src/embed/serve/livereload.js");
    println!("cargo:rerun-if-changed=src/embed/serve/overlay.css");
}

fn minify_js(source: &str) -> String {
    let allocator = Allocator::default();
    let source_type = SourceType::cjs();

    let ret = Parser::new(&allocator, source, source_type).parse();
    assert!(ret.errors.is_empty(), "Parse errors: {:?}", ret.errors);

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code
}

/// Inline the minified overlay CSS, then minify the client.
///
/// The port placeholder is swapped for a sentinel number before minifying so
/// the parser sees valid JS, then restored for runtime substitution.
fn minify_livereload_js(js_input: &str, css_input: &str, output: &Path) {
    const PORT_SENTINEL: &str = "35729035729";

    let source = fs::read_to_string(js_input).expect("Failed to read livereload.js");
    let css_source = fs::read_to_string(css_input).expect("Failed to read overlay.css");
    let css = escape_template_literal(&minify_css(&css_source));

    assert_eq!(
        source.matches(OVERLAY_CSS_PLACEHOLDER).count(),
        1,
        "livereload.js must contain exactly one {OVERLAY_CSS_PLACEHOLDER} placeholder"
    );
    assert_eq!(
        source.matches(WS_PORT_PLACEHOLDER).count(),
        1,
        "livereload.js must contain exactly one {WS_PORT_PLACEHOLDER} placeholder"
    );

    let source = source
        .replace(OVERLAY_CSS_PLACEHOLDER, &css)
        .replace(WS_PORT_PLACEHOLDER, PORT_SENTINEL);
    let code = minify_js(&source).replace(PORT_SENTINEL, WS_PORT_PLACEHOLDER);
    fs::write(output, code).expect("Failed to write minified livereload JS");
}

fn escape_template_literal(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn minify_css(source: &str) -> String {
    let stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).expect("Failed to parse CSS");
    stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .expect("Failed to minify CSS")
        .code
}
