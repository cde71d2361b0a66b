//! Style stage: Sass entry to prefixed CSS with a source map.
//!
//! ```text
//! layout.scss ─grass─> css ─parse─> merge @media ─minify(targets)─> print
//!                                                                  ├─ layout.css (+ sourceMappingURL)
//!                                                                  ├─ layout.css.map
//!                                                                  └─ layout.min.css (optional)
//! ```
//!
//! The map points into grass's expanded output, not the `.scss` sources, so
//! that output is embedded as `sourcesContent` under a virtual
//! `brisk:///<entry>.css` name.

use std::io;
use std::path::{Path, PathBuf};

use grass::{Fs, OutputStyle, StdFs};
use lightningcss::rules::{CssRule, CssRuleList, media::MediaRule};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use parcel_sourcemap::SourceMap;
use parking_lot::Mutex;

use super::output::OutputWriter;
use super::{Stage, StageError, StageOutput};
use crate::config::ProjectConfig;
use crate::debug;
use crate::utils::path::to_slash;

/// Compile the configured entry stylesheet.
pub fn compile(config: &ProjectConfig, writer: &OutputWriter) -> Result<StageOutput, StageError> {
    let styles = &config.styles;
    if !styles.entry.is_file() {
        return Err(StageError::MissingEntry(config.root_relative(&styles.entry)));
    }

    let (css, inputs) = compile_sass(&styles.entry, &styles.load_paths)?;
    debug!("styles"; "{} read {} file(s)", styles.entry.display(), inputs.len());

    let css_path = styles.output_css();
    let map_path = css_path.with_extension("css.map");
    let source_name = compiled_source_name(&config.root_relative(&styles.entry));

    let processed = postprocess(
        &css,
        &PostprocessOptions {
            filename: &source_name,
            targets: resolve_targets(&styles.browsers)?,
            merge_media_queries: styles.merge_media_queries,
            source_map: styles.source_map,
            minify: styles.minify,
        },
    )?;

    let mut output = StageOutput::new(Stage::Styles);
    output.inputs = inputs;

    let mut css = processed.css;
    if let Some(map) = &processed.map {
        let map_name = map_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        css.push_str(&format!("\n/*# sourceMappingURL={map_name} */\n"));
        let outcome = write(writer, &map_path, map)?;
        output.record(map_path, outcome);
    } else {
        css.push('\n');
    }

    let outcome = write(writer, &css_path, &css)?;
    output.record(css_path.clone(), outcome);

    if let Some(minified) = processed.minified {
        let min_path = css_path.with_extension("min.css");
        let outcome = write(writer, &min_path, &minified)?;
        output.record(min_path, outcome);
    }

    Ok(output)
}

/// Virtual map source for the compiled entry, e.g. `brisk:///assets/sass/layout.css`.
fn compiled_source_name(entry: &Path) -> String {
    format!("brisk:///{}", to_slash(&entry.with_extension("css")))
}

fn write(
    writer: &OutputWriter,
    path: &Path,
    content: &str,
) -> Result<super::output::WriteOutcome, StageError> {
    writer.write_text(path, content).map_err(|source| StageError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// Sass
// =============================================================================

/// Filesystem adapter that records every file the compiler reads.
#[derive(Debug, Default)]
struct RecordingFs {
    read: Mutex<Vec<PathBuf>>,
}

impl Fs for RecordingFs {
    fn is_dir(&self, path: &Path) -> bool {
        StdFs.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        StdFs.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = StdFs.read(path)?;
        self.read.lock().push(path.to_path_buf());
        Ok(bytes)
    }
}

/// Compile Sass to expanded CSS, returning the transitive import set.
fn compile_sass(entry: &Path, load_paths: &[PathBuf]) -> Result<(String, Vec<PathBuf>), StageError> {
    let fs = RecordingFs::default();

    let mut options = grass::Options::default()
        .fs(&fs)
        .style(OutputStyle::Expanded);
    if let Some(dir) = entry.parent() {
        options = options.load_path(dir);
    }
    for path in load_paths {
        options = options.load_path(path);
    }

    let css = grass::from_path(entry, &options).map_err(|e| StageError::Sass(e.to_string()))?;

    let mut inputs = fs.read.into_inner();
    inputs.sort();
    inputs.dedup();
    Ok((css, inputs))
}

// =============================================================================
// CSS post-processing
// =============================================================================

pub struct PostprocessOptions<'a> {
    /// Source name recorded in the map; the input CSS is embedded under it.
    pub filename: &'a str,
    pub targets: Targets,
    pub merge_media_queries: bool,
    pub source_map: bool,
    pub minify: bool,
}

#[derive(Debug)]
pub struct Processed {
    pub css: String,
    pub map: Option<String>,
    pub minified: Option<String>,
}

/// Resolve browserslist queries to lightningcss targets.
pub fn resolve_targets(browsers: &[String]) -> Result<Targets, StageError> {
    let browsers = Browsers::from_browserslist(browsers.iter().map(String::as_str))
        .map_err(|e| StageError::Css(format!("invalid browserslist query: {e}")))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Prefix, optionally merge media queries, and print CSS (+ map, + minified).
pub fn postprocess(css: &str, options: &PostprocessOptions<'_>) -> Result<Processed, StageError> {
    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: options.filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| StageError::Css(e.to_string()))?;

    if options.merge_media_queries {
        merge_media_queries(&mut sheet.rules);
    }

    sheet
        .minify(MinifyOptions {
            targets: options.targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| StageError::Css(e.to_string()))?;

    let mut source_map = if options.source_map {
        let mut map = SourceMap::new("/");
        let index = map.add_source(options.filename);
        map.set_source_content(index as usize, css)
            .map_err(|e| StageError::Css(format!("source map: {e}")))?;
        Some(map)
    } else {
        None
    };

    let printed = sheet
        .to_css(PrinterOptions {
            source_map: source_map.as_mut(),
            targets: options.targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| StageError::Css(e.to_string()))?;

    let map = match source_map.as_mut() {
        Some(map) => Some(
            map.to_json(None)
                .map_err(|e| StageError::Css(format!("source map: {e}")))?,
        ),
        None => None,
    };

    let minified = if options.minify {
        let printed = sheet
            .to_css(PrinterOptions {
                minify: true,
                targets: options.targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| StageError::Css(e.to_string()))?;
        Some(printed.code)
    } else {
        None
    };

    Ok(Processed {
        css: printed.code,
        map,
        minified,
    })
}

/// Merge top-level `@media` blocks with identical queries.
///
/// Merged blocks move after every non-media rule, in order of first
/// appearance; rules inside a block keep their source order.
pub fn merge_media_queries(rules: &mut CssRuleList<'_>) {
    let mut others = Vec::with_capacity(rules.0.len());
    let mut merged: Vec<(String, MediaRule<'_>)> = Vec::new();

    for rule in std::mem::take(&mut rules.0) {
        let CssRule::Media(media) = rule else {
            others.push(rule);
            continue;
        };
        let Ok(key) = media.query.to_css_string(PrinterOptions::default()) else {
            others.push(CssRule::Media(media));
            continue;
        };
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.rules.0.extend(media.rules.0),
            None => merged.push((key, media)),
        }
    }

    others.extend(merged.into_iter().map(|(_, media)| CssRule::Media(media)));
    rules.0 = others;
}
