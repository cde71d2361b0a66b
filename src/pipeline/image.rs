//! Image stage: optimize raw images into the destination tree.
//!
//! Every file matched by `images.source` is written to the same relative
//! path under `images.destination`, as whichever is smaller: the original
//! bytes or the optimized ones.
//!
//! | Format | Optimizer                                   |
//! |--------|---------------------------------------------|
//! | PNG    | oxipng, lossless, preset `optimization_level`|
//! | JPEG   | decode + re-encode at `jpeg_quality`         |
//! | SVG    | usvg normalize + minify                      |
//! | other  | copied verbatim                              |
//!
//! Optimization runs in parallel (rayon); writes are sequential. A blake3
//! cache skips sources that have not changed since their last optimization
//! under the same `optimization_level` and `jpeg_quality`.

use std::fs;
use std::io::Cursor;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::metadata::Orientation;
use image::{DynamicImage, ExtendedColorType, ImageDecoder};
use rayon::prelude::*;

use super::output::OutputWriter;
use super::{Stage, StageError, StageOutput};
use crate::config::{ImagesConfig, ProjectConfig};
use crate::freshness::{ContentHash, ImageCache};
use crate::logger::ProgressLine;
use crate::source::{SourceFile, SourceGlob};
use crate::utils::path::to_slash;
use crate::{debug, log};

/// Image kinds the stage knows how to optimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Svg,
    Other,
}

impl ImageKind {
    pub fn from_path(path: &std::path::Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => Self::Png,
            Some("jpg" | "jpeg") => Self::Jpeg,
            Some("svg") => Self::Svg,
            _ => Self::Other,
        }
    }
}

/// A source waiting to be optimized.
struct Pending {
    file: SourceFile,
    key: String,
    hash: ContentHash,
    bytes: Vec<u8>,
}

/// Optimize every configured raw image.
pub fn optimize(config: &ProjectConfig, writer: &OutputWriter) -> Result<StageOutput, StageError> {
    let images = &config.images;
    let glob = SourceGlob::new(&config.root, &images.source)?;
    let files = glob.resolve();

    let mut output = StageOutput::new(Stage::Images);
    output.inputs = files.iter().map(|f| f.path.clone()).collect();

    let mut cache = ImageCache::load(&config.root, &images.fingerprint());
    let keys: Vec<String> = files.iter().map(|f| to_slash(&f.relative)).collect();
    cache.retain(|key| keys.iter().any(|k| k == key));

    let mut pending = Vec::new();
    for (file, key) in files.into_iter().zip(keys) {
        let bytes = fs::read(&file.path).map_err(|source| StageError::Read {
            path: file.path.clone(),
            source,
        })?;
        let hash = ContentHash::of(&bytes);
        let target = images.destination.join(&file.relative);

        if cache.is_fresh(&key, hash) && target.exists() {
            output.unchanged += 1;
            continue;
        }
        pending.push(Pending {
            file,
            key,
            hash,
            bytes,
        });
    }

    if pending.is_empty() {
        save_cache(&mut cache);
        return Ok(output);
    }

    let progress = ProgressLine::new(&[("images", pending.len())]);
    let results: Vec<(Pending, Vec<u8>)> = pending
        .into_par_iter()
        .map(|item| {
            let best = optimize_bytes(ImageKind::from_path(&item.file.path), &item.bytes, images)
                .unwrap_or_else(|e| {
                    debug!("images"; "{}: keeping original ({})", item.key, e);
                    item.bytes.clone()
                });
            progress.inc("images");
            (item, best)
        })
        .collect();
    progress.finish();

    let mut saved = 0u64;
    for (item, best) in results {
        let target = images.destination.join(&item.file.relative);
        saved += item.bytes.len().saturating_sub(best.len()) as u64;

        let outcome = writer
            .write_bytes(&target, &best)
            .map_err(|source| StageError::Write {
                path: target.clone(),
                source,
            })?;
        cache.record(&item.key, item.hash);
        output.record(target, outcome);
    }

    if saved > 0 {
        log!("images"; "saved {}", format_bytes(saved));
    }
    save_cache(&mut cache);
    Ok(output)
}

fn save_cache(cache: &mut ImageCache) {
    if let Err(e) = cache.save() {
        log!("images"; "failed to save cache: {:#}", e);
    }
}

/// Optimize one image, returning the smaller of original and optimized.
pub fn optimize_bytes(
    kind: ImageKind,
    bytes: &[u8],
    options: &ImagesConfig,
) -> Result<Vec<u8>, String> {
    let optimized = match kind {
        ImageKind::Png => optimize_png(bytes, options.optimization_level)?,
        ImageKind::Jpeg => optimize_jpeg(bytes, options.jpeg_quality)?,
        ImageKind::Svg => optimize_svg(bytes)?,
        ImageKind::Other => return Ok(bytes.to_vec()),
    };

    if optimized.len() < bytes.len() {
        Ok(optimized)
    } else {
        Ok(bytes.to_vec())
    }
}

fn optimize_png(bytes: &[u8], level: u8) -> Result<Vec<u8>, String> {
    oxipng::optimize_from_memory(bytes, &oxipng::Options::from_preset(level)).map_err(|e| e.to_string())
}

/// Re-encode a JPEG. Files carrying an EXIF rotation or an ICC profile are
/// returned as is, since the encoder writes neither back.
fn optimize_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, String> {
    let mut decoder = JpegDecoder::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let rotated = decoder
        .orientation()
        .is_ok_and(|orientation| orientation != Orientation::NoTransforms);
    let profiled = decoder.icc_profile().is_ok_and(|profile| profile.is_some());
    if rotated || profiled {
        return Ok(bytes.to_vec());
    }

    let rgb = DynamicImage::from_decoder(decoder)
        .map_err(|e| e.to_string())?
        .to_rgb8();

    let mut out = Cursor::new(Vec::with_capacity(bytes.len()));
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| e.to_string())?;
    Ok(out.into_inner())
}

/// Elements usvg cannot round-trip without a font database or a script host.
const SVG_PASSTHROUGH_ELEMENTS: &[&str] = &["<text", "<script", "<foreignObject"];

fn optimize_svg(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let source = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    if SVG_PASSTHROUGH_ELEMENTS.iter().any(|tag| source.contains(tag)) {
        return Ok(bytes.to_vec());
    }

    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default()).map_err(|e| e.to_string())?;
    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };
    Ok(tree.to_string(&write_options).into_bytes())
}

fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MiB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KiB", b as f64 / 1024.0),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LineEnding, test_project_config};
    use image::{ImageBuffer, Rgb, Rgba};
    use std::path::Path;
    use tempfile::TempDir;

    fn png_bytes() -> Vec<u8> {
        // A flat image saved without compression tuning leaves room for oxipng.
        let img: ImageBuffer<Rgba<u8>, _> = ImageBuffer::from_pixel(64, 64, Rgba([200, 30, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, _> =
            ImageBuffer::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, 100)
            .encode(img.as_raw(), 64, 64, ExtendedColorType::Rgb8)
            .unwrap();
        out.into_inner()
    }

    const SVG: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported by an editor -->
<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
    <g>
        <rect x="2" y="2" width="20" height="20" fill="#ff0000"/>
    </g>
</svg>
"##;

    fn write_raw(root: &Path, rel: &str, bytes: &[u8]) {
        let path = root.join("assets/images/raw").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(ImageKind::from_path(Path::new("a.PNG")), ImageKind::Png);
        assert_eq!(ImageKind::from_path(Path::new("a.jpeg")), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_path(Path::new("a.svg")), ImageKind::Svg);
        assert_eq!(ImageKind::from_path(Path::new("a.gif")), ImageKind::Other);
    }

    #[test]
    fn test_never_larger_than_original() {
        let options = ImagesConfig::default();
        for (kind, bytes) in [
            (ImageKind::Png, png_bytes()),
            (ImageKind::Jpeg, jpeg_bytes()),
            (ImageKind::Svg, SVG.as_bytes().to_vec()),
        ] {
            let best = optimize_bytes(kind, &bytes, &options).unwrap();
            assert!(best.len() <= bytes.len(), "{kind:?} grew");
        }
    }

    #[test]
    fn test_svg_is_minified() {
        let best = optimize_bytes(ImageKind::Svg, SVG.as_bytes(), &ImagesConfig::default()).unwrap();
        let text = String::from_utf8(best).unwrap();
        assert!(!text.contains("exported by an editor"));
        assert!(text.contains("viewBox"));
    }

    #[test]
    fn test_svg_with_text_passes_through() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><text x="0" y="10">Hi</text></svg>"#;
        let best = optimize_bytes(ImageKind::Svg, svg.as_bytes(), &ImagesConfig::default()).unwrap();
        assert_eq!(best, svg.as_bytes());
    }

    #[test]
    fn test_other_is_verbatim() {
        let gif = b"GIF89a\x01\x00\x01\x00";
        let best = optimize_bytes(ImageKind::Other, gif, &ImagesConfig::default()).unwrap();
        assert_eq!(best, gif);
    }

    #[test]
    fn test_corrupt_png_is_error() {
        assert!(optimize_bytes(ImageKind::Png, b"not a png", &ImagesConfig::default()).is_err());
    }

    #[test]
    fn test_optimize_mirrors_tree_and_caches() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), "logo.png", &png_bytes());
        write_raw(dir.path(), "icons/box.svg", SVG.as_bytes());
        write_raw(dir.path(), "anim.gif", b"GIF89a");
        write_raw(dir.path(), "notes.txt", b"not an image");
        let config = test_project_config(dir.path(), "");
        let writer = OutputWriter::new(LineEnding::Lf);

        let output = optimize(&config, &writer).unwrap();
        assert_eq!(output.written.len(), 3);
        assert!(config.images.destination.join("logo.png").exists());
        assert!(config.images.destination.join("icons/box.svg").exists());
        assert!(config.images.destination.join("anim.gif").exists());
        assert!(!config.images.destination.join("notes.txt").exists());

        // unchanged sources are skipped through the cache
        let again = optimize(&config, &writer).unwrap();
        assert!(again.is_unchanged());
        assert_eq!(again.unchanged, 3);
    }

    #[test]
    fn test_deleted_output_is_regenerated() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), "anim.gif", b"GIF89a");
        let config = test_project_config(dir.path(), "");
        let writer = OutputWriter::new(LineEnding::Lf);

        optimize(&config, &writer).unwrap();
        let target = config.images.destination.join("anim.gif");
        fs::remove_file(&target).unwrap();

        let output = optimize(&config, &writer).unwrap();
        assert_eq!(output.written, vec![target]);
    }

    /// Insert an EXIF APP1 segment with the given orientation after SOI.
    fn with_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
        let mut exif = b"Exif\0\0MM\0\x2a\0\0\0\x08".to_vec();
        exif.extend_from_slice(&[0, 1]); // one IFD entry
        exif.extend_from_slice(&[0x01, 0x12, 0, 3, 0, 0, 0, 1, 0, orientation, 0, 0]);
        exif.extend_from_slice(&[0, 0, 0, 0]); // no next IFD

        let len = (exif.len() + 2) as u16;
        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xff, 0xe1]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&exif);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_rotated_jpeg_kept_as_is() {
        let rotated = with_orientation(&jpeg_bytes(), 6);
        let options = ImagesConfig {
            jpeg_quality: 20,
            ..ImagesConfig::default()
        };
        assert_eq!(optimize_bytes(ImageKind::Jpeg, &rotated, &options).unwrap(), rotated);

        // an upright tag does not block re-encoding
        let upright = with_orientation(&jpeg_bytes(), 1);
        assert!(optimize_bytes(ImageKind::Jpeg, &upright, &options).unwrap().len() < upright.len());
    }

    #[test]
    fn test_quality_change_reoptimizes() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), "photo.jpg", &jpeg_bytes());
        let writer = OutputWriter::new(LineEnding::Lf);

        let config = test_project_config(dir.path(), "[images]\njpeg_quality = 90");
        optimize(&config, &writer).unwrap();
        let target = config.images.destination.join("photo.jpg");
        let high = fs::read(&target).unwrap();

        let config = test_project_config(dir.path(), "[images]\njpeg_quality = 20");
        let output = optimize(&config, &writer).unwrap();
        assert_eq!(output.written, vec![target.clone()]);
        assert!(fs::read(&target).unwrap().len() < high.len());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
