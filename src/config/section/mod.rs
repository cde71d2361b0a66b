//! Configuration section definitions.
//!
//! | Section     | Purpose                                       |
//! |-------------|-----------------------------------------------|
//! | `[styles]`  | Sass entry, prefix targets, map and minify    |
//! | `[scripts]` | Script glob, bundle name and minify           |
//! | `[images]`  | Raw image glob, destination and quality       |
//! | `[output]`  | Line endings for text outputs                 |
//! | `[watch]`   | Globs that trigger stages in watch mode       |
//! | `[serve]`   | Dev server, proxy and live reload             |

mod images;
mod output;
mod scripts;
mod serve;
mod styles;
mod watch;

pub use images::ImagesConfig;
pub use output::{LineEnding, OutputConfig};
pub use scripts::ScriptsConfig;
pub use serve::{ServeConfig, parse_proxy_target};
pub use styles::{DEFAULT_BROWSERS, StylesConfig};
pub use watch::WatchConfig;

use std::path::{Path, PathBuf};

/// Resolve a configured path against the project root, expanding `~`.
fn resolve(root: &Path, path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    crate::utils::path::normalize_path(&root.join(expanded))
}
