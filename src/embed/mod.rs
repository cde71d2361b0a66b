//! Embedded static resources for brisk.
//!
//! - `serve` - the live-reload client served by `brisk dev`
//! - `init` - files written by `brisk init`
//!
//! ```ignore
//! use embed::serve::{LIVERELOAD_JS, LiveReloadVars};
//!
//! let js = LIVERELOAD_JS.render(&LiveReloadVars { ws_port: 35729 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL path the dev server answers with the live-reload client.
    pub const LIVERELOAD_PATH: &str = "/__brisk/livereload.js";

    /// Variables for livereload.js.
    pub struct LiveReloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for LiveReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__BRISK_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live-reload client, minified by the build script.
    pub const LIVERELOAD_JS: Template<LiveReloadVars> =
        Template::new(include_str!(concat!(env!("OUT_DIR"), "/livereload.min.js")));

    /// Script tag injected into served HTML.
    pub fn script_tag() -> String {
        format!(r#"<script src="{LIVERELOAD_PATH}" async></script>"#)
    }
}

pub mod init {
    use super::{Template, TemplateVars};

    /// Variables for the page script.
    pub struct PageVars {
        /// Scroll offset (px) past which `#scroll-to-top` is shown.
        pub scroll_threshold: u32,
        /// Scroll-to-top animation duration in milliseconds.
        pub scroll_duration: u32,
    }

    impl Default for PageVars {
        fn default() -> Self {
            Self {
                scroll_threshold: 100,
                scroll_duration: 800,
            }
        }
    }

    impl TemplateVars for PageVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__SCROLL_THRESHOLD__", &self.scroll_threshold.to_string())
                .replace("__SCROLL_DURATION__", &self.scroll_duration.to_string())
        }
    }

    /// Default `brisk.toml`.
    pub const CONFIG_TOML: Template<()> = Template::new(include_str!("init/brisk.toml"));

    /// jQuery page script scaffolded into the script sources.
    pub const PAGE_JS: Template<PageVars> = Template::new(include_str!("init/main.js"));

    /// Entry stylesheet placeholder.
    pub const LAYOUT_SCSS: Template<()> = Template::new(include_str!("init/layout.scss"));
}
