// src/config/model.rs

use std::net::{IpAddr, Ipv4Addr};
use std::ops::Deref;
use std::path::PathBuf;

use serde::Deserialize;

use crate::pipeline::TaskId;
use crate::types::TriggerWhileRunningBehaviour;

/// Configuration as read from a TOML file, before validation.
///
/// Every section is optional; the defaults reproduce the usual layout of a
/// static site kept in `docs/` and built into `build/`:
///
/// ```toml
/// [paths]
/// source = "docs"
/// build = "build"
///
/// [server]
/// port = 3000
///
/// [images]
/// webp_quality = 90
///
/// [[watch]]
/// patterns = ["docs/*.html"]
/// tasks = ["html"]
/// reload = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub html: HtmlSection,

    #[serde(default)]
    pub images: ImagesSection,

    #[serde(default)]
    pub sprite: SpriteSection,

    #[serde(default)]
    pub copy: CopySection,

    /// `[[watch]]` bindings. Omitting the key keeps the built-in bindings;
    /// `watch = []` disables watching altogether.
    #[serde(default = "default_watch_bindings")]
    pub watch: Vec<WatchBindingConfig>,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            config: ConfigSection::default(),
            paths: PathsSection::default(),
            server: ServerSection::default(),
            styles: StylesSection::default(),
            scripts: ScriptsSection::default(),
            html: HtmlSection::default(),
            images: ImagesSection::default(),
            sprite: SpriteSection::default(),
            copy: CopySection::default(),
            watch: default_watch_bindings(),
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there. Read access goes
/// through `Deref` to the raw sections.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    inner: RawConfigFile,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(inner: RawConfigFile) -> Self {
        Self { inner }
    }

    /// The built-in configuration used when no config file exists.
    pub fn builtin() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

impl Deref for ConfigFile {
    type Target = RawConfigFile;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// `[config]` section: watch-loop behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of separate runs queued while a run is active. Once
    /// reached, further changes join the last queued run.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Ignore change events whose file content hash did not change.
    #[serde(default = "default_true")]
    pub use_hash: bool,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            use_hash: true,
        }
    }
}

/// `[paths]` section. Both paths are relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default = "default_source")]
    pub source: PathBuf,

    #[serde(default = "default_build")]
    pub build: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            build: default_build(),
        }
    }
}

/// `[server]` section for the development server.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Log the listening address at info level (otherwise debug only).
    #[serde(default)]
    pub log_startup: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: true,
            log_startup: false,
        }
    }
}

/// `[styles]` section. Paths are relative to the source/build roots.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StylesSection {
    #[serde(default = "default_styles_entry")]
    pub entry: PathBuf,

    #[serde(default = "default_styles_output")]
    pub output: PathBuf,

    /// Browserslist queries used for vendor prefixing.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    /// Write `<output>.map` next to the stylesheet and link it.
    #[serde(default = "default_true")]
    pub sourcemap: bool,
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            entry: default_styles_entry(),
            output: default_styles_output(),
            browsers: default_browsers(),
            sourcemap: true,
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptsSection {
    #[serde(default = "default_scripts_entry")]
    pub entry: PathBuf,

    #[serde(default = "default_scripts_output")]
    pub output: PathBuf,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            entry: default_scripts_entry(),
            output: default_scripts_output(),
        }
    }
}

/// `[html]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HtmlSection {
    #[serde(default = "default_html_include")]
    pub include: Vec<String>,
}

impl Default for HtmlSection {
    fn default() -> Self {
        Self {
            include: default_html_include(),
        }
    }
}

/// `[images]` section, shared by the `images` and `createWebp` tasks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagesSection {
    /// Files optimised by `images`.
    #[serde(default = "default_images_include")]
    pub include: Vec<String>,

    /// Files converted by `createWebp`.
    #[serde(default = "default_webp_include")]
    pub webp_include: Vec<String>,

    #[serde(default = "default_webp_quality")]
    pub webp_quality: u8,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// oxipng optimisation preset (0..=6).
    #[serde(default = "default_png_level")]
    pub png_level: u8,
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            include: default_images_include(),
            webp_include: default_webp_include(),
            webp_quality: default_webp_quality(),
            jpeg_quality: default_jpeg_quality(),
            png_level: default_png_level(),
        }
    }
}

/// `[sprite]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpriteSection {
    #[serde(default = "default_sprite_icons")]
    pub icons: String,

    #[serde(default = "default_sprite_output")]
    pub output: PathBuf,
}

impl Default for SpriteSection {
    fn default() -> Self {
        Self {
            icons: default_sprite_icons(),
            output: default_sprite_output(),
        }
    }
}

/// `[copy]` section: static files copied as-is.
///
/// A file matching both lists is excluded.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopySection {
    #[serde(default = "default_copy_include")]
    pub include: Vec<String>,

    #[serde(default = "default_copy_exclude")]
    pub exclude: Vec<String>,
}

impl Default for CopySection {
    fn default() -> Self {
        Self {
            include: default_copy_include(),
            exclude: default_copy_exclude(),
        }
    }
}

/// One `[[watch]]` binding: glob patterns (relative to the project root)
/// mapped to the tasks they re-run.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WatchBindingConfig {
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    pub tasks: Vec<TaskId>,

    /// Ask connected browsers for a full reload once the tasks finished.
    #[serde(default)]
    pub reload: bool,
}

fn default_true() -> bool {
    true
}

fn default_queue_length() -> usize {
    1
}

fn default_source() -> PathBuf {
    PathBuf::from("docs")
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    3000
}

fn default_styles_entry() -> PathBuf {
    PathBuf::from("sass/style.scss")
}

fn default_styles_output() -> PathBuf {
    PathBuf::from("css/style.min.css")
}

fn default_browsers() -> Vec<String> {
    vec!["defaults".to_string()]
}

fn default_scripts_entry() -> PathBuf {
    PathBuf::from("js/script.js")
}

fn default_scripts_output() -> PathBuf {
    PathBuf::from("js/script.min.js")
}

fn default_html_include() -> Vec<String> {
    vec!["*.html".to_string()]
}

fn default_images_include() -> Vec<String> {
    vec!["img/**/*.{png,jpg,svg}".to_string()]
}

fn default_webp_include() -> Vec<String> {
    vec!["img/**/*.{jpg,png}".to_string()]
}

fn default_webp_quality() -> u8 {
    90
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_png_level() -> u8 {
    2
}

fn default_sprite_icons() -> String {
    "img/icon/*.svg".to_string()
}

fn default_sprite_output() -> PathBuf {
    PathBuf::from("img/sprite.svg")
}

fn default_copy_include() -> Vec<String> {
    vec![
        "fonts/*.{woff2,woff}".to_string(),
        "*.ico".to_string(),
        "img/**/*.svg".to_string(),
        "manifest.webmanifest".to_string(),
    ]
}

fn default_copy_exclude() -> Vec<String> {
    vec!["img/icon/*.svg".to_string()]
}

/// Built-in watch bindings: styles, scripts, and html (with reload).
pub fn default_watch_bindings() -> Vec<WatchBindingConfig> {
    vec![
        WatchBindingConfig {
            patterns: vec!["docs/sass/**/*.scss".to_string()],
            exclude: Vec::new(),
            tasks: vec![TaskId::Styles],
            reload: false,
        },
        WatchBindingConfig {
            patterns: vec!["docs/js/script.js".to_string()],
            exclude: Vec::new(),
            tasks: vec![TaskId::Scripts],
            reload: false,
        },
        WatchBindingConfig {
            patterns: vec!["docs/*.html".to_string()],
            exclude: Vec::new(),
            tasks: vec![TaskId::Html],
            reload: true,
        },
    ]
}
