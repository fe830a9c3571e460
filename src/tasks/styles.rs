// src/tasks/styles.rs

use std::io;
use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use tracing::{debug, info};

use crate::errors::{TaskError, TaskResult};
use crate::fs::FileSystem;
use crate::pipeline::TaskId;
use crate::tasks::{TaskContext, TaskReport};

/// Lets the Sass compiler resolve imports through our [`FileSystem`].
#[derive(Debug)]
struct SassFs<'a>(&'a dyn FileSystem);

impl grass::Fs for SassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.0.read(path).map_err(|e| io::Error::other(e.to_string()))
    }
}

fn transform_err(err: impl std::fmt::Display) -> TaskError {
    TaskError::transform(TaskId::Styles, err.to_string())
}

/// Compile a Sass entry file to plain CSS.
pub fn compile_sass(fs: &dyn FileSystem, entry: &Path) -> TaskResult<String> {
    let sass_fs = SassFs(fs);
    let mut options = grass::Options::default()
        .fs(&sass_fs)
        .style(grass::OutputStyle::Expanded);
    if let Some(dir) = entry.parent() {
        options = options.load_path(dir);
    }
    grass::from_path(entry, &options).map_err(transform_err)
}

/// Resolve browserslist queries into lightningcss targets.
pub fn browser_targets(queries: &[String]) -> TaskResult<Targets> {
    let browsers =
        Browsers::from_browserslist(queries.iter().map(String::as_str)).map_err(transform_err)?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Minified stylesheet and, when requested, its JSON source map.
#[derive(Debug, Clone)]
pub struct MinifiedCss {
    pub code: String,
    pub map: Option<String>,
}

fn source_map_err(err: parcel_sourcemap::SourceMapError) -> TaskError {
    transform_err(format!("source map: {err:?}"))
}

/// Add vendor prefixes for `targets` and minify.
///
/// With `map_source` set, a source map is produced that points back into
/// `css` under that name; the CSS itself is embedded as the source content
/// since the Sass compiler emits no map of its own.
pub fn prefix_and_minify(
    css: &str,
    targets: Targets,
    map_source: Option<&str>,
) -> TaskResult<MinifiedCss> {
    let parser_options = ParserOptions {
        filename: map_source.unwrap_or_default().to_string(),
        ..ParserOptions::default()
    };
    let mut sheet = StyleSheet::parse(css, parser_options).map_err(transform_err)?;
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(transform_err)?;

    let mut source_map = match map_source {
        Some(name) => {
            let mut map = SourceMap::new("/");
            let index = map.add_source(name);
            map.set_source_content(index as usize, css)
                .map_err(source_map_err)?;
            Some(map)
        }
        None => None,
    };

    let out = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            source_map: source_map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(transform_err)?;

    let map = match source_map.as_mut() {
        Some(map) => Some(map.to_json(None).map_err(source_map_err)?),
        None => None,
    };
    Ok(MinifiedCss {
        code: out.code,
        map,
    })
}

/// `style.min.css` -> `style.min.css.map`.
fn map_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".map");
    dest.with_file_name(name)
}

/// Compile, prefix and minify the stylesheet entry.
pub fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    let cfg = &ctx.config.styles;
    let entry = ctx.paths.source.join(&cfg.entry);
    let dest = ctx.paths.build.join(&cfg.output);

    if !ctx.fs.is_file(&entry) {
        return Err(TaskError::io(
            TaskId::Styles,
            &entry,
            io::Error::new(io::ErrorKind::NotFound, "entry file not found"),
        ));
    }

    let css = compile_sass(ctx.fs.as_ref(), &entry)?;
    debug!(bytes = css.len(), "compiled sass");

    let targets = browser_targets(&cfg.browsers)?;
    let source_name = cfg.entry.to_string_lossy().replace('\\', "/");
    let minified = prefix_and_minify(&css, targets, cfg.sourcemap.then_some(source_name.as_str()))?;

    let mut written = Vec::with_capacity(2);
    match minified.map {
        Some(map) => {
            let map_dest = map_path(&dest);
            let map_name = map_dest.file_name().unwrap_or_default().to_string_lossy();
            let code = format!("{}\n/*# sourceMappingURL={map_name} */\n", minified.code);
            ctx.write_output(&dest, code.as_bytes())?;
            ctx.write_output(&map_dest, map.as_bytes())?;
            info!(output = ?dest, bytes = code.len(), "built styles");
            written.push(dest);
            written.push(map_dest);
        }
        None => {
            ctx.write_output(&dest, minified.code.as_bytes())?;
            info!(output = ?dest, bytes = minified.code.len(), "built styles");
            written.push(dest);
        }
    }

    Ok(TaskReport::new(TaskId::Styles, written))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ConfigFile, RawConfigFile};
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::test_support::{mock_context, mock_context_with};

    #[test]
    fn compiles_nested_rules_and_partials() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/sass/_vars.scss", "$accent: #ff0000;");
        fs.add_file(
            "/site/docs/sass/style.scss",
            "@import 'vars';\n.nav {\n  a { color: $accent; }\n}\n",
        );
        let ctx = mock_context(fs.clone());

        run(&ctx).unwrap();
        let out = fs
            .read(Path::new("/site/build/css/style.min.css"))
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(".nav a{color:red}"), "got {out}");
    }

    #[test]
    fn sass_syntax_error_fails_task() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/sass/style.scss", ".a { color: ; ");
        let ctx = mock_context(fs.clone());

        let err = run(&ctx).unwrap_err();
        assert!(matches!(err, TaskError::Transform { task: TaskId::Styles, .. }));
        assert!(!fs.exists(Path::new("/site/build/css/style.min.css")));
    }

    #[test]
    fn old_browsers_get_prefixes() {
        let targets = browser_targets(&["safari 8".to_string()]).unwrap();
        let out = prefix_and_minify(".a { user-select: none; }", targets, None).unwrap();
        assert!(out.code.contains("-webkit-user-select:none"), "got {}", out.code);
        assert!(out.map.is_none());
    }

    #[test]
    fn writes_linked_source_map() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/sass/style.scss", "body {\n  color: red;\n}\n");
        let ctx = mock_context(fs.clone());

        let report = run(&ctx).unwrap();
        assert_eq!(
            report.written,
            vec![
                PathBuf::from("/site/build/css/style.min.css"),
                PathBuf::from("/site/build/css/style.min.css.map"),
            ]
        );

        let css = fs.read_to_string(Path::new("/site/build/css/style.min.css")).unwrap();
        assert_eq!(css, "body{color:red}\n/*# sourceMappingURL=style.min.css.map */\n");

        let map = fs.read_to_string(Path::new("/site/build/css/style.min.css.map")).unwrap();
        assert!(map.contains(r#""version":3"#), "got {map}");
        assert!(map.contains("sass/style.scss"), "got {map}");
        assert!(map.contains(r#""mappings""#), "got {map}");
    }

    #[test]
    fn source_map_can_be_switched_off() {
        let mut raw = RawConfigFile::default();
        raw.styles.sourcemap = false;
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/sass/style.scss", "body { color: red; }");
        let ctx = mock_context_with(fs.clone(), ConfigFile::try_from(raw).unwrap());

        let report = run(&ctx).unwrap();
        assert_eq!(report.written.len(), 1);
        assert_eq!(
            fs.read_to_string(Path::new("/site/build/css/style.min.css")).unwrap(),
            "body{color:red}"
        );
        assert!(!fs.exists(Path::new("/site/build/css/style.min.css.map")));
    }
}
