// src/tasks/sprite.rs

use tracing::{info, warn};

use crate::errors::{TaskError, TaskResult};
use crate::fs::FileSelection;
use crate::pipeline::TaskId;
use crate::tasks::svg::{SpriteIcon, build_sprite};
use crate::tasks::{TaskContext, TaskReport};

/// Merge every icon into one inline SVG sprite, one `<symbol>` per icon
/// named after its file stem.
pub fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    let cfg = &ctx.config.sprite;
    let selection = FileSelection::include(std::slice::from_ref(&cfg.icons))?;
    let files = selection.collect(ctx.fs.as_ref(), &ctx.paths.source)?;

    if files.is_empty() {
        warn!(pattern = %cfg.icons, "no icons found; sprite not written");
        return Ok(TaskReport::empty(TaskId::Sprite));
    }

    let mut icons = Vec::with_capacity(files.len());
    for file in &files {
        let id = file
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.rel.clone());
        icons.push(SpriteIcon {
            id,
            svg: ctx.fs.read(&file.path)?,
        });
    }
    icons.sort_by(|a, b| a.id.cmp(&b.id));

    let sprite = build_sprite(&icons)
        .map_err(|e| TaskError::transform(TaskId::Sprite, format!("{e:#}")))?;
    let dest = ctx.paths.build.join(&cfg.output);
    ctx.write_output(&dest, &sprite)?;

    info!(icons = icons.len(), output = ?dest, "built sprite");
    Ok(TaskReport::new(TaskId::Sprite, vec![dest]))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::test_support::mock_context;

    #[test]
    fn two_icons_become_one_sprite() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file(
            "/site/docs/img/icon/search.svg",
            r#"<svg viewBox="0 0 24 24"><path d="M1 1"/></svg>"#,
        );
        fs.add_file(
            "/site/docs/img/icon/close.svg",
            r#"<svg viewBox="0 0 16 16"><path d="M2 2"/></svg>"#,
        );
        let ctx = mock_context(fs.clone());

        let report = run(&ctx).unwrap();
        assert_eq!(
            report.build_relative(Path::new("/site/build")),
            vec!["img/sprite.svg"]
        );

        let out = fs.read_to_string(Path::new("/site/build/img/sprite.svg")).unwrap();
        assert!(!out.starts_with("<?xml"));
        let close = out.find(r#"<symbol id="close""#).unwrap();
        let search = out.find(r#"<symbol id="search""#).unwrap();
        assert!(close < search);
        assert_eq!(out.matches("<symbol").count(), 2);
    }

    #[test]
    fn no_icons_writes_nothing() {
        let fs = Arc::new(MockFileSystem::new());
        let ctx = mock_context(fs.clone());
        let report = run(&ctx).unwrap();
        assert!(report.written.is_empty());
        assert!(!fs.exists(Path::new("/site/build/img/sprite.svg")));
    }
}
