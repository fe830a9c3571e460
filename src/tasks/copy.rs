// src/tasks/copy.rs

use tracing::info;

use crate::errors::TaskResult;
use crate::fs::FileSelection;
use crate::pipeline::TaskId;
use crate::tasks::{TaskContext, TaskReport};

/// Copy static files verbatim, keeping their path relative to the source
/// root. Returns only after every file has been written.
pub fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    let cfg = &ctx.config.copy;
    let selection = FileSelection::new(&cfg.include, &cfg.exclude)?;
    let files = selection.collect(ctx.fs.as_ref(), &ctx.paths.source)?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let dest = ctx.paths.build.join(&file.rel);
        let data = ctx.fs.read(&file.path)?;
        ctx.write_output(&dest, &data)?;
        written.push(dest);
    }

    info!(files = written.len(), "copied static files");
    Ok(TaskReport::new(TaskId::Copy, written))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::test_support::mock_context;

    #[test]
    fn copies_included_files_and_skips_icons() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/fonts/a.woff2", "font");
        fs.add_file("/site/docs/fonts/a.ttf", "ttf");
        fs.add_file("/site/docs/favicon.ico", "ico");
        fs.add_file("/site/docs/img/logo.svg", "<svg/>");
        fs.add_file("/site/docs/img/icon/x.svg", "<svg/>");
        fs.add_file("/site/docs/manifest.webmanifest", "{}");
        let ctx = mock_context(fs.clone());

        let report = run(&ctx).unwrap();
        let mut got = report.build_relative(Path::new("/site/build"));
        got.sort();
        assert_eq!(
            got,
            vec![
                "favicon.ico",
                "fonts/a.woff2",
                "img/logo.svg",
                "manifest.webmanifest"
            ]
        );
        assert!(!fs.exists(Path::new("/site/build/img/icon/x.svg")));
        assert_eq!(
            fs.read(&PathBuf::from("/site/build/fonts/a.woff2")).unwrap(),
            b"font".to_vec()
        );
    }

    #[test]
    fn nothing_matched_writes_nothing() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/readme.txt", "x");
        let ctx = mock_context(fs.clone());

        let report = run(&ctx).unwrap();
        assert!(report.written.is_empty());
    }
}
