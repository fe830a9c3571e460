// src/tasks/html.rs

use minify_html::{Cfg, minify};
use tracing::info;

use crate::errors::TaskResult;
use crate::fs::FileSelection;
use crate::pipeline::TaskId;
use crate::tasks::{TaskContext, TaskReport};

/// Whitespace-collapsing settings; markup structure and comments survive.
fn minify_cfg() -> Cfg {
    let mut cfg = Cfg::new();
    cfg.do_not_minify_doctype = true;
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = true;
    cfg
}

pub fn minify_html(source: &[u8]) -> Vec<u8> {
    minify(source, &minify_cfg())
}

/// Minify top-level HTML pages into the build root.
pub fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    let selection = FileSelection::include(&ctx.config.html.include)?;
    let pages = selection.collect(ctx.fs.as_ref(), &ctx.paths.source)?;

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let source = ctx.fs.read(&page.path)?;
        let dest = ctx.paths.build.join(&page.rel);
        ctx.write_output(&dest, &minify_html(&source))?;
        written.push(dest);
    }

    info!(pages = written.len(), "minified html");
    Ok(TaskReport::new(TaskId::Html, written))
}
