// src/tasks/scripts.rs

use minify_js::{Session, TopLevelMode, minify};
use tracing::info;

use crate::errors::{TaskError, TaskResult};
use crate::pipeline::TaskId;
use crate::tasks::{TaskContext, TaskReport};

/// Minify a script as a classic (non-module) script.
pub fn minify_script(source: &[u8]) -> TaskResult<Vec<u8>> {
    let session = Session::new();
    let mut out = Vec::with_capacity(source.len());
    minify(&session, TopLevelMode::Global, source, &mut out)
        .map_err(|e| TaskError::transform(TaskId::Scripts, format!("{e:?}")))?;
    Ok(out)
}

/// Minify the script entry into its build output.
pub fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    let cfg = &ctx.config.scripts;
    let entry = ctx.paths.source.join(&cfg.entry);
    let dest = ctx.paths.build.join(&cfg.output);

    let source = ctx.read_entry(TaskId::Scripts, &entry)?;
    let minified = minify_script(&source)?;
    ctx.write_output(&dest, &minified)?;

    info!(
        input = source.len(),
        output = minified.len(),
        "minified scripts"
    );
    Ok(TaskReport::new(TaskId::Scripts, vec![dest]))
}
