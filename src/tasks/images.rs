// src/tasks/images.rs

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageFormat};
use tracing::{debug, info};

use crate::config::model::ImagesSection;
use crate::errors::{TaskError, TaskResult};
use crate::fs::FileSelection;
use crate::pipeline::TaskId;
use crate::tasks::svg::minify_svg;
use crate::tasks::{TaskContext, TaskReport};

fn transform_err(path: &Path, err: impl std::fmt::Display) -> TaskError {
    TaskError::transform(TaskId::Images, format!("{}: {err}", path.display()))
}

/// Lossless PNG optimisation.
pub fn optimize_png(data: &[u8], level: u8) -> Result<Vec<u8>, oxipng::PngError> {
    oxipng::optimize_from_memory(data, &oxipng::Options::from_preset(level))
}

/// Re-encode a JPEG at `quality`; the original is kept if it was smaller.
pub fn recompress_jpeg(data: &[u8], quality: u8) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    if out.len() < data.len() {
        Ok(out)
    } else {
        Ok(data.to_vec())
    }
}

/// Optimise one image according to its extension.
pub fn optimize(path: &Path, data: &[u8], cfg: &ImagesSection) -> TaskResult<Vec<u8>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "png" => optimize_png(data, cfg.png_level).map_err(|e| transform_err(path, e)),
        "jpg" | "jpeg" => recompress_jpeg(data, cfg.jpeg_quality).map_err(|e| transform_err(path, e)),
        "svg" => minify_svg(data).map_err(|e| transform_err(path, format!("{e:#}"))),
        _ => Ok(data.to_vec()),
    }
}

/// Optimise raster and vector images into the build tree.
pub fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    let cfg = &ctx.config.images;
    let selection = FileSelection::include(&cfg.include)?;
    let files = selection.collect(ctx.fs.as_ref(), &ctx.paths.source)?;

    let mut written = Vec::with_capacity(files.len());
    let (mut before, mut after) = (0usize, 0usize);
    for file in files {
        let data = ctx.fs.read(&file.path)?;
        let optimized = optimize(&file.path, &data, cfg)?;
        debug!(file = %file.rel, from = data.len(), to = optimized.len(), "optimised image");
        before += data.len();
        after += optimized.len();

        let dest = ctx.paths.build.join(&file.rel);
        ctx.write_output(&dest, &optimized)?;
        written.push(dest);
    }

    info!(images = written.len(), before, after, "optimised images");
    Ok(TaskReport::new(TaskId::Images, written))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use image::{ImageBuffer, Rgb, RgbImage};

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::test_support::mock_context;

    fn png_bytes() -> Vec<u8> {
        let img: RgbImage = ImageBuffer::from_fn(16, 16, |x, _| Rgb([(x * 8) as u8, 0, 0]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_stays_decodable() {
        let original = png_bytes();
        let optimized = optimize_png(&original, 2).unwrap();
        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn corrupt_png_fails_task() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/img/broken.png", "not a png");
        let ctx = mock_context(fs);
        assert!(matches!(
            run(&ctx),
            Err(TaskError::Transform { task: TaskId::Images, .. })
        ));
    }

    #[test]
    fn builds_png_and_svg_into_img() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/img/a.png", png_bytes());
        fs.add_file("/site/docs/img/icon/b.svg", "<svg>\n  <!-- x -->\n</svg>");
        fs.add_file("/site/docs/img/c.gif", "gif");
        let ctx = mock_context(fs.clone());

        let report = run(&ctx).unwrap();
        let mut got = report.build_relative(Path::new("/site/build"));
        got.sort();
        assert_eq!(got, vec!["img/a.png", "img/icon/b.svg"]);
        assert_eq!(
            fs.read(Path::new("/site/build/img/icon/b.svg")).unwrap(),
            b"<svg></svg>".to_vec()
        );
    }
}
