// src/tasks/webp.rs

use image::DynamicImage;
use tracing::info;

use crate::errors::{TaskError, TaskResult};
use crate::fs::FileSelection;
use crate::pipeline::TaskId;
use crate::tasks::{TaskContext, TaskReport};

/// Encode a decoded raster image as lossy WebP.
pub fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    // The encoder only accepts 8-bit RGB/RGBA.
    let converted;
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other => {
            converted = DynamicImage::ImageRgba8(other.to_rgba8());
            &converted
        }
    };
    let encoder = ::webp::Encoder::from_image(img).map_err(str::to_string)?;
    Ok(encoder.encode(f32::from(quality)).to_vec())
}

/// Write a `.webp` sibling for every selected raster image.
pub fn run(ctx: &TaskContext) -> TaskResult<TaskReport> {
    let cfg = &ctx.config.images;
    let selection = FileSelection::include(&cfg.webp_include)?;
    let files = selection.collect(ctx.fs.as_ref(), &ctx.paths.source)?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let fail = |msg: String| {
            TaskError::transform(TaskId::CreateWebp, format!("{}: {msg}", file.rel))
        };
        let data = ctx.fs.read(&file.path)?;
        let img = image::load_from_memory(&data).map_err(|e| fail(e.to_string()))?;
        let encoded = encode_webp(&img, cfg.webp_quality).map_err(fail)?;

        let dest = ctx.paths.build.join(&file.rel).with_extension("webp");
        ctx.write_output(&dest, &encoded)?;
        written.push(dest);
    }

    info!(images = written.len(), quality = cfg.webp_quality, "created webp images");
    Ok(TaskReport::new(TaskId::CreateWebp, written))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Arc;

    use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::test_support::mock_context;

    fn jpeg_bytes() -> Vec<u8> {
        let img: RgbImage = ImageBuffer::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn webp_output_has_riff_header() {
        let img = image::load_from_memory(&jpeg_bytes()).unwrap();
        let out = encode_webp(&img, 90).unwrap();
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");
    }

    #[test]
    fn nested_images_keep_their_directory() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/site/docs/img/photos/sea.jpg", jpeg_bytes());
        fs.add_file("/site/docs/img/logo.svg", "<svg/>");
        let ctx = mock_context(fs.clone());

        let report = run(&ctx).unwrap();
        assert_eq!(
            report.build_relative(Path::new("/site/build")),
            vec!["img/photos/sea.webp"]
        );
        assert!(fs.is_file(Path::new("/site/build/img/photos/sea.webp")));
    }
}
