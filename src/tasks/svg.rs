// src/tasks/svg.rs

//! SVG rewriting shared by `images` and `sprite`.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

fn reader(input: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);
    reader
}

/// Events that never reach the output.
fn is_noise(event: &Event<'_>) -> bool {
    match event {
        Event::Comment(_) | Event::PI(_) | Event::DocType(_) | Event::Decl(_) => true,
        Event::Text(t) => t.iter().all(u8::is_ascii_whitespace),
        _ => false,
    }
}

/// Drop comments, processing instructions, doctype, the XML declaration and
/// whitespace-only text.
pub fn minify_svg(input: &[u8]) -> Result<Vec<u8>> {
    let mut reader = reader(input);
    let mut writer = Writer::new(Vec::with_capacity(input.len()));

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("malformed svg at byte {}", reader.buffer_position()))?;
        match event {
            Event::Eof => break,
            ev if is_noise(&ev) => {}
            ev => writer
                .write_event(ev)
                .map_err(|e| anyhow!("writing svg: {e}"))?,
        }
    }

    Ok(writer.into_inner())
}

/// One icon turned into a `<symbol>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteIcon {
    pub id: String,
    pub svg: Vec<u8>,
}

/// Combine icons into a single inline sprite.
///
/// Each icon's root `<svg>` becomes `<symbol id="..">` keeping its
/// `viewBox`; the children are copied without noise. No XML declaration is
/// emitted so the result can be inlined into HTML.
pub fn build_sprite(icons: &[SpriteIcon]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    let root = BytesStart::new("svg").with_attributes([("xmlns", "http://www.w3.org/2000/svg")]);
    writer
        .write_event(Event::Start(root))
        .map_err(|e| anyhow!("writing sprite: {e}"))?;

    for icon in icons {
        write_symbol(&mut writer, icon).with_context(|| format!("icon '{}'", icon.id))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("svg")))
        .map_err(|e| anyhow!("writing sprite: {e}"))?;
    Ok(writer.into_inner())
}

fn write_symbol(writer: &mut Writer<Vec<u8>>, icon: &SpriteIcon) -> Result<()> {
    let mut reader = reader(&icon.svg);
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader.read_event().context("malformed svg")?;
        match event {
            Event::Eof => break,
            ev if is_noise(&ev) => {}
            Event::Start(start) if depth == 0 => {
                if start.name().as_ref() != b"svg" {
                    bail!("root element is not <svg>");
                }
                seen_root = true;
                depth = 1;
                let mut symbol = BytesStart::new("symbol");
                symbol.push_attribute(("id", icon.id.as_str()));
                if let Some(view_box) = start
                    .try_get_attribute("viewBox")
                    .map_err(|e| anyhow!("reading viewBox: {e}"))?
                {
                    let value = view_box
                        .unescape_value()
                        .map_err(|e| anyhow!("reading viewBox: {e}"))?;
                    symbol.push_attribute(("viewBox", value.as_ref()));
                }
                write(writer, Event::Start(symbol))?;
            }
            Event::Empty(start) if depth == 0 => {
                if start.name().as_ref() != b"svg" {
                    bail!("root element is not <svg>");
                }
                seen_root = true;
                let mut symbol = BytesStart::new("symbol");
                symbol.push_attribute(("id", icon.id.as_str()));
                write(writer, Event::Empty(symbol))?;
            }
            Event::Start(start) => {
                depth += 1;
                write(writer, Event::Start(start))?;
            }
            Event::End(_) if depth == 1 => {
                depth = 0;
                write(writer, Event::End(BytesEnd::new("symbol")))?;
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                write(writer, Event::End(end))?;
            }
            ev if depth > 0 => write(writer, ev)?,
            _ => {}
        }
    }

    if !seen_root {
        bail!("no <svg> element found");
    }
    Ok(())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| anyhow!("writing sprite: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minify_strips_noise() {
        let input = br#"<?xml version="1.0"?>
<!-- generator -->
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
    <path d="M0 0h10"/>
</svg>
"#;
        let out = String::from_utf8(minify_svg(input).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><path d="M0 0h10"/></svg>"#
        );
    }

    #[test]
    fn sprite_wraps_each_icon_in_symbol() {
        let icons = vec![
            SpriteIcon {
                id: "a".into(),
                svg: br#"<svg viewBox="0 0 24 24"><circle r="4"/></svg>"#.to_vec(),
            },
            SpriteIcon {
                id: "b".into(),
                svg: br#"<svg><g><path d="M1 1"/></g></svg>"#.to_vec(),
            },
        ];
        let out = String::from_utf8(build_sprite(&icons).unwrap()).unwrap();
        assert_eq!(
            out,
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg">"#,
                r#"<symbol id="a" viewBox="0 0 24 24"><circle r="4"/></symbol>"#,
                r#"<symbol id="b"><g><path d="M1 1"/></g></symbol>"#,
                "</svg>"
            )
        );
    }

    #[test]
    fn non_svg_icon_is_rejected() {
        let icons = vec![SpriteIcon {
            id: "x".into(),
            svg: b"<html></html>".to_vec(),
        }];
        assert!(build_sprite(&icons).is_err());
    }
}
