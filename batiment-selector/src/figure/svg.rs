//! Écriture SVG de la figure

use std::fmt::{self, Write};

use geo::{LineString, MultiPolygon};

use super::{Figure, Layer, Viewport};

/// Sérialise une figure en document SVG autonome
pub fn render(figure: &Figure) -> Result<String, fmt::Error> {
    let mut out = String::with_capacity(4096);
    write_figure(&mut out, figure)?;
    Ok(out)
}

fn write_figure<W: Write>(out: &mut W, figure: &Figure) -> fmt::Result {
    let viewport = figure.viewport();
    let size = viewport.size();
    let axes = viewport.axes_box();
    let id = figure.id().0;

    write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">"#
    )?;
    write!(
        out,
        r#"<rect width="{size}" height="{size}" fill="white"/><clipPath id="axes-{id}"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}"/></clipPath>"#,
        axes.min().x,
        axes.min().y,
        axes.width(),
        axes.height(),
    )?;
    write!(
        out,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif" font-size="16">{}</text>"#,
        f64::from(size) / 2.0,
        viewport.title_height() * 0.65,
        escape_xml(figure.title())
    )?;

    write!(out, r#"<g clip-path="url(#axes-{id})">"#)?;

    for tile in figure.tiles() {
        let (x0, y0) = viewport.data_to_pixel(tile.extent.min().x, tile.extent.max().y);
        let (x1, y1) = viewport.data_to_pixel(tile.extent.max().x, tile.extent.min().y);
        write!(
            out,
            r#"<image href="{}" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" preserveAspectRatio="none"/>"#,
            tile.data_uri,
            x0,
            y0,
            x1 - x0,
            y1 - y0
        )?;
    }

    for layer in figure.layers() {
        write_layer(out, layer, viewport)?;
    }

    out.write_str("</g></svg>")
}

fn write_layer<W: Write>(out: &mut W, layer: &Layer, viewport: &Viewport) -> fmt::Result {
    let style = &layer.style;
    for geometry in &layer.geometries {
        let d = path_data(geometry, viewport);
        if d.is_empty() {
            continue;
        }
        write!(
            out,
            r#"<path d="{}" fill="{}" fill-opacity="{}" fill-rule="evenodd" stroke="{}" stroke-width="{}"/>"#,
            d, style.fill, style.alpha, style.edge, style.line_width
        )?;
    }
    Ok(())
}

/// Données de chemin SVG (`M … L … Z`) d'une emprise, en pixels
pub fn path_data(geometry: &MultiPolygon, viewport: &Viewport) -> String {
    let mut d = String::new();
    for polygon in geometry {
        push_ring(&mut d, polygon.exterior(), viewport);
        for interior in polygon.interiors() {
            push_ring(&mut d, interior, viewport);
        }
    }
    d
}

fn push_ring(d: &mut String, ring: &LineString, viewport: &Viewport) {
    for (i, coord) in ring.coords().enumerate() {
        let (x, y) = viewport.data_to_pixel(coord.x, coord.y);
        let command = if i == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{}{:.2} {:.2} ", command, x, y));
    }
    if !ring.0.is_empty() {
        d.push_str("Z ");
    }
}

/// Échappe une chaîne pour du texte XML
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            c if c.is_control() => {}
            c => result.push(c),
        }
    }
    result
}
