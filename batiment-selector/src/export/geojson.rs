//! Export vers GeoJSON avec geozero (streaming)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::Geometry;
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

use bdtopo::{Building, BuildingCollection};

use crate::reproject_lite::SmartReprojector;

/// Exporte une collection (ou une sélection) en GeoJSON, reprojetée vers `target_srid`
pub fn export_to_geojson(
    collection: &BuildingCollection,
    target_srid: Option<u32>,
    output_path: &Path,
) -> Result<()> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write_collection(&mut writer, collection, target_srid)?;
    writer.flush()?;

    Ok(())
}

/// Écrit une FeatureCollection avec son CRS
pub fn write_collection<W: Write>(
    writer: &mut W,
    collection: &BuildingCollection,
    target_srid: Option<u32>,
) -> Result<()> {
    let source_srid = collection.projection().epsg;
    let output_srid = target_srid.unwrap_or(source_srid);
    let reprojector = SmartReprojector::new(source_srid, output_srid)?;

    // Header FeatureCollection avec CRS
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
        output_srid
    )?;

    for (i, building) in collection.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, building, &reprojector)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

/// Écrit un bâtiment en Feature GeoJSON
fn write_feature<W: Write>(
    writer: &mut W,
    building: &Building,
    reprojector: &SmartReprojector,
) -> Result<()> {
    write!(
        writer,
        r#"{{"type":"Feature","id":{},"#,
        serde_json::to_string(&building.id)?
    )?;

    write!(writer, r#""geometry":"#)?;
    let footprint = reprojector
        .transform_multipolygon(&building.geometry)
        .context(format!("Failed to reproject {}", building.id))?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    Geometry::MultiPolygon(footprint).process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(
        writer,
        r#","properties":{}}}"#,
        serde_json::to_string(&building.properties)?
    )?;

    Ok(())
}
