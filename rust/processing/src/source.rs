// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vector feature sources.
//!
//! A source exposes named layers, each a lazily read sequence of features
//! (attributes plus a GeoJSON geometry value).

use crate::error::{Error, Result};
use crate::record::Properties;
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One feature before geometry parsing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeature {
    pub properties: Properties,
    pub geometry: Value,
}

pub type FeatureIter<'a> = Box<dyn Iterator<Item = Result<RawFeature>> + 'a>;

/// Layered, ordered access to features.
pub trait FeatureSource {
    /// Names of all layers
    fn layers(&self) -> Result<Vec<String>>;

    /// Features of `layer` in source order, read lazily
    fn features(&self, layer: &str) -> Result<FeatureIter<'_>>;
}

/// Pick the layer to read: an exact name match first, otherwise the first
/// layer whose name contains, or is contained in, the requested one.
pub fn resolve_layer(requested: &str, available: &[String]) -> Result<String> {
    if let Some(exact) = available.iter().find(|name| name.as_str() == requested) {
        return Ok(exact.clone());
    }
    available
        .iter()
        .find(|name| name.contains(requested) || requested.contains(name.as_str()))
        .cloned()
        .ok_or_else(|| Error::LayerNotFound {
            requested: requested.to_string(),
            available: available.to_vec(),
        })
}

/// Rings of one polygon, outer ring first, points as `[x, y, z]`
pub type PolygonRings = Vec<Vec<[f64; 3]>>;

/// Polygon parts as a GeoJSON `MultiPolygon` value; no parts gives `null`.
pub fn multipolygon_value(polygons: &[PolygonRings]) -> Value {
    if polygons.is_empty() {
        return Value::Null;
    }
    serde_json::json!({ "type": "MultiPolygon", "coordinates": polygons })
}

/// Directory and file extensions opened through GDAL
const GDAL_EXTENSIONS: [&str; 3] = ["gdb", "gpkg", "zip"];

/// Open `path` with the reader its extension calls for: FileGDB and
/// GeoPackage datasets through GDAL, everything else as GeoJSON.
pub fn open_source(path: &Path) -> Result<Box<dyn FeatureSource>> {
    if !has_extension(path, &GDAL_EXTENSIONS) {
        return Ok(Box::new(GeoJsonSeqSource::open(path)?));
    }

    #[cfg(feature = "gdal")]
    {
        Ok(Box::new(crate::gdal_source::GdalSource::open(path)?))
    }
    #[cfg(not(feature = "gdal"))]
    {
        Err(Error::SourceRead {
            path: path.to_path_buf(),
            message: "reading this format needs the `gdal` feature".to_string(),
        })
    }
}

/// Extensions read one feature per line
const SEQUENCE_EXTENSIONS: [&str; 4] = ["geojsonl", "geojsons", "ndjson", "jsonl"];
/// Extensions read as a whole FeatureCollection document
const DOCUMENT_EXTENSIONS: [&str; 2] = ["geojson", "json"];

/// Record separator allowed before each line of a GeoJSON text sequence
const RECORD_SEPARATOR: char = '\u{1e}';

/// GeoJSON on disk: a single file is one layer, a directory holds one
/// layer per file named after the file stem.
#[derive(Debug, Clone)]
pub struct GeoJsonSeqSource {
    root: PathBuf,
}

impl GeoJsonSeqSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let root = path.into();
        if !root.exists() {
            return Err(Error::SourceRead {
                message: "path does not exist".to_string(),
                path: root,
            });
        }
        Ok(Self { root })
    }

    /// `(layer name, file)` pairs sorted by layer name
    fn layer_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let files = if self.root.is_dir() {
            let entries = fs::read_dir(&self.root).map_err(|e| self.read_error(&self.root, e))?;
            let mut files = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| self.read_error(&self.root, e))?.path();
                if path.is_file() && is_supported(&path) {
                    files.push(path);
                }
            }
            files
        } else {
            vec![self.root.clone()]
        };

        let mut layers: Vec<(String, PathBuf)> = files
            .into_iter()
            .filter_map(|path| {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                Some((stem, path))
            })
            .collect();
        layers.sort();
        Ok(layers)
    }

    fn read_error(&self, path: &Path, error: impl ToString) -> Error {
        Error::SourceRead {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

impl FeatureSource for GeoJsonSeqSource {
    fn layers(&self) -> Result<Vec<String>> {
        Ok(self.layer_files()?.into_iter().map(|(name, _)| name).collect())
    }

    fn features(&self, layer: &str) -> Result<FeatureIter<'_>> {
        let path = self
            .layer_files()?
            .into_iter()
            .find(|(name, _)| name == layer)
            .map(|(_, path)| path)
            .ok_or_else(|| Error::LayerNotFound {
                requested: layer.to_string(),
                available: self.layers().unwrap_or_default(),
            })?;

        let file = File::open(&path).map_err(|e| self.read_error(&path, e))?;
        if has_extension(&path, &DOCUMENT_EXTENSIONS) {
            read_collection(file, &path, layer)
        } else {
            Ok(Box::new(SequenceReader {
                lines: BufReader::new(file).lines(),
                path,
                layer: layer.to_string(),
                line: 0,
            }))
        }
    }
}

#[derive(Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(default)]
    geometry: Value,
}

impl From<FeatureDoc> for RawFeature {
    fn from(doc: FeatureDoc) -> Self {
        Self {
            properties: doc.properties.unwrap_or_default(),
            geometry: doc.geometry,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Document {
    FeatureCollection { features: Vec<FeatureDoc> },
    Feature(FeatureDoc),
}

/// Whole-document read of a FeatureCollection (or a single Feature)
fn read_collection(file: File, path: &Path, layer: &str) -> Result<FeatureIter<'static>> {
    let document: Document =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::MalformedFeature {
            layer: layer.to_string(),
            index: 0,
            message: format!("{}: {e}", path.display()),
        })?;
    let features = match document {
        Document::FeatureCollection { features } => features,
        Document::Feature(feature) => vec![feature],
    };
    Ok(Box::new(features.into_iter().map(|doc| Ok(doc.into()))))
}

/// One feature per non-blank line
struct SequenceReader {
    lines: std::io::Lines<BufReader<File>>,
    path: PathBuf,
    layer: String,
    line: usize,
}

impl Iterator for SequenceReader {
    type Item = Result<RawFeature>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(Error::SourceRead {
                        path: self.path.clone(),
                        message: format!("line {}: {e}", self.line + 1),
                    }))
                }
            };
            self.line += 1;

            let text = line.trim_start_matches(RECORD_SEPARATOR).trim();
            if text.is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str::<FeatureDoc>(text)
                    .map(RawFeature::from)
                    .map_err(|e| Error::MalformedFeature {
                        layer: self.layer.clone(),
                        index: self.line,
                        message: e.to_string(),
                    }),
            );
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

fn is_supported(path: &Path) -> bool {
    has_extension(path, &SEQUENCE_EXTENSIONS) || has_extension(path, &DOCUMENT_EXTENSIONS)
}
