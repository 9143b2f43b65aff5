// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OGR datasets (FileGDB multipatch layers) read through GDAL.
//!
//! GDAL layers borrow their dataset and are not `Send`, so each layer is
//! read on a dedicated thread that owns the dataset and streams converted
//! features through a bounded channel. Reading stays lazy: the thread
//! blocks once `FEATURE_BUFFER` features are waiting.

use crate::error::{Error, Result};
use crate::record::Properties;
use crate::source::{multipolygon_value, FeatureIter, FeatureSource, PolygonRings, RawFeature};
use crate::worker::panic_message;
use gdal::vector::{FieldValue, Geometry, LayerAccess};
use gdal::Dataset;
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

/// Converted features allowed in flight between reader and driver
const FEATURE_BUFFER: usize = 256;

/// Any dataset GDAL can open; layers are the dataset's vector layers.
#[derive(Debug, Clone)]
pub struct GdalSource {
    path: PathBuf,
}

impl GdalSource {
    /// Open `path` once to check GDAL can read it
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        Dataset::open(&path).map_err(|e| read_error(&path, e))?;
        Ok(Self { path })
    }
}

impl FeatureSource for GdalSource {
    fn layers(&self) -> Result<Vec<String>> {
        let dataset = Dataset::open(&self.path).map_err(|e| read_error(&self.path, e))?;
        let names = dataset.layers().map(|layer| layer.name()).collect();
        Ok(names)
    }

    fn features(&self, layer: &str) -> Result<FeatureIter<'_>> {
        let (sender, receiver) = mpsc::sync_channel(FEATURE_BUFFER);
        let path = self.path.clone();
        let name = layer.to_string();
        let reader = thread::Builder::new()
            .name("gdal-reader".to_string())
            .spawn(move || read_layer(&path, &name, &sender))?;

        Ok(Box::new(GdalFeatures {
            receiver,
            reader: Some(reader),
            path: self.path.clone(),
        }))
    }
}

struct GdalFeatures {
    receiver: Receiver<Result<RawFeature>>,
    reader: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl Iterator for GdalFeatures {
    type Item = Result<RawFeature>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Ok(item) = self.receiver.recv() {
            return Some(item);
        }
        // Channel closed: the reader finished or died
        let reader = self.reader.take()?;
        match reader.join() {
            Ok(()) => None,
            Err(payload) => Some(Err(Error::SourceRead {
                path: self.path.clone(),
                message: format!("reader thread panicked: {}", panic_message(&*payload)),
            })),
        }
    }
}

/// Reader thread body. Stops early once the receiving side is gone.
fn read_layer(path: &Path, layer: &str, sender: &SyncSender<Result<RawFeature>>) {
    let dataset = match Dataset::open(path) {
        Ok(dataset) => dataset,
        Err(e) => {
            let _ = sender.send(Err(read_error(path, e)));
            return;
        }
    };
    let mut source_layer = match dataset.layer_by_name(layer) {
        Ok(source_layer) => source_layer,
        Err(e) => {
            let _ = sender.send(Err(read_error(path, e)));
            return;
        }
    };

    for feature in source_layer.features() {
        let properties: Properties = feature
            .fields()
            .map(|(name, value)| (name, value.map_or(Value::Null, field_value)))
            .collect();
        let geometry = feature.geometry().map_or(Value::Null, |geometry| {
            let mut polygons = Vec::new();
            collect_polygons(geometry, &mut polygons);
            multipolygon_value(&polygons)
        });

        if sender.send(Ok(RawFeature { properties, geometry })).is_err() {
            return;
        }
    }
}

/// Flatten a multipatch (or any surface collection) into polygon rings.
/// Triangles count as one-ring polygons; curves and points are dropped.
fn collect_polygons(geometry: &Geometry, polygons: &mut Vec<PolygonRings>) {
    match geometry.geometry_name().as_str() {
        "POLYGON" | "TRIANGLE" => {
            let rings = (0..geometry.geometry_count())
                .map(|i| ring_points(&geometry.get_geometry(i)))
                .collect();
            polygons.push(rings);
        }
        "LINEARRING" => polygons.push(vec![ring_points(geometry)]),
        _ => {
            for i in 0..geometry.geometry_count() {
                collect_polygons(&geometry.get_geometry(i), polygons);
            }
        }
    }
}

fn ring_points(ring: &Geometry) -> Vec<[f64; 3]> {
    ring.get_point_vec()
        .into_iter()
        .map(|(x, y, z)| [x, y, z])
        .collect()
}

fn field_value(value: FieldValue) -> Value {
    match value {
        FieldValue::IntegerValue(v) => Value::from(v),
        FieldValue::Integer64Value(v) => Value::from(v),
        FieldValue::RealValue(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
        FieldValue::StringValue(v) => Value::String(v),
        FieldValue::IntegerListValue(v) => Value::from(v),
        FieldValue::Integer64ListValue(v) => Value::from(v),
        FieldValue::StringListValue(v) => Value::from(v),
        FieldValue::RealListValue(v) => v
            .into_iter()
            .map(|x| Number::from_f64(x).map_or(Value::Null, Value::Number))
            .collect(),
        other => other.into_string().map_or(Value::Null, Value::String),
    }
}

fn read_error(path: &Path, error: gdal::errors::GdalError) -> Error {
    Error::SourceRead {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
