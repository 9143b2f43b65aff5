// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end runs over GeoJSON sequence files.

use approx::assert_relative_eq;
use building_metrics_processing::{
    AnalysisConfig, CapturedLog, ChunkPipeline, Error, GeoJsonSeqSource, PipelineConfig,
    DERIVED_COLUMNS,
};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 10 x 8 x 6 box, one polygon per face, optionally without its roof
fn box_geometry(open_roof: bool) -> Value {
    let (x1, y1, z1) = (10.0, 8.0, 6.0);
    let mut faces = vec![
        json!([[[0.0, 0.0, 0.0], [0.0, y1, 0.0], [x1, y1, 0.0], [x1, 0.0, 0.0], [0.0, 0.0, 0.0]]]),
        json!([[[0.0, 0.0, 0.0], [x1, 0.0, 0.0], [x1, 0.0, z1], [0.0, 0.0, z1], [0.0, 0.0, 0.0]]]),
        json!([[[x1, 0.0, 0.0], [x1, y1, 0.0], [x1, y1, z1], [x1, 0.0, z1], [x1, 0.0, 0.0]]]),
        json!([[[x1, y1, 0.0], [0.0, y1, 0.0], [0.0, y1, z1], [x1, y1, z1], [x1, y1, 0.0]]]),
        json!([[[0.0, y1, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, z1], [0.0, y1, z1], [0.0, y1, 0.0]]]),
    ];
    if !open_roof {
        faces.push(json!([[[0.0, 0.0, z1], [x1, 0.0, z1], [x1, y1, z1], [0.0, y1, z1], [0.0, 0.0, z1]]]));
    }
    json!({ "type": "MultiPolygon", "coordinates": faces })
}

fn feature(id: usize, geometry: Value) -> String {
    json!({
        "type": "Feature",
        "properties": { "EGID": id, "OBJEKTART": "Gebaeude Einzelhaus" },
        "geometry": geometry
    })
    .to_string()
}

fn write_layer(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(format!("{name}.geojsonl"));
    let mut file = fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

fn config(output_dir: &Path, chunk_size: usize) -> PipelineConfig {
    let mut config = PipelineConfig::new(output_dir);
    config.chunk_size = chunk_size;
    config.workers = 2;
    config
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let records = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, records)
}

fn checkpoint_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".parquet"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_end_to_end_mixed_buildings() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = write_layer(
        input.path(),
        "Building_solid",
        &[
            feature(1, box_geometry(false)),
            feature(2, box_geometry(true)),
            feature(3, Value::Null),
        ],
    );

    let log = CapturedLog::new();
    let source = GeoJsonSeqSource::open(&path).unwrap();
    let pipeline = ChunkPipeline::new(config(output.path(), 2), AnalysisConfig::default(), &log);
    let report = pipeline
        .run_with_stem(&source, output.path().join("building_analysis_test"))
        .unwrap();

    assert_eq!(report.layer, "Building_solid");
    assert_eq!(report.chunks.iter().map(|c| c.total).collect::<Vec<_>>(), vec![2, 1]);
    let merge = report.merge.expect("merged");
    assert_eq!(merge.statistics.total, 3);
    assert_eq!(merge.statistics.succeeded, 2);
    assert_eq!(merge.statistics.volumes_computed, 2);
    assert_relative_eq!(merge.statistics.mean_volume.unwrap(), 480.0, epsilon = 1e-6);
    assert!(merge.xlsx_path.exists());
    assert!(checkpoint_files(output.path()).is_empty());

    let (headers, records) = read_csv(&merge.csv_path);
    assert_eq!(&headers[..2], &["EGID", "OBJEKTART"]);
    assert_eq!(&headers[2..], &DERIVED_COLUMNS.map(str::to_string)[..]);
    assert_eq!(records.len(), 3);

    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r[column("EGID")].as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    let closed = &records[0];
    assert_eq!(closed[column("processing_status")], "success");
    assert_eq!(closed[column("mesh_is_watertight")], "true");
    assert_eq!(closed[column("mesh_repair_applied")], "false");
    assert_eq!(closed[column("mesh_repair_steps")], "Already watertight - no repair needed");
    assert_relative_eq!(closed[column("mesh_volume")].parse::<f64>().unwrap(), 480.0, epsilon = 1e-6);
    assert_relative_eq!(closed[column("surf_footprint_area")].parse::<f64>().unwrap(), 80.0, epsilon = 1e-6);
    assert_relative_eq!(closed[column("surf_wall_area")].parse::<f64>().unwrap(), 216.0, epsilon = 1e-6);

    let open = &records[1];
    assert_eq!(open[column("mesh_repair_applied")], "true");
    assert!(open[column("mesh_repair_steps")].contains("Filled 1 holes"));
    assert_relative_eq!(open[column("mesh_volume")].parse::<f64>().unwrap(), 480.0, epsilon = 1e-6);

    let empty = &records[2];
    assert_eq!(empty[column("processing_status")], "failed");
    assert_eq!(empty[column("processing_error")], "No geometry data");
    assert_eq!(empty[column("mesh_process_error")], "Empty vertices (0) or faces (0)");
    assert_eq!(empty[column("mesh_volume")], "");

    assert!(log.contains("=== Processing chunk 1 ==="));
    assert!(log.contains("Cleaning up chunk files..."));
}

#[test]
fn test_empty_geometry_fails_alone_within_its_chunk() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = write_layer(
        input.path(),
        "Building_solid",
        &[
            feature(1, box_geometry(false)),
            feature(2, json!({"type": "MultiPolygon", "coordinates": []})),
            feature(3, box_geometry(true)),
        ],
    );

    let log = CapturedLog::new();
    let source = GeoJsonSeqSource::open(&path).unwrap();
    let pipeline = ChunkPipeline::new(config(output.path(), 5000), AnalysisConfig::default(), &log);
    let report = pipeline
        .run_with_stem(&source, output.path().join("isolation"))
        .unwrap();

    let chunks: Vec<(usize, usize)> = report
        .chunks
        .iter()
        .map(|c| (c.total, c.succeeded))
        .collect();
    assert_eq!(chunks, vec![(3, 2)]);
    assert_eq!(report.chunks[0].volumes_computed, 2);
    assert!(log.contains("Chunk 0 summary: 2/3 succeeded, 2 volumes computed"));

    let (headers, records) = read_csv(&report.merge.expect("merged").csv_path);
    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    let statuses: Vec<&str> = records
        .iter()
        .map(|r| r[column("processing_status")].as_str())
        .collect();
    assert_eq!(statuses, vec!["success", "failed", "success"]);
    assert_eq!(records[1][column("processing_error")], "No geometry data");
}

#[test]
fn test_chunking_twelve_thousand_buildings() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..12_000).map(|i| feature(i, Value::Null)).collect();
    let path = write_layer(input.path(), "Building_solid", &lines);

    let log = CapturedLog::new();
    let source = GeoJsonSeqSource::open(&path).unwrap();
    let pipeline = ChunkPipeline::new(config(output.path(), 5000), AnalysisConfig::default(), &log);
    let report = pipeline.run_with_stem(&source, output.path().join("run")).unwrap();

    let sizes: Vec<usize> = report.chunks.iter().map(|c| c.total).collect();
    assert_eq!(sizes, vec![5000, 5000, 2000]);
    assert_eq!(report.buildings(), 12_000);
    let merge = report.merge.unwrap();
    assert_eq!(merge.statistics.total, 12_000);
    assert_eq!(merge.statistics.succeeded, 0);
    assert!(log.contains("Read 12000 buildings..."));
    assert!(log.contains("Chunk 0: Processed 5000/5000 buildings"));
}

#[test]
fn test_keep_chunks_and_limit() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..5).map(|i| feature(i, box_geometry(false))).collect();
    write_layer(input.path(), "Building_solid_LV95", &lines);

    let mut config = config(output.path(), 2);
    config.keep_chunks = true;
    config.limit = Some(3);
    let log = CapturedLog::new();
    let source = GeoJsonSeqSource::open(input.path()).unwrap();
    let report = ChunkPipeline::new(config, AnalysisConfig::default(), &log)
        .run_with_stem(&source, output.path().join("kept"))
        .unwrap();

    assert_eq!(report.layer, "Building_solid_LV95");
    assert_eq!(report.buildings(), 3);
    assert_eq!(
        checkpoint_files(output.path()),
        vec!["kept_chunk_0000.parquet", "kept_chunk_0001.parquet"]
    );
    assert!(log.contains("Keeping individual chunk files as requested"));
}

#[test]
fn test_timestamped_output_names() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = write_layer(input.path(), "Building_solid", &[feature(1, box_geometry(false))]);

    let log = CapturedLog::new();
    let source = GeoJsonSeqSource::open(&path).unwrap();
    let report = ChunkPipeline::new(config(output.path(), 10), AnalysisConfig::default(), &log)
        .run(&source)
        .unwrap();

    let name = report.stem.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("building_analysis_"));
    assert_eq!(name.len(), "building_analysis_".len() + "YYYYmmdd_HHMMSS".len());
    assert!(output.path().join(format!("{name}.xlsx")).exists());
    assert!(output.path().join(format!("{name}.csv")).exists());
}

#[test]
fn test_unknown_layer_fails_before_reading() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_layer(input.path(), "Roads", &[feature(1, Value::Null)]);

    let log = CapturedLog::new();
    let source = GeoJsonSeqSource::open(input.path()).unwrap();
    let err = ChunkPipeline::new(config(output.path(), 10), AnalysisConfig::default(), &log)
        .run_with_stem(&source, output.path().join("none"))
        .unwrap_err();

    assert!(matches!(err, Error::LayerNotFound { .. }));
    assert!(log.contains("Layer 'Building_solid' not found"));
    assert!(fs::read_dir(output.path()).unwrap().next().is_none());
}

#[test]
fn test_malformed_feature_aborts_run() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = write_layer(
        input.path(),
        "Building_solid",
        &[feature(1, box_geometry(false)), "{ truncated".to_string()],
    );

    let log = CapturedLog::new();
    let source = GeoJsonSeqSource::open(&path).unwrap();
    let err = ChunkPipeline::new(config(output.path(), 10), AnalysisConfig::default(), &log)
        .run_with_stem(&source, output.path().join("bad"))
        .unwrap_err();

    assert!(matches!(err, Error::MalformedFeature { index: 2, .. }));
    assert!(checkpoint_files(output.path()).is_empty());
}

#[test]
fn test_empty_source_produces_no_outputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = write_layer(input.path(), "Building_solid", &[]);

    let log = CapturedLog::new();
    let source = GeoJsonSeqSource::open(&path).unwrap();
    let report = ChunkPipeline::new(config(output.path(), 10), AnalysisConfig::default(), &log)
        .run_with_stem(&source, output.path().join("empty"))
        .unwrap();

    assert!(report.chunks.is_empty());
    assert!(report.merge.is_none());
    assert!(log.contains("nothing to merge"));
}
