use fluid_vtk::convert::{ArtifactOutcome, GEOMETRY, MESH_SERIES, SCENE, VOLUME};
use fluid_vtk::scene::SceneError;
use fluid_vtk::{ConvertConfig, EncodingKind, Error, ErrorKind, FieldError, MeshError, OmissionError};

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn mesh_record() -> Value {
    json!({
        "mesh_name": "FluidSurface",
        "static_faces": [[0, 1, 2], [0, 2, 3]],
        "time_steps": [
            {"time": 0.01, "frame": 0, "vertices": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]]},
            {"time": 0.02, "frame": 1, "vertices": [[[0, 0, 0.1], [1, 0, 0.1]], [[1, 1, 0.1], [0, 1, 0.1]]]}
        ]
    })
}

fn volume_record() -> Value {
    json!({
        "volume_name": "FluidVolume",
        "grid_info": {
            "dimensions": [3, 1, 1],
            "voxel_size": [0.1, 0.1, 0.1],
            "origin": [0.0, 0.0, 0.0]
        },
        "time_steps": [
            {
                "time": 0.01,
                "frame": 0,
                "density_data": [1025.17, 1024.99, 1024.84],
                "velocity_data": [[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.2, 0.0, 0.0]]
            },
            {
                "time": 0.02,
                "frame": 1,
                "density_data": [1025.0, 1024.9, 1024.8],
                "velocity_data": [[0.0, 0.0, 0.0], [0.1, 0.0, 0.0]]
            }
        ]
    })
}

fn config(dir: &Path, mesh: Option<Value>, volume: Option<Value>) -> ConvertConfig {
    let mesh = mesh.map(|record| {
        let path = dir.join("fluid_mesh_data.json");
        write_json(&path, &record);
        path
    });

    let volume = volume.map(|record| {
        let path = dir.join("fluid_volume_data.json");
        write_json(&path, &record);
        path
    });

    ConvertConfig {
        mesh,
        volume,
        output_dir: dir.join("output"),
        encoding: EncodingKind::Ascii,
        ..ConvertConfig::default()
    }
}

fn written(outcome: Option<&ArtifactOutcome>) -> Vec<PathBuf> {
    match outcome {
        Some(ArtifactOutcome::Written { files }) => files.clone(),
        other => panic!("artifact was not written: {:?}", other),
    }
}

#[test]
fn full_conversion() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let config = config(dir, Some(mesh_record()), Some(volume_record()));

    let report = fluid_vtk::run(&config);
    assert!(report.success(), "{}", report);

    let geometry = written(report.outcome(GEOMETRY));
    let text = std::fs::read_to_string(&geometry[0]).unwrap();
    assert!(text.contains("<VTKFile type=\"PolyData\""));
    assert!(text.contains("NumberOfPolys=\"2\""));
    assert!(text.contains(">0 1 2 0 2 3<"));

    let volume = written(report.outcome(VOLUME));
    assert_eq!(volume.len(), 3);
    assert!(volume[0].ends_with("fluid_data_t0000.vti"));
    assert!(volume[1].ends_with("fluid_data_t0001.vti"));

    let first = std::fs::read_to_string(&volume[0]).unwrap();
    assert!(first.contains("Name=\"density\" NumberOfComponents=\"1\" format=\"ascii\">1025.17 1024.99 1024.84<"));
    assert!(first.contains("Name=\"velocity\""));

    // the short velocity field is left out of the second frame only
    let second = std::fs::read_to_string(&volume[1]).unwrap();
    assert!(second.contains("Name=\"density\""));
    assert!(!second.contains("velocity"));

    assert_eq!(report.omissions().len(), 1);
    assert_eq!(report.omissions()[0].frame_index, 1);
    assert_eq!(
        report.omissions()[0].error,
        OmissionError::Field(FieldError::size_mismatch("velocity", 3, 2))
    );

    let manifest = fluid_vtk::series::read_pvd(&volume[2]).unwrap();
    let files: Vec<&str> = manifest.entries().iter().map(|e| e.file.as_str()).collect();
    assert_eq!(files, vec!["fluid_data_t0000.vti", "fluid_data_t0001.vti"]);
    let times: Vec<f64> = manifest.entries().iter().map(|e| e.time).collect();
    assert_eq!(times, vec![0.01, 0.02]);

    let scene = written(report.outcome(SCENE));
    let scene: Value = serde_json::from_str(&std::fs::read_to_string(&scene[0]).unwrap()).unwrap();
    assert_eq!(scene["frame_start"], 0);
    assert_eq!(scene["frame_end"], 1);
    assert_eq!(scene["objects"][0]["name"], "FluidSurface");
    assert_eq!(scene["objects"][1]["kind"], "volume");
    assert_eq!(scene["objects"][1]["channels"][0]["name"], "density");
    assert_eq!(scene["objects"][1]["channels"][1]["name"], "velocity_X");
}

#[test]
fn missing_grid_info_only_fails_the_volume() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let mut volume = volume_record();
    volume.as_object_mut().unwrap().remove("grid_info");

    let config = config(dir, Some(mesh_record()), Some(volume));
    let report = fluid_vtk::run(&config);

    assert!(!report.success());

    match report.outcome(VOLUME) {
        Some(ArtifactOutcome::Failed { error }) => {
            assert_eq!(error.kind(), ErrorKind::Config);
            assert!(matches!(error, Error::MissingKey(_)));
        }
        other => panic!("volume should have failed: {:?}", other),
    }

    assert_eq!(written(report.outcome(GEOMETRY)).len(), 1);
    assert!(!config.output_dir.join("fluid_data_t0000.vti").exists());
    assert!(!config.output_dir.join("turbine_flow_animation.pvd").exists());

    let scene = written(report.outcome(SCENE));
    let scene: Value = serde_json::from_str(&std::fs::read_to_string(&scene[0]).unwrap()).unwrap();
    assert_eq!(scene["objects"].as_array().unwrap().len(), 1);
}

#[test]
fn vertex_count_mismatch_only_fails_the_mesh() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let mesh = json!({
        "static_faces": [[0, 1, 2]],
        "time_steps": [
            {"time": 0.0, "frame": 0, "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]]},
            {"time": 0.1, "frame": 1, "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0], [1, 1, 0]]}
        ]
    });

    let config = ConvertConfig {
        mesh_series: true,
        ..config(dir, Some(mesh), Some(volume_record()))
    };
    let report = fluid_vtk::run(&config);

    match report.outcome(GEOMETRY) {
        Some(ArtifactOutcome::Failed { error }) => {
            assert_eq!(error.kind(), ErrorKind::Validation);
            assert!(matches!(
                error,
                Error::Mesh(MeshError::VertexCountMismatch {
                    frame: 1,
                    expected: 3,
                    actual: 4
                })
            ));
        }
        other => panic!("geometry should have failed: {:?}", other),
    }
    assert!(matches!(
        report.outcome(MESH_SERIES),
        Some(ArtifactOutcome::Skipped { .. })
    ));

    assert_eq!(written(report.outcome(VOLUME)).len(), 3);
    assert!(!config.output_dir.join("turbine_geometry.vtp").exists());
}

#[test]
fn scrambled_times_keep_input_order() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let mut volume = volume_record();
    let steps = volume["time_steps"].as_array_mut().unwrap();
    steps[0]["time"] = json!(0.3);
    steps[1]["time"] = json!(0.1);
    steps.push(json!({"time": 0.2, "frame": 2, "density_data": [1.0, 2.0, 3.0]}));

    let config = config(dir, None, Some(volume));
    let report = fluid_vtk::run(&config);
    assert!(report.success(), "{}", report);

    let manifest = config.output_dir.join("turbine_flow_animation.pvd");
    let index = fluid_vtk::series::read_pvd(&manifest).unwrap();

    let times: Vec<f64> = index.entries().iter().map(|e| e.time).collect();
    assert_eq!(times, vec![0.3, 0.1, 0.2]);
    assert_eq!(index.entries()[2].file, "fluid_data_t0002.vti");
}

#[test]
fn mesh_series_and_binary_encoding() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let config = ConvertConfig {
        mesh_series: true,
        encoding: EncodingKind::Binary,
        scene_file: None,
        ..config(dir, Some(mesh_record()), None)
    };

    let report = fluid_vtk::run(&config);
    assert!(report.success(), "{}", report);

    let files = written(report.outcome(MESH_SERIES));
    assert_eq!(files.len(), 3);
    assert!(files[1].ends_with("fluid_mesh_t0001.vtp"));

    let bytes = std::fs::read(&files[1]).unwrap();
    let marker = b"<AppendedData encoding=\"raw\">_";
    assert!(bytes.windows(marker.len()).any(|w| w == marker));

    let index = fluid_vtk::series::read_pvd(&files[2]).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.entries()[1].file, "fluid_mesh_t0001.vtp");

    assert!(matches!(
        report.outcome(SCENE),
        Some(ArtifactOutcome::Skipped { .. })
    ));
}

#[test]
fn unreadable_input_is_an_io_failure() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let config = ConvertConfig {
        volume: Some(dir.join("does_not_exist.json")),
        ..config(dir, Some(mesh_record()), None)
    };

    let report = fluid_vtk::run(&config);

    match report.outcome(VOLUME) {
        Some(ArtifactOutcome::Failed { error }) => assert_eq!(error.kind(), ErrorKind::Io),
        other => panic!("volume should have failed: {:?}", other),
    }
    assert_eq!(written(report.outcome(GEOMETRY)).len(), 1);
}

#[test]
fn malformed_vertices_only_drop_their_frame() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let mesh = json!({
        "static_faces": [[0, 1, 2]],
        "time_steps": [
            {"time": 0.0, "frame": 0, "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]]},
            {"time": 0.1, "frame": 1, "vertices": [[0, 0, 1], [1, 0, 1], [0, 1, 1]]},
            {"time": 0.2, "frame": 2, "vertices": [[0, 0, 2], [1, "a", 2], [0, 1, 2]]},
            {"time": 0.3, "frame": 3, "vertices": [[0, 0, 3], [1, 0, 3], [0, 1, 3]]}
        ]
    });

    let config = ConvertConfig {
        mesh_series: true,
        ..config(dir, Some(mesh), None)
    };
    let report = fluid_vtk::run(&config);
    assert!(report.success(), "{}", report);

    assert_eq!(written(report.outcome(GEOMETRY)).len(), 1);

    let files = written(report.outcome(MESH_SERIES));
    assert_eq!(files.len(), 4);
    assert!(files[2].ends_with("fluid_mesh_t0003.vtp"));
    assert!(!config.output_dir.join("fluid_mesh_t0002.vtp").exists());

    let index = fluid_vtk::series::read_pvd(&files[3]).unwrap();
    let times: Vec<f64> = index.entries().iter().map(|e| e.time).collect();
    assert_eq!(times, vec![0.0, 0.1, 0.3]);

    assert_eq!(report.omissions().len(), 1);
    assert_eq!(report.omissions()[0].frame_index, 2);
    assert_eq!(
        report.omissions()[0].error,
        OmissionError::MeshFrame(MeshError::MalformedVertexGroup {
            frame: 2,
            position: 1
        })
    );
    assert!(report.to_string().contains("mesh frame 2: omitted"));

    let scene = written(report.outcome(SCENE));
    let scene: Value = serde_json::from_str(&std::fs::read_to_string(&scene[0]).unwrap()).unwrap();
    let frames: Vec<i64> = scene["objects"][0]["keyframes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|keyframe| keyframe["frame"].as_i64().unwrap())
        .collect();
    assert_eq!(frames, vec![0, 1, 3]);
}

#[test]
fn manifest_entries_are_relative_to_the_manifest() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let config = ConvertConfig {
        manifest_file: Some("index/anim.pvd".to_string()),
        mesh_series: true,
        mesh_manifest_file: "index/mesh/surface.pvd".to_string(),
        ..config(dir, Some(mesh_record()), Some(volume_record()))
    };

    let report = fluid_vtk::run(&config);
    assert!(report.success(), "{}", report);

    let manifest = config.output_dir.join("index").join("anim.pvd");
    let index = fluid_vtk::series::read_pvd(&manifest).unwrap();
    assert_eq!(index.entries()[0].file, "../fluid_data_t0000.vti");
    assert_eq!(index.entries()[1].file, "../fluid_data_t0001.vti");

    let manifest_dir = manifest.parent().unwrap();
    for entry in index.entries() {
        assert!(manifest_dir.join(&entry.file).exists(), "{}", entry.file);
    }

    let mesh_manifest = config.output_dir.join("index/mesh/surface.pvd");
    let index = fluid_vtk::series::read_pvd(&mesh_manifest).unwrap();
    assert_eq!(index.entries()[0].file, "../../fluid_mesh_t0000.vtp");
}

#[test]
fn scrambled_mesh_times_keep_frame_order() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let mesh = json!({
        "static_faces": [[0, 1, 2]],
        "time_steps": [
            {"time": 0.3, "frame": 0, "vertices": [[0, 0, 0.5], [1, 0, 0.5], [0, 1, 0.5]]},
            {"time": 0.1, "frame": 1, "vertices": [[0, 0, 0.25], [1, 0, 0.25], [0, 1, 0.25]]},
            {"time": 0.2, "frame": 2, "vertices": [[0, 0, 0.75], [1, 0, 0.75], [0, 1, 0.75]]}
        ]
    });

    let config = ConvertConfig {
        mesh_series: true,
        ..config(dir, Some(mesh), None)
    };
    let report = fluid_vtk::run(&config);
    assert!(report.success(), "{}", report);

    let files = written(report.outcome(MESH_SERIES));
    let heights = ["0.5", "0.25", "0.75"];
    for (file, z) in files.iter().zip(heights) {
        let text = std::fs::read_to_string(file).unwrap();
        assert!(text.contains(&format!(">0.0 0.0 {} ", z)), "{}", file.display());
    }

    let index = fluid_vtk::series::read_pvd(&files[3]).unwrap();
    let times: Vec<f64> = index.entries().iter().map(|e| e.time).collect();
    assert_eq!(times, vec![0.3, 0.1, 0.2]);
    let names: Vec<&str> = index.entries().iter().map(|e| e.file.as_str()).collect();
    assert_eq!(
        names,
        vec!["fluid_mesh_t0000.vtp", "fluid_mesh_t0001.vtp", "fluid_mesh_t0002.vtp"]
    );

    let scene = written(report.outcome(SCENE));
    let scene: Value = serde_json::from_str(&std::fs::read_to_string(&scene[0]).unwrap()).unwrap();
    let keyframes = scene["objects"][0]["keyframes"].as_array().unwrap();
    let sequence: Vec<(i64, f64)> = keyframes
        .iter()
        .map(|keyframe| {
            (
                keyframe["frame"].as_i64().unwrap(),
                keyframe["points"][0][2].as_f64().unwrap(),
            )
        })
        .collect();
    assert_eq!(sequence, vec![(0, 0.5), (1, 0.25), (2, 0.75)]);
}

#[test]
fn volume_failing_partway_fails_the_scene() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let config = config(dir, Some(mesh_record()), Some(volume_record()));

    // the second frame cannot be created over a directory
    std::fs::create_dir_all(config.output_dir.join("fluid_data_t0001.vti")).unwrap();

    let report = fluid_vtk::run(&config);

    match report.outcome(VOLUME) {
        Some(ArtifactOutcome::Failed { error }) => assert_eq!(error.kind(), ErrorKind::Io),
        other => panic!("volume should have failed: {:?}", other),
    }

    match report.outcome(SCENE) {
        Some(ArtifactOutcome::Failed { error }) => assert!(matches!(
            error,
            Error::Scene(SceneError::IncompleteObject { name }) if name == "FluidVolume"
        )),
        other => panic!("scene should have failed: {:?}", other),
    }
    assert!(!config.output_dir.join("final_animation_scene.json").exists());

    assert_eq!(written(report.outcome(GEOMETRY)).len(), 1);
}
