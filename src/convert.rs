//! # Conversion Pipeline
//!
//! [`run`] produces every artifact a [`ConvertConfig`] asks for:
//!
//! * `geometry`: the surface mesh as a single `.vtp` file
//! * `mesh series`: one `.vtp` per mesh timestep and their `.pvd` manifest
//! * `volume`: one `.vti` per volume timestep and their `.pvd` manifest
//! * `scene`: the keyframed scene document
//!
//! Artifacts are isolated from one another. A broken mesh record fails the mesh
//! artifacts and nothing else; a broken `grid_info` fails the volume, while the geometry
//! and the scene's mesh object are still produced. Every outcome ends up in the
//! [`RunReport`], together with everything left out of a single frame: volume fields
//! that failed validation, mesh timesteps with unusable vertices, and channels the scene
//! host refused.

use crate::array::FieldError;
use crate::config::ConvertConfig;
use crate::grid::GridSpec;
use crate::input::{self, MeshRecord, VolumeRecord};
use crate::mesh::{MeshError, MeshFrame, StaticMesh};
use crate::prelude::*;
use crate::scene::{ObjectId, SceneAssembler, SceneDocument, SceneError, DEFAULT_VOLUME_NAME};
use crate::series::{relative_to, TimeSeriesIndex};
use crate::write_vtk::write_vtk_file;
use crate::MissingKey;

use std::fmt;
use std::path::{Path, PathBuf};

pub const GEOMETRY: &str = "geometry";
pub const MESH_SERIES: &str = "mesh series";
pub const VOLUME: &str = "volume";
pub const SCENE: &str = "scene";

#[derive(Debug)]
pub enum ArtifactOutcome {
    /// the artifact was produced; every file it wrote
    Written { files: Vec<PathBuf> },
    /// the artifact was not asked for
    Skipped { reason: &'static str },
    Failed { error: Error },
}

impl ArtifactOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    fn from_result(result: Result<Vec<PathBuf>, Error>) -> Self {
        match result {
            Ok(files) => Self::Written { files },
            Err(error) => Self::Failed { error },
        }
    }
}

/// Why part of a single frame was left out
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum OmissionError {
    /// a volume field, left out of the `.vti` file and the scene
    #[error(transparent)]
    Field(#[from] FieldError),
    /// a whole mesh timestep, left out of the mesh series and the scene
    #[error(transparent)]
    MeshFrame(#[from] MeshError),
    /// a volume channel the scene host did not take
    #[error("the scene host rejected channel `{channel}`: {source}")]
    Channel { channel: String, source: SceneError },
}

/// Something left out of a single frame
#[derive(Debug, Clone, PartialEq)]
pub struct Omission {
    pub frame_index: usize,
    pub error: OmissionError,
}

/// The outcome of every artifact of a run
#[derive(Debug, Default)]
pub struct RunReport {
    artifacts: Vec<(&'static str, ArtifactOutcome)>,
    omissions: Vec<Omission>,
}

impl RunReport {
    pub fn artifacts(&self) -> &[(&'static str, ArtifactOutcome)] {
        &self.artifacts
    }

    pub fn outcome(&self, artifact: &str) -> Option<&ArtifactOutcome> {
        self.artifacts
            .iter()
            .find(|(name, _)| *name == artifact)
            .map(|(_, outcome)| outcome)
    }

    pub fn omissions(&self) -> &[Omission] {
        &self.omissions
    }

    /// `true` when no requested artifact failed
    pub fn success(&self) -> bool {
        !self.artifacts.iter().any(|(_, outcome)| outcome.is_failed())
    }

    fn record(&mut self, artifact: &'static str, outcome: ArtifactOutcome) {
        match &outcome {
            ArtifactOutcome::Written { files } => {
                log::info!("{}: wrote {} file(s)", artifact, files.len())
            }
            ArtifactOutcome::Skipped { reason } => log::info!("{}: skipped, {}", artifact, reason),
            ArtifactOutcome::Failed { error } => log::error!("{}: failed: {}", artifact, error),
        }

        self.artifacts.push((artifact, outcome));
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (artifact, outcome) in &self.artifacts {
            match outcome {
                ArtifactOutcome::Written { files } if files.len() == 1 => {
                    writeln!(f, "{}: written {}", artifact, files[0].display())?
                }
                ArtifactOutcome::Written { files } => {
                    writeln!(f, "{}: written {} files", artifact, files.len())?
                }
                ArtifactOutcome::Skipped { reason } => writeln!(f, "{}: skipped ({})", artifact, reason)?,
                ArtifactOutcome::Failed { error } => writeln!(f, "{}: FAILED: {}", artifact, error)?,
            }
        }

        for omission in &self.omissions {
            let index = omission.frame_index;

            match &omission.error {
                OmissionError::Field(error) => writeln!(
                    f,
                    "volume frame {}: omitted field `{}`: {}",
                    index,
                    error.field_name(),
                    error
                )?,
                OmissionError::MeshFrame(error) => {
                    writeln!(f, "mesh frame {}: omitted: {}", index, error)?
                }
                OmissionError::Channel { channel, source } => writeln!(
                    f,
                    "scene frame {}: skipped channel `{}`: {}",
                    index, channel, source
                )?,
            }
        }

        Ok(())
    }
}

/// scene assembly state shared by the mesh and volume conversions
struct SceneState<'d> {
    assembler: SceneAssembler<'d, SceneDocument>,
    error: Option<Error>,
}

impl<'d> SceneState<'d> {
    /// Fail the scene with `error` unless an earlier step already did
    fn abort(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// run `f` against the assembler unless an earlier step already failed
    fn apply<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut SceneAssembler<'d, SceneDocument>) -> Result<T, Error>,
    {
        if self.error.is_some() {
            return None;
        }

        match f(&mut self.assembler) {
            Ok(value) => Some(value),
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

/// Convert the inputs named in `config` into every requested artifact
pub fn run(config: &ConvertConfig) -> RunReport {
    let mut report = RunReport::default();

    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        log::error!(
            "could not create output directory {}: {}",
            config.output_dir.display(),
            e
        );

        for artifact in requested(config) {
            let error = std::io::Error::new(e.kind(), e.to_string());
            report.record(artifact, ArtifactOutcome::Failed { error: error.into() });
        }

        return report;
    }

    let mut document = SceneDocument::new();
    let mut scene = config.scene_file.as_ref().map(|_| SceneState {
        assembler: SceneAssembler::new(&mut document),
        error: None,
    });

    match &config.mesh {
        Some(path) => convert_mesh(config, path, scene.as_mut(), &mut report),
        None => {
            report.record(GEOMETRY, ArtifactOutcome::Skipped { reason: "no mesh input" });
            if config.mesh_series {
                report.record(MESH_SERIES, ArtifactOutcome::Skipped { reason: "no mesh input" });
            }
        }
    }

    match &config.volume {
        Some(path) => convert_volume(config, path, scene.as_mut(), &mut report),
        None => report.record(VOLUME, ArtifactOutcome::Skipped { reason: "no volume input" }),
    }

    match (scene, &config.scene_file) {
        (Some(state), Some(file)) => {
            let path = config.output_dir.join(file);
            let result = match state.error {
                Some(e) => Err(e),
                None => state
                    .assembler
                    .finish(Some(&path))
                    .map(|_| vec![path.clone()]),
            };
            report.record(SCENE, ArtifactOutcome::from_result(result));
        }
        _ => report.record(SCENE, ArtifactOutcome::Skipped { reason: "scene_file is null" }),
    }

    report
}

/// every artifact `config` asks for
fn requested(config: &ConvertConfig) -> Vec<&'static str> {
    let mut artifacts = Vec::new();

    if config.mesh.is_some() {
        artifacts.push(GEOMETRY);
        if config.mesh_series {
            artifacts.push(MESH_SERIES);
        }
    }
    if config.volume.is_some() {
        artifacts.push(VOLUME);
    }
    if config.scene_file.is_some() {
        artifacts.push(SCENE);
    }

    artifacts
}

/// Read, extract and validate every frame of the mesh record. A timestep whose vertices
/// cannot be read is left out; any error that breaks the topology fails the whole mesh.
fn load_mesh(path: &Path) -> Result<(StaticMesh, Vec<MeshFrame>, Vec<Omission>), Error> {
    let record: MeshRecord = input::load_json(path)?;
    let mesh = StaticMesh::extract(&record)?;

    let mut frames = Vec::with_capacity(record.time_steps.len());
    let mut omitted = Vec::new();

    for (frame_index, frame) in mesh.frames(&record).enumerate() {
        match frame {
            Ok(frame) => frames.push(frame),
            Err(e) if e.is_frame_local() => {
                log::warn!("mesh frame {} left out: {}", frame_index, e);
                omitted.push(Omission {
                    frame_index,
                    error: e.into(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok((mesh, frames, omitted))
}

fn convert_mesh(
    config: &ConvertConfig,
    path: &Path,
    scene: Option<&mut SceneState<'_>>,
    report: &mut RunReport,
) {
    log::info!("converting mesh {}", path.display());

    let (mesh, frames, omitted) = match load_mesh(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("mesh {} aborted: {}", path.display(), e);
            report.record(GEOMETRY, ArtifactOutcome::Failed { error: e });
            if config.mesh_series {
                report.record(MESH_SERIES, ArtifactOutcome::Skipped { reason: "mesh aborted" });
            }
            return;
        }
    };

    report.omissions.extend(omitted);

    let geometry_path = config.output_dir.join(&config.geometry_file);
    let data = VtkData::new(mesh.reference().domain(), ());
    let result = write_vtk_file(&geometry_path, config.encoding, &data).map(|_| vec![geometry_path]);
    report.record(GEOMETRY, ArtifactOutcome::from_result(result));

    if config.mesh_series {
        let result = write_mesh_series(config, &frames);
        report.record(MESH_SERIES, ArtifactOutcome::from_result(result));
    }

    if let Some(scene) = scene {
        scene.apply(|assembler| {
            let object: ObjectId = assembler.add_mesh(&mesh)?;
            for frame in &frames {
                assembler.add_mesh_frame(object, frame)?;
            }
            Ok(())
        });
    }
}

fn write_mesh_series(config: &ConvertConfig, frames: &[MeshFrame]) -> Result<Vec<PathBuf>, Error> {
    let manifest = config.output_dir.join(&config.mesh_manifest_file);
    let base = manifest_dir(config, &manifest);

    let mut files = Vec::with_capacity(frames.len() + 1);
    let mut index = TimeSeriesIndex::new();

    for frame in frames {
        let path = config.mesh_frame_path(frame.frame_index);
        log::debug!("writing mesh frame {} to {}", frame.frame_index, path.display());

        let data = VtkData::new(frame.domain(), ());
        write_vtk_file(&path, config.encoding, &data)?;

        index.push(frame.time, relative_to(base, &path));
        files.push(path);
    }

    index.write_pvd_file(&manifest)?;
    files.push(manifest);

    Ok(files)
}

fn convert_volume(
    config: &ConvertConfig,
    path: &Path,
    mut scene: Option<&mut SceneState<'_>>,
    report: &mut RunReport,
) {
    log::info!("converting volume {}", path.display());

    let result = write_volume(config, path, &mut scene, &mut report.omissions);

    if let Err(e) = &result {
        log::error!("volume {} aborted: {}", path.display(), e);
    }

    report.record(VOLUME, ArtifactOutcome::from_result(result));
}

fn write_volume(
    config: &ConvertConfig,
    path: &Path,
    scene: &mut Option<&mut SceneState<'_>>,
    omissions: &mut Vec<Omission>,
) -> Result<Vec<PathBuf>, Error> {
    let record: VolumeRecord = input::load_json(path)?;

    let raw = record
        .grid_info
        .as_ref()
        .ok_or(MissingKey::new("volume", "grid_info"))?;
    let grid = Arc::new(GridSpec::from_raw(raw, config.source_axis_order)?);

    log::debug!(
        "volume grid: {:?} points along x, y, z",
        grid.target_dimensions()
    );

    let name = record
        .volume_name
        .as_deref()
        .unwrap_or(DEFAULT_VOLUME_NAME);

    let object = scene.as_mut().and_then(|scene| {
        scene.apply(|assembler| assembler.add_volume(name, &grid, record.time_steps.first()))
    });

    let result = write_volume_frames(config, &record, &grid, scene, object, omissions);

    // the scene must not keep a volume that stops partway
    if let (Err(_), Some(_), Some(scene)) = (&result, object, scene.as_mut()) {
        scene.abort(
            SceneError::IncompleteObject {
                name: name.to_string(),
            }
            .into(),
        );
    }

    result
}

fn write_volume_frames(
    config: &ConvertConfig,
    record: &VolumeRecord,
    grid: &Arc<GridSpec>,
    scene: &mut Option<&mut SceneState<'_>>,
    object: Option<ObjectId>,
    omissions: &mut Vec<Omission>,
) -> Result<Vec<PathBuf>, Error> {
    let manifest = config
        .manifest_file
        .as_ref()
        .map(|file| config.output_dir.join(file));
    let base = manifest
        .as_deref()
        .map_or(config.output_dir.as_path(), |manifest| manifest_dir(config, manifest));

    let mut files = Vec::with_capacity(record.time_steps.len() + 1);
    let mut index = TimeSeriesIndex::new();

    for (frame_index, step) in record.time_steps.iter().enumerate() {
        let (frame, omitted) = VolumeFrame::build(grid, frame_index, step);

        omissions.extend(omitted.into_iter().map(|error| Omission {
            frame_index,
            error: error.into(),
        }));

        let frame_path = config.frame_path(frame_index);
        log::debug!("writing volume frame {} to {}", frame_index, frame_path.display());

        let data = VtkData::new(frame.domain(), frame.point_fields(config.vector_layout));
        write_vtk_file(&frame_path, config.encoding, &data)?;

        index.push(frame.time, relative_to(base, &frame_path));
        files.push(frame_path);

        if let (Some(scene), Some(object)) = (scene.as_mut(), object) {
            let rejected = scene
                .apply(|assembler| assembler.add_volume_frame(object, &frame))
                .unwrap_or_default();

            omissions.extend(rejected.into_iter().map(|rejected| Omission {
                frame_index,
                error: OmissionError::Channel {
                    channel: rejected.channel,
                    source: rejected.error,
                },
            }));
        }
    }

    if let Some(manifest) = manifest {
        index.write_pvd_file(&manifest)?;
        files.push(manifest);
    }

    Ok(files)
}

/// the directory the entries of `manifest` are relative to
fn manifest_dir<'a>(config: &'a ConvertConfig, manifest: &'a Path) -> &'a Path {
    manifest.parent().unwrap_or(config.output_dir.as_path())
}
