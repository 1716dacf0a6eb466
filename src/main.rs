use clap::Parser;
use fluid_vtk::{ConvertConfig, Error};

use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fluid-vtk")]
#[command(about = "Convert simulation JSON output to VTK files (.vtp, .vti, .pvd) and a keyframed scene")]
struct Cli {
    /// Path to a json run configuration. The flags below override its values.
    config: Option<PathBuf>,

    /// Path to fluid_mesh_data.json
    #[arg(long)]
    mesh: Option<PathBuf>,

    /// Path to fluid_volume_data.json
    #[arg(long)]
    volume: Option<PathBuf>,

    /// Directory to store the VTK output and the scene in
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Do not write the .pvd index of the volume frames
    #[arg(long)]
    no_manifest: bool,

    /// Also write one .vtp per mesh timestep, with its own .pvd index
    #[arg(long)]
    mesh_series: bool,
}

impl Cli {
    /// the configuration file, or the defaults, with every flag applied on top
    fn into_config(self) -> Result<ConvertConfig, Error> {
        let mut config = match &self.config {
            Some(path) => ConvertConfig::from_path(path)?,
            None => ConvertConfig::default(),
        };

        if let Some(mesh) = self.mesh {
            config.mesh = Some(mesh);
        }
        if let Some(volume) = self.volume {
            config.volume = Some(volume);
        }
        if let Some(outdir) = self.outdir {
            config.output_dir = outdir;
        }
        if self.no_manifest {
            config.manifest_file = None;
        }
        if self.mesh_series {
            config.mesh_series = true;
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let source = cli.config.clone();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            let path = source.unwrap_or_default();
            log::error!("could not read configuration {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if config.mesh.is_none() && config.volume.is_none() {
        eprintln!("Nothing to convert. Use --mesh and/or --volume, or a configuration file.");
        return ExitCode::from(2);
    }

    let report = fluid_vtk::run(&config);
    print!("{}", report);

    if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluid_vtk::EncodingKind;

    #[test]
    fn flags_without_a_config_file() {
        let cli = Cli::try_parse_from([
            "fluid-vtk",
            "--mesh",
            "sim/fluid_mesh_data.json",
            "--outdir",
            "render",
            "--no-manifest",
        ])
        .unwrap();
        let config = cli.into_config().unwrap();

        assert_eq!(config.mesh, Some(PathBuf::from("sim/fluid_mesh_data.json")));
        assert_eq!(config.volume, None);
        assert_eq!(config.output_dir, PathBuf::from("render"));
        assert_eq!(config.manifest_file, None);
        assert!(!config.mesh_series);
        assert_eq!(config.frame_prefix, "fluid_data_t");
    }

    #[test]
    fn flags_override_the_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("convert.json");
        std::fs::write(
            &path,
            r#"{"mesh": "a.json", "volume": "b.json", "output_dir": "out", "encoding": "ascii"}"#,
        )
        .unwrap();

        let path = path.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from([
            "fluid-vtk",
            path.as_str(),
            "--volume",
            "c.json",
            "--mesh-series",
        ])
        .unwrap();
        let config = cli.into_config().unwrap();

        assert_eq!(config.mesh, Some(PathBuf::from("a.json")));
        assert_eq!(config.volume, Some(PathBuf::from("c.json")));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.encoding, EncodingKind::Ascii);
        assert_eq!(
            config.manifest_file.as_deref(),
            Some("turbine_flow_animation.pvd")
        );
        assert!(config.mesh_series);
    }

    #[test]
    fn missing_config_file() {
        let cli = Cli::try_parse_from(["fluid-vtk", "does/not/exist.json"]).unwrap();
        assert!(matches!(cli.into_config(), Err(Error::Io(_))));
    }
}
