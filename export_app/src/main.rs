use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};

use scene_export::config::{Config, ConfigFormat};
use scene_export::foundation::logging;
use scene_export::prelude::*;

const OUTPUT_EXTENSION: &str = "lxs";

struct ExportJob {
    scene: PathBuf,
    settings: Option<PathBuf>,
    output: PathBuf,
    print_settings: bool,
}

fn parse_args() -> ExportJob {
    let matches = Command::new("scene-export")
        .about("Converts a RON scene description into a renderer scene file")
        .arg(
            Arg::new("scene")
                .value_name("SCENE")
                .help("Scene document (.ron or .toml)")
                .required(true),
        )
        .arg(
            Arg::new("settings")
                .short('s')
                .long("settings")
                .value_name("FILE")
                .help("Export settings (.toml or .ron); defaults are used when omitted"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output scene file [default: SCENE with .lxs extension]"),
        )
        .arg(
            Arg::new("print-settings")
                .long("print-settings")
                .help("Print the effective settings as TOML and exit")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // SCENE is required, clap exits before this point without it.
    let scene = PathBuf::from(matches.get_one::<String>("scene").cloned().unwrap_or_default());
    let output = matches
        .get_one::<String>("output")
        .map_or_else(|| scene.with_extension(OUTPUT_EXTENSION), PathBuf::from);

    ExportJob {
        settings: matches.get_one::<String>("settings").map(PathBuf::from),
        output,
        print_settings: matches.get_flag("print-settings"),
        scene,
    }
}

fn load_settings(path: Option<&Path>) -> Result<ExportSettings> {
    match path {
        Some(path) => ExportSettings::load(path)
            .map_err(ExportError::from)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(ExportSettings::default()),
    }
}

fn run(job: &ExportJob) -> Result<ConvertStats> {
    let settings = load_settings(job.settings.as_deref())?;
    if job.print_settings {
        print!("{}", settings.to_string_as(ConfigFormat::Toml).map_err(ExportError::from)?);
        return Ok(ConvertStats::default());
    }

    let document = SceneDocument::load_from_file(&job.scene)
        .map_err(ExportError::from)
        .with_context(|| format!("Failed to read scene {}", job.scene.display()))?;
    let graph = document
        .build()
        .map_err(ExportError::from)
        .with_context(|| format!("Invalid scene {}", job.scene.display()))?;

    log::info!("Exporting {} to {}", job.scene.display(), job.output.display());
    let mut converter = SceneConverter::new(settings);
    let mut writer = SceneWriter::new(FileSink::new(&job.output));
    let result = converter.convert(&graph, &mut writer);
    drop(writer);

    match result {
        Ok(stats) => Ok(stats),
        Err(err) => {
            if job.output.exists() {
                if let Err(remove_err) = std::fs::remove_file(&job.output) {
                    log::warn!("Could not remove partial output {}: {}", job.output.display(), remove_err);
                }
            }
            Err(err).with_context(|| format!("Failed to export {}", job.scene.display()))
        }
    }
}

fn main() {
    logging::init("info");
    let job = parse_args();

    match run(&job) {
        Ok(stats) if !job.print_settings => {
            println!(
                "Wrote {}: {} lights, {} meshes, {} portals, {} textures, {} triangles",
                job.output.display(),
                stats.lights,
                stats.meshes,
                stats.portals,
                stats.textures,
                stats.triangles
            );
        }
        Ok(_) => {}
        Err(err) => {
            let category = err
                .downcast_ref::<ExportError>()
                .map_or(ErrorCategory::Io, ExportError::category);
            eprintln!("{}", category.message());
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}
