use std::env;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::info;
use pollster::block_on;

use scenery::{
    Engine, EngineConfig, Entity, FileSystemAssets, HeadlessBackend, Light, MeshComponent,
    ObjDocument, Spin, Vector,
};

const FRAME_RATE: f64 = 60.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = match &options.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {path}"))?,
        None => EngineConfig::default(),
    };

    let model = Path::new(&options.model);
    let file_name = model
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} is not a file path", options.model))?;
    let root = model.parent().unwrap_or_else(|| Path::new(""));
    let assets = FileSystemAssets::new(root);

    let mut engine = Engine::new(HeadlessBackend::new(), config);
    let document = block_on(ObjDocument::parse(file_name, &assets))
        .with_context(|| format!("failed to load model {}", options.model))?;
    let material_count = document.materials().len();
    let warning_count = document.warnings().len();
    let meshes = block_on(document.finalize(&assets, engine.renderer_mut()));

    let mut entity = Entity::with_meshes(meshes);
    entity.set_name(
        model
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model"),
    );
    entity.add_component(Spin::new(Vector::new(0.0, 0.5, 0.0)));
    engine.root.add_child(entity);
    engine.add_light(Light::point(Vector::new(0.0, 10.0, 10.0), Vector::ONE, 1.0))?;

    let summary = engine
        .root
        .children()
        .first()
        .and_then(|entity| entity.get_component::<MeshComponent>())
        .map(|meshes| (meshes.meshes.len(), meshes.triangle_count()))
        .unwrap_or_default();
    println!(
        "Loaded {} with {} mesh(es), {} triangles and {} material(s)",
        options.model, summary.0, summary.1, material_count
    );
    if warning_count > 0 {
        println!("Skipped {warning_count} unsupported line(s)");
    }

    engine.start()?;
    for frame in 0..options.frames {
        engine.frame(frame as f64 / FRAME_RATE)?;
    }
    info!("rendered {} frame(s)", engine.current_frame());

    let rotation = engine
        .root
        .children()
        .first()
        .map(|entity| entity.rotation())
        .unwrap_or_default();
    let frames = engine.current_frame();
    let backend = engine.into_backend();
    println!("Rendered {frames} frame(s)");
    println!(" - draw calls: {}", backend.draw_calls());
    println!(" - program binds: {}", backend.program_binds());
    println!(
        " - light uploads: {}",
        backend.uniform_uploads("light_count").len()
    );
    println!(
        " - final rotation: ({:.2}, {:.2}, {:.2})",
        rotation.x, rotation.y, rotation.z
    );
    Ok(())
}

struct CliOptions {
    model: String,
    frames: u32,
    config: Option<String>,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(model) = args.next() else {
            return Err(anyhow!(
                "Usage: scenery <model.obj> [--frames N] [--config engine.toml]"
            ));
        };
        let mut frames = 1;
        let mut config = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames needs a value"))?;
                    frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count {value}"))?;
                }
                "--config" => {
                    config = Some(
                        args.next()
                            .ok_or_else(|| anyhow!("--config needs a path"))?,
                    );
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --frames or --config"
                    ));
                }
            }
        }
        Ok(Self {
            model,
            frames,
            config,
        })
    }
}
