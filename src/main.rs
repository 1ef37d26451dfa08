use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use pollster::block_on;

use umbra_engine::app::{print_report, FrameRenderer};
use umbra_engine::{
    EngineSettings, PassScene, RecordingDevice, RenderDevice, SceneStore, WgpuDevice,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let settings = match &options.settings {
        Some(path) => EngineSettings::load(path)?,
        None => EngineSettings::default(),
    };
    if let Some(path) = &options.save_settings {
        settings.save(path)?;
        println!("Saved settings to {}", path.display());
    }

    let xml = fs::read_to_string(&options.scene)
        .with_context(|| format!("failed to read scene {}", options.scene.display()))?;
    let scene = PassScene::from_xml(&xml).context("failed to parse scene XML")?;
    println!("Loaded scene with {} lights", scene.light_count());
    match &scene.camera {
        Some(camera) => println!(" - camera {}", camera.name),
        None => println!(" - no camera, using defaults"),
    }

    let store = SceneStore::from_scene(scene);
    let device: Box<dyn RenderDevice> = if options.gpu {
        info!("using the wgpu device");
        Box::new(block_on(WgpuDevice::new())?)
    } else {
        Box::new(RecordingDevice::new())
    };
    let mut renderer = FrameRenderer::new(device, settings)?;
    for _ in 0..options.frames {
        let scene = store.snapshot();
        let report = renderer.render_frame(&scene)?;
        print_report(&report);
    }
    Ok(())
}

#[derive(Debug)]
struct CliOptions {
    scene: PathBuf,
    settings: Option<PathBuf>,
    save_settings: Option<PathBuf>,
    frames: u32,
    gpu: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut scene = None;
        let mut settings = None;
        let mut save_settings = None;
        let mut frames = 1;
        let mut gpu = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => settings = Some(PathBuf::from(value_of(&mut args, &arg)?)),
                "--save-settings" => {
                    save_settings = Some(PathBuf::from(value_of(&mut args, &arg)?))
                }
                "--frames" => {
                    let value = value_of(&mut args, &arg)?;
                    frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count {value:?}"))?;
                }
                "--gpu" => gpu = true,
                other if other.starts_with("--") => bail!("unknown option {other}"),
                other => {
                    if scene.replace(PathBuf::from(other)).is_some() {
                        bail!("only one scene file may be given");
                    }
                }
            }
        }
        let scene = scene.ok_or_else(|| {
            anyhow!(
                "usage: umbra <scene.xml> [--settings file.var] [--save-settings file.var] \
                 [--frames n] [--gpu]"
            )
        })?;
        Ok(Self {
            scene,
            settings,
            save_settings,
            frames,
            gpu,
        })
    }
}

fn value_of(args: &mut impl Iterator<Item = String>, option: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{option} expects a value"))
}
