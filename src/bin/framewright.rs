use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use framewright::{
    Engine, EngineConfig, FrameStore, LoggingObserver, RenderOptions, Value, Variables,
};

#[derive(Parser, Debug)]
#[command(name = "framewright", version)]
struct Cli {
    /// Engine configuration JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a template to a PNG, or a GIF when it is animated.
    Render(RenderArgs),
    /// Print what a template would render without drawing it.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Template file, or a directory holding one.
    template: PathBuf,

    /// Output image path.
    #[arg(short, long)]
    out: PathBuf,

    /// Render variable as `name=value`. Values are read as JSON and fall back to plain strings.
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, Value)>,

    /// Also write every animation frame as `{n}.png` into this directory.
    #[arg(long)]
    save_frames: Option<PathBuf>,

    /// Maximum number of frames rendered at once.
    #[arg(long)]
    parallelism: Option<usize>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Template file, or a directory holding one.
    template: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = Engine::new(read_config(cli.config.as_deref())?)?;
    match cli.cmd {
        Command::Render(args) => cmd_render(&engine, args),
        Command::Inspect(args) => cmd_inspect(&engine, args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::from_json_file(p)
            .with_context(|| format!("load config '{}'", p.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn parse_var(s: &str) -> Result<(String, Value), String> {
    let (name, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("variable name is empty in '{s}'"));
    }
    let value = serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from_json)
        .unwrap_or_else(|_| Value::String(raw.to_owned()));
    Ok((name.to_owned(), value))
}

fn cmd_render(engine: &Engine, args: RenderArgs) -> anyhow::Result<()> {
    let doc = engine.load(&args.template)?;
    let session = engine.generate(&doc)?;
    let vars: Variables = args.vars.into_iter().collect();

    if let Some(dir) = &args.save_frames {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create frame directory '{}'", dir.display()))?;
    }
    let observer = LoggingObserver;
    let rendered = engine.render_with(
        &session,
        &vars,
        RenderOptions {
            observer: Some(&observer),
            cancel: None,
            frame_store: args.save_frames.map(FrameStore::new),
            parallelism: args.parallelism,
        },
    )?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    rendered
        .write_to(&args.out)
        .with_context(|| format!("write '{}'", args.out.display()))?;
    println!(
        "wrote {} ({} frame{})",
        args.out.display(),
        rendered.frame_count(),
        if rendered.frame_count() == 1 { "" } else { "s" }
    );
    Ok(())
}

fn cmd_inspect(engine: &Engine, args: InspectArgs) -> anyhow::Result<()> {
    let doc = engine.load(&args.template)?;
    let session = engine.generate(&doc)?;
    let m = session.metrics();

    println!("template: {}", doc.path().display());
    println!("size: {}x{}", m.width, m.height);
    println!("font size: {}px", m.font_size);
    if let Some(family) = &m.font_family {
        println!("font family: {family}");
    }
    if m.animate {
        println!(
            "animation: {} frames at {} fps, {} ms per frame, repeat {}",
            m.total_frames, m.fps, m.delay_ms, m.repeat
        );
    } else {
        println!("animation: none");
    }
    for face in session.fonts().iter() {
        println!("font: {} sha256={}", face.name(), face.digest());
    }
    let mut keys: Vec<&str> = session.remote_image_keys().collect();
    keys.sort_unstable();
    for key in keys {
        println!("remote resource: {key}");
    }
    match session.runner() {
        Some(runner) => {
            let modules: Vec<&str> = runner.module_names().collect();
            println!("scripts: setup + [{}]", modules.join(", "));
        }
        None => println!("scripts: none"),
    }
    Ok(())
}
