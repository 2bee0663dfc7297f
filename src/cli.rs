// ============================================================================
// pix CLI - headless sprite editing and export
// ============================================================================
//
// Usage examples:
//   pix new hero.pix --width 32 --height 32 --frames 4
//   pix draw hero.pix --tool pencil --color "#ff0000" --size 2 --at 3,4 --at 5,6
//   pix draw hero.pix --tool fill --color peach --at 0,0 --frame 2
//   pix export-gif sprites/*.pix --output-dir gifs/ --fps 6
//   pix export-png hero.pix --all --output-dir frames/
//   pix export-godot hero.pix --output-dir export
//
// Everything runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use image::{Rgba, RgbaImage};

use crate::canvas::{Color, DEFAULT_SIZE};
use crate::components::colors::{format_color, parse_color};
use crate::components::tools::{ONION_SKIN_ALPHA, Tool, ToolSettings};
use crate::io::export::write_png;
use crate::io::gif::{DEFAULT_GIF_DELAY_CS, GifOptions};
use crate::project::Project;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// pix: pixel-art sprite editor, headless.
#[derive(Parser, Debug)]
#[command(
    name = "pix",
    version,
    about = "Create, edit and export PIX1 pixel-art sprites",
    long_about = "Create, edit and export multi-frame PIX1 sprites without opening an\n\
                  editor window. Exports animated GIF (16-colour palette), PNG frames,\n\
                  sprite sheets and Godot resources.\n\n\
                  Example:\n  \
                  pix new hero.pix --width 16 --height 16\n  \
                  pix draw hero.pix --tool pencil --color red --at 4,4\n  \
                  pix export-gif hero.pix --output hero.gif"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print per-file timing information.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project with transparent frames.
    New(NewArgs),
    /// Print size, frames and frame names of project files.
    Info(InputArgs),
    /// Apply the pencil, eraser or fill tool at one or more points.
    Draw(DrawArgs),
    /// Resize the canvas, keeping the top-left region.
    Resize(ResizeArgs),
    /// Append blank frames, or duplicate the current one.
    AddFrame(AddFrameArgs),
    /// Export projects as looping animated GIFs.
    ExportGif(ExportGifArgs),
    /// Export one frame, every frame, or a sprite sheet as PNG.
    ExportPng(ExportPngArgs),
    /// Export Godot SpriteFrames / Animation resources.
    ExportGodot(ExportGodotArgs),
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Project file to create.
    pub output: PathBuf,
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    pub width: u32,
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    pub height: u32,
    /// Number of frames (at least 1).
    #[arg(long, default_value_t = 1)]
    pub frames: usize,
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Project file(s). Glob patterns accepted (e.g. "sprites/*.pix").
    #[arg(required = true, num_args = 1..)]
    pub input: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DrawArgs {
    /// Project file to edit.
    pub project: PathBuf,
    /// pencil, eraser or fill.
    #[arg(short, long, default_value = "pencil", value_parser = parse_tool)]
    pub tool: Tool,
    /// Hex (#rgb, #rrggbb, #rrggbbaa), a palette name, or "transparent".
    #[arg(short, long, default_value = "red", value_parser = parse_color_arg)]
    pub color: Color,
    /// Brush diameter for pencil and eraser.
    #[arg(short, long, default_value_t = 1)]
    pub size: u32,
    /// Point as X,Y. Repeat for several points.
    #[arg(long = "at", required = true, value_parser = parse_point, allow_hyphen_values = true)]
    pub points: Vec<(i32, i32)>,
    /// Frame to edit (default: frame 0).
    #[arg(short, long, default_value_t = 0)]
    pub frame: usize,
    /// Write here instead of overwriting the project.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ResizeArgs {
    pub project: PathBuf,
    #[arg(long)]
    pub width: u32,
    #[arg(long)]
    pub height: u32,
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AddFrameArgs {
    pub project: PathBuf,
    /// How many frames to add.
    #[arg(long, default_value_t = 1)]
    pub count: usize,
    /// Duplicate this frame instead of adding blank ones.
    #[arg(long, value_name = "INDEX")]
    pub duplicate: Option<usize>,
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportGifArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
    /// Output file. Only valid for a single input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Output directory for batch export.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Frame delay in hundredths of a second.
    #[arg(long, default_value_t = DEFAULT_GIF_DELAY_CS,
          value_parser = clap::value_parser!(u16).range(1..=100), conflicts_with = "fps")]
    pub delay: u16,
    /// Playback rate; converted to the nearest delay.
    #[arg(long)]
    pub fps: Option<f32>,
    /// Output width (default: canvas width).
    #[arg(long)]
    pub width: Option<u32>,
    /// Output height (default: canvas height).
    #[arg(long)]
    pub height: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ExportPngArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Frame to export.
    #[arg(short, long, default_value_t = 0)]
    pub frame: usize,
    /// Export every frame as `{stem}_{i}.png`.
    #[arg(long, conflicts_with_all = ["frame", "sheet"])]
    pub all: bool,
    /// Export all frames side by side as `{stem}_sheet.png`.
    #[arg(long)]
    pub sheet: bool,
    /// Show the previous frame faded underneath the exported frame.
    #[arg(long, conflicts_with_all = ["all", "sheet"])]
    pub onion_skin: bool,
}

#[derive(Args, Debug)]
pub struct ExportGodotArgs {
    pub project: PathBuf,
    /// Directory that receives `godot_export/`.
    #[arg(long, value_name = "DIR", default_value = "export")]
    pub output_dir: PathBuf,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one subcommand and return an OS exit code.
/// `0` = everything succeeded, `1` = one or more files failed.
pub fn run(cli: Cli) -> ExitCode {
    let verbose = cli.verbose;
    let result = match cli.command {
        Command::New(args) => run_new(&args),
        Command::Info(args) => return run_batch(&args.input, verbose, run_info),
        Command::Draw(args) => run_draw(&args),
        Command::Resize(args) => run_resize(&args),
        Command::AddFrame(args) => run_add_frame(&args),
        Command::ExportGif(args) => return run_export_gif(&args, verbose),
        Command::ExportPng(args) => return run_export_png(&args, verbose),
        Command::ExportGodot(args) => run_export_godot(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            log_err!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run `job` on every file matched by `patterns`, reporting progress the
/// same way for every batch command.
fn run_batch<F>(patterns: &[String], verbose: bool, mut job: F) -> ExitCode
where
    F: FnMut(&Path) -> Result<(), String>,
{
    let inputs = resolve_inputs(patterns);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        match job(input_path) {
            Ok(()) => {
                if verbose {
                    println!(
                        "  done ({:.0}ms)",
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("{}: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Commands
// ============================================================================

fn open(path: &Path) -> Result<Project, String> {
    Project::from_file(path).map_err(|e| format!("load failed: {}", e))
}

fn save(project: &mut Project, path: &Path) -> Result<(), String> {
    project
        .save_project(path)
        .map_err(|e| format!("save failed: {}", e))
}

fn run_new(args: &NewArgs) -> Result<(), String> {
    let mut project =
        Project::new(args.width, args.height).map_err(|e| format!("new failed: {}", e))?;
    for _ in 1..args.frames.max(1) {
        if project.add_frame().is_none() {
            return Err(format!("cannot create {} frames", args.frames));
        }
    }
    project.select_frame(0);
    save(&mut project, &args.output)?;
    println!(
        "{}: {}x{}, {} frame(s)",
        args.output.display(),
        args.width,
        args.height,
        project.sprite().frame_count()
    );
    Ok(())
}

fn run_info(path: &Path) -> Result<(), String> {
    let project = open(path)?;
    let sprite = project.sprite();
    println!(
        "{}: {}x{}, {} frame(s)",
        path.display(),
        sprite.width(),
        sprite.height(),
        sprite.frame_count()
    );
    for (i, frame) in sprite.frames().iter().enumerate() {
        let opaque = frame
            .buffer()
            .as_raw()
            .chunks_exact(4)
            .filter(|p| p[3] != 0)
            .count();
        println!("  [{}] {} ({} px drawn)", i, frame.name(), opaque);
    }
    Ok(())
}

/// Route one tool application to the matching edit primitive.
pub fn apply_tool(project: &mut Project, settings: &ToolSettings, x: i32, y: i32) -> bool {
    match settings.tool {
        Tool::Pencil => project.paint_brush(x, y, settings.brush_size, settings.color),
        Tool::Eraser => project.erase_brush(x, y, settings.brush_size),
        Tool::Fill => {
            x >= 0 && y >= 0 && project.flood_fill(x as u32, y as u32, settings.color)
        }
    }
}

fn run_draw(args: &DrawArgs) -> Result<(), String> {
    let mut project = open(&args.project)?;
    if !project.select_frame(args.frame) {
        return Err(format!(
            "frame {} does not exist ({} frame(s))",
            args.frame,
            project.sprite().frame_count()
        ));
    }

    let mut settings = ToolSettings {
        tool: args.tool,
        color: args.color,
        ..ToolSettings::default()
    };
    settings.set_brush_size(args.size);

    let changed = args
        .points
        .iter()
        .filter(|&&(x, y)| apply_tool(&mut project, &settings, x, y))
        .count();

    let output = args.output.as_deref().unwrap_or(&args.project);
    save(&mut project, output)?;
    println!(
        "{} {} at {} point(s), {} changed",
        settings.tool.label(),
        format_color(settings.color),
        args.points.len(),
        changed
    );
    Ok(())
}

fn run_resize(args: &ResizeArgs) -> Result<(), String> {
    let mut project = open(&args.project)?;
    project
        .resize_canvas(args.width, args.height)
        .map_err(|e| format!("resize failed: {}", e))?;
    let output = args.output.as_deref().unwrap_or(&args.project);
    save(&mut project, output)
}

fn run_add_frame(args: &AddFrameArgs) -> Result<(), String> {
    let mut project = open(&args.project)?;
    if let Some(index) = args.duplicate
        && !project.select_frame(index)
    {
        return Err(format!("frame {} does not exist", index));
    }
    for _ in 0..args.count {
        let added = match args.duplicate {
            Some(_) => project.duplicate_frame(),
            None => project.add_frame(),
        };
        if added.is_none() {
            return Err("frame limit reached".to_string());
        }
    }
    let output = args.output.as_deref().unwrap_or(&args.project);
    save(&mut project, output)?;
    println!(
        "{}: {} frame(s)",
        output.display(),
        project.sprite().frame_count()
    );
    Ok(())
}

fn run_export_gif(args: &ExportGifArgs, verbose: bool) -> ExitCode {
    let mut options = match args.fps {
        Some(fps) => GifOptions::from_fps(fps),
        None => GifOptions {
            delay_cs: args.delay,
            ..GifOptions::default()
        },
    };
    options.width = args.width;
    options.height = args.height;

    if args.inputs.input.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: several inputs given but --output only accepts a single file path.\n\
             Use --output-dir for batch export."
        );
        return ExitCode::FAILURE;
    }

    run_batch(&args.inputs.input, verbose, |input| {
        let output = build_output_path(
            input,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            "gif",
        )
        .ok_or_else(|| format!("cannot determine output path for '{}'", input.display()))?;
        let project = open(input)?;
        project
            .export_gif(&output, &options)
            .map_err(|e| format!("GIF export failed: {}", e))?;
        println!("  -> {}", output.display());
        Ok(())
    })
}

fn run_export_png(args: &ExportPngArgs, verbose: bool) -> ExitCode {
    run_batch(&args.inputs.input, verbose, |input| {
        let mut project = open(input)?;
        let stem = input
            .file_stem()
            .ok_or_else(|| format!("'{}' has no file name", input.display()))?
            .to_string_lossy()
            .into_owned();
        let dir = match args.output_dir.as_deref() {
            Some(dir) => dir.to_path_buf(),
            None => input.parent().unwrap_or(Path::new(".")).to_path_buf(),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("cannot create '{}': {}", dir.display(), e))?;

        if args.all {
            let written = project
                .export_all_png(&dir.join(&stem))
                .map_err(|e| format!("PNG export failed: {}", e))?;
            for path in &written {
                println!("  -> {}", path.display());
            }
        } else if args.sheet {
            let path = dir.join(format!("{}_sheet.png", stem));
            project
                .export_sprite_sheet(&path)
                .map_err(|e| format!("sprite sheet export failed: {}", e))?;
            println!("  -> {}", path.display());
        } else {
            if !project.select_frame(args.frame) {
                return Err(format!("frame {} does not exist", args.frame));
            }
            let path = dir.join(format!("{}.png", stem));
            let written = if args.onion_skin {
                write_png(&onion_composite(&project), &path)
            } else {
                project.export_png(&path)
            };
            written.map_err(|e| format!("PNG export failed: {}", e))?;
            println!("  -> {}", path.display());
        }
        Ok(())
    })
}

fn run_export_godot(args: &ExportGodotArgs) -> Result<(), String> {
    let project = open(&args.project)?;
    let written = project
        .export_godot(&args.output_dir)
        .map_err(|e| format!("Godot export failed: {}", e))?;
    for path in written {
        println!("  -> {}", path.display());
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// The current frame with its onion-skin neighbour faded to
/// [`ONION_SKIN_ALPHA`] wherever the current frame is empty.
fn onion_composite(project: &Project) -> RgbaImage {
    let sprite = project.sprite();
    let mut out = sprite.current_frame().buffer().as_image().clone();
    let Some(prev) = sprite.onion_skin_frame().and_then(|i| sprite.frame(i)) else {
        return out;
    };
    for (x, y, dst) in out.enumerate_pixels_mut() {
        let src = prev.buffer().get(x, y);
        if dst[3] == 0 && src[3] != 0 {
            let alpha = (src[3] as u16 * ONION_SKIN_ALPHA as u16 / 255) as u8;
            *dst = Rgba([src[0], src[1], src[2], alpha]);
        }
    }
    out
}

fn parse_tool(s: &str) -> Result<Tool, String> {
    Tool::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = Tool::all().iter().map(|t| t.label()).collect();
        format!("unknown tool '{}' (expected one of: {})", s, names.join(", "))
    })
}

fn parse_color_arg(s: &str) -> Result<Color, String> {
    parse_color(s).ok_or_else(|| format!("invalid colour '{}'", s))
}

fn parse_point(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad X in '{}': {}", s, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad Y in '{}': {}", s, e))?;
    Ok((x, y))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Output path for one input: `--output` wins, then `--output-dir/{stem}.{ext}`,
/// then `{stem}.{ext}` next to the input.
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    ext: &str,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }
    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}.{}", stem, ext)))
}
