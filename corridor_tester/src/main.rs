use anyhow::{Context, bail};
use clap::{ArgAction, Parser, ValueEnum};
use cone_corridor::core_modules::line_fitter::LineExtent;
use cone_corridor::parallel_pipeline::{ImageJob, ParallelPipeline};
use cone_corridor::{CorridorDetector, CorridorReport, DetectorConfig};
use std::path::{Path, PathBuf};

/// Draws left/right corridor boundary lines through the orange cones in an image.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Image(s) to process.
    #[arg(required = true, value_name = "IMAGE")]
    inputs: Vec<PathBuf>,

    /// Where to save the annotated image. Only valid with a single input;
    /// defaults to `answer.png`.
    #[arg(short, long, value_name = "FILEPATH", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Directory for annotated copies named `<stem>_boundaries.png`. Implied
    /// (as the current directory) when more than one input is given.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// JSON detector configuration. Flags below override its values.
    #[arg(short, long, value_name = "FILEPATH")]
    config: Option<PathBuf>,

    /// Lower HSV threshold as `H,S,V` (hue 0-179).
    #[arg(long, value_name = "H,S,V", value_parser = parse_triple)]
    lower: Option<[u8; 3]>,

    /// Upper HSV threshold as `H,S,V` (hue 0-179).
    #[arg(long, value_name = "H,S,V", value_parser = parse_triple)]
    upper: Option<[u8; 3]>,

    /// Side of the square opening element (odd).
    #[arg(long, value_name = "PIXELS")]
    open_kernel: Option<u8>,

    /// Side of the square closing element (odd).
    #[arg(long, value_name = "PIXELS")]
    close_kernel: Option<u8>,

    /// Blobs need strictly more pixels than this to count as cones.
    #[arg(long, value_name = "PIXELS")]
    min_area: Option<u64>,

    /// Line color as `#RRGGBB`.
    #[arg(long, value_name = "HEX CODE", value_parser = parse_rgb)]
    color: Option<[u8; 3]>,

    /// Line thickness in pixels.
    #[arg(long, value_name = "PIXELS")]
    thickness: Option<u32>,

    /// Horizontal span of the drawn lines.
    #[arg(long, value_enum, value_name = "EXTENT")]
    extent: Option<Extent>,

    /// Number of batch workers. Defaults to the number of CPUs.
    #[arg(long, value_name = "COUNT")]
    workers: Option<usize>,

    /// More logging. Pass twice for trace output.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Extent {
    /// Across the whole frame.
    FullWidth,
    /// Between the outermost cones of each side.
    MarkerSpan,
}

impl From<Extent> for LineExtent {
    fn from(extent: Extent) -> Self {
        match extent {
            Extent::FullWidth => LineExtent::FullWidth,
            Extent::MarkerSpan => LineExtent::MarkerSpan,
        }
    }
}

/// Where annotated images go.
#[derive(Debug, PartialEq, Eq)]
enum Destination {
    Single(PathBuf),
    Directory(PathBuf),
}

fn destination(args: &Args) -> anyhow::Result<Destination> {
    if let Some(dir) = &args.output_dir {
        return Ok(Destination::Directory(dir.clone()));
    }
    match (&args.output, args.inputs.len()) {
        (Some(output), 1) => Ok(Destination::Single(output.clone())),
        (None, 1) => Ok(Destination::Single(PathBuf::from("answer.png"))),
        (Some(_), count) => bail!("--output names a single file but {count} inputs were given; use --output-dir"),
        (None, _) => Ok(Destination::Directory(PathBuf::from("."))),
    }
}

fn parse_triple(text: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [h, s, v] = parts.as_slice() else {
        return Err(format!("expected three comma-separated values, got \"{text}\""));
    };
    let channel = |part: &str| {
        part.parse::<u8>()
            .map_err(|_| format!("\"{part}\" is not a value between 0 and 255"))
    };
    Ok([channel(*h)?, channel(*s)?, channel(*v)?])
}

// Parses a color hex code of the form '#RRGGBB' into RGB channels.
fn parse_rgb(hex_code: &str) -> Result<[u8; 3], String> {
    let digits = hex_code.strip_prefix('#').unwrap_or(hex_code);
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(format!("invalid hex code: \"{hex_code}\""));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| format!("invalid hex code: \"{hex_code}\""))
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn build_config(args: &Args) -> anyhow::Result<DetectorConfig> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => DetectorConfig::default(),
    };

    if let Some(lower) = args.lower {
        config.hsv_bounds.lower = lower;
    }
    if let Some(upper) = args.upper {
        config.hsv_bounds.upper = upper;
    }
    if let Some(size) = args.open_kernel {
        config.open_kernel_size = size;
    }
    if let Some(size) = args.close_kernel {
        config.close_kernel_size = size;
    }
    if let Some(min_area) = args.min_area {
        config.min_area = min_area;
    }
    if let Some(color) = args.color {
        config.line_style.color = color;
    }
    if let Some(thickness) = args.thickness {
        config.line_style.thickness = thickness;
    }
    if let Some(extent) = args.extent {
        config.line_extent = extent.into();
    }
    Ok(config)
}

fn batch_output(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    dir.join(format!("{stem}_boundaries.png"))
}

fn print_report(input: &Path, output: &Path, report: &CorridorReport) {
    let centers: Vec<String> = report.centers.iter().map(ToString::to_string).collect();
    println!(
        "{}: {} cone(s) detected {}",
        input.display(),
        report.centers.len(),
        centers.join(" ")
    );
    println!("  left:  {}", report.left);
    println!("  right: {}", report.right);
    println!(
        "Boundary lines drawn and saved as {}.",
        output.display()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    init_logging(args.verbose);

    // --- 2. Detector Initialization ---
    let destination = destination(&args)?;
    let detector = CorridorDetector::new(build_config(&args)?)
        .context("validating detector configuration")?;
    log::debug!("running with configuration: {:?}", detector.config());

    // --- 3. Single Image ---
    let output_dir = match destination {
        Destination::Single(output) => {
            let input = &args.inputs[0];
            let report = detector
                .process_file(input, &output)
                .with_context(|| format!("processing {}", input.display()))?;
            print_report(input, &output, &report);
            return Ok(());
        }
        Destination::Directory(dir) => dir,
    };

    // --- 4. Batch ---
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let jobs: Vec<ImageJob> = args
        .inputs
        .iter()
        .map(|input| ImageJob::new(input, batch_output(&output_dir, input)))
        .collect();

    let pipeline = match args.workers {
        Some(count) => ParallelPipeline::with_workers(detector, count),
        None => ParallelPipeline::new(detector),
    };
    let outcomes = pipeline.process_batch(jobs).await;
    pipeline.shutdown().await;

    let total = outcomes.len();
    let mut failures = 0;
    for outcome in outcomes {
        match outcome.result {
            Ok(report) => print_report(&outcome.job.input, &outcome.job.output, &report),
            Err(err) => {
                failures += 1;
                eprintln!("{}: {err}", outcome.job.input.display());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {total} image(s) failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triples_parse_with_or_without_spaces() {
        assert_eq!(parse_triple("10,100,100"), Ok([10, 100, 100]));
        assert_eq!(parse_triple(" 25, 255 ,255 "), Ok([25, 255, 255]));
        assert!(parse_triple("10,100").is_err());
        assert!(parse_triple("10,100,256").is_err());
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_rgb("#FF0000"), Ok([255, 0, 0]));
        assert_eq!(parse_rgb("00ff7f"), Ok([0, 255, 127]));
        assert!(parse_rgb("#FFF").is_err());
        assert!(parse_rgb("#GG0000").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "corridor_tester",
            "red.png",
            "--min-area",
            "75",
            "--lower",
            "5,120,90",
            "--extent",
            "marker-span",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.min_area, 75);
        assert_eq!(config.hsv_bounds.lower, [5, 120, 90]);
        assert_eq!(config.hsv_bounds.upper, [25, 255, 255]);
        assert_eq!(config.line_extent, LineExtent::MarkerSpan);
        assert_eq!(
            destination(&args).unwrap(),
            Destination::Single(PathBuf::from("answer.png"))
        );
    }

    #[test]
    fn extent_flag_can_switch_marker_span_back_off() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("detector.json");
        std::fs::write(&config, r#"{ "line_extent": "marker_span" }"#).unwrap();
        let config = config.to_string_lossy().into_owned();

        let from_file = Args::parse_from(["corridor_tester", "red.png", "-c", config.as_str()]);
        assert_eq!(build_config(&from_file).unwrap().line_extent, LineExtent::MarkerSpan);

        let overridden = Args::parse_from([
            "corridor_tester",
            "red.png",
            "-c",
            config.as_str(),
            "--extent",
            "full-width",
        ]);
        assert_eq!(build_config(&overridden).unwrap().line_extent, LineExtent::FullWidth);
    }

    #[test]
    fn output_file_is_rejected_for_several_inputs() {
        let args = Args::parse_from(["corridor_tester", "a.png", "b.png", "-o", "out.png"]);
        assert!(destination(&args).is_err());

        let args = Args::parse_from(["corridor_tester", "a.png", "b.png"]);
        assert_eq!(destination(&args).unwrap(), Destination::Directory(PathBuf::from(".")));

        let args = Args::parse_from(["corridor_tester", "a.png", "-o", "out.png"]);
        assert_eq!(destination(&args).unwrap(), Destination::Single(PathBuf::from("out.png")));
    }

    #[test]
    fn output_file_and_directory_conflict() {
        let parsed = Args::try_parse_from(["corridor_tester", "a.png", "-o", "x.png", "--output-dir", "out"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn batch_names_derive_from_the_input_stem() {
        assert_eq!(
            batch_output(Path::new("out"), Path::new("frames/cones_01.jpg")),
            PathBuf::from("out/cones_01_boundaries.png")
        );
    }
}
