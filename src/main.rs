//! vessel-detector CLI: train a vessel classifier or segment one image.

use clap::Parser;
use log::{info, LevelFilter};
use std::path::PathBuf;
use vessel_detector::database::Database;
use vessel_detector::fov::build_fov;
use vessel_detector::image::io;
use vessel_detector::linemask::LineMaskBank;
use vessel_detector::pipeline::{classify_image, train_model, ImageBundle, SegmenterParams};
use vessel_detector::protocol::Model;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "vessel-detector")]
#[command(about = "Segment blood vessels in retinal fundus photographs")]
#[command(version)]
struct Cli {
    /// Image number(s) from the database.
    #[arg(short, long, num_args = 1.., required = true)]
    images: Vec<u32>,

    /// Line detector side length (odd).
    #[arg(short, long, default_value = "15")]
    kernel: usize,

    /// Number of sampled orientations in [0°, 180°).
    #[arg(short, long, default_value = "15")]
    rotation: usize,

    /// Train a model instead of classifying.
    #[arg(short, long)]
    train: bool,

    /// Fit calibrated probability estimates (slower training).
    #[arg(short, long)]
    proba: bool,

    /// Image database to read from.
    #[arg(long, default_value = "drive", value_parser = parse_database)]
    database: Database,

    /// Root directory holding the database folders.
    #[arg(long, default_value = ".")]
    data_root: PathBuf,

    /// Model file written by training mode, read by classify mode.
    #[arg(long, default_value = "model.json")]
    model: PathBuf,

    /// Save the prediction raster next to the reports.
    #[arg(short, long)]
    save: bool,

    /// Directory for predictions and reports.
    #[arg(short, long, default_value = "out")]
    out_dir: PathBuf,

    /// Verbose logging, including convolution progress.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_database(value: &str) -> Result<Database, String> {
    value.parse()
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let params = SegmenterParams {
        kernel_size: cli.kernel,
        rotation_resolution: cli.rotation,
        svm: vessel_detector::classifier::SvmOptions {
            probability: cli.proba,
            ..Default::default()
        },
        ..Default::default()
    };
    let bank = LineMaskBank::generate(params.kernel_size, params.rotation_resolution)?;

    info!(
        "reading {} image(s) from the {:?} database",
        cli.images.len(),
        cli.database
    );
    let bundles = cli
        .images
        .iter()
        .map(|&n| load_bundle(cli, n, params.kernel_size))
        .collect::<CliResult<Vec<_>>>()?;

    if cli.train {
        let model = train_model(&bundles, &bank, &params)?;
        io::write_json_file(&cli.model, &model)?;
        info!("wrote model to {}", cli.model.display());
    } else {
        let model: Model = io::read_json_file(&cli.model)?;
        let report = classify_image(&bundles, &bank, &model, &params)?;
        info!(
            "prediction scores are {}",
            if report.probabilistic {
                "calibrated probabilities"
            } else {
                "raw decision values"
            }
        );

        if let Some(metrics) = &report.metrics {
            io::write_json_file(&cli.out_dir.join("metrics.json"), metrics)?;
        }
        if let Some(roc) = &report.roc {
            io::write_json_file(&cli.out_dir.join("roc.json"), roc)?;
        }
        if cli.save {
            let path = cli.out_dir.join("prediction.png");
            io::save_prediction(&report.prediction, &path)?;
            info!("saved classified image to {}", path.display());
        }
    }
    Ok(())
}

fn load_bundle(cli: &Cli, index: u32, kernel_size: usize) -> CliResult<ImageBundle> {
    let image = io::load_inverted_green(&cli.database.image_path(&cli.data_root, index))?;
    let raw_mask = io::load_binary_mask(&cli.database.mask_path(&cli.data_root, index))?;
    let fov = build_fov(&raw_mask, kernel_size)?;
    let truth = io::load_binary_mask(&cli.database.truth_path(&cli.data_root, index))?;
    Ok(ImageBundle {
        image,
        fov,
        truth: Some(truth),
    })
}
