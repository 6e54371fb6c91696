extern crate hp_staging;

use clap::Parser;
use hp_staging::output::FileOutput;
use hp_staging::run_project;
use hp_staging::sizing_results::TabularResultsStore;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct SizingArgs {
    /// Retrofit request listing the units to size
    request_file: String,
    /// Performance dataset of the replacement product family
    #[arg(long, short)]
    performance_dataset: String,
    /// Tabular results of a sizing run, for finer design loads
    #[arg(long, short)]
    sizing_results: Option<String>,
    /// Directory to write results to, defaults to the directory of the request file
    #[arg(long, short)]
    output_dir: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = SizingArgs::parse();

    let request_path = Path::new(&args.request_file);
    let request_stem = request_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("retrofit");
    let output_dir = match &args.output_dir {
        Some(dir) => PathBuf::from(dir),
        None => request_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    let output = FileOutput::new(output_dir, format!("{request_stem}_{{}}.csv"));

    let sizing_results = args
        .sizing_results
        .as_deref()
        .map(|path| TabularResultsStore::from_json(BufReader::new(File::open(path)?)))
        .transpose()?;

    let model = run_project(
        BufReader::new(File::open(&args.performance_dataset)?),
        BufReader::new(File::open(request_path)?),
        sizing_results,
        &output,
    )?;

    info!(
        sized = model.units.len(),
        skipped = model.skipped.len(),
        "Finished sizing"
    );

    Ok(())
}
