use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use petabc::config::vabc::{read_config_file, Config};

/// Command line interface for the `vabc` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "vabc",
    about = "Voxel-wise ABC model selection for dynamic FDG PET",
)]
struct Cli {
    /// TOML run configuration
    config: PathBuf,

    /// Override: input table (CSV, or HDF5 with --input-compressed)
    #[clap(long)]
    input: Option<PathBuf>,

    /// Override: model posterior output path
    #[clap(long)]
    output_model: Option<PathBuf>,

    /// Override: parameter posterior output path
    #[clap(long)]
    output_params: Option<PathBuf>,

    /// Override: number of voxels to process
    #[clap(long)]
    num_voxels: Option<usize>,

    /// Override: number of prior draws S
    #[clap(short = 's', long)]
    num_simulations: Option<usize>,

    /// Override: acceptance quantile
    #[clap(short = 't', long)]
    thresh: Option<f32>,

    /// Override: model-0 probability threshold
    #[clap(long)]
    model_0_prob_thres: Option<f32>,

    /// Override: voxels per streamed chunk
    #[clap(short = 'c', long)]
    chunk_size: Option<usize>,

    /// Override: RNG seed
    #[clap(long)]
    seed: Option<u64>,

    /// Skip the parameter posterior, write the model posterior only
    #[clap(long)]
    no_params: bool,

    /// Input table is compressed columnar (HDF5 dataset `df`)
    #[clap(long)]
    input_compressed: bool,

    /// Write compressed columnar outputs
    #[clap(long)]
    output_compressed: bool,
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(x) = &cli.input              { config.input = x.clone(); }
    if let Some(x) = &cli.output_model       { config.output_model = x.clone(); }
    if let Some(x) = &cli.output_params      { config.output_params = Some(x.clone()); }
    if let Some(x) = cli.num_voxels          { config.num_voxels = Some(x); }
    if let Some(x) = cli.num_simulations     { config.num_simulations = x; }
    if let Some(x) = cli.thresh              { config.thresh = x; }
    if let Some(x) = cli.model_0_prob_thres  { config.model_0_prob_thres = x; }
    if let Some(x) = cli.chunk_size          { config.chunk_size = x; }
    if let Some(x) = cli.seed                { config.seed = x; }
    if cli.no_params         { config.write_params = false; }
    if cli.input_compressed  { config.input_compressed = true; }
    if cli.output_compressed { config.output_compressed = true; }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = read_config_file(cli.config.clone());
    apply_overrides(&mut config, &cli);

    // Make sure the output destinations exist before the long compute starts
    for path in [Some(&config.output_model), config.output_params.as_ref()].into_iter().flatten() {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).unwrap_or_else(|e| panic!(
                    "\n\nCan't write in directory\n\n   {}\n\nbecause\n\n   {e}\n\n",
                    dir.display()));
            }
        }
    }

    petabc::abc::run(&config)
}
