//! The chunked ABC streaming loop.

use std::error::Error;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::vabc::Config;
use crate::io::{self, PosteriorWriter};
use crate::utils::group_digits;
use crate::utils::timing::Progress;
use crate::{accept, model, posterior, prior, series};

/// One complete vABC pass: sample the priors, synthesise the predicted TACs
/// once, then stream voxel chunks through acceptance, aggregation and output.
///
/// Deterministic for a fixed configuration; any failure aborts the run with
/// everything written so far left on disk.
pub fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let mut progress = Progress::new();

    progress.start("Reading input table");
    let table = if config.input_compressed {
        io::hdf5::read_table(&config.input, "df")?
    } else {
        io::table::read_csv(&config.input)?
    };
    progress.done_with_message(
        &format!("{} time frames, {} columns", table.nrows(), table.ncols()));

    // Table validation happens before any output file is created
    let (time_axis, blood) = series::split_table(&table)?;
    let num_voxels = series::voxel_count(&table, config.num_voxels);

    progress.start(&format!("Sampling {} prior draws", group_digits(config.num_simulations)));
    let mut rng = StdRng::seed_from_u64(config.seed);
    let priors = prior::sample(config.num_simulations, &mut rng);
    progress.done();

    progress.start("Synthesising predicted TACs");
    // The whole-blood curve doubles as the arterial input function
    let predicted = model::predicted_tacs(&time_axis, &blood, &blood, &priors);
    progress.done();

    let mut writer = PosteriorWriter::create(config)?;

    let chunks = series::VoxelChunks::new(&table, config.chunk_size, num_voxels);
    let bar = ProgressBar::new(chunks.num_chunks() as u64);
    bar.set_style(ProgressStyle::default_bar()
                  .template("[{elapsed_precise}] {wide_bar} {pos}/{len} chunks ({eta_precise})")
                  .unwrap()
    );
    bar.tick();

    for (chunk_index, chunk) in chunks.enumerate() {
        let accepted = accept::accepted_draws(&predicted, &chunk, config.thresh, chunk_index)?;
        let params = config.write_params
            .then(|| posterior::param_records(&priors, &accepted, chunk.first_voxel));
        let models = posterior::model_records(
            &priors, &accepted, chunk.first_voxel, config.model_0_prob_thres);
        writer.append(params.as_deref(), &models)?;
        bar.inc(1);
    }
    bar.finish();

    writer.finish()?;
    Ok(())
}
