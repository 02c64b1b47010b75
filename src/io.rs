//! Streaming posterior output: append-only flat tables, with optional
//! compressed columnar storage.

pub mod hdf5;
pub mod table;

use std::error::Error;
use std::path::PathBuf;

use crate::config::vabc::Config;
use crate::posterior::{ModelRecord, ParamRecord, MODEL_COLUMNS, PARAM_COLUMNS};

enum ParamSink {
    Csv(PathBuf),
    Hdf5(::hdf5::File),
}

/// Chunk-by-chunk writer for both posteriors.
///
/// The parameter posterior goes straight to its final format. The model
/// posterior is always appended as CSV during the run and only rewritten to
/// the compressed form once every chunk has been processed.
pub struct PosteriorWriter {
    params: Option<ParamSink>,
    model_csv: PathBuf,
    compress_model_to: Option<PathBuf>,
}

impl PosteriorWriter {
    /// Create the output files. Must run after input validation: a malformed
    /// table has to be reported before any output file exists.
    pub fn create(config: &Config) -> Result<Self, Box<dyn Error>> {
        let params = if config.write_params {
            let path = config.output_params.clone()
                .ok_or("write_params is set but no output_params path was given")?;
            Some(if config.output_compressed {
                ParamSink::Hdf5(::hdf5::File::create(&path)?)
            } else {
                table::create_with_header(&path, &PARAM_COLUMNS)?;
                ParamSink::Csv(path)
            })
        } else {
            None
        };

        let (model_csv, compress_model_to) = if config.output_compressed {
            (config.output_model.with_extension("csv"), Some(config.output_model.clone()))
        } else {
            (config.output_model.clone(), None)
        };
        table::create_with_header(&model_csv, &MODEL_COLUMNS)?;

        Ok(PosteriorWriter { params, model_csv, compress_model_to })
    }

    /// Append one chunk's records, in chunk order.
    pub fn append(&mut self, params: Option<&[ParamRecord]>, model: &[ModelRecord]) -> Result<(), Box<dyn Error>> {
        if let (Some(sink), Some(records)) = (self.params.as_mut(), params) {
            match sink {
                ParamSink::Csv(path)  => table::append_records(path, records)?,
                ParamSink::Hdf5(file) => hdf5::append_param_chunk(file, records)?,
            }
        }
        table::append_records(&self.model_csv, model)?;
        Ok(())
    }

    /// Finalise the stores. The model posterior's compressed form is produced
    /// here, by re-reading the flat file.
    pub fn finish(self) -> Result<(), Box<dyn Error>> {
        if let Some(h5_path) = &self.compress_model_to {
            hdf5::compress_model_table(&self.model_csv, h5_path)?;
        }
        Ok(())
    }
}
