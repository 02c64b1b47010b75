//! Configuration file parser for vABC runs

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {

    /// Input table: CSV by default, HDF5 dataset `df` when `input_compressed`
    #[serde(default = "mandatory")]
    pub input: PathBuf,

    /// Where the per-voxel model posterior goes. Always written
    #[serde(default = "mandatory")]
    pub output_model: PathBuf,

    /// Where the parameter posterior goes. Required when `write_params`
    #[serde(default)]
    pub output_params: Option<PathBuf>,

    /// Number of voxels to process; every available voxel when absent
    #[serde(default)]
    pub num_voxels: Option<usize>,

    /// Number of prior draws S
    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,

    /// Acceptance quantile of the per-voxel distance distribution
    #[serde(default = "default_thresh")]
    pub thresh: f32,

    /// Posterior probability of the k4-zero structure below which a voxel is
    /// labelled k4 non-zero
    #[serde(default = "default_model_0_prob_thres")]
    pub model_0_prob_thres: f32,

    /// Number of voxels per streamed chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Whether to emit the parameter posterior alongside the model posterior
    #[serde(default = "default_write_params")]
    pub write_params: bool,

    #[serde(default)]
    pub input_compressed: bool,

    #[serde(default)]
    pub output_compressed: bool,

    /// Seed of the run's single RNG stream
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_num_simulations() -> usize { 1_000_000 }
fn default_thresh() -> f32 { 1e-4 }
fn default_model_0_prob_thres() -> f32 { 0.5 }
fn default_chunk_size() -> usize { 25 }
fn default_write_params() -> bool { true }
fn default_seed() -> u64 { 2024 }

pub fn read_config_file(path: PathBuf) -> Config {
    let config: String = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Couldn't read config file `{}`: {e}", path.display()));
    toml::from_str(&config)
        .unwrap_or_else(|e| panic!("Invalid config file `{}`: {e}", path.display()))
}

// Hack to allow mandatory fields to be missing during testing.
#[cfg(not(test))]
fn mandatory<T>() -> T { panic!("MISSING MANDATORY CONFIG FIELD. TODO: report which one") }
#[cfg(test)]
fn mandatory<T: Default>() -> T { T::default() }
