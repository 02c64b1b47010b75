//! ABC rejection step: per-voxel distances, quantile thresholds and the
//! accepted draw selection.

use half::f16;
use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;

use crate::model::PredictedTacs;
use crate::series::VoxelChunk;
use crate::utils::quantile;

/// Accepted prior-draw indices, shape (num_voxels, accepted_size).
///
/// The rectangular shape is the batch invariant: every voxel of a chunk must
/// accept exactly the same number of draws.
#[derive(Debug)]
pub struct AcceptedDraws {
    pub indices: Array2<u32>,
}

impl AcceptedDraws {
    pub fn num_voxels(&self) -> usize { self.indices.nrows() }
    pub fn accepted_size(&self) -> usize { self.indices.ncols() }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptError {
    /// Tied distances at the threshold gave some voxel a different accepted
    /// count from the rest of its chunk, which would corrupt the rectangular
    /// accepted-draw layout. Fatal: never padded, truncated or retried.
    AcceptedCountMismatch {
        chunk_index: usize,
        voxel_start: usize,
        voxel_end: usize,
        voxel: usize,
        expected: usize,
        found: usize,
    },
}

impl std::fmt::Display for AcceptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcceptError::AcceptedCountMismatch {
                chunk_index, voxel_start, voxel_end, voxel, expected, found,
            } => write!(
                f,
                "chunk {chunk_index} (voxels {voxel_start}..={voxel_end}): voxel {voxel} \
                 accepted {found} draws where {expected} were expected; distances tied \
                 at the acceptance threshold make the chunk non-rectangular"
            ),
        }
    }
}

impl std::error::Error for AcceptError {}

/// For each voxel of the chunk: L1 distances to all S predicted TACs, the
/// `thresh`-quantile of those distances, and the indices of every draw at or
/// under it. The chunk must contain at least one voxel.
pub fn accepted_draws(
    predicted: &PredictedTacs,
    chunk: &VoxelChunk,
    thresh: f32,
    chunk_index: usize,
) -> Result<AcceptedDraws, AcceptError> {
    assert!(chunk.num_voxels() > 0, "chunk must contain at least one voxel");
    let num_draws = predicted.nrows();
    let mut distances = vec![0.0f32; num_draws];
    let mut scratch = Vec::with_capacity(num_draws);
    let mut per_voxel: Vec<Vec<u32>> = Vec::with_capacity(chunk.num_voxels());

    for observed in chunk.tacs.outer_iter() {
        predicted.axis_iter(Axis(0))
            .into_par_iter()
            .zip(distances.par_iter_mut())
            .for_each(|(simulated, d)| *d = l1_distance(simulated, observed));

        scratch.clear();
        scratch.extend_from_slice(&distances);
        let h = quantile(&mut scratch, thresh);

        per_voxel.push(
            distances.iter().enumerate()
                .filter(|&(_, d)| *d <= h)
                .map(|(s, _)| s as u32)
                .collect());
    }

    let accepted_size = per_voxel[0].len();
    for (v, accepted) in per_voxel.iter().enumerate() {
        if accepted.len() != accepted_size {
            let (voxel_start, voxel_end) = chunk.voxel_range();
            return Err(AcceptError::AcceptedCountMismatch {
                chunk_index,
                voxel_start,
                voxel_end,
                voxel: chunk.first_voxel + v,
                expected: accepted_size,
                found: accepted.len(),
            });
        }
    }

    let mut indices = Array2::zeros((per_voxel.len(), accepted_size));
    for (mut row, accepted) in indices.outer_iter_mut().zip(&per_voxel) {
        row.assign(&ArrayView1::from(&accepted[..]));
    }
    Ok(AcceptedDraws { indices })
}

fn l1_distance(simulated: ArrayView1<f16>, observed: ArrayView1<f32>) -> f32 {
    simulated.iter().zip(observed.iter())
        .map(|(&p, &o)| (p.to_f32() - o).abs())
        .sum()
}
