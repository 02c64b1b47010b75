//! Shared time series and streamed voxel chunks, extracted from the input
//! table.
//!
//! The table is laid out one time frame per row: column 0 holds the frame
//! durations, column 1 the mid-frame sample times, column 2 the whole-blood
//! activity, and every further column is one voxel's TAC.

use std::error::Error;

use ndarray::{Array1, Array2};

use crate::{Activityf32, Timef32};

/// Columns preceding the first voxel TAC.
pub const META_COLUMNS: usize = 3;

pub struct TimeAxis {
    pub frame_duration: Array1<Timef32>,
    pub sample_time:    Array1<Timef32>,
}

impl TimeAxis {
    /// Number of time frames.
    pub fn len(&self) -> usize { self.sample_time.len() }
    pub fn is_empty(&self) -> bool { self.sample_time.is_empty() }
}

/// Whole-blood activity over the time axis. Doubles as the arterial input
/// function: a modelling assumption, not a measurement.
pub struct InputCurve {
    pub activity: Array1<Activityf32>,
}

/// Split off the three shared columns, validating the table shape first so
/// that a malformed input is reported before any output file exists.
pub fn split_table(table: &Array2<f32>) -> Result<(TimeAxis, InputCurve), Box<dyn Error>> {
    if table.nrows() == 0 {
        return Err("input table has no time frames".into());
    }
    if table.ncols() < META_COLUMNS {
        return Err(format!(
            "input table has {} columns; frame duration, sample time and blood \
             curve must come before the first voxel", table.ncols()).into());
    }
    if table.ncols() == META_COLUMNS {
        return Err("input table has no voxel columns".into());
    }
    let time = TimeAxis {
        frame_duration: table.column(0).to_owned(),
        sample_time:    table.column(1).to_owned(),
    };
    let blood = InputCurve { activity: table.column(2).to_owned() };
    Ok((time, blood))
}

/// Number of voxels the run will process, honouring the configured limit.
pub fn voxel_count(table: &Array2<f32>, limit: Option<usize>) -> usize {
    let available = table.ncols().saturating_sub(META_COLUMNS);
    limit.map_or(available, |n| n.min(available))
}

/// One streamed batch of observed TACs, shape (num_voxels, num_time_frame).
pub struct VoxelChunk {
    /// Absolute number of the first voxel in the batch.
    pub first_voxel: usize,
    pub tacs: Array2<Activityf32>,
}

impl VoxelChunk {
    pub fn num_voxels(&self) -> usize { self.tacs.nrows() }

    /// Absolute voxel numbers covered, inclusive.
    pub fn voxel_range(&self) -> (usize, usize) {
        (self.first_voxel, self.first_voxel + self.num_voxels() - 1)
    }
}

/// Iterator over successive fixed-width voxel chunks. The next chunk is not
/// extracted until the caller asks for it, which is all the backpressure the
/// streaming loop needs.
pub struct VoxelChunks<'t> {
    table: &'t Array2<f32>,
    next_col: usize,
    end_col: usize,
    chunk_size: usize,
}

impl<'t> VoxelChunks<'t> {
    pub fn new(table: &'t Array2<f32>, chunk_size: usize, num_voxels: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        let end_col = (META_COLUMNS + num_voxels).min(table.ncols());
        VoxelChunks { table, next_col: META_COLUMNS, end_col, chunk_size }
    }

    /// Chunks still to be yielded; sizes the progress bar when called before
    /// iteration starts.
    pub fn num_chunks(&self) -> usize {
        let nvox = self.end_col.saturating_sub(self.next_col);
        (nvox + self.chunk_size - 1) / self.chunk_size
    }
}

impl Iterator for VoxelChunks<'_> {
    type Item = VoxelChunk;

    fn next(&mut self) -> Option<VoxelChunk> {
        if self.next_col >= self.end_col { return None; }
        let hi = (self.next_col + self.chunk_size).min(self.end_col);
        let mut tacs = Array2::zeros((hi - self.next_col, self.table.nrows()));
        for (v, mut tac) in tacs.outer_iter_mut().enumerate() {
            tac.assign(&self.table.column(self.next_col + v));
        }
        let chunk = VoxelChunk { first_voxel: self.next_col - META_COLUMNS, tacs };
        self.next_col = hi;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};
    use rstest::rstest;

    // 2 time frames, `nvox` voxel columns with voxel v's TAC = [v, v+10]
    fn table_with_voxels(nvox: usize) -> Array2<f32> {
        let mut t = Array::zeros((2, META_COLUMNS + nvox));
        t[(0, 0)] = 0.5; t[(1, 0)] = 0.5;   // frame durations
        t[(0, 1)] = 0.25; t[(1, 1)] = 0.75; // sample times
        t[(0, 2)] = 7.0; t[(1, 2)] = 3.0;   // blood curve
        for v in 0..nvox {
            t[(0, META_COLUMNS + v)] = v as f32;
            t[(1, META_COLUMNS + v)] = v as f32 + 10.0;
        }
        t
    }

    #[test]
    fn splits_the_three_shared_columns() {
        let table = table_with_voxels(2);
        let (time, blood) = split_table(&table).unwrap();
        assert_eq!(time.frame_duration, array![0.5, 0.5]);
        assert_eq!(time.sample_time, array![0.25, 0.75]);
        assert_eq!(blood.activity, array![7.0, 3.0]);
        assert_eq!(time.len(), 2);
    }

    #[rstest(ncols, case(0), case(2), case(3))]
    fn rejects_tables_without_voxel_columns(ncols: usize) {
        let table = Array::zeros((2, ncols));
        assert!(split_table(&table).is_err());
    }

    #[test]
    fn rejects_empty_tables() {
        let table = Array::zeros((0, 5));
        assert!(split_table(&table).is_err());
    }

    #[rstest(limit, expected,
        case(None    , 7),
        case(Some(3) , 3),
        case(Some(99), 7),
    )]
    fn voxel_count_honours_the_limit(limit: Option<usize>, expected: usize) {
        assert_eq!(voxel_count(&table_with_voxels(7), limit), expected);
    }

    #[rstest(nvox, chunk_size, limit, sizes, firsts,
        case(7, 3, 7, vec![3, 3, 1], vec![0, 3, 6]),
        case(7, 3, 2, vec![2]      , vec![0]      ),
        case(6, 3, 6, vec![3, 3]   , vec![0, 3]   ),
        case(1, 25, 1, vec![1]     , vec![0]      ),
    )]
    fn chunks_cover_the_voxels_in_order(
        nvox: usize, chunk_size: usize, limit: usize,
        sizes: Vec<usize>, firsts: Vec<usize>,
    ) {
        let table = table_with_voxels(nvox);
        let chunks = VoxelChunks::new(&table, chunk_size, limit);
        assert_eq!(chunks.num_chunks(), sizes.len());
        let collected: Vec<VoxelChunk> = chunks.collect();
        let got_sizes:  Vec<usize> = collected.iter().map(|c| c.num_voxels()).collect();
        let got_firsts: Vec<usize> = collected.iter().map(|c| c.first_voxel).collect();
        assert_eq!(got_sizes, sizes);
        assert_eq!(got_firsts, firsts);
    }

    #[test]
    fn chunk_rows_are_voxel_tacs() {
        let table = table_with_voxels(4);
        let chunk = VoxelChunks::new(&table, 3, 4).next().unwrap();
        assert_eq!(chunk.tacs.row(0), array![0.0, 10.0]);
        assert_eq!(chunk.tacs.row(2), array![2.0, 12.0]);
        assert_eq!(chunk.voxel_range(), (0, 2));
    }
}
