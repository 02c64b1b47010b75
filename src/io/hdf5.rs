//! Compressed columnar storage: HDF5 input tables and posterior datasets.

use std::error::Error;
use std::fs;
use std::path::Path;

use ndarray::Array2;

use crate::posterior::{ModelRecord, ParamRecord};
use crate::prior::Model;

pub use rows::{ModelRow, ParamRow};

/// Read a 2-D float table from `dataset`. The input side stores the whole
/// table under the key `df`.
pub fn read_table(filename: &dyn AsRef<Path>, dataset: &str) -> hdf5::Result<Array2<f32>> {
    let file = ::hdf5::File::open(filename)?;
    let dataset = file.dataset(dataset)?;
    dataset.read_2d::<f32>()
}

/// Append one chunk of the parameter posterior as its own deflate-compressed
/// dataset, keyed by the chunk's absolute voxel range, like `voxel_25_49`.
pub fn append_param_chunk(file: &::hdf5::File, records: &[ParamRecord]) -> Result<(), Box<dyn Error>> {
    let rows: Vec<ParamRow> = records.iter().map(ParamRow::from).collect();
    let lo = records.iter().map(|r| r.voxel_no).min().unwrap_or(0);
    let hi = records.iter().map(|r| r.voxel_no).max().unwrap_or(0);
    file.new_dataset_builder()
        .with_data(&rows)
        .deflate(9)
        .create(format!("voxel_{lo}_{hi}").as_str())?;
    Ok(())
}

/// Rewrite the flat model posterior as a single deflate-compressed `df`
/// dataset. The flat file is removed only after the conversion has succeeded.
pub fn compress_model_table(csv_path: &Path, h5_path: &Path) -> Result<(), Box<dyn Error>> {
    let records = crate::io::table::read_model_records(csv_path)?;
    let rows: Vec<ModelRow> = records.iter().map(ModelRow::from).collect();
    {
        let file = ::hdf5::File::create(h5_path)?;
        file.new_dataset_builder()
            .with_data(&rows)
            .deflate(9)
            .create("df")?;
    }
    if csv_path != h5_path {
        fs::remove_file(csv_path)?;
    }
    Ok(())
}

fn label(model: Model) -> rows::Label {
    ::hdf5::types::FixedAscii::from_ascii(model.label())
        .expect("model labels fit in the fixed-width column")
}

// The on-disk compound types carry the tables' column names, which are not
// Rust-style, and a fixed-width ASCII model label instead of the enum.
#[allow(nonstandard_style)]
mod rows {
    use super::{label, ModelRecord, ParamRecord};

    /// Width of the model label column, sized for "k4 non-zero".
    pub const LABEL_LEN: usize = 11;
    pub type Label = ::hdf5::types::FixedAscii<LABEL_LEN>;

    #[derive(hdf5::H5Type, Clone, PartialEq, Debug)]
    #[repr(C)]
    pub struct ParamRow {
        pub Voxel_No: i32,
        pub Vb:  f32,
        pub K_1: f32,
        pub k_2: f32,
        pub k_3: f32,
        pub k_4: f32,
        pub K_i: f32,
        pub model: Label,
    }

    impl From<&ParamRecord> for ParamRow {
        fn from(r: &ParamRecord) -> Self {
            ParamRow {
                Voxel_No: r.voxel_no,
                Vb:  r.vb,
                K_1: r.k_1,
                k_2: r.k_2,
                k_3: r.k_3,
                k_4: r.k_4,
                K_i: r.k_i,
                model: label(r.model),
            }
        }
    }

    #[derive(hdf5::H5Type, Clone, PartialEq, Debug)]
    #[repr(C)]
    pub struct ModelRow {
        pub Voxel_No: i32,
        pub model: Label,
        pub probability_of_model: f32,
    }

    impl From<&ModelRecord> for ModelRow {
        fn from(r: &ModelRecord) -> Self {
            ModelRow {
                Voxel_No: r.voxel_no,
                model: label(r.model),
                probability_of_model: r.probability_of_model,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    use crate::io::table;
    use crate::posterior::MODEL_COLUMNS;

    #[test]
    fn input_tables_round_trip() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tacs.h5");
        let table = array![[0.5f32, 0.25, 7.0, 1.0], [0.5, 0.75, 3.0, 2.0]];
        {
            ::hdf5::File::create(&path)?
                .new_dataset_builder()
                .with_data(&table)
                .create("df")?;
        }
        let reloaded = read_table(&path, "df")?;
        assert_eq!(table, reloaded);
        Ok(())
    }

    #[test]
    fn param_chunks_are_keyed_by_voxel_range() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("params.h5");
        let record = |voxel_no| ParamRecord {
            voxel_no, vb: 0.05, k_1: 0.1, k_2: 0.3, k_3: 0.05, k_4: 0.02, k_i: 0.014,
            model: Model::K4NonZero,
        };
        {
            let file = ::hdf5::File::create(&path)?;
            append_param_chunk(&file, &[record(25), record(25), record(49)])?;
            append_param_chunk(&file, &[record(50), record(74)])?;
        }

        let file = ::hdf5::File::open(&path)?;
        let names = file.member_names()?;
        assert!(names.contains(&"voxel_25_49".to_string()));
        assert!(names.contains(&"voxel_50_74".to_string()));

        let rows = file.dataset("voxel_25_49")?.read_1d::<ParamRow>()?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].Voxel_No, 25);
        assert_eq!(rows[0].model.as_str(), "k4 non-zero");
        Ok(())
    }

    #[test]
    fn model_compression_replaces_the_flat_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("model.csv");
        let h5_path = dir.path().join("model.h5");
        let records = vec![
            ModelRecord { voxel_no: 0, model: Model::K4Zero   , probability_of_model: 0.75 },
            ModelRecord { voxel_no: 1, model: Model::K4NonZero, probability_of_model: 0.6  },
        ];
        table::create_with_header(&csv_path, &MODEL_COLUMNS)?;
        table::append_records(&csv_path, &records)?;

        compress_model_table(&csv_path, &h5_path)?;

        assert!(!csv_path.exists());
        let rows = ::hdf5::File::open(&h5_path)?.dataset("df")?.read_1d::<ModelRow>()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].model.as_str(), "k4 zero");
        assert_eq!(rows[1].Voxel_No, 1);
        assert_eq!(rows[1].probability_of_model, 0.6);
        Ok(())
    }
}
