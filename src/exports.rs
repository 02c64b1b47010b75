pub use crate::accept::{AcceptError, AcceptedDraws};
pub use crate::model::PredictedTacs;
pub use crate::prior::{Model, PriorMatrix};
pub use crate::series::{InputCurve, TimeAxis, VoxelChunk};

/// Activity concentration in a voxel or in the blood input curve.
pub type Activityf32 = f32;
pub type Timef32 = f32;
/// Kinetic rate constants and the macro-parameters derived from them.
pub type Ratef32 = f32;
