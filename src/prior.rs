//! Prior simulation for the two-tissue-compartment FDG model.

use ndarray::{Array1, Zip};
use ndarray_rand::rand_distr::{Bernoulli, Uniform};
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Ratef32;

/// The two competing model structures: is the dephosphorylation rate
/// constant k4 fixed at zero, or free?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Model {
    #[serde(rename = "k4 zero")]
    K4Zero,
    #[serde(rename = "k4 non-zero")]
    K4NonZero,
}

impl Model {
    pub fn label(self) -> &'static str {
        match self {
            Model::K4Zero    => "k4 zero",
            Model::K4NonZero => "k4 non-zero",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// Uniform prior ranges for the micro-parameters, in exponential form
pub const VB_RANGE:     (Ratef32, Ratef32) = (0.0   , 0.1  );
pub const ALPHA1_RANGE: (Ratef32, Ratef32) = (0.0005, 0.015);
pub const ALPHA2_RANGE: (Ratef32, Ratef32) = (0.06  , 0.6  );
pub const THETA_RANGE:  (Ratef32, Ratef32) = (0.0   , 0.1  );
/// Prior probability of the k4 non-zero structure.
pub const MODEL_1_PROB: f64 = 0.5;

/// S independent draws from the joint prior, one array per micro-parameter.
/// Sampled once per run, then shared read-only by every voxel chunk.
pub struct PriorMatrix {
    pub vb:     Array1<Ratef32>,
    pub alpha1: Array1<Ratef32>,
    pub alpha2: Array1<Ratef32>,
    pub theta1: Array1<Ratef32>,
    pub theta2: Array1<Ratef32>,
    pub model:  Array1<Model>,
}

impl PriorMatrix {
    /// Number of draws S.
    pub fn len(&self) -> usize { self.vb.len() }
    pub fn is_empty(&self) -> bool { self.vb.is_empty() }
}

/// Draw `s` parameter vectors from the fixed priors.
///
/// Wherever the model indicator comes out as `K4Zero`, `alpha1` is forced to
/// zero in place: without dephosphorylation the slow exponential mode
/// degenerates to a constant.
pub fn sample<R: Rng + ?Sized>(s: usize, rng: &mut R) -> PriorMatrix {
    let uniform = |(lo, hi)| Uniform::new(lo, hi);

    let     vb     = Array1::random_using(s, uniform(VB_RANGE)    , rng);
    let mut alpha1 = Array1::random_using(s, uniform(ALPHA1_RANGE), rng);
    let     alpha2 = Array1::random_using(s, uniform(ALPHA2_RANGE), rng);
    let     theta1 = Array1::random_using(s, uniform(THETA_RANGE) , rng);
    let     theta2 = Array1::random_using(s, uniform(THETA_RANGE) , rng);

    let coin = Bernoulli::new(MODEL_1_PROB).unwrap();
    let model = Array1::random_using(s, coin, rng)
        .mapv(|heads| if heads { Model::K4NonZero } else { Model::K4Zero });

    Zip::from(&mut alpha1).and(&model)
        .for_each(|a, &m| if m == Model::K4Zero { *a = 0.0 });

    PriorMatrix { vb, alpha1, alpha2, theta1, theta2, model }
}
