//! Posterior aggregation: the kinetic transform of accepted draws and the
//! per-voxel model selection.

use serde::{Deserialize, Serialize};

use crate::accept::AcceptedDraws;
use crate::prior::{Model, PriorMatrix};
use crate::Ratef32;

pub const PARAM_COLUMNS: [&str; 8] = ["Voxel_No", "Vb", "K_1", "k_2", "k_3", "k_4", "K_i", "model"];
pub const MODEL_COLUMNS: [&str; 3] = ["Voxel_No", "model", "probability_of_model"];

/// One accepted draw, transformed to the interpretable kinetic constants.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParamRecord {
    #[serde(rename = "Voxel_No")] pub voxel_no: i32,
    #[serde(rename = "Vb")]  pub vb:  Ratef32,
    #[serde(rename = "K_1")] pub k_1: Ratef32,
    #[serde(rename = "k_2")] pub k_2: Ratef32,
    #[serde(rename = "k_3")] pub k_3: Ratef32,
    #[serde(rename = "k_4")] pub k_4: Ratef32,
    #[serde(rename = "K_i")] pub k_i: Ratef32,
    pub model: Model,
}

/// Per-voxel model-selection verdict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(rename = "Voxel_No")] pub voxel_no: i32,
    pub model: Model,
    pub probability_of_model: f32,
}

/// Transform every accepted draw of every voxel from the exponential-form
/// micro-parameters to `(Vb, K1, k2, k3, k4, Ki)`, preserving chunk order.
///
/// Degenerate draws (`theta1 + theta2 = 0`, or `k2 + k3 = 0`) divide by zero;
/// the resulting non-finite values are passed through verbatim rather than
/// clamped, so that downstream consumers can see them.
pub fn param_records(priors: &PriorMatrix, accepted: &AcceptedDraws, first_voxel: usize) -> Vec<ParamRecord> {
    let mut records = Vec::with_capacity(accepted.indices.len());
    for (v, draws) in accepted.indices.outer_iter().enumerate() {
        let voxel_no = (first_voxel + v) as i32;
        for &s in draws.iter() {
            records.push(kinetic_transform(voxel_no, priors, s as usize));
        }
    }
    records
}

fn kinetic_transform(voxel_no: i32, priors: &PriorMatrix, s: usize) -> ParamRecord {
    let vb  = priors.vb[s];
    let a1  = priors.alpha1[s];
    let a2  = priors.alpha2[s];
    let th1 = priors.theta1[s];
    let th2 = priors.theta2[s];

    let k_1 = (th1 + th2) / (1.0 - vb);
    let k_2 = (th1 * a1 + th2 * a2) / (th1 + th2);
    let k_4 = a1 * a2 / k_2;
    let k_3 = a1 + a2 - k_2 - k_4;
    let k_i = k_1 * k_3 / (k_2 + k_3);

    ParamRecord { voxel_no, vb, k_1, k_2, k_3, k_4, k_i, model: priors.model[s] }
}

/// Model-selection posterior for every voxel of the chunk.
///
/// `p0` is the fraction of accepted draws carrying the k4-zero structure. The
/// voxel is labelled k4 non-zero when `p0` falls below `model_0_prob_thres`,
/// and the reported probability is always that of the assigned label, never
/// of the rejected one.
pub fn model_records(
    priors: &PriorMatrix,
    accepted: &AcceptedDraws,
    first_voxel: usize,
    model_0_prob_thres: f32,
) -> Vec<ModelRecord> {
    accepted.indices.outer_iter().enumerate()
        .map(|(v, draws)| {
            let zeros = draws.iter()
                .filter(|&&s| priors.model[s as usize] == Model::K4Zero)
                .count();
            let p0 = zeros as f32 / draws.len() as f32;
            let (model, probability_of_model) = if p0 < model_0_prob_thres {
                (Model::K4NonZero, 1.0 - p0)
            } else {
                (Model::K4Zero, p0)
            };
            ModelRecord { voxel_no: (first_voxel + v) as i32, model, probability_of_model }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use ndarray::{array, Array1, Array2};
    use proptest::prelude::*;

    fn priors_with_models(models: Vec<Model>) -> PriorMatrix {
        let s = models.len();
        PriorMatrix {
            vb:     Array1::zeros(s),
            alpha1: Array1::zeros(s),
            alpha2: Array1::zeros(s),
            theta1: Array1::zeros(s),
            theta2: Array1::zeros(s),
            model:  models.into(),
        }
    }

    fn all_draws(num_voxels: usize, s: usize) -> AcceptedDraws {
        AcceptedDraws {
            indices: Array2::from_shape_fn((num_voxels, s), |(_, j)| j as u32),
        }
    }

    // Macro-parameters back to exponential form, for round-tripping
    fn micro_from_macro(k_1: f64, k_2: f64, k_3: f64, k_4: f64, vb: f64)
        -> (f32, f32, f32, f32, f32)
    {
        let s = k_2 + k_3 + k_4;
        let p = k_2 * k_4;
        let disc = (s * s - 4.0 * p).sqrt();
        let a1 = (s - disc) / 2.0;
        let a2 = (s + disc) / 2.0;
        let theta_sum = k_1 * (1.0 - vb);
        let th1 = theta_sum * (k_2 - a2) / (a1 - a2);
        let th2 = theta_sum - th1;
        (vb as f32, a1 as f32, a2 as f32, th1 as f32, th2 as f32)
    }

    fn transform_single(vb: f32, a1: f32, a2: f32, th1: f32, th2: f32) -> ParamRecord {
        let priors = PriorMatrix {
            vb:     array![vb],
            alpha1: array![a1],
            alpha2: array![a2],
            theta1: array![th1],
            theta2: array![th2],
            model:  array![Model::K4NonZero],
        };
        kinetic_transform(0, &priors, 0)
    }

    #[test]
    fn transform_matches_hand_computed_case() {
        // vb 0.04, a1 0.016997, a2 0.353003, th1/th2 from K1 0.1, k2 0.3
        let (vb, a1, a2, th1, th2) = micro_from_macro(0.1, 0.3, 0.05, 0.02, 0.04);
        let r = transform_single(vb, a1, a2, th1, th2);
        assert_float_eq!(r.k_1, 0.1 , rmax <= 1e-4);
        assert_float_eq!(r.k_2, 0.3 , rmax <= 1e-4);
        assert_float_eq!(r.k_3, 0.05, rmax <= 1e-3);
        assert_float_eq!(r.k_4, 0.02, rmax <= 1e-3);
        assert_float_eq!(r.k_i, 0.1 * 0.05 / 0.35, rmax <= 1e-3);
    }

    #[test]
    fn degenerate_draws_pass_non_finite_values_through() {
        // theta1 = theta2 = 0 divides 0/0 into k_2 and cascades from there
        let r = transform_single(0.05, 0.01, 0.3, 0.0, 0.0);
        assert_eq!(r.k_1, 0.0);
        assert!(r.k_2.is_nan());
        assert!(r.k_4.is_nan());
        assert!(r.k_3.is_nan());
        assert!(r.k_i.is_nan());
    }

    #[test]
    fn record_order_is_voxel_major() {
        let priors = priors_with_models(vec![Model::K4Zero, Model::K4NonZero, Model::K4Zero]);
        let accepted = AcceptedDraws { indices: array![[2u32, 0], [1, 2]] };
        let records = param_records(&priors, &accepted, 10);
        let got: Vec<(i32, Model)> = records.iter().map(|r| (r.voxel_no, r.model)).collect();
        assert_eq!(got, vec![
            (10, Model::K4Zero),
            (10, Model::K4Zero),
            (11, Model::K4NonZero),
            (11, Model::K4Zero),
        ]);
    }

    #[test]
    fn majority_of_k4_zero_draws_labels_the_voxel_k4_zero() {
        let priors = priors_with_models(vec![
            Model::K4Zero, Model::K4Zero, Model::K4Zero, Model::K4NonZero, Model::K4NonZero,
        ]);
        let records = model_records(&priors, &all_draws(1, 5), 0, 0.5);
        assert_eq!(records[0].model, Model::K4Zero);
        assert_float_eq!(records[0].probability_of_model, 0.6, ulps <= 2);
    }

    #[test]
    fn minority_of_k4_zero_draws_flips_label_and_probability() {
        let priors = priors_with_models(vec![
            Model::K4Zero, Model::K4NonZero, Model::K4NonZero, Model::K4NonZero, Model::K4NonZero,
        ]);
        let records = model_records(&priors, &all_draws(1, 5), 4, 0.5);
        assert_eq!(records[0].voxel_no, 4);
        assert_eq!(records[0].model, Model::K4NonZero);
        assert_float_eq!(records[0].probability_of_model, 0.8, ulps <= 2);
    }

    #[test]
    fn exact_balance_keeps_the_k4_zero_label() {
        let priors = priors_with_models(vec![
            Model::K4Zero, Model::K4Zero, Model::K4NonZero, Model::K4NonZero,
        ]);
        let records = model_records(&priors, &all_draws(1, 4), 0, 0.5);
        assert_eq!(records[0].model, Model::K4Zero);
        assert_eq!(records[0].probability_of_model, 0.5);
    }

    proptest! {
        #[test]
        fn kinetic_transform_round_trips_the_macro_parameters(
            k_1 in 0.01f64 .. 0.3,
            k_2 in 0.06f64 .. 0.6,
            k_3 in 0.01f64 .. 0.3,
            k_4 in 0.001f64 .. 0.05,
            vb  in 0.0f64 .. 0.09,
        ) {
            let (vb_, a1, a2, th1, th2) = micro_from_macro(k_1, k_2, k_3, k_4, vb);
            let r = transform_single(vb_, a1, a2, th1, th2);
            prop_assert!((f64::from(r.k_1) - k_1).abs() / k_1 < 2e-3);
            prop_assert!((f64::from(r.k_2) - k_2).abs() / k_2 < 2e-3);
            prop_assert!((f64::from(r.k_3) - k_3).abs() / k_3 < 2e-2);
            prop_assert!((f64::from(r.k_4) - k_4).abs() / k_4 < 2e-2);
        }

        #[test]
        fn reported_probability_is_never_below_half_at_the_default_threshold(
            zeros in 0usize .. 20,
        ) {
            let mut models = vec![Model::K4Zero; zeros];
            models.extend(vec![Model::K4NonZero; 20 - zeros]);
            let priors = priors_with_models(models);
            let records = model_records(&priors, &all_draws(1, 20), 0, 0.5);
            prop_assert!(records[0].probability_of_model >= 0.5);
        }
    }
}
