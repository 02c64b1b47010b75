//! The two-tissue-compartment FDG forward model, batched over prior draws.

use half::f16;
use ndarray::{Array2, Zip};

use crate::prior::PriorMatrix;
use crate::series::{InputCurve, TimeAxis};

/// Predicted TACs for every prior draw, shape (S, num_time_frame).
///
/// Stored in half precision: for S in the 10^5..10^7 range this matrix is the
/// run's largest resident array, and only its quantised values ever matter to
/// the acceptance step. All arithmetic stays in f32.
pub type PredictedTacs = Array2<f16>;

/// Synthesise one predicted TAC per prior draw:
///
/// `Ct(t) = [(th1*exp(-a1*Ti) + th2*exp(-a2*Ti)) conv Ca](t) * dt(t) + Vb*Cb(t)`
///
/// with the discrete linear convolution truncated to the observed time grid.
/// Depends only on the priors and the shared series, so it runs once per run
/// and is reused by every chunk.
pub fn predicted_tacs(
    time:   &TimeAxis,
    blood:  &InputCurve,
    input:  &InputCurve,
    priors: &PriorMatrix,
) -> PredictedTacs {
    let nt = time.len();
    let ti = time.sample_time.to_vec();
    let dt = time.frame_duration.to_vec();
    let cb = blood.activity.to_vec();
    let ca = input.activity.to_vec();

    let mut tacs = Array2::from_elem((priors.len(), nt), f16::ZERO);
    Zip::from(tacs.rows_mut())
        .and(&priors.vb)
        .and(&priors.alpha1)
        .and(&priors.alpha2)
        .and(&priors.theta1)
        .and(&priors.theta2)
        .par_for_each(|mut tac, &vb, &a1, &a2, &th1, &th2| {
            // Impulse response of the two exponential modes on the sample grid
            let mut curve: Vec<f32> = ti.iter()
                .map(|&t| th1 * (-a1 * t).exp() + th2 * (-a2 * t).exp())
                .collect();
            convolve_prefix(&mut curve, &ca);
            for (j, out) in tac.iter_mut().enumerate() {
                *out = f16::from_f32(curve[j] * dt[j] + vb * cb[j]);
            }
        });
    tacs
}

/// Discrete linear convolution of `signal` with `kernel`, truncated to the
/// first `signal.len()` output samples and evaluated in place.
///
/// The full causal convolution would run to `signal.len() + kernel.len() - 1`
/// samples; only the prefix aligned with the observed time grid is kept.
/// Walking the output backwards lets the prefix reuse `signal` as its own
/// scratch space.
pub fn convolve_prefix(signal: &mut [f32], kernel: &[f32]) {
    for n in (0..signal.len()).rev() {
        let lo = (n + 1).saturating_sub(kernel.len());
        let mut acc = 0.0;
        for k in lo..=n {
            acc += signal[k] * kernel[n - k];
        }
        signal[n] = acc;
    }
}
