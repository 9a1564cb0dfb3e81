use std::sync::Arc;

use mf_core::traits::MagnitudeTransform;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

/// Transformée réelle → magnitudes, basée sur realfft.
///
/// The planner caches one plan per length, so a window that is only
/// partially filled at epoch time costs one extra planning step the first
/// time that length is seen. Input, spectrum and scratch buffers are kept
/// for the last length used and reused as long as it does not change.
///
/// Output bin `k` holds the amplitude at `k`; bins past `n/2` mirror their
/// conjugate so the output has the same length as the input. Magnitudes
/// are scaled by `2/n` (DC and Nyquist by `1/n`), so a sinusoid of
/// amplitude `A` on bin `k` reads back as `A`.
///
/// # Example
/// ```
/// use mf_core::traits::MagnitudeTransform;
/// use mf_dsp::fft::RealFftTransform;
///
/// let mut fft = RealFftTransform::new();
/// let mut out = [0i16; 4];
/// fft.transform(&[10, 10, 10, 10], &mut out);
/// assert_eq!(out, [10, 0, 0, 0]);
/// ```
pub struct RealFftTransform {
    planner: RealFftPlanner<f32>,
    plan: Option<Arc<dyn RealToComplex<f32>>>,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RealFftTransform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::<f32>::new(),
            plan: None,
            input_buf: Vec::new(),
            spectrum_buf: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Pre-plan for `len`, so the first epoch does not pay for it.
    pub fn prepare(&mut self, len: usize) {
        if len < 2 {
            return;
        }
        if self.plan.as_ref().is_some_and(|p| p.len() == len) {
            return;
        }
        let plan = self.planner.plan_fft_forward(len);
        self.input_buf = plan.make_input_vec();
        self.spectrum_buf = plan.make_output_vec();
        self.scratch = plan.make_scratch_vec();
        self.plan = Some(plan);
    }
}

impl Default for RealFftTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl MagnitudeTransform for RealFftTransform {
    fn transform(&mut self, samples: &[i16], output: &mut [i16]) {
        let n = samples.len().min(output.len());
        match n {
            0 => return,
            1 => {
                output[0] = samples[0].saturating_abs();
                return;
            }
            _ => {}
        }

        self.prepare(n);
        let Some(plan) = self.plan.as_ref() else {
            output[..n].fill(0);
            return;
        };

        for (slot, &s) in self.input_buf.iter_mut().zip(samples) {
            *slot = f32::from(s);
        }

        if plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            log::warn!("FFT de longueur {n} en échec, magnitudes à zéro");
            output[..n].fill(0);
            return;
        }

        let half = n / 2;
        let n_f = n as f32;
        for (k, slot) in output[..n].iter_mut().enumerate() {
            let bin = if k <= half { k } else { n - k };
            let c = self.spectrum_buf[bin];
            let edge = bin == 0 || (n.is_multiple_of(2) && bin == half);
            let scale = if edge { 1.0 / n_f } else { 2.0 / n_f };
            let mag = (c.re * c.re + c.im * c.im).sqrt() * scale;
            *slot = mag.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize, bin: usize, amplitude: f32, offset: f32) -> Vec<i16> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * bin as f32 * i as f32 / n as f32;
                (offset + amplitude * phase.sin()).round() as i16
            })
            .collect()
    }

    #[test]
    fn length_is_preserved_and_mirrored() {
        let mut fft = RealFftTransform::new();
        let samples = sine(128, 4, 1000.0, 0.0);
        let mut out = vec![0i16; 128];
        fft.transform(&samples, &mut out);

        assert!((i32::from(out[4]) - 1000).abs() <= 2, "bin 4 = {}", out[4]);
        assert_eq!(out[4], out[124]);
        assert!(out[0].abs() <= 1);
        assert!(out[5] <= 2);
    }

    #[test]
    fn dc_component_reads_as_mean() {
        let mut fft = RealFftTransform::new();
        let samples = sine(64, 3, 200.0, -50.0);
        let mut out = vec![0i16; 64];
        fft.transform(&samples, &mut out);
        assert_eq!(out[0], 50);
        assert!((i32::from(out[3]) - 200).abs() <= 1);
    }

    #[test]
    fn tiny_and_odd_lengths() {
        let mut fft = RealFftTransform::new();

        let mut one = [0i16; 1];
        fft.transform(&[-7], &mut one);
        assert_eq!(one, [7]);

        let mut two = [0i16; 2];
        fft.transform(&[4, -4], &mut two);
        assert_eq!(two, [0, 4]);

        let mut nine = [0i16; 9];
        fft.transform(&[-2, 4, 32, -40, 35, -4, -27, 25, -47], &mut nine);
        assert_eq!(nine[1], nine[8]);
        assert_eq!(nine[4], nine[5]);

        let mut empty: [i16; 0] = [];
        fft.transform(&[], &mut empty);
    }

    #[test]
    fn replanning_between_lengths() {
        let mut fft = RealFftTransform::new();
        let mut big = vec![0i16; 128];
        fft.transform(&sine(128, 10, 300.0, 0.0), &mut big);
        let mut small = vec![0i16; 50];
        fft.transform(&sine(50, 10, 300.0, 0.0), &mut small);
        assert!((i32::from(small[10]) - 300).abs() <= 2);
        fft.transform(&sine(128, 10, 300.0, 0.0), &mut big);
        assert!((i32::from(big[10]) - 300).abs() <= 2);
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        let mut fft = RealFftTransform::new();
        let samples: Vec<i16> = (0..16u32).map(|i| if i.is_multiple_of(2) { i16::MAX } else { i16::MIN }).collect();
        let mut out = vec![0i16; 16];
        fft.transform(&samples, &mut out);
        assert!(out[8] >= 32_000);
    }
}
