use std::f32::consts::{PI, TAU};

use rustfft::num_complex::Complex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Second-order IIR section
========================

One analog prototype per response, mapped to the z-plane in closed form. No
pre-warping is applied: the digital angular frequency is used directly as the
analog one, which bends cutoffs near Nyquist slightly downwards but keeps the
coefficient maths to a handful of multiplies.

  w0 = 2π·fc        T = 1/sample_rate        k = q·T²·w0²

  b0 = 4q + 2·w0·T + k        (every other coefficient is divided by b0)
  b1 = 2k − 8q
  b2 = 4q + k − 2·w0·T

| type      | a0          | a1     | a2   | DC gain | Nyquist gain |
| --------- | ----------- | ------ | ---- | ------- | ------------ |
| low-pass  | k           | 2·a0   | a0   | 1       | 0            |
| high-pass | 4q          | −2·a0  | a0   | 0       | 1            |
| band-pass | 2q·T·w0     | 0      | −a0  | 0       | 0            |

Difference equation, after normalisation:

  y[n] = a0·x[n] + a1·x[n−1] + a2·x[n−2] − b1·y[n−1] − b2·y[n−2]
*/

/// Number of points in [`Biquad::magnitude_response`].
pub const RESPONSE_POINTS: usize = 60;

const MIN_Q: f32 = 0.01;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
}

/// Coefficients normalised by `b0`, always built as one unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub b1: f32,
    pub b2: f32,
}

impl Coefficients {
    pub fn compute(cutoff_hz: f32, q: f32, period: f32, filter_type: FilterType) -> Self {
        let w0 = TAU * cutoff_hz;
        let w0t = w0 * period;
        let k = q * w0t * w0t;
        let inv_b0 = 1.0 / (4.0 * q + 2.0 * w0t + k);

        let b1 = (2.0 * k - 8.0 * q) * inv_b0;
        let b2 = (4.0 * q + k - 2.0 * w0t) * inv_b0;

        let (a0, a1, a2) = match filter_type {
            FilterType::LowPass => {
                let a0 = k * inv_b0;
                (a0, 2.0 * a0, a0)
            }
            FilterType::HighPass => {
                let a0 = 4.0 * q * inv_b0;
                (a0, -2.0 * a0, a0)
            }
            FilterType::BandPass => {
                let a0 = 2.0 * q * w0t * inv_b0;
                (a0, 0.0, -a0)
            }
        };

        Self { a0, a1, a2, b1, b2 }
    }

    fn is_finite(&self) -> bool {
        [self.a0, self.a1, self.a2, self.b1, self.b2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// |H(e^jw)| at normalised angular frequency `w` (0..=π).
    pub fn magnitude_at(&self, w: f32) -> f32 {
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = Complex::from_polar(1.0, -2.0 * w);
        let num = Complex::new(self.a0, 0.0) + z1 * self.a1 + z2 * self.a2;
        let den = Complex::new(1.0, 0.0) + z1 * self.b1 + z2 * self.b2;
        let den = den.norm();
        if den > 0.0 {
            num.norm() / den
        } else {
            0.0
        }
    }
}

pub struct Biquad {
    sample_rate: f32,
    period: f32,

    cutoff_hz: f32,
    q: f32,
    filter_type: FilterType,
    coeffs: Option<Coefficients>, // None until the first coefficient build

    x1: f32, // x[n-1]
    x2: f32, // x[n-2]
    y1: f32, // y[n-1]
    y2: f32, // y[n-2]
}

impl Biquad {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            period: 1.0 / sample_rate,
            cutoff_hz: 1000.0,
            q: 0.707,
            filter_type: FilterType::LowPass,
            coeffs: None,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn lowpass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let mut filter = Self::new(sample_rate);
        filter.set_params(cutoff_hz, q, FilterType::LowPass);
        filter
    }

    pub fn highpass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let mut filter = Self::new(sample_rate);
        filter.set_params(cutoff_hz, q, FilterType::HighPass);
        filter
    }

    pub fn bandpass(sample_rate: f32, cutoff_hz: f32, q: f32) -> Self {
        let mut filter = Self::new(sample_rate);
        filter.set_params(cutoff_hz, q, FilterType::BandPass);
        filter
    }

    /// Change the sample rate. Coefficients are rebuilt if they already exist.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.period = 1.0 / sample_rate;
        if self.coeffs.is_some() {
            self.recompute();
        }
    }

    /// Set cutoff, Q and response together and rebuild the coefficients.
    pub fn set_params(&mut self, cutoff_hz: f32, q: f32, filter_type: FilterType) {
        self.cutoff_hz = cutoff_hz.max(0.0);
        self.q = q.max(MIN_Q);
        self.filter_type = filter_type;
        self.recompute();
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.set_params(cutoff_hz, self.q, self.filter_type);
    }

    pub fn set_q(&mut self, q: f32) {
        self.set_params(self.cutoff_hz, q, self.filter_type);
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.set_params(self.cutoff_hz, self.q, filter_type);
    }

    fn recompute(&mut self) {
        let coeffs = Coefficients::compute(self.cutoff_hz, self.q, self.period, self.filter_type);
        // A degenerate parameter set keeps the previous coefficients
        if coeffs.is_finite() {
            self.coeffs = Some(coeffs);
        }
    }

    /// Filter one sample. Passes the input through until coefficients exist.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let Some(c) = self.coeffs else {
            return input;
        };

        let out = c.a0 * input + c.a1 * self.x1 + c.a2 * self.x2 - c.b1 * self.y1 - c.b2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = out;

        out
    }

    /// Filter a block in place.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Zero the two-sample input/output history.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn is_ready(&self) -> bool {
        self.coeffs.is_some()
    }

    pub fn coefficients(&self) -> Option<Coefficients> {
        self.coeffs
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Linear magnitude response sampled at `w = π·i/(RESPONSE_POINTS−1)`,
    /// i.e. from DC to Nyquist. Unity everywhere while not ready.
    pub fn magnitude_response(&self) -> [f32; RESPONSE_POINTS] {
        let mut response = [1.0; RESPONSE_POINTS];
        if let Some(c) = self.coeffs {
            for (i, point) in response.iter_mut().enumerate() {
                let w = PI * i as f32 / (RESPONSE_POINTS - 1) as f32;
                *point = c.magnitude_at(w);
            }
        }
        response
    }

    /// Magnitude response on a display scale: −60..+20 dB mapped to 0..1.
    pub fn magnitude_response_db(&self) -> [f32; RESPONSE_POINTS] {
        let mut response = self.magnitude_response();
        for point in response.iter_mut() {
            *point = magnitude_to_display(*point);
        }
        response
    }
}

/// Map a linear gain to the 0..1 display scale (−60 dB floor, +20 dB ceiling).
pub fn magnitude_to_display(magnitude: f32) -> f32 {
    let db = if magnitude > 0.001 {
        20.0 * magnitude.log10()
    } else {
        -60.0
    };
    (db + 60.0) * 0.0125
}
