//! Compressor effect — RMS leveller with a fixed makeup gain.
//!
//! A running mean-square detector (50 ms) drives a smoothed gain (100 ms).
//! Above the threshold the level is pulled down 4:1; the result is boosted by
//! the makeup gain and hard-clamped to [-1, 1].

#[derive(Debug, Clone)]
pub struct Compressor {
    /// Linear RMS threshold.
    pub threshold: f32,
    /// Compression ratio (4.0 = 4:1).
    pub ratio: f32,
    /// Linear makeup gain applied after compression.
    pub makeup: f32,

    rms_coef: f32,
    gain_coef: f32,

    // Internal state
    mean_square: f32,
    gain: f32,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            threshold: 0.5,
            ratio: 4.0,
            makeup: 1.8,
            rms_coef: Self::time_constant(0.05, sample_rate),
            gain_coef: Self::time_constant(0.1, sample_rate),
            mean_square: 0.0,
            gain: 1.0,
        }
    }

    /// Per-sample smoothing coefficient for a time constant in seconds.
    #[inline]
    fn time_constant(seconds: f32, sample_rate: f32) -> f32 {
        (-1.0 / (seconds * sample_rate)).exp()
    }

    /// Current smoothed gain (before makeup).
    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.mean_square = self.rms_coef * self.mean_square + (1.0 - self.rms_coef) * input * input;
        let rms = (self.mean_square + 1e-9).sqrt();

        let desired = if rms > self.threshold {
            let over = rms / self.threshold;
            (self.threshold / rms) * (1.0 + (over - 1.0) / self.ratio)
        } else {
            1.0
        };
        self.gain = self.gain_coef * self.gain + (1.0 - self.gain_coef) * desired;

        (input * self.gain * self.makeup).clamp(-1.0, 1.0)
    }

    /// Reset the detector and gain.
    pub fn reset(&mut self) {
        self.mean_square = 0.0;
        self.gain = 1.0;
    }
}
