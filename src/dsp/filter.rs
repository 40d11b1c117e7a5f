//! Small recursive filters used inside the voices and the FX chain.

use std::f32::consts::{PI, TAU};

/// One-pole smoothing coefficient for a cutoff: `1 - e^(-2π·f/sr)`.
#[inline]
pub fn one_pole_coefficient(cutoff_hz: f32, sample_rate: f32) -> f32 {
    1.0 - (-TAU * cutoff_hz / sample_rate).exp()
}

/// One-pole exponential low-pass: `s += c·(x - s)`.
#[derive(Debug, Clone, Default)]
pub struct OnePoleLowpass {
    state: f32,
}

impl OnePoleLowpass {
    /// Filter with a raw coefficient, clamped to `[0.0001, 0.9999]`.
    #[inline]
    pub fn process(&mut self, input: f32, coefficient: f32) -> f32 {
        let c = coefficient.clamp(0.0001, 0.9999);
        self.state += c * (input - self.state);
        self.state
    }

    #[inline]
    pub fn process_hz(&mut self, input: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        self.process(input, one_pole_coefficient(cutoff_hz, sample_rate))
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// One-pole high-pass: the input minus its one-pole low-pass.
#[derive(Debug, Clone, Default)]
pub struct OnePoleHighpass {
    lowpass: OnePoleLowpass,
}

impl OnePoleHighpass {
    #[inline]
    pub fn process_hz(&mut self, input: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        input - self.lowpass.process_hz(input, cutoff_hz, sample_rate)
    }

    pub fn reset(&mut self) {
        self.lowpass.reset();
    }
}

/// Chamberlin state-variable filter, high-pass output.
#[derive(Debug, Clone)]
pub struct SvfHighpass {
    /// Damping (1/Q).
    pub damping: f32,
    low: f32,
    band: f32,
}

impl Default for SvfHighpass {
    fn default() -> Self {
        Self {
            damping: 1.4,
            low: 0.0,
            band: 0.0,
        }
    }
}

impl SvfHighpass {
    #[inline]
    pub fn process(&mut self, input: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        let f = 2.0 * (PI * cutoff_hz / sample_rate).sin();
        self.low += f * self.band;
        let high = input - self.low - self.damping * self.band;
        self.band += f * high;
        high
    }

    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_peak(mut f: impl FnMut(f32) -> f32, freq: f32, sr: f32) -> f32 {
        let mut peak = 0.0f32;
        for i in 0..4410 {
            let x = (TAU * freq * i as f32 / sr).sin();
            let y = f(x);
            if i > 1000 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = OnePoleLowpass::default();
        let mut out = 0.0;
        for _ in 0..2000 {
            out = f.process_hz(1.0, 5000.0, 44100.0);
        }
        assert!((out - 1.0).abs() < 0.001, "Lowpass should pass DC, got {out}");
    }

    #[test]
    fn coefficient_is_clamped() {
        let mut f = OnePoleLowpass::default();
        let out = f.process(1.0, 7.0);
        assert!((out - 0.9999).abs() < 1e-6);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = OnePoleHighpass::default();
        let mut out = 1.0;
        for _ in 0..1000 {
            out = f.process_hz(1.0, 9000.0, 44100.0);
        }
        assert!(out.abs() < 0.001, "Highpass should block DC, got {out}");
    }

    #[test]
    fn svf_highpass_attenuates_lows() {
        let sr = 44100.0;
        let mut lo = SvfHighpass::default();
        let low_peak = sine_peak(|x| lo.process(x, 1200.0, sr), 60.0, sr);
        let mut hi = SvfHighpass::default();
        let high_peak = sine_peak(|x| hi.process(x, 1200.0, sr), 8000.0, sr);
        assert!(low_peak < 0.05, "60 Hz should be cut, got {low_peak}");
        assert!(high_peak > 0.5, "8 kHz should pass, got {high_peak}");
    }

    #[test]
    fn svf_output_finite() {
        let mut f = SvfHighpass::default();
        for i in 0..10000 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            let out = f.process(input, 1200.0, 44100.0);
            assert!(out.is_finite(), "Filter output not finite at sample {i}");
        }
    }
}
