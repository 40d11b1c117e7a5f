//! Delay effect — mono feedback delay locked to a dotted eighth.

/// Longest delay the buffer can hold, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 2.0;
/// Dry level after the delay stage.
const DRY: f32 = 0.7;

/// Dotted-eighth length in seconds: three quarters of a beat.
pub fn dotted_eighth_seconds(bpm: f32) -> f32 {
    0.75 * 60.0 / bpm
}

/// Feedback delay line.
///
/// The buffer is sized once for [`MAX_DELAY_SECONDS`]; changing the tempo only
/// moves the read tap.
#[derive(Debug, Clone)]
pub struct Delay {
    buffer: Vec<f32>,
    write_pos: usize,
    sample_rate: f32,
    delay_samples: usize,

    /// Feedback amount [0, 0.9].
    pub feedback: f32,
    /// Wet level [0, 0.9].
    pub mix: f32,
}

impl Delay {
    pub fn new(sample_rate: f32) -> Self {
        let buffer_size = ((sample_rate * MAX_DELAY_SECONDS) as usize).max(2);
        Self {
            buffer: vec![0.0; buffer_size],
            write_pos: 0,
            sample_rate,
            delay_samples: 0,
            feedback: 0.42,
            mix: 0.35,
        }
    }

    pub fn with_params(sample_rate: f32, bpm: f32, feedback: f32, mix: f32) -> Self {
        let mut d = Self::new(sample_rate);
        d.set_bpm(bpm);
        d.set_feedback(feedback);
        d.set_mix(mix);
        d
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.9);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 0.9);
    }

    /// Retune to a dotted eighth at `bpm`.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.delay_samples = (dotted_eighth_seconds(bpm) * self.sample_rate) as usize;
    }

    /// Current delay length in samples.
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    /// Process one sample: `0.7·x + mix·tap`, writing `x + feedback·tap`.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let len = self.buffer.len();
        let delay = self.delay_samples.clamp(1, len - 1);
        let read_pos = (self.write_pos + len - delay) % len;

        let delayed = self.buffer[read_pos];
        self.buffer[self.write_pos] = input + delayed * self.feedback;
        self.write_pos = (self.write_pos + 1) % len;

        input * DRY + delayed * self.mix
    }

    /// Clear the delay buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn dotted_eighth_at_120() {
        assert!(approx_eq!(f32, dotted_eighth_seconds(120.0), 0.375, ulps = 2));
        let d = Delay::with_params(48000.0, 120.0, 0.0, 0.5);
        assert_eq!(d.delay_samples(), 18000);
    }

    #[test]
    fn follows_tempo_changes() {
        let mut d = Delay::new(44100.0);
        d.set_bpm(120.0);
        assert_eq!(d.delay_samples(), 16537);
        d.set_bpm(60.0);
        assert_eq!(d.delay_samples(), 33075);
    }

    #[test]
    fn dry_path_is_scaled() {
        let mut delay = Delay::with_params(44100.0, 120.0, 0.0, 0.0);
        let out = delay.process(0.5);
        assert!((out - 0.35).abs() < 1e-6);
    }

    #[test]
    fn echo_and_feedback() {
        // 1 kHz at 200 BPM: 225 samples.
        let mut delay = Delay::with_params(1000.0, 200.0, 0.5, 0.9);
        let n = delay.delay_samples();
        assert_eq!(n, 225);

        delay.process(1.0);
        for _ in 1..n {
            assert!(delay.process(0.0).abs() < 1e-6);
        }
        let first = delay.process(0.0);
        assert!((first - 0.9).abs() < 1e-6, "first echo {first}");
        for _ in 1..n {
            delay.process(0.0);
        }
        let second = delay.process(0.0);
        assert!((second - 0.45).abs() < 1e-6, "second echo {second}");
    }
}
