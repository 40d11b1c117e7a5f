//! Reverb effect — mono Schroeder reverb.
//!
//! Four parallel feedback combs, averaged, then two series allpasses. The
//! delay lengths and gains are fixed; only the wet/dry mix is adjustable.

/// A comb filter delay line with feedback.
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
}

impl CombFilter {
    fn new(size: usize, feedback: f32) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            feedback,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.buffer[self.index] = input + output * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

/// Schroeder allpass: `w = x + g·d`, `y = d - g·w`.
#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
    gain: f32,
}

impl AllpassFilter {
    fn new(size: usize, gain: f32) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            gain,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        let w = input + self.gain * delayed;
        self.buffer[self.index] = w;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - self.gain * w
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

const COMB_SECONDS: [f32; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
const COMB_GAINS: [f32; 4] = [0.805, 0.827, 0.783, 0.764];
const ALLPASS_SECONDS: [f32; 2] = [0.0090, 0.0061];
const ALLPASS_GAIN: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct Reverb {
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],

    /// Dry/wet mix (0.0 = fully dry, 1.0 = fully wet).
    pub mix: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        let len = |seconds: f32| (seconds * sample_rate) as usize + 1;
        Self {
            combs: std::array::from_fn(|i| CombFilter::new(len(COMB_SECONDS[i]), COMB_GAINS[i])),
            allpasses: ALLPASS_SECONDS.map(|s| AllpassFilter::new(len(s), ALLPASS_GAIN)),
            mix: 0.4,
        }
    }

    pub fn with_mix(sample_rate: f32, mix: f32) -> Self {
        let mut r = Self::new(sample_rate);
        r.set_mix(mix);
        r
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut wet = 0.0f32;
        for comb in &mut self.combs {
            wet += comb.process(input);
        }
        wet *= 0.25;

        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }

        input * (1.0 - self.mix) + wet * self.mix
    }

    /// Clear all internal buffers.
    pub fn clear(&mut self) {
        for comb in &mut self.combs {
            comb.clear();
        }
        for allpass in &mut self.allpasses {
            allpass.clear();
        }
    }
}
