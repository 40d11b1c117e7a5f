//! Envelope generators: a rate-based ADSR and a one-shot linear decay.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR envelope with linear segments.
///
/// Attack always starts from zero. With `hold` set, the sustain stage lasts
/// that many seconds and then releases on its own, so a triggered voice
/// always returns to idle.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Attack time in seconds.
    pub attack: f32,
    /// Decay time in seconds.
    pub decay: f32,
    /// Sustain level [0, 1].
    pub sustain: f32,
    /// Release time in seconds.
    pub release: f32,
    /// Seconds spent at sustain before an automatic release.
    pub hold: Option<f32>,

    stage: Stage,
    level: f32,
    sample_rate: f32,
    held: u32,
    release_step: f32,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Envelope {
            attack: 0.001,
            decay: 0.1,
            sustain: 0.5,
            release: 0.1,
            hold: None,
            stage: Stage::Idle,
            level: 0.0,
            sample_rate,
            held: 0,
            release_step: 0.0,
        }
    }

    pub fn with_adsr(sample_rate: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let mut env = Self::new(sample_rate);
        env.attack = attack;
        env.decay = decay;
        env.sustain = sustain.clamp(0.0, 1.0);
        env.release = release;
        env
    }

    /// Note on: restart the attack from zero.
    pub fn gate_on(&mut self) {
        self.stage = Stage::Attack;
        self.level = 0.0;
        self.held = 0;
    }

    /// Note off: ramp from the current level to zero over `release` seconds.
    pub fn gate_off(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        self.stage = Stage::Release;
        self.release_step = self.level / self.samples(self.release);
    }

    #[inline]
    fn samples(&self, seconds: f32) -> f32 {
        (seconds * self.sample_rate).max(1.0)
    }

    /// Advance one sample and return the new level.
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => {}
            Stage::Attack => {
                self.level += 1.0 / self.samples(self.attack);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level -= (1.0 - self.sustain) / self.samples(self.decay);
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {
                if let Some(hold) = self.hold {
                    self.held += 1;
                    if self.held as f32 >= self.samples(hold) {
                        self.gate_off();
                    }
                }
            }
            Stage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }
}

/// One-shot linear ramp from 1 to 0.
///
/// The ramp length is read on every tick so a decay-time change applies to
/// a note that is already sounding.
#[derive(Debug, Clone, Default)]
pub struct LinearDecay {
    level: f32,
}

impl LinearDecay {
    pub fn trigger(&mut self) {
        self.level = 1.0;
    }

    /// Current level, then step down by one sample of a `seconds`-long ramp.
    #[inline]
    pub fn tick(&mut self, seconds: f32, sample_rate: f32) -> f32 {
        let out = self.level;
        self.level = (self.level - 1.0 / (seconds * sample_rate).max(1.0)).max(0.0);
        out
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_silent(&self) -> bool {
        self.level <= 0.0
    }
}
