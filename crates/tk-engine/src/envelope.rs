//! One-shot triangular envelope: 0 -> target -> 0, then hold.

/// Shortest ramp accepted by `trigger`. Guards the increment division.
pub const MIN_RAMP_SECONDS: f64 = 0.001;

/// Envelope lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Never triggered.
    #[default]
    Idle,
    Rising,
    Falling,
    /// Sweep finished; pinned at zero until the next trigger.
    Held,
}

/// Runtime state for a triangular modulation-depth envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvelopeState {
    start: f64,
    target: f64,
    value: f64,
    /// Per-sample step, identical on the way up and down.
    increment: f64,
    /// Samples per ramp: `ceil((target - start) / increment)`.
    ramp_steps: u64,
    /// Samples left in the current ramp.
    steps_left: u64,
    stage: EnvelopeStage,
    /// Set once per trigger, on the return to `start`.
    completed: bool,
}

impl EnvelopeState {
    /// Create an idle envelope peaking at `target`.
    pub fn new(target: f64) -> Self {
        Self {
            start: 0.0,
            target,
            value: 0.0,
            increment: 0.0,
            ramp_steps: 0,
            steps_left: 0,
            stage: EnvelopeStage::Idle,
            completed: false,
        }
    }

    /// Restart the sweep from zero, rising over `ramp_seconds`.
    ///
    /// Always a full reset, whatever stage the envelope was in.
    pub fn trigger(&mut self, sample_rate: f64, ramp_seconds: f64) {
        let ramp = libm::fmax(ramp_seconds, MIN_RAMP_SECONDS);
        self.increment = (self.target - self.start) / (sample_rate * ramp);
        let steps = if self.increment > 0.0 {
            libm::ceil((self.target - self.start) / self.increment) as u64
        } else {
            1
        };
        self.ramp_steps = steps.max(1);
        self.steps_left = self.ramp_steps;
        self.value = self.start;
        self.stage = EnvelopeStage::Rising;
        self.completed = false;
    }

    /// Advance by one sample and return the new value.
    ///
    /// Each ramp lasts exactly `ramp_steps` samples; the last step lands on
    /// the bound.
    pub fn advance(&mut self) -> f64 {
        match self.stage {
            EnvelopeStage::Rising => {
                self.steps_left -= 1;
                self.value = libm::fmin(self.value + self.increment, self.target);
                if self.steps_left == 0 {
                    self.value = self.target;
                    self.stage = EnvelopeStage::Falling;
                    self.steps_left = self.ramp_steps;
                }
            }
            EnvelopeStage::Falling => {
                self.steps_left -= 1;
                self.value = libm::fmax(self.value - self.increment, self.start);
                if self.steps_left == 0 {
                    self.value = self.start;
                    self.stage = EnvelopeStage::Held;
                    self.completed = true;
                }
            }
            EnvelopeStage::Idle | EnvelopeStage::Held => {}
        }
        self.value
    }

    /// Current output value.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Samples from trigger to peak, and from peak back to zero.
    pub fn ramp_steps(&self) -> u64 {
        self.ramp_steps
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Whether the current sweep has returned to zero.
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(env: &mut EnvelopeState, samples: usize) {
        for _ in 0..samples {
            env.advance();
        }
    }

    #[test]
    fn idle_envelope_stays_at_zero() {
        let mut env = EnvelopeState::new(1000.0);
        run(&mut env, 100);
        assert_eq!(env.value(), 0.0);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert!(!env.is_completed());
    }

    #[test]
    fn increment_from_ramp_time() {
        let mut env = EnvelopeState::new(1000.0);
        env.trigger(48000.0, 5.0);
        assert!((env.increment() - 1000.0 / 240_000.0).abs() < 1e-12);
        assert_eq!(env.value(), 0.0);
        assert_eq!(env.stage(), EnvelopeStage::Rising);
    }

    #[test]
    fn peaks_on_exact_sample() {
        let mut env = EnvelopeState::new(1000.0);
        env.trigger(1000.0, 1.0); // increment 1.0, 1000 samples per ramp
        run(&mut env, 999);
        assert_eq!(env.stage(), EnvelopeStage::Rising);
        assert!(env.value() < 1000.0);

        env.advance();
        assert_eq!(env.value(), 1000.0);
        assert_eq!(env.stage(), EnvelopeStage::Falling);
    }

    #[test]
    fn non_integral_ramp_peaks_at_ceiling() {
        // 400.4 samples per ramp, then one a hair over 400
        for ramp in [0.4004, 0.4000005] {
            let mut env = EnvelopeState::new(1000.0);
            env.trigger(1000.0, ramp);
            let expected = (1000.0 / env.increment()).ceil() as usize;
            assert_eq!(expected, 401);
            assert_eq!(env.ramp_steps(), 401);
            run(&mut env, expected - 1);
            assert_eq!(env.stage(), EnvelopeStage::Rising, "ramp {}", ramp);
            assert!(env.value() < 1000.0);
            env.advance();
            assert_eq!(env.stage(), EnvelopeStage::Falling, "ramp {}", ramp);
            assert_eq!(env.value(), 1000.0);
        }
    }

    #[test]
    fn fall_takes_as_long_as_rise() {
        let mut env = EnvelopeState::new(1000.0);
        env.trigger(1000.0, 0.4000005);
        run(&mut env, 401 + 400);
        assert_eq!(env.stage(), EnvelopeStage::Falling);
        assert!(!env.is_completed());
        env.advance();
        assert_eq!(env.stage(), EnvelopeStage::Held);
        assert!(env.is_completed());
        assert_eq!(env.value(), 0.0);
    }

    #[test]
    fn completes_exactly_once_and_holds() {
        let mut env = EnvelopeState::new(1000.0);
        env.trigger(1000.0, 0.1); // 100 up, 100 down
        run(&mut env, 199);
        assert!(!env.is_completed());
        env.advance();
        assert!(env.is_completed());
        assert_eq!(env.value(), 0.0);
        assert_eq!(env.stage(), EnvelopeStage::Held);

        run(&mut env, 1000);
        assert!(env.is_completed());
        assert_eq!(env.value(), 0.0);
    }

    #[test]
    fn value_stays_within_bounds() {
        let mut env = EnvelopeState::new(1000.0);
        env.trigger(44100.0, 0.0137);
        for _ in 0..5000 {
            let v = env.advance();
            assert!((0.0..=1000.0).contains(&v), "out of range: {}", v);
        }
    }

    #[test]
    fn retrigger_while_falling_restarts_from_zero() {
        let mut env = EnvelopeState::new(1000.0);
        env.trigger(1000.0, 0.1);
        run(&mut env, 150);
        assert_eq!(env.stage(), EnvelopeStage::Falling);

        env.trigger(1000.0, 0.1);
        assert_eq!(env.value(), 0.0);
        assert_eq!(env.stage(), EnvelopeStage::Rising);
        assert!(!env.is_completed());
        env.advance();
        assert!((env.value() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn retrigger_after_completion_clears_flag() {
        let mut env = EnvelopeState::new(1000.0);
        env.trigger(1000.0, 0.01);
        run(&mut env, 100);
        assert!(env.is_completed());
        env.trigger(1000.0, 0.01);
        assert!(!env.is_completed());
    }

    #[test]
    fn zero_ramp_is_clamped() {
        let mut env = EnvelopeState::new(1000.0);
        env.trigger(48000.0, 0.0);
        assert!(env.increment().is_finite());
        let expected = 1000.0 / (48000.0 * MIN_RAMP_SECONDS);
        assert!((env.increment() - expected).abs() < 1e-9);
    }
}
