/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f32) -> f32;
}

fn validate(rate: f32, vi: f32, vf: f32) -> Result<(), String> {
    (rate > 0.0 && rate <= 1.0 && vi >= vf)
        .then_some(())
        .ok_or_else(|| String::from("`rate` must be in (0,1] and `vi` must not be below `vf`"))
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    value: f32,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f32) -> f32 {
        self.value
    }
}

/// v(t) = max(v<sub>i</sub> * r<sup>t</sup>, v<sub>f</sub>)
///
/// The per-episode multiplicative decay used for exploration schedules: each
/// time step multiplies the value by `rate`, bounded below by `vf`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometric {
    rate: f32,
    vi: f32,
    vf: f32,
}

impl Geometric {
    pub fn new(rate: f32, vi: f32, vf: f32) -> Result<Self, String> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Geometric {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { rate, vi, vf } = self;
        (vi * rate.powf(t)).max(vf)
    }
}
