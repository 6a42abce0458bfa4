//! Sampling primitives
//!
//! Every function draws from the run's [`RngManager`]; the number of
//! uniform variates consumed per call is fixed so runs stay reproducible.

use crate::rng::RngManager;
use crate::schema::EnumChoice;

/// First choice whose cumulative portion exceeds `u`
///
/// When the portions sum to less than `u` the last choice absorbs the
/// remainder. `choices` is never empty for a registered enum instance.
pub(crate) fn pick_weighted(choices: &[EnumChoice], u: f64) -> Option<&EnumChoice> {
    let mut upper = 0.0;
    for choice in choices {
        upper += choice.portion;
        if upper > u {
            return Some(choice);
        }
    }
    choices.last()
}

/// `min + u * (max - min)` from one uniform variate
pub(crate) fn sample_uniform(min: f64, max: f64, rng: &mut RngManager) -> f64 {
    min + rng.next_f64() * (max - min)
}

/// Normal sample, optionally skewed
///
/// With `skew == 0` this consumes two uniform variates (one Box-Muller
/// pair); otherwise four.
pub(crate) fn sample_bell(mean: f64, std_dev: f64, skew: f64, rng: &mut RngManager) -> f64 {
    let z = if skew == 0.0 {
        rng.standard_normal()
    } else {
        skew_normal(skew, rng)
    };
    mean + std_dev * z
}

/// Skew-normal variate with shape `alpha` from two correlated normals
fn skew_normal(alpha: f64, rng: &mut RngManager) -> f64 {
    let delta = alpha / (1.0 + alpha * alpha).sqrt();
    let u0 = rng.standard_normal();
    let v = rng.standard_normal();
    let u1 = delta * u0 + (1.0 - delta * delta).sqrt() * v;
    if u0 >= 0.0 {
        u1
    } else {
        -u1
    }
}
