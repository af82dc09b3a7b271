//! Latency-targeted parameter search.
//!
//! The tuner walks the parameter space the cheap way: memory is the main
//! security lever, so it doubles `m_cost` while a real measured hash stays
//! under half the target, then buys the remaining time with extra passes.
//! Every measurement is one actual hash of a sample input; there is no
//! extrapolation model, which keeps the result honest on machines with
//! non-linear memory behavior.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::{Algorithm, Argon2};

const SAMPLE_PASSWORD: &[u8] = b"tuning sample password";
const SAMPLE_SALT: &[u8] = b"tuning-salt-16by";

/// One-shot warm-up so the first measurement doesn't pay for page faults
/// and lazy init. Thread-safe and idempotent via `OnceLock`.
static WARM_UP: OnceLock<()> = OnceLock::new();

/// Finds parameters whose hashing time lands near `target`.
///
/// Memory never exceeds `max_mem_mb` MiB and `p_cost` is fixed by the
/// caller. The returned set is the last one measured within
/// `[0.9 * target, 1.5 * target]`, or the closest one tried if no
/// measurement fell inside that band.
pub fn tune(
    target: Duration,
    max_mem_mb: u32,
    p_cost: u32,
    algorithm: Algorithm,
) -> Result<Argon2> {
    tune_with_token(target, max_mem_mb, p_cost, algorithm, &CancellationToken::new())
}

/// Same as [`tune`], polling `token` between measurements.
pub fn tune_with_token(
    target: Duration,
    max_mem_mb: u32,
    p_cost: u32,
    algorithm: Algorithm,
    token: &CancellationToken,
) -> Result<Argon2> {
    if target.is_zero() {
        return Err(Error::InvalidParameter {
            field: "target",
            reason: "must be a positive duration",
        });
    }

    let cap_kib = max_mem_mb.saturating_mul(1024);
    let floor_kib = 8u32.saturating_mul(p_cost);
    if cap_kib < floor_kib {
        return Err(Error::InvalidParameter {
            field: "max_mem_mb",
            reason: "too small for the requested parallelism",
        });
    }

    warm_up();

    let mut config = Argon2::new(floor_kib.min(cap_kib), 1, p_cost)
        .with_algorithm(algorithm);
    config.validate()?;

    let low = target.mul_f64(0.9);
    let high = target.mul_f64(1.5);
    let mut in_band: Option<Argon2> = None;
    let mut closest: Option<(Argon2, Duration)> = None;

    loop {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let elapsed = measure(&config)?;

        if elapsed >= low && elapsed <= high {
            in_band = Some(config.clone());
        }
        let distance = distance_to(elapsed, target);
        if closest
            .as_ref()
            .is_none_or(|(_, best)| distance < distance_to(*best, target))
        {
            closest = Some((config.clone(), elapsed));
        }

        if config.m_cost < cap_kib && elapsed < target / 2 {
            config.m_cost = config.m_cost.saturating_mul(2).min(cap_kib);
        } else if elapsed < target {
            config.t_cost += 1;
        } else {
            break;
        }
    }

    Ok(in_band.unwrap_or_else(|| closest.map(|(config, _)| config).unwrap_or(config)))
}

fn measure(config: &Argon2) -> Result<Duration> {
    let mut out = vec![0u8; config.hash_length as usize];
    let start = Instant::now();
    config.hash_password_into(SAMPLE_PASSWORD, SAMPLE_SALT, &mut out)?;
    Ok(start.elapsed())
}

fn distance_to(elapsed: Duration, target: Duration) -> Duration {
    if elapsed > target {
        elapsed - target
    } else {
        target - elapsed
    }
}

fn warm_up() {
    WARM_UP.get_or_init(|| {
        let config = Argon2::new(64, 1, 1);
        let mut out = vec![0u8; config.hash_length as usize];
        let _ = config.hash_password_into(SAMPLE_PASSWORD, SAMPLE_SALT, &mut out);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_valid_parameters_within_the_cap() {
        let target = Duration::from_millis(20);
        let tuned = tune(target, 8, 1, Algorithm::Argon2id).unwrap();
        tuned.validate().unwrap();
        assert!(tuned.m_cost <= 8 * 1024);
        assert!(tuned.t_cost >= 1);
        assert_eq!(tuned.p_cost, 1);
    }

    #[test]
    fn tuned_parameters_hash_near_the_target() {
        let target = Duration::from_millis(50);
        let tuned = tune(target, 16, 1, Algorithm::Argon2id).unwrap();

        let mut out = vec![0u8; tuned.hash_length as usize];
        let start = Instant::now();
        tuned
            .hash_password_into(SAMPLE_PASSWORD, SAMPLE_SALT, &mut out)
            .unwrap();
        let elapsed = start.elapsed();

        // Generous acceptance band; timers on CI are noisy.
        assert!(elapsed >= target / 4, "took {elapsed:?} for target {target:?}");
        assert!(elapsed <= target * 4, "took {elapsed:?} for target {target:?}");
    }

    #[test]
    fn cancelled_token_stops_the_search() {
        let token = CancellationToken::new();
        token.cancel();
        let result = tune_with_token(
            Duration::from_millis(100),
            64,
            1,
            Algorithm::Argon2id,
            &token,
        );
        assert_eq!(result.unwrap_err(), Error::Cancelled);
    }

    #[test]
    fn rejects_a_zero_target() {
        let result = tune(Duration::ZERO, 64, 1, Algorithm::Argon2id);
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidParameter { field: "target", .. }
        ));
    }
}
