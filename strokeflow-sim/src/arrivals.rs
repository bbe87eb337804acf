//! Time-varying arrival sampling by thinning.
//!
//! An [`ArrivalSchedule`] is a step function of mean inter-arrival time (IAT)
//! over a repeating day. [`ThinningSampler`] draws candidate gaps from an
//! exponential with the schedule's *smallest* mean IAT, which bounds the
//! instantaneous rate from above, and keeps each candidate with probability
//! `min_iat / local_mean_iat`. Rejected gaps are accumulated, so the value
//! returned is the full elapsed gap to the next arrival.

use rand_distr::{Distribution, Exp};

use crate::{RandomStream, SimError, SimResult, SimTime};

/// Minutes in one simulated day.
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Whether `minute_of_day` lies in the window `[start, end)`, wrapping past
/// midnight when `start >= end`.
///
/// ```
/// use strokeflow_sim::is_in_window;
///
/// assert!(is_in_window(480.0, 480.0, 1200.0));
/// assert!(!is_in_window(1200.0, 480.0, 1200.0));
/// assert!(is_in_window(1300.0, 1200.0, 480.0));
/// assert!(!is_in_window(600.0, 1200.0, 480.0));
/// ```
pub fn is_in_window(minute_of_day: f64, start: f64, end: f64) -> bool {
    if start < end {
        start <= minute_of_day && minute_of_day < end
    } else {
        minute_of_day >= start || minute_of_day < end
    }
}

/// Step function of mean IAT over a repeating day.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalSchedule {
    interval: f64,
    mean_iat: Vec<f64>,
    min_iat: f64,
}

impl ArrivalSchedule {
    /// Builds a schedule of equally wide buckets covering one day.
    pub fn new(interval: f64, mean_iat: Vec<f64>) -> SimResult<Self> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(SimError::InvalidSchedule(format!(
                "bucket width must be positive, got {interval}"
            )));
        }
        if mean_iat.is_empty() {
            return Err(SimError::InvalidSchedule("no buckets".into()));
        }
        if let Some(bad) = mean_iat.iter().find(|m| !m.is_finite() || **m <= 0.0) {
            return Err(SimError::InvalidSchedule(format!(
                "mean inter-arrival times must be positive, got {bad}"
            )));
        }
        let min_iat = mean_iat.iter().copied().fold(f64::INFINITY, f64::min);
        Ok(Self {
            interval,
            mean_iat,
            min_iat,
        })
    }

    /// Hourly buckets: `in_window_iat` inside `[start_hour, end_hour)` (with
    /// midnight wrap), `out_of_window_iat` elsewhere.
    pub fn hourly_windows(
        start_hour: u32,
        end_hour: u32,
        in_window_iat: f64,
        out_of_window_iat: f64,
    ) -> SimResult<Self> {
        let start = f64::from(start_hour) * 60.0;
        let end = f64::from(end_hour) * 60.0;
        let buckets = (0..24)
            .map(|hour| {
                if is_in_window(f64::from(hour) * 60.0, start, end) {
                    in_window_iat
                } else {
                    out_of_window_iat
                }
            })
            .collect();
        Self::new(60.0, buckets)
    }

    /// Bucket index covering absolute time `t`.
    pub fn bucket_at(&self, t: SimTime) -> usize {
        // Truncation is intended: t is non-negative simulation time
        ((t / self.interval).floor() as usize) % self.mean_iat.len()
    }

    /// Mean IAT in force at absolute time `t`.
    pub fn mean_iat_at(&self, t: SimTime) -> f64 {
        self.mean_iat[self.bucket_at(t)]
    }

    /// Smallest mean IAT anywhere in the schedule.
    pub fn min_iat(&self) -> f64 {
        self.min_iat
    }

    /// Bucket width in minutes.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Mean IAT per bucket.
    pub fn buckets(&self) -> &[f64] {
        &self.mean_iat
    }
}

/// Non-stationary Poisson arrivals via thinning.
#[derive(Debug, Clone)]
pub struct ThinningSampler {
    schedule: ArrivalSchedule,
    candidate: Exp<f64>,
    gaps: RandomStream,
    acceptance: RandomStream,
    rejects_last_sample: u64,
}

impl ThinningSampler {
    /// `gaps` drives candidate gaps, `acceptance` the accept/reject draws.
    pub fn new(
        schedule: ArrivalSchedule,
        gaps: RandomStream,
        acceptance: RandomStream,
    ) -> SimResult<Self> {
        let candidate = Exp::new(1.0 / schedule.min_iat())
            .map_err(|e| SimError::InvalidSchedule(e.to_string()))?;
        Ok(Self {
            schedule,
            candidate,
            gaps,
            acceptance,
            rejects_last_sample: 0,
        })
    }

    /// Gap from `now` to the next accepted arrival.
    pub fn sample(&mut self, now: SimTime) -> f64 {
        self.rejects_last_sample = 0;
        let mut gap = 0.0;
        loop {
            let w = self.candidate.sample(self.gaps.rng());
            gap += w;
            let local = self.schedule.mean_iat_at(now + gap);
            if self.acceptance.uniform() < self.schedule.min_iat() / local {
                return gap;
            }
            self.rejects_last_sample += 1;
        }
    }

    /// Rejections incurred by the most recent [`ThinningSampler::sample`].
    pub fn rejects_last_sample(&self) -> u64 {
        self.rejects_last_sample
    }

    /// The schedule being sampled.
    pub fn schedule(&self) -> &ArrivalSchedule {
        &self.schedule
    }
}
