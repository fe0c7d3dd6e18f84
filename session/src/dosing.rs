//! Derived-counter helpers: cooldowns, dose ladders and the
//! compression-fraction estimate.
//!
//! Everything here is a pure function of current state; the reducer is the
//! only caller that feeds results back into [`SessionState`].

use crate::types::SessionState;
use chrono::TimeDelta;

/// Adrenaline cooldown on the simulated elapsed clock.
pub const EPINEPHRINE_COOLDOWN_SECONDS: u32 = 180;

/// Duplicate-submission window for medication actions, on the wall clock.
///
/// Deliberately distinct from the elapsed clock: a paused or slow tick loop
/// must not widen the debounce.
pub const MEDICATION_DEBOUNCE: TimeDelta = TimeDelta::milliseconds(500);

/// Fixed atropine increment per dose, in mg.
pub const ATROPINE_DOSE_MG: f64 = 0.5;

/// Cumulative atropine above this raises a non-blocking advisory.
pub const ATROPINE_ADVISORY_LIMIT_MG: f64 = 3.0;

/// Cycle length after which the compression-fraction estimate drops into the
/// warning band (the cycle-check target itself is 120 s).
pub const CYCLE_WARNING_SECONDS: u32 = 115;

/// Amiodarone ladder: 300 mg for the first dose, 150 mg for every dose after.
#[must_use]
pub const fn amiodarone_dose_mg(dose_index: u32) -> u32 {
    if dose_index <= 1 { 300 } else { 150 }
}

/// Total amiodarone given after `doses` doses, in mg.
#[must_use]
pub const fn amiodarone_total_mg(doses: u32) -> u32 {
    match doses {
        0 => 0,
        n => 300 + 150 * (n - 1),
    }
}

/// Adrenaline detail line: fixed 1 mg dose plus the running dose index.
#[must_use]
pub fn adrenaline_detail(dose_index: u32) -> String {
    format!("1 mg IV/IO Push (Dose {dose_index})")
}

/// Amiodarone detail line for the given dose index.
#[must_use]
pub fn amiodarone_detail(dose_index: u32) -> String {
    format!(
        "{} mg IV/IO Push (Dose {dose_index})",
        amiodarone_dose_mg(dose_index)
    )
}

/// Atropine detail line: fixed increment plus the running total.
#[must_use]
pub fn atropine_detail(total_mg: f64) -> String {
    format!("{ATROPINE_DOSE_MG} mg IV (Total: {total_mg} mg)")
}

/// Compression-fraction estimate for one tick: 100 under mechanical
/// compression, otherwise 98 nominally, dropping to 85 once the cycle clock
/// passes the warning threshold.
#[must_use]
pub const fn compression_fraction(mechanical: bool, cycle_seconds: u32) -> u8 {
    if mechanical {
        100
    } else if cycle_seconds > CYCLE_WARNING_SECONDS {
        85
    } else {
        98
    }
}

/// Pulls the first `<number> mg` dose amount out of a free-text detail line.
///
/// Used when an atropine entry is removed and its contribution has to be
/// subtracted back out. Callers fall back to [`ATROPINE_DOSE_MG`] when the
/// detail is missing or unparseable.
#[must_use]
pub fn parse_dose_mg(detail: &str) -> Option<f64> {
    let mut previous: Option<&str> = None;
    for word in detail.split_whitespace() {
        if word == "mg" || word == "mg)" {
            if let Some(candidate) = previous {
                if let Ok(dose) = candidate.trim_start_matches('(').parse::<f64>() {
                    return Some(dose);
                }
            }
        }
        previous = Some(word);
    }
    None
}

impl SessionState {
    /// Whether the adrenaline cooldown has elapsed (ready if never given).
    #[must_use]
    pub fn is_epinephrine_ready(&self) -> bool {
        match self.last_epinephrine_seconds {
            None => true,
            Some(last) => self.elapsed_seconds.saturating_sub(last) >= EPINEPHRINE_COOLDOWN_SECONDS,
        }
    }

    /// Whether the current rhythm indicates defibrillation.
    #[must_use]
    pub fn is_shockable(&self) -> bool {
        self.current_rhythm.is_some_and(super::types::Rhythm::is_shockable)
    }
}
