//! The session reducer: one pure transition function for the whole code
//! event.
//!
//! Every mutation of [`SessionState`] flows through [`SessionReducer`].
//! Invalid actions (tick while inactive, removing an unknown id, a shock on
//! a non-shockable rhythm) are silent no-ops: the reducer is total and never
//! enters an error state. Wall-clock reads go through the injected
//! [`Clock`], so the same (state, action, clock reading) always produces the
//! same next state.
//!
//! Tick scheduling rides the effect feedback loop: `StartCode` and every
//! `Tick` while active return a one-second [`Effect::Delay`] carrying the
//! next `Tick`, and ticking suspends the instant the session is inactive.

use crate::dosing::{
    self, ATROPINE_ADVISORY_LIMIT_MG, ATROPINE_DOSE_MG, MEDICATION_DEBOUNCE, compression_fraction,
};
use crate::types::{
    AssessmentUpdate, EntryId, LogCategory, LogEntry, Medication, PreAssessment, SessionAction,
    SessionMode, SessionState, labels,
};
use chrono::{DateTime, Utc};
use codeblue_core::effect::{Effect, Effects};
use codeblue_core::environment::{Clock, SystemClock};
use codeblue_core::reducer::Reducer;
use codeblue_core::smallvec;
use std::sync::Arc;
use std::time::Duration;

/// Interval between ticks; each tick assumes exactly one elapsed second.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Marker shared by both mechanical-compression toggle labels; `UndoLast`
/// uses it to recognize a toggle entry.
const MECHANICAL_CPR_MARKER: &str = "Mechanical CPR";

/// Environment dependencies for the session reducer
#[derive(Clone)]
pub struct SessionEnvironment {
    /// Wall clock for entry timestamps and the medication debounce
    pub clock: Arc<dyn Clock>,
}

impl SessionEnvironment {
    /// Creates a new `SessionEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Production environment backed by the system clock
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

/// Reducer for the resuscitation session aggregate
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionReducer;

impl SessionReducer {
    /// Creates a new `SessionReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn schedule_tick() -> Effects<SessionAction> {
        smallvec![Effect::delay(TICK_INTERVAL, SessionAction::Tick)]
    }

    /// Prepends a new entry: most-recent-first presentation, insertion order
    /// is causal order.
    fn push_entry(
        state: &mut SessionState,
        now: DateTime<Utc>,
        category: LogCategory,
        label: impl Into<String>,
        detail: Option<String>,
    ) {
        let id = state.allocate_entry_id();
        let entry = LogEntry {
            id,
            seconds: state.elapsed_seconds,
            recorded_at: now,
            category,
            label: label.into(),
            detail,
        };
        state.log.insert(0, entry);
    }

    fn apply_assessment_update(assessment: &mut PreAssessment, update: AssessmentUpdate) {
        match update {
            AssessmentUpdate::GeneralImpression(value) => {
                assessment.general_impression = Some(value);
            },
            AssessmentUpdate::Avpu(value) => assessment.avpu = Some(value),
            AssessmentUpdate::Airway(value) => assessment.airway = Some(value),
            AssessmentUpdate::Breathing(value) => assessment.breathing = Some(value),
            AssessmentUpdate::SpO2(value) => assessment.spo2 = value,
            AssessmentUpdate::RespiratoryRate(value) => assessment.respiratory_rate = value,
            AssessmentUpdate::Pulse(value) => assessment.pulse = Some(value),
            AssessmentUpdate::BloodPressure {
                systolic,
                diastolic,
            } => {
                assessment.bp_systolic = systolic;
                assessment.bp_diastolic = diastolic;
            },
            AssessmentUpdate::Skin(value) => assessment.skin = Some(value),
            AssessmentUpdate::Notes(value) => assessment.notes = value,
        }
    }

    fn administer(state: &mut SessionState, medication: Medication, now: DateTime<Utc>) {
        if let Some(last) = state.last_medication_at {
            if now - last < MEDICATION_DEBOUNCE {
                tracing::debug!(%medication, "medication ignored: within debounce window");
                return;
            }
        }
        state.last_medication_at = Some(now);
        state.last_warning = None;

        let detail = match medication {
            Medication::Adrenaline => {
                state.epinephrine_doses += 1;
                state.last_epinephrine_seconds = Some(state.elapsed_seconds);
                dosing::adrenaline_detail(state.epinephrine_doses)
            },
            Medication::Amiodarone => {
                state.amiodarone_doses += 1;
                dosing::amiodarone_detail(state.amiodarone_doses)
            },
            Medication::Atropine => {
                if state.atropine_total_mg + ATROPINE_DOSE_MG > ATROPINE_ADVISORY_LIMIT_MG {
                    let warning = format!("Total Atropine > {ATROPINE_ADVISORY_LIMIT_MG} mg");
                    tracing::warn!(
                        total_mg = state.atropine_total_mg + ATROPINE_DOSE_MG,
                        "{warning}"
                    );
                    state.last_warning = Some(warning);
                }
                state.atropine_total_mg += ATROPINE_DOSE_MG;
                dosing::atropine_detail(state.atropine_total_mg)
            },
            Medication::Dopamine => "Start Infusion (Titrate)".to_string(),
            Medication::MagnesiumSulfate => "2 g IV Slow Push (Diluted)".to_string(),
            Medication::SodiumBicarbonate => "50 mEq IV Push".to_string(),
            Medication::CalciumGluconate => "10% 10ml IV Slow Push".to_string(),
            Medication::Lidocaine => "1-1.5 mg/kg IV".to_string(),
        };

        Self::push_entry(
            state,
            now,
            LogCategory::Medication,
            format!("Given {medication}"),
            Some(detail),
        );
    }

    /// Removes an entry by identity and restores every counter it
    /// contributed to, using only the remaining entries. Shared by
    /// `RemoveLogEntry` and `UndoLast`.
    fn retract_entry(state: &mut SessionState, id: EntryId) -> Option<LogEntry> {
        let index = state.log.iter().position(|entry| entry.id == id)?;
        let removed = state.log.remove(index);

        if removed.label == labels::SHOCK {
            state.shock_count = state.shock_count.saturating_sub(1);
        }
        if removed.label.contains(Medication::Adrenaline.name()) {
            state.epinephrine_doses = state.epinephrine_doses.saturating_sub(1);
            state.last_epinephrine_seconds = state
                .log
                .iter()
                .find(|entry| entry.label.contains(Medication::Adrenaline.name()))
                .map(|entry| entry.seconds);
        }
        if removed.label.contains(Medication::Amiodarone.name()) {
            // Surviving entries keep their recorded dose text: a removed
            // first dose leaves the "150 mg" second-dose entry as written.
            state.amiodarone_doses = state.amiodarone_doses.saturating_sub(1);
        }
        if removed.label.contains(Medication::Atropine.name()) {
            let dose = removed
                .detail
                .as_deref()
                .and_then(dosing::parse_dose_mg)
                .unwrap_or(ATROPINE_DOSE_MG);
            state.atropine_total_mg = (state.atropine_total_mg - dose).max(0.0);
        }
        if removed.label.contains(labels::ADVANCED_AIRWAY) {
            state.airway_secured = state
                .log
                .iter()
                .any(|entry| entry.label.contains(labels::ADVANCED_AIRWAY));
        }
        if removed.label == labels::VASCULAR_ACCESS {
            state.vascular_access = state
                .log
                .iter()
                .any(|entry| entry.label == labels::VASCULAR_ACCESS);
        }
        if removed.label == labels::LABS {
            state.labs_sent = state.log.iter().any(|entry| entry.label == labels::LABS);
        }

        Some(removed)
    }
}

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action keeps the transition table in one place
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            SessionAction::UpdateAssessment(update) => {
                Self::apply_assessment_update(&mut state.pre_assessment, update);
                // The critical triad mandates moving on to the code wizard.
                if state.mode == SessionMode::PreAssessment
                    && state.pre_assessment.is_critical_triad()
                {
                    state.mode = SessionMode::PendingStart;
                }
                smallvec![]
            },

            SessionAction::ProceedToStart => {
                if state.mode == SessionMode::PreAssessment {
                    state.mode = SessionMode::PendingStart;
                }
                smallvec![]
            },

            SessionAction::StartCode { rhythm } => {
                if state.is_active {
                    return smallvec![];
                }
                let now = env.clock.now();
                state.mode = SessionMode::Active;
                state.is_active = true;
                state.started_at = Some(now);
                state.elapsed_seconds = 0;
                state.cycle_seconds = 0;
                state.current_rhythm = Some(rhythm);
                state.compression_fraction = 100;

                let summary = state.pre_assessment.summary();
                Self::push_entry(
                    state,
                    now,
                    LogCategory::Survey,
                    labels::PRIMARY_SURVEY,
                    Some(summary),
                );
                Self::push_entry(
                    state,
                    now,
                    LogCategory::Info,
                    labels::CODE_STARTED,
                    Some(format!("Initial Rhythm: {rhythm}")),
                );
                Self::schedule_tick()
            },

            SessionAction::Tick => {
                if !state.is_active {
                    return smallvec![];
                }
                state.elapsed_seconds += 1;
                state.cycle_seconds += 1;
                state.compression_fraction =
                    compression_fraction(state.mechanical_cpr, state.cycle_seconds);
                Self::schedule_tick()
            },

            SessionAction::ResetCycle => {
                state.cycle_seconds = 0;
                let now = env.clock.now();
                Self::push_entry(
                    state,
                    now,
                    LogCategory::Procedure,
                    labels::CYCLE_CHECK,
                    Some(labels::CYCLE_CHECK_DETAIL.to_string()),
                );
                smallvec![]
            },

            SessionAction::AddLog {
                category,
                label,
                detail,
            } => {
                if label == labels::SHOCK {
                    if !state.is_shockable() {
                        tracing::debug!(
                            rhythm = ?state.current_rhythm,
                            "shock ignored: rhythm is not shockable"
                        );
                        return smallvec![];
                    }
                    state.shock_count += 1;
                }
                let now = env.clock.now();
                Self::push_entry(state, now, category, label, detail);
                smallvec![]
            },

            SessionAction::AdministerMedication { medication } => {
                let now = env.clock.now();
                Self::administer(state, medication, now);
                smallvec![]
            },

            SessionAction::SecureAirway { detail } => {
                state.airway_secured = true;
                let now = env.clock.now();
                Self::push_entry(
                    state,
                    now,
                    LogCategory::Procedure,
                    labels::ADVANCED_AIRWAY,
                    Some(format!("{detail} ({})", labels::CONTINUOUS_CPR_NOTE)),
                );
                smallvec![]
            },

            SessionAction::EstablishVascularAccess { detail } => {
                state.vascular_access = true;
                let now = env.clock.now();
                Self::push_entry(
                    state,
                    now,
                    LogCategory::Procedure,
                    labels::VASCULAR_ACCESS,
                    Some(detail),
                );
                smallvec![]
            },

            SessionAction::SendLabs { detail } => {
                state.labs_sent = true;
                let now = env.clock.now();
                Self::push_entry(state, now, LogCategory::Lab, labels::LABS, Some(detail));
                smallvec![]
            },

            SessionAction::ToggleMechanicalCompression => {
                state.mechanical_cpr = !state.mechanical_cpr;
                let (label, detail) = if state.mechanical_cpr {
                    state.compression_fraction = 100;
                    (
                        labels::MECHANICAL_CPR_ON,
                        labels::MECHANICAL_CPR_ON_DETAIL,
                    )
                } else {
                    (
                        labels::MECHANICAL_CPR_OFF,
                        labels::MECHANICAL_CPR_OFF_DETAIL,
                    )
                };
                let now = env.clock.now();
                Self::push_entry(
                    state,
                    now,
                    LogCategory::Procedure,
                    label,
                    Some(detail.to_string()),
                );
                smallvec![]
            },

            SessionAction::ChangeRhythm { rhythm } => {
                state.current_rhythm = Some(rhythm);
                let now = env.clock.now();
                Self::push_entry(
                    state,
                    now,
                    LogCategory::RhythmChange,
                    labels::RHYTHM_CHANGE,
                    Some(format!("New Rhythm: {rhythm}")),
                );
                smallvec![]
            },

            SessionAction::RemoveLogEntry { id } => {
                let _ = Self::retract_entry(state, id);
                smallvec![]
            },

            SessionAction::UndoLast => {
                let Some(newest) = state.log.first() else {
                    return smallvec![];
                };
                let id = newest.id;
                // Undo reverses a compression toggle by flipping the flag
                // rather than re-deriving it from the remaining log.
                let was_mechanical_toggle = newest.label.contains(MECHANICAL_CPR_MARKER);
                let _ = Self::retract_entry(state, id);
                if was_mechanical_toggle {
                    state.mechanical_cpr = !state.mechanical_cpr;
                }
                smallvec![]
            },
        }
    }
}
