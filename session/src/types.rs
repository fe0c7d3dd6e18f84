//! Domain types for the resuscitation session aggregate.
//!
//! A session is one code event: a pre-code assessment snapshot, a running
//! clock, and an append-mostly log of typed entries with derived counters.
//! All mutation flows through [`crate::reducer::SessionReducer`]; these types
//! are plain owned data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical log-entry labels and fixed detail strings.
///
/// Counter recomputation on removal matches entries by these labels, so they
/// are the one place the wording is allowed to live.
pub mod labels {
    /// Shock entry label; the only label that drives the shock counter.
    pub const SHOCK: &str = "Defibrillation";
    /// Start marker synthesized by `StartCode`.
    pub const CODE_STARTED: &str = "STARTED CODE BLUE";
    /// Pre-assessment summary entry synthesized by `StartCode`.
    pub const PRIMARY_SURVEY: &str = "Primary Survey";
    /// Cycle-check entry appended by `ResetCycle`.
    pub const CYCLE_CHECK: &str = "Cycle Check (2 Min)";
    /// Fixed detail of the cycle-check entry.
    pub const CYCLE_CHECK_DETAIL: &str = "Pulse Check / Rotate Compressor";
    /// Advanced-airway procedure entry.
    pub const ADVANCED_AIRWAY: &str = "Advanced Airway Secured";
    /// Annotation appended to every airway detail.
    pub const CONTINUOUS_CPR_NOTE: &str = "Continuous CPR";
    /// IV/IO access procedure entry.
    pub const VASCULAR_ACCESS: &str = "Vascular Access";
    /// Specimen/lab entry.
    pub const LABS: &str = "Labs / Specimen";
    /// Rhythm-change entry.
    pub const RHYTHM_CHANGE: &str = "Rhythm Change";
    /// Mechanical compression turned on.
    pub const MECHANICAL_CPR_ON: &str = "Start Mechanical CPR";
    /// Mechanical compression turned off.
    pub const MECHANICAL_CPR_OFF: &str = "Stop Mechanical CPR";
    /// Detail recorded when mechanical compression starts.
    pub const MECHANICAL_CPR_ON_DETAIL: &str = "Mechanical Compression ON";
    /// Detail recorded when switching back to manual CPR.
    pub const MECHANICAL_CPR_OFF_DETAIL: &str = "Switch to Manual CPR";
}

/// Formats an elapsed-seconds offset as `MM:SS`.
#[must_use]
pub fn format_offset(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Stable identity of a log entry, assigned at creation and never reused.
///
/// Ids come from a monotonic counter held in [`SessionState`], which keeps
/// the reducer free of randomness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(u64);

impl EntryId {
    /// Reconstructs an id from its raw value (test and storage use).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cardiac rhythm as read off the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rhythm {
    /// Ventricular fibrillation (shockable)
    Vf,
    /// Pulseless ventricular tachycardia (shockable)
    Pvt,
    /// Asystole
    Asystole,
    /// Pulseless electrical activity
    Pea,
    /// Return of spontaneous circulation
    Rosc,
}

impl Rhythm {
    /// Whether defibrillation is indicated for this rhythm.
    #[must_use]
    pub const fn is_shockable(self) -> bool {
        matches!(self, Self::Vf | Self::Pvt)
    }
}

impl std::fmt::Display for Rhythm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Vf => "VF",
            Self::Pvt => "pVT",
            Self::Asystole => "Asystole",
            Self::Pea => "PEA",
            Self::Rosc => "ROSC",
        };
        write!(f, "{name}")
    }
}

/// Category tag carried by every log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCategory {
    /// Drug administration
    Medication,
    /// Airway, vascular, compression and other procedures
    Procedure,
    /// Rhythm changes
    RhythmChange,
    /// Free-form clinical information
    Info,
    /// Specimens / point-of-care labs
    Lab,
    /// Pre-assessment summary
    Survey,
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Medication => "MED",
            Self::Procedure => "PROCEDURE",
            Self::RhythmChange => "RHYTHM",
            Self::Info => "INFO",
            Self::Lab => "LAB",
            Self::Survey => "SURVEY",
        };
        write!(f, "{tag}")
    }
}

/// One immutable entry in the event log.
///
/// Entries are never edited after creation; the only mutation the log
/// supports is whole-entry removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Stable identity, assigned at creation
    pub id: EntryId,
    /// Elapsed seconds since code start (ordering key)
    pub seconds: u32,
    /// Wall-clock timestamp, for audit/report display only
    pub recorded_at: DateTime<Utc>,
    /// Entry category
    pub category: LogCategory,
    /// Short action name (e.g. "Given Adrenaline")
    pub label: String,
    /// Optional free-text payload (dose, device parameters)
    pub detail: Option<String>,
}

impl LogEntry {
    /// The entry's offset from code start, formatted `MM:SS`.
    #[must_use]
    pub fn offset(&self) -> String {
        format_offset(self.seconds)
    }
}

/// The closed set of drugs the reducer knows how to dose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Medication {
    /// Epinephrine, 1 mg per dose with a 3-minute cooldown
    Adrenaline,
    /// Antiarrhythmic, 300 mg then 150 mg
    Amiodarone,
    /// 0.5 mg increments with a 3 mg advisory cap
    Atropine,
    /// Vasopressor infusion start
    Dopamine,
    /// Magnesium sulfate
    MagnesiumSulfate,
    /// Sodium bicarbonate
    SodiumBicarbonate,
    /// Calcium gluconate
    CalciumGluconate,
    /// Lidocaine
    Lidocaine,
}

impl Medication {
    /// Clinical display name, as it appears in log labels.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Adrenaline => "Adrenaline",
            Self::Amiodarone => "Amiodarone",
            Self::Atropine => "Atropine",
            Self::Dopamine => "Dopamine",
            Self::MagnesiumSulfate => "Magnesium Sulfate",
            Self::SodiumBicarbonate => "Sodium Bicarbonate",
            Self::CalciumGluconate => "Calcium Gluconate",
            Self::Lidocaine => "Lidocaine",
        }
    }
}

impl std::fmt::Display for Medication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Session lifecycle mode. Ending is implicit: a concluded code keeps its
/// final state until a new session replaces it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    /// Collecting the pre-code assessment
    #[default]
    PreAssessment,
    /// Assessment done (or skipped), waiting for the initial rhythm
    PendingStart,
    /// Code running; the clock ticks only in this mode
    Active,
}

/// General impression recorded during the pre-assessment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneralImpression {
    /// Patient looks stable
    Stable,
    /// Patient looks critical
    Critical,
}

impl std::fmt::Display for GeneralImpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stable => write!(f, "Stable"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// AVPU responsiveness scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Avpu {
    /// Alert
    Alert,
    /// Responds to voice
    Verbal,
    /// Responds to pain
    Pain,
    /// Unresponsive
    Unresponsive,
}

impl std::fmt::Display for Avpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Self::Alert => "A",
            Self::Verbal => "V",
            Self::Pain => "P",
            Self::Unresponsive => "U",
        };
        write!(f, "{letter}")
    }
}

/// Airway finding during the pre-assessment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum AirwayFinding {
    Patent,
    Threatened,
    Obstructed,
}

impl std::fmt::Display for AirwayFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patent => write!(f, "Patent"),
            Self::Threatened => write!(f, "Threatened"),
            Self::Obstructed => write!(f, "Obstructed"),
        }
    }
}

/// Breathing finding during the pre-assessment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum BreathingFinding {
    Normal,
    Dyspnea,
    Apnea,
}

impl std::fmt::Display for BreathingFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Dyspnea => write!(f, "Dyspnea"),
            Self::Apnea => write!(f, "Apnea"),
        }
    }
}

/// Pulse finding during the pre-assessment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum PulseFinding {
    Present,
    Absent,
}

impl std::fmt::Display for PulseFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "Present"),
            Self::Absent => write!(f, "Absent"),
        }
    }
}

/// Skin finding during the pre-assessment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum SkinFinding {
    Normal,
    Pale,
    Diaphoretic,
}

impl std::fmt::Display for SkinFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Pale => write!(f, "Pale"),
            Self::Diaphoretic => write!(f, "Diaphoretic"),
        }
    }
}

/// Pre-code vital-sign and mental-status snapshot.
///
/// Captured before the code starts and summarized into the log by
/// `StartCode`; immutable afterwards except by explicit edit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAssessment {
    /// General impression
    pub general_impression: Option<GeneralImpression>,
    /// AVPU responsiveness
    pub avpu: Option<Avpu>,
    /// Airway finding
    pub airway: Option<AirwayFinding>,
    /// Breathing finding
    pub breathing: Option<BreathingFinding>,
    /// Oxygen saturation, free text (percent)
    pub spo2: String,
    /// Respiratory rate, free text (per minute)
    pub respiratory_rate: String,
    /// Pulse finding
    pub pulse: Option<PulseFinding>,
    /// Systolic blood pressure, free text
    pub bp_systolic: String,
    /// Diastolic blood pressure, free text
    pub bp_diastolic: String,
    /// Skin finding
    pub skin: Option<SkinFinding>,
    /// Free-text notes
    pub notes: String,
}

impl PreAssessment {
    /// Whether any field has been recorded.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        !self.summary_parts().is_empty()
    }

    /// The unresponsive/apneic/pulseless triad that mandates starting a code.
    #[must_use]
    pub fn is_critical_triad(&self) -> bool {
        self.avpu == Some(Avpu::Unresponsive)
            && self.breathing == Some(BreathingFinding::Apnea)
            && self.pulse == Some(PulseFinding::Absent)
    }

    /// One-line summary logged when the code starts: the non-empty fields
    /// concatenated, or "Skipped Primary Survey" when nothing was recorded.
    #[must_use]
    pub fn summary(&self) -> String {
        let parts = self.summary_parts();
        if parts.is_empty() {
            "Skipped Primary Survey".to_string()
        } else {
            format!("Survey: {}", parts.join(", "))
        }
    }

    fn summary_parts(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(gi) = self.general_impression {
            parts.push(gi.to_string());
        }
        if let Some(avpu) = self.avpu {
            parts.push(format!("AVPU:{avpu}"));
        }
        if let Some(airway) = self.airway {
            parts.push(format!("Airway:{airway}"));
        }
        if let Some(breathing) = self.breathing {
            parts.push(format!("Breathing:{breathing}"));
        }
        if !self.spo2.is_empty() {
            parts.push(format!("SpO2:{}%", self.spo2));
        }
        if !self.respiratory_rate.is_empty() {
            parts.push(format!("RR:{}", self.respiratory_rate));
        }
        if let Some(pulse) = self.pulse {
            parts.push(format!("Pulse:{pulse}"));
        }
        if !self.bp_systolic.is_empty() || !self.bp_diastolic.is_empty() {
            parts.push(format!("BP:{}/{}", self.bp_systolic, self.bp_diastolic));
        }
        if let Some(skin) = self.skin {
            parts.push(format!("Skin:{skin}"));
        }
        if !self.notes.is_empty() {
            parts.push(self.notes.clone());
        }
        parts
    }
}

/// A single strongly-typed edit to the pre-assessment snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum AssessmentUpdate {
    GeneralImpression(GeneralImpression),
    Avpu(Avpu),
    Airway(AirwayFinding),
    Breathing(BreathingFinding),
    SpO2(String),
    RespiratoryRate(String),
    Pulse(PulseFinding),
    BloodPressure {
        /// Systolic reading, free text
        systolic: String,
        /// Diastolic reading, free text
        diastolic: String,
    },
    Skin(SkinFinding),
    Notes(String),
}

/// Patient identity for the report header. Plain data, not reducer state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Hospital number
    pub hospital_number: String,
    /// Patient name
    pub name: String,
    /// Age, free text
    pub age: String,
    /// Weight in kg, free text
    pub weight_kg: String,
    /// Code leader name
    pub leader_name: String,
}

/// The aggregate root: everything the reducer owns for one code event.
///
/// Every counter and flag here is derived from the log; nothing is set
/// directly by the shell. Removing an entry deterministically restores the
/// counters that entry contributed to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    /// Lifecycle mode
    pub mode: SessionMode,
    /// True iff the session is active; gates clock ticking
    pub is_active: bool,
    /// Wall-clock time of code start, set once
    pub started_at: Option<DateTime<Utc>>,
    /// Elapsed seconds since code start (simulated clock)
    pub elapsed_seconds: u32,
    /// Seconds since the last cycle check; reset by `ResetCycle`
    pub cycle_seconds: u32,
    /// Current rhythm, if one has been recorded
    pub current_rhythm: Option<Rhythm>,
    /// Compression-fraction estimate, 0-100, recomputed each tick
    pub compression_fraction: u8,
    /// Number of shocks delivered
    pub shock_count: u32,
    /// Number of adrenaline doses given
    pub epinephrine_doses: u32,
    /// Number of amiodarone doses given
    pub amiodarone_doses: u32,
    /// Cumulative atropine in mg (soft-capped by an advisory, never blocked)
    pub atropine_total_mg: f64,
    /// Elapsed seconds at the most recent adrenaline dose; gates the cooldown
    pub last_epinephrine_seconds: Option<u32>,
    /// Wall-clock time of the last medication action; gates the debounce
    pub last_medication_at: Option<DateTime<Utc>>,
    /// Whether an advanced airway is in place
    pub airway_secured: bool,
    /// Whether IV/IO access is established
    pub vascular_access: bool,
    /// Whether labs have been sent
    pub labs_sent: bool,
    /// Whether a mechanical compression device is running
    pub mechanical_cpr: bool,
    /// Latest non-blocking clinical advisory (atropine soft cap)
    pub last_warning: Option<String>,
    /// Pre-code assessment snapshot
    pub pre_assessment: PreAssessment,
    /// The event log, most recent entry first; insertion order == causal order
    pub log: Vec<LogEntry>,
    next_entry_id: u64,
}

impl SessionState {
    /// Creates a fresh session awaiting its pre-assessment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a log entry by identity.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&LogEntry> {
        self.log.iter().find(|entry| entry.id == id)
    }

    /// The most recently appended entry, if any.
    #[must_use]
    pub fn newest_entry(&self) -> Option<&LogEntry> {
        self.log.first()
    }

    /// Code duration so far, formatted `MM:SS`.
    #[must_use]
    pub fn duration(&self) -> String {
        format_offset(self.elapsed_seconds)
    }

    pub(crate) fn allocate_entry_id(&mut self) -> EntryId {
        self.next_entry_id += 1;
        EntryId(self.next_entry_id)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: SessionMode::PreAssessment,
            is_active: false,
            started_at: None,
            elapsed_seconds: 0,
            cycle_seconds: 0,
            current_rhythm: None,
            compression_fraction: 0,
            shock_count: 0,
            epinephrine_doses: 0,
            amiodarone_doses: 0,
            atropine_total_mg: 0.0,
            last_epinephrine_seconds: None,
            last_medication_at: None,
            airway_secured: false,
            vascular_access: false,
            labs_sent: false,
            mechanical_cpr: false,
            last_warning: None,
            pre_assessment: PreAssessment::default(),
            log: Vec::new(),
            next_entry_id: 0,
        }
    }
}

/// Every input the session reducer accepts: a closed tagged union, so the
/// transition function is exhaustive and statically checkable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionAction {
    /// Edit one pre-assessment field
    UpdateAssessment(AssessmentUpdate),
    /// Leave pre-assessment mode without starting the code yet
    ProceedToStart,
    /// Start the code with the initial rhythm; starts the clock and
    /// synthesizes the start marker and survey summary entries
    StartCode {
        /// Initial rhythm on the monitor
        rhythm: Rhythm,
    },
    /// One elapsed second; a no-op unless the session is active
    Tick,
    /// Pulse check / compressor rotation: zeroes the cycle clock
    ResetCycle,
    /// Generic append; the shock label additionally drives the shock counter
    AddLog {
        /// Entry category
        category: LogCategory,
        /// Entry label
        label: String,
        /// Optional free-text payload
        detail: Option<String>,
    },
    /// Give one dose of a known drug (debounced on wall-clock time)
    AdministerMedication {
        /// Which drug
        medication: Medication,
    },
    /// Record an advanced airway with device parameters
    SecureAirway {
        /// Device parameters (tube size, depth, ventilation route)
        detail: String,
    },
    /// Record IV/IO access
    EstablishVascularAccess {
        /// Site, fluid and rate
        detail: String,
    },
    /// Record specimens sent
    SendLabs {
        /// Panel description
        detail: String,
    },
    /// Flip the mechanical compression device on or off
    ToggleMechanicalCompression,
    /// Record a rhythm change
    ChangeRhythm {
        /// The new rhythm
        rhythm: Rhythm,
    },
    /// Remove an entry by identity and restore the counters it contributed to
    RemoveLogEntry {
        /// Entry to remove
        id: EntryId,
    },
    /// Remove the most recent entry
    UndoLast,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_formatting_pads_minutes_and_seconds() {
        assert_eq!(format_offset(0), "00:00");
        assert_eq!(format_offset(59), "00:59");
        assert_eq!(format_offset(185), "03:05");
        assert_eq!(format_offset(3600), "60:00");
    }

    #[test]
    fn shockable_rhythms() {
        assert!(Rhythm::Vf.is_shockable());
        assert!(Rhythm::Pvt.is_shockable());
        assert!(!Rhythm::Asystole.is_shockable());
        assert!(!Rhythm::Pea.is_shockable());
        assert!(!Rhythm::Rosc.is_shockable());
    }

    #[test]
    fn entry_ids_are_monotonic_and_unique() {
        let mut state = SessionState::new();
        let a = state.allocate_entry_id();
        let b = state.allocate_entry_id();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn empty_assessment_summary_reads_as_skipped() {
        let assessment = PreAssessment::default();
        assert!(!assessment.is_recorded());
        assert_eq!(assessment.summary(), "Skipped Primary Survey");
    }

    #[test]
    fn assessment_summary_concatenates_only_set_fields() {
        let assessment = PreAssessment {
            general_impression: Some(GeneralImpression::Critical),
            avpu: Some(Avpu::Unresponsive),
            pulse: Some(PulseFinding::Absent),
            ..PreAssessment::default()
        };
        assert_eq!(
            assessment.summary(),
            "Survey: Critical, AVPU:U, Pulse:Absent"
        );
    }

    #[test]
    fn critical_triad_requires_all_three_findings() {
        let mut assessment = PreAssessment {
            avpu: Some(Avpu::Unresponsive),
            breathing: Some(BreathingFinding::Apnea),
            ..PreAssessment::default()
        };
        assert!(!assessment.is_critical_triad());

        assessment.pulse = Some(PulseFinding::Absent);
        assert!(assessment.is_critical_triad());
    }

    #[test]
    fn medication_names_match_clinical_labels() {
        assert_eq!(Medication::Adrenaline.name(), "Adrenaline");
        assert_eq!(Medication::MagnesiumSulfate.name(), "Magnesium Sulfate");
        assert_eq!(Medication::SodiumBicarbonate.name(), "Sodium Bicarbonate");
        assert_eq!(Medication::CalciumGluconate.name(), "Calcium Gluconate");
    }
}
