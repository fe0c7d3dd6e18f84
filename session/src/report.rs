//! Plain-text export of a recorded session.
//!
//! [`Report`] renders the full record as a fixed-layout text document: case
//! header, pre-assessment line, one-line summary, the event table
//! oldest-first, and the medication/airway footer. Rendering reads the state
//! as-is and never mutates it; counts shown in the summary are recomputed
//! from the surviving log entries so a report printed after removals stays
//! consistent with the table it sits above.

use crate::dosing;
use crate::types::{Medication, Patient, SessionState, labels};
use chrono::{DateTime, Utc};
use std::fmt;

/// Placeholder for fields the team never filled in.
const BLANK: &str = "-";

fn or_blank(value: &str) -> &str {
    if value.is_empty() { BLANK } else { value }
}

/// A renderable view over a finished (or in-progress) session.
///
/// Borrowing instead of owning keeps export zero-copy; the caller decides
/// when to snapshot the state.
#[derive(Debug)]
pub struct Report<'a> {
    patient: &'a Patient,
    state: &'a SessionState,
    generated_at: DateTime<Utc>,
}

impl<'a> Report<'a> {
    /// Creates a report over `state` for `patient`, stamped `generated_at`.
    #[must_use]
    pub const fn new(
        patient: &'a Patient,
        state: &'a SessionState,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            patient,
            state,
            generated_at,
        }
    }

    /// Suggested export file name, keyed on the hospital number.
    #[must_use]
    pub fn file_name(&self) -> String {
        let hn = if self.patient.hospital_number.is_empty() {
            "Unknown"
        } else {
            &self.patient.hospital_number
        };
        format!("ACLS_{hn}.txt")
    }

    fn entries_matching(&self, needle: &str) -> usize {
        self.state
            .log
            .iter()
            .filter(|entry| entry.label.contains(needle))
            .count()
    }

    fn write_header(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:^78}", "CPCR RECORD FORM (Digital ACLS 2025)")?;
        writeln!(
            f,
            "{:^78}",
            format!("Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))
        )?;
        writeln!(f, "{}", "=".repeat(78))?;
        writeln!(
            f,
            "HN: {}  Name: {}",
            or_blank(&self.patient.hospital_number),
            or_blank(&self.patient.name)
        )?;
        writeln!(
            f,
            "Age: {} | Wt: {} kg",
            or_blank(&self.patient.age),
            or_blank(&self.patient.weight_kg)
        )?;
        writeln!(f, "Leader: {}", or_blank(&self.patient.leader_name))?;

        let survey = &self.state.pre_assessment;
        writeln!(
            f,
            "Initial Assessment: {} | AVPU: {} | Airway: {} | Breathing: {} ({}% / {}rpm) | Circ: {} ({}/{})",
            survey
                .general_impression
                .map_or_else(|| BLANK.to_string(), |v| v.to_string()),
            survey.avpu.map_or_else(|| BLANK.to_string(), |v| v.to_string()),
            survey
                .airway
                .map_or_else(|| BLANK.to_string(), |v| v.to_string()),
            survey
                .breathing
                .map_or_else(|| BLANK.to_string(), |v| v.to_string()),
            or_blank(&survey.spo2),
            or_blank(&survey.respiratory_rate),
            survey.pulse.map_or_else(|| BLANK.to_string(), |v| v.to_string()),
            or_blank(&survey.bp_systolic),
            or_blank(&survey.bp_diastolic),
        )?;
        writeln!(f, "{}", "=".repeat(78))
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Counted over surviving entries, not the running counters, so the
        // line always agrees with the table below it.
        let adrenaline = self.entries_matching(Medication::Adrenaline.name());
        let shocks = self.entries_matching(labels::SHOCK);
        writeln!(
            f,
            "Summary: Adrenaline x{adrenaline} | Shock x{shocks} | Duration: {}",
            self.state.duration()
        )
    }

    fn write_table(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10}{:<10}{:<11}{:<34}{}",
            "Time", "T+ (min)", "Cat", "Action", "Detail"
        )?;
        writeln!(f, "{}", "-".repeat(78))?;
        // The log is stored newest-first; the record reads oldest-first.
        for entry in self.state.log.iter().rev() {
            writeln!(
                f,
                "{:<10}{:<10}{:<11}{:<34}{}",
                entry.recorded_at.format("%H:%M:%S"),
                entry.offset(),
                entry.category.to_string(),
                entry.label,
                entry.detail.as_deref().unwrap_or(BLANK)
            )?;
        }
        writeln!(f, "{}", "-".repeat(78))
    }

    fn write_footer(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Medication Summary:")?;
        writeln!(
            f,
            "- Adrenaline (Total): {} mg",
            self.state.epinephrine_doses
        )?;
        writeln!(
            f,
            "- Amiodarone: {} mg",
            dosing::amiodarone_total_mg(self.state.amiodarone_doses)
        )?;
        writeln!(f, "- Atropine: {} mg", self.state.atropine_total_mg)?;
        writeln!(f)?;
        writeln!(f, "Final Airway Status:")?;
        writeln!(
            f,
            "{}",
            if self.state.airway_secured {
                labels::ADVANCED_AIRWAY
            } else {
                "Basic / BVM"
            }
        )?;
        writeln!(f)?;
        writeln!(f, "{:>70}", "_".repeat(30))?;
        writeln!(f, "{:>64}", "Leader / Recorder Signature")
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_header(f)?;
        self.write_summary(f)?;
        self.write_table(f)?;
        self.write_footer(f)
    }
}
