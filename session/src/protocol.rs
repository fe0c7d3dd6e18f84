//! Protocol reference data and detail-line composers.
//!
//! These tables back the shell's quick-pick surfaces: defibrillation
//! energies, the standard lab panel, the 5H/5T reversible-cause review and
//! the post-ROSC checklist. Picks are turned into plain `AddLog` / `SendLabs`
//! actions here so every caller produces identical log text.

use crate::types::LogCategory;

/// Selectable defibrillation energies, in joules.
pub const SHOCK_ENERGIES_J: [u16; 6] = [120, 150, 200, 270, 300, 360];

/// Detail line for a defibrillation entry.
#[must_use]
pub fn shock_detail(energy_j: u16) -> String {
    format!("{energy_j}J")
}

/// The standard lab panel, in display order. DTX carries an optional
/// point-of-care glucose value.
pub const LAB_PANEL: [&str; 8] = [
    "DTX",
    "CBC",
    "Elyte",
    "BUN/Cr",
    "Hemo/Coag",
    "Trop-T",
    "Lactate",
    "ABG",
];

/// Composes a lab detail line from the selected panel items.
///
/// Standard labs come first, comma-joined; DTX follows with its measured
/// value when one was entered; a free-text lab closes the line. Returns
/// `None` when nothing was selected.
#[must_use]
pub fn lab_detail(selected: &[&str], dtx_value: Option<&str>, custom: Option<&str>) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    let standard: Vec<&str> = selected.iter().copied().filter(|lab| *lab != "DTX").collect();
    if !standard.is_empty() {
        parts.push(standard.join(", "));
    }

    if selected.contains(&"DTX") {
        match dtx_value.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => parts.push(format!("DTX: {value} mg%")),
            None => parts.push("DTX".to_string()),
        }
    }

    if let Some(custom) = custom.map(str::trim).filter(|value| !value.is_empty()) {
        parts.push(custom.to_string());
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// The two halves of the reversible-cause mnemonic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CauseGroup {
    /// The five H's
    H,
    /// The five T's
    T,
}

/// One reversible cause with its bedside clues.
#[derive(Clone, Copy, Debug)]
pub struct ReversibleCause {
    /// Which mnemonic half this cause belongs to
    pub group: CauseGroup,
    /// Display label, also embedded in the log entry
    pub label: &'static str,
    /// Findings that point at this cause
    pub clues: &'static [&'static str],
}

/// The 5H/5T reversible-cause review, in display order.
pub const REVERSIBLE_CAUSES: [ReversibleCause; 10] = [
    ReversibleCause {
        group: CauseGroup::H,
        label: "Hypovolemia",
        clues: &[
            "History of fluid loss/blood loss",
            "Flat neck veins",
            "IV Fluids required",
        ],
    },
    ReversibleCause {
        group: CauseGroup::H,
        label: "Hypoxia",
        clues: &["Airway obstruction", "Desaturation", "Cyanosis"],
    },
    ReversibleCause {
        group: CauseGroup::H,
        label: "Hydrogen Ion (Acidosis)",
        clues: &["Diabetes", "Renal Failure", "ABG shows acidosis"],
    },
    ReversibleCause {
        group: CauseGroup::H,
        label: "Hypo/Hyperkalemia",
        clues: &[
            "Renal failure",
            "Dialysis history",
            "Peaked T waves (Hyper)",
            "Flat T waves (Hypo)",
        ],
    },
    ReversibleCause {
        group: CauseGroup::H,
        label: "Hypothermia",
        clues: &["Exposure to cold", "Low body temp"],
    },
    ReversibleCause {
        group: CauseGroup::T,
        label: "Tension Pneumothorax",
        clues: &[
            "Tracheal deviation",
            "Unequal breath sounds",
            "Hypotension",
        ],
    },
    ReversibleCause {
        group: CauseGroup::T,
        label: "Tamponade, Cardiac",
        clues: &[
            "Muffled heart sounds",
            "Distended neck veins",
            "Hypotension",
        ],
    },
    ReversibleCause {
        group: CauseGroup::T,
        label: "Toxins",
        clues: &["History of ingestion", "Empty bottles", "Pupillary changes"],
    },
    ReversibleCause {
        group: CauseGroup::T,
        label: "Thrombosis, Pulmonary",
        clues: &["History of DVT", "Bed bound", "Distended neck veins"],
    },
    ReversibleCause {
        group: CauseGroup::T,
        label: "Thrombosis, Coronary",
        clues: &["ST elevation", "Angina history", "Elevated troponin"],
    },
];

impl ReversibleCause {
    /// Log entry for marking this cause ruled out.
    #[must_use]
    pub fn rule_out_entry(&self) -> (LogCategory, String, String) {
        (
            LogCategory::Info,
            format!("Rule Out {}", self.label),
            "Diagnostic".to_string(),
        )
    }

    /// Log entry for marking this cause under treatment.
    #[must_use]
    pub fn treating_entry(&self) -> (LogCategory, String, String) {
        (
            LogCategory::Procedure,
            format!("Treating {}", self.label),
            "Therapeutic".to_string(),
        )
    }
}

/// Post-ROSC care checklist: stable key plus display text.
pub const ROSC_CHECKLIST: [(&str, &str); 7] = [
    ("Airway", "Airway : early ETT placement, recheck ETT"),
    ("Breathing", "Breathing : RR 10/min, SpO2 92-98%, PaCO2 35-45"),
    ("Circulation", "Circulation : SBP > 90, MAP > 65"),
    ("Diagnosis", "Diagnosis : 5H 5T"),
    ("ECG", "ECG 12 leads : PCI if STEMI, ECMO"),
    ("Commands", "Follow commands? : if not TTM, EEG, CT"),
    ("ICU", "Consider ICU admission"),
];

/// Composes a mid-code vital-signs / clinical-note entry.
///
/// Returns the entry label and detail, or `None` when every field is blank.
/// A note without any vitals is labelled "Clinical Note" instead of
/// "Vital Signs".
#[must_use]
pub fn vital_signs_entry(
    bp_systolic: &str,
    bp_diastolic: &str,
    heart_rate: &str,
    respiratory_rate: &str,
    spo2: &str,
    note: &str,
) -> Option<(String, String)> {
    let mut parts: Vec<String> = Vec::new();
    if !bp_systolic.is_empty() || !bp_diastolic.is_empty() {
        parts.push(format!("BP: {bp_systolic}/{bp_diastolic}"));
    }
    if !heart_rate.is_empty() {
        parts.push(format!("HR: {heart_rate}"));
    }
    if !respiratory_rate.is_empty() {
        parts.push(format!("RR: {respiratory_rate}"));
    }
    if !spo2.is_empty() {
        parts.push(format!("SpO2: {spo2}%"));
    }

    let vitals = parts.join(", ");
    let note = note.trim();

    if vitals.is_empty() && note.is_empty() {
        return None;
    }

    let label = if vitals.is_empty() {
        "Clinical Note"
    } else {
        "Vital Signs"
    };
    let detail = if vitals.is_empty() {
        note.to_string()
    } else if note.is_empty() {
        vitals
    } else {
        format!("{vitals} | {note}")
    };

    Some((label.to_string(), detail))
}
