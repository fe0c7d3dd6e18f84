//! Resuscitation session aggregate: the event log, its reducer, derived
//! counters and the report export.
//!
//! The session is a single append-ordered event log plus the counters and
//! flags derived from it. All writes go through [`SessionReducer`]; reads
//! are plain field access on [`SessionState`]. Removal and undo recompute
//! every derived value from the surviving entries, so the log is always the
//! single source of truth.
//!
//! # Quick Start
//!
//! ```no_run
//! use codeblue_session::{Rhythm, SessionAction, SessionEnvironment, SessionReducer, SessionState};
//! use codeblue_runtime::Store;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = SessionEnvironment::system();
//! let store = Store::new(SessionState::new(), SessionReducer::new(), env);
//!
//! // Start the code; the store's effect loop begins ticking once per second.
//! store.send(SessionAction::StartCode { rhythm: Rhythm::Vf }).await?;
//!
//! // Record the first shock.
//! store.send(SessionAction::AddLog {
//!     category: codeblue_session::LogCategory::Procedure,
//!     label: "Defibrillation".to_string(),
//!     detail: Some("200J".to_string()),
//! }).await?;
//!
//! let shocks = store.state(|s| s.shock_count).await;
//! println!("Shocks delivered: {shocks}");
//! # Ok(())
//! # }
//! ```

pub mod dosing;
pub mod protocol;
pub mod reducer;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use reducer::{SessionEnvironment, SessionReducer, TICK_INTERVAL};
pub use report::Report;
pub use types::{
    AssessmentUpdate, EntryId, LogCategory, LogEntry, Medication, Patient, PreAssessment, Rhythm,
    SessionAction, SessionMode, SessionState,
};
