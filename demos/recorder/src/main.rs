//! Scripted demo of the recorder.
//!
//! Runs a short VF arrest against the real tick loop: survey, start, shock,
//! first adrenaline, airway, ROSC. Every processed action triggers a
//! replication of the session snapshot, and the run ends by printing the
//! exported record.

use codeblue_core::environment::{Clock, SystemClock};
use codeblue_runtime::Store;
use codeblue_runtime::sync::{InMemorySessionChannel, Replicator, SessionChannel};
use codeblue_session::{
    AssessmentUpdate, LogCategory, Medication, Patient, Report, Rhythm, SessionAction,
    SessionEnvironment, SessionReducer, SessionState,
    types::{Avpu, BreathingFinding, PulseFinding, labels},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("=== Code Blue Recorder Demo ===\n");

    let clock = Arc::new(SystemClock);
    let env = SessionEnvironment::new(clock.clone());
    let store = Store::new(SessionState::new(), SessionReducer::new(), env);

    // Mirror every state change into the shared session document.
    let session_id = uuid::Uuid::new_v4().to_string();
    let channel = InMemorySessionChannel::new();
    let replicator = Replicator::new(channel.clone(), session_id.clone());
    let sync_store = store.clone();
    let sync_clock = Arc::clone(&clock);
    tokio::spawn(async move {
        let mut actions = sync_store.subscribe_actions();
        while let Ok(_action) = actions.recv().await {
            let snapshot = sync_store.state(Clone::clone).await;
            if let Err(error) = replicator.replicate(&snapshot, sync_clock.now()).await {
                tracing::warn!(%error, "replication failed");
            }
        }
    });

    println!("Recording primary survey...");
    store
        .send(SessionAction::UpdateAssessment(AssessmentUpdate::Avpu(
            Avpu::Unresponsive,
        )))
        .await?;
    store
        .send(SessionAction::UpdateAssessment(AssessmentUpdate::Breathing(
            BreathingFinding::Apnea,
        )))
        .await?;
    store
        .send(SessionAction::UpdateAssessment(AssessmentUpdate::Pulse(
            PulseFinding::Absent,
        )))
        .await?;

    println!("Starting code (initial rhythm VF)...");
    store
        .send(SessionAction::StartCode {
            rhythm: Rhythm::Vf,
        })
        .await?;

    tokio::time::sleep(Duration::from_millis(1200)).await;

    println!("Shock at 200J...");
    store
        .send(SessionAction::AddLog {
            category: LogCategory::Procedure,
            label: labels::SHOCK.to_string(),
            detail: Some("200J".to_string()),
        })
        .await?;

    println!("Adrenaline, first dose...");
    store
        .send(SessionAction::AdministerMedication {
            medication: Medication::Adrenaline,
        })
        .await?;

    tokio::time::sleep(Duration::from_millis(1200)).await;

    println!("Securing airway...");
    store
        .send(SessionAction::SecureAirway {
            detail: "ETT No.7.5 dept.22cms".to_string(),
        })
        .await?;

    println!("Pulse palpable: ROSC\n");
    store
        .send(SessionAction::ChangeRhythm {
            rhythm: Rhythm::Rosc,
        })
        .await?;

    let patient = Patient {
        hospital_number: "6800123".to_string(),
        name: "Demo Patient".to_string(),
        age: "58".to_string(),
        weight_kg: "70".to_string(),
        leader_name: "Dr. Demo".to_string(),
    };
    let state = store.state(Clone::clone).await;
    let report = Report::new(&patient, &state, clock.now());
    println!("{report}");

    if let Some(document) = channel.document(&session_id).await {
        println!(
            "Replicated session {} ({} fields mirrored)",
            session_id,
            document.len()
        );
    }

    store.shutdown(Duration::from_secs(3)).await?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
