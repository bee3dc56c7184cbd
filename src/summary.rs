use crate::error::Result;
use crate::format;
use crate::mode::WorkoutMode;
use crate::session::WorkoutResult;
use crate::store::{RecordId, RecordSink, WorkoutRecord};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(RecordId),
    /// an earlier call already persisted this session; nothing was written
    AlreadySaved(RecordId),
}

impl SaveOutcome {
    pub fn id(&self) -> RecordId {
        match self {
            SaveOutcome::Saved(id) | SaveOutcome::AlreadySaved(id) => *id,
        }
    }
}

/// Result screen for a completed workout: display metrics plus a one-time
/// save into the history.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    result: WorkoutResult,
    average_form_score: Option<f64>,
    saved: Option<RecordId>,
}

impl SessionSummary {
    pub fn new(result: WorkoutResult) -> Self {
        Self {
            result,
            average_form_score: None,
            saved: None,
        }
    }

    pub fn with_form_score(mut self, score: f64) -> Self {
        self.average_form_score = Some(score).filter(|s| s.is_finite());
        self
    }

    pub fn result(&self) -> &WorkoutResult {
        &self.result
    }

    pub fn mode(&self) -> WorkoutMode {
        self.result.config.mode
    }

    pub fn target_value(&self) -> u32 {
        self.result.config.target_value
    }

    pub fn completed_reps(&self) -> u32 {
        self.result.completed_reps
    }

    pub fn duration_secs(&self) -> f64 {
        self.result.duration_secs()
    }

    pub fn average_form_score(&self) -> Option<f64> {
        self.average_form_score
    }

    /// Seconds per rep; undefined without reps
    pub fn average_time_per_rep(&self) -> Option<f64> {
        match self.result.completed_reps {
            0 => None,
            n => Some(self.duration_secs() / n as f64),
        }
    }

    pub fn duration_text(&self) -> String {
        format::abbreviated(self.duration_secs())
    }

    pub fn average_time_text(&self) -> Option<String> {
        self.average_time_per_rep().map(|s| format!("{s:.1} sec"))
    }

    /// e.g. `Reps - 20 reps` or `Time - 60 sec`
    pub fn target_text(&self) -> String {
        format!(
            "{} - {} {}",
            self.mode(),
            self.target_value(),
            self.mode().unit()
        )
    }

    pub fn is_saved(&self) -> bool {
        self.saved.is_some()
    }

    pub fn saved_id(&self) -> Option<RecordId> {
        self.saved
    }

    pub fn to_record(&self) -> WorkoutRecord {
        WorkoutRecord::new(
            self.mode(),
            self.target_value(),
            self.completed_reps(),
            self.duration_secs(),
            self.average_form_score,
        )
    }

    /// Persist this session once. Later calls report the first save; a
    /// failed write leaves the summary unsaved so the caller can retry.
    pub fn save<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<SaveOutcome> {
        if let Some(id) = self.saved {
            return Ok(SaveOutcome::AlreadySaved(id));
        }
        let record = self.to_record();
        if let Err(e) = sink.append(&record) {
            warn!(error = %e, "saving workout failed");
            return Err(e);
        }
        self.saved = Some(record.id);
        Ok(SaveOutcome::Saved(record.id))
    }

    /// Drop the session without writing anything.
    pub fn discard(self) {
        info!(
            reps = self.result.completed_reps,
            saved = self.is_saved(),
            "workout summary dismissed"
        );
    }
}
