//! Boundary to the external pose-detection capability.
//!
//! The capability produces raw frames on its own thread. [`FrameSink`]
//! normalizes each one into a [`PoseFrameEvent`] and hands it to the
//! consumer, and [`PoseAdapter`] owns the subscription so that starting,
//! stopping and teardown release the camera exactly once.

use crate::error::{Result, WorkoutError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-frame classification after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseStatus {
    PersonFound,
    NoPersonFound,
    SdkError,
}

/// Normalized frame consumed by the workout state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrameEvent {
    pub status: PoseStatus,
    /// exercise progress for this frame, when the capability produced one
    pub rep_progress: Option<f64>,
    /// first feedback item the capability marked as required
    pub required_feedback: Option<String>,
    /// the capability returned any feedback at all, advisory or required
    pub has_feedback: bool,
}

impl PoseFrameEvent {
    pub fn person_found(progress: f64) -> Self {
        Self {
            status: PoseStatus::PersonFound,
            rep_progress: Some(progress),
            required_feedback: None,
            has_feedback: false,
        }
    }

    pub fn no_person() -> Self {
        Self {
            status: PoseStatus::NoPersonFound,
            rep_progress: None,
            required_feedback: None,
            has_feedback: false,
        }
    }

    pub fn sdk_error() -> Self {
        Self {
            status: PoseStatus::SdkError,
            rep_progress: None,
            required_feedback: None,
            has_feedback: false,
        }
    }

    /// Attach a required correction
    pub fn with_feedback(mut self, text: impl Into<String>) -> Self {
        self.required_feedback = Some(text.into());
        self.has_feedback = true;
        self
    }

    /// Mark the frame as carrying advisory feedback only
    pub fn with_advisory_feedback(mut self) -> Self {
        self.has_feedback = true;
        self
    }

    /// A person is in view with a valid progress value and an empty
    /// feedback list.
    pub fn is_well_positioned(&self) -> bool {
        self.status == PoseStatus::PersonFound
            && !self.has_feedback
            && self.rep_progress.is_some_and(|v| v >= 0.0)
    }
}

/// Frame status as reported by the capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawStatus {
    Success,
    NoPersonFound,
    SdkValidationError,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub visibility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub text: String,
    #[serde(default)]
    pub is_required: bool,
}

/// One frame of raw capability output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoseFrame {
    pub status: RawStatus,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    /// per-exercise progress values; the first one drives rep counting
    #[serde(default)]
    pub progress: Vec<f64>,
    #[serde(default)]
    pub feedback: Vec<FeedbackItem>,
}

impl RawPoseFrame {
    pub fn success(progress: f64) -> Self {
        Self {
            status: RawStatus::Success,
            landmarks: Vec::new(),
            progress: vec![progress],
            feedback: Vec::new(),
        }
    }

    pub fn no_person() -> Self {
        Self {
            status: RawStatus::NoPersonFound,
            landmarks: Vec::new(),
            progress: Vec::new(),
            feedback: Vec::new(),
        }
    }
}

/// Reduce a raw frame to the three-variant event the workout understands.
pub fn normalize(raw: &RawPoseFrame) -> PoseFrameEvent {
    match raw.status {
        RawStatus::Success => PoseFrameEvent {
            status: PoseStatus::PersonFound,
            rep_progress: raw.progress.first().copied().filter(|v| v.is_finite()),
            required_feedback: raw
                .feedback
                .first()
                .filter(|item| item.is_required)
                .map(|item| item.text.clone()),
            has_feedback: !raw.feedback.is_empty(),
        },
        RawStatus::NoPersonFound => PoseFrameEvent::no_person(),
        RawStatus::SdkValidationError => PoseFrameEvent::sdk_error(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPermission {
    NotDetermined,
    Authorized,
    Denied,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exercise {
    PushUps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseOptions {
    pub use_front_camera: bool,
    pub exercise: Exercise,
}

impl Default for PoseOptions {
    fn default() -> Self {
        Self {
            use_front_camera: true,
            exercise: Exercise::PushUps,
        }
    }
}

type Deliver = Box<dyn Fn(PoseFrameEvent) -> bool + Send + Sync>;

/// Delivery end handed to a capability for one subscription.
///
/// Frames pushed after the subscription is stopped are dropped here, so a
/// capability thread that is still winding down cannot reach the consumer.
#[derive(Clone)]
pub struct FrameSink {
    active: Arc<AtomicBool>,
    deliver: Arc<Deliver>,
}

impl FrameSink {
    fn new(active: Arc<AtomicBool>, deliver: Deliver) -> Self {
        Self {
            active,
            deliver: Arc::new(deliver),
        }
    }

    /// Normalize and forward a frame. Returns `false` once the subscription
    /// is stopped or the consumer has gone away; producers should then quit.
    pub fn push(&self, raw: &RawPoseFrame) -> bool {
        if !self.is_active() {
            return false;
        }
        (self.deliver)(normalize(raw))
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("active", &self.is_active())
            .finish()
    }
}

/// The external pose-detection capability
pub trait PoseCapability {
    fn permission(&self) -> CameraPermission;

    /// Ask the user for camera access. Defaults to the current status.
    fn request_permission(&mut self) -> CameraPermission {
        self.permission()
    }

    /// Begin producing frames into `sink` until [`PoseCapability::stop`].
    fn start(&mut self, options: &PoseOptions, sink: FrameSink) -> Result<()>;

    fn stop(&mut self);
}

/// Scoped subscription to a [`PoseCapability`].
///
/// `start` and `stop` are idempotent, and dropping the adapter stops a
/// running subscription.
#[derive(Debug)]
pub struct PoseAdapter<C: PoseCapability> {
    capability: C,
    options: PoseOptions,
    active: Option<Arc<AtomicBool>>,
}

impl<C: PoseCapability> PoseAdapter<C> {
    pub fn new(capability: C) -> Self {
        Self::with_options(capability, PoseOptions::default())
    }

    pub fn with_options(capability: C, options: PoseOptions) -> Self {
        Self {
            capability,
            options,
            active: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Start delivering normalized frames to `deliver`. A no-op while running.
    pub fn start<F>(&mut self, deliver: F) -> Result<()>
    where
        F: Fn(PoseFrameEvent) -> bool + Send + Sync + 'static,
    {
        if self.is_running() {
            debug!("pose subscription already running");
            return Ok(());
        }

        let permission = match self.capability.permission() {
            CameraPermission::NotDetermined => self.capability.request_permission(),
            other => other,
        };
        if permission != CameraPermission::Authorized {
            info!(?permission, "camera access not granted");
            return Err(WorkoutError::PermissionDenied);
        }

        let active = Arc::new(AtomicBool::new(true));
        let sink = FrameSink::new(Arc::clone(&active), Box::new(deliver));
        self.capability.start(&self.options, sink)?;
        self.active = Some(active);
        info!("pose subscription started");
        Ok(())
    }

    /// Stop the subscription and release the camera. A no-op when stopped.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.store(false, Ordering::SeqCst);
            self.capability.stop();
            info!("pose subscription stopped");
        }
    }

    pub fn capability(&self) -> &C {
        &self.capability
    }
}

impl<C: PoseCapability> Drop for PoseAdapter<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
