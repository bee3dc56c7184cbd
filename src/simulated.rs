//! Stand-in pose capability that replays frames on a background thread,
//! either from a JSON script or from a synthetic push-up wave.

use crate::error::Result;
use crate::pose::{CameraPermission, FrameSink, PoseCapability, PoseOptions, RawPoseFrame};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Frame interval of the synthetic wave (~30 fps)
pub const FRAME_INTERVAL_MS: u64 = 33;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    /// wait before delivering this frame
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub frame: RawPoseFrame,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseScript {
    pub frames: Vec<ScriptedFrame>,
}

impl PoseScript {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// A user who steps into view, holds still for `lead_in`, then does
    /// `reps` push-ups of `rep_period` each. Progress gets a little noise.
    pub fn push_up_wave(reps: u32, lead_in: Duration, rep_period: Duration) -> Self {
        let mut rng = rand::thread_rng();
        let mut frames = Vec::new();
        let frame = |progress: f64| ScriptedFrame {
            delay_ms: FRAME_INTERVAL_MS,
            frame: RawPoseFrame::success(progress),
        };

        let lead_in_frames = lead_in.as_millis() as u64 / FRAME_INTERVAL_MS;
        for _ in 0..lead_in_frames {
            frames.push(frame(rng.gen_range(0.0..0.05)));
        }

        let per_rep = (rep_period.as_millis() as u64 / FRAME_INTERVAL_MS).max(4);
        for _ in 0..reps {
            for i in 0..per_rep {
                let phase = i as f64 / per_rep as f64;
                let progress = (1.0 - (2.0 * PI * phase).cos()) / 2.0;
                let noisy = (progress + rng.gen_range(-0.03..0.03)).clamp(0.0, 1.0);
                frames.push(frame(noisy));
            }
        }
        frames.push(frame(0.0));
        Self { frames }
    }

    /// Total scripted time from start to the last frame
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.frames.iter().map(|f| f.delay_ms).sum())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

struct Worker {
    /// dropping this wakes the producer out of its current delay
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Pose capability replaying a [`PoseScript`].
pub struct SimulatedPose {
    script: PoseScript,
    permission: CameraPermission,
    speed: f64,
    worker: Option<Worker>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl SimulatedPose {
    pub fn new(script: PoseScript) -> Self {
        Self {
            script,
            permission: CameraPermission::Authorized,
            speed: 1.0,
            worker: None,
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_permission(mut self, permission: CameraPermission) -> Self {
        self.permission = permission;
        self
    }

    /// Replay faster (>1) or slower (<1) than the scripted delays
    pub fn with_speed(mut self, speed: f64) -> Self {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
        }
        self
    }

    pub fn start_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.starts)
    }

    pub fn stop_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.stops)
    }
}

impl PoseCapability for SimulatedPose {
    fn permission(&self) -> CameraPermission {
        self.permission
    }

    fn request_permission(&mut self) -> CameraPermission {
        if self.permission == CameraPermission::NotDetermined {
            self.permission = CameraPermission::Authorized;
        }
        self.permission
    }

    fn start(&mut self, _options: &PoseOptions, sink: FrameSink) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let (stop, stopped) = mpsc::channel::<()>();
        let frames = self.script.frames.clone();
        let speed = self.speed;

        let handle = thread::spawn(move || {
            for scripted in &frames {
                let delay = Duration::from_millis(scripted.delay_ms).div_f64(speed);
                match stopped.recv_timeout(delay) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                if !sink.push(&scripted.frame) {
                    break;
                }
            }
            debug!("simulated pose producer finished");
        });

        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(Worker { stop, handle }) = self.worker.take() {
            drop(stop);
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{PoseAdapter, PoseStatus, RawStatus};
    use std::sync::mpsc;

    #[test]
    fn parses_json_script() {
        let json = r#"{
            "frames": [
                {"delay_ms": 10, "status": "no_person_found"},
                {"status": "success", "progress": [0.4]},
                {"status": "success", "progress": [0.1],
                 "feedback": [{"text": "Move back", "is_required": true}]},
                {"status": "sdk_validation_error"}
            ]
        }"#;
        let script = PoseScript::from_json(json).unwrap();
        assert_eq!(script.len(), 4);
        assert_eq!(script.frames[0].delay_ms, 10);
        assert_eq!(script.frames[0].frame.status, RawStatus::NoPersonFound);
        assert_eq!(script.frames[1].delay_ms, 0);
        assert_eq!(script.frames[2].frame.feedback[0].text, "Move back");
        assert_eq!(script.frames[3].frame.status, RawStatus::SdkValidationError);
    }

    #[test]
    fn rejects_malformed_script() {
        assert!(PoseScript::from_json(r#"{"frames": [{"status": "dancing"}]}"#).is_err());
    }

    #[test]
    fn wave_has_one_peak_per_rep() {
        let script = PoseScript::push_up_wave(5, Duration::from_secs(1), Duration::from_secs(1));
        let mut counter = crate::counter::ThresholdCounter::default();
        for f in &script.frames {
            counter.count(f.frame.progress[0]);
        }
        assert_eq!(counter.current(), 5);
    }

    #[test]
    fn replays_frames_through_adapter() {
        let mut script = PoseScript::default();
        for v in [0.1, 0.5, 0.9] {
            script.frames.push(ScriptedFrame {
                delay_ms: 1,
                frame: RawPoseFrame::success(v),
            });
        }
        let pose = SimulatedPose::new(script);
        let starts = pose.start_count();
        let stops = pose.stop_count();
        let (tx, rx) = mpsc::channel();
        let mut adapter = PoseAdapter::new(pose);
        adapter.start(move |ev| tx.send(ev).is_ok()).unwrap();

        let received: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert!(received.iter().all(|e| e.status == PoseStatus::PersonFound));
        assert_eq!(received[2].rep_progress, Some(0.9));

        drop(adapter);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_halts_a_long_script() {
        let mut script = PoseScript::default();
        for _ in 0..10_000 {
            script.frames.push(ScriptedFrame {
                delay_ms: 5,
                frame: RawPoseFrame::success(0.0),
            });
        }
        let (tx, rx) = mpsc::channel();
        let mut adapter = PoseAdapter::new(SimulatedPose::new(script));
        adapter.start(move |ev| tx.send(ev).is_ok()).unwrap();
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        adapter.stop();
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stop_interrupts_a_long_delay() {
        let script = PoseScript {
            frames: vec![
                ScriptedFrame {
                    delay_ms: 0,
                    frame: RawPoseFrame::success(0.0),
                },
                ScriptedFrame {
                    delay_ms: 10_000,
                    frame: RawPoseFrame::success(0.5),
                },
            ],
        };
        let (tx, rx) = mpsc::channel();
        let mut adapter = PoseAdapter::new(SimulatedPose::new(script));
        adapter.start(move |ev| tx.send(ev).is_ok()).unwrap();
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let started = std::time::Instant::now();
        adapter.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(rx.try_recv().is_err());
    }
}
