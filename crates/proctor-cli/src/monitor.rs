//! Live monitor runtime: one task per modality against a single session.
//!
//! Face and audio tasks sample on their own ticker and also wake at the
//! earliest pending debounce deadline, so a sustained condition is flagged on
//! time even between samples. The object task runs inference off the async
//! workers and skips any tick that finds the previous inference still running.
//! Debounce state is private to each task; the emitter's repository is the
//! only shared write target.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use proctor_core::{
    AudioMeter, AudioMonitor, ClassifierError, Emitter, FaceLandmarker, FaceMonitor,
    MonitorConfig, ObjectDetector, ReentrancyGuard, classify_detections,
};
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// The classifier feeds to monitor. Absent feeds run no task.
#[derive(Default)]
pub struct Sources {
    pub faces: Option<Box<dyn FaceLandmarker>>,
    pub objects: Option<Arc<dyn ObjectDetector>>,
    pub audio: Option<Box<dyn AudioMeter>>,
}

impl Sources {
    pub fn is_empty(&self) -> bool {
        self.faces.is_none() && self.objects.is_none() && self.audio.is_none()
    }
}

/// Running monitor. Dropping it leaves the tasks running; call [`stop`].
///
/// [`stop`]: MonitorHandle::stop
pub struct MonitorHandle {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl MonitorHandle {
    /// Resolves once every modality task has ended on its own (all feeds
    /// exhausted).
    pub async fn finished(&self) {
        self.tracker.wait().await;
    }

    /// Cancel every task and wait for them to exit. Pending debounce timers
    /// are discarded without emitting.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.tracker.wait().await;
        debug!("monitor stopped");
    }
}

/// Spawn the per-modality tasks. Must be called inside a tokio runtime.
pub fn spawn_monitor(config: &MonitorConfig, emitter: Emitter, sources: Sources) -> MonitorHandle {
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();
    let origin = Instant::now();

    if let Some(source) = sources.faces {
        tracker.spawn(run_faces(
            source,
            FaceMonitor::new(config),
            emitter.clone(),
            Duration::from_millis(config.face_interval_ms),
            origin,
            cancel.clone(),
        ));
    }
    if let Some(source) = sources.audio {
        tracker.spawn(run_audio(
            source,
            AudioMonitor::new(config),
            emitter.clone(),
            Duration::from_millis(config.audio_interval_ms),
            origin,
            cancel.clone(),
        ));
    }
    if let Some(detector) = sources.objects {
        tracker.spawn(run_objects(
            detector,
            emitter,
            config.clone(),
            cancel.clone(),
            tracker.clone(),
        ));
    }
    tracker.close();

    MonitorHandle { cancel, tracker }
}

fn elapsed_ms(origin: Instant) -> u64 {
    origin.elapsed().as_millis() as u64
}

/// Sleep until the debounce deadline, or forever when none is pending.
async fn until_deadline(origin: Instant, deadline: Option<u64>) {
    match deadline {
        Some(ms) => sleep_until(origin + Duration::from_millis(ms)).await,
        None => future::pending().await,
    }
}

fn sampling_ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn run_faces(
    mut source: Box<dyn FaceLandmarker>,
    mut monitor: FaceMonitor,
    emitter: Emitter,
    period: Duration,
    origin: Instant,
    cancel: CancellationToken,
) {
    let mut ticker = sampling_ticker(period);
    loop {
        let deadline = monitor.deadline();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = until_deadline(origin, deadline) => {
                emitter.emit_all(&monitor.poll(elapsed_ms(origin)));
            }
            _ = ticker.tick() => {
                let now = elapsed_ms(origin);
                match source.detect() {
                    Ok(faces) => {
                        emitter.emit_all(&monitor.observe(&faces, now));
                    }
                    Err(ClassifierError::Exhausted) => {
                        debug!("face feed exhausted");
                        break;
                    }
                    Err(e) => {
                        warn!("face landmarker failed, no signal this tick: {e}");
                        emitter.emit_all(&monitor.poll(now));
                    }
                }
            }
        }
    }
    monitor.cancel_all();
}

async fn run_audio(
    mut source: Box<dyn AudioMeter>,
    mut monitor: AudioMonitor,
    emitter: Emitter,
    period: Duration,
    origin: Instant,
    cancel: CancellationToken,
) {
    let mut ticker = sampling_ticker(period);
    loop {
        let deadline = monitor.deadline();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = until_deadline(origin, deadline) => {
                if let Some(flag) = monitor.poll(elapsed_ms(origin)) {
                    emitter.emit(&flag);
                }
            }
            _ = ticker.tick() => {
                let now = elapsed_ms(origin);
                let flag = match source.level() {
                    Ok(level) => monitor.observe(level, now),
                    Err(ClassifierError::Exhausted) => {
                        debug!("audio feed exhausted");
                        break;
                    }
                    Err(e) => {
                        warn!("audio meter failed, no signal this tick: {e}");
                        monitor.poll(now)
                    }
                };
                if let Some(flag) = flag {
                    emitter.emit(&flag);
                }
            }
        }
    }
    monitor.cancel_all();
}

async fn run_objects(
    detector: Arc<dyn ObjectDetector>,
    emitter: Emitter,
    config: MonitorConfig,
    cancel: CancellationToken,
    tracker: TaskTracker,
) {
    let guard = ReentrancyGuard::new();
    let exhausted = cancel.child_token();
    let mut ticker = sampling_ticker(Duration::from_millis(config.object_interval_ms));
    // First inference after one full cadence, not at start.
    ticker.reset();

    loop {
        tokio::select! {
            biased;
            _ = exhausted.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let Some(permit) = guard.try_acquire() else {
            debug!("object detection still in flight, skipping tick");
            continue;
        };

        let detector = Arc::clone(&detector);
        let emitter = emitter.clone();
        let cancel = cancel.clone();
        let exhausted = exhausted.clone();
        let (min_score, max_detections) = (config.object_min_score, config.object_max_detections);
        tracker.spawn(async move {
            let _permit = permit;
            let inference = tokio::task::spawn_blocking(move || detector.detect());
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = inference => result,
            };
            match result {
                Ok(Ok(detections)) => {
                    emitter.emit_all(&classify_detections(&detections, min_score, max_detections));
                }
                Ok(Err(ClassifierError::Exhausted)) => {
                    debug!("object feed exhausted");
                    exhausted.cancel();
                }
                Ok(Err(e)) => warn!("object detector failed, no signal this tick: {e}"),
                Err(e) => warn!("object detector task aborted: {e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proctor_core::constants::{LEFT_EAR, NOSE_TIP, RIGHT_EAR};
    use proctor_core::{
        Clock, Detection, FaceLandmarks, Landmark, MemoryRepository, SessionRepository,
        SessionService,
    };

    /// Wall clock that follows tokio's (possibly paused) time.
    struct TokioClock(Instant);

    impl Clock for TokioClock {
        fn now_millis(&self) -> u64 {
            elapsed_ms(self.0)
        }
    }

    struct FnFaces<F>(F);

    impl<F> FaceLandmarker for FnFaces<F>
    where
        F: FnMut() -> Result<Vec<FaceLandmarks>, ClassifierError> + Send,
    {
        fn detect(&mut self) -> Result<Vec<FaceLandmarks>, ClassifierError> {
            (self.0)()
        }
    }

    struct FnAudio<F>(F);

    impl<F> AudioMeter for FnAudio<F>
    where
        F: FnMut() -> Result<f64, ClassifierError> + Send,
    {
        fn level(&mut self) -> Result<f64, ClassifierError> {
            (self.0)()
        }
    }

    fn faces<F>(f: F) -> Option<Box<dyn FaceLandmarker>>
    where
        F: FnMut() -> Result<Vec<FaceLandmarks>, ClassifierError> + Send + 'static,
    {
        Some(Box::new(FnFaces(f)))
    }

    fn audio<F>(f: F) -> Option<Box<dyn AudioMeter>>
    where
        F: FnMut() -> Result<f64, ClassifierError> + Send + 'static,
    {
        Some(Box::new(FnAudio(f)))
    }

    /// A face turned hard to one side; eye landmarks are absent, which only
    /// suspends the drowsiness check.
    fn turned_face() -> FaceLandmarks {
        let mut points = vec![None; 478];
        points[LEFT_EAR] = Some(Landmark::new(0.2, 0.5, 0.0));
        points[RIGHT_EAR] = Some(Landmark::new(0.8, 0.5, 0.0));
        points[NOSE_TIP] = Some(Landmark::new(0.25, 0.5, 0.0));
        FaceLandmarks::new(points)
    }

    fn setup() -> (SessionService, Emitter, uuid::Uuid) {
        let repo: Arc<dyn SessionRepository> = Arc::new(MemoryRepository::new());
        let svc = SessionService::new(repo, Arc::new(TokioClock(Instant::now())));
        let session = svc.start("Ada").unwrap();
        let emitter = svc.emitter(session.handle());
        (svc, emitter, session.id)
    }

    fn labels(svc: &SessionService, id: uuid::Uuid) -> Vec<String> {
        svc.detail(id)
            .unwrap()
            .events
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_face_flags_once_after_hold() {
        let (svc, emitter, id) = setup();
        let sources = Sources {
            faces: faces(|| Ok(Vec::new())),
            ..Sources::default()
        };
        let handle = spawn_monitor(&MonitorConfig::default(), emitter, sources);
        tokio::time::sleep(Duration::from_millis(10_250)).await;
        handle.stop().await;
        assert_eq!(labels(&svc, id), vec!["NO_FACE_DETECTED (10s)"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_between_samples() {
        let (svc, emitter, id) = setup();
        let config = MonitorConfig {
            face_interval_ms: 2_000,
            gaze_hold_ms: 500,
            ..MonitorConfig::default()
        };
        let sources = Sources {
            faces: faces(|| Ok(vec![turned_face()])),
            ..Sources::default()
        };
        let handle = spawn_monitor(&config, emitter, sources);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        handle.stop().await;

        let detail = svc.detail(id).unwrap();
        assert_eq!(detail.events.len(), 1);
        assert_eq!(detail.events[0].event_type, "LOOKING_AWAY (500ms)");
        let stored = svc.repository().get(id).unwrap();
        assert_eq!(stored.events[0].timestamp, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_pending_timers() {
        let (svc, emitter, id) = setup();
        let sources = Sources {
            faces: faces(|| Ok(vec![turned_face()])),
            audio: audio(|| Ok(80.0)),
            ..Sources::default()
        };
        let handle = spawn_monitor(&MonitorConfig::default(), emitter, sources);
        tokio::time::sleep(Duration::from_millis(2_750)).await;
        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(labels(&svc, id).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_failures_do_not_reset_debounce() {
        let (svc, emitter, id) = setup();
        let mut n = 0;
        let flaky = faces(move || {
            n += 1;
            if n % 2 == 0 {
                Err(ClassifierError::Malformed("dropped frame".into()))
            } else {
                Ok(Vec::new())
            }
        });
        let sources = Sources {
            faces: flaky,
            ..Sources::default()
        };
        let handle = spawn_monitor(&MonitorConfig::default(), emitter, sources);
        tokio::time::sleep(Duration::from_millis(10_100)).await;
        handle.stop().await;
        assert_eq!(labels(&svc, id), vec!["NO_FACE_DETECTED (10s)"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_feeds_finish_the_monitor() {
        let (svc, emitter, id) = setup();
        let mut remaining = 4;
        let sources = Sources {
            audio: audio(move || {
                if remaining == 0 {
                    return Err(ClassifierError::Exhausted);
                }
                remaining -= 1;
                Ok(90.0)
            }),
            ..Sources::default()
        };
        let config = MonitorConfig {
            voice_hold_ms: 1_200,
            ..MonitorConfig::default()
        };
        let handle = spawn_monitor(&config, emitter, sources);
        handle.finished().await;
        // Loud samples at 0..=1500 ms, feed ends at 2000: the hold elapsed once.
        assert_eq!(labels(&svc, id), vec!["BACKGROUND_VOICE (1200ms)"]);
        handle.stop().await;
    }

    /// Detector that takes longer than the tick period and records how many
    /// inferences overlap.
    struct SlowDetector {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ObjectDetector for SlowDetector {
        fn detect(&self) -> Result<Vec<Detection>, ClassifierError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(70));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![Detection::new("cell phone", 0.9)])
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_object_inference_never_overlaps() {
        let (svc, emitter, id) = setup();
        let detector = Arc::new(SlowDetector {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        let config = MonitorConfig {
            object_interval_ms: 20,
            ..MonitorConfig::default()
        };
        let sources = Sources {
            objects: Some(detector.clone()),
            ..Sources::default()
        };
        let handle = spawn_monitor(&config, emitter, sources);
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.stop().await;

        let calls = detector.calls.load(Ordering::SeqCst);
        assert_eq!(detector.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(calls >= 2, "expected several inferences, got {calls}");
        assert!(calls < 15, "busy ticks must be skipped, got {calls} calls");
        let events = labels(&svc, id);
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e == "PHONE_DETECTED"));
    }

    /// Records when each inference starts.
    struct StampingDetector {
        started: std::time::Instant,
        calls: std::sync::Mutex<Vec<std::time::Duration>>,
    }

    impl ObjectDetector for StampingDetector {
        fn detect(&self) -> Result<Vec<Detection>, ClassifierError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(self.started.elapsed());
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_first_object_inference_waits_one_cadence() {
        let (_svc, emitter, _id) = setup();
        let detector = Arc::new(StampingDetector {
            started: std::time::Instant::now(),
            calls: std::sync::Mutex::new(Vec::new()),
        });
        let config = MonitorConfig {
            object_interval_ms: 200,
            ..MonitorConfig::default()
        };
        let sources = Sources {
            objects: Some(detector.clone()),
            ..Sources::default()
        };
        let handle = spawn_monitor(&config, emitter, sources);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(detector.calls.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(250)).await;
        handle.stop().await;
        let calls = detector.calls.lock().unwrap();
        assert!(!calls.is_empty(), "one cadence elapsed without inference");
        assert!(calls[0] >= std::time::Duration::from_millis(190));
    }
}
