// Metronome - Drift-corrected click loop
// Runs on its own thread and emits one click per tick; the host drives it with
// start/stop and live tempo/meter changes

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use ringbuf::traits::{Observer, Producer};

use super::practice::{PracticeTimer, SessionSummary};
use super::schedule::{Tick, TickSchedule, wait_until};
use super::timeline::{Tempo, TimeSignature};
use super::transport::SharedTransport;
use super::{MetronomeError, MetronomeResult};
use crate::messaging::channels::{EventConsumer, EventProducer, create_event_channel};
use crate::messaging::notification::MetronomeEvent;

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on first beat of bar (accent/downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

impl ClickType {
    pub fn for_beat(beat: u32) -> Self {
        if beat == 0 {
            ClickType::Accent
        } else {
            ClickType::Regular
        }
    }
}

/// Host capability that makes a tick audible
pub trait ClickSink: Send {
    /// Called once per run, before the first tick (warm up buffers, etc.)
    fn prepare(&mut self) -> MetronomeResult<()> {
        Ok(())
    }

    /// Produce one click. Errors are logged by the loop and never retried.
    fn emit(&mut self, click: ClickType) -> MetronomeResult<()>;

    /// Called once when a run ends, after its last tick
    fn finish(&mut self) -> MetronomeResult<()> {
        Ok(())
    }
}

impl<F> ClickSink for F
where
    F: FnMut(ClickType) -> MetronomeResult<()> + Send,
{
    fn emit(&mut self, click: ClickType) -> MetronomeResult<()> {
        self(click)
    }
}

/// Metronome run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetronomeState {
    #[default]
    Stopped,
    Running,
}

struct TickWorker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Metronome controller
/// Owns the tick thread; tempo and meter are shared with it through `SharedTransport`
pub struct Metronome {
    transport: Arc<SharedTransport>,
    sink: Arc<Mutex<Box<dyn ClickSink>>>,
    events: Arc<Mutex<EventProducer>>,
    state: MetronomeState,
    worker: Option<TickWorker>,
    practice: PracticeTimer,
    session_start: Option<(DateTime<Local>, Tempo)>,
}

impl Metronome {
    /// Create a stopped metronome at the default tempo in 4/4.
    /// Returns the consumer end of the tick event channel. One slot beyond
    /// `event_capacity` is held back for the `Stopped` event.
    pub fn new(sink: impl ClickSink + 'static, event_capacity: usize) -> (Self, EventConsumer) {
        Self::with_transport(sink, event_capacity, Tempo::default(), TimeSignature::default())
    }

    pub fn with_transport(
        sink: impl ClickSink + 'static,
        event_capacity: usize,
        tempo: Tempo,
        time_signature: TimeSignature,
    ) -> (Self, EventConsumer) {
        let (event_tx, event_rx) = create_event_channel(event_capacity.max(1) + 1);

        let metronome = Self {
            transport: SharedTransport::new(tempo, time_signature),
            sink: Arc::new(Mutex::new(Box::new(sink))),
            events: Arc::new(Mutex::new(event_tx)),
            state: MetronomeState::Stopped,
            worker: None,
            practice: PracticeTimer::new(),
            session_start: None,
        };

        (metronome, event_rx)
    }

    /// Start ticking at `bpm` in `time_signature`.
    /// A running loop is stopped and joined first.
    pub fn start(&mut self, bpm: u32, time_signature: TimeSignature) -> MetronomeResult<()> {
        let tempo = Tempo::new(bpm)?;
        time_signature.validate()?;

        if self.state == MetronomeState::Running {
            self.stop();
        }

        // The cursor is back on the downbeat whenever the loop is stopped
        self.transport.store(tempo, time_signature);
        self.transport.set_current_beat(0);
        log_unpaced(tempo, time_signature);

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let transport = Arc::clone(&self.transport);
        let sink = Arc::clone(&self.sink);
        let events = Arc::clone(&self.events);

        let handle = thread::Builder::new()
            .name("metronome-tick".to_string())
            .spawn(move || run_tick_loop(transport, sink, events, stop_rx))
            .map_err(|e| {
                log::error!("Failed to spawn metronome thread: {}", e);
                MetronomeError::Spawn(e.to_string())
            })?;

        self.worker = Some(TickWorker { stop_tx, handle });
        self.state = MetronomeState::Running;
        self.practice.resume();
        if self.session_start.is_none() {
            self.session_start = Some((Local::now(), tempo));
        }

        log::info!("Metronome started: {} in {}", tempo, time_signature);
        Ok(())
    }

    /// Stop ticking and reset the beat cursor.
    /// Returns once the tick thread has exited: no tick fires after this.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            // Capacity 1 and a single send: never blocks
            let _ = worker.stop_tx.send(());
            if worker.handle.join().is_err() {
                log::error!("Metronome thread panicked");
            }
            log::info!("Metronome stopped");
        }

        self.transport.set_current_beat(0);
        self.state = MetronomeState::Stopped;
        self.practice.pause();
    }

    /// Change the live tempo; the loop picks it up on its next tick
    pub fn set_tempo(&mut self, bpm: u32) -> MetronomeResult<()> {
        let tempo = Tempo::new(bpm)?;
        self.transport.set_tempo(tempo);
        log::debug!("Tempo set to {}", tempo);
        log_unpaced(tempo, self.transport.time_signature());
        Ok(())
    }

    /// Change the live meter.
    /// Stopped: the cursor is already on the downbeat and the next run starts
    /// there. Running: the cursor keeps counting and wraps modulo the new bar
    /// length from the next tick on.
    pub fn set_time_signature(&mut self, time_signature: TimeSignature) -> MetronomeResult<()> {
        time_signature.validate()?;
        self.transport.set_time_signature(time_signature);

        log::debug!("Time signature set to {}", time_signature);
        log_unpaced(self.transport.tempo(), time_signature);
        Ok(())
    }

    pub fn state(&self) -> MetronomeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MetronomeState::Running
    }

    pub fn tempo(&self) -> Tempo {
        self.transport.tempo()
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.transport.time_signature()
    }

    /// Beat of the last tick emitted (0 while stopped)
    pub fn current_beat(&self) -> u32 {
        self.transport.current_beat()
    }

    /// Time spent running since the session began
    pub fn elapsed(&self) -> Duration {
        self.practice.elapsed()
    }

    /// Summary of the session so far, or `None` if the metronome never ran
    pub fn session_summary(&self) -> Option<SessionSummary> {
        let (started_at, starting_tempo) = self.session_start?;

        Some(SessionSummary {
            started_at,
            starting_bpm: starting_tempo.bpm(),
            achieved_bpm: self.tempo().bpm(),
            time_signature: self.time_signature(),
            elapsed_secs: self.elapsed().as_secs(),
        })
    }

    /// Forget the current session (timer and starting tempo)
    pub fn reset_session(&mut self) {
        self.practice.reset();
        self.session_start = None;
        if self.is_running() {
            self.practice.resume();
            self.session_start = Some((Local::now(), self.tempo()));
        }
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stop_requested(stop_rx: &Receiver<()>) -> bool {
    !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
}

fn log_unpaced(tempo: Tempo, time_signature: TimeSignature) {
    if tempo.beat_interval_ms(time_signature.note_value()) == 0 {
        log::debug!(
            "{} in {} rounds to a 0 ms interval, ticks will not wait",
            tempo,
            time_signature
        );
    }
}

/// Push a loop event, keeping the last slot free for `Stopped`
fn publish(events: &Mutex<EventProducer>, event: MetronomeEvent) {
    let mut events = events.lock();
    if events.vacant_len() > 1 {
        let _ = events.try_push(event);
    } else {
        log::debug!("Event buffer full, dropping {:?}", event);
    }
}

fn publish_stopped(events: &Mutex<EventProducer>) {
    if events.lock().try_push(MetronomeEvent::Stopped).is_err() {
        log::debug!("Event buffer full, dropping Stopped");
    }
}

fn emit_tick(
    tick: Tick,
    sink: &Mutex<Box<dyn ClickSink>>,
    events: &Mutex<EventProducer>,
    transport: &SharedTransport,
) {
    let result = sink.lock().emit(ClickType::for_beat(tick.beat));
    transport.set_current_beat(tick.beat);

    log::trace!(
        "Tick #{} beat {}{} at {:?}",
        tick.sequence,
        tick.beat,
        if tick.accented { " (accent)" } else { "" },
        tick.target
    );

    publish(events, MetronomeEvent::Tick(tick));

    if let Err(e) = result {
        log::warn!("Click for beat {} failed: {}", tick.beat, e);
        publish(
            events,
            MetronomeEvent::EmissionFailed {
                beat: tick.beat,
                message: e.to_string(),
            },
        );
    }
}

/// Body of the tick thread
///
/// Each iteration emits the current tick, reads tempo and meter once, advances
/// the schedule, then blocks on the stop channel until the next target. Targets
/// are offsets from `origin`, so emission latency does not accumulate.
fn run_tick_loop(
    transport: Arc<SharedTransport>,
    sink: Arc<Mutex<Box<dyn ClickSink>>>,
    events: Arc<Mutex<EventProducer>>,
    stop_rx: Receiver<()>,
) {
    if let Err(e) = sink.lock().prepare() {
        log::warn!("Click output not ready: {}", e);
    }
    publish(&events, MetronomeEvent::Started);

    let origin = Instant::now();
    let mut schedule = TickSchedule::new();

    loop {
        if stop_requested(&stop_rx) {
            break;
        }

        emit_tick(schedule.current(), &sink, &events, &transport);

        let (tempo, time_signature) = transport.snapshot();
        schedule.advance(tempo, time_signature);

        let wait = wait_until(origin.elapsed(), schedule.next_target());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Err(e) = sink.lock().finish() {
        log::warn!("Click output did not wind down: {}", e);
    }
    publish_stopped(&events);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::Consumer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn silent(_: ClickType) -> MetronomeResult<()> {
        Ok(())
    }

    fn drain(rx: &mut EventConsumer) -> Vec<MetronomeEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.try_pop() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_click_type_for_beat() {
        assert_eq!(ClickType::for_beat(0), ClickType::Accent);
        assert_eq!(ClickType::for_beat(1), ClickType::Regular);
        assert_eq!(ClickType::for_beat(6), ClickType::Regular);
    }

    #[test]
    fn test_initial_state() {
        let (metronome, _rx) = Metronome::new(silent, 16);
        assert_eq!(metronome.state(), MetronomeState::Stopped);
        assert_eq!(metronome.tempo(), Tempo::default());
        assert_eq!(metronome.time_signature(), TimeSignature::four_four());
        assert_eq!(metronome.current_beat(), 0);
        assert!(metronome.session_summary().is_none());
    }

    #[test]
    fn test_invalid_tempo_keeps_state() {
        let (mut metronome, _rx) = Metronome::new(silent, 16);
        metronome.set_tempo(132).unwrap();

        assert!(matches!(
            metronome.set_tempo(0),
            Err(MetronomeError::InvalidArgument(_))
        ));
        assert_eq!(metronome.tempo().bpm(), 132);

        assert!(matches!(
            metronome.start(0, TimeSignature::three_four()),
            Err(MetronomeError::InvalidArgument(_))
        ));
        assert_eq!(metronome.state(), MetronomeState::Stopped);
        assert_eq!(metronome.tempo().bpm(), 132);
        assert_eq!(metronome.time_signature(), TimeSignature::four_four());
    }

    #[test]
    fn test_invalid_time_signature_keeps_state() {
        let (mut metronome, _rx) = Metronome::new(silent, 16);
        let bogus: TimeSignature = ron::from_str("(beats_per_bar: 0, note_value: 4)").unwrap();

        assert!(metronome.set_time_signature(bogus).is_err());
        assert!(metronome.start(120, bogus).is_err());
        assert_eq!(metronome.time_signature(), TimeSignature::four_four());
        assert!(!metronome.is_running());
    }

    #[test]
    fn test_start_stop_transitions() {
        let (mut metronome, mut rx) = Metronome::new(silent, 64);

        metronome.start(600, TimeSignature::new(4, 16).unwrap()).unwrap();
        assert!(metronome.is_running());
        std::thread::sleep(Duration::from_millis(60));
        metronome.stop();

        assert_eq!(metronome.state(), MetronomeState::Stopped);
        assert_eq!(metronome.current_beat(), 0);

        let events = drain(&mut rx);
        assert_eq!(events.first(), Some(&MetronomeEvent::Started));
        assert_eq!(events.last(), Some(&MetronomeEvent::Stopped));
        assert!(events.iter().filter_map(MetronomeEvent::as_tick).count() >= 1);
    }

    #[test]
    fn test_restart_replaces_running_loop() {
        let (mut metronome, mut rx) = Metronome::new(silent, 256);

        metronome.start(600, TimeSignature::new(4, 16).unwrap()).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        metronome.start(600, TimeSignature::new(3, 16).unwrap()).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        metronome.stop();

        let events = drain(&mut rx);
        let starts = events.iter().filter(|e| **e == MetronomeEvent::Started).count();
        let stops = events.iter().filter(|e| **e == MetronomeEvent::Stopped).count();
        assert_eq!(starts, 2);
        assert_eq!(stops, 2);

        // The first loop is fully stopped before the second starts
        let first_stop = events.iter().position(|e| *e == MetronomeEvent::Stopped);
        let second_start = events.iter().rposition(|e| *e == MetronomeEvent::Started);
        assert!(first_stop < second_start);
    }

    #[test]
    fn test_prepare_runs_once_per_start() {
        struct Counting(Arc<AtomicUsize>);
        impl ClickSink for Counting {
            fn prepare(&mut self) -> MetronomeResult<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(MetronomeError::EmissionFailure("not warmed up".to_string()))
            }
            fn emit(&mut self, _click: ClickType) -> MetronomeResult<()> {
                Ok(())
            }
        }

        let prepared = Arc::new(AtomicUsize::new(0));
        let (mut metronome, mut rx) = Metronome::new(Counting(Arc::clone(&prepared)), 64);

        metronome.start(600, TimeSignature::four_four()).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        metronome.stop();
        metronome.start(600, TimeSignature::four_four()).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        metronome.stop();

        assert_eq!(prepared.load(Ordering::SeqCst), 2);
        // A failing prepare does not prevent ticking
        assert!(drain(&mut rx).iter().any(|e| e.as_tick().is_some()));
    }

    #[test]
    fn test_time_signature_change_while_stopped_resets_cursor() {
        let (mut metronome, _rx) = Metronome::new(silent, 16);
        metronome.set_time_signature(TimeSignature::new(7, 8).unwrap()).unwrap();
        assert_eq!(metronome.current_beat(), 0);
        assert_eq!(metronome.time_signature().to_string(), "7/8");
    }

    #[test]
    fn test_session_summary_tracks_tempo() {
        let (mut metronome, _rx) = Metronome::new(silent, 64);

        metronome.start(90, TimeSignature::three_four()).unwrap();
        metronome.set_tempo(104).unwrap();
        metronome.stop();

        let summary = metronome.session_summary().unwrap();
        assert_eq!(summary.starting_bpm, 90);
        assert_eq!(summary.achieved_bpm, 104);
        assert_eq!(summary.time_signature, TimeSignature::three_four());

        // A restart does not move the session's starting tempo
        metronome.start(110, TimeSignature::three_four()).unwrap();
        metronome.stop();
        assert_eq!(metronome.session_summary().unwrap().starting_bpm, 90);

        metronome.reset_session();
        assert!(metronome.session_summary().is_none());
        assert_eq!(metronome.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_drop_stops_thread() {
        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&clicks);
        let (mut metronome, _rx) = Metronome::new(
            move |_: ClickType| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), MetronomeError>(())
            },
            16,
        );

        metronome.start(600, TimeSignature::new(4, 16).unwrap()).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        drop(metronome);

        let after_drop = clicks.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(clicks.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_finish_runs_when_each_run_ends() {
        struct Winding(Arc<AtomicUsize>, Arc<AtomicUsize>);
        impl ClickSink for Winding {
            fn emit(&mut self, _click: ClickType) -> MetronomeResult<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            fn finish(&mut self) -> MetronomeResult<()> {
                self.1.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let clicks = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (mut metronome, _rx) = Metronome::new(
            Winding(Arc::clone(&clicks), Arc::clone(&finished)),
            64,
        );

        metronome.start(600, TimeSignature::four_four()).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        metronome.stop();

        // Already wound down when stop returns
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(clicks.load(Ordering::SeqCst) >= 1);

        metronome.start(600, TimeSignature::four_four()).unwrap();
        metronome.start(600, TimeSignature::three_four()).unwrap();
        metronome.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 3);

        // Stopping a stopped metronome does not wind down again
        metronome.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_stopped_event_survives_full_buffer() {
        let (mut metronome, mut rx) = Metronome::new(silent, 4);

        // 600 BPM in 16ths: 25ms ticks, far more than fit in the buffer
        metronome.start(600, TimeSignature::new(4, 16).unwrap()).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        metronome.stop();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], MetronomeEvent::Started);
        assert_eq!(events.last(), Some(&MetronomeEvent::Stopped));

        let beats: Vec<u32> = events
            .iter()
            .filter_map(MetronomeEvent::as_tick)
            .map(|tick| tick.beat)
            .collect();
        assert_eq!(beats, vec![0, 1, 2]);
    }

    #[test]
    fn test_restart_after_mid_bar_stop_begins_on_downbeat() {
        let (mut metronome, mut rx) = Metronome::new(silent, 256);
        let ts = TimeSignature::new(7, 16).unwrap();

        // Stop somewhere inside the bar (beat 2 or later)
        metronome.start(600, ts).unwrap();
        std::thread::sleep(Duration::from_millis(65));
        metronome.stop();
        let first_run: Vec<Tick> = drain(&mut rx)
            .iter()
            .filter_map(MetronomeEvent::as_tick)
            .copied()
            .collect();
        assert!(first_run.len() >= 2);
        assert_eq!(metronome.current_beat(), 0);

        // Same meter, so nothing but the stop puts the cursor back
        metronome.start(600, ts).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        metronome.stop();

        let second_run = drain(&mut rx);
        let first_tick = second_run
            .iter()
            .find_map(MetronomeEvent::as_tick)
            .copied()
            .unwrap();
        assert_eq!(first_tick.sequence, 0);
        assert_eq!(first_tick.beat, 0);
        assert!(first_tick.accented);
    }
}
