use practice_metronome::audio::OutputStatus;
use practice_metronome::{
    ClickEngine, ClickType, Metronome, MetronomeConfig, MetronomeError, MetronomeEvent,
    TimeSignature,
};
use ringbuf::traits::Consumer;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(5);

const USAGE: &str = "usage: practice_metronome [BPM] [BEATS/NOTE] [SECONDS]

  BPM          tempo, held within the configured bounds (default from config)
  BEATS/NOTE   time signature such as 4/4, 7/8 (default from config)
  SECONDS      stop after this long; without it, press Enter to stop

Config file: $CONFIG_DIR/practice-metronome/config.ron (RUST_LOG sets log level)";

struct Args {
    bpm: Option<u32>,
    time_signature: Option<TimeSignature>,
    duration: Option<Duration>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        bpm: None,
        time_signature: None,
        duration: None,
    };

    if let Some(bpm) = args.next() {
        if bpm == "-h" || bpm == "--help" {
            return Err(USAGE.to_string());
        }
        parsed.bpm = Some(bpm.parse().map_err(|_| format!("invalid BPM '{}'", bpm))?);
    }
    if let Some(signature) = args.next() {
        parsed.time_signature = Some(signature.parse().map_err(|e: MetronomeError| e.to_string())?);
    }
    if let Some(seconds) = args.next() {
        let seconds: u64 = seconds
            .parse()
            .map_err(|_| format!("invalid duration '{}'", seconds))?;
        parsed.duration = Some(Duration::from_secs(seconds));
    }

    Ok(parsed)
}

fn beat_bar(beat: u32, beats_per_bar: u16) -> String {
    (0..beats_per_bar as u32)
        .map(|i| match (i == beat, i == 0) {
            (true, true) => "●",
            (true, false) => "◉",
            (false, _) => "○",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let config = match MetronomeConfig::default_path() {
        Some(path) => match MetronomeConfig::load_or_default(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config {:?}: {}", path, e);
                MetronomeConfig::default()
            }
        },
        None => MetronomeConfig::default(),
    };

    let tempo = config.clamp_tempo(args.bpm.unwrap_or(config.default_bpm));
    let time_signature = args.time_signature.unwrap_or(config.time_signature);

    // Keep the engine alive for the whole run: dropping it closes the stream
    let (engine, mut events, mut metronome) =
        match ClickEngine::new(config.volume, config.click_capacity) {
            Ok((engine, sink)) => {
                let (metronome, events) = Metronome::new(sink, config.event_capacity);
                (Some(engine), events, metronome)
            }
            Err(e) => {
                log::warn!("Audio unavailable ({}), running silently", e);
                let silent = |_: ClickType| Ok::<(), MetronomeError>(());
                let (metronome, events) = Metronome::new(silent, config.event_capacity);
                (None, events, metronome)
            }
        };

    if let Err(e) = metronome.start(tempo.bpm(), time_signature) {
        eprintln!("ERROR: {}", e);
        return ExitCode::FAILURE;
    }

    println!("{} in {}", tempo, time_signature);

    let quit = Arc::new(AtomicBool::new(false));
    if args.duration.is_none() {
        println!("Press Enter to stop\n");
        let quit = Arc::clone(&quit);
        std::thread::spawn(move || {
            let _ = io::stdin().lock().lines().next();
            quit.store(true, Ordering::Relaxed);
        });
    }

    let started = Instant::now();
    let mut stdout = io::stdout();
    loop {
        while let Some(event) = events.try_pop() {
            match event {
                MetronomeEvent::Tick(tick) => {
                    let _ = write!(
                        stdout,
                        "\r{}  ",
                        beat_bar(tick.beat, metronome.time_signature().beats_per_bar())
                    );
                    let _ = stdout.flush();
                }
                MetronomeEvent::EmissionFailed { beat, message } => {
                    log::warn!("Beat {}: {}", beat, message);
                }
                MetronomeEvent::Started | MetronomeEvent::Stopped => {}
            }
        }

        let timed_out = args.duration.is_some_and(|d| started.elapsed() >= d);
        if timed_out || quit.load(Ordering::Relaxed) {
            break;
        }
        std::thread::sleep(EVENT_POLL_INTERVAL);
    }

    metronome.stop();
    println!();

    if engine.as_ref().map(ClickEngine::status) == Some(OutputStatus::Failed) {
        eprintln!("Audio output failed during the session, some clicks were not heard");
    }

    if let Some(summary) = metronome.session_summary() {
        println!(
            "Practiced {}s at {} BPM ({})",
            summary.elapsed_secs, summary.achieved_bpm, summary.time_signature
        );
    }

    ExitCode::SUCCESS
}
