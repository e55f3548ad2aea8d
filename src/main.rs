//! Desktop Havoc headless driver
//!
//! Plays a scripted endless session against the real clock and prints the
//! high-score table. Usage: `desktop-havoc [seconds] [config.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use desktop_havoc::{HighScores, ScoreSink};
    use desktop_havoc::sim::{Engine, GameMode, MonotonicClock, SessionEvent, Tool};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seconds: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(5.0);
    let config = match args.next() {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{path}: {err}");
                std::process::exit(1);
            }
        },
        None => desktop_havoc::EngineConfig::default(),
    };

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut engine = match Engine::new(config, Rc::new(MonotonicClock::new()), seed) {
        Ok(engine) => engine,
        Err(err) => {
            log::error!("invalid config: {err}");
            std::process::exit(1);
        }
    };

    let scores = Rc::new(RefCell::new(HighScores::new()));
    let sink: Rc<RefCell<dyn ScoreSink>> = scores.clone();
    engine.set_score_sink(Some(sink));
    engine.set_mode(GameMode::Endless);
    engine.start_session();
    log::info!("Desktop Havoc (headless) running for {seconds:.1}s, seed {seed}");

    let frame = Duration::from_secs_f64(engine.scheduler().frame_interval_ms() / 1000.0);
    let mut tool_index = 0;
    let mut ticks = 0u64;
    while engine.scheduler().total_ms() < seconds * 1000.0 {
        if engine.pump() {
            ticks += 1;
            // Swing at the first pest every 15 ticks, cycling through the tools
            if ticks % 15 == 0 {
                if let Some(target) = engine.pests().first().map(|p| p.pos) {
                    let tool = Tool::ALL[tool_index % Tool::ALL.len()];
                    tool_index += 1;
                    engine.click(target, tool);
                }
            }
            for event in engine.drain_events() {
                if let SessionEvent::WaveAdvanced { wave, quota } = event {
                    log::info!("wave {wave}: {quota} pests, score {}", engine.score());
                }
            }
        }
        std::thread::sleep(frame / 4);
    }
    engine.end_session();

    println!("\nHigh scores");
    for (rank, entry) in scores.borrow().entries.iter().enumerate() {
        println!(
            "{:>2}. {:>5}  wave {:>3}  {:.1}s",
            rank + 1,
            entry.score,
            entry.wave,
            entry.elapsed_ms / 1000.0
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn load_config(path: &str) -> Result<desktop_havoc::EngineConfig, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(desktop_havoc::EngineConfig::from_json(&json)?)
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The engine is embedded by a host; there is no standalone wasm entry point
}
