//! Ring Fall - headless entry point
//!
//! Plays every level of a catalog with the scripted player and logs how each
//! run went. Progress (best score, current level) persists between runs.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use ring_fall::audio::{AudioPlayer, AudioSink};
use ring_fall::persistence::Persistence;
use ring_fall::{Autopilot, LevelCatalog, Run, Scene, Tuning};

/// Play each level once, carrying the store and audio between runs
fn play_catalog<P, A>(catalog: &LevelCatalog, tuning: &Tuning, mut store: P, mut audio: A, seed: u64) -> (P, A)
where
    P: Persistence,
    A: AudioSink,
{
    for attempt in 0..catalog.levels.len().max(1) as u64 {
        let mut run = Run::start(catalog, tuning.clone(), Scene::new(), store, audio, seed.wrapping_add(attempt));
        let level = run.level_index() + 1;
        let outcome = Autopilot::default().play(&mut run);
        log::info!(
            "Level {}: {:?} after {} steps, {} layers passed ({}%), score {} (best {})",
            level,
            outcome.phase,
            outcome.steps,
            outcome.progress.layers_passed,
            outcome.percent,
            outcome.progress.score,
            outcome.progress.best_score
        );
        let (_, s, a) = run.into_parts();
        store = s;
        audio = a;
    }
    (store, audio)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    use ring_fall::consts::STORAGE_PREFIX;
    use ring_fall::persistence::LocalStorageStore;

    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

    let seed = js_sys::Date::now() as u64;
    log::info!("Ring Fall (web) starting with seed: {}", seed);
    play_catalog(
        &LevelCatalog::builtin(),
        &Tuning::default(),
        LocalStorageStore::new(STORAGE_PREFIX),
        AudioPlayer::from_tuning(&Tuning::default()),
        seed,
    );
}

/// Read and parse a JSON file, exiting with a logged error on failure
#[cfg(not(target_arch = "wasm32"))]
fn load_json<T>(what: &str, path: &str, parse: impl FnOnce(&str) -> Result<T, serde_json::Error>) -> T {
    let loaded = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| parse(&json).map_err(|e| e.to_string()));
    match loaded {
        Ok(value) => value,
        Err(e) => {
            log::error!("Failed to load {} {}: {}", what, path, e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use ring_fall::consts::{DEFAULT_SEED, SAVE_FILE};
    use ring_fall::persistence::JsonFileStore;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Usage: ring-fall [catalog.json] [seed] [tuning.json]
    let mut args = std::env::args().skip(1);
    let catalog = args
        .next()
        .filter(|path| path != "-")
        .map(|path| load_json("catalog", &path, LevelCatalog::from_json))
        .unwrap_or_else(LevelCatalog::builtin);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_SEED);
    let tuning = args
        .next()
        .map(|path| load_json("tuning", &path, Tuning::from_json))
        .unwrap_or_default();

    log::info!("Ring Fall (native) starting with seed: {}", seed);
    let store = JsonFileStore::open_or_default(SAVE_FILE);
    log::info!("Progress is saved to {}", store.path().display());
    let (_, audio) = play_catalog(&catalog, &tuning, store, AudioPlayer::from_tuning(&tuning), seed);
    log::info!("{} cues played", audio.total());
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
