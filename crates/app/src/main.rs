use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use spectrum_arcade_core::analysis::reference_signal;
use spectrum_arcade_core::consts::{FFT_LEN, SPECTRUM_LEN};
use spectrum_arcade_core::{
    AppConfig, Angles, AudioEngine, AudioSource, DrawList, PlayerInput, Scene, SpectrumAnalyzer,
    TickPacer, ToneSource, WavSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> spectrum_arcade_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            wav,
            tone,
            config,
            ticks,
        } => run_play(wav.as_deref(), tone, config.as_deref(), ticks),
        Commands::Calibrate => run_calibrate(),
    }
}

fn run_play(
    wav: Option<&Path>,
    tone: Option<f32>,
    config: Option<&Path>,
    ticks: Option<u64>,
) -> spectrum_arcade_core::Result<()> {
    let mut config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(hz) = tone {
        config.audio.tone_hz = hz;
    }
    if ticks.is_some() {
        config.sim.max_ticks = ticks;
    }
    config.validate()?;

    let source: Box<dyn AudioSource> = match wav {
        Some(path) => Box::new(WavSource::open(path)?),
        None => {
            tracing::info!(hz = config.audio.tone_hz, "playing test tone");
            Box::new(ToneSource::new(
                config.audio.tone_hz,
                config.audio.sample_rate,
                config.audio.channels,
                config.audio.seconds,
            ))
        }
    };

    let mut playback = AudioEngine::new(config.audio.buffer_frames).start(source)?;
    let shared = playback.shared().clone();
    let mut scene = Scene::new(Arc::new(Angles::new()), &config.sim, &config.spawner);
    let mut pacer = TickPacer::new(config.sim.tick_hz);
    let mut canvas = DrawList::new();
    let mut spawned = 0u64;

    tracing::info!(mode = ?config.spawner.mode, tick_hz = config.sim.tick_hz, "starting headless run");
    loop {
        if config.sim.max_ticks.is_some_and(|max| scene.ticks() >= max) {
            break;
        }
        if playback.is_finished() {
            break;
        }

        spawned += scene.tick(PlayerInput::default(), shared.spectrum()) as u64;
        canvas.clear();
        scene.draw(&mut canvas);
        scene.draw_hud(&mut canvas, shared.progress());

        if scene.ticks() % u64::from(config.sim.tick_hz) == 0 {
            let (channel, bin, power) = scene.spectrum().peak();
            tracing::info!(
                ticks = scene.ticks(),
                progress = shared.progress(),
                subs = scene.subs().len(),
                projectiles = scene.projectiles().len(),
                sparks = scene.sparks().len(),
                primitives = canvas.len(),
                peak_channel = channel,
                peak_bin = bin,
                peak_power = power,
                sleep_ms = pacer.sleep_time().as_secs_f64() * 1e3,
                "tick stats"
            );
        }
        pacer.wait();
    }

    playback.stop()?;
    scene.clear();
    tracing::info!(ticks = scene.ticks(), spawned, "run finished");
    Ok(())
}

fn run_calibrate() -> spectrum_arcade_core::Result<()> {
    let mut analyzer = SpectrumAnalyzer::new(FFT_LEN);
    let mut power = [0.0; SPECTRUM_LEN];
    analyzer.window_power(&reference_signal(), &mut power);

    let (bin, peak) = power
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, v)| if v > best.1 { (i, v) } else { best });
    println!("reference power: {}", analyzer.reference_power());
    println!("calibrated peak: {peak} at bin {bin}");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive arcade core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a track headless and log simulation stats.
    Play {
        /// WAV file to play instead of the test tone.
        #[arg(long, conflicts_with = "tone")]
        wav: Option<PathBuf>,
        /// Frequency of the test tone.
        #[arg(long)]
        tone: Option<f32>,
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Stop after this many ticks.
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Print the analyzer calibration.
    Calibrate,
}
