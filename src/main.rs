//! Bubbler headless driver
//!
//! Feeds a synthetic scene (a static backdrop with an actor swaying across
//! it) through the pipeline and logs the HUD. Camera capture and display
//! windows are left to real hosts.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use glam::IVec2;
use image::Rgb;

use bubbler::raster::draw;
use bubbler::{Bubbler, Frame, KeyCommand, Settings};

#[derive(Parser, Debug)]
#[command(name = "bubbler")]
#[command(about = "Pop bubbles by moving: motion-reactive game pipeline driven by a synthetic scene")]
struct Args {
    /// Short countdowns and delays (also applied over a settings file)
    #[arg(long)]
    debug: bool,

    /// Detect motion and run effects only, never start a game
    #[arg(long)]
    video_only: bool,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 900)]
    ticks: u64,

    /// RNG seed (overrides the settings file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON settings file; missing fields take their defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_settings: bool,

    /// Scripted key presses as KEY@TICK, e.g. `1@30,s@90,q@600`
    #[arg(short, long, value_delimiter = ',')]
    keys: Vec<String>,
}

/// A key press at a given tick
#[derive(Debug, Clone, Copy)]
struct ScriptedKey {
    tick: u64,
    command: KeyCommand,
}

fn parse_key(arg: &str) -> Result<ScriptedKey> {
    let Some((key, tick)) = arg.split_once('@') else {
        bail!("expected KEY@TICK, got {arg:?}");
    };
    let code = match key {
        "esc" => KeyCommand::ESCAPE,
        _ => {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c as u32,
                _ => bail!("key must be a single character or `esc`, got {key:?}"),
            }
        }
    };
    let command = KeyCommand::from_key(code).with_context(|| format!("unmapped key {key:?}"))?;
    let tick = tick
        .parse()
        .with_context(|| format!("bad tick in {arg:?}"))?;
    Ok(ScriptedKey { tick, command })
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing settings from {}", path.display()))?
        }
        None => Settings::default(),
    };
    if args.debug {
        settings = settings.with_debug_timing();
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if args.video_only {
        settings.video_only = true;
    }
    if settings.frame_width == 0 || settings.frame_height == 0 {
        bail!(
            "frame size must be non-zero, got {}x{}",
            settings.frame_width,
            settings.frame_height
        );
    }
    Ok(settings)
}

/// Backdrop plus an actor that sways left and right in the lower half
struct SyntheticScene {
    backdrop: Frame,
    period: u64,
}

impl SyntheticScene {
    fn new(settings: &Settings) -> Self {
        let (w, h) = settings.frame_size();
        let backdrop = Frame::from_fn(w, h, |x, y| {
            let shade = (40 + (x * 60 / w.max(1)) + (y * 40 / h.max(1))) as u8;
            Rgb([shade, shade.saturating_add(10), shade.saturating_add(20)])
        });
        Self {
            backdrop,
            period: settings.ticks_for_secs(4).max(2),
        }
    }

    fn frame(&self, tick: u64) -> Frame {
        let mut frame = self.backdrop.clone();
        let (w, h) = (frame.width() as i32, frame.height() as i32);
        let unit = (h / 12).max(2);

        // Triangle wave across the middle of the frame
        let phase = tick % self.period;
        let half = self.period / 2;
        let t = if phase < half { phase } else { self.period - phase };
        let x = w / 4 + (t as i32 * (w / 2)) / half.max(1) as i32;

        let skin = Rgb([230, 190, 160]);
        let shirt = Rgb([200, 40, 60]);
        draw::fill_circle(&mut frame, IVec2::new(x, h / 2), unit, skin);
        for row in 0..4 {
            let top = h / 2 + unit + row * 2 * unit;
            draw::fill_square(&mut frame, IVec2::new(x - unit, top), 2 * unit, shirt);
        }
        frame
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = load_settings(&args)?;

    if args.print_settings {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let mut script = args
        .keys
        .iter()
        .map(|k| parse_key(k))
        .collect::<Result<Vec<_>>>()?;
    script.sort_by_key(|k| k.tick);

    log::info!("Bubbler (headless) starting, {} ticks", args.ticks);
    let scene = SyntheticScene::new(&settings);
    let report_every = settings.ticks_for_secs(1);
    let mut bubbler = Bubbler::new(settings);
    let mut last_hud = bubbler.hud();

    for tick in 1..=args.ticks {
        for key in script.iter().filter(|k| k.tick == tick) {
            log::info!("key {:?} at tick {tick}", key.command);
            bubbler.on_key(key.command);
        }
        if bubbler.should_quit() {
            break;
        }

        let out = bubbler.tick(scene.frame(tick));
        last_hud = out.hud;
        if tick % report_every == 0 {
            log::info!("tick {tick}: {}", serde_json::to_string(&out.hud)?);
        }
    }

    println!("{}", serde_json::to_string(&last_hud)?);
    Ok(())
}
