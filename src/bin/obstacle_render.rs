//! Obstacle offline renderer
//!
//! Renders the song to a WAV file, optionally with the MIDI it played.
//!
//! # Usage
//!
//! ```bash
//! obstacle-render out.wav
//! obstacle-render out.wav --bars 16 --bpm 124 --swing 0.12
//! obstacle-render out.wav --state session.bin --midi out.mid
//! obstacle-render out.wav --randomize --seed 7 --set cutoff=2400 --set lead_mute=1
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use obstacle_core::config::EngineConfig;
use obstacle_core::dsp::renderer;
use obstacle_core::params::ParamValues;
use obstacle_core::persist;
use obstacle_core::state::SharedState;

#[derive(Parser)]
#[command(name = "obstacle-render")]
#[command(author, version, about = "Render an Obstacle session to audio")]
struct Args {
    /// Output WAV file
    output: PathBuf,

    /// Number of bars to play before the tail
    #[arg(long, short = 'b', default_value = "8")]
    bars: u32,

    /// Output sample rate in Hz
    #[arg(long, short = 'r', default_value = "44100")]
    sample_rate: u32,

    /// Saved session to load before rendering
    #[arg(long)]
    state: Option<PathBuf>,

    /// Tempo override
    #[arg(long)]
    bpm: Option<f32>,

    /// Swing override (0.0 - 0.3)
    #[arg(long)]
    swing: Option<f32>,

    /// Extra parameters as name=value, e.g. `--set reverb=0.7`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Replace pattern A with a random groove
    #[arg(long)]
    randomize: bool,

    /// Seed for noise and the randomizer
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the effect tail at the end
    #[arg(long)]
    no_tail: bool,

    /// Also write the played MIDI as a Standard MIDI File
    #[arg(long)]
    midi: Option<PathBuf>,
}

fn parse_assignment(s: &str) -> Result<(&str, f32)> {
    let Some((name, value)) = s.split_once('=') else {
        bail!("expected NAME=VALUE, got '{s}'");
    };
    let value = value
        .trim()
        .parse::<f32>()
        .with_context(|| format!("bad value for '{name}'"))?;
    Ok((name.trim(), value))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = EngineConfig::with_sample_rate(args.sample_rate as f32);
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let state = Arc::new(SharedState::new(ParamValues::default(), config.seed));

    if let Some(path) = &args.state {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        persist::load_state(&state, &bytes)
            .with_context(|| format!("loading session from {}", path.display()))?;
    }
    if args.randomize {
        state.select_edit_pattern(0);
        state.randomize_edit_pattern();
    }
    if let Some(bpm) = args.bpm {
        state.set_parameter("bpm", bpm)?;
    }
    if let Some(swing) = args.swing {
        state.set_parameter("swing", swing)?;
    }
    for assignment in &args.set {
        let (name, value) = parse_assignment(assignment)?;
        state.set_parameter(name, value)?;
    }

    let render = renderer::render(config, Arc::clone(&state), args.bars, !args.no_tail)?;
    let wav = render.to_wav();
    fs::write(&args.output, &wav).with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        "wrote {} ({} frames, {:.1} s)",
        args.output.display(),
        render.frames(),
        render.frames() as f32 / render.sample_rate as f32
    );

    if let Some(path) = &args.midi {
        let smf = render.to_smf()?;
        fs::write(path, &smf).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {} ({} events)", path.display(), render.midi.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_parse() {
        assert_eq!(parse_assignment("reverb=0.7").unwrap(), ("reverb", 0.7));
        assert_eq!(parse_assignment(" key = -3 ").unwrap(), ("key", -3.0));
        assert!(parse_assignment("reverb").is_err());
        assert!(parse_assignment("reverb=lots").is_err());
    }
}
