use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use note_overlay_core::{
    analysis::sine_block, classify_note, AppConfig, ControlChange, NoteClassifier, ParameterBus,
    ParameterEvent, PitchMonitor, PitchReading, Sample, TextOverlay,
};
use note_overlay_core::glam::{Mat4, Quat, Vec3};
use tracing_subscriber::EnvFilter;

fn main() -> note_overlay_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Classify {
            frequency,
            amplitude,
        } => run_classify(&config, frequency, amplitude),
        Commands::Track { input } => run_track(&config, &input),
        Commands::Tone {
            frequency,
            amplitude,
            control,
        } => run_tone(&config, frequency, amplitude, &control),
        Commands::Follow {
            x,
            y,
            z,
            yaw_degrees,
            frames,
        } => run_follow(&config, Vec3::new(x, y, z), yaw_degrees, frames),
    }
}

fn run_classify(
    config: &AppConfig,
    frequency: f32,
    amplitude: f32,
) -> note_overlay_core::Result<()> {
    let classifier = NoteClassifier::new(config.classifier);
    let label = classifier.classify(Sample::new(frequency, amplitude));
    tracing::debug!(frequency, amplitude, %label, "classified sample");
    println!("{label}");
    Ok(())
}

fn run_track(config: &AppConfig, input: &PathBuf) -> note_overlay_core::Result<()> {
    tracing::info!(?input, "classifying sample stream");
    let json = std::fs::read_to_string(input)?;
    let samples: Vec<(f32, f32)> = serde_json::from_str(&json)?;

    let bus = ParameterBus::new();
    let events = bus.subscribe()?;
    let monitor = PitchMonitor::new(config, bus);
    for (frequency, amplitude) in samples {
        let reading = monitor.push_sample(Sample::new(frequency, amplitude))?;
        println!("{}", reading.label);
    }

    let changes = events
        .try_iter()
        .filter(|event| matches!(event, ParameterEvent::Note(_)))
        .count();
    tracing::info!(changes, "finished sample stream");
    Ok(())
}

fn run_tone(
    config: &AppConfig,
    frequency: f32,
    amplitude: f32,
    controls: &[ControlChange],
) -> note_overlay_core::Result<()> {
    let (reading, overlay, rebuilds) = analyse_tone(config, frequency, amplitude, controls)?;

    tracing::info!(
        expected = %classify_note(frequency, amplitude),
        detected = %reading.label,
        rebuilds,
        "analysed synthetic tone"
    );
    println!("{}", serde_json::to_string_pretty(&reading)?);
    println!("{}", serde_json::to_string_pretty(overlay.mesh())?);
    println!("{}", serde_json::to_string_pretty(overlay.material())?);
    Ok(())
}

/// Runs one synthetic block through the monitor, publishes the control
/// changes on the same bus and feeds everything into a fresh overlay.
fn analyse_tone(
    config: &AppConfig,
    frequency: f32,
    amplitude: f32,
    controls: &[ControlChange],
) -> note_overlay_core::Result<(PitchReading, TextOverlay, usize)> {
    let block = sine_block(
        frequency,
        amplitude,
        config.audio.sample_rate,
        config.audio.block_size,
    );

    let bus = ParameterBus::new();
    let events = bus.subscribe()?;
    let monitor = PitchMonitor::new(config, bus);
    let mut overlay = TextOverlay::new(config);

    let reading = monitor.push_samples(&block)?;
    for control in controls {
        monitor.bus().publish((*control).into())?;
    }
    let rebuilds = events
        .try_iter()
        .filter(|event| overlay.apply(*event))
        .count();
    Ok((reading, overlay, rebuilds))
}

fn parse_control(value: &str) -> Result<ControlChange, String> {
    serde_json::from_str(value).map_err(|err| format!("invalid control change: {err}"))
}

fn run_follow(
    config: &AppConfig,
    position: Vec3,
    yaw_degrees: f32,
    frames: u32,
) -> note_overlay_core::Result<()> {
    tracing::info!(?position, yaw_degrees, frames, "following fixed target");
    let mut overlay = TextOverlay::new(config);
    let target = Mat4::from_rotation_translation(
        Quat::from_rotation_y(yaw_degrees.to_radians()),
        position,
    );

    let frame_time = Duration::from_secs_f32(1.0 / 60.0);
    for frame in 0..frames {
        let pose = overlay.follow(target, frame_time);
        let line = serde_json::json!({ "frame": frame, "pose": pose });
        println!("{line}");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Note name overlay driven by pitch and face tracking", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the note name for a single frequency/amplitude reading.
    Classify {
        /// Fundamental frequency in Hz.
        frequency: f32,
        /// Linear amplitude of the reading.
        amplitude: f32,
    },
    /// Classify a JSON array of `[frequency, amplitude]` pairs, one label per line.
    Track {
        /// Path to the JSON sample file.
        input: PathBuf,
    },
    /// Synthesise a sine tone, run it through the pitch tracker and show the
    /// resulting reading and text mesh.
    Tone {
        #[arg(short, long, default_value_t = 440.0)]
        frequency: f32,
        #[arg(short, long, default_value_t = 0.5)]
        amplitude: f32,
        /// Control change applied after the tone, as JSON such as
        /// `{"parameter": "font_size", "value": 0.2}`. Repeatable.
        #[arg(long, value_parser = parse_control)]
        control: Vec<ControlChange>,
    },
    /// Smooth the overlay toward a fixed tracked transform and print one pose
    /// per frame.
    Follow {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f32,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f32,
        #[arg(long, default_value_t = -0.5, allow_hyphen_values = true)]
        z: f32,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        yaw_degrees: f32,
        #[arg(short = 'n', long, default_value_t = 30)]
        frames: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use note_overlay_core::Rgba;

    #[test]
    fn tone_accepts_repeated_control_changes() {
        let cli = Cli::try_parse_from([
            "note-overlay",
            "tone",
            "--control",
            r#"{ "parameter": "font_size", "value": 0.2 }"#,
            "--control",
            r#"{ "parameter": "metallic", "value": 0.9 }"#,
        ])
        .unwrap();

        let Commands::Tone { control, .. } = cli.command else {
            panic!("expected the tone subcommand");
        };
        assert_eq!(control, vec![ControlChange::FontSize(0.2), ControlChange::Metallic(0.9)]);
    }

    #[test]
    fn rejects_malformed_control_changes() {
        let result = Cli::try_parse_from([
            "note-overlay",
            "tone",
            "--control",
            r#"{ "parameter": "brightness", "value": 1.0 }"#,
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn control_changes_reach_the_overlay() {
        let config = AppConfig::default();
        let controls = [
            ControlChange::Color(Rgba::new(0.0, 1.0, 0.0, 1.0)),
            ControlChange::FontSize(0.2),
        ];

        let (reading, overlay, rebuilds) = analyse_tone(&config, 440.0, 0.5, &controls).unwrap();

        assert_eq!(reading.label.to_string(), "A4");
        assert_eq!(overlay.mesh().text.to_string(), "A4");
        assert_eq!(overlay.mesh().font_size, 0.2);
        assert_eq!(overlay.material().base_color.green, 1.0);
        assert!(rebuilds >= 2);
    }
}
