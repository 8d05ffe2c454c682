//! ambidec command-line host.
//!
//! Thin shim over `ambidec-core`: loads a WAV clip, builds the requested
//! decoder, opens the output stream and plays the clip to completion while
//! relaying advisories to the log. All the algorithmic work lives in the
//! core crate.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use ambidec_core::advisory::AdvisorySink;
use ambidec_core::clip::{max_order, AudioClip};
use ambidec_core::config::{ChannelOrdering, DecoderConfig, Normalization, Weighting};
use ambidec_core::decoder::{AmbisonicDecoder, Decoder, RawDecoder, UhjDecoder};
use ambidec_core::geometry::{mapping_names, Geometry};
use ambidec_core::playback::device::{list_output_devices, name_matches};
use ambidec_core::playback::Player;

/// How often the transport loop polls for completion and advisories.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DecoderKind {
    /// Leading clip channels straight to the device.
    Raw,
    /// First-order B-format to stereo UHJ.
    Uhj,
    /// Spherical-harmonic decode to a loudspeaker layout.
    Ambisonic,
}

#[derive(Debug, Parser)]
#[command(name = "ambidec", about = "Ambisonic clip player")]
struct Cli {
    /// WAV clip to play.
    clip: Option<PathBuf>,

    /// Decoder variant.
    #[arg(long, value_enum, default_value_t = DecoderKind::Raw)]
    decoder: DecoderKind,

    /// Ambisonic order N; defaults to the highest complete order the clip
    /// carries.
    #[arg(long)]
    order: Option<u32>,

    /// Loudspeaker mapping file (JSON, degrees).
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Layout name within the mapping file; defaults to the first one.
    #[arg(long)]
    layout: Option<String>,

    /// Channel ordering of the clip: acn or fuma.
    #[arg(long, default_value = "acn")]
    ordering: String,

    /// Weighting scheme: flat or maxre.
    #[arg(long, default_value = "flat")]
    weighting: String,

    /// Preferred output device name (substring of `--list-devices` output).
    #[arg(long)]
    device: Option<String>,

    /// Output channel count; defaults to the device's channel count.
    #[arg(long)]
    channels: Option<usize>,

    /// List output devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// List layouts in the mapping file and exit.
    #[arg(long)]
    list_layouts: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ambidec=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        for d in list_output_devices() {
            let marker = if d.is_default { "*" } else { " " };
            println!("{marker} {} ({} ch)", d.name, d.max_output_channels);
        }
        return Ok(());
    }

    if cli.list_layouts {
        let mapping = cli
            .mapping
            .as_deref()
            .context("--list-layouts requires --mapping")?;
        for name in mapping_names(mapping)? {
            println!("{name}");
        }
        return Ok(());
    }

    let clip_path = cli.clip.as_deref().context("no clip given")?;
    let clip = Arc::new(
        AudioClip::from_wav_path(clip_path)
            .with_context(|| format!("failed to load {}", clip_path.display()))?,
    );
    info!(
        frames = clip.frames(),
        channels = clip.channels(),
        sample_rate = clip.sample_rate(),
        duration_secs = format!("{:.2}", clip.duration_secs()).as_str(),
        "clip loaded"
    );

    let output_channels = resolve_output_channels(&cli)?;
    let (sink, advisories) = AdvisorySink::channel(64);

    let decoder = build_decoder(&cli, &clip, output_channels, sink)?;

    let player = Player::open(
        Arc::clone(&clip),
        decoder,
        cli.device.as_deref(),
        Some(output_channels),
    )?;

    player.play()?;
    info!("playing — Ctrl-C to abort");

    while !player.is_finished() {
        while let Ok(advisory) = advisories.try_recv() {
            warn!("{advisory}");
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    player.stop()?;
    info!("done");
    Ok(())
}

/// Output channel count: explicit flag, else the chosen device's own count.
fn resolve_output_channels(cli: &Cli) -> anyhow::Result<usize> {
    if let Some(n) = cli.channels {
        if n == 0 {
            bail!("--channels must be at least 1");
        }
        return Ok(n);
    }

    let devices = list_output_devices();
    let device = match &cli.device {
        Some(name) => devices
            .iter()
            .find(|d| name_matches(&d.name, name))
            .or_else(|| devices.iter().find(|d| d.is_default)),
        None => devices.iter().find(|d| d.is_default),
    }
    .or_else(|| devices.first());

    match device {
        Some(d) if d.max_output_channels > 0 => Ok(usize::from(d.max_output_channels)),
        _ => bail!("no usable output device found"),
    }
}

fn build_decoder(
    cli: &Cli,
    clip: &AudioClip,
    output_channels: usize,
    sink: AdvisorySink,
) -> anyhow::Result<Decoder> {
    let ordering: ChannelOrdering = cli.ordering.parse()?;

    match cli.decoder {
        DecoderKind::Raw => Ok(RawDecoder::new(output_channels).into()),
        DecoderKind::Uhj => {
            if clip.channels() < 4 {
                bail!(
                    "UHJ decoding needs a 4-channel B-format clip; this one has {}",
                    clip.channels()
                );
            }
            Ok(UhjDecoder::new(output_channels, ordering, sink).into())
        }
        DecoderKind::Ambisonic => {
            let highest = max_order(clip.channels())
                .context("clip has no channels to decode")?;
            let order = cli.order.unwrap_or(highest);
            if order > highest {
                bail!(
                    "clip supports at most order {highest} ({} channels), requested {order}",
                    clip.channels()
                );
            }

            let mapping = cli
                .mapping
                .as_deref()
                .context("ambisonic decoding requires --mapping")?;
            let layout = match &cli.layout {
                Some(name) => name.clone(),
                None => mapping_names(mapping)?
                    .into_iter()
                    .next()
                    .context("mapping file contains no layouts")?,
            };
            let geometry = Geometry::from_mapping_file(mapping, &layout)?;
            info!(layout = layout.as_str(), loudspeakers = geometry.len(), order, "geometry loaded");

            let weighting: Weighting = cli.weighting.parse()?;
            let config = DecoderConfig::new(order, ordering, Normalization::Sn3d, weighting)?;
            Ok(AmbisonicDecoder::new(output_channels, config, geometry, sink)?.into())
        }
    }
}
