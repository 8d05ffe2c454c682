//! Real-time playback driver via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal output callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Block on a mutex or condvar held for unbounded durations
//! - Perform I/O
//! - Miss the block deadline — there is no retry for an underrun
//!
//! The callback therefore owns its [`BlockRenderer`] (clip + decoder)
//! exclusively. Decoder reconfiguration happens on the control thread:
//! a complete new decoder (matrix fully rebuilt) arrives over a channel and
//! is swapped in with a non-blocking `try_recv` at the top of a block, so
//! the callback observes either the whole old or the whole new decoder.
//!
//! The playback cursor is written only by the callback. Control-side resets
//! happen in `stop()`, after the stream is paused and callbacks have ceased.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `Player` therefore must be created and dropped on the same thread.

pub mod device;
pub mod render;

pub use render::{BlockOutcome, BlockRenderer};

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleRate, Stream, StreamConfig,
};

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

use crate::{
    clip::AudioClip,
    decoder::Decoder,
    error::{AmbidecError, Result},
};

/// Transport state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Stream open, cursor at zero, not running.
    Stopped,
    /// Callbacks are consuming the clip.
    Playing,
    /// Stream paused mid-clip; cursor holds its position.
    Paused,
    /// The clip ran out — normal termination, cursor at the clip end.
    Finished,
}

/// Handle to an open output stream playing one clip through one decoder.
///
/// **Not `Send`** — `cpal::Stream` is bound to its creation thread on
/// Windows/macOS. Create, control and drop this type on the same OS thread.
pub struct Player {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Callback renders audio while `true`; cleared at end of clip.
    running: Arc<AtomicBool>,
    /// Set by the callback when the clip is exhausted.
    finished: Arc<AtomicBool>,
    /// Read offset into the clip. Written only by the callback; reset by
    /// `stop()` after the stream is halted.
    cursor: Arc<AtomicUsize>,
    /// Control-side transport state.
    state: Arc<Mutex<PlaybackState>>,
    /// Hands freshly built decoders to the callback.
    decoder_tx: Sender<Decoder>,
    /// Output channel count actually configured on the device.
    output_channels: usize,
    /// Stream sample rate (the clip's rate).
    pub sample_rate: u32,
}

impl Player {
    /// Open an output stream on the preferred device (matched as a name
    /// substring, like [`device::list_output_devices`] consumers do),
    /// falling back to the default output device and then the first
    /// available one.
    ///
    /// The stream runs at the clip's sample rate (sample-rate conversion is
    /// out of scope). `output_channels` defaults to the device's own channel
    /// count and is clamped to it when requested higher.
    ///
    /// The stream starts paused; call [`play`](Self::play).
    ///
    /// # Errors
    /// `NoDefaultOutputDevice` when no output device exists, or
    /// `AudioDevice`/`AudioStream` when cpal rejects the configuration
    /// (e.g. an unsupported sample rate).
    #[cfg(feature = "audio-cpal")]
    pub fn open(
        clip: Arc<AudioClip>,
        decoder: Decoder,
        preferred_device_name: Option<&str>,
        output_channels: Option<usize>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let mut selected_device = None;

        if let Some(preferred_name) = preferred_device_name {
            match host.output_devices() {
                Ok(mut devices) => {
                    selected_device = devices.find(|dev| {
                        dev.name()
                            .map(|name| device::name_matches(&name, preferred_name))
                            .unwrap_or(false)
                    });
                    if selected_device.is_none() {
                        warn!(
                            "preferred output device '{}' not found, falling back",
                            preferred_name
                        );
                    }
                }
                Err(e) => {
                    warn!("failed to list output devices while resolving preference: {e}");
                }
            }
        }

        let device = if let Some(device) = selected_device {
            device
        } else if let Some(default) = host.default_output_device() {
            default
        } else {
            let mut devices = host
                .output_devices()
                .map_err(|e| AmbidecError::AudioDevice(e.to_string()))?;
            let fallback = devices.next().ok_or(AmbidecError::NoDefaultOutputDevice)?;
            warn!("no default output device, falling back to first available output");
            fallback
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening output device"
        );

        let supported = device
            .default_output_config()
            .map_err(|e| AmbidecError::AudioDevice(e.to_string()))?;
        let device_channels = usize::from(supported.channels());

        let requested = output_channels.unwrap_or(device_channels);
        let channels = if requested > device_channels {
            warn!(
                requested,
                device_channels, "requested more output channels than the device offers"
            );
            device_channels
        } else {
            requested.max(1)
        };

        let sample_rate = clip.sample_rate();
        info!(sample_rate, channels, "output config selected");

        let config = StreamConfig {
            channels: channels as u16,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let running = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let cursor = Arc::new(AtomicUsize::new(0));
        let (decoder_tx, decoder_rx) = crossbeam_channel::unbounded::<Decoder>();

        let renderer = BlockRenderer::new(clip, decoder, channels);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_output_stream::<f32>(
                &device,
                &config,
                renderer,
                decoder_rx,
                Arc::clone(&running),
                Arc::clone(&finished),
                Arc::clone(&cursor),
            ),
            cpal::SampleFormat::I16 => build_output_stream::<i16>(
                &device,
                &config,
                renderer,
                decoder_rx,
                Arc::clone(&running),
                Arc::clone(&finished),
                Arc::clone(&cursor),
            ),
            cpal::SampleFormat::U16 => build_output_stream::<u16>(
                &device,
                &config,
                renderer,
                decoder_rx,
                Arc::clone(&running),
                Arc::clone(&finished),
                Arc::clone(&cursor),
            ),
            fmt => {
                return Err(AmbidecError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| AmbidecError::AudioStream(e.to_string()))?;

        // Streams start playing on some hosts; hold until play() is called.
        stream
            .pause()
            .map_err(|e| AmbidecError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            finished,
            cursor,
            state: Arc::new(Mutex::new(PlaybackState::Stopped)),
            decoder_tx,
            output_channels: channels,
            sample_rate,
        })
    }

    /// Start (or resume) playback.
    #[cfg(feature = "audio-cpal")]
    pub fn play(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(AmbidecError::AlreadyPlaying);
        }
        self.finished.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        self._stream
            .play()
            .map_err(|e| AmbidecError::AudioStream(e.to_string()))?;
        *self.state.lock() = PlaybackState::Playing;
        info!("playback started");
        Ok(())
    }

    /// Pause playback, keeping the cursor where it is.
    #[cfg(feature = "audio-cpal")]
    pub fn pause(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(AmbidecError::NotPlaying);
        }
        self._stream
            .pause()
            .map_err(|e| AmbidecError::AudioStream(e.to_string()))?;
        self.running.store(false, Ordering::SeqCst);
        *self.state.lock() = PlaybackState::Paused;
        Ok(())
    }

    /// Stop playback and rewind.
    ///
    /// Pauses the stream first — callbacks have ceased by the time the
    /// cursor is reset, so the callback never races the reset.
    #[cfg(feature = "audio-cpal")]
    pub fn stop(&self) -> Result<()> {
        self._stream
            .pause()
            .map_err(|e| AmbidecError::AudioStream(e.to_string()))?;
        self.running.store(false, Ordering::SeqCst);
        self.finished.store(false, Ordering::SeqCst);
        self.cursor.store(0, Ordering::SeqCst);
        *self.state.lock() = PlaybackState::Stopped;
        info!("playback stopped");
        Ok(())
    }

    /// Atomically publish a new decoder to the callback.
    ///
    /// The decoder (and its decoding matrix) must already be fully built;
    /// the callback picks it up at the start of its next block. Publishing
    /// twice before a block boundary keeps only the newest decoder.
    pub fn swap_decoder(&self, decoder: Decoder) {
        let _ = self.decoder_tx.send(decoder);
    }

    /// Current read offset into the clip, in frames.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Transport state snapshot.
    pub fn state(&self) -> PlaybackState {
        if self.finished.load(Ordering::SeqCst) {
            PlaybackState::Finished
        } else {
            *self.state.lock()
        }
    }

    /// True once the callback has exhausted the clip.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }
}

/// Build the typed output stream. The renderer fills an f32 scratch buffer
/// (reused across callbacks, grown once) and each sample is converted to the
/// device format on the way out.
#[cfg(feature = "audio-cpal")]
#[allow(clippy::too_many_arguments)]
fn build_output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: BlockRenderer,
    decoder_rx: crossbeam_channel::Receiver<Decoder>,
    running: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    cursor: Arc<AtomicUsize>,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _info| {
            // Swap in any fully-built decoder published since the last block.
            while let Ok(next) = decoder_rx.try_recv() {
                renderer.set_decoder(next);
            }

            if !running.load(Ordering::Acquire) {
                data.fill(T::from_sample(0.0f32));
                return;
            }

            scratch.resize(data.len(), 0.0);
            let start = cursor.load(Ordering::Relaxed);
            let outcome = renderer.render(start, &mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }

            cursor.store(start + outcome.frames_consumed, Ordering::Relaxed);
            if outcome.end_of_clip {
                // Normal termination: silence from here on, no more decoding.
                running.store(false, Ordering::Release);
                finished.store(true, Ordering::Release);
            }
        },
        |err| error!("audio stream error: {err}"),
        None,
    )
}

/// Stubs when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl Player {
    pub fn open(
        _clip: Arc<AudioClip>,
        _decoder: Decoder,
        _preferred_device_name: Option<&str>,
        _output_channels: Option<usize>,
    ) -> Result<Self> {
        Err(AmbidecError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }

    pub fn play(&self) -> Result<()> {
        Err(AmbidecError::NotPlaying)
    }

    pub fn pause(&self) -> Result<()> {
        Err(AmbidecError::NotPlaying)
    }

    pub fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.cursor.store(0, Ordering::SeqCst);
        *self.state.lock() = PlaybackState::Stopped;
        Ok(())
    }
}
