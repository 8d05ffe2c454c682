use thiserror::Error;

/// All errors produced by ambidec-core.
#[derive(Debug, Error)]
pub enum AmbidecError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default output device found")]
    NoDefaultOutputDevice,

    #[error("not enough channels for the selected decoder: need {needed}, clip has {got}")]
    InsufficientChannels { needed: usize, got: usize },

    #[error("FuMa channel ordering is only defined up to first order (requested N = {0})")]
    FumaUnsupportedOrder(u32),

    #[error("unknown {kind} identifier: {value:?}")]
    UnknownIdentifier { kind: &'static str, value: String },

    #[error("invalid loudspeaker geometry: {0}")]
    InvalidGeometry(String),

    #[error("loudspeaker layout {name:?} not found in mapping file")]
    LayoutNotFound { name: String },

    #[error("unsupported clip format: {0}")]
    UnsupportedClip(String),

    #[error("playback is already active")]
    AlreadyPlaying,

    #[error("playback is not active")]
    NotPlaying,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("mapping file error: {0}")]
    MappingFile(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AmbidecError>;
