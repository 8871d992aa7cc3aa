use thiserror::Error;
use tk_audio::AudioError;
use tk_engine::EngineError;

/// Errors surfaced by the controller.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("score parse error: {0}")]
    ScoreParse(#[from] toml::de::Error),
    #[error("invalid score: {0}")]
    InvalidScore(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}
