mod analysis;
mod decode;
mod features;

pub use analysis::{AnalysisStrategy, OfflineAnalyzer};
pub use features::{AudioFeatureSample, AudioStats};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest audio file accepted by default, in bytes.
pub const DEFAULT_MAX_AUDIO_BYTES: u64 = 100 * 1024 * 1024;

/// Extensions the decoder is expected to handle.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "webm", "mp4", "m4a", "aac"];

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("audio file is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("{0} audio input is not implemented")]
    NotImplemented(&'static str),
    #[error("failed to decode audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the audio comes from. Only local files are decodable today; the
/// other variants are reserved for capture paths and fail with a typed error.
#[derive(Clone, Debug)]
pub enum AudioSource {
    File(PathBuf),
    Url(String),
    Microphone,
}

impl AudioSource {
    pub fn load(&self) -> Result<LoadedAudio, AudioError> {
        self.load_with_limit(DEFAULT_MAX_AUDIO_BYTES)
    }

    /// Load, rejecting files larger than `max_bytes` before any decode work.
    pub fn load_with_limit(&self, max_bytes: u64) -> Result<LoadedAudio, AudioError> {
        match self {
            AudioSource::File(path) => load_file(path, max_bytes),
            AudioSource::Url(_) => Err(AudioError::NotImplemented("url")),
            AudioSource::Microphone => Err(AudioError::NotImplemented("microphone")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AudioMetadata {
    /// Track length in seconds
    pub duration: f32,
    /// Title from container tags, or the file stem when untagged
    pub title: Option<String>,
    /// Lowercased source extension, e.g. "mp3"
    pub format: String,
    /// Original file path, when the source was a file
    pub path: Option<PathBuf>,
}

/// Decoded mono audio plus where it came from.
#[derive(Debug)]
pub struct LoadedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub metadata: AudioMetadata,
}

impl LoadedAudio {
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

fn load_file(path: &Path, max_bytes: u64) -> Result<LoadedAudio, AudioError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AudioError::UnsupportedFormat(format!(
            "unrecognized extension '{ext}' on {}",
            path.display()
        )));
    }

    let file_meta = std::fs::metadata(path).map_err(|source| AudioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if file_meta.len() > max_bytes {
        return Err(AudioError::TooLarge {
            size: file_meta.len(),
            limit: max_bytes,
        });
    }

    let decoded = decode::decode_audio(path)?;
    let duration = if decoded.sample_rate == 0 {
        0.0
    } else {
        decoded.samples.len() as f32 / decoded.sample_rate as f32
    };
    let title = decoded.title.or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    });

    Ok(LoadedAudio {
        samples: decoded.samples,
        sample_rate: decoded.sample_rate,
        metadata: AudioMetadata {
            duration,
            title,
            format: ext,
            path: Some(path.to_path_buf()),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_extension() {
        let err = AudioSource::File(PathBuf::from("clip.txt"))
            .load()
            .unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedFormat(_)));
    }

    #[test]
    fn url_and_microphone_are_not_implemented() {
        assert!(matches!(
            AudioSource::Url("https://example.com/a.mp3".into()).load(),
            Err(AudioError::NotImplemented("url"))
        ));
        assert!(matches!(
            AudioSource::Microphone.load(),
            Err(AudioError::NotImplemented("microphone"))
        ));
    }

    #[test]
    fn oversized_files_are_rejected_before_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, [0u8; 32]).unwrap();

        let err = AudioSource::File(path).load_with_limit(16).unwrap_err();
        assert!(matches!(err, AudioError::TooLarge { size: 32, limit: 16 }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = AudioSource::File(PathBuf::from("/nonexistent/clip.mp3"))
            .load()
            .unwrap_err();
        assert!(matches!(err, AudioError::Io { .. }));
    }

    #[test]
    fn duration_derives_from_sample_count() {
        let audio = LoadedAudio {
            samples: vec![0.0; 8000],
            sample_rate: 4000,
            metadata: AudioMetadata {
                duration: 2.0,
                title: None,
                format: "wav".into(),
                path: None,
            },
        };
        assert!((audio.duration() - 2.0).abs() < 1e-6);
    }
}
