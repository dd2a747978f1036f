//! Recorder settings
//!
//! `RecorderConfig` is the caller-facing shape: a common core plus field
//! groups that only some platform families understand. A platform resolves
//! it against its `RecorderProfile` into concrete `RecorderSettings`;
//! fields the platform does not honor are ignored rather than rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error when a setting name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {setting}: \"{input}\". Valid values are: {expected}")]
pub struct InvalidSettingError {
    pub setting: &'static str,
    pub input: String,
    pub expected: String,
}

macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $setting:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidSettingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| InvalidSettingError {
                        setting: $setting,
                        input: s.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

setting_enum! {
    /// Codec of the recorded stream
    AudioEncoding, "encoding" {
        Lpcm => "lpcm",
        Flac => "flac",
        Aac => "aac",
        Alac => "alac",
        Opus => "opus",
        Amr => "amr",
        Ulaw => "ulaw",
        Alaw => "alaw",
    }
}

setting_enum! {
    /// Encoder quality tier
    EncoderQuality, "quality" {
        Min => "min",
        Low => "low",
        Medium => "medium",
        High => "high",
        Max => "max",
    }
}

setting_enum! {
    /// Capture source on platforms that distinguish microphones
    InputSource, "input source" {
        Microphone => "microphone",
        Camcorder => "camcorder",
        VoiceRecognition => "voice_recognition",
        VoiceCommunication => "voice_communication",
        Unprocessed => "unprocessed",
    }
}

setting_enum! {
    /// Container on platforms that pick it separately from the codec
    OutputFormat, "output format" {
        Mpeg4 => "mpeg4",
        ThreeGpp => "three_gpp",
        AmrNb => "amr_nb",
        AmrWb => "amr_wb",
        AacAdts => "aac_adts",
        Webm => "webm",
        Ogg => "ogg",
    }
}

impl AudioEncoding {
    /// File extension of the container this encoding is stored in
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Lpcm | Self::Ulaw | Self::Alaw => "wav",
            Self::Flac => "flac",
            Self::Aac | Self::Alac => "m4a",
            Self::Opus => "ogg",
            Self::Amr => "3gp",
        }
    }
}

/// Tuning for uncompressed PCM output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearPcmOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub big_endian: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_interleaved: Option<bool>,
}

/// Caller-supplied recorder settings. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<AudioEncoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<EncoderQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linear_pcm: Option<LinearPcmOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_source: Option<InputSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
}

impl RecorderConfig {
    /// Merge with another config, where other takes precedence.
    pub fn merge(self, other: Self) -> Self {
        Self {
            sample_rate: other.sample_rate.or(self.sample_rate),
            channels: other.channels.or(self.channels),
            bit_rate: other.bit_rate.or(self.bit_rate),
            encoding: other.encoding.or(self.encoding),
            quality: other.quality.or(self.quality),
            linear_pcm: match (self.linear_pcm, other.linear_pcm) {
                (Some(b), Some(o)) => Some(LinearPcmOptions {
                    bit_depth: o.bit_depth.or(b.bit_depth),
                    big_endian: o.big_endian.or(b.big_endian),
                    float: o.float.or(b.float),
                    non_interleaved: o.non_interleaved.or(b.non_interleaved),
                }),
                (b, o) => o.or(b),
            },
            input_source: other.input_source.or(self.input_source),
            output_format: other.output_format.or(self.output_format),
        }
    }

    /// Fill gaps from the platform defaults and drop what it ignores.
    pub fn resolve(&self, profile: &RecorderProfile) -> RecorderSettings {
        let encoding = self
            .encoding
            .filter(|e| profile.encodings.contains(e))
            .unwrap_or(profile.default_encoding);
        let pcm = self.linear_pcm.filter(|_| profile.honors_linear_pcm).unwrap_or_default();

        RecorderSettings {
            sample_rate: self
                .sample_rate
                .filter(|rate| *rate > 0)
                .unwrap_or(profile.default_sample_rate),
            channels: self
                .channels
                .filter(|c| (1..=2).contains(c))
                .unwrap_or(profile.default_channels),
            bit_rate: self.bit_rate.filter(|rate| *rate > 0),
            encoding,
            quality: self.quality.unwrap_or(EncoderQuality::High),
            bit_depth: pcm.bit_depth.filter(|d| matches!(d, 8 | 16 | 24 | 32)).unwrap_or(16),
            float_samples: pcm.float.unwrap_or(false),
            input_source: self
                .input_source
                .filter(|_| profile.honors_input_source)
                .unwrap_or(InputSource::Microphone),
            output_format: self
                .output_format
                .filter(|_| profile.honors_output_format)
                .unwrap_or(OutputFormat::Mpeg4),
        }
    }
}

/// What a platform family understands of `RecorderConfig`, and its defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderProfile {
    pub default_sample_rate: u32,
    pub default_channels: u16,
    pub default_encoding: AudioEncoding,
    pub encodings: &'static [AudioEncoding],
    pub honors_linear_pcm: bool,
    pub honors_input_source: bool,
    pub honors_output_format: bool,
}

/// Concrete settings handed to a native recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: Option<u32>,
    pub encoding: AudioEncoding,
    pub quality: EncoderQuality,
    pub bit_depth: u16,
    pub float_samples: bool,
    pub input_source: InputSource,
    pub output_format: OutputFormat,
}

impl RecorderSettings {
    pub const fn extension(&self) -> &'static str {
        self.encoding.extension()
    }
}
