//! Run configuration.

use crate::engine::WriteOptions;
use crate::error::Result;

/// Toggles shared by every transcode operation of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranscodeConfig {
    /// Decode packed datasets into physical values instead of copying raw.
    pub unpack: bool,
    /// Storage options of written datasets.
    pub write: WriteOptions,
}

impl TranscodeConfig {
    /// Build and validate a configuration.
    pub fn new(unpack: bool, chunked: bool, compression_level: u8) -> Result<Self> {
        let write = WriteOptions {
            chunked,
            compression_level,
        };
        write.validate()?;
        Ok(Self { unpack, write })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_raw_and_contiguous() {
        let config = TranscodeConfig::default();
        assert!(!config.unpack);
        assert!(!config.write.chunked);
        assert_eq!(config.write.compression_level, 0);
    }

    #[test]
    fn test_validation() {
        assert!(TranscodeConfig::new(true, true, 9).is_ok());
        assert!(TranscodeConfig::new(false, false, 1).is_err());
        assert!(TranscodeConfig::new(false, true, 10).is_err());
    }
}
