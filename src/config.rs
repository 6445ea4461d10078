//! Machine configuration.

use crate::cpu::memory::DEFAULT_MEMORY_SIZE;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Smallest usable bank: one opcode plus the cell that ends the program.
pub const MIN_MEMORY_SIZE: usize = 2;

/// Largest bank the emulator accepts.
pub const MAX_MEMORY_SIZE: usize = 65536;

/// Sizes of the two memory banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub program_size: usize,
    pub data_size: usize,
}

impl MachineConfig {
    /// Check that both banks are within the supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (bank, size) in [("program", self.program_size), ("data", self.data_size)] {
            if !(MIN_MEMORY_SIZE..=MAX_MEMORY_SIZE).contains(&size) {
                return Err(ConfigError::InvalidMemorySize { bank, size });
            }
        }
        Ok(())
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            program_size: DEFAULT_MEMORY_SIZE,
            data_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

/// Errors from building a machine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{bank} memory size {size} outside {min}..={max}", min = MIN_MEMORY_SIZE, max = MAX_MEMORY_SIZE)]
    InvalidMemorySize { bank: &'static str, size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MachineConfig::default();
        assert_eq!(config.program_size, 256);
        assert_eq!(config.data_size, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_sizes() {
        let config = MachineConfig { program_size: 1, data_size: 256 };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidMemorySize { bank: "program", size: 1 })
        );

        let config = MachineConfig { program_size: 256, data_size: MAX_MEMORY_SIZE + 1 };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMemorySize { bank: "data", .. })
        ));
    }

    #[test]
    fn test_config_serde() {
        let config = MachineConfig { program_size: 64, data_size: 32 };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<MachineConfig>(&json).unwrap(), config);
    }
}
