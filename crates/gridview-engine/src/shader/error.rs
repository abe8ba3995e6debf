use std::fmt;

use crate::backend::ShaderStage;

/// Shader build failure. The log is the backend's diagnostic text, bounded
/// to [`INFO_LOG_CAPACITY`](super::INFO_LOG_CAPACITY) bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    Compile { stage: ShaderStage, log: String },
    Link { log: String },
}

impl ShaderError {
    pub fn log(&self) -> &str {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log } => log,
        }
    }
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Compile { stage, log } => {
                write!(f, "{stage} shader compilation failed: {log}")
            }
            ShaderError::Link { log } => write!(f, "program linking failed: {log}"),
        }
    }
}

impl std::error::Error for ShaderError {}
