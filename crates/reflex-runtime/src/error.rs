//! Runtime error types.
//!
//! Step failures are fatal to the loop, not the process: the scheduler
//! logs them and stops, leaving the instance inspectable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("run step references unknown module: {0}")]
    UnknownModule(String),

    #[error("emit step references unknown effector: {0}")]
    UnknownEffector(String),

    #[error("invalid effect binding for action \"{action}\": {expr}")]
    InvalidBinding { action: String, expr: String },

    #[error("step {index} failed: {message}")]
    Step { index: usize, message: String },
}
