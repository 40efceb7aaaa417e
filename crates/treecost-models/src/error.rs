use std::error::Error;
use std::fmt;

/// Failure conditions raised by the cost synthesis and training pipeline.
///
/// Missing values (diameter, health, species) are never reported here; they are
/// handled by the fallback policy of each stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A required column is absent from the input shape.
    Schema { column: String },
    /// Invalid hyper-parameter, split fraction or synthesis/encoder setting.
    Config(String),
    /// Nothing left to work with after filtering.
    InsufficientData(String),
    /// Evaluation rows without a label.
    MissingLabels { missing: usize, total: usize },
    /// Feature width or row count disagreement between two inputs.
    ShapeMismatch { expected: usize, found: usize },
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        PipelineError::InsufficientData(msg.into())
    }

    pub fn schema(column: impl Into<String>) -> Self {
        PipelineError::Schema {
            column: column.into(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::Schema { column } => {
                write!(f, "Input is missing required column '{}'", column)
            }
            PipelineError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            PipelineError::InsufficientData(msg) => write!(f, "Insufficient data: {}", msg),
            PipelineError::MissingLabels { missing, total } => write!(
                f,
                "Found {} rows without a label out of {} evaluation rows",
                missing, total
            ),
            PipelineError::ShapeMismatch { expected, found } => {
                write!(f, "Shape mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl Error for PipelineError {}

pub type Result<T> = std::result::Result<T, PipelineError>;
