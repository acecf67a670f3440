use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Class '{class}' not found")]
    UnknownClass { class: String },

    #[error("Quota '{quota}' referenced by class '{class}' is not configured")]
    UnknownQuota { class: String, quota: String },

    #[error(
        "Master allocation infeasible for class {class}: policy floors need \
         {floor_total} seats but capacity is {capacity}"
    )]
    MasterAllocationInfeasible {
        class: String,
        capacity: u32,
        floor_total: u32,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
