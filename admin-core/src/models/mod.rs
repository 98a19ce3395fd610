pub mod ai_model;
pub mod target;

pub use ai_model::{Model, ModelRegistry, ServiceKind};
pub use target::{ArtifactFormat, BackupCategory, BackupTarget, BatchStamp};
