mod models;
mod permission;

pub use models::{ApiKey, FileRecord, FileSummary, Tenant};
pub use permission::Permission;
