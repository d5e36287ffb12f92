mod models;
mod pagination;
mod permission;

pub use models::*;
pub use pagination::*;
pub use permission::Permission;
