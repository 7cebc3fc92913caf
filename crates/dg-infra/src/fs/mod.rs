pub mod app_data_dir;
mod provisioning;
mod session_store;

pub use provisioning::{FileProvisioningSource, DEFAULT_PROVISIONING_FILE};
pub use session_store::FileSessionStore;
