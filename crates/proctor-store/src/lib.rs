pub mod data_dir;
pub mod error;
pub mod export;
pub mod schema;
pub mod store;

pub use data_dir::{CONFIG_FILE, DB_FILE, default_base_dir, load_config, open_in};
pub use error::{Result, StoreError};
pub use export::export_report_json;
pub use store::Store;
