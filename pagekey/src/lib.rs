pub mod handlers;

pub use handlers::{database_path, load_tree, mask_password, resolve_db_path};
