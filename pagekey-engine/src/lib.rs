pub mod classify;
pub mod compat;
pub mod error;
pub mod identify;
pub mod submit;
pub mod title;
pub mod tree;
pub mod urls;

pub use classify::{ClassifiedField, FieldRole, classify};
pub use error::EngineError;
pub use identify::{PageInfo, identify};
pub use submit::{CredentialPair, SubmittedField};
pub use tree::{FieldId, HtmlInfo, Node, ViewTree};
