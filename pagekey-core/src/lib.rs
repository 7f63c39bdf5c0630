pub mod autofill;
pub mod credential;
pub mod database;
pub mod error;
pub mod registry;
pub mod site;

pub use autofill::{AutofillService, Dataset, FillResponse, SaveInfo, SaveOutcome, SimilarSitePolicy};
pub use credential::{Credential, NewCredential, Upsert};
pub use database::{DEFAULT_DB_NAME, Database};
pub use error::StoreError;
pub use registry::{RegistryConfig, Resolution, SiteRegistry};
pub use site::Site;
