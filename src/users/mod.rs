//! Account persistence: document model, store boundary, MongoDB backend.

mod model;
mod mongo;
mod store;

pub use model::NewUser;
pub use model::ProfileUpdate;
pub use model::User;
pub use model::UserProfile;
pub use mongo::MongoStore;
pub use store::CredentialStore;
