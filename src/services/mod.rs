//! Service layer: the gateways to reference data and the user API, and the
//! profile form service built on top of them.

pub mod account;
pub mod cache;
pub mod forms;
pub mod gateways;
pub mod reference;
pub mod user_api;

pub use account::AccountDirectory;
pub use cache::RedisCache;
pub use forms::{AvatarPreview, FormSessions, ProfileFormService, SubmitOutcome};
pub use gateways::{ReferenceHealth, ReferenceSource, UserGateway};
pub use reference::ReferenceRepository;
pub use user_api::UserApiClient;
