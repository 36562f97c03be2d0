//! The general profile form.

pub mod adapter;
pub mod avatar;
pub mod cascade;
pub mod countries;
pub mod normalize;
pub mod schema;
pub mod session;
pub mod values;
pub mod view;

pub use avatar::{AvatarRejection, DroppedFile, StagedAvatar, AVATAR_MAX_BYTES};
pub use cascade::TownCascade;
pub use schema::{FieldError, ProfileSchema};
pub use session::{FormContext, FormSession, SessionError};
pub use values::{FieldChange, PhoneSlot, ProfileFormValues, PHONE_SLOT_COUNT};
pub use view::FormView;
