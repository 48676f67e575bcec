//! Core domain types for Murmur.

pub mod category;
pub mod interaction;
pub mod platform;
pub mod source;
pub mod volume;

pub use category::{Bus, SoundCategory};
pub use interaction::InteractionKind;
pub use platform::Platform;
pub use source::SourceResolver;
pub use volume::{Volume, VolumePreferences};
