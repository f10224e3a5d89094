mod email_address;
mod headline;
mod media_kind;

pub use email_address::EmailAddress;
pub use headline::Headline;
pub use media_kind::MediaKind;
