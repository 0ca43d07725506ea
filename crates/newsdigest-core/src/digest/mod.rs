//! Digest storage: models and repository.

mod model;
mod repository;

pub use model::{
    CleanedEmail, Digest, DigestEmail, NewSection, SectionMember, SourceLink, StoredDigest,
    ThemeSection,
};
pub use repository::DigestRepository;
