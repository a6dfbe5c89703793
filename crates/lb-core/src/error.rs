//! # AppError
//!
//! Centralized error handling for the Leetboard ecosystem.
//! Every failure carries a stable machine-checkable kind plus a
//! human-readable context string.

use std::fmt;
use thiserror::Error;

/// The entity a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Session,
    Post,
    Comment,
    /// The comment named as the parent of a reply.
    ParentComment,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Session => "session",
            Resource::Post => "post",
            Resource::Comment => "comment",
            Resource::ParentComment => "parent comment",
        })
    }
}

/// Input rejected before anything touches a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("post title is required")]
    MissingTitle,
    #[error("session ID is required")]
    MissingSession,
    #[error("comment needs text or at least one image")]
    EmptyComment,
}

/// The request is well-formed but the thread's state forbids it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("cannot comment on an archived thread")]
    ThreadArchived,
    #[error("cannot reply to an archived comment")]
    ParentArchived,
    #[error("cannot reply to a comment from a different thread")]
    CrossThreadReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentFault {
    /// Empty, hidden, or path-traversal-capable filename.
    UnsafeFilename,
    DisallowedExtension,
    /// The target path in the namespace is already taken.
    DuplicateFilename,
    Io,
}

impl fmt::Display for AttachmentFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttachmentFault::UnsafeFilename => "unsafe filename",
            AttachmentFault::DisallowedExtension => "disallowed extension",
            AttachmentFault::DuplicateFilename => "duplicate filename",
            AttachmentFault::Io => "storage failure",
        })
    }
}

/// Coarse classification collaborators branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    StateConflict,
    Attachment,
    Persistence,
    IdentityGeneration,
    AvatarFetch,
}

/// The primary error type for all lb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Session, Post, Comment)
    #[error("{0} not found with ID {1}")]
    NotFound(Resource, String),

    #[error("validation error: {0}")]
    Validation(Violation),

    #[error("state conflict: {0}")]
    StateConflict(Conflict),

    /// Upload rejected or failed (extension, filename, collision, disk)
    #[error("attachment error ({fault}): {context}")]
    Attachment {
        fault: AttachmentFault,
        context: String,
    },

    /// Infrastructure failure (e.g., DB down, locked, corrupt row)
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("identity generation error: {0}")]
    IdentityGeneration(String),

    /// The external avatar catalog failed or timed out
    #[error("avatar fetch error: {0}")]
    AvatarFetch(String),
}

impl AppError {
    pub fn not_found(resource: Resource, id: impl fmt::Display) -> Self {
        Self::NotFound(resource, id.to_string())
    }

    pub fn attachment(fault: AttachmentFault, context: impl Into<String>) -> Self {
        Self::Attachment {
            fault,
            context: context.into(),
        }
    }

    pub fn persistence(context: impl fmt::Display) -> Self {
        Self::Persistence(context.to_string())
    }

    pub fn avatar(context: impl fmt::Display) -> Self {
        Self::AvatarFetch(context.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(..) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::Attachment { .. } => ErrorKind::Attachment,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::IdentityGeneration(_) => ErrorKind::IdentityGeneration,
            Self::AvatarFetch(_) => ErrorKind::AvatarFetch,
        }
    }

    /// Rejections the presentation layer shows as feedback rather than a failure page.
    pub fn is_user_facing(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::StateConflict)
    }
}

impl From<Violation> for AppError {
    fn from(v: Violation) -> Self {
        Self::Validation(v)
    }
}

impl From<Conflict> for AppError {
    fn from(c: Conflict) -> Self {
        Self::StateConflict(c)
    }
}

/// A specialized Result type for Leetboard logic.
pub type Result<T> = std::result::Result<T, AppError>;
