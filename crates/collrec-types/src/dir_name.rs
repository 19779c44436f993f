//! Collection directory naming.
//!
//! Live collections live in `collection-<id>`; a drop renames the directory
//! to `deleted-<id>` before removing it. Either name may carry a trailing
//! `-<suffix>` of ASCII alphanumerics. Any other name is not ours.

use std::fmt;

use crate::id::CollectionId;

/// Prefix of a live (or in-creation) collection directory.
pub const COLLECTION_DIR_PREFIX: &str = "collection-";

/// Prefix of a directory whose drop has started.
pub const DELETED_DIR_PREFIX: &str = "deleted-";

/// Which naming family a directory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirState {
    /// `collection-<id>`.
    Live,
    /// `deleted-<id>`.
    Dropping,
}

/// Parsed collection directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionDirName {
    pub state: DirState,
    pub id: CollectionId,
    pub suffix: Option<String>,
}

impl CollectionDirName {
    /// Name for a freshly allocated live directory.
    #[must_use]
    pub const fn live(id: CollectionId) -> Self {
        Self {
            state: DirState::Live,
            id,
            suffix: None,
        }
    }

    /// Parse a directory file name. Returns `None` for anything that does
    /// not match the identifier pattern.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let (state, rest) = if let Some(rest) = name.strip_prefix(COLLECTION_DIR_PREFIX) {
            (DirState::Live, rest)
        } else if let Some(rest) = name.strip_prefix(DELETED_DIR_PREFIX) {
            (DirState::Dropping, rest)
        } else {
            return None;
        };

        let (id_text, suffix) = match rest.split_once('-') {
            Some((id_text, suffix)) => {
                if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
                    return None;
                }
                (id_text, Some(suffix.to_owned()))
            }
            None => (rest, None),
        };

        let id = CollectionId::parse_decimal(id_text)?;
        Some(Self { state, id, suffix })
    }

    /// The same directory after a drop has renamed it.
    #[must_use]
    pub fn as_dropping(&self) -> Self {
        Self {
            state: DirState::Dropping,
            id: self.id,
            suffix: self.suffix.clone(),
        }
    }

    #[must_use]
    pub const fn is_dropping(&self) -> bool {
        matches!(self.state, DirState::Dropping)
    }
}

impl fmt::Display for CollectionDirName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.state {
            DirState::Live => COLLECTION_DIR_PREFIX,
            DirState::Dropping => DELETED_DIR_PREFIX,
        };
        write!(f, "{prefix}{}", self.id)?;
        if let Some(suffix) = &self.suffix {
            write!(f, "-{suffix}")?;
        }
        Ok(())
    }
}
