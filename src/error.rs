use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Venue,
    Artist,
    Show,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Venue => "Venue",
            Entity::Artist => "Artist",
            Entity::Show => "Show",
        })
    }
}

/// Write that was being attempted when a persistence failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Listed,
    Updated,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Listed => "listed",
            Action::Updated => "updated",
        })
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },
    #[error("{entity} {field} is required")]
    Validation { entity: Entity, field: &'static str },
    #[error("An error occurred. {entity} {name} could not be {action}.")]
    Persistence {
        entity: Entity,
        name: String,
        action: Action,
        #[source]
        source: rusqlite::Error,
    },
    #[error("{entity} {id} could not be deleted")]
    ServerFault {
        entity: Entity,
        id: i64,
        #[source]
        source: rusqlite::Error,
    },
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_message_names_the_entity() {
        let err = DirectoryError::Persistence {
            entity: Entity::Venue,
            name: "The Musical Hop".into(),
            action: Action::Listed,
            source: rusqlite::Error::QueryReturnedNoRows,
        };
        assert_eq!(
            err.to_string(),
            "An error occurred. Venue The Musical Hop could not be listed."
        );
    }

    #[test]
    fn not_found_message() {
        let err = DirectoryError::NotFound {
            entity: Entity::Artist,
            id: 42,
        };
        assert_eq!(err.to_string(), "Artist 42 not found");
    }
}
