use rusqlite::{params, Transaction};

use crate::db::{self, Store};
use crate::error::{Action, DirectoryError, Entity};
use crate::models::{ArtistForm, ShowForm, VenueForm};

impl Store {
    pub fn create_venue(&mut self, form: &VenueForm) -> Result<i64, DirectoryError> {
        let fields = form.normalize()?;
        let id = self
            .in_transaction(|tx| db::insert_venue(tx, &fields))
            .map_err(|source| persistence(Entity::Venue, &fields.name, Action::Listed, source))?;
        tracing::info!(venue_id = id, name = %fields.name, "venue listed");
        Ok(id)
    }

    /// Overwrites every mutable column of the venue. Concurrent edits are
    /// last-writer-wins.
    pub fn update_venue(&mut self, id: i64, form: &VenueForm) -> Result<(), DirectoryError> {
        let fields = form.normalize()?;
        let changed = self
            .in_transaction(|tx| db::update_venue(tx, id, &fields))
            .map_err(|source| persistence(Entity::Venue, &fields.name, Action::Updated, source))?;
        if changed == 0 {
            return Err(DirectoryError::NotFound {
                entity: Entity::Venue,
                id,
            });
        }
        tracing::info!(venue_id = id, "venue updated");
        Ok(())
    }

    /// Removes the venue and, through the foreign key cascade, its shows.
    pub fn delete_venue(&mut self, id: i64) -> Result<(), DirectoryError> {
        self.delete(Entity::Venue, "DELETE FROM venues WHERE id = ?1", id)
    }

    pub fn create_artist(&mut self, form: &ArtistForm) -> Result<i64, DirectoryError> {
        let fields = form.normalize()?;
        let id = self
            .in_transaction(|tx| db::insert_artist(tx, &fields))
            .map_err(|source| persistence(Entity::Artist, &fields.name, Action::Listed, source))?;
        tracing::info!(artist_id = id, name = %fields.name, "artist listed");
        Ok(id)
    }

    pub fn update_artist(&mut self, id: i64, form: &ArtistForm) -> Result<(), DirectoryError> {
        let fields = form.normalize()?;
        let changed = self
            .in_transaction(|tx| db::update_artist(tx, id, &fields))
            .map_err(|source| persistence(Entity::Artist, &fields.name, Action::Updated, source))?;
        if changed == 0 {
            return Err(DirectoryError::NotFound {
                entity: Entity::Artist,
                id,
            });
        }
        tracing::info!(artist_id = id, "artist updated");
        Ok(())
    }

    pub fn delete_artist(&mut self, id: i64) -> Result<(), DirectoryError> {
        self.delete(Entity::Artist, "DELETE FROM artists WHERE id = ?1", id)
    }

    /// Books an artist at a venue. Unknown artist or venue ids are rejected
    /// by the foreign keys and reported as a persistence failure.
    pub fn create_show(&mut self, form: &ShowForm) -> Result<i64, DirectoryError> {
        let id = self
            .in_transaction(|tx| db::insert_show(tx, form.artist_id, form.venue_id, form.start_time))
            .map_err(|source| {
                let name = format!("for artist {} at venue {}", form.artist_id, form.venue_id);
                persistence(Entity::Show, &name, Action::Listed, source)
            })?;
        tracing::info!(
            show_id = id,
            artist_id = form.artist_id,
            venue_id = form.venue_id,
            "show listed"
        );
        Ok(id)
    }

    fn delete(&mut self, entity: Entity, sql: &str, id: i64) -> Result<(), DirectoryError> {
        let removed = self
            .in_transaction(|tx| tx.execute(sql, params![id]))
            .map_err(|source| DirectoryError::ServerFault { entity, id, source })?;
        if removed == 0 {
            return Err(DirectoryError::NotFound { entity, id });
        }
        tracing::info!(%entity, id, "deleted");
        Ok(())
    }

    /// Runs `work` in its own transaction. Anything short of a successful
    /// commit, including an unwinding panic, drops the transaction and rolls
    /// it back.
    fn in_transaction<T, F>(&mut self, work: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    {
        let tx = self.conn.transaction()?;
        let value = work(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn persistence(entity: Entity, name: &str, action: Action, source: rusqlite::Error) -> DirectoryError {
    tracing::warn!(%entity, name, error = %source, "write rolled back");
    DirectoryError::Persistence {
        entity,
        name: name.to_string(),
        action,
        source,
    }
}
