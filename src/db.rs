use std::path::Path;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::config::AppConfig;
use crate::error::Entity;
use crate::models::{Artist, ArtistFields, Show, Venue, VenueFields};
use crate::utils;

/// One connection to the directory database. Each caller opens its own and
/// drops it when done; nothing is shared between requests.
pub struct Store {
    pub(crate) conn: Connection,
}

pub(crate) const VENUE_COLUMNS: &str = "id, name, city, state, address, phone, image_link, \
     facebook_link, website, genres, seeking_talent, seeking_description";

pub(crate) const ARTIST_COLUMNS: &str = "id, name, city, state, phone, image_link, \
     facebook_link, website, genres, seeking_venue, seeking_description";

impl Store {
    pub fn open_default(config: &AppConfig) -> rusqlite::Result<Self> {
        let path = config.database_path();
        utils::ensure_parent(&path);
        Self::open(&path)
    }

    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        Self::prepare(Connection::open(path)?)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> rusqlite::Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        register_casefold(&conn)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS venues(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                address TEXT NOT NULL,
                phone TEXT NOT NULL,
                image_link TEXT,
                facebook_link TEXT,
                website TEXT,
                genres TEXT NOT NULL,
                seeking_talent INTEGER NOT NULL DEFAULT 0,
                seeking_description TEXT
            );
            CREATE TABLE IF NOT EXISTS artists(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                phone TEXT NOT NULL,
                image_link TEXT,
                facebook_link TEXT,
                website TEXT,
                genres TEXT NOT NULL,
                seeking_venue INTEGER NOT NULL DEFAULT 0,
                seeking_description TEXT
            );
            CREATE TABLE IF NOT EXISTS shows(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
                venue_id INTEGER NOT NULL REFERENCES venues(id) ON DELETE CASCADE,
                start_time TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS shows_booking ON shows(artist_id, venue_id, start_time);
            CREATE INDEX IF NOT EXISTS shows_venue ON shows(venue_id, start_time);",
        )?;
        Ok(())
    }

    /// Fills an empty database with a small demo directory. Show times are
    /// relative to the moment of seeding so both past and upcoming lists
    /// have entries.
    pub fn seed_if_empty(&mut self) -> rusqlite::Result<bool> {
        let count = self.count(Entity::Venue)?;
        if count > 0 {
            return Ok(false);
        }

        let now = Utc::now();
        let tx = self.conn.transaction()?;

        let musical_hop = insert_venue(
            &tx,
            &sample_venue(
                "The Musical Hop",
                "San Francisco",
                "CA",
                "1015 Folsom Street",
                "123-123-1234",
                &["Jazz", "Reggae", "Swing", "Classical", "Folk"],
                Some("We are on the lookout for a local artist to play every two weeks. Please call us."),
            ),
        )?;
        insert_venue(
            &tx,
            &sample_venue(
                "The Dueling Pianos Bar",
                "New York",
                "NY",
                "335 Delancey Street",
                "914-003-1132",
                &["Classical", "R&B", "Hip-Hop"],
                None,
            ),
        )?;
        let park_square = insert_venue(
            &tx,
            &sample_venue(
                "Park Square Live Music & Coffee",
                "San Francisco",
                "CA",
                "34 Whiskey Moore Ave",
                "415-000-1234",
                &["Rock n Roll", "Jazz", "Classical", "Folk"],
                None,
            ),
        )?;

        let guns_n_petals = insert_artist(
            &tx,
            &sample_artist(
                "Guns N Petals",
                "San Francisco",
                "CA",
                "326-123-5000",
                &["Rock n Roll"],
                Some("Looking for shows to perform at in the San Francisco Bay Area!"),
            ),
        )?;
        let matt_quevedo = insert_artist(
            &tx,
            &sample_artist(
                "Matt Quevedo",
                "New York",
                "NY",
                "300-400-5000",
                &["Jazz"],
                None,
            ),
        )?;
        let wild_sax = insert_artist(
            &tx,
            &sample_artist(
                "The Wild Sax Band",
                "San Francisco",
                "CA",
                "432-325-5432",
                &["Jazz", "Classical"],
                None,
            ),
        )?;

        insert_show(&tx, guns_n_petals, musical_hop, now - Duration::days(30))?;
        insert_show(&tx, matt_quevedo, park_square, now - Duration::days(10))?;
        for days in [7, 14, 21] {
            insert_show(&tx, wild_sax, park_square, now + Duration::days(days))?;
        }

        tx.commit()?;
        Ok(true)
    }

    pub fn count(&self, entity: Entity) -> rusqlite::Result<i64> {
        let table = match entity {
            Entity::Venue => "venues",
            Entity::Artist => "artists",
            Entity::Show => "shows",
        };
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
    }

    pub fn get_venue(&self, id: i64) -> rusqlite::Result<Option<Venue>> {
        self.conn
            .query_row(
                &format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?1"),
                params![id],
                venue_from_row,
            )
            .optional()
    }

    pub fn get_artist(&self, id: i64) -> rusqlite::Result<Option<Artist>> {
        self.conn
            .query_row(
                &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = ?1"),
                params![id],
                artist_from_row,
            )
            .optional()
    }

    pub fn get_show(&self, id: i64) -> rusqlite::Result<Option<Show>> {
        self.conn
            .query_row(
                "SELECT id, artist_id, venue_id, start_time FROM shows WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Show {
                        id: row.get(0)?,
                        artist_id: row.get(1)?,
                        venue_id: row.get(2)?,
                        start_time: timestamp_column(row, 3)?,
                    })
                },
            )
            .optional()
    }
}

pub(crate) fn insert_venue(conn: &Connection, fields: &VenueFields) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO venues (name, city, state, address, phone, image_link, facebook_link,
                             website, genres, seeking_talent, seeking_description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            fields.name,
            fields.city,
            fields.state,
            fields.address,
            fields.phone,
            fields.image_link,
            fields.facebook_link,
            fields.website,
            encode_genres(&fields.genres),
            fields.seeking_talent,
            fields.seeking_description
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn update_venue(
    conn: &Connection,
    id: i64,
    fields: &VenueFields,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE venues SET name = ?2, city = ?3, state = ?4, address = ?5, phone = ?6,
                image_link = ?7, facebook_link = ?8, website = ?9, genres = ?10,
                seeking_talent = ?11, seeking_description = ?12
         WHERE id = ?1",
        params![
            id,
            fields.name,
            fields.city,
            fields.state,
            fields.address,
            fields.phone,
            fields.image_link,
            fields.facebook_link,
            fields.website,
            encode_genres(&fields.genres),
            fields.seeking_talent,
            fields.seeking_description
        ],
    )
}

pub(crate) fn insert_artist(conn: &Connection, fields: &ArtistFields) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO artists (name, city, state, phone, image_link, facebook_link,
                              website, genres, seeking_venue, seeking_description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            fields.name,
            fields.city,
            fields.state,
            fields.phone,
            fields.image_link,
            fields.facebook_link,
            fields.website,
            encode_genres(&fields.genres),
            fields.seeking_venue,
            fields.seeking_description
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn update_artist(
    conn: &Connection,
    id: i64,
    fields: &ArtistFields,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE artists SET name = ?2, city = ?3, state = ?4, phone = ?5, image_link = ?6,
                facebook_link = ?7, website = ?8, genres = ?9, seeking_venue = ?10,
                seeking_description = ?11
         WHERE id = ?1",
        params![
            id,
            fields.name,
            fields.city,
            fields.state,
            fields.phone,
            fields.image_link,
            fields.facebook_link,
            fields.website,
            encode_genres(&fields.genres),
            fields.seeking_venue,
            fields.seeking_description
        ],
    )
}

pub(crate) fn insert_show(
    conn: &Connection,
    artist_id: i64,
    venue_id: i64,
    start_time: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO shows (artist_id, venue_id, start_time) VALUES (?1, ?2, ?3)",
        params![artist_id, venue_id, encode_timestamp(start_time)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fixed-width UTC text at full nanosecond precision, so SQL string
/// comparison orders exactly as `DateTime` does.
pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// `casefold(text)`: Unicode lowercase, the same folding search applies to
/// the term. SQLite's own `lower()` only folds ASCII.
fn register_casefold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: String = ctx.get(0)?;
            Ok(text.to_lowercase())
        },
    )
}

pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}

fn encode_genres(genres: &[String]) -> String {
    serde_json::Value::from(genres.to_vec()).to_string()
}

fn genres_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let payload: String = row.get(idx)?;
    serde_json::from_str(&payload).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

pub(crate) fn venue_from_row(row: &Row<'_>) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        state: row.get(3)?,
        address: row.get(4)?,
        phone: row.get(5)?,
        image_link: row.get(6)?,
        facebook_link: row.get(7)?,
        website: row.get(8)?,
        genres: genres_column(row, 9)?,
        seeking_talent: row.get(10)?,
        seeking_description: row.get(11)?,
    })
}

pub(crate) fn artist_from_row(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        state: row.get(3)?,
        phone: row.get(4)?,
        image_link: row.get(5)?,
        facebook_link: row.get(6)?,
        website: row.get(7)?,
        genres: genres_column(row, 8)?,
        seeking_venue: row.get(9)?,
        seeking_description: row.get(10)?,
    })
}

fn sample_venue(
    name: &str,
    city: &str,
    state: &str,
    address: &str,
    phone: &str,
    genres: &[&str],
    seeking_description: Option<&str>,
) -> VenueFields {
    let slug: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    VenueFields {
        name: name.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        address: address.to_string(),
        phone: phone.to_string(),
        image_link: None,
        facebook_link: Some(format!("https://www.facebook.com/{slug}")),
        website: Some(format!("https://www.{}.com", slug.to_lowercase())),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        seeking_talent: seeking_description.is_some(),
        seeking_description: seeking_description.map(str::to_string),
    }
}

fn sample_artist(
    name: &str,
    city: &str,
    state: &str,
    phone: &str,
    genres: &[&str],
    seeking_description: Option<&str>,
) -> ArtistFields {
    let slug: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    ArtistFields {
        name: name.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        phone: phone.to_string(),
        image_link: None,
        facebook_link: Some(format!("https://www.facebook.com/{slug}")),
        website: None,
        genres: genres.iter().map(|g| g.to_string()).collect(),
        seeking_venue: seeking_description.is_some(),
        seeking_description: seeking_description.map(str::to_string),
    }
}
