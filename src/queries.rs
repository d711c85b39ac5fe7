//! Read side of the directory: upcoming-show counts, locale grouping, detail
//! pages and name search.
//!
//! Every read takes the evaluation instant explicitly. A show is *upcoming*
//! when `start_time > now` and *past* when `start_time < now`; a show starting
//! exactly at `now` is neither.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Row};
use serde::Serialize;

use crate::db::{encode_timestamp, timestamp_column, Store};
use crate::error::{DirectoryError, Entity};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EntitySummary {
    pub id: i64,
    pub name: String,
    pub num_upcoming_shows: i64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LocaleGroup {
    pub city: String,
    pub state: String,
    pub venues: Vec<EntitySummary>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SearchResults {
    pub count: usize,
    pub data: Vec<EntitySummary>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ArtistListing {
    pub id: i64,
    pub name: String,
}

/// A show as seen from a venue page: the artist playing it.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VenueShow {
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: Option<String>,
    pub start_time: String,
}

/// A show as seen from an artist page: where it is played.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ArtistShow {
    pub venue_id: i64,
    pub venue_name: String,
    pub venue_image_link: Option<String>,
    pub start_time: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VenueDetail {
    pub id: i64,
    pub name: String,
    pub genres: Vec<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub website: Option<String>,
    pub facebook_link: Option<String>,
    pub seeking_talent: bool,
    pub seeking_description: Option<String>,
    pub image_link: Option<String>,
    pub past_shows: Vec<VenueShow>,
    pub upcoming_shows: Vec<VenueShow>,
    pub past_shows_count: usize,
    pub upcoming_shows_count: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ArtistDetail {
    pub id: i64,
    pub name: String,
    pub genres: Vec<String>,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub website: Option<String>,
    pub facebook_link: Option<String>,
    pub seeking_venue: bool,
    pub seeking_description: Option<String>,
    pub image_link: Option<String>,
    pub past_shows: Vec<ArtistShow>,
    pub upcoming_shows: Vec<ArtistShow>,
    pub past_shows_count: usize,
    pub upcoming_shows_count: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ShowListing {
    pub id: i64,
    pub venue_id: i64,
    pub venue_name: String,
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: Option<String>,
    pub start_time: String,
}

/// Owning side of the shows table, as used by the summary query.
#[derive(Clone, Copy)]
enum Owner {
    Venue,
    Artist,
}

impl Owner {
    fn table(self) -> &'static str {
        match self {
            Owner::Venue => "venues",
            Owner::Artist => "artists",
        }
    }

    fn show_key(self) -> &'static str {
        match self {
            Owner::Venue => "venue_id",
            Owner::Artist => "artist_id",
        }
    }
}

struct SummaryRow {
    city: String,
    state: String,
    summary: EntitySummary,
}

#[derive(Clone, Copy)]
enum Window {
    Past,
    Upcoming,
}

impl Window {
    fn operator(self) -> &'static str {
        match self {
            Window::Past => "<",
            Window::Upcoming => ">",
        }
    }
}

impl Store {
    pub fn venues_by_locale(&self, now: DateTime<Utc>) -> Result<Vec<LocaleGroup>, DirectoryError> {
        let mut groups: Vec<LocaleGroup> = Vec::new();
        for row in self.summaries(Owner::Venue, now, None)? {
            match groups
                .iter_mut()
                .find(|group| group.city == row.city && group.state == row.state)
            {
                Some(group) => group.venues.push(row.summary),
                None => groups.push(LocaleGroup {
                    city: row.city,
                    state: row.state,
                    venues: vec![row.summary],
                }),
            }
        }
        Ok(groups)
    }

    pub fn search_venues(
        &self,
        term: &str,
        now: DateTime<Utc>,
    ) -> Result<SearchResults, DirectoryError> {
        self.search(Owner::Venue, term, now)
    }

    pub fn search_artists(
        &self,
        term: &str,
        now: DateTime<Utc>,
    ) -> Result<SearchResults, DirectoryError> {
        self.search(Owner::Artist, term, now)
    }

    pub fn list_artists(&self) -> Result<Vec<ArtistListing>, DirectoryError> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM artists ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ArtistListing {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn venue_detail(&self, id: i64, now: DateTime<Utc>) -> Result<VenueDetail, DirectoryError> {
        let venue = self.get_venue(id)?.ok_or(DirectoryError::NotFound {
            entity: Entity::Venue,
            id,
        })?;
        let past_shows = self.venue_shows(id, now, Window::Past)?;
        let upcoming_shows = self.venue_shows(id, now, Window::Upcoming)?;

        Ok(VenueDetail {
            id: venue.id,
            name: venue.name,
            genres: venue.genres,
            address: venue.address,
            city: venue.city,
            state: venue.state,
            phone: venue.phone,
            website: venue.website,
            facebook_link: venue.facebook_link,
            seeking_talent: venue.seeking_talent,
            seeking_description: venue.seeking_description,
            image_link: venue.image_link,
            past_shows_count: past_shows.len(),
            upcoming_shows_count: upcoming_shows.len(),
            past_shows,
            upcoming_shows,
        })
    }

    pub fn artist_detail(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<ArtistDetail, DirectoryError> {
        let artist = self.get_artist(id)?.ok_or(DirectoryError::NotFound {
            entity: Entity::Artist,
            id,
        })?;
        let past_shows = self.artist_shows(id, now, Window::Past)?;
        let upcoming_shows = self.artist_shows(id, now, Window::Upcoming)?;

        Ok(ArtistDetail {
            id: artist.id,
            name: artist.name,
            genres: artist.genres,
            city: artist.city,
            state: artist.state,
            phone: artist.phone,
            website: artist.website,
            facebook_link: artist.facebook_link,
            seeking_venue: artist.seeking_venue,
            seeking_description: artist.seeking_description,
            image_link: artist.image_link,
            past_shows_count: past_shows.len(),
            upcoming_shows_count: upcoming_shows.len(),
            past_shows,
            upcoming_shows,
        })
    }

    /// Upcoming shows across the whole directory, soonest first.
    pub fn list_shows(&self, now: DateTime<Utc>) -> Result<Vec<ShowListing>, DirectoryError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.venue_id, v.name, s.artist_id, a.name, a.image_link, s.start_time
             FROM shows s
             JOIN venues v ON v.id = s.venue_id
             JOIN artists a ON a.id = s.artist_id
             WHERE s.start_time > ?1
             ORDER BY s.start_time, s.id",
        )?;
        let rows = stmt.query_map(params![encode_timestamp(now)], |row| {
            Ok(ShowListing {
                id: row.get(0)?,
                venue_id: row.get(1)?,
                venue_name: row.get(2)?,
                artist_id: row.get(3)?,
                artist_name: row.get(4)?,
                artist_image_link: row.get(5)?,
                start_time: display_time(row, 6)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn search(
        &self,
        owner: Owner,
        term: &str,
        now: DateTime<Utc>,
    ) -> Result<SearchResults, DirectoryError> {
        let data: Vec<EntitySummary> = self
            .summaries(owner, now, Some(term))?
            .into_iter()
            .map(|row| row.summary)
            .collect();
        Ok(SearchResults {
            count: data.len(),
            data,
        })
    }

    /// Every owner row with its upcoming-show count, via an outer join
    /// against the future-shows subquery so owners without shows count zero.
    fn summaries(
        &self,
        owner: Owner,
        now: DateTime<Utc>,
        name_filter: Option<&str>,
    ) -> Result<Vec<SummaryRow>, DirectoryError> {
        let table = owner.table();
        let key = owner.show_key();
        let filter = if name_filter.is_some() {
            "WHERE casefold(o.name) LIKE ?2 ESCAPE '\\'"
        } else {
            ""
        };
        let sql = format!(
            "SELECT o.id, o.name, o.city, o.state, COUNT(upcoming.{key})
             FROM {table} o
             LEFT OUTER JOIN (SELECT {key} FROM shows WHERE start_time > ?1) AS upcoming
               ON upcoming.{key} = o.id
             {filter}
             GROUP BY o.id, o.name, o.city, o.state
             ORDER BY o.id"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let now = encode_timestamp(now);
        let rows = match name_filter {
            Some(term) => stmt.query_map(params![now, like_pattern(term)], summary_from_row)?,
            None => stmt.query_map(params![now], summary_from_row)?,
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn venue_shows(
        &self,
        venue_id: i64,
        now: DateTime<Utc>,
        window: Window,
    ) -> Result<Vec<VenueShow>, DirectoryError> {
        let sql = format!(
            "SELECT s.artist_id, a.name, a.image_link, s.start_time
             FROM shows s
             JOIN artists a ON a.id = s.artist_id
             WHERE s.venue_id = ?1 AND s.start_time {} ?2
             ORDER BY s.start_time, s.id",
            window.operator()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![venue_id, encode_timestamp(now)], |row| {
            Ok(VenueShow {
                artist_id: row.get(0)?,
                artist_name: row.get(1)?,
                artist_image_link: row.get(2)?,
                start_time: display_time(row, 3)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn artist_shows(
        &self,
        artist_id: i64,
        now: DateTime<Utc>,
        window: Window,
    ) -> Result<Vec<ArtistShow>, DirectoryError> {
        let sql = format!(
            "SELECT s.venue_id, v.name, v.image_link, s.start_time
             FROM shows s
             JOIN venues v ON v.id = s.venue_id
             WHERE s.artist_id = ?1 AND s.start_time {} ?2
             ORDER BY s.start_time, s.id",
            window.operator()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![artist_id, encode_timestamp(now)], |row| {
            Ok(ArtistShow {
                venue_id: row.get(0)?,
                venue_name: row.get(1)?,
                venue_image_link: row.get(2)?,
                start_time: display_time(row, 3)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<SummaryRow> {
    Ok(SummaryRow {
        summary: EntitySummary {
            id: row.get(0)?,
            name: row.get(1)?,
            num_upcoming_shows: row.get(4)?,
        },
        city: row.get(2)?,
        state: row.get(3)?,
    })
}

fn display_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(timestamp_column(row, idx)?.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Case-folded `%term%` with LIKE wildcards in the term matched literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
