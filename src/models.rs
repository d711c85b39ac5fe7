use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, Entity};

/// Raw value a form checkbox submits when ticked.
pub const SEEKING_TOKEN: &str = "y";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: String,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website: Option<String>,
    pub genres: Vec<String>,
    pub seeking_talent: bool,
    pub seeking_description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website: Option<String>,
    pub genres: Vec<String>,
    pub seeking_venue: bool,
    pub seeking_description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Show {
    pub id: i64,
    pub artist_id: i64,
    pub venue_id: i64,
    pub start_time: DateTime<Utc>,
}

/// Venue fields as submitted, before validation. Also the shape of the
/// prefilled edit form.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct VenueForm {
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: String,
    pub image_link: String,
    pub facebook_link: String,
    pub website: String,
    pub genres: Vec<String>,
    pub seeking_talent: Option<String>,
    pub seeking_description: String,
}

/// Artist fields as submitted, before validation.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct ArtistForm {
    pub name: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub image_link: String,
    pub facebook_link: String,
    pub website: String,
    pub genres: Vec<String>,
    pub seeking_venue: Option<String>,
    pub seeking_description: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ShowForm {
    pub artist_id: i64,
    pub venue_id: i64,
    pub start_time: DateTime<Utc>,
}

/// Validated, normalized venue columns ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct VenueFields {
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: String,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website: Option<String>,
    pub genres: Vec<String>,
    pub seeking_talent: bool,
    pub seeking_description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArtistFields {
    pub name: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website: Option<String>,
    pub genres: Vec<String>,
    pub seeking_venue: bool,
    pub seeking_description: Option<String>,
}

impl VenueForm {
    pub fn normalize(&self) -> Result<VenueFields, DirectoryError> {
        let entity = Entity::Venue;
        Ok(VenueFields {
            name: required(entity, "name", &self.name)?,
            city: required(entity, "city", &self.city)?,
            state: required(entity, "state", &self.state)?,
            address: required(entity, "address", &self.address)?,
            phone: required(entity, "phone", &self.phone)?,
            image_link: optional(&self.image_link),
            facebook_link: optional(&self.facebook_link),
            website: optional(&self.website),
            genres: genres(&self.genres),
            seeking_talent: seeking(self.seeking_talent.as_deref()),
            seeking_description: optional(&self.seeking_description),
        })
    }

    /// Name as it is shown back to the submitter.
    pub fn display_name(&self) -> &str {
        self.name.trim()
    }
}

impl ArtistForm {
    pub fn normalize(&self) -> Result<ArtistFields, DirectoryError> {
        let entity = Entity::Artist;
        Ok(ArtistFields {
            name: required(entity, "name", &self.name)?,
            city: required(entity, "city", &self.city)?,
            state: required(entity, "state", &self.state)?,
            phone: required(entity, "phone", &self.phone)?,
            image_link: optional(&self.image_link),
            facebook_link: optional(&self.facebook_link),
            website: optional(&self.website),
            genres: genres(&self.genres),
            seeking_venue: seeking(self.seeking_venue.as_deref()),
            seeking_description: optional(&self.seeking_description),
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.trim()
    }
}

impl From<&Venue> for VenueForm {
    fn from(venue: &Venue) -> Self {
        Self {
            name: venue.name.clone(),
            city: venue.city.clone(),
            state: venue.state.clone(),
            address: venue.address.clone(),
            phone: venue.phone.clone(),
            image_link: venue.image_link.clone().unwrap_or_default(),
            facebook_link: venue.facebook_link.clone().unwrap_or_default(),
            website: venue.website.clone().unwrap_or_default(),
            genres: venue.genres.clone(),
            seeking_talent: venue.seeking_talent.then(|| SEEKING_TOKEN.to_string()),
            seeking_description: venue.seeking_description.clone().unwrap_or_default(),
        }
    }
}

impl From<&Artist> for ArtistForm {
    fn from(artist: &Artist) -> Self {
        Self {
            name: artist.name.clone(),
            city: artist.city.clone(),
            state: artist.state.clone(),
            phone: artist.phone.clone(),
            image_link: artist.image_link.clone().unwrap_or_default(),
            facebook_link: artist.facebook_link.clone().unwrap_or_default(),
            website: artist.website.clone().unwrap_or_default(),
            genres: artist.genres.clone(),
            seeking_venue: artist.seeking_venue.then(|| SEEKING_TOKEN.to_string()),
            seeking_description: artist.seeking_description.clone().unwrap_or_default(),
        }
    }
}

fn required(entity: Entity, field: &'static str, value: &str) -> Result<String, DirectoryError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DirectoryError::Validation { entity, field });
    }
    Ok(value.to_string())
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn genres(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|genre| genre.trim())
        .filter(|genre| !genre.is_empty())
        .map(str::to_string)
        .collect()
}

fn seeking(value: Option<&str>) -> bool {
    value == Some(SEEKING_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue_form() -> VenueForm {
        VenueForm {
            name: "The Musical Hop".into(),
            city: "San Francisco".into(),
            state: "CA".into(),
            address: "1015 Folsom Street".into(),
            phone: "123-123-1234".into(),
            genres: vec!["Jazz".into(), "Reggae".into()],
            ..VenueForm::default()
        }
    }

    #[test]
    fn empty_optional_fields_become_absent() {
        let mut form = venue_form();
        form.website = "   ".into();
        form.image_link = String::new();
        form.facebook_link = "https://www.facebook.com/TheMusicalHop".into();

        let fields = form.normalize().expect("valid form");
        assert_eq!(fields.website, None);
        assert_eq!(fields.image_link, None);
        assert_eq!(
            fields.facebook_link.as_deref(),
            Some("https://www.facebook.com/TheMusicalHop")
        );
        assert_eq!(fields.seeking_description, None);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut form = venue_form();
        form.phone = " ".into();

        match form.normalize() {
            Err(DirectoryError::Validation { entity, field }) => {
                assert_eq!(entity, Entity::Venue);
                assert_eq!(field, "phone");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn seeking_flag_requires_exact_token() {
        let mut form = ArtistForm {
            name: "Guns N Petals".into(),
            city: "San Francisco".into(),
            state: "CA".into(),
            phone: "326-123-5000".into(),
            ..ArtistForm::default()
        };
        assert!(!form.normalize().expect("valid").seeking_venue);

        form.seeking_venue = Some("Y".into());
        assert!(!form.normalize().expect("valid").seeking_venue);

        form.seeking_venue = Some("y".into());
        assert!(form.normalize().expect("valid").seeking_venue);
    }

    #[test]
    fn blank_genres_are_dropped() {
        let mut form = venue_form();
        form.genres = vec!["Jazz".into(), "".into(), " Folk ".into()];
        let fields = form.normalize().expect("valid form");
        assert_eq!(fields.genres, vec!["Jazz".to_string(), "Folk".to_string()]);
    }

    #[test]
    fn venue_round_trips_through_edit_form() {
        let venue = Venue {
            id: 7,
            name: "Park Square Live Music & Coffee".into(),
            city: "San Francisco".into(),
            state: "CA".into(),
            address: "34 Whiskey Moore Ave".into(),
            phone: "415-000-1234".into(),
            image_link: None,
            facebook_link: None,
            website: Some("https://www.parksquarelivemusicandcoffee.com".into()),
            genres: vec!["Rock n Roll".into()],
            seeking_talent: true,
            seeking_description: None,
        };

        let fields = VenueForm::from(&venue).normalize().expect("valid form");
        assert_eq!(fields.name, venue.name);
        assert_eq!(fields.website, venue.website);
        assert!(fields.seeking_talent);
        assert_eq!(fields.image_link, None);
    }
}
