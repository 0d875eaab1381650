//! Venue lookup boundary and human-readable point descriptions.
//!
//! Resolving a coordinate to a place name is an external collaborator. The
//! core only needs a [`VenueLookup`]; failures of that collaborator are passed
//! through to the caller unchanged, with no retry.

use crate::error::Result;
use crate::features::FeatureEncoder;
use crate::{GeoPoint, Ping};

/// A place name for a coordinate, as reported by a lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venue {
    pub name: String,
    /// Whether the service considered its answer reliable.
    pub confident: bool,
}

/// Resolves coordinates to venues.
pub trait VenueLookup {
    fn lookup(&self, location: &GeoPoint) -> Result<Venue>;
}

/// Offline lookup that names a point by its coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateLookup;

impl VenueLookup for CoordinateLookup {
    fn lookup(&self, location: &GeoPoint) -> Result<Venue> {
        Ok(Venue {
            name: format!("{:.4},{:.4}", location.latitude, location.longitude),
            confident: true,
        })
    }
}

/// `"<name> (<lat>, <lng>)"`, suffixed with `" (low confidence)"` when needed.
pub fn describe_venue(venue: &Venue, location: &GeoPoint) -> String {
    let conf = if venue.confident {
        ""
    } else {
        " (low confidence)"
    };
    format!(
        "{} ({:.6}, {:.6}){}",
        venue.name, location.latitude, location.longitude, conf
    )
}

/// Describe a ping as `"Thu May 07, 2015 08:40 AM at <venue>"`.
pub fn describe_point(
    ping: &Ping,
    lookup: &dyn VenueLookup,
    encoder: &FeatureEncoder,
) -> Result<String> {
    let location = ping.location();
    let venue = lookup.lookup(&location)?;
    let when = encoder.local_time(ping.timestamp);
    Ok(format!(
        "{} at {}",
        when.format("%a %b %d, %Y %I:%M %p"),
        describe_venue(&venue, &location)
    ))
}

#[cfg(feature = "http")]
mod foursquare {
    use log::debug;
    use serde::Deserialize;
    use std::time::Duration;

    use super::{Venue, VenueLookup};
    use crate::GeoPoint;
    use crate::error::{Result, TrailError};

    const SEARCH_URL: &str = "https://api.foursquare.com/v2/venues/search";
    const API_VERSION: &str = "20150622";

    #[derive(Deserialize)]
    struct SearchEnvelope {
        response: SearchResponse,
    }

    #[derive(Deserialize)]
    struct SearchResponse {
        #[serde(default)]
        confident: bool,
        #[serde(default)]
        venues: Vec<VenueRecord>,
    }

    #[derive(Deserialize)]
    struct VenueRecord {
        name: String,
    }

    /// Venue search against the Foursquare v2 API.
    pub struct FoursquareLookup {
        client: reqwest::blocking::Client,
        token: String,
    }

    impl FoursquareLookup {
        pub fn new(token: impl Into<String>) -> Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| TrailError::VenueLookup(e.to_string()))?;
            Ok(Self {
                client,
                token: token.into(),
            })
        }
    }

    impl VenueLookup for FoursquareLookup {
        fn lookup(&self, location: &GeoPoint) -> Result<Venue> {
            let ll = format!("{:.6},{:.6}", location.latitude, location.longitude);
            debug!("[Venue] Searching near {}", ll);

            let envelope: SearchEnvelope = self
                .client
                .get(SEARCH_URL)
                .query(&[
                    ("oauth_token", self.token.as_str()),
                    ("v", API_VERSION),
                    ("ll", ll.as_str()),
                ])
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.json())
                .map_err(|e| TrailError::VenueLookup(e.to_string()))?;

            let first = envelope
                .response
                .venues
                .into_iter()
                .next()
                .ok_or_else(|| TrailError::VenueLookup(format!("no venues near {ll}")))?;

            Ok(Venue {
                name: first.name,
                confident: envelope.response.confident,
            })
        }
    }
}

#[cfg(feature = "http")]
pub use foursquare::FoursquareLookup;
