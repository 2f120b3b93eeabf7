use crate::models::{ArtistFeatures, Concert, UserInteraction, VenueFeatures};
use crate::utils::validation;
use anyhow::Result;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

/// Application-layer store standing in for the data-access collaborator.
/// The core never reads it directly; requests work on an immutable
/// snapshot taken at call time.
#[derive(Debug, Default)]
pub struct CatalogStore {
    artists: DashMap<String, ArtistFeatures>,
    venues: DashMap<String, VenueFeatures>,
    concerts: DashMap<String, Concert>,
    interactions: RwLock<Vec<UserInteraction>>,
}

/// Immutable copy of the catalog at one point in time.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub artists: HashMap<String, ArtistFeatures>,
    pub venues: HashMap<String, VenueFeatures>,
    pub concerts: Vec<Concert>,
    pub interactions: Vec<UserInteraction>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_artists(&self, artists: Vec<ArtistFeatures>) -> Result<usize> {
        for artist in &artists {
            validation::validate_artist(artist)?;
        }
        let count = artists.len();
        for artist in artists {
            self.artists.insert(artist.id.clone(), artist);
        }
        info!("catalog now holds {} artists", self.artists.len());
        Ok(count)
    }

    pub fn add_venues(&self, venues: Vec<VenueFeatures>) -> Result<usize> {
        for venue in &venues {
            validation::validate_venue(venue)?;
        }
        let count = venues.len();
        for venue in venues {
            self.venues.insert(venue.id.clone(), venue);
        }
        info!("catalog now holds {} venues", self.venues.len());
        Ok(count)
    }

    pub fn add_concerts(&self, concerts: Vec<Concert>) -> Result<usize> {
        for concert in &concerts {
            validation::validate_concert(concert)?;
        }
        let count = concerts.len();
        for concert in concerts {
            self.concerts.insert(concert.id.clone(), concert);
        }
        info!("catalog now holds {} concerts", self.concerts.len());
        Ok(count)
    }

    pub fn add_interactions(&self, interactions: Vec<UserInteraction>) -> Result<usize> {
        for interaction in &interactions {
            validation::validate_interaction(interaction)?;
        }
        let count = interactions.len();
        self.interactions.write().extend(interactions);
        Ok(count)
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            artists: self
                .artists
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            venues: self
                .venues
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            concerts: self.concerts.iter().map(|e| e.value().clone()).collect(),
            interactions: self.interactions.read().clone(),
        }
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.read().len()
    }
}
