use crate::error::EncoreError;
use crate::models::*;
use anyhow::{anyhow, Result};

pub fn validate_interaction(interaction: &UserInteraction) -> Result<()> {
    if interaction.user_id.is_empty() {
        return Err(anyhow!("user id cannot be empty"));
    }
    if interaction.concert_id.is_empty() {
        return Err(anyhow!("concert id cannot be empty"));
    }
    if let Some(rating) = interaction.rating {
        if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
            return Err(EncoreError::InvalidRating { value: rating }.into());
        }
    }
    Ok(())
}

pub fn validate_artist(artist: &ArtistFeatures) -> Result<()> {
    if artist.id.is_empty() {
        return Err(anyhow!("artist id cannot be empty"));
    }
    if !artist.popularity.is_finite() {
        return Err(EncoreError::NonFiniteInput {
            context: "artist popularity",
        }
        .into());
    }
    if !(0.0..=100.0).contains(&artist.popularity) {
        return Err(anyhow!(
            "artist popularity must be between 0 and 100, got {}",
            artist.popularity
        ));
    }
    Ok(())
}

pub fn validate_venue(venue: &VenueFeatures) -> Result<()> {
    if venue.id.is_empty() {
        return Err(anyhow!("venue id cannot be empty"));
    }
    if !venue.latitude.is_finite() || !venue.longitude.is_finite() {
        return Err(EncoreError::NonFiniteInput {
            context: "venue coordinates",
        }
        .into());
    }
    if !(-90.0..=90.0).contains(&venue.latitude) || !(-180.0..=180.0).contains(&venue.longitude) {
        return Err(EncoreError::InvalidCoordinate {
            lat: venue.latitude,
            lon: venue.longitude,
        }
        .into());
    }
    if venue.capacity == 0 {
        return Err(anyhow!("venue capacity must be positive"));
    }
    Ok(())
}

pub fn validate_concert(concert: &Concert) -> Result<()> {
    if concert.id.is_empty() || concert.artist_id.is_empty() || concert.venue_id.is_empty() {
        return Err(anyhow!("concert must carry id, artist id, and venue id"));
    }
    Ok(())
}

/// Context completeness per strategy: collaborative strategies need a
/// user, content strategies need seeds, hybrid-all needs at least one of
/// the two.
pub fn validate_context(context: &RecommendationContext, strategy: Strategy) -> Result<()> {
    if context.is_empty() {
        return Err(EncoreError::EmptyContext.into());
    }
    match strategy {
        Strategy::CollaborativeUser | Strategy::CollaborativeItem => {
            if context.user_id.is_none() {
                return Err(EncoreError::MissingContext {
                    strategy: "collaborative",
                    requirement: "a user id",
                }
                .into());
            }
        }
        Strategy::ContentArtist => {
            if context.seed_artists.is_empty() {
                return Err(EncoreError::MissingContext {
                    strategy: "content-artist",
                    requirement: "seed artist ids",
                }
                .into());
            }
        }
        Strategy::ContentVenue => {
            if context.seed_venues.is_empty() {
                return Err(EncoreError::MissingContext {
                    strategy: "content-venue",
                    requirement: "seed venue ids",
                }
                .into());
            }
        }
        Strategy::ContentHybrid => {
            if context.seed_artists.is_empty() && context.seed_venues.is_empty() {
                return Err(EncoreError::MissingContext {
                    strategy: "content-hybrid",
                    requirement: "seed artist or venue ids",
                }
                .into());
            }
        }
        Strategy::HybridAll => {}
    }
    Ok(())
}

pub fn validate_batch_size(len: usize, max: usize) -> Result<()> {
    if len == 0 {
        return Err(anyhow!("batch cannot be empty"));
    }
    if len > max {
        return Err(anyhow!("batch too large: {len} contexts (max {max})"));
    }
    Ok(())
}
