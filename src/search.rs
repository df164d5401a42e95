//! Text and artist search with the local favorites overlay applied.
//!
//! Searches never mutate shared state, so dropping a search future simply
//! cancels it.

use std::{collections::HashSet, sync::Arc};

use crate::{
    error::{Result, ValidationError},
    management::FavoritesRegistry,
    session::AuthSessionManager,
    types::{ArtistResult, FavoriteKey, ResultSource, SearchCatalog, SearchResultSet},
};

#[derive(Clone)]
pub struct SearchGateway {
    session: AuthSessionManager,
    favorites: FavoritesRegistry,
}

impl SearchGateway {
    pub fn new(session: AuthSessionManager, favorites: FavoritesRegistry) -> Self {
        Self { session, favorites }
    }

    /// Searches artists, events, venues and cities.
    ///
    /// With `auto_search_external` set and nothing found in the Localify
    /// catalog, the Spotify catalog is searched as well and its artists are
    /// appended, tagged [`ResultSource::Spotify`].
    pub async fn search(&self, text: &str, auto_search_external: bool) -> Result<SearchResultSet> {
        let text = non_empty_query(text)?;

        let mut results = self.fetch(text, SearchCatalog::Localify).await?;

        if auto_search_external && results.is_empty() {
            tracing::debug!(query = text, "no local results, searching Spotify");
            let external = self.fetch(text, SearchCatalog::Spotify).await?;
            merge_external(&mut results, external);
            results.external_searched = true;
        }

        self.overlay(&mut results);
        Ok(results)
    }

    /// Artist search, at most `limit` results in upstream order.
    pub async fn search_artists(&self, text: &str, limit: usize) -> Result<Vec<ArtistResult>> {
        let text = non_empty_query(text)?;
        if limit == 0 {
            return Err(ValidationError::InvalidLimit(0).into());
        }

        let transport = Arc::clone(self.session.transport());
        let mut artists = self
            .session
            .authorized(|token| {
                let transport = Arc::clone(&transport);
                async move { transport.search_artists(&token, text, limit).await }
            })
            .await?;

        artists.truncate(limit);
        self.overlay_artists(&mut artists);
        Ok(artists)
    }

    async fn fetch(&self, text: &str, catalog: SearchCatalog) -> Result<SearchResultSet> {
        let transport = Arc::clone(self.session.transport());
        self.session
            .authorized(|token| {
                let transport = Arc::clone(&transport);
                async move { transport.search(&token, text, catalog).await }
            })
            .await
    }

    fn overlay(&self, results: &mut SearchResultSet) {
        self.overlay_artists(&mut results.artists);

        for event in &mut results.events {
            if let Some(known) = self.favorites.known_state(&FavoriteKey::event(&event.id)) {
                event.is_favorite = known;
            }
            self.overlay_artists(&mut event.artists);
        }
        for venue in &mut results.venues {
            if let Some(known) = self.favorites.known_state(&FavoriteKey::venue(&venue.id)) {
                venue.is_favorite = known;
            }
        }
    }

    /// Local knowledge wins; keys the registry has never seen keep the
    /// backend's flag.
    fn overlay_artists(&self, artists: &mut [ArtistResult]) {
        for artist in artists {
            if let Some(known) = self.favorites.known_state(&FavoriteKey::artist(&artist.id)) {
                artist.is_favorite = known;
            }
        }
    }
}

fn non_empty_query(text: &str) -> std::result::Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyQuery)
    } else {
        Ok(trimmed)
    }
}

/// Appends external results, tagging artists with their source and
/// skipping artists already present by Spotify id.
fn merge_external(results: &mut SearchResultSet, external: SearchResultSet) {
    let mut seen: HashSet<String> = results
        .artists
        .iter()
        .filter_map(|a| a.spotify_id.clone())
        .collect();

    for mut artist in external.artists {
        if let Some(spotify_id) = &artist.spotify_id {
            if !seen.insert(spotify_id.clone()) {
                continue;
            }
        }
        artist.source = ResultSource::Spotify;
        results.artists.push(artist);
    }

    results.events.extend(external.events);
    results.venues.extend(external.venues);
    results.cities.extend(external.cities);
}
