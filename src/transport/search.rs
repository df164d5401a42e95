use super::HttpTransport;
use crate::{
    error::TransportError,
    types::{ArtistResult, SearchCatalog, SearchResultSet},
};

impl HttpTransport {
    /// Full-text search across artists, events, venues and cities.
    ///
    /// [`SearchCatalog::Spotify`] asks the backend to fall through to
    /// Spotify's catalog (`autoSearchSpotify=true`).
    pub async fn get_search(
        &self,
        access_token: &str,
        text: &str,
        catalog: SearchCatalog,
    ) -> Result<SearchResultSet, TransportError> {
        let auto_search_spotify = match catalog {
            SearchCatalog::Localify => "false",
            SearchCatalog::Spotify => "true",
        };

        let request = self
            .client
            .get(self.url("/v1/search"))
            .query(&[("q", text), ("autoSearchSpotify", auto_search_spotify)])
            .bearer_auth(access_token);

        self.execute_json(request).await
    }

    pub async fn get_artist_search(
        &self,
        access_token: &str,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ArtistResult>, TransportError> {
        let limit = limit.to_string();
        let request = self
            .client
            .get(self.url("/v1/artists/search"))
            .query(&[("q", text), ("limit", limit.as_str())])
            .bearer_auth(access_token);

        self.execute_json(request).await
    }
}
