use super::HttpTransport;
use crate::{
    error::TransportError,
    types::{FavoriteCategory, FavoriteItem, FavoriteKey},
};

impl HttpTransport {
    fn favorite_url(&self, key: &FavoriteKey) -> String {
        self.url(&format!(
            "/v1/@me/{kind}/{id}/favorite",
            kind = key.category.path_segment(),
            id = key.id
        ))
    }

    pub async fn put_favorite(
        &self,
        access_token: &str,
        key: &FavoriteKey,
    ) -> Result<(), TransportError> {
        let request = self
            .client
            .put(self.favorite_url(key))
            .bearer_auth(access_token);

        self.execute(request).await.map(|_| ())
    }

    pub async fn delete_favorite(
        &self,
        access_token: &str,
        key: &FavoriteKey,
    ) -> Result<(), TransportError> {
        let request = self
            .client
            .delete(self.favorite_url(key))
            .bearer_auth(access_token);

        self.execute(request).await.map(|_| ())
    }

    pub async fn get_favorites(
        &self,
        access_token: &str,
        category: FavoriteCategory,
    ) -> Result<Vec<String>, TransportError> {
        let request = self
            .client
            .get(self.url(&format!(
                "/v1/@me/{kind}/favorites",
                kind = category.path_segment()
            )))
            .bearer_auth(access_token);

        let items: Vec<FavoriteItem> = self.execute_json(request).await?;
        Ok(items.into_iter().map(|item| item.id).collect())
    }
}
