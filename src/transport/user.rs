use super::HttpTransport;
use crate::{error::TransportError, types::UserProfile};

impl HttpTransport {
    pub async fn get_me(&self, access_token: &str) -> Result<UserProfile, TransportError> {
        let request = self
            .client
            .get(self.url("/v1/@me"))
            .bearer_auth(access_token);

        self.execute_json(request).await
    }
}
