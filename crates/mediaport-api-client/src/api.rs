//! Asset registry endpoints: duplicate lookup, write tickets, completion.

use async_trait::async_trait;
use mediaport_core::models::{CompletionNotice, DuplicateCheckResponse, TicketRequest};
use mediaport_core::{AssetRegistry, DuplicateCheck, Fingerprint, RegistryError, WriteTicket};
use serde::Serialize;

use crate::ApiClient;

#[derive(Debug, Serialize)]
struct DuplicateCheckRequest<'a> {
    fingerprint: &'a Fingerprint,
}

#[async_trait]
impl AssetRegistry for ApiClient {
    #[tracing::instrument(skip(self, fingerprint), fields(fingerprint = %fingerprint))]
    async fn check_duplicate(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<DuplicateCheck, RegistryError> {
        let response: DuplicateCheckResponse = self
            .post_json("/assets/duplicates", &DuplicateCheckRequest { fingerprint })
            .await?;
        Ok(response.into())
    }

    #[tracing::instrument(skip(self, request), fields(filename = %request.filename, size = request.size_bytes))]
    async fn request_ticket(&self, request: &TicketRequest) -> Result<WriteTicket, RegistryError> {
        self.post_json("/assets/tickets", request).await
    }

    #[tracing::instrument(skip(self, notice), fields(asset_id = %notice.asset_id))]
    async fn complete_upload(&self, notice: &CompletionNotice) -> Result<(), RegistryError> {
        let path = format!(
            "/assets/{}/complete",
            urlencoding::encode(&notice.asset_id)
        );
        self.post_json_no_content(&path, notice).await
    }
}
