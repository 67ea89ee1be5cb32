use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use mothball_application::{AuditTableStore, TokenCredential};
use mothball_core::{AppError, AppResult};
use mothball_domain::AuditRow;

/// Scope requested for Table service tokens.
const STORAGE_TOKEN_SCOPE: &str = "https://storage.azure.com/.default";

const TABLE_SERVICE_VERSION: &str = "2019-02-02";

/// Table service adapter for the audit table.
///
/// Rows are written one MERGE request each, without a precondition, which
/// the service treats as insert-or-merge: absent rows are created and
/// existing rows keep any properties the new row does not name.
pub struct AzureTableStore {
    http_client: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    base_url: String,
    table: String,
}

impl AzureTableStore {
    /// Creates a store against one Table service endpoint and table.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        credential: Arc<dyn TokenCredential>,
        base_url: &str,
        table: String,
    ) -> Self {
        Self {
            http_client,
            credential,
            base_url: base_url.trim_end_matches('/').to_owned(),
            table,
        }
    }

    fn entity_url(&self, partition_key: &str, row_key: &str) -> String {
        format!(
            "{}/{}(PartitionKey='{}',RowKey='{}')",
            self.base_url,
            self.table,
            escape_key(partition_key),
            escape_key(row_key)
        )
    }
}

/// Characters that may not appear raw in the entity-address path segment.
/// '%' is included so a literal percent sign in a key is not misread as an
/// escape sequence, '/' so a key cannot introduce a path segment.
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Prepares a free-text key for the entity address: single quotes are
/// doubled per the OData key-literal rules, then the literal is
/// percent-encoded so it survives URL parsing intact.
fn escape_key(key: &str) -> String {
    utf8_percent_encode(&key.replace('\'', "''"), KEY_ENCODE_SET).to_string()
}

fn entity_body(row: &AuditRow) -> Value {
    json!({
        "PartitionKey": row.change,
        "RowKey": row.vm_name,
        "Name": row.vm_name,
        "ResourceGroup": row.resource_group,
        "SubscriptionId": row.subscription_id,
        "Change": row.change,
        "Created": row.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        "Created@odata.type": "Edm.DateTime",
        "RemoveDate": row.remove_date.to_rfc3339_opts(SecondsFormat::Micros, true),
        "RemoveDate@odata.type": "Edm.DateTime",
    })
}

#[async_trait]
impl AuditTableStore for AzureTableStore {
    async fn upsert_merge(&self, rows: &[AuditRow]) -> AppResult<()> {
        let token = self.credential.bearer_token(STORAGE_TOKEN_SCOPE).await?;
        let merge = reqwest::Method::from_bytes(b"MERGE")
            .map_err(|error| AppError::Provider(format!("MERGE method was rejected: {error}")))?;

        for row in rows {
            let response = self
                .http_client
                .request(merge.clone(), self.entity_url(&row.change, &row.vm_name))
                .bearer_auth(&token.secret)
                .header(reqwest::header::ACCEPT, "application/json;odata=nometadata")
                .header("x-ms-version", TABLE_SERVICE_VERSION)
                .header("x-ms-client-request-id", Uuid::new_v4().to_string())
                .json(&entity_body(row))
                .send()
                .await
                .map_err(|error| {
                    AppError::Provider(format!(
                        "audit row write for '{}' failed: {error}",
                        row.vm_name
                    ))
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                return Err(AppError::Provider(format!(
                    "audit row write for '{}' returned status {status}: {body}",
                    row.vm_name
                )));
            }
            debug!(change = row.change.as_str(), vm = row.vm_name.as_str(), "audit row merged");
        }
        Ok(())
    }
}
