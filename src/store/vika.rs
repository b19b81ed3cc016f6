use super::{SheetRecord, SheetStore};
use crate::core::error::StoreError;
use crate::core::fetch::FetchClient;
use crate::providers::build_segment_url;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, instrument};

const PAGE_SIZE: usize = 1000;

/// Client for the Vika datasheet REST API. Fields are addressed by name.
pub struct VikaStore {
    base_url: String,
    token: String,
    view_id: Option<String>,
    fetch: Arc<FetchClient>,
}

#[derive(Debug, Deserialize)]
struct VikaResponse<T> {
    success: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordPage {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    records: Vec<SheetRecord>,
}

impl<T> VikaResponse<T> {
    fn into_data(self) -> Result<Option<T>, StoreError> {
        if !self.success {
            return Err(StoreError::Rejected {
                code: self.code,
                message: self.message,
            });
        }
        Ok(self.data)
    }
}

impl VikaStore {
    pub fn new(
        base_url: &str,
        token: &str,
        view_id: Option<&str>,
        fetch: Arc<FetchClient>,
    ) -> Self {
        VikaStore {
            base_url: base_url.to_string(),
            token: token.to_string(),
            view_id: view_id.map(str::to_string),
            fetch,
        }
    }

    fn records_url(&self, datasheet: &str, params: &[(&str, &str)]) -> Result<String, StoreError> {
        build_segment_url(
            &self.base_url,
            &["fusion", "v1", "datasheets", datasheet, "records"],
            params,
        )
        .map_err(|e| StoreError::InvalidUrl {
            datasheet: datasheet.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<VikaResponse<T>, StoreError> {
        Ok(self
            .fetch
            .send_json(url, |client| client.get(url).bearer_auth(&self.token))
            .await?)
    }
}

#[async_trait]
impl SheetStore for VikaStore {
    #[instrument(name = "VikaQueryAll", skip(self))]
    async fn query_all(&self, datasheet: &str) -> Result<Vec<SheetRecord>, StoreError> {
        let mut records = Vec::new();
        let mut page_num = 1usize;
        let page_size = PAGE_SIZE.to_string();

        loop {
            let page_str = page_num.to_string();
            let mut params = vec![
                ("pageNum", page_str.as_str()),
                ("pageSize", page_size.as_str()),
                ("fieldKey", "name"),
            ];
            if let Some(view_id) = &self.view_id {
                params.push(("viewId", view_id.as_str()));
            }
            let url = self.records_url(datasheet, &params)?;
            debug!("Requesting records page {} from {}", page_num, url);

            let page: RecordPage = self
                .get_page::<RecordPage>(&url)
                .await?
                .into_data()?
                .unwrap_or_default();
            if page.records.is_empty() {
                break;
            }
            records.extend(page.records);
            if records.len() >= page.total {
                break;
            }
            page_num += 1;
        }

        debug!(count = records.len(), "Fetched all records");
        Ok(records)
    }

    #[instrument(name = "VikaUpdate", skip(self, records), fields(count = records.len()))]
    async fn update(&self, datasheet: &str, records: &[SheetRecord]) -> Result<(), StoreError> {
        let url = self.records_url(datasheet, &[("fieldKey", "name")])?;
        let body = json!({ "records": records });

        let response: VikaResponse<Value> = self
            .fetch
            .send_json(&url, |client| {
                client.patch(&url).bearer_auth(&self.token).json(&body)
            })
            .await?;
        response.into_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::tests::test_fetch_client;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RECORDS_PATH: &str = "/fusion/v1/datasheets/dstInstruments/records";

    fn page_body(total: usize, ids: &[&str]) -> String {
        let records: Vec<Value> = ids
            .iter()
            .map(|id| json!({"recordId": id, "createdAt": 1715300000000u64, "fields": {"code": id}}))
            .collect();
        json!({
            "code": 200,
            "success": true,
            "message": "SUCCESS",
            "data": {"total": total, "pageNum": 1, "pageSize": 1000, "records": records}
        })
        .to_string()
    }

    fn store(server: &MockServer, view_id: Option<&str>) -> VikaStore {
        VikaStore::new(&server.uri(), "secret", view_id, test_fetch_client())
    }

    #[tokio::test]
    async fn test_query_all_follows_pages() {
        let mock_server = MockServer::start().await;
        for (page, ids) in [("1", vec!["rec1", "rec2"]), ("2", vec!["rec3"])] {
            Mock::given(method("GET"))
                .and(path(RECORDS_PATH))
                .and(query_param("pageNum", page))
                .and(query_param("fieldKey", "name"))
                .and(header("Authorization", "Bearer secret"))
                .respond_with(ResponseTemplate::new(200).set_body_string(page_body(3, &ids)))
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        let records = store(&mock_server, None)
            .query_all("dstInstruments")
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["rec1", "rec2", "rec3"]);
        assert_eq!(records[2].fields["code"], json!("rec3"));
    }

    #[tokio::test]
    async fn test_query_all_stops_on_empty_page() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .and(query_param("viewId", "viwMain"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_body(5, &[])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let records = store(&mock_server, Some("viwMain"))
            .query_all("dstInstruments")
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success": false, "code": 301, "message": "The datasheet does not exist"}"#,
            ))
            .mount(&mock_server)
            .await;

        let err = store(&mock_server, None)
            .query_all("dstInstruments")
            .await
            .unwrap_err();
        match err {
            StoreError::Rejected { code, message } => {
                assert_eq!(code, 301);
                assert!(message.contains("does not exist"));
            }
            other => panic!("Expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_is_a_fetch_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let err = store(&mock_server, None)
            .query_all("dstInstruments")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_update_sends_records() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(RECORDS_PATH))
            .and(query_param("fieldKey", "name"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_json(json!({
                "records": [
                    {"recordId": "rec1", "fields": {"new_price": 4.512, "new_exchange_price": 1.0}}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"code": 200, "success": true, "message": "SUCCESS", "data": {"records": []}}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let record = SheetRecord::new(
            "rec1",
            json!({"new_price": 4.512, "new_exchange_price": 1.0}),
        );
        store(&mock_server, None)
            .update("dstInstruments", &[record])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bad_base_url_is_not_a_rejection() {
        let store = VikaStore::new("not a url", "secret", None, test_fetch_client());

        let err = store.query_all("dstInstruments").await.unwrap_err();
        match err {
            StoreError::InvalidUrl { datasheet, .. } => assert_eq!(datasheet, "dstInstruments"),
            other => panic!("Expected invalid url, got {other:?}"),
        }

        let err = store.update("dstInstruments", &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidUrl { .. }));
    }
}
