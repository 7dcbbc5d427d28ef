//! HTTP adapter for the external search index (Typesense-compatible
//! collection API).

use crate::search::{
    build_filters, build_sort, HotelDocument, IndexStats, SearchEngine, SearchParams,
    SearchResult, Suggestion,
};
use crate::ApiError;
use async_trait::async_trait;
use chrono::Utc;
use hotel_gateway_core::config::SearchIndexSettings;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-typesense-api-key";

pub struct TypesenseIndex {
    http: reqwest::Client,
    host: String,
    api_key: String,
    collection: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    document: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SearchReply {
    #[serde(default)]
    found: i64,
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct CollectionReply {
    #[serde(default)]
    num_documents: i64,
}

impl TypesenseIndex {
    pub fn new(settings: &SearchIndexSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            host: settings.host.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            collection: settings.collection.clone(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.host, self.collection)
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "name": self.collection,
            "fields": [
                {"name": "hotel_id", "type": "int64"},
                {"name": "name", "type": "string"},
                {"name": "description", "type": "string"},
                {"name": "phone", "type": "string", "optional": true},
                {"name": "chain", "type": "string", "facet": true, "optional": true},
                {"name": "rating", "type": "float", "facet": true},
                {"name": "star_rating", "type": "int32", "facet": true},
                {"name": "latitude", "type": "float"},
                {"name": "longitude", "type": "float"},
                {"name": "fax", "type": "string", "optional": true},
                {"name": "email", "type": "string", "optional": true},
                {"name": "airport_code", "type": "string", "facet": true, "optional": true},
                {"name": "review_count", "type": "int32", "facet": true},
                {"name": "child_allowed", "type": "bool", "facet": true},
                {"name": "pets_allowed", "type": "bool", "facet": true},
                {"name": "parking", "type": "string", "facet": true, "optional": true},
                {"name": "city", "type": "string", "facet": true, "optional": true},
                {"name": "country", "type": "string", "facet": true, "optional": true},
                {"name": "created_at", "type": "int64", "facet": true},
                {"name": "updated_at", "type": "int64"}
            ]
        })
    }

    /// Create the collection when it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), ApiError> {
        let existing = self
            .http
            .get(self.collection_url())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;

        if existing.status().is_success() {
            debug!(collection = %self.collection, "search collection already exists");
            return Ok(());
        }

        let created = self
            .http
            .post(format!("{}/collections", self.host))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.schema())
            .send()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;

        if !created.status().is_success() {
            let body = created.text().await.unwrap_or_default();
            return Err(ApiError::SearchIndex(format!(
                "failed to create collection: {}",
                body
            )));
        }

        info!(collection = %self.collection, "search collection initialized");
        Ok(())
    }

    async fn run_search(
        &self,
        query: &str,
        query_by: &str,
        page: i64,
        per_page: i64,
        filter_by: &str,
        sort_by: &str,
    ) -> Result<SearchReply, ApiError> {
        let mut query_params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("query_by", query_by.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if !filter_by.is_empty() {
            query_params.push(("filter_by", filter_by.to_string()));
        }
        if !sort_by.is_empty() {
            query_params.push(("sort_by", sort_by.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/documents/search", self.collection_url()))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&query_params)
            .send()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::SearchIndex(format!("search failed: {}", body)));
        }
        response
            .json::<SearchReply>()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))
    }
}

#[async_trait]
impl SearchEngine for TypesenseIndex {
    /// Bulk upsert via the JSONL import endpoint.
    async fn index(&self, documents: &[HotelDocument]) -> Result<(), ApiError> {
        if documents.is_empty() {
            return Ok(());
        }
        let mut body = String::new();
        for document in documents {
            body.push_str(
                &serde_json::to_string(document).map_err(|e| ApiError::SearchIndex(e.to_string()))?,
            );
            body.push('\n');
        }

        let response = self
            .http
            .post(format!(
                "{}/documents/import?action=upsert",
                self.collection_url()
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .header("content-type", "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::SearchIndex(format!("import failed: {}", body)));
        }
        debug!(count = documents.len(), "documents imported into search index");
        Ok(())
    }

    async fn search(&self, params: &SearchParams) -> Result<SearchResult, ApiError> {
        let query = params.q.clone().unwrap_or_else(|| "*".to_string());
        let filters = build_filters(params);
        let sort = build_sort(params);

        let reply = self
            .run_search(
                &query,
                "name,description",
                params.page,
                params.limit,
                &filters,
                &sort,
            )
            .await?;

        let hotels = reply
            .hits
            .into_iter()
            .filter_map(|hit| match serde_json::from_value(hit.document) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(error = %e, "failed to convert index document");
                    None
                }
            })
            .collect();

        Ok(SearchResult {
            hotels,
            total_hits: reply.found,
            page: params.page,
            limit: params.limit,
            total_pages: 0,
        }
        .finalize())
    }

    async fn suggestions(&self, query: &str, limit: i64) -> Result<Vec<Suggestion>, ApiError> {
        let reply = self
            .run_search(query, "name,city,country", 1, limit, "", "")
            .await?;

        Ok(reply
            .hits
            .into_iter()
            .filter_map(|hit| {
                let document = hit.document;
                let name = document.get("name")?.as_str()?.to_string();
                let hotel_id = document.get("hotel_id").and_then(|v| v.as_i64());
                let city = document
                    .get("city")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let country = document
                    .get("country")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let metadata = (!city.is_empty() || !country.is_empty())
                    .then(|| json!({"city": city, "country": country}));
                Some(Suggestion {
                    text: name,
                    kind: "hotel".to_string(),
                    score: 1.0,
                    hotel_id,
                    metadata,
                })
            })
            .collect())
    }

    async fn update_hotel(&self, document: &HotelDocument) -> Result<(), ApiError> {
        self.index(std::slice::from_ref(document)).await
    }

    async fn delete_hotel(&self, hotel_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(format!("{}/documents/{}", self.collection_url(), hotel_id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::SearchIndex(format!(
                "failed to delete hotel {}: {}",
                hotel_id, body
            )));
        }
        Ok(())
    }

    /// Drop and recreate the collection.
    async fn clear_index(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.collection_url())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;
        // 404 just means there was nothing to drop.
        if !response.status().is_success() && response.status().as_u16() != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::SearchIndex(format!("failed to clear index: {}", body)));
        }
        self.ensure_collection().await
    }

    async fn stats(&self) -> Result<IndexStats, ApiError> {
        let response = self
            .http
            .get(self.collection_url())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::SearchIndex(format!("failed to read stats: {}", body)));
        }
        let reply: CollectionReply = response
            .json()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;
        Ok(IndexStats {
            total_documents: reply.num_documents,
            last_updated: Utc::now(),
        })
    }

    async fn health_check(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .get(format!("{}/health", self.host))
            .send()
            .await
            .map_err(|e| ApiError::SearchIndex(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::SearchIndex("index health check failed".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> SearchIndexSettings {
        SearchIndexSettings {
            host: server.uri(),
            api_key: "index-key".to_string(),
            collection: "hotels".to_string(),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn search_builds_query_filter_and_sort_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/hotels/documents/search"))
            .and(header(API_KEY_HEADER, "index-key"))
            .and(query_param("q", "riverside"))
            .and(query_param("query_by", "name,description"))
            .and(query_param("filter_by", "chain:=Accor && rating:>=4"))
            .and(query_param("sort_by", "rating:desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "found": 1,
                "hits": [{"document": {
                    "id": "378772", "hotel_id": 378772, "name": "Riverside",
                    "description": "", "phone": "", "chain": "Accor",
                    "rating": 4.2, "star_rating": 4, "latitude": 0.0,
                    "longitude": 0.0, "fax": "", "email": "",
                    "airport_code": "", "review_count": 10,
                    "child_allowed": true, "pets_allowed": false,
                    "parking": "", "city": "", "country": "",
                    "created_at": 0, "updated_at": 0
                }}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let index = TypesenseIndex::new(&settings(&server)).unwrap();
        let mut params = SearchParams {
            q: Some("riverside".to_string()),
            chain: Some("Accor".to_string()),
            rating_min: Some(4.0),
            sort_by: Some("rating".to_string()),
            ..Default::default()
        };
        params.validate();

        let result = index.search(&params).await.unwrap();
        assert_eq!(result.total_hits, 1);
        assert_eq!(result.hotels[0].hotel_id, 378772);
        assert_eq!(result.total_pages, 1);
    }

    #[tokio::test]
    async fn import_sends_jsonl_upsert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/hotels/documents/import"))
            .and(query_param("action", "upsert"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"success\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let index = TypesenseIndex::new(&settings(&server)).unwrap();
        let hotel = hotel_gateway_core::HotelRecord::new(1, "A");
        index
            .index(&[HotelDocument::from_record(&hotel)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ensure_collection_creates_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/hotels"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "hotels"})))
            .expect(1)
            .mount(&server)
            .await;

        let index = TypesenseIndex::new(&settings(&server)).unwrap();
        index.ensure_collection().await.unwrap();
    }

    #[tokio::test]
    async fn suggestions_carry_location_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/hotels/documents/search"))
            .and(query_param("query_by", "name,city,country"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "found": 1,
                "hits": [{"document": {
                    "hotel_id": 7, "name": "Parkview", "city": "Lisbon", "country": "pt"
                }}]
            })))
            .mount(&server)
            .await;

        let index = TypesenseIndex::new(&settings(&server)).unwrap();
        let suggestions = index.suggestions("park", 5).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].text, "Parkview");
        assert_eq!(suggestions[0].hotel_id, Some(7));
        assert_eq!(suggestions[0].metadata.as_ref().unwrap()["city"], "Lisbon");
    }
}
