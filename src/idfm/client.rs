use reqwest::{header, RequestBuilder};
use url::Url;

use super::entities::{ReferenceRecords, StopMonitoringResponse};
use super::error::{IdfmError, IdfmResult};
use crate::config::Config;

/// Client for the Ile-de-France Mobilites APIs: the authenticated real-time
/// stop monitoring feed and the public line reference dataset.
#[derive(Clone)]
pub struct IdfmClient {
    client: reqwest::Client,
    api_key: String,
    stop_monitoring_url: Url,
    lines_reference_url: Url,
}

impl IdfmClient {
    pub fn new(config: &Config) -> IdfmResult<IdfmClient> {
        let parse = |url: &str| {
            Url::parse(url).map_err(|e| IdfmError::Init(format!("Invalid URL {}: {}", url, e)))
        };

        let client = IdfmClient {
            client: reqwest::Client::builder().build()?,
            api_key: config.api_key.clone(),
            stop_monitoring_url: parse(&config.stop_monitoring_url)?,
            lines_reference_url: parse(&config.lines_reference_url)?,
        };

        Ok(client)
    }

    fn stop_monitoring_url(&self, stop_ref: &str) -> Url {
        let mut url = self.stop_monitoring_url.clone();
        url.query_pairs_mut().append_pair("MonitoringRef", stop_ref);
        url
    }

    fn line_reference_url(&self, line_id: &str) -> Url {
        let mut url = self.lines_reference_url.clone();
        url.query_pairs_mut()
            .append_pair("where", &format!("id_line=\"{}\"", line_id))
            .append_pair("limit", "1");
        url
    }

    async fn request<T>(&self, request: RequestBuilder, url: &Url) -> IdfmResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        log::debug!("Requesting {}", url);
        let response = request.header(header::ACCEPT, "application/json").send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdfmError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let data_str = response.text().await?;
        log::trace!("Response: {}", data_str);
        let data = serde_json::from_str(&data_str)?;

        Ok(data)
    }

    pub async fn get_stop_monitoring(&self, stop_ref: &str) -> IdfmResult<StopMonitoringResponse> {
        let url = self.stop_monitoring_url(stop_ref);
        let request = self
            .client
            .get(url.clone())
            .header("apikey", &self.api_key);
        self.request(request, &url).await
    }

    /// The raw reference record for a line, exactly as the dataset returns it
    pub async fn get_line_record(&self, line_id: &str) -> IdfmResult<serde_json::Value> {
        let url = self.line_reference_url(line_id);
        let request = self.client.get(url.clone());
        let records: ReferenceRecords = self.request(request, &url).await?;

        records
            .results
            .into_iter()
            .next()
            .ok_or_else(|| IdfmError::LineNotFound(line_id.to_string()))
    }
}
