//! SOAP-over-HTTP transport to the camera's embedded media server.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::StatusCode;

use crate::config::DeviceConfig;
use crate::error::{Error, Result};

const CONTENT_DIRECTORY_PATH: &str = "/upnp/control/ContentDirectory";
const PUSH_LIST_PATH: &str = "/upnp/control/XPushList";
const SERVICE_DESC_PATH: &str = "/DmsDescPush.xml";

const BROWSE_ACTION: &str = "\"urn:schemas-upnp-org:service:ContentDirectory:1#Browse\"";
const TRANSFER_START_ACTION: &str = "\"urn:schemas-sony-com:service:XPushList:1#X_TransferStart\"";
const TRANSFER_END_ACTION: &str = "\"urn:schemas-sony-com:service:XPushList:1#X_TransferEnd\"";

/// A streamed response body for an asset download.
pub struct FetchBody {
    /// HTTP status of the GET.
    pub status: StatusCode,
    /// Advertised `Content-Length`, if the device sent one.
    pub content_length: Option<u64>,
    /// The body as a chunk stream.
    pub stream: BoxStream<'static, Result<Bytes>>,
}

/// Requests the traversal engine and transfer manager issue against the
/// device. One request is in flight at a time; the embedded server is
/// assumed to handle a single client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Browses one page of a directory's direct children.
    ///
    /// Returns the raw SOAP response body; decoding is the catalog
    /// decoder's job.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] on a non-success status, [`Error::Http`] if the
    /// device is unreachable.
    async fn browse(&self, object_id: &str, starting_index: u32) -> Result<String>;

    /// Opens a plain streamed GET for an asset url advertised by the device.
    async fn fetch(&self, url: &str) -> Result<FetchBody>;

    /// Sends the vendor `X_TransferStart` action. Puts "Transferring..." on
    /// the camera display; only functional in push mode. Best-effort:
    /// failures are logged, never escalated.
    async fn transfer_start(&self);

    /// Sends the vendor `X_TransferEnd` action, leaving the camera's
    /// "send to device" screen. Best-effort like [`transfer_start`].
    ///
    /// [`transfer_start`]: Transport::transfer_start
    async fn transfer_end(&self);

    /// Fetches the device service description (`DmsDescPush.xml`).
    /// Debugging aid only.
    async fn service_description(&self) -> Result<String>;
}

/// Escapes the five XML-special characters for embedding in an envelope.
fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn browse_envelope(object_id: &str, starting_index: u32) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0"?>"#,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
            "<s:Body>",
            r#"<u:Browse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">"#,
            "<ObjectID>{id}</ObjectID>",
            "<BrowseFlag>BrowseDirectChildren</BrowseFlag>",
            "<Filter>*</Filter>",
            "<StartingIndex>{index}</StartingIndex>",
            "<RequestedCount>9999</RequestedCount>",
            "<SortCriteria></SortCriteria>",
            "</u:Browse>",
            "</s:Body>",
            "</s:Envelope>"
        ),
        id = xml_escape(object_id),
        index = starting_index,
    )
}

fn transfer_envelope(action: &str, inner: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
            "<s:Body>",
            r#"<u:{action} xmlns:u="urn:schemas-sony-com:service:XPushList:1">{inner}</u:{action}>"#,
            "</s:Body>",
            "</s:Envelope>"
        ),
        action = action,
        inner = inner,
    )
}

/// Default [`Transport`] implementation over [`reqwest`].
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for the given device.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(device: &DeviceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: device.base_url(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn soap_post(&self, path: &str, action: &str, body: String) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint(path))
            .header("SOAPACTION", action)
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .body(body)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn browse(&self, object_id: &str, starting_index: u32) -> Result<String> {
        let envelope = browse_envelope(object_id, starting_index);
        let response = self
            .soap_post(CONTENT_DIRECTORY_PATH, BROWSE_ACTION, envelope)
            .await?;
        let status = response.status();
        log::debug!("browse {object_id}@{starting_index}: {status}");
        if !status.is_success() {
            return Err(Error::Protocol {
                object_id: object_id.to_string(),
                status,
            });
        }
        Ok(response.text().await?)
    }

    async fn fetch(&self, url: &str) -> Result<FetchBody> {
        let response = self.client.get(url).send().await?;
        Ok(FetchBody {
            status: response.status(),
            content_length: response.content_length(),
            stream: response.bytes_stream().map(|r| r.map_err(Error::Http)).boxed(),
        })
    }

    async fn transfer_start(&self) {
        let envelope = transfer_envelope("X_TransferStart", "");
        match self
            .soap_post(PUSH_LIST_PATH, TRANSFER_START_ACTION, envelope)
            .await
        {
            Ok(response) => log::debug!("transfer start response: {}", response.status()),
            Err(e) => log::warn!("transfer start signal failed: {e}"),
        }
    }

    async fn transfer_end(&self) {
        let envelope = transfer_envelope("X_TransferEnd", "<ErrCode>0</ErrCode>");
        match self
            .soap_post(PUSH_LIST_PATH, TRANSFER_END_ACTION, envelope)
            .await
        {
            Ok(response) => log::debug!("transfer end response: {}", response.status()),
            Err(e) => log::warn!("transfer end signal failed: {e}"),
        }
    }

    async fn service_description(&self) -> Result<String> {
        let response = self.client.get(self.endpoint(SERVICE_DESC_PATH)).send().await?;
        Ok(response.text().await?)
    }
}
