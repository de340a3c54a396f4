use std::collections::BTreeMap;
use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};

use crate::config::Settings;
use crate::error::{Context, HistoryError};
use crate::history::DerivativesContract;
use crate::records::Record;
use crate::utils::{api_date, expiry_code};

use super::cache::CacheArgs;
use super::decode::extract_records;
use super::ranges::DateRange;
use super::{FetchResult, HistorySource};

/// Arguments of one equity history request.
#[derive(Debug, Clone, PartialEq)]
pub struct StockChunk {
    pub symbol: String,
    pub range: DateRange,
    pub series: String,
}

impl StockChunk {
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", self.symbol.clone()),
            ("from", api_date(self.range.start)),
            ("to", api_date(self.range.end)),
            ("series", format!("[\"{}\"]", self.series)),
        ]
    }
}

impl CacheArgs for StockChunk {
    fn cache_key_parts(&self) -> Vec<String> {
        vec![
            self.symbol.clone(),
            api_date(self.range.start),
            api_date(self.range.end),
            self.series.clone(),
        ]
    }
}

/// Arguments of one derivatives history request.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativesChunk {
    pub symbol: String,
    pub range: DateRange,
    pub contract: DerivativesContract,
}

impl DerivativesChunk {
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", self.symbol.clone()),
            ("from", api_date(self.range.start)),
            ("to", api_date(self.range.end)),
            ("expiryDate", expiry_code(self.contract.expiry())),
            (
                "instrumentType",
                self.contract.instrument().code().to_string(),
            ),
        ];

        if let Some(leg) = self.contract.option_leg() {
            params.push(("strikePrice", format!("{:.2}", leg.strike_price)));
            params.push(("optionType", leg.option_type.code().to_string()));
        }

        params
    }
}

impl CacheArgs for DerivativesChunk {
    fn cache_key_parts(&self) -> Vec<String> {
        let (strike, option_type) = match self.contract.option_leg() {
            Some(leg) => (
                format!("{:.2}", leg.strike_price),
                leg.option_type.code().to_string(),
            ),
            None => ("None".to_string(), "None".to_string()),
        };

        vec![
            self.symbol.clone(),
            api_date(self.range.start),
            api_date(self.range.end),
            api_date(self.contract.expiry()),
            self.contract.instrument().code().to_string(),
            strike,
            option_type,
        ]
    }
}

/// HTTP session against the exchange's historical endpoints.
///
/// The client keeps a cookie store so that cookies handed out by the site are replayed
/// on later chunk requests, like a browser session would.
#[derive(Debug, Clone)]
pub struct NseTransport {
    client: Client,
    stock_url: Url,
    derivatives_url: Url,
}

impl NseTransport {
    pub fn new(settings: &Settings) -> FetchResult<Self> {
        let base = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid base URL {}", settings.base_url))?;
        let stock_url = base
            .join(&settings.endpoints.stock_history)
            .context("Invalid stock history endpoint")?;
        let derivatives_url = base
            .join(&settings.endpoints.derivatives)
            .context("Invalid derivatives endpoint")?;

        let mut builder = Client::builder()
            .default_headers(build_headers(&settings.headers)?)
            .cookie_store(true)
            .danger_accept_invalid_certs(!settings.ssl_verify);
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .context("Failed to construct history HTTP client")?;

        Ok(Self {
            client,
            stock_url,
            derivatives_url,
        })
    }

    async fn get_records(
        &self,
        url: &Url,
        params: &[(&'static str, String)],
        what: &str,
    ) -> FetchResult<Vec<Record>> {
        debug!("GET {url} {params:?}");

        let response = self
            .client
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|err| HistoryError::remote(format!("{what} request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::remote(format!(
                "{what} request returned status {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|err| HistoryError::remote(format!("Failed to read {what} body: {err}")))?;

        extract_records(&body, what)
    }
}

impl HistorySource for NseTransport {
    async fn stock_chunk(&self, chunk: &StockChunk) -> FetchResult<Vec<Record>> {
        let what = format!("{} stock history", chunk.symbol);
        self.get_records(&self.stock_url, &chunk.query_params(), &what)
            .await
    }

    async fn derivatives_chunk(&self, chunk: &DerivativesChunk) -> FetchResult<Vec<Record>> {
        let what = format!("{} derivatives history", chunk.symbol);
        self.get_records(&self.derivatives_url, &chunk.query_params(), &what)
            .await
    }
}

pub fn build_headers(headers: &BTreeMap<String, String>) -> FetchResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .with_context(|| format!("Invalid header name: {key}"))?;
        let header_value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid header value for {key}"))?;
        map.insert(name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::DerivativesContract;
    use chrono::NaiveDate;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range() -> DateRange {
        DateRange {
            start: date(2020, 1, 1),
            end: date(2020, 1, 31),
        }
    }

    #[test]
    fn stock_params_use_api_formats() {
        let chunk = StockChunk {
            symbol: "SBIN".into(),
            range: range(),
            series: "EQ".into(),
        };

        assert_eq!(
            chunk.query_params(),
            vec![
                ("symbol", "SBIN".to_string()),
                ("from", "01-01-2020".to_string()),
                ("to", "31-01-2020".to_string()),
                ("series", "[\"EQ\"]".to_string()),
            ]
        );
        assert_eq!(
            chunk.cache_key_parts(),
            vec!["SBIN", "01-01-2020", "31-01-2020", "EQ"]
        );
    }

    #[test]
    fn option_params_carry_strike_and_type() {
        let contract =
            DerivativesContract::parse(date(2020, 1, 30), "OPTIDX", Some(12000.0), Some("CE"))
                .unwrap();
        let chunk = DerivativesChunk {
            symbol: "NIFTY".into(),
            range: range(),
            contract,
        };

        let params = chunk.query_params();
        assert!(params.contains(&("expiryDate", "30-JAN-2020".to_string())));
        assert!(params.contains(&("instrumentType", "OPTIDX".to_string())));
        assert!(params.contains(&("strikePrice", "12000.00".to_string())));
        assert!(params.contains(&("optionType", "CE".to_string())));
        assert_eq!(
            chunk.cache_key_parts(),
            vec![
                "NIFTY",
                "01-01-2020",
                "31-01-2020",
                "30-01-2020",
                "OPTIDX",
                "12000.00",
                "CE"
            ]
        );
    }

    #[test]
    fn future_params_omit_option_fields() {
        let contract =
            DerivativesContract::parse(date(2020, 1, 30), "FUTSTK", None, None).unwrap();
        let chunk = DerivativesChunk {
            symbol: "SBIN".into(),
            range: range(),
            contract,
        };

        let params = chunk.query_params();
        assert_eq!(params.len(), 5);
        assert!(params.iter().all(|(key, _)| *key != "strikePrice"));
        assert_eq!(chunk.cache_key_parts()[5..], ["None", "None"]);
    }

    #[test]
    fn builds_static_headers() {
        let headers = BTreeMap::from([
            ("User-Agent".to_string(), "Mozilla/5.0".to_string()),
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
        ]);

        let map = build_headers(&headers).unwrap();
        assert_eq!(map.get("user-agent").unwrap(), "Mozilla/5.0");
        assert_eq!(map.get("x-requested-with").unwrap(), "XMLHttpRequest");
    }

    #[test]
    fn rejects_bad_header_names() {
        let headers = BTreeMap::from([("Bad Header".to_string(), "x".to_string())]);
        assert!(build_headers(&headers).is_err());
    }

    #[test]
    fn header_values_are_sent_verbatim() {
        let headers = BTreeMap::from([("X-Template".to_string(), "${HOME}".to_string())]);

        let map = build_headers(&headers).unwrap();
        assert_eq!(map.get("x-template").unwrap(), "${HOME}");
    }

    #[test]
    fn resolves_endpoints_against_base_url() {
        let transport = NseTransport::new(&Settings::default()).unwrap();
        assert_eq!(
            transport.stock_url.as_str(),
            "https://www.nseindia.com/api/historical/cm/equity"
        );
        assert_eq!(
            transport.derivatives_url.as_str(),
            "https://www.nseindia.com/api/historical/fo/derivatives"
        );
    }

    /// Answer a single HTTP request with `status` and `body`, then close.
    async fn serve_once(status: &'static str, body: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        addr
    }

    fn local_transport(addr: SocketAddr) -> NseTransport {
        let settings = Settings {
            base_url: format!("http://{addr}"),
            ..Settings::default()
        };
        NseTransport::new(&settings).unwrap()
    }

    fn sbin_chunk() -> StockChunk {
        StockChunk {
            symbol: "SBIN".into(),
            range: range(),
            series: "EQ".into(),
        }
    }

    #[tokio::test]
    async fn error_status_is_a_remote_failure() {
        let addr = serve_once("503 Service Unavailable", "").await;
        let transport = local_transport(addr);

        let err = transport.stock_chunk(&sbin_chunk()).await.unwrap_err();
        match err {
            HistoryError::RemoteFetch(msg) => assert!(msg.contains("503"), "{msg}"),
            other => panic!("expected remote failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_a_remote_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = local_transport(addr)
            .stock_chunk(&sbin_chunk())
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::RemoteFetch(_)));
    }

    #[tokio::test]
    async fn successful_response_yields_data_rows() {
        let addr = serve_once(
            "200 OK",
            r#"{"data": [{"CH_SYMBOL": "SBIN", "CH_CLOSING_PRICE": 334.45}, {"CH_SYMBOL": "SBIN", "CH_CLOSING_PRICE": 339.3}], "meta": {}}"#,
        )
        .await;

        let records = local_transport(addr)
            .stock_chunk(&sbin_chunk())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["CH_SYMBOL"], "SBIN");
        assert_eq!(records[1]["CH_CLOSING_PRICE"], 339.3);
    }
}
