use chrono::Utc;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::history;
use crate::signer::Signer;
use crate::throttle::Throttle;
use crate::types::{
    Balance, Candle, DepositAddress, Envelope, Fill, ModifyOrderRequest,
    ModifyTriggerOrderRequest, Order, PlaceOrderRequest, PlaceTriggerOrderRequest, Position,
    Trade, TriggerOrderType,
};

pub const DEFAULT_BASE_URL: &str = "https://ftx.com/api";

/// Authenticated FTX REST client.
///
/// Holds one HTTP connection pool, reused across sequential calls. Every
/// public method goes through the throttle, so back-to-back calls are
/// spaced by at least the floor. Not intended for concurrent use from
/// multiple tasks; synchronize externally if you need that.
pub struct FtxClient {
    http: reqwest::Client,
    signer: Signer,
    throttle: Throttle,
    base_url: String,
}

impl FtxClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(credentials: Credentials, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            signer: Signer::new(credentials),
            throttle: Throttle::default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, params).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, params).await
    }

    async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, params).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<T, ApiError> {
        self.throttle.pace(self.dispatch(method, path, params)).await
    }

    /// Sign and send one request, then unwrap the response envelope.
    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<T, ApiError> {
        let (url, request_path, body) = build_request(&self.base_url, &method, path, params)?;

        // Captured immediately before signing to minimize clock-to-send
        // skew.
        let timestamp_ms = Utc::now().timestamp_millis();
        let headers = self
            .signer
            .headers(&method, &request_path, &body, timestamp_ms)?;

        debug!("{} {}", method, request_path);

        let mut request = self.http.request(method, url).headers(headers);
        if !body.is_empty() {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        decode_response(status, &text)
    }

    // --- endpoint catalog ------------------------------------------------

    pub async fn list_futures(&self) -> Result<Vec<Value>, ApiError> {
        self.get("futures", None).await
    }

    pub async fn list_markets(&self) -> Result<Vec<Value>, ApiError> {
        self.get("markets", None).await
    }

    pub async fn get_orderbook(&self, market: &str, depth: Option<u32>) -> Result<Value, ApiError> {
        self.get(
            &format!("markets/{}/orderbook", market),
            Some(object(json!({ "depth": depth }))),
        )
        .await
    }

    /// One page of public trades, newest first, at most 100 records. Times
    /// are epoch seconds. Use [`FtxClient::get_all_trades`] for an
    /// exhaustive window.
    pub async fn get_trades(
        &self,
        market: &str,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> Result<Vec<Trade>, ApiError> {
        self.get(
            &format!("markets/{}/trades", market),
            Some(object(json!({
                "start_time": start_time,
                "end_time": end_time,
            }))),
        )
        .await
    }

    /// Complete, deduplicated trade history for `[start_time, end_time]`,
    /// paging backward through the 100-record limit.
    pub async fn get_all_trades(
        &self,
        market: &str,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> Result<Vec<Trade>, ApiError> {
        history::fetch_all_trades(self, market, start_time, end_time).await
    }

    pub async fn get_account_info(&self) -> Result<Value, ApiError> {
        self.get("account", None).await
    }

    pub async fn get_open_orders(&self, market: Option<&str>) -> Result<Vec<Order>, ApiError> {
        self.get("orders", Some(object(json!({ "market": market })))).await
    }

    pub async fn get_order_history(
        &self,
        market: Option<&str>,
        side: Option<&str>,
        order_type: Option<&str>,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> Result<Vec<Order>, ApiError> {
        self.get(
            "orders/history",
            Some(object(json!({
                "market": market,
                "side": side,
                "orderType": order_type,
                "start_time": start_time,
                "end_time": end_time,
            }))),
        )
        .await
    }

    pub async fn get_trigger_orders(&self, market: Option<&str>) -> Result<Vec<Value>, ApiError> {
        self.get("conditional_orders", Some(object(json!({ "market": market }))))
            .await
    }

    pub async fn get_trigger_order_history(
        &self,
        market: Option<&str>,
        side: Option<&str>,
        trigger_type: Option<&str>,
        order_type: Option<&str>,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> Result<Vec<Value>, ApiError> {
        self.get(
            "conditional_orders/history",
            Some(object(json!({
                "market": market,
                "side": side,
                "type": trigger_type,
                "orderType": order_type,
                "start_time": start_time,
                "end_time": end_time,
            }))),
        )
        .await
    }

    pub async fn get_historical_prices(
        &self,
        market: &str,
        resolution: u32,
        limit: Option<u32>,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> Result<Vec<Candle>, ApiError> {
        self.get(
            &format!("markets/{}/candles", market),
            Some(object(json!({
                "resolution": resolution,
                "limit": limit,
                "start_time": start_time,
                "end_time": end_time,
            }))),
        )
        .await
    }

    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<Order, ApiError> {
        let params = object(serde_json::to_value(&request)?);
        self.post("orders", Some(params)).await
    }

    pub async fn place_trigger_order(
        &self,
        request: PlaceTriggerOrderRequest,
    ) -> Result<Value, ApiError> {
        match request.order_type {
            TriggerOrderType::Stop | TriggerOrderType::TakeProfit => {
                if request.trigger_price.is_none() {
                    return Err(ApiError::InvalidRequest(
                        "Stop and take-profit orders need a trigger price".to_string(),
                    ));
                }
            }
            TriggerOrderType::TrailingStop => {
                if request.trail_value.is_none() {
                    return Err(ApiError::InvalidRequest(
                        "Trailing stops need a trail value".to_string(),
                    ));
                }
                if request.trigger_price.is_some() {
                    return Err(ApiError::InvalidRequest(
                        "Trailing stops cannot take a trigger price".to_string(),
                    ));
                }
            }
        }

        let params = object(serde_json::to_value(&request)?);
        self.post("conditional_orders", Some(params)).await
    }

    pub async fn modify_order(&self, request: ModifyOrderRequest) -> Result<Order, ApiError> {
        let path = match (&request.order_id, &request.client_order_id) {
            (Some(id), None) => format!("orders/{}/modify", id),
            (None, Some(client_id)) => format!("orders/by_client_id/{}/modify", client_id),
            _ => {
                return Err(ApiError::InvalidRequest(
                    "Supply exactly one of order_id or client_order_id".to_string(),
                ));
            }
        };
        if request.price.is_some() && request.size.is_some() {
            return Err(ApiError::InvalidRequest(
                "Modify either price or size of an order, not both".to_string(),
            ));
        }

        self.post(
            &path,
            Some(object(json!({
                "price": request.price,
                "size": request.size,
                "clientId": request.client_id,
            }))),
        )
        .await
    }

    pub async fn modify_trigger_order(
        &self,
        order_id: u64,
        request: ModifyTriggerOrderRequest,
    ) -> Result<Value, ApiError> {
        match request.order_type {
            TriggerOrderType::TrailingStop => {
                if request.trail_value.is_none() && request.size.is_none() {
                    return Err(ApiError::InvalidRequest(
                        "A trailing stop modify must change trail_value or size".to_string(),
                    ));
                }
            }
            _ => {
                if request.trigger_price.is_none() && request.size.is_none() {
                    return Err(ApiError::InvalidRequest(
                        "A stop or take-profit modify must change trigger_price or size"
                            .to_string(),
                    ));
                }
            }
        }

        self.post(
            &format!("conditional_orders/{}/modify", order_id),
            Some(object(json!({
                "size": request.size,
                "triggerPrice": request.trigger_price,
                "trailValue": request.trail_value,
            }))),
        )
        .await
    }

    pub async fn cancel_order(&self, order_id: u64) -> Result<String, ApiError> {
        self.delete(&format!("orders/{}", order_id), None).await
    }

    pub async fn cancel_trigger_order(&self, order_id: u64) -> Result<String, ApiError> {
        self.delete(&format!("conditional_orders/{}", order_id), None).await
    }

    pub async fn cancel_all_orders(
        &self,
        market: Option<&str>,
        trigger_orders_only: bool,
        limit_orders_only: bool,
    ) -> Result<String, ApiError> {
        self.delete(
            "orders",
            Some(object(json!({
                "market": market,
                "conditionalOrdersOnly": trigger_orders_only,
                "limitOrdersOnly": limit_orders_only,
            }))),
        )
        .await
    }

    pub async fn get_fills(&self) -> Result<Vec<Fill>, ApiError> {
        self.get("fills", None).await
    }

    pub async fn get_balances(&self) -> Result<Vec<Balance>, ApiError> {
        self.get("wallet/balances", None).await
    }

    pub async fn get_deposit_address(&self, ticker: &str) -> Result<DepositAddress, ApiError> {
        self.get(&format!("wallet/deposit_address/{}", ticker), None).await
    }

    pub async fn get_positions(&self, show_avg_price: bool) -> Result<Vec<Position>, ApiError> {
        self.get("positions", Some(object(json!({ "showAvgPrice": show_avg_price }))))
            .await
    }

    pub async fn get_position(
        &self,
        name: &str,
        show_avg_price: bool,
    ) -> Result<Option<Position>, ApiError> {
        let positions = self.get_positions(show_avg_price).await?;
        Ok(positions.into_iter().find(|p| p.future == name))
    }

    pub async fn transfer_to_subaccount(
        &self,
        coin: &str,
        size: f64,
        source: Option<&str>,
        destination: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.post(
            "subaccounts/transfer",
            Some(object(json!({
                "coin": coin,
                "size": size,
                "source": source,
                "destination": destination,
            }))),
        )
        .await
    }
}

/// Unwrap the FTX envelope, or classify the failure.
///
/// A body that does not decode as an envelope is a transport-level
/// failure: the HTTP status is surfaced if it was an error, otherwise the
/// decode error itself. `success: false` becomes a domain error carrying
/// the server's message verbatim.
fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, ApiError> {
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            if !status.is_success() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    body: snippet(body),
                });
            }
            return Err(ApiError::Parse(err.to_string()));
        }
    };

    if !envelope.success {
        return Err(ApiError::Exchange(envelope.error.unwrap_or_default()));
    }
    envelope
        .result
        .ok_or_else(|| ApiError::Parse("Success response carried no result".to_string()))
}

/// Assemble the final URL, the signable request path (path plus query,
/// no scheme or host), and the body bytes for one request.
///
/// Absent parameters are stripped here, before anything is encoded or
/// signed: they must not reach the wire, since their presence would
/// change both the signed payload and the server's interpretation.
fn build_request(
    base_url: &str,
    method: &Method,
    path: &str,
    params: Option<Map<String, Value>>,
) -> Result<(Url, String, Vec<u8>), ApiError> {
    let params = params.map(strip_nulls).filter(|map| !map.is_empty());

    let mut url = Url::parse(&format!("{}/{}", base_url, path))
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid URL: {}", e)))?;

    let mut body = Vec::new();
    if *method == Method::GET {
        if let Some(ref map) = params {
            url.set_query(Some(&query_string(map)));
        }
    } else if let Some(ref map) = params {
        body = serde_json::to_vec(map)?;
    }

    let request_path = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };

    Ok((url, request_path, body))
}

fn strip_nulls(mut params: Map<String, Value>) -> Map<String, Value> {
    params.retain(|_, value| !value.is_null());
    params
}

fn query_string(params: &Map<String, Value>) -> String {
    let pairs: Vec<String> = params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", key, urlencoding::encode(&value))
        })
        .collect();
    pairs.join("&")
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn snippet(body: &str) -> String {
    const LIMIT: usize = 256;
    if body.len() <= LIMIT {
        body.to_string()
    } else {
        let mut end = LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FtxClient {
        // Unroutable base URL: these tests must fail before any I/O.
        FtxClient::with_base_url(Credentials::new("key", "secret"), "http://127.0.0.1:9/api")
    }

    #[test]
    fn strip_nulls_drops_absent_parameters() {
        let params = strip_nulls(object(json!({ "a": 1, "b": null })));
        assert!(params.contains_key("a"));
        assert!(!params.contains_key("b"));
    }

    #[test]
    fn get_request_path_omits_stripped_parameters() {
        let (_, request_path, body) = build_request(
            DEFAULT_BASE_URL,
            &Method::GET,
            "orders",
            Some(object(json!({ "a": 1, "b": null }))),
        )
        .unwrap();
        assert_eq!(request_path, "/api/orders?a=1");
        assert!(body.is_empty());
    }

    #[test]
    fn signed_payload_reflects_the_stripped_form() {
        let signer = Signer::new(Credentials::new("key", "secret"));
        let ts = 1609459200000;

        let (_, path_with_null, body_with_null) = build_request(
            DEFAULT_BASE_URL,
            &Method::POST,
            "orders",
            Some(object(json!({ "a": 1, "b": null }))),
        )
        .unwrap();
        let (_, path_without, body_without) = build_request(
            DEFAULT_BASE_URL,
            &Method::POST,
            "orders",
            Some(object(json!({ "a": 1 }))),
        )
        .unwrap();

        assert_eq!(body_with_null, body_without);
        assert!(!String::from_utf8(body_with_null.clone()).unwrap().contains('b'));

        let headers_with_null = signer
            .headers(&Method::POST, &path_with_null, &body_with_null, ts)
            .unwrap();
        let headers_without = signer
            .headers(&Method::POST, &path_without, &body_without, ts)
            .unwrap();
        assert_eq!(
            headers_with_null[crate::signer::SIGN_HEADER],
            headers_without[crate::signer::SIGN_HEADER]
        );
    }

    #[test]
    fn query_string_encodes_values() {
        let params = object(json!({ "market": "BTC/USD", "depth": 20 }));
        assert_eq!(query_string(&params), "depth=20&market=BTC%2FUSD");
    }

    #[test]
    fn envelope_success_is_unwrapped() {
        let result: Value =
            decode_response(StatusCode::OK, r#"{"success": true, "result": {"x": 1}}"#).unwrap();
        assert_eq!(result, json!({"x": 1}));
    }

    #[test]
    fn envelope_failure_carries_the_server_message() {
        let result: Result<Value, ApiError> =
            decode_response(StatusCode::OK, r#"{"success": false, "error": "bad request"}"#);
        match result {
            Err(ApiError::Exchange(message)) => assert_eq!(message, "bad request"),
            other => panic!("expected exchange error, got {:?}", other),
        }
    }

    #[test]
    fn undecodable_error_body_surfaces_the_status() {
        let result: Result<Value, ApiError> =
            decode_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        match result {
            Err(ApiError::Status { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn undecodable_success_body_is_a_parse_error() {
        let result: Result<Value, ApiError> = decode_response(StatusCode::OK, "not json");
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }

    #[tokio::test]
    async fn modify_order_rejects_both_identifiers() {
        let request = ModifyOrderRequest {
            order_id: Some(42),
            client_order_id: Some("my-id".to_string()),
            price: Some(10.0),
            ..Default::default()
        };
        let result = client().modify_order(request).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn modify_order_rejects_neither_identifier() {
        let result = client().modify_order(ModifyOrderRequest::default()).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn stop_order_without_trigger_price_is_rejected() {
        let mut request = PlaceTriggerOrderRequest::stop("BTC-PERP", "sell", 1.0, 100.0);
        request.trigger_price = None;
        let result = client().place_trigger_order(request).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn trailing_stop_with_trigger_price_is_rejected() {
        let mut request = PlaceTriggerOrderRequest::trailing_stop("BTC-PERP", "sell", 1.0, -50.0);
        request.trigger_price = Some(100.0);
        let result = client().place_trigger_order(request).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn trigger_order_modify_must_change_something() {
        let request = ModifyTriggerOrderRequest {
            order_type: TriggerOrderType::Stop,
            trigger_price: None,
            trail_value: None,
            size: None,
        };
        let result = client().modify_trigger_order(42, request).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }
}
