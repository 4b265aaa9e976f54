use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The wrapper every FTX response arrives in.
///
/// Exactly one of `error` / `result` is populated, selected by `success`.
/// Callers never see this type; the transport unwraps it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    pub error: Option<String>,
    pub result: Option<T>,
}

/// One public trade on a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Unique within a market; the sole deduplication key for history
    /// aggregation.
    pub id: u64,
    pub price: f64,
    pub size: f64,
    pub side: String,
    pub liquidation: bool,
    /// ISO-8601 on the wire.
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub client_id: Option<String>,
    pub market: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: String,
    pub price: Option<f64>,
    pub size: f64,
    pub status: String,
    pub filled_size: f64,
    pub remaining_size: f64,
    pub reduce_only: bool,
    pub ioc: bool,
    pub post_only: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub id: u64,
    pub market: String,
    pub order_id: Option<u64>,
    pub trade_id: Option<u64>,
    pub side: String,
    pub price: f64,
    pub size: f64,
    pub fee: f64,
    pub fee_currency: String,
    pub liquidity: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub coin: String,
    pub free: f64,
    pub total: f64,
    pub usd_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub future: String,
    pub side: String,
    pub size: f64,
    pub net_size: f64,
    pub cost: f64,
    pub entry_price: Option<f64>,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub recent_average_open_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub start_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositAddress {
    pub address: String,
    pub tag: Option<String>,
    pub method: Option<String>,
}

/// Standard resting or market order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub market: String,
    pub side: String,
    /// Absent for market orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub size: f64,
    #[serde(rename = "type")]
    pub order_type: String,
    pub reduce_only: bool,
    pub ioc: bool,
    pub post_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl PlaceOrderRequest {
    pub fn limit(market: impl Into<String>, side: impl Into<String>, price: f64, size: f64) -> Self {
        Self {
            market: market.into(),
            side: side.into(),
            price: Some(price),
            size,
            order_type: "limit".to_string(),
            reduce_only: false,
            ioc: false,
            post_only: false,
            client_id: None,
        }
    }

    pub fn market(market: impl Into<String>, side: impl Into<String>, size: f64) -> Self {
        Self {
            market: market.into(),
            side: side.into(),
            price: None,
            size,
            order_type: "market".to_string(),
            reduce_only: false,
            ioc: false,
            post_only: false,
            client_id: None,
        }
    }
}

/// Kind of conditional order: activates only once its trigger condition
/// is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerOrderType {
    Stop,
    TakeProfit,
    TrailingStop,
}

/// Stop / take-profit / trailing-stop order.
///
/// Stops and take-profits need `trigger_price`; trailing stops need
/// `trail_value` and must not carry a trigger price. Supplying
/// `limit_price` makes the triggered order a limit instead of a market
/// order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceTriggerOrderRequest {
    pub market: String,
    pub side: String,
    pub size: f64,
    #[serde(rename = "type")]
    pub order_type: TriggerOrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_value: Option<f64>,
    #[serde(rename = "orderPrice", skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    pub reduce_only: bool,
    pub cancel_limit_on_trigger: bool,
}

impl PlaceTriggerOrderRequest {
    pub fn stop(market: impl Into<String>, side: impl Into<String>, size: f64, trigger_price: f64) -> Self {
        Self {
            market: market.into(),
            side: side.into(),
            size,
            order_type: TriggerOrderType::Stop,
            trigger_price: Some(trigger_price),
            trail_value: None,
            limit_price: None,
            reduce_only: false,
            cancel_limit_on_trigger: true,
        }
    }

    pub fn trailing_stop(market: impl Into<String>, side: impl Into<String>, size: f64, trail_value: f64) -> Self {
        Self {
            market: market.into(),
            side: side.into(),
            size,
            order_type: TriggerOrderType::TrailingStop,
            trigger_price: None,
            trail_value: Some(trail_value),
            limit_price: None,
            reduce_only: false,
            cancel_limit_on_trigger: true,
        }
    }
}

/// Changes to an existing order. Exactly one of the two identifiers must
/// be set, and at most one of price / size may change per call.
#[derive(Debug, Clone, Default)]
pub struct ModifyOrderRequest {
    pub order_id: Option<u64>,
    pub client_order_id: Option<String>,
    pub price: Option<f64>,
    pub size: Option<f64>,
    /// New client id for the replacement order.
    pub client_id: Option<String>,
}

/// Changes to an existing conditional order.
#[derive(Debug, Clone)]
pub struct ModifyTriggerOrderRequest {
    pub order_type: TriggerOrderType,
    pub trigger_price: Option<f64>,
    pub trail_value: Option<f64>,
    pub size: Option<f64>,
}
