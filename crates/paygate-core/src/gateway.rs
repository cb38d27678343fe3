//! Gateway request types.
//!
//! These mirror the gateway's session-style create call; field names are
//! the wire names so the HTTP client can post them unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    /// Our reference id.
    pub trans_id: String,
    pub amount: CreateAmount,
    pub language: String,
    pub urls: CallbackUrls,
    pub order: Order,
    pub customer_info: CustomerInfo,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmount {
    pub value: i64,
    pub currency: String,
    pub tax_total: i64,
    pub net_item_total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackUrls {
    #[serde(rename = "return")]
    pub return_url: String,
    pub cancel: String,
    pub webhook: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    pub quantity: i64,
    /// Basis points, 19% is 1900.
    pub tax_rate: i64,
    pub net_price: i64,
    pub gross_price: i64,
    pub tax_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub email: String,
    pub merchant_customer_id: String,
}

/// What the gateway hands back for a freshly created link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPaymentLink {
    /// Gateway-assigned payment id.
    pub pay_id: String,
    /// URL of the hosted payment page.
    pub link: String,
}
