//! Marketplace wire types.
//!
//! The channel-product read returns a deeply nested body of which only the
//! stock fields matter to us, but the update endpoint requires the *entire*
//! representation to be sent back. Every struct therefore keeps a flattened
//! `extra` map so unrecognized fields round-trip verbatim through the
//! read-merge-write cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response envelope normalization.
///
/// The marketplace sometimes nests the payload under `data` and sometimes
/// returns it flat. Downstream code only ever sees the inner shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Flat(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Flat(inner) => inner,
        }
    }
}

/// Scalar product view used by the whole-product pull.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub sale_status: Option<String>,
}

/// Full channel product as fetched from the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProduct {
    pub origin_product: OriginProduct,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_product_no: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_product_no: Option<i64>,

    /// Echoed back unchanged on update; the API rejects bodies missing it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_benefit: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smartstore_channel_product: Option<Value>,

    /// Carries `channelNo`, which the API treats as a required echo field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_channel_product: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginProduct {
    #[serde(default)]
    pub stock_quantity: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_attribute: Option<DetailAttribute>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_info: Option<OptionInfo>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_stock_management: Option<bool>,

    #[serde(default)]
    pub option_combinations: Vec<OptionCombination>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One option combination with its marketplace-side stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCombination {
    pub id: i64,

    #[serde(default)]
    pub option_name1: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_name2: Option<String>,

    /// Seller-managed code; matches the local variant `sku`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_manager_code: Option<String>,

    #[serde(default)]
    pub stock_quantity: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChannelProduct {
    /// Option combinations under marketplace stock management.
    ///
    /// Empty when `optionInfo` is absent or `useStockManagement` is falsy,
    /// which is a valid outcome meaning the product uses single-field stock.
    pub fn option_stocks(&self) -> &[OptionCombination] {
        match self
            .origin_product
            .detail_attribute
            .as_ref()
            .and_then(|detail| detail.option_info.as_ref())
        {
            Some(info) if info.use_stock_management.unwrap_or(false) => &info.option_combinations,
            _ => &[],
        }
    }

    /// Mutable access to the managed option combinations, if any.
    pub fn option_stocks_mut(&mut self) -> Option<&mut Vec<OptionCombination>> {
        match self
            .origin_product
            .detail_attribute
            .as_mut()
            .and_then(|detail| detail.option_info.as_mut())
        {
            Some(info) if info.use_stock_management.unwrap_or(false) => {
                Some(&mut info.option_combinations)
            }
            _ => None,
        }
    }

    /// Whether the marketplace manages stock per option for this product.
    pub fn has_managed_options(&self) -> bool {
        !self.option_stocks().is_empty()
    }
}

/// Stock confirmation echoed by the update endpoint.
#[derive(Debug, Clone, Default)]
pub struct UpdatedStock {
    pub stock_quantity: Option<i64>,
}

impl UpdatedStock {
    /// Extracts the applied stock quantity from an update response, looking
    /// at the top level first and then under `originProduct`.
    pub(crate) fn from_response(body: &Value) -> Self {
        let stock_quantity = body
            .get("stockQuantity")
            .and_then(Value::as_i64)
            .or_else(|| {
                body.get("originProduct")
                    .and_then(|origin| origin.get("stockQuantity"))
                    .and_then(Value::as_i64)
            });
        Self { stock_quantity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel_product_json() -> Value {
        json!({
            "originProduct": {
                "name": "Wool Socks",
                "stockQuantity": 8,
                "saleStatus": "SALE",
                "detailAttribute": {
                    "optionInfo": {
                        "useStockManagement": true,
                        "optionCombinations": [
                            {"id": 101, "optionName1": "Red", "sellerManagerCode": "SOCK-R", "stockQuantity": 5},
                            {"id": 102, "optionName1": "Blue", "stockQuantity": 3}
                        ]
                    },
                    "afterServiceInfo": {"telephone": "000"}
                }
            },
            "originProductNo": 9001,
            "channelProductNo": 7001,
            "customerBenefit": {"immediateDiscountPolicy": {"value": 10}},
            "smartstoreChannelProduct": {"naverShoppingRegistration": true},
            "windowChannelProduct": {"channelNo": 42}
        })
    }

    #[test]
    fn parses_flat_envelope() {
        let parsed: Envelope<ChannelProduct> =
            serde_json::from_value(channel_product_json()).unwrap();
        let product = parsed.into_inner();
        assert_eq!(product.origin_product_no, Some(9001));
        assert_eq!(product.option_stocks().len(), 2);
    }

    #[test]
    fn parses_wrapped_envelope() {
        let parsed: Envelope<ChannelProduct> =
            serde_json::from_value(json!({"data": channel_product_json()})).unwrap();
        let product = parsed.into_inner();
        assert_eq!(product.channel_product_no, Some(7001));
    }

    #[test]
    fn option_stocks_empty_without_stock_management() {
        let mut body = channel_product_json();
        body["originProduct"]["detailAttribute"]["optionInfo"]["useStockManagement"] = json!(false);
        let product: ChannelProduct = serde_json::from_value(body).unwrap();
        assert!(product.option_stocks().is_empty());
        assert!(!product.has_managed_options());

        let no_options: ChannelProduct = serde_json::from_value(json!({
            "originProduct": {"stockQuantity": 4}
        }))
        .unwrap();
        assert!(no_options.option_stocks().is_empty());
    }

    #[test]
    fn unknown_fields_round_trip() {
        let product: ChannelProduct = serde_json::from_value(channel_product_json()).unwrap();
        let serialized = serde_json::to_value(&product).unwrap();

        assert_eq!(
            serialized["windowChannelProduct"]["channelNo"],
            json!(42),
            "required echo field must survive the round trip"
        );
        assert_eq!(
            serialized["customerBenefit"]["immediateDiscountPolicy"]["value"],
            json!(10)
        );
        assert_eq!(
            serialized["originProduct"]["detailAttribute"]["afterServiceInfo"]["telephone"],
            json!("000")
        );
        assert_eq!(
            serialized["originProduct"]["detailAttribute"]["optionInfo"]["optionCombinations"][0]
                ["sellerManagerCode"],
            json!("SOCK-R")
        );
    }

    #[test]
    fn updated_stock_reads_both_shapes() {
        let top = UpdatedStock::from_response(&json!({"stockQuantity": 6}));
        assert_eq!(top.stock_quantity, Some(6));

        let nested =
            UpdatedStock::from_response(&json!({"originProduct": {"stockQuantity": 9}}));
        assert_eq!(nested.stock_quantity, Some(9));

        let missing = UpdatedStock::from_response(&json!({"ok": true}));
        assert_eq!(missing.stock_quantity, None);
    }
}
