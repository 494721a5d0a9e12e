use serde::{Deserialize, Serialize};

/// A price or quantity as it appears in the in-memory cart.
/// Upstream stores numbers, floats, or numeric strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawAmount {
    /// Whole-unit integer value. Fractions are rounded to the nearest unit.
    pub fn to_whole(&self) -> Option<i64> {
        match self {
            RawAmount::Int(v) => Some(*v),
            RawAmount::Float(v) if v.is_finite() => Some(v.round() as i64),
            RawAmount::Float(_) => None,
            RawAmount::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| {
                        trimmed
                            .parse::<f64>()
                            .ok()
                            .filter(|v| v.is_finite())
                            .map(|v| v.round() as i64)
                    })
            }
        }
    }
}

impl From<i64> for RawAmount {
    fn from(v: i64) -> Self {
        RawAmount::Int(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<RawAmount>,
    #[serde(default, alias = "discount_price")]
    pub discount_price: Option<RawAmount>,
    #[serde(default)]
    pub sku: Option<String>,
}

/// Cart entry in the `{product, quantity}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedCartItem {
    pub product: CartProduct,
    pub quantity: RawAmount,
    #[serde(default, alias = "variation_id")]
    pub variation_id: Option<String>,
    #[serde(default, alias = "variation_name")]
    pub variation_name: Option<String>,
}

/// Cart entry already flattened into a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatCartItem {
    #[serde(alias = "product_id", alias = "id")]
    pub product_id: String,
    #[serde(default, alias = "product_name")]
    pub name: String,
    #[serde(default, alias = "unit_price", alias = "price")]
    pub unit_price: Option<RawAmount>,
    #[serde(default)]
    pub quantity: Option<RawAmount>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, alias = "variation_id")]
    pub variation_id: Option<String>,
    #[serde(default, alias = "variation_name")]
    pub variation_name: Option<String>,
}

/// The two cart shapes seen upstream. `Wrapped` is tried first, so any entry
/// carrying a `product` object is treated as wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCartEntry {
    Wrapped(WrappedCartItem),
    Flattened(FlatCartItem),
}

/// Canonical line item shared by order creation and payment initiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_name: Option<String>,
}

impl CartLineItem {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, unit_price: i64, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
            sku: None,
            variation_id: None,
            variation_name: None,
        }
    }

    /// `unit_price * quantity`, or `None` on overflow.
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_amount_parses_all_shapes() {
        assert_eq!(RawAmount::Int(5).to_whole(), Some(5));
        assert_eq!(RawAmount::Float(4999.6).to_whole(), Some(5000));
        assert_eq!(RawAmount::Text(" 1200 ".into()).to_whole(), Some(1200));
        assert_eq!(RawAmount::Text("12.4".into()).to_whole(), Some(12));
        assert_eq!(RawAmount::Text("abc".into()).to_whole(), None);
    }

    #[test]
    fn wrapped_shape_is_detected() {
        let entry: RawCartEntry = serde_json::from_value(json!({
            "product": { "id": "p1", "name": "Rice", "price": 5000 },
            "quantity": 2
        }))
        .unwrap();
        assert!(matches!(entry, RawCartEntry::Wrapped(_)));
    }

    #[test]
    fn flattened_shape_accepts_snake_case() {
        let entry: RawCartEntry = serde_json::from_value(json!({
            "product_id": "p2",
            "product_name": "Beans",
            "unit_price": "800",
            "quantity": 3
        }))
        .unwrap();
        match entry {
            RawCartEntry::Flattened(item) => {
                assert_eq!(item.product_id, "p2");
                assert_eq!(item.name, "Beans");
                assert_eq!(item.unit_price.and_then(|p| p.to_whole()), Some(800));
            }
            other => panic!("expected flattened entry, got {:?}", other),
        }
    }
}
