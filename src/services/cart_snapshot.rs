use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::models::cart::{
    CartLineItem, FlatCartItem, OrderTotals, RawAmount, RawCartEntry, WrappedCartItem,
};

const ID_SEPARATORS: &[char] = &[':', '-', '_', '|', ',', ';', '/'];

/// Strips trailing separator junk left on identifiers by upstream string joins.
pub fn clean_identifier(raw: &str) -> String {
    raw.trim_start()
        .trim_end_matches(|c: char| c.is_whitespace() || ID_SEPARATORS.contains(&c))
        .to_string()
}

fn clean_optional(raw: Option<&String>) -> Option<String> {
    raw.map(|s| clean_identifier(s)).filter(|s| !s.is_empty())
}

fn whole(amount: Option<&RawAmount>) -> Option<i64> {
    amount.and_then(RawAmount::to_whole)
}

fn from_wrapped(entry: &WrappedCartItem) -> Option<CartLineItem> {
    let product = &entry.product;
    let unit_price = whole(product.discount_price.as_ref()).or_else(|| whole(product.price.as_ref()))?;
    let quantity = entry.quantity.to_whole()?;

    Some(CartLineItem {
        product_id: clean_identifier(&product.id),
        name: product.name.trim().to_string(),
        unit_price,
        quantity,
        sku: product.sku.clone(),
        variation_id: clean_optional(entry.variation_id.as_ref()),
        variation_name: entry.variation_name.clone(),
    })
}

fn from_flattened(entry: &FlatCartItem) -> Option<CartLineItem> {
    Some(CartLineItem {
        product_id: clean_identifier(&entry.product_id),
        name: entry.name.trim().to_string(),
        unit_price: whole(entry.unit_price.as_ref())?,
        quantity: whole(entry.quantity.as_ref())?,
        sku: entry.sku.clone(),
        variation_id: clean_optional(entry.variation_id.as_ref()),
        variation_name: entry.variation_name.clone(),
    })
}

fn is_usable(item: &CartLineItem) -> bool {
    !item.product_id.is_empty() && item.unit_price >= 0 && item.quantity >= 1
}

/// Projects the in-memory cart into canonical line items.
///
/// Entries without a usable id, price or quantity are dropped and logged.
/// This never fails: a corrupt cart entry must not block checkout.
pub fn build_line_items(raw_cart: &[RawCartEntry]) -> Vec<CartLineItem> {
    let items: Vec<CartLineItem> = raw_cart
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let projected = match entry {
                RawCartEntry::Wrapped(wrapped) => from_wrapped(wrapped),
                RawCartEntry::Flattened(flat) => from_flattened(flat),
            };
            match projected {
                Some(item) if is_usable(&item) => Some(item),
                Some(item) => {
                    warn!(
                        index,
                        product_id = %item.product_id,
                        unit_price = item.unit_price,
                        quantity = item.quantity,
                        "Dropping cart entry with unusable price or quantity"
                    );
                    None
                }
                None => {
                    warn!(index, "Dropping cart entry without a price or quantity");
                    None
                }
            }
        })
        .collect();

    debug!(entries = raw_cart.len(), items = items.len(), "Built cart line items");
    items
}

/// Same as [`build_line_items`] for untyped cart JSON. Entries matching
/// neither cart shape are dropped.
pub fn build_line_items_from_json(raw_cart: &[Value]) -> Vec<CartLineItem> {
    let entries: Vec<RawCartEntry> = raw_cart
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(index, error = %e, "Dropping unrecognised cart entry");
                None
            }
        })
        .collect();
    build_line_items(&entries)
}

/// `subtotal = sum(unit_price * quantity)`, `total = subtotal + delivery_fee`.
pub fn compute_totals(items: &[CartLineItem], delivery_fee: i64) -> Result<OrderTotals, ServiceError> {
    if delivery_fee < 0 {
        return Err(ServiceError::InvalidInput(
            "Delivery fee cannot be negative".to_string(),
        ));
    }

    let subtotal = items.iter().try_fold(0i64, |acc, item| {
        item.line_total().and_then(|line| acc.checked_add(line))
    });
    let subtotal = subtotal
        .ok_or_else(|| ServiceError::InvalidInput("Order total is too large".to_string()))?;
    let total = subtotal
        .checked_add(delivery_fee)
        .ok_or_else(|| ServiceError::InvalidInput("Order total is too large".to_string()))?;

    Ok(OrderTotals {
        subtotal,
        delivery_fee,
        total,
    })
}
