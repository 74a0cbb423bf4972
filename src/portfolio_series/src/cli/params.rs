use crate::models::account::OrderStatusFilter;

/// Parses an order status filter, case-insensitively.
pub fn parse_order_status(raw: &str) -> Result<OrderStatusFilter, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "open" => Ok(OrderStatusFilter::Open),
        "closed" => Ok(OrderStatusFilter::Closed),
        "all" => Ok(OrderStatusFilter::All),
        other => Err(format!("invalid order status {other:?} (expected open, closed or all)")),
    }
}
