//! Order-intent extraction from raw model output.
//!
//! The model is instructed to prefix its reply with [`ORDER_SENTINEL`] once the
//! customer confirms a purchase. Detection uses "contains" rather than
//! "starts with": models regularly put a greeting in front of the marker.

use serde::{Deserialize, Serialize};

pub const ORDER_SENTINEL: &str = "ORDER_CONFIRMED:";

/// Shown to the user in place of the model's own wording once an order is detected.
pub const ORDER_ACKNOWLEDGEMENT: &str =
    "Great! Click the button below to send your order details to our WhatsApp.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub reply: String,
    pub is_order: bool,
    pub order_summary: String,
}

impl OrderIntent {
    /// Splits a raw reply into the user-facing message and the order summary.
    ///
    /// Only the first sentinel occurrence is removed; any later occurrence stays
    /// in the summary verbatim.
    pub fn extract(raw_reply: &str) -> Self {
        if !raw_reply.contains(ORDER_SENTINEL) {
            return Self {
                reply: raw_reply.to_string(),
                is_order: false,
                order_summary: String::new(),
            };
        }

        let order_summary = raw_reply.replacen(ORDER_SENTINEL, "", 1).trim().to_string();
        Self { reply: ORDER_ACKNOWLEDGEMENT.to_string(), is_order: true, order_summary }
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderIntent, ORDER_ACKNOWLEDGEMENT, ORDER_SENTINEL};

    #[test]
    fn reply_without_sentinel_passes_through_unchanged() {
        let texts = ["We sell shoes and shirts.", "", "  padded reply  ", "order_confirmed: lower"];

        for text in texts {
            let intent = OrderIntent::extract(text);
            assert!(!intent.is_order, "`{text}` must not be treated as an order");
            assert_eq!(intent.reply, text);
            assert_eq!(intent.order_summary, "");
        }
    }

    #[test]
    fn leading_sentinel_yields_trimmed_summary() {
        let intent = OrderIntent::extract("ORDER_CONFIRMED: 1 Red Shoe");

        assert!(intent.is_order);
        assert_eq!(intent.reply, ORDER_ACKNOWLEDGEMENT);
        assert_eq!(intent.order_summary, "1 Red Shoe");
    }

    #[test]
    fn sentinel_is_detected_anywhere_in_the_reply() {
        let intent =
            OrderIntent::extract("Sure thing!\nORDER_CONFIRMED: 2 Blue Shirts, size M\n");

        assert!(intent.is_order);
        assert_eq!(intent.order_summary, "Sure thing!\n 2 Blue Shirts, size M");
    }

    #[test]
    fn only_the_first_sentinel_is_removed() {
        let raw = format!("{ORDER_SENTINEL} 1 Red Shoe {ORDER_SENTINEL} again");
        let intent = OrderIntent::extract(&raw);

        assert!(intent.is_order);
        assert_eq!(intent.order_summary, format!("1 Red Shoe {ORDER_SENTINEL} again"));
    }

    #[test]
    fn bare_sentinel_gives_empty_summary() {
        let intent = OrderIntent::extract("   ORDER_CONFIRMED:   ");

        assert!(intent.is_order);
        assert_eq!(intent.order_summary, "");
        assert_eq!(intent.reply, ORDER_ACKNOWLEDGEMENT);
    }
}
