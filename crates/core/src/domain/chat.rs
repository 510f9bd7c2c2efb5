use serde::{Deserialize, Serialize};

use crate::order::OrderIntent;

/// A single request/response exchange. Nothing here outlives the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_message: String,
    pub raw_reply: String,
    pub reply: String,
    pub is_order: bool,
    pub order_summary: String,
}

impl ChatTurn {
    pub fn new(user_message: impl Into<String>, raw_reply: impl Into<String>) -> Self {
        let user_message = user_message.into();
        let raw_reply = raw_reply.into();
        let OrderIntent { reply, is_order, order_summary } = OrderIntent::extract(&raw_reply);

        Self { user_message, raw_reply, reply, is_order, order_summary }
    }
}

#[cfg(test)]
mod tests {
    use super::ChatTurn;
    use crate::order::ORDER_ACKNOWLEDGEMENT;

    #[test]
    fn turn_keeps_raw_reply_alongside_extracted_fields() {
        let turn = ChatTurn::new("I'd like to order", "ORDER_CONFIRMED: 1 Red Shoe");

        assert_eq!(turn.user_message, "I'd like to order");
        assert_eq!(turn.raw_reply, "ORDER_CONFIRMED: 1 Red Shoe");
        assert_eq!(turn.reply, ORDER_ACKNOWLEDGEMENT);
        assert!(turn.is_order);
        assert_eq!(turn.order_summary, "1 Red Shoe");
    }

    #[test]
    fn plain_turn_passes_reply_through() {
        let turn = ChatTurn::new("What do you sell?", "We sell shoes and shirts.");

        assert_eq!(turn.reply, "We sell shoes and shirts.");
        assert!(!turn.is_order);
        assert!(turn.order_summary.is_empty());
    }
}
