const WHATSAPP_BASE: &str = "https://wa.me/";

/// Builds a WhatsApp click-to-chat link with the order summary pre-filled.
///
/// Without a destination number the link opens WhatsApp's contact picker.
pub fn whatsapp_order_link(contact: Option<&str>, order_summary: &str) -> String {
    let number = contact.map(normalize_contact).unwrap_or_default();
    format!("{WHATSAPP_BASE}{number}?text={}", urlencoding::encode(order_summary))
}

/// Strips the formatting characters people commonly type into phone numbers.
pub fn normalize_contact(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid_contact(raw: &str) -> bool {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    !body.is_empty()
        && body.chars().all(|ch| ch.is_ascii_digit() || ch == ' ' || ch == '-')
        && body.chars().any(|ch| ch.is_ascii_digit())
}
