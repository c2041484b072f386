//! Content-addressed chunk identity.
//!
//! A chunk id is the name-based (v5) UUID of the chunk text under the DNS
//! namespace, so identical text yields the identical id on every machine.
//! Two records sharing verbatim text therefore share one chunk.

use uuid::Uuid;

/// Deterministic identifier for `text`.
pub fn content_id(text: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, text.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_for_equal_text() {
        assert_eq!(content_id("进程与线程"), content_id("进程与线程"));
        assert_eq!(content_id(""), content_id(""));
    }

    #[test]
    fn differs_for_different_text() {
        assert_ne!(content_id("stack"), content_id("stack "));
        assert_ne!(content_id("Stack"), content_id("stack"));
    }

    #[test]
    fn matches_known_v5_value() {
        // uuid5(NAMESPACE_DNS, "python.org")
        assert_eq!(
            content_id("python.org"),
            "886313e1-3b8a-5372-9b90-0c9aee199e5d"
        );
    }
}
