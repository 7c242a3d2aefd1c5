//! Domain name syntax checks (RFC 1035, RFC 3696)

use std::net::{Ipv4Addr, Ipv6Addr};

/// Maximum length of a single label
const LABEL_MAX_LENGTH: usize = 63;

/// Check whether `s` is a syntactically valid domain name.
///
/// Presentation format puts a dot before every label but the first, and
/// the terminal empty label is optional. Wire format needs length octets
/// for the first and last labels within 255 bytes, so the effective limit
/// is 253, with 254 allowed only when the final character is a dot.
/// At least one label character must be a letter or underscore.
pub fn is_domain_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    let len = bytes.len();
    if len == 0 || len > 254 || (len == 254 && bytes[len - 1] != b'.') {
        return false;
    }

    let mut last = b'.';
    let mut seen_letter = false;
    let mut label_len = 0;

    for &c in bytes {
        match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                seen_letter = true;
                label_len += 1;
            }
            b'0'..=b'9' => label_len += 1,
            b'-' => {
                // label cannot start with a dash
                if last == b'.' {
                    return false;
                }
                label_len += 1;
            }
            b'.' => {
                if last == b'.' || last == b'-' {
                    return false;
                }
                if label_len > LABEL_MAX_LENGTH || label_len == 0 {
                    return false;
                }
                label_len = 0;
            }
            _ => return false,
        }
        last = c;
    }

    if last == b'-' || label_len > LABEL_MAX_LENGTH {
        return false;
    }
    seen_letter
}

/// Check whether `s` is a bracketed address literal such as
/// `[192.0.2.1]` or `[IPv6:2001:db8::1]`.
pub fn is_address_literal(s: &str) -> bool {
    let Some(inner) = s.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return false;
    };

    match inner.get(..5) {
        Some(tag) if tag.eq_ignore_ascii_case("IPv6:") => inner[5..].parse::<Ipv6Addr>().is_ok(),
        _ => inner.parse::<Ipv4Addr>().is_ok(),
    }
}

/// A HELO argument is acceptable if it is a domain or an address literal
pub fn is_valid_helo_domain(s: &str) -> bool {
    is_domain_name(s) || is_address_literal(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_domains() {
        assert!(is_domain_name("a.test"));
        assert!(is_domain_name("localhost"));
        assert!(is_domain_name("mail-1.example.com"));
        assert!(is_domain_name("example.com."));
        assert!(is_domain_name("_dmarc.example.com"));
        assert!(is_domain_name("123.example"));
        assert!(is_domain_name("Client.Local"));
    }

    #[test]
    fn test_invalid_domains() {
        assert!(!is_domain_name(""));
        assert!(!is_domain_name("."));
        assert!(!is_domain_name("a..b"));
        assert!(!is_domain_name(".a.b"));
        assert!(!is_domain_name("-a.b"));
        assert!(!is_domain_name("a.-b"));
        assert!(!is_domain_name("a-.b"));
        assert!(!is_domain_name("a.b-"));
        assert!(!is_domain_name("a b"));
        assert!(!is_domain_name("café.example.com"));
        assert!(!is_domain_name("a@b"));
    }

    #[test]
    fn test_all_numeric_is_not_a_domain() {
        assert!(!is_domain_name("192.168.0.1"));
        assert!(!is_domain_name("12345"));
    }

    #[test]
    fn test_label_length() {
        let ok = format!("{}.test", "a".repeat(63));
        let too_long = format!("{}.test", "a".repeat(64));
        assert!(is_domain_name(&ok));
        assert!(!is_domain_name(&too_long));
        assert!(!is_domain_name(&"a".repeat(64)));
    }

    #[test]
    fn test_total_length() {
        // 4 labels of 63 plus 3 dots = 255
        let label = "a".repeat(63);
        let long = [label.as_str(); 4].join(".");
        assert_eq!(long.len(), 255);
        assert!(!is_domain_name(&long));

        // 253 characters is the effective maximum
        let max = format!("{}.{}.{}.{}", label, label, label, "a".repeat(61));
        assert_eq!(max.len(), 253);
        assert!(is_domain_name(&max));

        // 254 only with a trailing dot
        let with_dot = format!("{max}.");
        assert!(is_domain_name(&with_dot));
        let without_dot = format!("{}.{}.{}.{}", label, label, label, "a".repeat(62));
        assert_eq!(without_dot.len(), 254);
        assert!(!is_domain_name(&without_dot));
    }

    #[test]
    fn test_address_literals() {
        assert!(is_address_literal("[192.0.2.1]"));
        assert!(is_address_literal("[IPv6:2001:db8::1]"));
        assert!(is_address_literal("[ipv6:::1]"));
        assert!(!is_address_literal("192.0.2.1"));
        assert!(!is_address_literal("[192.0.2]"));
        assert!(!is_address_literal("[2001:db8::1]"));
        assert!(!is_address_literal("[example.com]"));
        assert!(!is_address_literal("["));
    }

    #[test]
    fn test_helo_domain() {
        assert!(is_valid_helo_domain("client.local"));
        assert!(is_valid_helo_domain("[127.0.0.1]"));
        assert!(!is_valid_helo_domain("127.0.0.1"));
        assert!(!is_valid_helo_domain("bad..domain"));
    }

    proptest! {
        #[test]
        fn well_formed_names_are_accepted(
            labels in prop::collection::vec("[a-z][a-z0-9-]{0,20}[a-z0-9]", 1..5)
        ) {
            let name = labels.join(".");
            prop_assert!(is_domain_name(&name));
        }

        #[test]
        fn names_with_empty_labels_are_rejected(
            left in "[a-z]{1,10}",
            right in "[a-z]{1,10}",
        ) {
            let name = format!("{left}..{right}");
            prop_assert!(!is_domain_name(&name));
        }
    }
}
