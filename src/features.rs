use crate::types::FeatureRecord;
use once_cell::sync::Lazy;
use regex::Regex;

// Dotted-quad shape only. Octets are not range checked.
static IP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3}\.){3}\d{1,3}").expect("ip pattern compiles"));

// Unicode decimal digits, same class the ip pattern uses. Superscripts
// such as `²` are not counted.
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("digit pattern compiles"));

// `%` is deliberately left out even though the trained feature counted it.
const SPECIAL_CHARS: &[char] = &[
    '!', '@', '#', '$', '^', '&', '*', '(', ')', ',', '=', '?', '"', ':', '{', '}', '|', '<', '>',
];

const SUSPICIOUS_WORDS: [&str; 10] = [
    "login", "verify", "update", "secure", "account", "bank", "confirm", "signin", "paypal", "ebay",
];

/// Scheme and authority of a URL, split the way a lenient URL splitter
/// does it: no host validation, no normalization beyond lower-casing the
/// scheme. Unbalanced IPv6 brackets count as a parse failure and yield
/// empty parts.
#[derive(Debug, Default, PartialEq, Eq)]
struct UrlParts {
    scheme: String,
    netloc: String,
}

impl UrlParts {
    fn split(url: &str) -> Self {
        let cleaned: String = url
            .trim_start_matches(|c: char| c <= ' ')
            .chars()
            .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
            .collect();

        let mut scheme = String::new();
        let mut rest = cleaned.as_str();

        if let Some(colon) = rest.find(':') {
            let candidate = &rest[..colon];
            let starts_alpha = candidate
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_alphabetic());
            let valid = candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if starts_alpha && valid {
                scheme = candidate.to_ascii_lowercase();
                rest = &rest[colon + 1..];
            }
        }

        let mut netloc = String::new();
        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find(&['/', '?', '#'][..]).unwrap_or(after.len());
            netloc = after[..end].to_string();
        }

        if netloc.contains('[') != netloc.contains(']') {
            return Self::default();
        }

        Self { scheme, netloc }
    }
}

/// Derives the feature record for `url`. Total over every input string;
/// callers are expected to normalize the URL first.
pub fn extract(url: &str) -> FeatureRecord {
    let parts = UrlParts::split(url);

    FeatureRecord {
        furl_length: url.chars().count(),
        hostname_length: parts.netloc.chars().count(),
        has_ip: has_ip(url),
        count_dots: url.matches('.').count(),
        count_hyphen: url.matches('-').count(),
        count_at: url.matches('@').count(),
        count_question: url.matches('?').count(),
        count_slash: url.matches('/').count(),
        count_digits: DIGIT.find_iter(url).count(),
        count_special: count_special(url),
        https: u8::from(parts.scheme == "https"),
        suspicious_words: suspicious_words(url),
    }
}

pub fn has_ip(url: &str) -> u8 {
    u8::from(IP_PATTERN.is_match(url))
}

pub fn count_special(url: &str) -> usize {
    url.chars().filter(|c| SPECIAL_CHARS.contains(c)).count()
}

/// Number of distinct keywords present; repeats of one keyword count once.
pub fn suspicious_words(url: &str) -> usize {
    let lowered = url.to_lowercase();
    SUSPICIOUS_WORDS
        .iter()
        .filter(|word| lowered.contains(*word))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string() {
        assert_eq!(extract(""), FeatureRecord::default());
    }

    #[test]
    fn test_keyword_host_without_scheme_prefix() {
        let features = extract("http://paypal-login.example.com");

        assert_eq!(features.furl_length, 31);
        assert_eq!(features.hostname_length, 24);
        assert_eq!(features.count_dots, 2);
        assert_eq!(features.count_hyphen, 1);
        assert_eq!(features.count_slash, 2);
        assert_eq!(features.count_special, 1);
        assert_eq!(features.https, 0);
        assert_eq!(features.has_ip, 0);
        assert!(features.suspicious_words >= 2);
    }

    #[test]
    fn test_https_ip_url() {
        let features = extract("https://192.168.0.1/verify");

        assert_eq!(features.has_ip, 1);
        assert_eq!(features.https, 1);
        assert_eq!(features.hostname_length, 11);
        assert_eq!(features.count_digits, 8);
        assert_eq!(features.count_dots, 3);
        assert_eq!(features.suspicious_words, 1);
    }

    #[test]
    fn test_ip_shape_is_not_range_checked() {
        assert_eq!(has_ip("http://999.999.999.999/"), 1);
        assert_eq!(has_ip("http://a/1234.5.6.7"), 1);
        assert_eq!(has_ip("http://1.2.3/"), 0);
        assert_eq!(has_ip("http://1..2.3.4"), 0);
    }

    #[test]
    fn test_special_set_excludes_lookalikes() {
        assert_eq!(count_special("_~+%"), 0);
        assert_eq!(count_special("!@#$^&*(),=?\":{}|<>"), 19);
        assert_eq!(count_special("a=b&c=d"), 3);
        assert_eq!(count_special("http://a.b/%20%41"), 1);
    }

    #[test]
    fn test_digits_are_decimal_only() {
        assert_eq!(extract("http://x²y.com/٣").count_digits, 1);
        assert_eq!(extract("http://a1b2.com/").count_digits, 2);
    }

    #[test]
    fn test_keywords_count_once_each() {
        assert_eq!(suspicious_words("http://login.login.login"), 1);
        assert_eq!(suspicious_words("HTTP://PayPal.com/LOGIN/ebay"), 3);
        assert_eq!(
            suspicious_words("loginverifyupdatesecureaccountbankconfirmsigninpaypalebay"),
            10
        );
    }

    #[test]
    fn test_netloc_keeps_userinfo_and_port() {
        let features = extract("http://user:pw@host.example:8080/path?q=1#frag");
        assert_eq!(features.hostname_length, "user:pw@host.example:8080".len());
        assert_eq!(features.count_at, 1);
        assert_eq!(features.count_question, 1);
    }

    #[test]
    fn test_netloc_stops_at_query_or_fragment() {
        assert_eq!(extract("http://host?x=1").hostname_length, 4);
        assert_eq!(extract("http://host#top").hostname_length, 4);
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(extract("HTTPS://example.com").https, 1);
        assert_eq!(extract("http://example.com").https, 0);
        assert_eq!(extract("ftp://example.com").https, 0);
    }

    #[test]
    fn test_unbalanced_brackets_degrade_to_empty_parts() {
        let features = extract("https://[::1/verify");
        assert_eq!(features.hostname_length, 0);
        assert_eq!(features.https, 0);
        assert_eq!(features.furl_length, 19);
        assert_eq!(features.suspicious_words, 1);
    }

    #[test]
    fn test_bracketed_ipv6_host() {
        let features = extract("http://[::1]:80/");
        assert_eq!(features.hostname_length, 8);
    }

    #[test]
    fn test_non_ascii_lengths_count_characters() {
        let features = extract("http://bänk.de/");
        assert_eq!(features.furl_length, 15);
        assert_eq!(features.hostname_length, 7);
    }

    #[test]
    fn test_pathological_inputs_are_total() {
        for input in ["http://", "://", ":", "http:", "////", "\u{0}\u{1}", "http://\t\n", "[]"] {
            let features = extract(input);
            assert_eq!(features.furl_length, input.chars().count());
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let url = "http://secure-update.bank.example/confirm?id=42";
        assert_eq!(extract(url), extract(url));
    }
}
