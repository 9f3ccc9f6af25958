use std::collections::HashSet;
use url::Url;

use super::content_filter::CheckOutcome;

/// Classify one extracted link URL.
///
/// Exactly one outcome applies per URL, checked in this order:
/// unparsable → moderate, non-HTTP(S) scheme → block, host outside the
/// trusted set → moderate, otherwise clean. An empty `trusted_domains` set
/// disables the domain rule.
pub fn validate_link(raw_url: &str, trusted_domains: &HashSet<String>) -> CheckOutcome {
    let parsed = match Url::parse(raw_url) {
        Ok(url) => url,
        Err(e) => {
            return CheckOutcome::Moderate(format!("Invalid URL: {} ({})", raw_url, e));
        }
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return CheckOutcome::Block(format!(
            "Non-HTTP(S) URL not allowed: {} (scheme '{}')",
            raw_url,
            parsed.scheme()
        ));
    }

    if trusted_domains.is_empty() {
        return CheckOutcome::Clean;
    }

    let host = parsed.host_str().unwrap_or_default().trim_end_matches('.').to_lowercase();
    if is_trusted_host(&host, trusted_domains) {
        CheckOutcome::Clean
    } else {
        CheckOutcome::Moderate(format!("Untrusted domain: {}", host))
    }
}

/// True when `host` equals a trusted domain or is a subdomain of one.
///
/// Matching happens on label boundaries, so `evilstellar.org` does not pass
/// for `stellar.org`.
pub fn is_trusted_host(host: &str, trusted_domains: &HashSet<String>) -> bool {
    trusted_domains.iter().any(|domain| {
        host == domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
