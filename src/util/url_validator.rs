use std::net::IpAddr;
use thiserror::Error;
use url::{Host, Url};

/// Why a link was refused by [`validate_url`].
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Unparseable link: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Refusing {0}:// link")]
    UnsupportedScheme(String),
    #[error("Refusing link to internal address {0}")]
    PrivateIp(String),
    #[error("Refusing link to localhost")]
    Localhost,
}

/// Checks an item link before the image backfill fetches it.
///
/// Links come from remote feed content. Only `http`/`https` are accepted,
/// and unless `allow_private` is set, hosts naming localhost, loopback,
/// RFC 1918, link-local, unspecified or unique-local addresses are refused.
///
/// ```
/// use herald::util::validate_url;
///
/// assert!(validate_url("https://example.com/post", false).is_ok());
/// assert!(validate_url("http://192.168.1.1/admin", false).is_err());
/// assert!(validate_url("http://127.0.0.1:8080/post", true).is_ok());
/// assert!(validate_url("file:///etc/passwd", true).is_err());
/// ```
pub fn validate_url(link: &str, allow_private: bool) -> Result<Url, UrlValidationError> {
    let url = Url::parse(link)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_string()));
    }
    if !allow_private {
        if let Some(host) = url.host() {
            check_host(host)?;
        }
    }
    Ok(url)
}

fn check_host(host: Host<&str>) -> Result<(), UrlValidationError> {
    let ip = match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            if name == "localhost" || name.ends_with(".localhost") {
                return Err(UrlValidationError::Localhost);
            }
            return Ok(());
        }
        Host::Ipv4(v4) => IpAddr::V4(v4),
        Host::Ipv6(v6) => IpAddr::V6(v6),
    };

    if ip.is_loopback() {
        Err(UrlValidationError::Localhost)
    } else if is_internal(ip) {
        Err(UrlValidationError::PrivateIp(ip.to_string()))
    } else {
        Ok(())
    }
}

fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 and fe80::/10
            v6.is_unspecified() || first & 0xfe00 == 0xfc00 || first & 0xffc0 == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_links_accepted() {
        assert!(validate_url("https://example.com/2024/05/post", false).is_ok());
        assert!(validate_url("http://news.example.org:8080/a", false).is_ok());
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        assert!(matches!(
            validate_url("file:///etc/passwd", false),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_url("ftp://example.com", true).is_err());
        assert!(validate_url("javascript:alert(1)", true).is_err());
    }

    #[test]
    fn test_loopback_rejected() {
        assert!(matches!(
            validate_url("http://localhost/a", false),
            Err(UrlValidationError::Localhost)
        ));
        assert!(validate_url("http://LOCALHOST/a", false).is_err());
        assert!(validate_url("http://api.localhost/a", false).is_err());
        assert!(validate_url("http://127.0.0.1/a", false).is_err());
        assert!(validate_url("http://[::1]/a", false).is_err());
    }

    #[test]
    fn test_private_ranges_rejected() {
        assert!(validate_url("http://10.0.0.1/a", false).is_err());
        assert!(validate_url("http://172.16.0.1/a", false).is_err());
        assert!(validate_url("http://192.168.1.1:3000/a", false).is_err());
        assert!(validate_url("http://169.254.1.1/a", false).is_err());
        assert!(validate_url("http://0.0.0.0/a", false).is_err());
        assert!(validate_url("http://[fe80::1]/a", false).is_err());
        assert!(validate_url("http://[fd00::1]/a", false).is_err());
    }

    #[test]
    fn test_allow_private_skips_host_checks() {
        assert!(validate_url("http://127.0.0.1:9999/article", true).is_ok());
        assert!(validate_url("http://192.168.1.1/a", true).is_ok());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_url("not a url", false),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
