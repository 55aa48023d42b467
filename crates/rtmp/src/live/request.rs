//! The connection parameters carried by `connect`/`publish`/`play`.

use crate::live::registry::Registry;

/// Parameters identifying a single publish or play request.
///
/// Assembled from the `connect` command's `tcUrl`/`pageUrl`/`swfUrl` together with
/// the stream name given to the later `publish`/`play` command.
#[derive(Debug, Clone)]
pub struct Request {
    /// The `tcUrl` sent with `connect`, e.g. `rtmp://example.com/live`.
    pub tc_url: String,
    /// The `pageUrl` sent with `connect`, if any.
    pub page_url: Option<String>,
    /// The `swfUrl` sent with `connect`, if any.
    pub swf_url: Option<String>,
    /// The application name, the first path segment after the host in `tcUrl`.
    pub app: String,
    /// The stream name given to `publish`/`play`.
    pub stream: String,
    /// The virtual host this request targets, resolved from `tcUrl`.
    pub vhost: Option<String>,
    /// AMF encoding requested by the client: `0.0` for AMF0, `3.0` for AMF3.
    pub object_encoding: f64,
}

impl Request {
    /// The stream key this request resolves to in the [`Registry`].
    pub fn stream_key(&self) -> String {
        Registry::stream_key(self.vhost.as_deref(), &self.app, &self.stream)
    }
}

/// Resolves the vhost for a `tcUrl`.
///
/// A `vhost` query parameter always wins. Otherwise the host portion of the URL is
/// used, unless it's `localhost` or a literal IPv4 address, in which case there is
/// no vhost and the caller should fall back to a default.
pub fn extract_vhost(tc_url: &str) -> Option<String> {
    if let Some(idx) = tc_url.find("vhost=") {
        let rest = &tc_url[idx + "vhost=".len()..];
        let end = rest.find(['&', ' ']).unwrap_or(rest.len());
        if !rest[..end].is_empty() {
            return Some(rest[..end].to_string());
        }
    }

    let without_scheme = tc_url.splitn(2, "://").nth(1).unwrap_or(tc_url);
    let host_and_rest = without_scheme.splitn(2, '/').next().unwrap_or("");
    let host = host_and_rest.split(':').next().unwrap_or("");

    if host.is_empty() || host.eq_ignore_ascii_case("localhost") || host.parse::<std::net::Ipv4Addr>().is_ok() {
        None
    } else {
        Some(host.to_string())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_vhost_query_param_wins() {
        assert_eq!(
            extract_vhost("rtmp://10.0.0.1/live?vhost=example.com"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_vhost_from_host() {
        assert_eq!(extract_vhost("rtmp://example.com:1935/live"), Some("example.com".to_string()));
    }

    #[test]
    fn test_no_vhost_for_ip_or_localhost() {
        assert_eq!(extract_vhost("rtmp://127.0.0.1/live"), None);
        assert_eq!(extract_vhost("rtmp://localhost/live"), None);
    }

    #[test]
    fn test_stream_key_uses_default_vhost() {
        let req = Request {
            tc_url: "rtmp://127.0.0.1/live".into(),
            page_url: None,
            swf_url: None,
            app: "live".into(),
            stream: "abc".into(),
            vhost: None,
            object_encoding: 0.0,
        };
        assert_eq!(req.stream_key(), "_default_/live/abc");
    }
}
