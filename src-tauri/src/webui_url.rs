use url::Url;

/// `http://<host>:<port>/<ui path>` for the running backend.
pub fn backend_ui_url(host: &str, port: u16, ui_path: &str) -> Result<Url, url::ParseError> {
    let base = Url::parse(&format!("http://{host}:{port}/"))?;
    base.join(ui_path.trim_start_matches('/'))
}

/// True when `url` points at the backend origin, whatever the path.
pub fn is_backend_origin(url: &Url, host: &str, port: u16) -> bool {
    url.scheme() == "http" && url.host_str() == Some(host) && url.port() == Some(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_ui_url_points_at_loopback_ui_index() {
        let url = backend_ui_url("127.0.0.1", 5050, "/ui/index.html").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5050/ui/index.html");
    }

    #[test]
    fn backend_ui_url_accepts_relative_ui_path() {
        let url = backend_ui_url("127.0.0.1", 5001, "ui/index.html").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5001/ui/index.html");
    }

    #[test]
    fn is_backend_origin_requires_matching_port() {
        let url = Url::parse("http://127.0.0.1:5050/ui/plots.html").unwrap();
        assert!(is_backend_origin(&url, "127.0.0.1", 5050));
        assert!(!is_backend_origin(&url, "127.0.0.1", 5051));

        let splash = Url::parse("tauri://localhost/index.html").unwrap();
        assert!(!is_backend_origin(&splash, "127.0.0.1", 5050));
    }
}
