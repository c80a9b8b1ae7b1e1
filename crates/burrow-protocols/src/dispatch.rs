//! Scheme dispatch

use std::time::Duration;

use burrow_navigation::{Page, Scheme, Url};
use burrow_trust::TrustStore;

use crate::error::FetchError;
use crate::gemini::{self, BlockDisplay};
use crate::{finger, gopher, local, Result};

/// Hands addresses this crate does not fetch to an outside program
pub trait Launcher: Send + Sync {
    /// Open `url` and block until the program exits; returns a status line
    fn launch(&self, url: &Url) -> std::io::Result<String>;
}

/// Everything a fetch needs besides the address
pub struct FetchContext<'a> {
    pub trust: &'a TrustStore,
    pub timeout: Duration,
    pub blocks: BlockDisplay,
    pub launcher: Option<&'a dyn Launcher>,
}

impl<'a> FetchContext<'a> {
    pub fn new(trust: &'a TrustStore, timeout: Duration) -> Self {
        Self {
            trust,
            timeout,
            blocks: BlockDisplay::default(),
            launcher: None,
        }
    }
}

#[derive(Debug)]
pub enum Response {
    Page(Page),
    /// Handed to the launcher, carries its status line
    Launched(String),
}

/// Fetch `url` with the handler for its scheme
pub fn dispatch(url: &Url, ctx: &FetchContext<'_>) -> Result<Response> {
    tracing::debug!(url = %url, scheme = %url.scheme(), "Dispatching");

    let page = match url.scheme() {
        Scheme::Gopher => gopher::visit(url, ctx.timeout)?,
        Scheme::Gemini => gemini::visit(url, ctx.trust, ctx.timeout, ctx.blocks)?,
        Scheme::Local => local::open(url)?,
        Scheme::Finger => finger::visit(url, ctx.timeout)?,
        Scheme::Http | Scheme::Https | Scheme::Telnet => return launch(url, ctx),
        Scheme::Other(name) => return Err(FetchError::UnsupportedScheme(name.clone())),
    };

    Ok(Response::Page(page))
}

/// Raw response body of `url`, for writing to disk
pub fn fetch_raw(url: &Url, ctx: &FetchContext<'_>) -> Result<Vec<u8>> {
    match url.scheme() {
        Scheme::Gopher => gopher::fetch_raw(url, ctx.timeout),
        Scheme::Gemini => gemini::fetch_raw(url, ctx.trust, ctx.timeout),
        Scheme::Local => local::fetch_raw(url),
        Scheme::Finger => finger::fetch_raw(url, ctx.timeout),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

fn launch(url: &Url, ctx: &FetchContext<'_>) -> Result<Response> {
    let launcher = ctx
        .launcher
        .ok_or_else(|| FetchError::Launch(format!("no program configured for {}", url.scheme())))?;

    tracing::info!(url = %url, "Launching external program");
    launcher
        .launch(url)
        .map(Response::Launched)
        .map_err(|e| FetchError::Launch(format!("{url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testing::serve_once;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLauncher {
        seen: Mutex<Vec<String>>,
    }

    impl Launcher for RecordingLauncher {
        fn launch(&self, url: &Url) -> std::io::Result<String> {
            self.seen.lock().unwrap().push(url.full().to_string());
            Ok("exited 0".to_string())
        }
    }

    #[test]
    fn test_gopher_route() {
        let (port, _requests) = serve_once(b"iHello\t\t\t\r\n".to_vec());
        let trust = TrustStore::new();
        let ctx = FetchContext::new(&trust, Duration::from_secs(5));
        let url = Url::parse(&format!("gopher://127.0.0.1:{port}")).unwrap();

        match dispatch(&url, &ctx).unwrap() {
            Response::Page(page) => assert!(page.content.contains("Hello")),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_local_route() {
        let dir = tempfile::tempdir().unwrap();
        let trust = TrustStore::new();
        let ctx = FetchContext::new(&trust, Duration::from_secs(5));
        let url = Url::parse(&format!("local://{}", dir.path().display())).unwrap();

        assert!(matches!(dispatch(&url, &ctx).unwrap(), Response::Page(_)));
    }

    #[test]
    fn test_external_schemes_go_to_launcher() {
        let trust = TrustStore::new();
        let launcher = RecordingLauncher::default();
        let ctx = FetchContext {
            launcher: Some(&launcher),
            ..FetchContext::new(&trust, Duration::from_secs(5))
        };

        for address in ["https://example.org/", "telnet://bbs.example.org"] {
            let url = Url::parse(address).unwrap();
            match dispatch(&url, &ctx).unwrap() {
                Response::Launched(status) => assert_eq!(status, "exited 0"),
                other => panic!("unexpected response: {other:?}"),
            }
        }
        assert_eq!(
            *launcher.seen.lock().unwrap(),
            vec![
                "https://example.org:443/".to_string(),
                "telnet://bbs.example.org:23/".to_string()
            ]
        );
    }

    #[test]
    fn test_missing_launcher_and_unknown_scheme() {
        let trust = TrustStore::new();
        let ctx = FetchContext::new(&trust, Duration::from_secs(5));

        let url = Url::parse("http://example.org").unwrap();
        assert!(matches!(dispatch(&url, &ctx), Err(FetchError::Launch(_))));

        let url = Url::parse("ftp://example.org/pub").unwrap();
        assert!(matches!(
            dispatch(&url, &ctx),
            Err(FetchError::UnsupportedScheme(name)) if name == "ftp"
        ));
        assert!(matches!(
            fetch_raw(&url, &ctx),
            Err(FetchError::UnsupportedScheme(_))
        ));
    }
}
