//! Gemini fetching
//!
//! Request: `gemini://<host>:<port>/<resource>\r\n`.
//! Response: `<status><space|tab><meta>\r\n<body to EOF>`.

mod text;
mod tls;

use std::time::Duration;

use burrow_navigation::{ContentKind, GeminiStatus, Page, Url};
use burrow_trust::TrustStore;
use chrono::Utc;

use crate::error::FetchError;
use crate::net;
use crate::Result;

pub use text::{parse_gemtext, BlockDisplay};

const DEFAULT_MIME: &str = "text/gemini";

/// A parsed gemini response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiResponse {
    /// The full one- or two-digit status code
    pub code: u8,
    pub status: GeminiStatus,
    pub meta: String,
    pub body: Vec<u8>,
}

/// Split raw response bytes into status, meta and body
pub fn parse_response(raw: &[u8]) -> Result<GeminiResponse> {
    let (header, body) = match raw.windows(2).position(|w| w == b"\r\n") {
        Some(end) => (&raw[..end], &raw[end + 2..]),
        None => (raw, &[][..]),
    };

    let header = std::str::from_utf8(header)
        .map_err(|_| FetchError::Protocol("response header is not UTF-8".to_string()))?;

    let (code, meta) = header
        .split_once([' ', '\t'])
        .ok_or_else(|| FetchError::Protocol(format!("invalid response header {header:?}")))?;

    if code.is_empty() || code.len() > 2 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(FetchError::Protocol(format!(
            "invalid status code {code:?}"
        )));
    }

    let numeric: u8 = code
        .parse()
        .map_err(|_| FetchError::Protocol(format!("invalid status code {code:?}")))?;
    let class = code.as_bytes()[0] - b'0';
    let status = GeminiStatus::from_class(class)
        .ok_or_else(|| FetchError::Protocol(format!("unknown status {code}")))?;

    Ok(GeminiResponse {
        code: numeric,
        status,
        meta: meta.trim().to_string(),
        body: body.to_vec(),
    })
}

/// Perform one TOFU-gated exchange and return the raw response bytes
fn retrieve(url: &Url, trust: &TrustStore, timeout: Duration) -> Result<Vec<u8>> {
    let addr = url.address();
    let handle = trust.lock_host(url.host());
    let _guard = handle.lock();

    let tcp = net::connect(url, timeout)?;
    let mut stream = tls::handshake(tcp, url.host(), &addr)?;

    let chain = tls::peer_certificates(&stream);
    let outcome = trust.verify(url.host(), &chain, Utc::now())?;
    tracing::debug!(host = %url.host(), ?outcome, "Certificate accepted");

    let request = format!("{}\r\n", url.full());
    net::exchange(&mut stream, &addr, request.as_bytes())
}

/// Body of a successful response, for saving to disk
pub fn fetch_raw(url: &Url, trust: &TrustStore, timeout: Duration) -> Result<Vec<u8>> {
    let response = parse_response(&retrieve(url, trust, timeout)?)?;
    match response.status {
        GeminiStatus::Success => Ok(response.body),
        GeminiStatus::Input => Err(FetchError::ServerFailure {
            message: "[1] Queries cannot be saved".to_string(),
        }),
        GeminiStatus::Redirect => Err(FetchError::ServerFailure {
            message: "[3] Redirects cannot be saved".to_string(),
        }),
        _ => Err(failure(response)),
    }
}

pub fn visit(
    url: &Url,
    trust: &TrustStore,
    timeout: Duration,
    blocks: BlockDisplay,
) -> Result<Page> {
    let response = parse_response(&retrieve(url, trust, timeout)?)?;
    let page = into_page(url, response, blocks)?;
    tracing::debug!(url = %url, status = ?page.status, "Gemini response received");
    Ok(page)
}

/// Classify a response into a page, or the error it stands for
pub(crate) fn into_page(url: &Url, response: GeminiResponse, blocks: BlockDisplay) -> Result<Page> {
    match response.status {
        GeminiStatus::Input | GeminiStatus::Redirect => {
            Ok(Page::text(url.clone(), response.meta).with_status(response.status))
        }
        GeminiStatus::Success => {
            let mime = response
                .meta
                .split(';')
                .next()
                .map(str::trim)
                .filter(|mime| !mime.is_empty())
                .unwrap_or(DEFAULT_MIME)
                .to_ascii_lowercase();

            let (major, minor) = mime.split_once('/').ok_or_else(|| {
                FetchError::Protocol(format!("improperly formatted mime type {mime:?}"))
            })?;

            let page = match (major, minor) {
                ("text", "gemini") => {
                    let (content, links) =
                        parse_gemtext(&String::from_utf8_lossy(&response.body), url, blocks);
                    Page {
                        payload: response.body,
                        ..Page::new(url.clone(), content, links, ContentKind::Menu)
                    }
                }
                ("text", _) => {
                    let content = String::from_utf8_lossy(&response.body).into_owned();
                    Page {
                        payload: response.body,
                        ..Page::text(url.clone(), content)
                    }
                }
                ("image", _) => Page::binary(url.clone(), response.body, ContentKind::Image),
                _ => Page::binary(url.clone(), response.body, ContentKind::Binary),
            };
            Ok(page.with_status(GeminiStatus::Success))
        }
        _ => Err(failure(response)),
    }
}

fn failure(response: GeminiResponse) -> FetchError {
    let message = match response.status {
        GeminiStatus::TemporaryFailure => format!("[4] Temporary Failure. {}", response.meta),
        GeminiStatus::PermanentFailure => format!("[5] Permanent Failure. {}", response.meta),
        GeminiStatus::ClientCertificateRequired => return FetchError::ClientCertificateRequired,
        _ => format!("[{}] Unexpected status. {}", response.code, response.meta),
    };
    FetchError::ServerFailure {
        message: message.trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair};
    use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
    use rustls::{ServerConfig, ServerConnection};
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{mpsc, Arc};
    use std::thread;

    fn location() -> Url {
        Url::parse("gemini://example.org/docs/").unwrap()
    }

    #[test]
    fn test_parse_response() {
        let response = parse_response(b"20 text/gemini; lang=en\r\n# Hi\r\n").unwrap();
        assert_eq!(response.code, 20);
        assert_eq!(response.status, GeminiStatus::Success);
        assert_eq!(response.meta, "text/gemini; lang=en");
        assert_eq!(response.body, b"# Hi\r\n");

        let response = parse_response(b"1\tEnter a query\r\n").unwrap();
        assert_eq!(response.status, GeminiStatus::Input);
        assert_eq!(response.meta, "Enter a query");
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_parse_response_rejects_bad_headers() {
        for raw in [
            &b"200 text/gemini\r\n"[..],
            &b"OK text/gemini\r\n"[..],
            &b"20\r\n"[..],
            &b"90 unknown\r\n"[..],
            &b""[..],
        ] {
            assert!(
                matches!(parse_response(raw), Err(FetchError::Protocol(_))),
                "{:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn test_success_pages() {
        let gemtext = parse_response(b"20 \r\n=> sub.gmi Sub\r\n").unwrap();
        let page = into_page(&location(), gemtext, BlockDisplay::Alt).unwrap();
        assert_eq!(page.kind, ContentKind::Menu);
        assert_eq!(page.status, Some(GeminiStatus::Success));
        assert_eq!(page.link(1), Some("gemini://example.org:1965/docs/sub.gmi"));

        let plain = parse_response(b"20 text/plain\r\nhello").unwrap();
        let page = into_page(&location(), plain, BlockDisplay::Alt).unwrap();
        assert_eq!(page.kind, ContentKind::Text);
        assert_eq!(page.content, "hello");

        let image = parse_response(b"20 image/png\r\n\x89PNG").unwrap();
        let page = into_page(&location(), image, BlockDisplay::Alt).unwrap();
        assert_eq!(page.kind, ContentKind::Image);
        assert_eq!(page.payload, b"\x89PNG");

        let broken = parse_response(b"20 nonsense\r\n").unwrap();
        assert!(matches!(
            into_page(&location(), broken, BlockDisplay::Alt),
            Err(FetchError::Protocol(_))
        ));
    }

    #[test]
    fn test_input_and_redirect_carry_meta() {
        let input = parse_response(b"10 Search terms\r\n").unwrap();
        let page = into_page(&location(), input, BlockDisplay::Alt).unwrap();
        assert_eq!(page.status, Some(GeminiStatus::Input));
        assert_eq!(page.content, "Search terms");

        let redirect = parse_response(b"31 /moved.gmi\r\n").unwrap();
        let page = into_page(&location(), redirect, BlockDisplay::Alt).unwrap();
        assert_eq!(page.status, Some(GeminiStatus::Redirect));
        assert_eq!(page.content, "/moved.gmi");
    }

    #[test]
    fn test_failures() {
        let temporary = parse_response(b"44 slow down\r\n").unwrap();
        match into_page(&location(), temporary, BlockDisplay::Alt) {
            Err(FetchError::ServerFailure { message }) => {
                assert_eq!(message, "[4] Temporary Failure. slow down")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let permanent = parse_response(b"51 Not found\r\n").unwrap();
        assert!(matches!(
            into_page(&location(), permanent, BlockDisplay::Alt),
            Err(FetchError::ServerFailure { message }) if message.starts_with("[5]")
        ));

        let cert = parse_response(b"60 Certificate required\r\n").unwrap();
        assert!(matches!(
            into_page(&location(), cert, BlockDisplay::Alt),
            Err(FetchError::ClientCertificateRequired)
        ));
    }

    /// TLS server on loopback presenting a fresh self-signed certificate
    fn serve_tls(response: &'static [u8]) -> (u16, Vec<u8>, mpsc::Receiver<String>) {
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params.not_before = rcgen::date_time_ymd(2020, 1, 1);
        params.not_after = rcgen::date_time_ymd(2090, 1, 1);
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        let cert_der = cert.der().to_vec();

        let config = ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(
            vec![CertificateDer::from(cert_der.clone())],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der())),
        )
        .unwrap();
        let config = Arc::new(config);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();

        // errors are ignored: a client that rejects the certificate hangs up
        thread::spawn(move || {
            let Ok((tcp, _)) = listener.accept() else {
                return;
            };
            let Ok(conn) = ServerConnection::new(config) else {
                return;
            };
            let mut stream = rustls::StreamOwned::new(conn, tcp);

            let mut request = String::new();
            if BufReader::new(&mut stream).read_line(&mut request).is_err() {
                return;
            }
            let _ = tx.send(request);

            let _ = stream.write_all(response);
            stream.conn.send_close_notify();
            let _ = stream.flush();
        });

        (port, cert_der, rx)
    }

    #[test]
    fn test_visit_over_tls_pins_certificate() {
        let (port, cert_der, requests) = serve_tls(b"20 text/gemini\r\n=> /next.gmi Next\r\n");
        let url = Url::parse(&format!("gemini://localhost:{port}/start.gmi")).unwrap();
        let trust = TrustStore::new();

        let page = visit(&url, &trust, Duration::from_secs(10), BlockDisplay::Alt).unwrap();

        assert_eq!(
            requests.recv().unwrap(),
            format!("gemini://localhost:{port}/start.gmi\r\n")
        );
        assert_eq!(page.link(1), Some(format!("gemini://localhost:{port}/next.gmi").as_str()));
        assert_eq!(
            trust.get("localhost").unwrap().fingerprint,
            burrow_trust::fingerprint(&cert_der)
        );
    }

    #[test]
    fn test_visit_over_tls_rejects_changed_certificate() {
        let trust = TrustStore::new();

        let (port, _, _requests) = serve_tls(b"20 text/plain\r\nfirst");
        let url = Url::parse(&format!("gemini://localhost:{port}/")).unwrap();
        visit(&url, &trust, Duration::from_secs(10), BlockDisplay::Alt).unwrap();

        let (port, _, _requests) = serve_tls(b"20 text/plain\r\nsecond");
        let url = Url::parse(&format!("gemini://localhost:{port}/")).unwrap();
        assert!(matches!(
            visit(&url, &trust, Duration::from_secs(10), BlockDisplay::Alt),
            Err(FetchError::Trust(burrow_trust::TrustError::CertificateMismatch { .. }))
        ));
    }
}
