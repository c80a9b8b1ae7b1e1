//! Finger lookups

use std::time::Duration;

use burrow_navigation::{Page, Url};

use crate::net;
use crate::Result;

pub fn fetch_raw(url: &Url, timeout: Duration) -> Result<Vec<u8>> {
    let mut stream = net::connect(url, timeout)?;
    let request = format!("{}\r\n", url.resource());
    net::exchange(&mut stream, &url.address(), request.as_bytes())
}

/// The response is shown as-is
pub fn visit(url: &Url, timeout: Duration) -> Result<Page> {
    let payload = fetch_raw(url, timeout)?;
    let content = String::from_utf8_lossy(&payload).into_owned();
    Ok(Page {
        payload,
        ..Page::text(url.clone(), content)
    })
}
