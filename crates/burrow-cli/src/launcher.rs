//! External programs for telnet and web links

use std::io;
use std::process::Command;

use burrow_core::{Launcher, Scheme, Url};

pub struct SystemLauncher {
    telnet: String,
    opener: String,
}

impl SystemLauncher {
    pub fn new(telnet: &str) -> Self {
        Self {
            telnet: telnet.to_string(),
            opener: opener().to_string(),
        }
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, url: &Url) -> io::Result<String> {
        match url.scheme() {
            Scheme::Telnet => {
                let mut command = Command::new(&self.telnet);
                command.arg(url.host());
                if let Some(port) = url.port() {
                    command.arg(port.to_string());
                }
                let status = command.status()?;
                Ok(format!("Telnet session ended ({status})"))
            }
            _ => {
                let status = Command::new(&self.opener).arg(url.full()).status()?;
                Ok(format!("Opened {url} in the web browser ({status})"))
            }
        }
    }
}

fn opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn launcher() -> SystemLauncher {
        SystemLauncher {
            telnet: "true".to_string(),
            opener: "true".to_string(),
        }
    }

    #[test]
    fn test_web_links_wait_for_the_opener() {
        let url = Url::parse("https://example.org/").unwrap();
        let status = launcher().launch(&url).unwrap();
        assert!(status.starts_with("Opened https://example.org:443/ in the web browser"));
        assert!(status.contains("exit status: 0"));
    }

    #[test]
    fn test_telnet_session_status() {
        let url = Url::parse("telnet://bbs.example.org").unwrap();
        let status = launcher().launch(&url).unwrap();
        assert!(status.starts_with("Telnet session ended"));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let launcher = SystemLauncher {
            telnet: "/nonexistent/telnet".to_string(),
            opener: "/nonexistent/opener".to_string(),
        };
        let url = Url::parse("telnet://bbs.example.org").unwrap();
        assert!(launcher.launch(&url).is_err());
    }
}
