//! User interaction during interactive authorization.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use crate::auth::device_flow::DeviceAuthorization;
use crate::error::{HubError, Result};

/// Shows authorization instructions and collects input from the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Tells the user where to go and which code to enter.
    fn show_device_code(&self, authorization: &DeviceAuthorization);

    /// Opens `url` in the system browser. Returns `false` if that failed.
    fn open_browser(&self, url: &Url) -> bool;

    /// Asks the user to open `url` manually.
    fn show_authorization_url(&self, url: &Url);

    /// Reads an authorization code pasted by the user.
    async fn read_authorization_code(&self) -> Result<String>;
}

/// [`Prompter`] that talks to the terminal.
pub struct ConsolePrompter {
    use_browser: bool,
}

impl ConsolePrompter {
    /// Create a console prompter; `use_browser = false` never launches a browser.
    #[must_use]
    pub const fn new(use_browser: bool) -> Self {
        Self { use_browser }
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    fn show_device_code(&self, authorization: &DeviceAuthorization) {
        println!("To authenticate, please visit:");
        println!();
        println!("  {}", authorization.verification_url());
        println!();
        println!("And enter this code (case sensitive): {}", authorization.user_code());
        println!();

        if self.use_browser && open::that(authorization.verification_url()).is_ok() {
            println!("Browser opened automatically.");
            println!();
        }
        println!("Waiting for authorization...");
    }

    fn open_browser(&self, url: &Url) -> bool {
        if !self.use_browser {
            return false;
        }
        match open::that(url.as_str()) {
            Ok(()) => {
                println!("Browser opened automatically. Waiting for authorization...");
                true
            },
            Err(e) => {
                tracing::warn!(error = %e, "Could not open browser");
                false
            },
        }
    }

    fn show_authorization_url(&self, url: &Url) {
        println!("Enter this address in your browser:");
        println!();
        println!("  {url}");
        println!();
    }

    async fn read_authorization_code(&self) -> Result<String> {
        println!("Enter verification code:");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;

        let code = line.trim();
        if code.is_empty() {
            return Err(HubError::Schema("no verification code entered".to_string()));
        }
        Ok(code.to_string())
    }
}
