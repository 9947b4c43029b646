//! External application launch
//!
//! The verified patient can be handed to an external application registered
//! for a custom URL scheme. The call is one-way: nothing is awaited and
//! failures are logged, never reported back to the session.

use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::ExternalAppConfig;

#[cfg(test)]
use mockall::automock;

/// One-way notification to an external system
#[cfg_attr(test, automock)]
pub trait ExternalAppLauncher: Send + Sync {
    fn notify(&self, national_id: &str);
}

/// Opens `<scheme>://open?patientId=<national id>` with a URL opener program
pub struct UrlSchemeLauncher {
    scheme: String,
    opener: Option<String>,
}

impl UrlSchemeLauncher {
    pub fn new(scheme: impl Into<String>, opener: Option<String>) -> Self {
        Self {
            scheme: scheme.into(),
            opener,
        }
    }

    pub fn from_config(config: &ExternalAppConfig) -> Self {
        Self::new(config.scheme.clone(), config.opener.clone())
    }

    pub fn url_for(&self, national_id: &str) -> String {
        format!("{}://open?patientId={}", self.scheme, national_id)
    }

    /// The opener is left running; once dropped, the tokio runtime reaps it
    fn spawn_opener(opener: &str, url: &str) -> std::io::Result<Child> {
        Command::new(opener)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }
}

impl ExternalAppLauncher for UrlSchemeLauncher {
    fn notify(&self, national_id: &str) {
        let url = self.url_for(national_id);

        let Some(opener) = &self.opener else {
            info!(url = %url, "External app launch requested (no opener configured)");
            return;
        };

        match Self::spawn_opener(opener, &url) {
            Ok(_) => info!(url = %url, opener = %opener, "External app launched"),
            Err(e) => warn!(url = %url, opener = %opener, error = %e, "External app launch failed"),
        }
    }
}
