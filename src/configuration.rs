//! Extraction and serving configuration.
//!
//! [`ExtractOptions`] is a builder that threads the seek epsilon, an optional
//! deadline, and intake strictness through the extractor and the session
//! without widening every signature. [`ServeOptions`] carries the asset
//! router's listen address and document root.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use lastframe::ExtractOptions;
//!
//! let options = ExtractOptions::new()
//!     .with_timeout(Duration::from_secs(30))
//!     .with_strict_picker(true);
//! assert_eq!(options.seek_epsilon(), Duration::from_micros(1));
//! ```

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

/// Distance before end-of-stream the final seek aims at.
///
/// Small enough to land on the last decodable frame instead of past the end.
pub const DEFAULT_SEEK_EPSILON: Duration = Duration::from_micros(1);

/// Settings for last-frame extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub(crate) seek_epsilon: Duration,
    pub(crate) timeout: Option<Duration>,
    pub(crate) strict_picker: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Defaults: 1 µs epsilon, no deadline, picker input accepted as-is.
    pub fn new() -> Self {
        Self {
            seek_epsilon: DEFAULT_SEEK_EPSILON,
            timeout: None,
            strict_picker: false,
        }
    }

    /// Set how far before the end of the stream the final seek lands.
    #[must_use]
    pub fn with_seek_epsilon(mut self, epsilon: Duration) -> Self {
        self.seek_epsilon = epsilon;
        self
    }

    /// Bound how long an asynchronous extraction may take.
    ///
    /// Without a deadline a stalled source stalls the extraction forever.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate the declared type of picker selections the same way drops
    /// are validated. Off by default.
    #[must_use]
    pub fn with_strict_picker(mut self, strict: bool) -> Self {
        self.strict_picker = strict;
        self
    }

    /// Distance before the end of the stream the final seek aims at.
    pub fn seek_epsilon(&self) -> Duration {
        self.seek_epsilon
    }

    /// Deadline for asynchronous extraction, if one is set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether picker selections are type-checked like drops.
    pub fn strict_picker(&self) -> bool {
        self.strict_picker
    }
}

/// Settings for the asset router's HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    /// Directory holding the built single-page application.
    pub root: PathBuf,
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8787,
        }
    }
}

impl ServeOptions {
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// The address the listener binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
