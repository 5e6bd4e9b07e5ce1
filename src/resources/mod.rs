//! Fetching external bytes: local files, remote URLs and the on-disk cache in front of them.

mod cache;
mod font;
#[cfg(feature = "http")]
mod http;
mod local;

use std::path::Path;

use crate::config::RequestConfig;
use crate::error::{RenderError, RenderResult};

pub use cache::{CacheRecord, CachedResolver};
pub use font::{FontFace, FontTable};
#[cfg(feature = "http")]
pub use http::HttpResolver;
pub use local::LocalResolver;

/// Bytes of one fetched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
}

pub trait ResourceResolver: Send + Sync {
    fn fetch(&self, path: &str) -> RenderResult<Fetched>;
}

impl<R: ResourceResolver + ?Sized> ResourceResolver for Box<R> {
    fn fetch(&self, path: &str) -> RenderResult<Fetched> {
        (**self).fetch(path)
    }
}

pub(crate) fn is_remote(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Best-effort MIME type from a file extension.
pub(crate) fn guess_mime(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Routes URLs to the remote resolver and everything else to local files.
pub struct Resolver {
    local: LocalResolver,
    remote: Option<Box<dyn ResourceResolver>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("local", &self.local)
            .field("remote", &self.remote.is_some())
            .finish()
    }
}

impl Resolver {
    pub fn new(local: LocalResolver) -> Self {
        Self {
            local,
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: impl ResourceResolver + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    /// Local files under `root`, plus cached HTTP when the `http` feature is enabled.
    pub fn for_document(root: impl Into<std::path::PathBuf>, requests: &RequestConfig) -> Self {
        let resolver = Self::new(LocalResolver::new(root));
        #[cfg(feature = "http")]
        let resolver = resolver.with_remote(CachedResolver::new(
            HttpResolver::new(&requests.user_agent),
            &requests.cache_dir,
        ));
        #[cfg(not(feature = "http"))]
        let _ = requests;
        resolver
    }
}

impl ResourceResolver for Resolver {
    fn fetch(&self, path: &str) -> RenderResult<Fetched> {
        if !is_remote(path) {
            return self.local.fetch(path);
        }
        match &self.remote {
            Some(remote) => remote.fetch(path),
            None => Err(RenderError::resource(format!(
                "cannot fetch '{path}': remote resources are not enabled"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static [u8]);

    impl ResourceResolver for Fixed {
        fn fetch(&self, path: &str) -> RenderResult<Fetched> {
            Ok(Fetched {
                bytes: self.0.to_vec(),
                filename: path.to_owned(),
                mime: guess_mime(path).to_owned(),
            })
        }
    }

    #[test]
    fn urls_go_to_the_remote_resolver() {
        let r = Resolver::new(LocalResolver::new(std::env::temp_dir())).with_remote(Fixed(b"remote"));
        assert_eq!(r.fetch("https://example.com/a.png").unwrap().bytes, b"remote");
        assert_eq!(r.fetch("HTTP://example.com/a").unwrap().bytes, b"remote");
    }

    #[test]
    fn urls_without_remote_fail() {
        let r = Resolver::new(LocalResolver::new(std::env::temp_dir()));
        let err = r.fetch("https://example.com/a.png").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Resource);
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(guess_mime("x/Font.TTF"), "font/ttf");
        assert_eq!(guess_mime("noext"), "application/octet-stream");
    }
}
