use super::{Fetched, ResourceResolver, guess_mime};
use crate::error::{RenderError, RenderResult};

/// Blocking HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::blocking::Client,
    user_agent: String,
}

impl HttpResolver {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            user_agent: user_agent.to_owned(),
        }
    }
}

fn content_disposition_filename(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case("filename")
            .then(|| v.trim().trim_matches('"').to_owned())
    })
}

impl ResourceResolver for HttpResolver {
    fn fetch(&self, path: &str) -> RenderResult<Fetched> {
        let resp = self
            .client
            .get(path)
            .header(reqwest::header::ACCEPT, "*/*")
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| RenderError::resource(format!("GET {path} failed")).with_source(e))?;

        let headers = resp.headers();
        let filename = headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename)
            .or_else(|| {
                resp.url()
                    .path_segments()
                    .and_then(|mut s| s.next_back())
                    .map(str::to_owned)
            })
            .unwrap_or_default();
        let mime = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| guess_mime(&filename).to_owned());

        let bytes = resp
            .bytes()
            .map_err(|e| RenderError::resource(format!("reading {path} failed")).with_source(e))?
            .to_vec();
        tracing::debug!(url = path, bytes = bytes.len(), "fetched remote resource");
        Ok(Fetched {
            bytes,
            filename,
            mime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_disposition() {
        assert_eq!(
            content_disposition_filename("attachment; filename=\"card.png\"").as_deref(),
            Some("card.png")
        );
        assert_eq!(content_disposition_filename("inline"), None);
    }
}
