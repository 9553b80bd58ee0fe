use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// HTTP validators remembered from the last successful download.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `dest` was (re)written; carries the validators for the new content.
    Fetched(Validators),
    /// The store confirmed the cached copy is current; `dest` is untouched.
    NotModified,
}

pub trait CacheStore {
    /// Download `url` into `dest`, sending `validators` as a conditional request when supported.
    fn fetch(&self, url: &str, dest: &Path, validators: &Validators) -> Result<FetchOutcome>;
}

const URL_REDACTION: &str = "<redacted>";

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStore;

impl CacheStore for LocalStore {
    fn fetch(&self, url: &str, dest: &Path, _validators: &Validators) -> Result<FetchOutcome> {
        let path = if let Some(stripped) = url.strip_prefix("file://") {
            PathBuf::from(stripped)
        } else {
            PathBuf::from(url)
        };

        if path.is_dir() {
            return Err(CacheError::UnsupportedFetchUrl {
                url: sanitize_fetch_url(url),
            });
        }

        crate::util::atomic_write_with(dest, |out| {
            let mut reader = File::open(&path)?;
            io::copy(&mut reader, out)?;
            Ok(())
        })?;
        Ok(FetchOutcome::Fetched(Validators::default()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HttpStore;

impl CacheStore for HttpStore {
    fn fetch(&self, url: &str, dest: &Path, validators: &Validators) -> Result<FetchOutcome> {
        let safe_url = sanitize_fetch_url(url);

        let mut request = ureq::get(url);
        if let Some(etag) = &validators.etag {
            request = request.set("If-None-Match", etag);
        }
        if let Some(last_modified) = &validators.last_modified {
            request = request.set("If-Modified-Since", last_modified);
        }

        let response = request.call().map_err(|err| {
            let message = match err {
                ureq::Error::Status(code, _response) => {
                    format!("server returned status {code} for {safe_url}")
                }
                // `Transport`'s `Display` echoes the raw URL; report the kind only.
                ureq::Error::Transport(transport) => {
                    format!("transport error for {safe_url}: {}", transport.kind())
                }
            };
            CacheError::Http { message }
        })?;

        if response.status() == 304 {
            tracing::debug!(target: "jre.cache", url = %safe_url, "not modified");
            return Ok(FetchOutcome::NotModified);
        }

        let fresh = Validators {
            etag: response.header("ETag").map(str::to_owned),
            last_modified: response.header("Last-Modified").map(str::to_owned),
        };

        crate::util::atomic_write_with(dest, |out| {
            let mut reader = response.into_reader();
            io::copy(&mut reader, out)?;
            Ok(())
        })?;
        Ok(FetchOutcome::Fetched(fresh))
    }
}

pub fn store_for_url(url: &str) -> Result<Box<dyn CacheStore>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Box::new(HttpStore));
    }

    if url.contains("://") && !url.starts_with("file://") {
        return Err(CacheError::UnsupportedFetchUrl {
            url: sanitize_fetch_url(url),
        });
    }

    Ok(Box::new(LocalStore))
}

/// Redacts userinfo, query values, and fragments from `url` for logs and errors.
pub fn sanitize_fetch_url(url: &str) -> String {
    // Repository URLs can carry credentials or signed query parameters; never echo those.
    let Some(scheme_idx) = url.find("://") else {
        return url.to_owned();
    };

    let (scheme, rest) = url.split_at(scheme_idx + 3);
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    let authority = if let Some(at_pos) = authority.rfind('@') {
        let host = &authority[at_pos + 1..];
        format!("{URL_REDACTION}@{host}")
    } else {
        authority.to_owned()
    };

    let tail = sanitize_url_tail(tail);
    format!("{scheme}{authority}{tail}")
}

fn sanitize_url_tail(tail: &str) -> String {
    let (before_fragment, has_fragment) = match tail.find('#') {
        Some(pos) => (&tail[..pos], true),
        None => (tail, false),
    };

    let sanitized = match before_fragment.split_once('?') {
        Some((path, query)) => format!("{path}?{}", sanitize_query(query)),
        None => before_fragment.to_owned(),
    };

    if has_fragment {
        format!("{sanitized}#{URL_REDACTION}")
    } else {
        sanitized
    }
}

fn sanitize_query(query: &str) -> String {
    query
        .split('&')
        .map(|part| match part.split_once('=') {
            _ if part.is_empty() => String::new(),
            Some((key, _value)) => format!("{key}={URL_REDACTION}"),
            None => format!("{part}={URL_REDACTION}"),
        })
        .collect::<Vec<_>>()
        .join("&")
}
