use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use jre_cache::ApplicationCache;
use pretty_assertions::assert_eq;

/// Serves `body` with an `ETag`, answering `304` to matching conditional requests.
/// Returns the base URL and a log of the `If-None-Match` header of each request.
fn serve(body: &'static [u8], etag: &'static str, requests: usize) -> (String, Arc<Mutex<Vec<Option<String>>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    thread::spawn(move || {
        for stream in listener.incoming().take(requests) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut if_none_match = None;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("if-none-match") {
                        if_none_match = Some(value.trim().to_owned());
                    }
                }
            }

            let not_modified = if_none_match.as_deref() == Some(etag);
            log.lock().unwrap().push(if_none_match);

            if not_modified {
                write!(
                    stream,
                    "HTTP/1.1 304 Not Modified\r\nETag: {etag}\r\nConnection: close\r\n\r\n"
                )
                .unwrap();
            } else {
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nETag: {etag}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                )
                .unwrap();
                stream.write_all(body).unwrap();
            }
        }
    });

    (format!("http://{addr}"), seen)
}

#[test]
fn http_entries_are_revalidated_with_etag() {
    let (base, seen) = serve(b"index", "\"v1\"", 2);
    let cache_dir = tempfile::tempdir().unwrap();
    let cache = ApplicationCache::new(cache_dir.path());
    let uri = format!("{base}/index.json");

    let first = cache.get(&uri).unwrap().path().to_path_buf();
    let second = cache.get(&uri).unwrap().path().to_path_buf();

    assert_eq!(first, second);
    assert_eq!(std::fs::read(&second).unwrap(), b"index");
    assert_eq!(
        *seen.lock().unwrap(),
        vec![None, Some("\"v1\"".to_owned())]
    );
}

#[test]
fn http_errors_do_not_leak_credentials() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let cache_dir = tempfile::tempdir().unwrap();
    let cache = ApplicationCache::new(cache_dir.path());
    let err = cache
        .get(&format!("http://user:hunter2@{addr}/jre.tar.gz?sig=hunter2"))
        .unwrap_err();
    let message = err.to_string();
    assert!(!message.contains("hunter2"), "{message}");
}
