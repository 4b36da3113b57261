use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use wsconsole_http::codec::write_head;
use wsconsole_http::handler::{ContentProvider, ResponseWriter};
use wsconsole_http::protocol::{HttpRequest, ResponseHead, SendError, StatusLine, Utf8Bytes};

use super::{content_type, internal_error, not_found};

/// Maps a request path, already stripped of the mount prefix, to a file name.
pub type PathFilter = fn(Utf8Bytes) -> Utf8Bytes;

/// Serves `*.js` and `*.css` requests from `*.js.txt` and `*.css.txt` files.
///
/// Useful when the asset directory is packaged by tooling that only keeps text files.
pub fn js_txt_filter(path: Utf8Bytes) -> Utf8Bytes {
    if path.ends_with(".js") || path.ends_with(".css") { path.concat(".txt") } else { path }
}

/// Serves the files below `root` for request paths starting with `prefix`.
///
/// The prefix is removed before the path is resolved, so a mount at `/static` over
/// `www` answers `/static/app.js` from `www/app.js`, not `www/static/app.js`. A mount
/// at `/` resolves the whole request path below `root`. The query string is ignored.
#[derive(Debug, Clone)]
pub struct DirectoryMount {
    prefix: Utf8Bytes,
    root: PathBuf,
    filter: Option<PathFilter>,
}

impl DirectoryMount {
    /// Mounts `root` at `prefix`, without a path filter.
    pub fn new(prefix: impl Into<Utf8Bytes>, root: impl Into<PathBuf>) -> Self {
        Self { prefix: prefix.into(), root: root.into(), filter: None }
    }

    /// Rewrites the resolved path before it is opened, see [`js_txt_filter`].
    #[must_use]
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn prefix(&self) -> &Utf8Bytes {
        &self.prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The request path with index defaulting applied and the query string removed.
    fn request_path(request: &HttpRequest) -> Utf8Bytes {
        let path = request.index_path();
        let Some(query) = path.index_of(b'?') else {
            return path;
        };

        let path = path.sub_bytes_len(0, query);
        if path.is_empty() {
            Utf8Bytes::from_static("/index.html")
        } else if path.ends_with("/") {
            path.concat("index.html")
        } else {
            path
        }
    }

    /// The file answering `request`, `None` if the path may not leave the root.
    fn resolve(&self, request: &HttpRequest) -> Option<PathBuf> {
        let path = Self::request_path(request);
        if !path.starts_with(&self.prefix) {
            return None;
        }

        let mut relative = path.sub_bytes(self.prefix.len());
        if let Some(filter) = self.filter {
            relative = filter(relative);
        }

        let relative = relative.to_str().ok()?;
        let mut file = self.root.clone();
        for segment in relative.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => return None,
                segment => file.push(segment),
            }
        }
        Some(file)
    }
}

#[async_trait]
impl ContentProvider for DirectoryMount {
    fn matches(&self, request: &HttpRequest) -> bool {
        Self::request_path(request).starts_with(&self.prefix)
    }

    async fn respond(&self, request: &HttpRequest, out: &mut ResponseWriter<'_>) -> Result<(), SendError> {
        let Some(file_path) = self.resolve(request) else {
            return not_found(out, request).await;
        };

        let mut file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return not_found(out, request).await,
            Err(e) => {
                warn!(file = %file_path.display(), cause = %e, "failed to open file");
                return internal_error(out, &e.to_string()).await;
            }
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return not_found(out, request).await;
        }

        let head = ResponseHead::new(StatusLine::OK)
            .header("Content-Type", content_type(Self::request_path(request).as_bytes()).to_string())
            .header("Content-Length", metadata.len().to_string());
        write_head(&mut *out, &head).await?;

        tokio::io::copy(&mut file, &mut *out).await?;
        out.flush().await?;
        info!(request = %request, "200 <=");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempRoot(PathBuf);

    impl TempRoot {
        fn new(name: &str) -> Self {
            let root = std::env::temp_dir().join(format!("wsconsole-{}-{name}", std::process::id()));
            let _ = std::fs::remove_dir_all(&root);
            std::fs::create_dir_all(root.join("js")).unwrap();
            std::fs::write(root.join("index.html"), "<html>console</html>").unwrap();
            std::fs::write(root.join("js/app.js"), "plain();").unwrap();
            std::fs::write(root.join("js/app.js.txt"), "filtered();").unwrap();
            Self(root)
        }
    }

    impl Drop for TempRoot {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn get(path: &str) -> HttpRequest {
        HttpRequest::new(Utf8Bytes::from(format!("GET {path} HTTP/1.0")))
    }

    async fn respond(mount: &DirectoryMount, path: &str) -> String {
        let mut out = Vec::new();
        mount.respond(&get(path), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn matches_on_prefix() {
        let mount = DirectoryMount::new("/static", "/srv");

        assert!(mount.matches(&get("/static/app.js")));
        assert!(!mount.matches(&get("/other/app.js")));
        assert!(!mount.matches(&get("/")));
        assert!(DirectoryMount::new("/", "/srv").matches(&get("/")));
    }

    #[test]
    fn resolves_below_root() {
        let mount = DirectoryMount::new("/static", "/srv/www");

        assert_eq!(mount.resolve(&get("/static/js/app.js")), Some(PathBuf::from("/srv/www/js/app.js")));
        assert_eq!(mount.resolve(&get("/static/")), Some(PathBuf::from("/srv/www/index.html")));
        assert_eq!(mount.resolve(&get("/static/?v=1")), Some(PathBuf::from("/srv/www/index.html")));
        assert_eq!(mount.resolve(&get("/static/a.css?v=1")), Some(PathBuf::from("/srv/www/a.css")));
        assert_eq!(mount.resolve(&get("/static/../etc/passwd")), None);
        assert_eq!(mount.resolve(&get("/static/js\\..\\..\\secret")), None);
    }

    #[test]
    fn root_mount_keeps_whole_path() {
        let root = DirectoryMount::new("/", "/srv/www");
        let nested = DirectoryMount::new("/static", "/srv/www");

        assert_eq!(root.resolve(&get("/static/app.js")), Some(PathBuf::from("/srv/www/static/app.js")));
        assert_eq!(nested.resolve(&get("/static/app.js")), Some(PathBuf::from("/srv/www/app.js")));
    }

    #[test]
    fn filter_rewrites_scripts() {
        assert_eq!(js_txt_filter(Utf8Bytes::from_static("/app.js")), "/app.js.txt");
        assert_eq!(js_txt_filter(Utf8Bytes::from_static("/app.css")), "/app.css.txt");
        assert_eq!(js_txt_filter(Utf8Bytes::from_static("/index.html")), "/index.html");
    }

    #[tokio::test]
    async fn serves_existing_file() {
        let root = TempRoot::new("serve");
        let mount = DirectoryMount::new("/", root.0.clone());

        let response = respond(&mount, "/").await;
        assert_eq!(
            response,
            "HTTP/1.0 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: 20\r\n\r\n<html>console</html>"
        );
    }

    #[tokio::test]
    async fn serves_filtered_file_with_requested_type() {
        let root = TempRoot::new("filter");
        let mount = DirectoryMount::new("/", root.0.clone()).with_filter(js_txt_filter);

        let response = respond(&mount, "/js/app.js").await;
        assert!(response.starts_with("HTTP/1.0 200 OK\r\nContent-Type: text/javascript\r\n"));
        assert!(response.ends_with("\r\n\r\nfiltered();"));
    }

    #[tokio::test]
    async fn missing_file_and_directory_are_not_found() {
        let root = TempRoot::new("missing");
        let mount = DirectoryMount::new("/", root.0.clone());

        assert_eq!(respond(&mount, "/nope.html").await, "HTTP/1.0 404 NOT FOUND\r\n\r\n");
        assert_eq!(respond(&mount, "/js").await, "HTTP/1.0 404 NOT FOUND\r\n\r\n");
        assert_eq!(respond(&mount, "/../secret").await, "HTTP/1.0 404 NOT FOUND\r\n\r\n");
    }
}
