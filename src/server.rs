//! Dev server with live reload.
//!
//! Serves the output directory over HTTP. HTML pages get a small client
//! script that long-polls [`RELOAD_PATH`]; the server answers as soon as
//! the reload generation moves past the one the page has seen. Style-only
//! changes swap style sheets in place, anything else reloads the page.

use crate::build::{BuildContext, TaskError};
use std::fs::{self, File};
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server};

/// Long-poll endpoint.
pub const RELOAD_PATH: &str = "/__assetflow/reload";

/// How long a reload poll is held open without news.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(25);

const INDEX_FILE: &str = "index.html";

const CLIENT_SCRIPT: &str = r#"<script>
(function () {
  var since = 0;
  function refreshStyles() {
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
      var url = new URL(link.href);
      url.searchParams.set('_reload', Date.now());
      link.href = url.toString();
    });
  }
  function poll() {
    fetch('/__assetflow/reload?since=' + since)
      .then(function (r) { return r.json(); })
      .then(function (event) {
        if (since > 0 && event.generation > since) {
          if (event.kind === 'css') { refreshStyles(); } else { location.reload(); return; }
        }
        since = event.generation;
        poll();
      })
      .catch(function () { setTimeout(poll, 1000); });
  }
  poll();
})();
</script>
"#;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Style sheets only; pages refresh them in place
    Css,
    /// Anything else; pages reload
    Full,
}

impl ReloadKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadKind::Css => "css",
            ReloadKind::Full => "full",
        }
    }
}

#[derive(Debug, Default)]
struct ReloadState {
    generation: u64,
    kind: Option<ReloadKind>,
}

/// Reload notification channel shared by tasks and the server.
///
/// Every notification bumps a generation counter; waiters are woken and
/// compare it to the generation they last saw.
#[derive(Debug, Clone, Default)]
pub struct LiveReload {
    inner: Arc<(Mutex<ReloadState>, Condvar)>,
}

/// State of the channel at some generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadEvent {
    /// Generation number (0 before any change)
    pub generation: u64,
    /// Kind of the latest change
    pub kind: Option<ReloadKind>,
}

impl ReloadEvent {
    /// JSON body sent to polling pages.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "generation": self.generation,
            "kind": self.kind.map(|k| k.as_str()),
        })
        .to_string()
    }
}

impl LiveReload {
    /// Create a channel at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ReloadState> {
        self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a change and wake every waiter.
    pub fn notify(&self, kind: ReloadKind) {
        let mut state = self.state();
        state.generation += 1;
        state.kind = Some(kind);
        tracing::debug!(generation = state.generation, kind = kind.as_str(), "reload");
        self.inner.1.notify_all();
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Kind of the latest change.
    pub fn last_kind(&self) -> Option<ReloadKind> {
        self.state().kind
    }

    /// Block until the generation exceeds `since` or `timeout` passes.
    pub fn wait_newer(&self, since: u64, timeout: Duration) -> ReloadEvent {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        while state.generation <= since {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = match self.inner.1.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
        ReloadEvent { generation: state.generation, kind: state.kind }
    }
}

/// Dev server setup failure.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The address could not be bound
    #[error("Failed to bind {addr}: {message}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        message: String,
    },
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Reload long-poll
    Reload {
        /// Last generation the page saw
        since: u64,
    },
    /// A file under the served root
    File(PathBuf),
    /// Nothing to serve
    NotFound,
}

/// Map a request URL to a route under `root`.
///
/// `/` and directories map to their `index.html`; any `..` segment is
/// rejected.
pub fn resolve_request(url: &str, root: &Path) -> Route {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    if path == RELOAD_PATH {
        let since = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "since")
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(0);
        return Route::Reload { since };
    }

    let decoded = percent_decode(path);
    let relative = Path::new(decoded.trim_start_matches('/'));
    if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Route::NotFound;
    }

    let mut candidate = root.join(relative);
    if candidate.is_dir() {
        candidate.push(INDEX_FILE);
    }
    if candidate.is_file() {
        Route::File(candidate)
    } else {
        Route::NotFound
    }
}

/// Decode `%XX` escapes byte by byte. Malformed escapes are kept as
/// written and invalid UTF-8 is replaced rather than rejected.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Insert the reload client before `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], CLIENT_SCRIPT, &html[at..]),
        None => format!("{}{}", html, CLIENT_SCRIPT),
    }
}

/// HTTP server for the output directory.
pub struct DevServer {
    server: Server,
    root: PathBuf,
    live_reload: LiveReload,
}

impl DevServer {
    /// Bind `addr` (`host:port`; port 0 picks a free port).
    pub fn bind(addr: &str, root: PathBuf, live_reload: LiveReload) -> Result<Self, ServerError> {
        let server = Server::http(addr)
            .map_err(|e| ServerError::Bind { addr: addr.to_string(), message: e.to_string() })?;
        Ok(Self { server, root, live_reload })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until the process ends. Each request gets its own
    /// thread so held reload polls do not block file requests.
    pub fn serve(&self) {
        for request in self.server.incoming_requests() {
            let root = self.root.clone();
            let live_reload = self.live_reload.clone();
            std::thread::spawn(move || handle(request, &root, &live_reload));
        }
    }

    /// Make a running [`serve`](Self::serve) return. Requests already
    /// being handled finish on their own threads.
    pub fn stop(&self) {
        self.server.unblock();
    }
}

fn handle(request: Request, root: &Path, live_reload: &LiveReload) {
    let url = request.url().to_string();
    let sent = match resolve_request(&url, root) {
        Route::Reload { since } => {
            let event = live_reload.wait_newer(since, POLL_TIMEOUT);
            let response = Response::from_string(event.to_json());
            let response = with_header(response, "Content-Type", "application/json");
            request.respond(with_header(response, "Cache-Control", "no-store"))
        }
        Route::File(path) => respond_file(request, &path),
        Route::NotFound => {
            tracing::debug!(%url, "not found");
            request.respond(Response::from_string("Not Found").with_status_code(404))
        }
    };
    if let Err(e) = sent {
        tracing::debug!(%url, error = %e, "failed to send response");
    }
}

fn respond_file(request: Request, path: &Path) -> std::io::Result<()> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    if mime.subtype() == mime_guess::mime::HTML {
        let html = fs::read_to_string(path)?;
        let response = Response::from_string(inject_client(&html));
        let response = with_header(response, "Content-Type", "text/html; charset=utf-8");
        return request.respond(with_header(response, "Cache-Control", "no-cache"));
    }

    let response = Response::from_file(File::open(path)?);
    let response = with_header(response, "Content-Type", mime.essence_str());
    request.respond(with_header(response, "Cache-Control", "no-cache"))
}

fn with_header<R: Read>(response: Response<R>, name: &str, value: &str) -> Response<R> {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

/// Bind the configured address for the output directory. Requests are
/// not accepted until [`DevServer::serve`] runs.
pub fn start_server(ctx: &BuildContext) -> Result<DevServer, TaskError> {
    let server_config = &ctx.config().server;
    let addr = format!("{}:{}", server_config.host, server_config.port);
    let live_reload = ctx.live_reload().cloned().unwrap_or_default();

    let server = DevServer::bind(&addr, ctx.dist_dir(), live_reload)
        .map_err(|e| TaskError::Service(e.to_string()))?;
    let shown = server.local_addr().map_or(addr, |a| a.to_string());
    tracing::info!("Serving {} at http://{}", ctx.dist_dir().display(), shown);
    Ok(server)
}
