use super::{AdapterFactory, Cms, CmsAdapter, CmsModule, CmsOptions, ModuleLoader};
use crate::site::Site;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use futures::future::BoxFuture;
use log::debug;
use lume_shared::{LumeError, LumeResult, canonicalize_with_strip};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source text of a CMS config module.
#[derive(Debug, Clone)]
pub struct CmsSource {
    pub path: PathBuf,
    pub contents: String,
}

pub type CmsFactory = Arc<dyn Fn(&CmsSource) -> Arc<dyn Cms> + Send + Sync>;

/// Loads script config modules, handing sources with a default export to a
/// registered factory.
pub struct ScriptModuleLoader {
    factory: CmsFactory,
}

impl ScriptModuleLoader {
    pub fn new(factory: CmsFactory) -> Self {
        Self { factory }
    }

    /// Loader whose modules all export a [`FilesCms`] with default options.
    pub fn files() -> Self {
        Self::new(Arc::new(|_: &CmsSource| {
            Arc::new(FilesCms::default()) as Arc<dyn Cms>
        }))
    }

    async fn load_source(&self, path: &Path) -> LumeResult<CmsModule> {
        let contents = fs_err::tokio::read_to_string(path).await?;
        let source = CmsSource {
            path: path.to_path_buf(),
            contents,
        };

        let default_export = if has_default_export(&source.contents) {
            Some((self.factory)(&source))
        } else {
            None
        };

        debug!(
            "Loaded CMS module {} (default export: {})",
            path.display(),
            default_export.is_some()
        );

        Ok(CmsModule {
            path: source.path,
            default_export,
        })
    }
}

impl ModuleLoader for ScriptModuleLoader {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, LumeResult<CmsModule>> {
        self.load_source(path).boxed()
    }
}

/// Line-based check for `export default` or `export { x as default }`.
/// Code inside `//` and `/* */` comments does not count.
fn has_default_export(source: &str) -> bool {
    let mut in_comment = false;

    source.lines().any(|line| {
        let code = strip_comments(line, &mut in_comment);
        let code = code.trim_start();
        code.starts_with("export default")
            || (code.starts_with("export {") && code.contains(" as default"))
    })
}

/// Returns the code part of `line`. `in_comment` carries an open block
/// comment over to the next line.
fn strip_comments(line: &str, in_comment: &mut bool) -> String {
    let mut code = String::new();
    let mut rest = line;

    loop {
        if *in_comment {
            match rest.find("*/") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    *in_comment = false;
                }
                None => return code,
            }
            continue;
        }

        match (rest.find("/*"), rest.find("//")) {
            (Some(block), line_comment) if line_comment.is_none_or(|l| block < l) => {
                code.push_str(&rest[..block]);
                rest = &rest[block + 2..];
                *in_comment = true;
            }
            (_, Some(line_comment)) => {
                code.push_str(&rest[..line_comment]);
                return code;
            }
            _ => {
                code.push_str(rest);
                return code;
            }
        }
    }
}

/// CMS that only serves the site's files.
#[derive(Debug, Clone, Default)]
pub struct FilesCms {
    options: CmsOptions,
}

impl FilesCms {
    pub fn new(options: CmsOptions) -> Self {
        Self { options }
    }
}

impl Cms for FilesCms {
    fn options(&self) -> &CmsOptions {
        &self.options
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilesAdapterFactory;

impl AdapterFactory for FilesAdapterFactory {
    fn adapt<'a>(
        &'a self,
        site: &'a Site,
        cms: Arc<dyn Cms>,
    ) -> BoxFuture<'a, LumeResult<Arc<dyn CmsAdapter>>> {
        let adapter = FilesAdapter::new(site.root().to_path_buf(), &cms.options().base_path);
        async move { Ok(Arc::new(adapter) as Arc<dyn CmsAdapter>) }.boxed()
    }
}

/// Serves files from the site root under the CMS base path.
#[derive(Debug, Clone)]
pub struct FilesAdapter {
    root: PathBuf,
    base_path: String,
}

impl FilesAdapter {
    /// `root` must be canonical.
    pub fn new(root: PathBuf, base_path: &str) -> Self {
        Self {
            root,
            base_path: base_path.trim_end_matches('/').to_string(),
        }
    }

    async fn serve(&self, request: Request) -> LumeResult<Response> {
        let method = request.method().clone();
        if method != Method::GET && method != Method::HEAD {
            return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
        }

        let Some(relative) = strip_base(request.uri().path(), &self.base_path) else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };

        let Ok(relative) = percent_decode_str(relative).decode_utf8() else {
            return Ok(StatusCode::BAD_REQUEST.into_response());
        };

        let mut path = self.root.join(relative.trim_start_matches('/'));
        if path.is_dir() {
            path = path.join("index.html");
        }

        let Ok(full_path) = canonicalize_with_strip(&path) else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };
        if !self.is_within_root(&full_path) {
            return Ok(StatusCode::FORBIDDEN.into_response());
        }

        let content = fs_err::tokio::read(&full_path)
            .await
            .map_err(|e| LumeError::AdapterHandlerFailure(e.to_string()))?;

        let body = if method == Method::HEAD {
            Body::empty()
        } else {
            Body::from(content)
        };

        Ok((
            [
                (header::CONTENT_TYPE, content_type(&full_path)),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response())
    }

    /// Checks if a path is within the root directory (prevents directory traversal).
    fn is_within_root(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}

impl CmsAdapter for FilesAdapter {
    fn fetch(&self, request: Request) -> BoxFuture<'_, LumeResult<Response>> {
        self.serve(request).boxed()
    }
}

fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base.is_empty() {
        return Some(path);
    }

    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Return MIME content type
fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
        .as_str()
    {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" | "mjs" | "jsx" | "ts" | "tsx" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}
