//! Server address helpers
//!
//! The server address is configured as the REST API base, for example
//! `https://server.com:8081/artifactory/api`. Downloads and uploads use the
//! same address without the trailing `/api`.

/// API base without trailing slashes
pub fn api_base(server_api: &str) -> &str {
    server_api.trim().trim_end_matches('/')
}

/// Server address without the `/api` suffix
pub fn content_base(server_api: &str) -> &str {
    let base = api_base(server_api);
    base.strip_suffix("/api").unwrap_or(base)
}

/// `{api}/storage/{item}` for a `repo/folder/...` item path
pub fn storage_uri(server_api: &str, item_path: &str) -> String {
    format!(
        "{}/storage/{}",
        api_base(server_api),
        item_path.trim_matches('/')
    )
}

/// Content URI of `file` inside `repo_path` (e.g. `/repo/folder/`)
pub fn content_uri(server_api: &str, repo_path: &str, file: &str) -> String {
    let repo_path = repo_path.trim_matches('/');
    if repo_path.is_empty() {
        format!("{}/{}", content_base(server_api), file)
    } else {
        format!("{}/{}/{}", content_base(server_api), repo_path, file)
    }
}

/// Storage URI that corresponds to a download URI on the same server
pub fn artifact_uri_from_download_uri(server_api: &str, download_uri: &str) -> String {
    let content = content_base(server_api);
    let suffix = download_uri
        .strip_prefix(content)
        .unwrap_or(download_uri)
        .trim_start_matches('/');
    storage_uri(server_api, suffix)
}

/// Storage URI for either a storage URI or a download URI on the same server
pub fn to_storage_uri(server_api: &str, uri: &str) -> String {
    let uri = uri.trim();
    if uri.contains(crate::STORAGE_MARKER) {
        uri.to_string()
    } else {
        artifact_uri_from_download_uri(server_api, uri)
    }
}

/// Content URI for either a storage URI or a download URI
pub fn to_content_uri(uri: &str) -> String {
    let uri = uri.trim();
    match uri.split_once(crate::STORAGE_MARKER) {
        Some((base, item)) => format!("{}/{}", base, item.trim_start_matches('/')),
        None => uri.to_string(),
    }
}

/// Last path segment of a URI, without query string
pub fn file_name_from_uri(uri: &str) -> Option<&str> {
    uri.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|s| !s.is_empty()))
        .filter(|name| !name.contains("://") && !name.ends_with(':'))
}

/// Ensure a repository path reads `/repo/folder/`
pub fn normalize_repo_path(path: &str) -> String {
    let inner = path.trim().trim_matches('/');
    if inner.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = "https://server.com:8081/artifactory/api/";

    #[test]
    fn test_bases() {
        assert_eq!(api_base(API), "https://server.com:8081/artifactory/api");
        assert_eq!(content_base(API), "https://server.com:8081/artifactory");
    }

    #[test]
    fn test_uris() {
        assert_eq!(
            storage_uri(API, "/images/win22/"),
            "https://server.com:8081/artifactory/api/storage/images/win22"
        );
        assert_eq!(
            content_uri(API, "/images/win22/", "a.ova"),
            "https://server.com:8081/artifactory/images/win22/a.ova"
        );
        assert_eq!(
            artifact_uri_from_download_uri(
                API,
                "https://server.com:8081/artifactory/images/win22/a.ova"
            ),
            "https://server.com:8081/artifactory/api/storage/images/win22/a.ova"
        );
        assert_eq!(
            to_storage_uri(API, "https://server.com:8081/artifactory/api/storage/images/a.ova"),
            "https://server.com:8081/artifactory/api/storage/images/a.ova"
        );
        assert_eq!(
            to_storage_uri(API, "https://server.com:8081/artifactory/images/a.ova"),
            "https://server.com:8081/artifactory/api/storage/images/a.ova"
        );
        assert_eq!(
            to_content_uri("https://server.com:8081/artifactory/api/storage/images/win22/a.ova"),
            "https://server.com:8081/artifactory/images/win22/a.ova"
        );
        assert_eq!(
            to_content_uri(" https://server.com:8081/artifactory/images/a.ova "),
            "https://server.com:8081/artifactory/images/a.ova"
        );
    }

    #[test]
    fn test_file_name_from_uri() {
        assert_eq!(
            file_name_from_uri("http://h/artifactory/images/a.ova?x=1"),
            Some("a.ova")
        );
        assert_eq!(file_name_from_uri("http://h/artifactory/images/"), Some("images"));
        assert_eq!(file_name_from_uri(""), None);
    }

    #[test]
    fn test_normalize_repo_path() {
        assert_eq!(normalize_repo_path("repo/folder"), "/repo/folder/");
        assert_eq!(normalize_repo_path("/repo/"), "/repo/");
        assert_eq!(normalize_repo_path(""), "/");
    }
}
