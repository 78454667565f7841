//! URL joining and ancestor-directory enumeration.

use url::Url;

use crate::error::TransportError;

/// Resolve `reference` against `base`, treating `base` as a directory: when
/// the reference has a non-empty path and the base path lacks a trailing
/// `/`, one is appended before standard RFC 3986 resolution.
pub fn resolve(base: &Url, reference: &str) -> Result<Url, TransportError> {
    let invalid = || TransportError::Location {
        location: reference.to_string(),
    };
    if reference.is_empty() {
        return Ok(base.clone());
    }
    if base.path().ends_with('/') {
        return base.join(reference).map_err(|_| invalid());
    }
    let mut adjusted = base.clone();
    adjusted.set_path(&format!("{}/", base.path()));
    adjusted.join(reference).map_err(|_| invalid())
}

/// Every ancestor directory of `uri` strictly below `base`, deepest first.
/// Drives MKCOL before WebDAV uploads.
pub fn directories(base: &Url, uri: &Url) -> Vec<Url> {
    let mut result = Vec::new();
    if uri.scheme() != base.scheme() || uri.authority() != base.authority() {
        return result;
    }
    let base_dir = normalized_dir_path(base);

    // the directory containing the resource
    let Ok(mut current) = uri.join(".") else {
        return result;
    };
    loop {
        let path = current.path();
        if path.is_empty() || path == "/" {
            break;
        }
        if path == base_dir || !path.starts_with(base_dir.as_str()) {
            break;
        }
        result.push(current.clone());
        let Ok(parent) = current.join("..") else {
            break;
        };
        if parent.path() == current.path() {
            break;
        }
        current = parent;
    }
    result
}

fn normalized_dir_path(base: &Url) -> String {
    let path = base.path();
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[test]
    fn resolve_appends_missing_slash() {
        let base = url("https://repo.example.org/releases");
        let resolved = resolve(&base, "org/demo/lib-1.0.jar").unwrap();
        assert_eq!(
            resolved.as_str(),
            "https://repo.example.org/releases/org/demo/lib-1.0.jar"
        );
    }

    #[test]
    fn resolve_keeps_existing_slash() {
        let base = url("https://repo.example.org/releases/");
        let resolved = resolve(&base, "org/demo/lib-1.0.jar").unwrap();
        assert_eq!(
            resolved.as_str(),
            "https://repo.example.org/releases/org/demo/lib-1.0.jar"
        );
    }

    #[test]
    fn resolve_preserves_scheme_and_authority() {
        let base = url("https://user@repo.example.org:8443/releases/");
        let resolved = resolve(&base, "a/b.jar").unwrap();
        assert_eq!(resolved.scheme(), base.scheme());
        assert_eq!(resolved.authority(), base.authority());
    }

    #[test]
    fn directories_descend_strictly_below_base() {
        let base = url("https://repo.example.org/releases/");
        let target = resolve(&base, "dir1/dir2/file.txt").unwrap();
        let dirs = directories(&base, &target);
        let paths: Vec<&str> = dirs.iter().map(Url::path).collect();
        assert_eq!(paths, vec!["/releases/dir1/dir2/", "/releases/dir1/"]);
        // none equals the base, none is the server root
        assert!(dirs.iter().all(|d| d.path() != "/releases/"));
        assert!(dirs.iter().all(|d| d.path() != "/"));
    }

    #[test]
    fn directories_empty_for_file_directly_under_base() {
        let base = url("https://repo.example.org/releases/");
        let target = resolve(&base, "file.txt").unwrap();
        assert!(directories(&base, &target).is_empty());
    }

    #[test]
    fn directories_empty_for_foreign_authority() {
        let base = url("https://repo.example.org/releases/");
        let target = url("https://other.example.org/releases/dir/file.txt");
        assert!(directories(&base, &target).is_empty());
    }
}
