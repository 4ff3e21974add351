//! Package path handling
//!
//! Declared package paths may be relative to the document, to the user's home
//! directory, or contain environment variables. The resolver also needs to
//! probe whether a candidate package still exists on disk.

use std::path::{Component, Path, PathBuf};

/// How a declared package path is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRelativity {
    RelativeToDocument,
    RelativeToHome,
    Absolute,
    ResolveEnvVars,
}

impl PathRelativity {
    /// Unrecognized values yield `None`, meaning "use the path as-is"
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "relativeToZap" => Some(PathRelativity::RelativeToDocument),
            "relativeToHome" => Some(PathRelativity::RelativeToHome),
            "absolute" => Some(PathRelativity::Absolute),
            "resolveEnvVars" => Some(PathRelativity::ResolveEnvVars),
            _ => None,
        }
    }
}

/// Build the absolute path of a declared package
///
/// The result is lexically normalized so it compares equal to the stored
/// path of an installed package.
pub fn create_absolute_path(
    path: &str,
    relativity: Option<&str>,
    document_path: Option<&Path>,
) -> PathBuf {
    let joined = match relativity.and_then(PathRelativity::parse) {
        Some(PathRelativity::RelativeToDocument) => {
            match document_path.and_then(Path::parent) {
                Some(dir) => dir.join(path),
                None => PathBuf::from(path),
            }
        }
        Some(PathRelativity::RelativeToHome) => match dirs::home_dir() {
            Some(home) => home.join(path),
            None => PathBuf::from(path),
        },
        Some(PathRelativity::ResolveEnvVars) => {
            PathBuf::from(expand_env_vars(path, |name| std::env::var(name).ok()))
        }
        Some(PathRelativity::Absolute) | None => PathBuf::from(path),
    };
    normalize_path(&joined)
}

/// Drop `.` segments and fold `..` into the preceding segment
///
/// Purely lexical: symlinks are not consulted. `..` at the root stays at the
/// root; leading `..` of a relative path are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}

/// Expand `$NAME` and `${NAME}`; unknown variables expand to nothing
pub fn expand_env_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let mut name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
            if !closed {
                out.push_str("${");
                out.push_str(&name);
                continue;
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                out.push('$');
                continue;
            }
        }

        out.push_str(&lookup(&name).unwrap_or_default());
    }

    out
}

/// Filesystem existence probe used to break ties between candidate packages
pub trait PathProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// Probe backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl PathProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "SDK" => Some("/opt/sdk".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_relative_to_document_joins_parent_dir() {
        let path = create_absolute_path(
            "../zcl/zcl.json",
            Some("relativeToZap"),
            Some(Path::new("/work/project/light.zap")),
        );
        assert_eq!(path, PathBuf::from("/work/zcl/zcl.json"));
    }

    #[test]
    fn test_normalize_path_folds_dots() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c.xml")), PathBuf::from("/a/c.xml"));
        assert_eq!(normalize_path(Path::new("/../a.xml")), PathBuf::from("/a.xml"));
        assert_eq!(normalize_path(Path::new("../x/../y.xml")), PathBuf::from("../y.xml"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(normalize_path(Path::new("/opt/sdk/")), PathBuf::from("/opt/sdk"));
    }

    #[test]
    fn test_home_relative_path_is_normalized() {
        let path = create_absolute_path("./zcl/../zcl.json", Some("relativeToHome"), None);
        assert!(!path.components().any(|c| matches!(c, Component::CurDir | Component::ParentDir)));
        assert!(path.ends_with("zcl.json"));
    }

    #[test]
    fn test_missing_or_unknown_relativity_keeps_path() {
        assert_eq!(create_absolute_path("/a.xml", None, None), PathBuf::from("/a.xml"));
        assert_eq!(
            create_absolute_path("a.xml", Some("sideways"), Some(Path::new("/x/y.zap"))),
            PathBuf::from("a.xml")
        );
        assert_eq!(
            create_absolute_path("a.xml", Some("relativeToZap"), None),
            PathBuf::from("a.xml")
        );
    }

    #[test]
    fn test_env_var_expansion() {
        assert_eq!(expand_env_vars("$SDK/zcl.json", env), "/opt/sdk/zcl.json");
        assert_eq!(expand_env_vars("${SDK}/gen/templates.json", env), "/opt/sdk/gen/templates.json");
        assert_eq!(expand_env_vars("$NOPE/x", env), "/x");
        assert_eq!(expand_env_vars("cost: $5 and $", env), "cost:  and $");
        assert_eq!(expand_env_vars("${SDK", env), "${SDK");
    }
}
