use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use toml_edit::{Document, Item, Table};

/// The umbrella package re-exporting every `vc_*` library crate.
const UMBRELLA: &str = "vc_persist";
const PREFIX: &str = "vc_";

/// Dependency tables of the caller's `Cargo.toml`.
///
/// Generated code must name library crates the way the invoking crate
/// sees them. For a crate `vc_name`:
///
/// 1. listed in `dependencies`: `::vc_name`;
/// 2. the umbrella `vc_persist` is listed instead: `::vc_persist::name`;
/// 3. the same two checks in `dev-dependencies`;
/// 4. otherwise `::vc_name`.
///
/// A crate naming itself from macro output needs an
/// `extern crate self as vc_name;` alias in its root.
///
/// ```
/// use vc_macro_utils::Manifest;
///
/// let path: syn::Path = Manifest::shared(|manifest| manifest.crate_path("vc_binding"));
/// assert_eq!(path.segments.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Manifest {
    dependencies: Vec<String>,
    dev_dependencies: Vec<String>,
}

impl Manifest {
    fn parse(text: &str) -> Self {
        let Ok(document) = Document::parse(text.to_owned()) else {
            return Self::default();
        };
        let names = |key: &str| match document.get(key) {
            Some(Item::Table(table)) => Self::keys(table),
            _ => Vec::new(),
        };
        Self {
            dependencies: names("dependencies"),
            dev_dependencies: names("dev-dependencies"),
        }
    }

    fn keys(table: &Table) -> Vec<String> {
        table.iter().map(|(key, _)| key.to_string()).collect()
    }

    fn lookup(deps: &[String], name: &str) -> Option<String> {
        if deps.iter().any(|dep| dep == name) {
            return Some(format!("::{name}"));
        }
        let module = name.strip_prefix(PREFIX)?;
        deps.iter()
            .any(|dep| dep == UMBRELLA)
            .then(|| format!("::{UMBRELLA}::{module}"))
    }

    /// Path of the library crate `name` as seen from the caller.
    pub fn crate_path(&self, name: &str) -> syn::Path {
        let path = Self::lookup(&self.dependencies, name)
            .or_else(|| Self::lookup(&self.dev_dependencies, name))
            .unwrap_or_else(|| format!("::{name}"));
        syn::parse_str(&path).unwrap_or_else(|_| panic!("`{name}` is not a valid crate name"))
    }

    /// Runs `f` on the manifest of the crate being compiled.
    ///
    /// Manifests are cached per path and re-read when the file changes. A
    /// missing or unreadable manifest behaves as an empty one.
    pub fn shared<R>(f: impl FnOnce(&Self) -> R) -> R {
        static MANIFESTS: RwLock<BTreeMap<PathBuf, (SystemTime, Manifest)>> = RwLock::new(BTreeMap::new());

        let Some(path) = env::var_os("CARGO_MANIFEST_DIR").map(|dir| PathBuf::from(dir).join("Cargo.toml")) else {
            return f(&Self::default());
        };
        let modified = fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        {
            let manifests = MANIFESTS.read().unwrap_or_else(PoisonError::into_inner);
            if let Some((time, manifest)) = manifests.get(&path)
                && *time == modified
            {
                return f(manifest);
            }
        }

        let manifest = fs::read_to_string(&path)
            .map(|text| Self::parse(&text))
            .unwrap_or_default();
        let result = f(&manifest);
        MANIFESTS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, (modified, manifest));
        result
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use quote::ToTokens;

    use super::Manifest;

    fn path(manifest: &Manifest, name: &str) -> String {
        manifest.crate_path(name).to_token_stream().to_string().replace(' ', "")
    }

    #[test]
    fn direct_dependency_wins() {
        let manifest = Manifest::parse(
            r#"
            [dependencies]
            vc_binding = { path = "../vc_binding" }
            vc_persist = "0.0.1"
            "#,
        );
        assert_eq!(path(&manifest, "vc_binding"), "::vc_binding");
    }

    #[test]
    fn umbrella_re_export() {
        let manifest = Manifest::parse(
            r#"
            [dev-dependencies]
            vc_persist = { path = "../.." }
            "#,
        );
        assert_eq!(path(&manifest, "vc_binding"), "::vc_persist::binding");
    }

    #[test]
    fn unknown_falls_back_to_the_crate_name() {
        let manifest = Manifest::parse("not toml [");
        assert_eq!(path(&manifest, "vc_binding"), "::vc_binding");
    }
}
