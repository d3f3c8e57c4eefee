//! Public upstream projects of the repositories lime-dev knows about.

use crate::config::{ConfigModel, UpstreamDefinition};

/// `(id, upstream url, upstream main branch)` for the built-in repositories.
const CATALOG: &[(&str, &str, &str)] = &[
    ("lime-app", "https://github.com/libremesh/lime-app.git", "develop"),
    ("lime-packages", "https://github.com/libremesh/lime-packages.git", "master"),
    ("openwrt", "https://git.openwrt.org/openwrt/openwrt.git", "main"),
    ("librerouteros", "https://gitlab.com/librerouter/librerouteros.git", "master"),
];

fn builtin(id: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    CATALOG.iter().find(|(known, _, _)| *known == id)
}

/// The upstream of `id`: configuration first, then the built-in catalog.
///
/// A configured upstream without a branch borrows the catalog's branch when
/// it names a built-in repository.
pub fn upstream_for(config: &ConfigModel, id: &str) -> Option<UpstreamDefinition> {
    let known = builtin(id);
    if let Some(upstream) = config.get_upstream(id) {
        let mut upstream = upstream.clone();
        if upstream.branch.is_none() {
            upstream.branch = known.map(|(_, _, branch)| branch.to_string());
        }
        return Some(upstream);
    }
    known.map(|(_, url, branch)| UpstreamDefinition {
        url: url.to_string(),
        branch: Some(branch.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    #[test]
    fn test_builtin_upstream() {
        let model = config::ConfigModel::default();
        let upstream = upstream_for(&model, "openwrt").unwrap();
        assert_eq!(upstream.url, "https://git.openwrt.org/openwrt/openwrt.git");
        assert_eq!(upstream.branch.as_deref(), Some("main"));
        assert!(upstream_for(&model, "my-fork").is_none());
    }

    #[test]
    fn test_config_wins() {
        let model = config::parse(
            "[upstream_remotes]\n\
             lime-app=https://example.org/lime-app.git|master\n",
        )
        .unwrap();
        let upstream = upstream_for(&model, "lime-app").unwrap();
        assert_eq!(upstream.url, "https://example.org/lime-app.git");
        assert_eq!(upstream.branch.as_deref(), Some("master"));
    }

    #[test]
    fn test_config_url_keeps_catalog_branch() {
        let model = config::parse(
            "[upstream_remotes]\n\
             lime-packages=https://mirror.example/lime-packages.git\n",
        )
        .unwrap();
        let upstream = upstream_for(&model, "lime-packages").unwrap();
        assert_eq!(upstream.url, "https://mirror.example/lime-packages.git");
        assert_eq!(upstream.branch.as_deref(), Some("master"));
    }
}
