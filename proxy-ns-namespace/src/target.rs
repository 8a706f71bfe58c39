//! Target resolution: namespace name to handle and resolver paths

use std::path::{Path, PathBuf};

use proxy_ns_core::{Error, NamespaceName, Result};

use crate::config::{NAME_PLACEHOLDER, NetnsConfig};

/// Paths of the namespace to join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: NamespaceName,
    handle_path: PathBuf,
    resolver_path: PathBuf,
    resolv_conf: PathBuf,
}

impl Target {
    /// Resolve the namespace selected on the command line (or the default)
    ///
    /// # Errors
    /// Returns error if selection is disabled but a name was given, the name
    /// is invalid, or the configured templates cannot be rendered
    pub fn resolve(selection: Option<&str>, config: &NetnsConfig) -> Result<Self> {
        let name = match selection {
            Some(_) if !config.allow_selection => {
                return Err(Error::usage(format!(
                    "namespace selection is disabled, always using '{}'",
                    config.namespace
                )));
            }
            Some(raw) => NamespaceName::new(raw)?,
            None => config.namespace.clone(),
        };

        Self::for_name(name, config)
    }

    /// Build the target for an already validated name
    ///
    /// # Errors
    /// Returns error if the configured templates cannot be rendered
    pub fn for_name(name: NamespaceName, config: &NetnsConfig) -> Result<Self> {
        config.validate()?;

        let handle_path = render(&config.handle_template, &name);
        let resolver_path = render(&config.resolver_template, &name);

        tracing::debug!(
            namespace = %name,
            handle = %handle_path.display(),
            resolver = %resolver_path.display(),
            "Resolved namespace target"
        );

        Ok(Self {
            name,
            handle_path,
            resolver_path,
            resolv_conf: config.resolv_conf.clone(),
        })
    }

    /// Namespace name
    #[must_use]
    pub const fn name(&self) -> &NamespaceName {
        &self.name
    }

    /// Path of the namespace handle
    #[must_use]
    pub fn handle_path(&self) -> &Path {
        &self.handle_path
    }

    /// Path of the namespace's resolver file
    #[must_use]
    pub fn resolver_path(&self) -> &Path {
        &self.resolver_path
    }

    /// Where the resolver file is bind-mounted
    #[must_use]
    pub fn resolv_conf(&self) -> &Path {
        &self.resolv_conf
    }
}

fn render(template: &str, name: &NamespaceName) -> PathBuf {
    PathBuf::from(template.replace(NAME_PLACEHOLDER, name.as_str()))
}
