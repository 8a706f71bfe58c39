//! Namespace configuration

use std::path::{Path, PathBuf};

use proxy_ns_core::{Error, NamespaceName, Result};
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the namespace name in path templates
pub const NAME_PLACEHOLDER: &str = "{name}";

/// System-wide configuration file read by the `proxy-ns` binary
///
/// `/etc/proxy-ns/config.json` belongs to the provider daemon and has a
/// different shape, so the join settings live in their own file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/proxy-ns/netns.json";

/// Default handle template, as created by `ip netns` and the provider daemon
pub const DEFAULT_HANDLE_TEMPLATE: &str = "/var/run/netns/{name}";

/// Default resolver template written by the provider daemon
pub const DEFAULT_RESOLVER_TEMPLATE: &str = "/run/proxy-ns/{name}/resolv.conf";

/// Resolver file every libc resolver reads
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Provider daemon named in the missing-namespace diagnostic
pub const DEFAULT_PROVIDER: &str = "proxy-nsd";

/// Configuration of the join sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetnsConfig {
    /// Namespace joined when none is selected on the command line
    pub namespace: NamespaceName,

    /// Path template of the namespace handle
    pub handle_template: String,

    /// Path template of the namespace's resolver file
    pub resolver_template: String,

    /// Bind-mount target for the resolver file
    pub resolv_conf: PathBuf,

    /// Accept `-n`/`--net` on the command line
    pub allow_selection: bool,

    /// Report a missing handle separately from other open failures
    pub distinguish_missing: bool,

    /// Daemon expected to create the handles
    pub provider: String,
}

impl Default for NetnsConfig {
    fn default() -> Self {
        Self {
            namespace: NamespaceName::default(),
            handle_template: DEFAULT_HANDLE_TEMPLATE.to_string(),
            resolver_template: DEFAULT_RESOLVER_TEMPLATE.to_string(),
            resolv_conf: PathBuf::from(DEFAULT_RESOLV_CONF),
            allow_selection: true,
            distinguish_missing: true,
            provider: DEFAULT_PROVIDER.to_string(),
        }
    }
}

impl NetnsConfig {
    /// Create a new configuration with the named-namespace defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-namespace variant: one hard-coded namespace and resolver file
    #[must_use]
    pub fn fixed(namespace: NamespaceName, resolver_path: impl Into<String>) -> Self {
        Self {
            namespace,
            resolver_template: resolver_path.into(),
            allow_selection: false,
            ..Self::default()
        }
    }

    /// Set the default namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceName) -> Self {
        self.namespace = namespace;
        self
    }

    /// Set the handle path template
    #[must_use]
    pub fn with_handle_template(mut self, template: impl Into<String>) -> Self {
        self.handle_template = template.into();
        self
    }

    /// Set the resolver path template
    #[must_use]
    pub fn with_resolver_template(mut self, template: impl Into<String>) -> Self {
        self.resolver_template = template.into();
        self
    }

    /// Set the bind-mount target
    #[must_use]
    pub fn with_resolv_conf(mut self, path: impl Into<PathBuf>) -> Self {
        self.resolv_conf = path.into();
        self
    }

    /// Allow or refuse `--net`
    #[must_use]
    pub fn with_selection(mut self, enable: bool) -> Self {
        self.allow_selection = enable;
        self
    }

    /// Distinguish a missing handle from other open failures
    #[must_use]
    pub fn with_distinguish_missing(mut self, enable: bool) -> Self {
        self.distinguish_missing = enable;
        self
    }

    /// Set the provider daemon name
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Check that every path can be rendered and is absolute
    ///
    /// # Errors
    /// Returns error on empty, relative, or malformed templates
    pub fn validate(&self) -> Result<()> {
        check_template("handle_template", &self.handle_template)?;
        check_template("resolver_template", &self.resolver_template)?;

        if !self.resolv_conf.is_absolute() {
            return Err(Error::invalid_config(format!(
                "resolv_conf must be an absolute path, got {}",
                self.resolv_conf.display()
            )));
        }

        if self.provider.is_empty() {
            return Err(Error::invalid_config("provider cannot be empty"));
        }

        Ok(())
    }

    /// Load a configuration file; missing fields take their defaults
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;

        let config: Self = serde_json::from_str(&raw).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    ///
    /// # Errors
    /// Returns error if the file exists but is unreadable or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }
}

fn check_template(field: &str, template: &str) -> Result<()> {
    if !template.starts_with('/') {
        return Err(Error::invalid_config(format!(
            "{field} must be an absolute path, got '{template}'"
        )));
    }

    // Only `{name}` may appear between braces.
    let stripped = template.replace(NAME_PLACEHOLDER, "");
    if stripped.contains('{') || stripped.contains('}') {
        return Err(Error::invalid_config(format!(
            "{field} has an unknown placeholder: '{template}'"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NetnsConfig::default();
        assert_eq!(config.namespace.as_str(), "main");
        assert_eq!(config.handle_template, "/var/run/netns/{name}");
        assert_eq!(config.resolver_template, "/run/proxy-ns/{name}/resolv.conf");
        assert_eq!(config.resolv_conf, PathBuf::from("/etc/resolv.conf"));
        assert!(config.allow_selection);
        assert!(config.distinguish_missing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = NetnsConfig::new()
            .with_namespace(NamespaceName::new("tor").unwrap())
            .with_selection(false)
            .with_distinguish_missing(false)
            .with_provider("tord");

        assert_eq!(config.namespace.as_str(), "tor");
        assert!(!config.allow_selection);
        assert!(!config.distinguish_missing);
        assert_eq!(config.provider, "tord");
    }

    #[test]
    fn test_fixed_variant() {
        let config = NetnsConfig::fixed(
            NamespaceName::new("proxy").unwrap(),
            "/run/proxy-ns/resolv.conf",
        );

        assert!(!config.allow_selection);
        assert_eq!(config.resolver_template, "/run/proxy-ns/resolv.conf");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_relative_template() {
        let config = NetnsConfig::new().with_handle_template("netns/{name}");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_rejects_unknown_placeholder() {
        let config = NetnsConfig::new().with_resolver_template("/run/{id}/resolv.conf");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));

        let config = NetnsConfig::new().with_resolver_template("/run/{name/resolv.conf");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_resolv_conf() {
        let config = NetnsConfig::new().with_resolv_conf("resolv.conf");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NetnsConfig = serde_json::from_str(r#"{"namespace": "tor"}"#).unwrap();
        assert_eq!(config.namespace.as_str(), "tor");
        assert_eq!(config.handle_template, DEFAULT_HANDLE_TEMPLATE);
        assert!(config.allow_selection);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed = serde_json::from_str::<NetnsConfig>(r#"{"namepsace": "tor"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_provider_config_is_not_read() {
        assert_ne!(SYSTEM_CONFIG_PATH, "/etc/proxy-ns/config.json");

        // The provider daemon's file sits next to ours in the same directory.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"tun_name":"tun0","tun_ip":"10.0.0.1/32","socks5_address":"127.0.0.1:1080","fake_dns":true,"fake_network":"240.0.0.0/4","dns_server":"9.9.9.9"}"#,
        )
        .unwrap();

        let file_name = Path::new(SYSTEM_CONFIG_PATH).file_name().unwrap();
        let config = NetnsConfig::load_or_default(dir.path().join(file_name)).unwrap();
        assert_eq!(config, NetnsConfig::default());
    }
}
