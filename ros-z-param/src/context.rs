use std::path::PathBuf;
use std::sync::{Arc, atomic::AtomicUsize};

use serde_json::json;
use zenoh::{Result, Session, Wait};

use crate::{Builder, node::ZNodeBuilder};

/// Process-wide entity id allocator shared by every node of a context.
#[derive(Debug, Default)]
pub struct GlobalCounter(AtomicUsize);

impl GlobalCounter {
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, std::sync::atomic::Ordering::AcqRel)
    }
}

#[derive(Default)]
pub struct ZContextBuilder {
    domain_id: usize,
    config_file: Option<PathBuf>,
    config_overrides: Vec<(String, serde_json::Value)>,
}

impl ZContextBuilder {
    /// Set the ROS domain ID
    pub fn with_domain_id(mut self, domain_id: usize) -> Self {
        self.domain_id = domain_id;
        self
    }

    /// Load the Zenoh configuration from a JSON5 file
    pub fn with_config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Add a JSON configuration override
    ///
    /// # Example
    /// ```no_run
    /// use ros_z_param::{Builder, context::ZContextBuilder};
    /// use serde_json::json;
    ///
    /// # fn main() -> zenoh::Result<()> {
    /// let ctx = ZContextBuilder::default()
    ///     .with_json("scouting/multicast/enabled", json!(false))
    ///     .with_json("connect/endpoints", json!(["tcp/127.0.0.1:7447"]))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_json<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.config_overrides.push((key.into(), value));
        self
    }

    /// Convenience method: disable multicast scouting
    pub fn disable_multicast_scouting(self) -> Self {
        self.with_json("scouting/multicast/enabled", json!(false))
    }

    /// Convenience method: connect to specific endpoints
    pub fn with_connect_endpoints<I, S>(self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints: Vec<String> = endpoints.into_iter().map(|s| s.into()).collect();
        self.with_json("connect/endpoints", json!(endpoints))
    }

    /// Convenience method: connect to localhost zenohd
    pub fn connect_to_local_zenohd(self) -> Self {
        self.with_connect_endpoints(["tcp/127.0.0.1:7447"])
    }

    /// Convenience method: set mode (peer, client, router)
    pub fn with_mode<S: Into<String>>(self, mode: S) -> Self {
        self.with_json("mode", json!(mode.into()))
    }

    /// Convenience method: a session that neither scouts nor connects.
    ///
    /// Nodes of such a context only see each other, which is what the
    /// integration tests rely on.
    pub fn isolated(self) -> Self {
        self.disable_multicast_scouting()
            .with_json("connect/endpoints", json!([]))
            .with_json("listen/endpoints", json!([]))
    }

    /// Parse and apply overrides from the `ROSZ_CONFIG_OVERRIDE` environment variable
    ///
    /// Expected format: `key1=value1;key2=value2`, values being valid JSON5
    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(overrides_str) = std::env::var("ROSZ_CONFIG_OVERRIDE") {
            tracing::debug!(
                "Applying config overrides from ROSZ_CONFIG_OVERRIDE: {}",
                overrides_str
            );
            self.config_overrides
                .extend(parse_overrides(&overrides_str)?);
        }
        Ok(self)
    }
}

fn parse_overrides(overrides: &str) -> Result<Vec<(String, serde_json::Value)>> {
    let mut parsed = Vec::new();
    for pair in overrides.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(format!(
                "Invalid ROSZ_CONFIG_OVERRIDE format: '{}'. Expected 'key=value'",
                pair
            )
            .into());
        };
        let (key, value) = (key.trim(), value.trim());
        let json_value = json5::from_str::<serde_json::Value>(value).map_err(|e| {
            format!(
                "Failed to parse ROSZ_CONFIG_OVERRIDE value for key '{}': {} (value: {})",
                key, e, value
            )
        })?;
        tracing::debug!("Override: {} = {}", key, json_value);
        parsed.push((key.to_string(), json_value));
    }
    Ok(parsed)
}

impl Builder for ZContextBuilder {
    type Output = ZContext;

    fn build(mut self) -> Result<ZContext> {
        // Priority order:
        // 1. Config file passed via with_config_file()
        // 2. ROSZ_CONFIG_FILE environment variable
        // 3. Default config
        let mut config = if let Some(ref config_file) = self.config_file {
            zenoh::Config::from_file(config_file)?
        } else if let Ok(path) = std::env::var("ROSZ_CONFIG_FILE") {
            zenoh::Config::from_file(path)?
        } else {
            zenoh::Config::default()
        };

        self = self.apply_env_overrides()?;

        for (key, value) in self.config_overrides {
            let value_str = serde_json::to_string(&value)
                .map_err(|e| format!("Failed to serialize value for key '{}': {}", key, e))?;
            config.insert_json5(&key, &value_str).map_err(|e| {
                format!(
                    "Failed to apply config override '{}' = '{}': {}",
                    key, value_str, e
                )
            })?;
        }

        let session = zenoh::open(config).wait()?;
        tracing::debug!("[CTX] Session opened: zid={}", session.zid());

        Ok(ZContext {
            session: Arc::new(session),
            counter: Arc::new(GlobalCounter::default()),
            domain_id: self.domain_id,
        })
    }
}

#[derive(Clone)]
pub struct ZContext {
    session: Arc<Session>,
    // Global counter for the participants
    counter: Arc<GlobalCounter>,
    domain_id: usize,
}

impl ZContext {
    pub fn create_node<S: AsRef<str>>(&self, name: S) -> ZNodeBuilder {
        ZNodeBuilder::new(
            self.domain_id,
            name.as_ref(),
            self.session.clone(),
            self.counter.clone(),
        )
    }

    pub fn domain_id(&self) -> usize {
        self.domain_id
    }

    pub fn shutdown(&self) -> Result<()> {
        self.session.close().wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_split_on_semicolons() {
        let parsed =
            parse_overrides(r#"mode="client"; connect/endpoints=["tcp/10.0.0.1:7447"];"#)
                .expect("valid overrides");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], ("mode".to_string(), json!("client")));
        assert_eq!(
            parsed[1],
            ("connect/endpoints".to_string(), json!(["tcp/10.0.0.1:7447"]))
        );
    }

    #[test]
    fn override_without_equals_is_an_error() {
        assert!(parse_overrides("mode").is_err());
    }

    #[test]
    fn override_with_bad_json5_is_an_error() {
        assert!(parse_overrides("mode={unterminated").is_err());
    }
}
