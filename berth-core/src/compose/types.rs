//! Compose file format types.
//!
//! Only the subset of the Compose specification the engine acts on is modelled.
//! Maps keep document order so "the first declared network" is well defined.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default restart policy applied when a service does not declare one.
pub const DEFAULT_RESTART_POLICY: &str = "unless-stopped";

/// Root structure of a stack definition document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDefinition {
    /// Compose file format version (informational only)
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: String,

    /// Services to be created
    pub services: IndexMap<String, ServiceSpec>,

    /// Networks
    #[serde(default, deserialize_with = "null_as_default")]
    pub networks: IndexMap<String, NetworkSpec>,

    /// Named volumes
    #[serde(default, deserialize_with = "null_as_default")]
    pub volumes: IndexMap<String, VolumeSpec>,
}

impl StackDefinition {
    /// Key of the network every service attaches to, if any is declared.
    pub fn attachment_network(&self) -> Option<&str> {
        self.networks.keys().next().map(String::as_str)
    }
}

/// A service in a stack definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Container image to use
    #[serde(default)]
    pub image: String,

    /// Environment variables
    #[serde(default)]
    pub environment: Environment,

    /// Port mappings (e.g., ["8080:80", "53:53/udp"])
    #[serde(default, deserialize_with = "string_list")]
    pub ports: Vec<String>,

    /// Volume mounts (e.g., ["./data:/data", "db:/var/lib/db"])
    #[serde(default)]
    pub volumes: Vec<String>,

    /// Restart policy
    #[serde(default)]
    pub restart: Option<String>,

    /// Override the default command
    #[serde(default)]
    pub command: Option<Command>,

    /// Extra labels applied to the container
    #[serde(default)]
    pub labels: Labels,
}

impl ServiceSpec {
    /// Restart policy name, falling back to `unless-stopped`.
    pub fn restart_policy(&self) -> &str {
        self.restart.as_deref().filter(|r| !r.is_empty()).unwrap_or(DEFAULT_RESTART_POLICY)
    }
}

/// Environment variables can be specified as a map or list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Environment {
    /// Environment as list of KEY=value strings
    List(Vec<String>),
    /// Environment as key-value map
    Map(IndexMap<String, Option<ScalarValue>>),
}

impl Default for Environment {
    fn default() -> Self {
        Environment::List(Vec::new())
    }
}

impl Environment {
    /// Render the environment as `KEY=value` entries in declaration order.
    ///
    /// List entries are passed through untouched. Map entries with a null value
    /// render as a bare `KEY`, which the engine resolves from its own environment.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Environment::List(list) => list.clone(),
            Environment::Map(map) => map
                .iter()
                .map(|(key, value)| match value {
                    Some(value) => format!("{}={}", key, value),
                    None => key.clone(),
                })
                .collect(),
        }
    }

}

/// Scalar YAML value accepted in environment and label maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::String(s) => write!(f, "{}", s),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Integer(i) => write!(f, "{}", i),
            ScalarValue::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Command override, either a shell string or an exec-form list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    Shell(String),
    Exec(Vec<String>),
}

impl Command {
    /// Exec-form argument vector. Shell strings are split with POSIX shell
    /// quoting rules, without variable expansion.
    pub fn to_args(&self) -> Result<Vec<String>, String> {
        match self {
            Command::Shell(s) => shell_words::split(s)
                .map_err(|e| format!("command '{}' cannot be split: {}", s, e)),
            Command::Exec(args) => Ok(args.clone()),
        }
    }
}

/// Labels can be specified as a map or a list of `key=value` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Labels {
    List(Vec<String>),
    Map(IndexMap<String, ScalarValue>),
}

impl Default for Labels {
    fn default() -> Self {
        Labels::Map(IndexMap::new())
    }
}

impl Labels {
    /// Flatten into key/value pairs. List entries without `=` get an empty value.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        match self {
            Labels::List(list) => list
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
            Labels::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.to_string())).collect(),
        }
    }
}

/// Network definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Network driver to use
    #[serde(default)]
    pub driver: Option<String>,

    /// Extra labels applied to the network
    #[serde(default)]
    pub labels: Labels,
}

/// Volume definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Volume driver to use
    #[serde(default)]
    pub driver: Option<String>,

    /// Driver-specific options
    #[serde(default)]
    pub driver_opts: IndexMap<String, String>,

    /// Extra labels applied to the volume
    #[serde(default)]
    pub labels: Labels,
}

/// Accept `version: 3.8` as well as `version: "3.8"`.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<ScalarValue>::deserialize(deserializer)?;
    Ok(value.map(|v| v.to_string()).unwrap_or_default())
}

/// Ports may be written as bare numbers (`- 80`).
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = Option::<Vec<ScalarValue>>::deserialize(deserializer)?;
    Ok(values.unwrap_or_default().iter().map(ToString::to_string).collect())
}

/// `networks:` / `volumes:` with no body, and entries like `data:` with a null
/// body, both deserialize to defaults.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<IndexMap<String, T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let map = Option::<IndexMap<String, Option<T>>>::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_list_passthrough() {
        let env = Environment::List(vec!["ENV=production".to_string(), "DEBUG".to_string()]);
        assert_eq!(env.to_list(), vec!["ENV=production", "DEBUG"]);
    }

    #[test]
    fn test_environment_map_renders_pairs_in_order() {
        let mut map = IndexMap::new();
        map.insert("ENV".to_string(), Some(ScalarValue::String("production".to_string())));
        map.insert("WORKERS".to_string(), Some(ScalarValue::Integer(4)));
        map.insert("PASSTHROUGH".to_string(), None);
        let env = Environment::Map(map);
        assert_eq!(env.to_list(), vec!["ENV=production", "WORKERS=4", "PASSTHROUGH"]);
    }

    #[test]
    fn test_restart_policy_default() {
        let service = ServiceSpec { image: "nginx".to_string(), ..Default::default() };
        assert_eq!(service.restart_policy(), "unless-stopped");

        let service = ServiceSpec { restart: Some("always".to_string()), ..service };
        assert_eq!(service.restart_policy(), "always");
    }

    #[test]
    fn test_labels_list_form() {
        let labels = Labels::List(vec!["tier=web".to_string(), "flag".to_string()]);
        assert_eq!(
            labels.to_pairs(),
            vec![("tier".to_string(), "web".to_string()), ("flag".to_string(), String::new())]
        );
    }

    #[test]
    fn test_command_shell_form_keeps_quoted_args() {
        let cmd = Command::Shell("nginx -g 'daemon off;'".to_string());
        assert_eq!(cmd.to_args().unwrap(), vec!["nginx", "-g", "daemon off;"]);

        let cmd = Command::Shell(r#"sh -c "echo \"hi there\"""#.to_string());
        assert_eq!(cmd.to_args().unwrap(), vec!["sh", "-c", r#"echo "hi there""#]);
    }

    #[test]
    fn test_command_unbalanced_quote_rejected() {
        let cmd = Command::Shell("echo 'oops".to_string());
        assert!(cmd.to_args().is_err());
    }

    #[test]
    fn test_command_exec_form_untouched() {
        let cmd = Command::Exec(vec!["echo".to_string(), "a b".to_string()]);
        assert_eq!(cmd.to_args().unwrap(), vec!["echo", "a b"]);
    }
}
