// Copyright 2025 ZettaScale Technology
//
// Name qualification for topics, services and remote node names

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicNameError {
    #[error("Topic name is empty")]
    Empty,
    #[error("Topic name contains invalid characters: {0}")]
    InvalidCharacters(String),
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),
    #[error("Invalid node name: {0}")]
    InvalidNodeName(String),
}

/// Components must start with a letter or underscore, followed by alphanumeric or underscores
fn is_valid_topic_component(component: &str) -> bool {
    let bytes = component.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {
            bytes[1..].iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_')
        }
        _ => false,
    }
}

fn validate_components(name: &str) -> Result<(), TopicNameError> {
    match name
        .split('/')
        .find(|part| !part.is_empty() && !is_valid_topic_component(part))
    {
        Some(part) => Err(TopicNameError::InvalidCharacters(format!(
            "invalid component '{}'",
            part
        ))),
        None => Ok(()),
    }
}

fn validate_namespace(namespace: &str) -> Result<(), TopicNameError> {
    if namespace.is_empty() || namespace == "/" {
        return Ok(());
    }
    if namespace.ends_with('/') {
        return Err(TopicNameError::InvalidNamespace(
            "namespace cannot end with '/'".to_string(),
        ));
    }
    validate_components(namespace)
        .map_err(|_| TopicNameError::InvalidNamespace(format!("invalid namespace '{}'", namespace)))
}

fn validate_node_name(node_name: &str) -> Result<(), TopicNameError> {
    if !is_valid_topic_component(node_name) {
        return Err(TopicNameError::InvalidNodeName(format!(
            "invalid node name '{}'",
            node_name
        )));
    }
    Ok(())
}

/// Qualify a topic name according to ROS 2 naming rules.
///
/// - Absolute names (`/x`) are kept, minus a trailing slash
/// - Private names (`~x`, `~/x`) expand to `/<namespace>/<node_name>/x`
/// - Relative names expand to `/<namespace>/x`
///
/// ```
/// use ros_z_param::topic_name::qualify_topic_name;
///
/// assert_eq!(qualify_topic_name("/chatter", "/ns", "node").unwrap(), "/chatter");
/// assert_eq!(qualify_topic_name("chatter", "/ns", "node").unwrap(), "/ns/chatter");
/// assert_eq!(qualify_topic_name("~/get_parameters", "", "node").unwrap(), "/node/get_parameters");
/// ```
pub fn qualify_topic_name(
    topic: &str,
    namespace: &str,
    node_name: &str,
) -> Result<String, TopicNameError> {
    if topic.is_empty() {
        return Err(TopicNameError::Empty);
    }
    validate_namespace(namespace)?;
    validate_node_name(node_name)?;

    let namespace = if namespace == "/" { "" } else { namespace };

    if topic.starts_with('/') {
        let topic = topic.strip_suffix('/').unwrap_or(topic);
        if topic.is_empty() {
            return Err(TopicNameError::InvalidCharacters(
                "topic cannot be just '/'".to_string(),
            ));
        }
        validate_components(topic)?;
        Ok(topic.to_string())
    } else if let Some(suffix) = topic.strip_prefix('~') {
        let suffix = suffix.strip_prefix('/').unwrap_or(suffix);
        validate_components(suffix)?;
        if suffix.is_empty() {
            Ok(format!("{}/{}", namespace, node_name))
        } else {
            Ok(format!("{}/{}/{}", namespace, node_name, suffix))
        }
    } else {
        let topic = topic.strip_suffix('/').unwrap_or(topic);
        validate_components(topic)?;
        Ok(format!("{}/{}", namespace, topic))
    }
}

/// Service names follow the same rules as topic names
pub fn qualify_service_name(
    service: &str,
    namespace: &str,
    node_name: &str,
) -> Result<String, TopicNameError> {
    qualify_topic_name(service, namespace, node_name)
}

/// Resolve the node a parameter client talks to.
///
/// An empty `remote` targets the calling node itself; a relative name is
/// looked up in the caller's namespace.
pub fn resolve_remote_node(
    remote: &str,
    namespace: &str,
    node_name: &str,
) -> Result<String, TopicNameError> {
    if remote.is_empty() {
        qualify_topic_name("~", namespace, node_name)
    } else {
        qualify_topic_name(remote, namespace, node_name)
    }
}
