use std::fmt::Display;

use sha2::Digest;
use zenoh::{Result, key_expr::KeyExpr, session::ZenohId};

use crate::attachment::GidArray;

const EMPTY_NAMESPACE: &str = "%";
const EMPTY_ENCLAVE: &str = "%";
const EMPTY_TOPIC_TYPE: &str = "EMPTY_TOPIC_TYPE";
const EMPTY_TOPIC_HASH: &str = "EMPTY_TOPIC_HASH";
pub const ADMIN_SPACE: &str = "@ros2_lv";

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct LivelinessKE(pub KeyExpr<'static>);

pub struct TopicKE(KeyExpr<'static>);

#[derive(Default, Debug, Hash, Clone, PartialEq, Eq)]
pub struct NodeEntity {
    pub domain_id: usize,
    pub z_id: ZenohId,
    pub id: usize,
    pub name: String,
    pub namespace: String,
}

impl NodeEntity {
    pub fn new(
        domain_id: usize,
        z_id: ZenohId,
        id: usize,
        name: String,
        namespace: String,
    ) -> Self {
        Self {
            domain_id,
            z_id,
            id,
            name,
            namespace,
        }
    }

    /// Fully-qualified node name, `/<namespace>/<name>`.
    pub fn fqn(&self) -> String {
        if self.namespace.is_empty() || self.namespace == "/" {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    pub fn lv_token_key_expr(&self) -> Result<KeyExpr<'static>> {
        let ke: LivelinessKE = self.try_into()?;
        Ok(ke.0)
    }
}

impl TryFrom<&NodeEntity> for LivelinessKE {
    type Error = zenoh::Error;

    // <ADMIN_SPACE>/<domain_id>/<zid>/<nid>/<eid>/<entity_kind>/<enclave>/<namespace>/<node_name>
    // NOTE: enclave is not supported yet
    fn try_from(value: &NodeEntity) -> std::result::Result<Self, Self::Error> {
        let NodeEntity {
            domain_id,
            z_id,
            id,
            name,
            namespace,
        } = value;
        let namespace = mangle_namespace(namespace);
        let entity_kind = EntityKind::Node;
        Ok(LivelinessKE(
            format!("{ADMIN_SPACE}/{domain_id}/{z_id}/{id}/{id}/{entity_kind}/{EMPTY_ENCLAVE}/{namespace}/{name}")
                .try_into()?,
        ))
    }
}

#[derive(Default, Debug, Hash, strum::EnumString, strum::Display, Eq, PartialEq, Clone, Copy)]
pub enum EntityKind {
    #[default]
    #[strum(serialize = "NN")]
    Node,
    #[strum(serialize = "MP")]
    Publisher,
    #[strum(serialize = "MS")]
    Subscription,
    #[strum(serialize = "SS")]
    Service,
    #[strum(serialize = "SC")]
    Client,
}

#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub struct TypeHash {
    pub version: u8,
    pub value: [u8; 32],
}

impl TypeHash {
    pub fn new(version: u8, value: [u8; 32]) -> Self {
        Self { version, value }
    }

    pub fn zero() -> Self {
        Self::new(1, [0; 32])
    }

    pub fn to_rihs_string(&self) -> String {
        let hex_str: String = self.value.iter().map(|b| format!("{:02x}", b)).collect();
        format!("RIHS{:02x}_{}", self.version, hex_str)
    }
}

impl Display for TypeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rihs_string())
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub hash: TypeHash,
}

impl TypeInfo {
    pub fn new(name: &str, hash: TypeHash) -> Self {
        TypeInfo {
            name: name.to_string(),
            hash,
        }
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { name, hash } = self;
        write!(f, "{name}/{}", hash.to_rihs_string())
    }
}

pub type Topic = String;

#[derive(Default, Debug, Hash, PartialEq, Eq, Clone)]
pub struct EndpointEntity {
    pub id: usize,
    pub node: NodeEntity,
    pub kind: EntityKind,
    pub topic: Topic,
    pub type_info: Option<TypeInfo>,
}

pub(crate) fn mangle_name(name: &str) -> String {
    name.replace('/', "%")
}

fn mangle_namespace(namespace: &str) -> String {
    if namespace.is_empty() {
        EMPTY_NAMESPACE.to_string()
    } else {
        mangle_name(namespace)
    }
}

fn encode_type_info(type_info: &Option<TypeInfo>) -> String {
    type_info
        .as_ref()
        .map_or(format!("{EMPTY_TOPIC_TYPE}/{EMPTY_TOPIC_HASH}"), |x| {
            format!("{}/{}", mangle_name(&x.name), x.hash.to_rihs_string())
        })
}

impl TryFrom<&EndpointEntity> for LivelinessKE {
    type Error = zenoh::Error;

    // <ADMIN_SPACE>/<domain_id>/<zid>/<nid>/<eid>/<entity_kind>/<enclave>/<namespace>/<node_name>/<topic_name>/<topic_type>/<topic_type_hash>
    fn try_from(value: &EndpointEntity) -> std::result::Result<Self, Self::Error> {
        let EndpointEntity {
            id,
            node:
                NodeEntity {
                    domain_id,
                    z_id,
                    id: node_id,
                    name: node_name,
                    namespace: node_namespace,
                },
            kind,
            topic: topic_name,
            type_info,
        } = value;

        let node_namespace = mangle_namespace(node_namespace);
        let node_name = mangle_name(node_name);
        let topic_name = mangle_name(topic_name);
        let type_info = encode_type_info(type_info);

        Ok(LivelinessKE(format!(
            "{ADMIN_SPACE}/{domain_id}/{z_id}/{node_id}/{id}/{kind}/{EMPTY_ENCLAVE}/{node_namespace}/{node_name}/{topic_name}/{type_info}",
        ).try_into()?))
    }
}

impl Display for EndpointEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match LivelinessKE::try_from(self) {
            Ok(ke) => write!(f, "{}", ke.0),
            Err(_) => write!(f, "{}:{}/{}", self.kind, self.node.fqn(), self.topic),
        }
    }
}

impl TryFrom<&EndpointEntity> for TopicKE {
    type Error = zenoh::Error;

    // <domain_id>/<topic_name>/<topic_type>/<topic_type_hash>
    fn try_from(value: &EndpointEntity) -> std::result::Result<Self, Self::Error> {
        let NodeEntity { domain_id, .. } = value.node;
        let topic = {
            let s = &value.topic;
            let s = s.strip_prefix('/').unwrap_or(s);
            let s = s.strip_suffix('/').unwrap_or(s);
            mangle_name(s)
        };
        let type_info = encode_type_info(&value.type_info);
        Ok(TopicKE(format!("{domain_id}/{topic}/{type_info}").try_into()?))
    }
}

impl EndpointEntity {
    pub fn topic_key_expr(&self) -> Result<KeyExpr<'static>> {
        let ke: TopicKE = self.try_into()?;
        Ok(ke.0)
    }

    pub fn lv_token_key_expr(&self) -> Result<KeyExpr<'static>> {
        let ke: LivelinessKE = self.try_into()?;
        Ok(ke.0)
    }

    pub fn gid(&self) -> GidArray {
        let mut gid = GidArray::default();
        let hash = sha2::Sha256::digest(self.to_string().as_bytes());
        let len = gid.len();
        gid.copy_from_slice(&hash[..len]);
        gid
    }
}

/// Liveliness pattern matching any server of the fully-qualified `service`
/// in `domain_id`, whichever node or session declared it.
pub fn service_liveliness_pattern(domain_id: usize, service: &str) -> Result<KeyExpr<'static>> {
    let service = mangle_name(service);
    let kind = EntityKind::Service;
    Ok(format!("{ADMIN_SPACE}/{domain_id}/*/*/*/{kind}/{EMPTY_ENCLAVE}/*/*/{service}/**").try_into()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_entity(topic: &str) -> EndpointEntity {
        EndpointEntity {
            id: 3,
            node: NodeEntity::new(0, ZenohId::default(), 1, "talker".into(), "/robot".into()),
            kind: EntityKind::Service,
            topic: topic.to_string(),
            type_info: Some(TypeInfo::new(
                "rcl_interfaces::srv::dds_::GetParameters_",
                TypeHash::zero(),
            )),
        }
    }

    #[test]
    fn node_fqn_handles_root_namespace() {
        let node = NodeEntity::new(0, ZenohId::default(), 0, "n".into(), "".into());
        assert_eq!(node.fqn(), "/n");
        let node = NodeEntity::new(0, ZenohId::default(), 0, "n".into(), "/".into());
        assert_eq!(node.fqn(), "/n");
        let node = NodeEntity::new(0, ZenohId::default(), 0, "n".into(), "/a/b".into());
        assert_eq!(node.fqn(), "/a/b/n");
    }

    #[test]
    fn topic_key_expr_mangles_inner_slashes() {
        let entity = service_entity("/robot/talker/get_parameters");
        let ke = entity.topic_key_expr().expect("valid key expr");
        assert_eq!(
            ke.as_str(),
            format!(
                "0/robot%talker%get_parameters/rcl_interfaces::srv::dds_::GetParameters_/{}",
                TypeHash::zero()
            )
        );
    }

    #[test]
    fn service_pattern_matches_declared_token() {
        let entity = service_entity("/robot/talker/get_parameters");
        let token = entity.lv_token_key_expr().expect("token key expr");
        let pattern =
            service_liveliness_pattern(0, "/robot/talker/get_parameters").expect("pattern");
        assert!(pattern.intersects(&token));

        let other = service_liveliness_pattern(0, "/robot/other/get_parameters").expect("pattern");
        assert!(!other.intersects(&token));
    }

    #[test]
    fn type_hash_renders_as_rihs() {
        let hash = TypeHash::new(1, [0xab; 32]);
        assert_eq!(hash.to_string(), format!("RIHS01_{}", "ab".repeat(32)));
    }

    #[test]
    fn gid_is_stable_per_entity() {
        let a = service_entity("/robot/talker/get_parameters");
        let b = service_entity("/robot/talker/set_parameters");
        assert_eq!(a.gid(), a.clone().gid());
        assert_ne!(a.gid(), b.gid());
    }
}
