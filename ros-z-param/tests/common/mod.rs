#![allow(dead_code)]

use std::sync::Once;

use ros_z_param::{
    Builder,
    context::{ZContext, ZContextBuilder},
    node::ZNode,
    parameter::{
        AsyncParametersClient, DEPTH_RECURSIVE, Parameter, ParameterType, ParameterValue,
        SyncParametersClient,
    },
};

static INIT: Once = Once::new();

/// A context whose session neither scouts nor connects, so tests running
/// in parallel never see each other's nodes.
pub fn isolated_context() -> ZContext {
    INIT.call_once(|| zenoh::init_log_from_env_or("error"));
    ZContextBuilder::default()
        .isolated()
        .build()
        .expect("Failed to open an isolated session")
}

pub fn node(ctx: &ZContext, name: &str) -> ZNode {
    ctx.create_node(name).build().expect("Failed to create node")
}

pub fn test_parameters() -> Vec<Parameter> {
    vec![
        Parameter::new("foo", 2),
        Parameter::new("bar", "hello"),
        Parameter::new("barstr", "hello_str".to_string()),
        Parameter::new("baz", 1.45),
        Parameter::new("foobar", true),
        Parameter::new("barfoo", vec![0u8, 1, 2]),
    ]
}

const NAMES: [&str; 6] = ["foo", "bar", "barstr", "baz", "foobar", "barfoo"];

fn assert_all_successful(results: &[ros_z_param::parameter::SetParametersResult]) {
    assert_eq!(results.len(), NAMES.len());
    for result in results {
        assert!(result.successful, "set failed: {}", result.reason);
    }
}

pub fn set_test_parameters(client: &SyncParametersClient) {
    let results = client
        .set_parameters(test_parameters())
        .expect("set_parameters failed");
    assert_all_successful(&results);
}

pub fn verify_test_parameters(client: &SyncParametersClient) {
    let listed = client
        .list_parameters(&[], DEPTH_RECURSIVE)
        .expect("list_parameters failed");
    for name in NAMES {
        assert!(listed.names.iter().any(|n| n == name), "{name} not listed");
    }
    assert!(listed.prefixes.is_empty());

    let params = client.get_parameters(&NAMES).expect("get_parameters failed");
    assert_eq!(params, test_parameters());

    let types = client
        .get_parameter_types(&NAMES)
        .expect("get_parameter_types failed");
    assert_eq!(
        types,
        vec![
            ParameterType::Integer,
            ParameterType::String,
            ParameterType::String,
            ParameterType::Double,
            ParameterType::Bool,
            ParameterType::ByteArray,
        ]
    );

    let missing = client
        .get_parameters(&["not_there"])
        .expect("get_parameters failed");
    assert_eq!(missing[0].value, ParameterValue::NotSet);
}

pub async fn verify_set_parameters_async(client: &AsyncParametersClient) {
    let results = client
        .set_parameters(test_parameters())
        .await
        .expect("set_parameters failed");
    assert_all_successful(&results);
}

pub async fn verify_get_parameters_async(client: &AsyncParametersClient) {
    let listed = client
        .list_parameters(&[], DEPTH_RECURSIVE)
        .await
        .expect("list_parameters failed");
    for name in NAMES {
        assert!(listed.names.iter().any(|n| n == name), "{name} not listed");
    }

    let params = client
        .get_parameters(&NAMES)
        .await
        .expect("get_parameters failed");
    assert_eq!(params, test_parameters());

    let types = client
        .get_parameter_types(&["foo", "baz"])
        .await
        .expect("get_parameter_types failed");
    assert_eq!(types, vec![ParameterType::Integer, ParameterType::Double]);

    assert_eq!(client.get_parameter::<i64>("foo").await.unwrap(), 2);
    assert_eq!(
        client.get_parameter::<Vec<u8>>("barfoo").await.unwrap(),
        vec![0, 1, 2]
    );
    assert!(client.has_parameter("foobar").await.unwrap());
    assert!(!client.has_parameter("not_there").await.unwrap());
}
