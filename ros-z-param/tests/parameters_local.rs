//! A node accessing its own parameters, both through its parameter service
//! and directly.

mod common;

use common::*;
use ros_z_param::{
    Builder,
    parameter::{Parameter, ParameterError, ParameterType, ParameterValue},
};

#[test]
fn local_synchronous() {
    let ctx = isolated_context();
    let node = node(&ctx, "test_parameters_local_synchronous");
    let _service = node.create_parameter_service().build().unwrap();
    let client = node.create_parameters_client().build_sync().unwrap();

    set_test_parameters(&client);
    verify_test_parameters(&client);
}

#[test]
fn local_synchronous_repeated() {
    let ctx = isolated_context();
    let node = node(&ctx, "test_parameters_local_synch_repeated");
    let _service = node.create_parameter_service().build().unwrap();
    let client = node.create_parameters_client().build_sync().unwrap();

    set_test_parameters(&client);
    for _ in 0..10 {
        verify_test_parameters(&client);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn local_asynchronous() {
    let ctx = isolated_context();
    let node = node(&ctx, "test_parameters_local_asynchronous");
    let _service = node.create_parameter_service().build().unwrap();
    let client = node.create_parameters_client().build().unwrap();

    verify_set_parameters_async(&client).await;
    verify_get_parameters_async(&client).await;

    // The async client observes exactly what a sync client does.
    let sync_client = node.create_parameters_client().build_sync().unwrap();
    verify_test_parameters(&sync_client);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_async_requests_resolve_independently() {
    let ctx = isolated_context();
    let node = node(&ctx, "test_parameters_concurrent");
    let _service = node.create_parameter_service().build().unwrap();
    let client = node.create_parameters_client().build().unwrap();
    verify_set_parameters_async(&client).await;

    // All requests are on the wire before any is awaited.
    let foo = client.get_parameter::<i64>("foo");
    let bar = client.get_parameter::<String>("bar");
    let missing = client.get_parameter::<bool>("not_there");
    let wrong = client.get_parameter::<f64>("foobar");

    assert!(matches!(wrong.await, Err(ParameterError::TypeMismatch { .. })));
    assert!(matches!(missing.await, Err(ParameterError::NotFound(_))));
    assert_eq!(bar.await.unwrap(), "hello");
    assert_eq!(foo.await.unwrap(), 2);
}

#[test]
fn helpers() {
    let ctx = isolated_context();
    let node = node(&ctx, "test_parameters_local_helpers");
    let _service = node.create_parameter_service().build().unwrap();
    let client = node.create_parameters_client().build_sync().unwrap();
    set_test_parameters(&client);

    // Set names obey their types and ignore defaults.
    assert!(client.has_parameter("foo").unwrap());
    assert!(client.get_parameter::<f64>("foo").unwrap_err().is_type_mismatch());
    assert_eq!(client.get_parameter::<i64>("foo").unwrap(), 2);
    assert_eq!(client.get_parameter_or("foo", 42i64).unwrap(), 2);

    assert!(client.has_parameter("bar").unwrap());
    assert!(client.get_parameter::<i64>("bar").unwrap_err().is_type_mismatch());
    assert_eq!(client.get_parameter::<String>("bar").unwrap(), "hello");
    assert_eq!(
        client.get_parameter_or("bar", "goodbye".to_string()).unwrap(),
        "hello"
    );

    assert!(client.has_parameter("barstr").unwrap());
    assert!(client.get_parameter::<bool>("barstr").unwrap_err().is_type_mismatch());
    assert_eq!(client.get_parameter::<String>("barstr").unwrap(), "hello_str");

    assert!(client.has_parameter("baz").unwrap());
    assert!(client.get_parameter::<bool>("baz").unwrap_err().is_type_mismatch());
    assert_eq!(client.get_parameter::<f64>("baz").unwrap(), 1.45);
    assert_eq!(client.get_parameter_or("baz", -4.2).unwrap(), 1.45);

    assert!(client.has_parameter("foobar").unwrap());
    assert!(client.get_parameter::<f64>("foobar").unwrap_err().is_type_mismatch());
    assert!(client.get_parameter::<bool>("foobar").unwrap());
    assert!(client.get_parameter_or("foobar", false).unwrap());

    assert!(client.has_parameter("barfoo").unwrap());
    assert!(client.get_parameter::<String>("barfoo").unwrap_err().is_type_mismatch());
    assert_eq!(client.get_parameter::<Vec<u8>>("barfoo").unwrap(), vec![0, 1, 2]);
    assert_eq!(
        client.get_parameter_or("barfoo", vec![3u8, 4, 5]).unwrap(),
        vec![0, 1, 2]
    );

    // A default never masks a type error.
    assert!(client.get_parameter_or("foo", -4.2).unwrap_err().is_type_mismatch());

    // Unset names fail without a default...
    assert!(!client.has_parameter("not_there").unwrap());
    assert!(client.get_parameter::<i64>("not_there").unwrap_err().is_not_found());
    assert!(client.get_parameter::<String>("not_there").unwrap_err().is_not_found());
    assert!(client.get_parameter::<f64>("not_there").unwrap_err().is_not_found());
    assert!(client.get_parameter::<bool>("not_there").unwrap_err().is_not_found());
    assert!(client.get_parameter::<Vec<u8>>("not_there").unwrap_err().is_not_found());

    // ...and yield the default with one.
    assert_eq!(client.get_parameter_or("not_there", 42i64).unwrap(), 42);
    assert_eq!(
        client.get_parameter_or("not_there", "goodbye".to_string()).unwrap(),
        "goodbye"
    );
    assert_eq!(client.get_parameter_or("not_there", -4.2).unwrap(), -4.2);
    assert!(!client.get_parameter_or("not_there", false).unwrap());
    assert_eq!(
        client.get_parameter_or("not_there", vec![3u8, 4, 5]).unwrap(),
        vec![3, 4, 5]
    );
}

fn node_with_values(name: &str) -> (ros_z_param::context::ZContext, ros_z_param::node::ZNode) {
    let ctx = isolated_context();
    let node = node(&ctx, name);
    let results = node.set_parameters(vec![
        Parameter::new("foo", 2),
        Parameter::new("bar", "hello"),
        Parameter::new("barstr", "hello_str".to_string()),
        Parameter::new("baz", 1.45),
        Parameter::new("foobar", true),
        Parameter::new("barfoo", vec![3u8, 4, 5]),
    ]);
    assert!(results.iter().all(|r| r.successful));
    (ctx, node)
}

#[test]
fn get_from_node_primitive_type() {
    let (_ctx, node) = node_with_values("test_parameters_node_primitive");

    assert_eq!(node.get_parameter_as::<i64>("foo").unwrap(), Some(2));
    assert!(node.get_parameter_as::<String>("foo").unwrap_err().is_type_mismatch());
    assert_eq!(node.get_parameter_as::<i64>("no_such_param").unwrap(), None);
    assert_eq!(
        node.get_parameter_as::<String>("bar").unwrap().as_deref(),
        Some("hello")
    );
    assert_eq!(node.get_parameter_as::<f64>("baz").unwrap(), Some(1.45));
    assert_eq!(node.get_parameter_as::<bool>("foobar").unwrap(), Some(true));
    assert_eq!(
        node.get_parameter_as::<Vec<u8>>("barfoo").unwrap(),
        Some(vec![3, 4, 5])
    );
}

#[test]
fn get_from_node_variant_type() {
    let (_ctx, node) = node_with_values("test_parameters_node_variant");

    let foo = node.get_parameter("foo").unwrap();
    assert_eq!(foo.parameter_type(), ParameterType::Integer);
    assert!(node.get_parameter("no_such_param").unwrap_err().is_not_found());
    for name in ["bar", "baz", "foobar", "barfoo"] {
        assert!(node.get_parameter(name).is_ok(), "{name} missing");
    }
    assert!(node.has_parameter("barstr"));
    assert!(!node.has_parameter("no_such_param"));
}

#[test]
fn declared_parameters_are_visible_remotely() {
    let ctx = isolated_context();
    let node = ctx
        .create_node("test_parameters_declared")
        .with_parameter_overrides([("rate", ParameterValue::Integer(30))])
        .build()
        .unwrap();
    let _service = node.create_parameter_service().build().unwrap();

    assert_eq!(
        node.declare_parameter("rate", 10).unwrap(),
        ParameterValue::Integer(30)
    );
    assert_eq!(
        node.declare_parameter("frame_id", "base_link").unwrap(),
        ParameterValue::String("base_link".into())
    );
    assert!(node.declare_parameter("rate", "fast").unwrap_err().is_type_mismatch());

    let client = node.create_parameters_client().build_sync().unwrap();
    assert_eq!(client.get_parameter::<i64>("rate").unwrap(), 30);
    assert_eq!(client.get_parameter::<String>("frame_id").unwrap(), "base_link");
}
