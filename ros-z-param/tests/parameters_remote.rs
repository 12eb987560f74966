//! A client node accessing the parameters of another node.

mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::{Duration, Instant};

use common::*;
use ros_z_param::{
    Builder,
    error::ServiceError,
    parameter::{DEPTH_RECURSIVE, Parameter, ParameterDescriptor, ParameterError, ParameterType},
};

const SERVER: &str = "test_parameters_server";

#[tokio::test(flavor = "multi_thread")]
async fn remote_parameters() {
    let ctx = isolated_context();
    let server = node(&ctx, SERVER);
    let _service = server.create_parameter_service().build().unwrap();

    let node = node(&ctx, "test_remote_parameters");
    let client = node
        .create_parameters_client()
        .with_remote_node(SERVER)
        .build()
        .unwrap();
    assert_eq!(client.remote_node(), "/test_parameters_server");

    verify_set_parameters_async(&client).await;
    verify_get_parameters_async(&client).await;

    // Writes landed on the server node, not on the client node.
    assert_eq!(server.get_parameter_as::<i64>("foo").unwrap(), Some(2));
    assert!(!node.has_parameter("foo"));
}

#[test]
fn remote_synchronous_repeated() {
    let ctx = isolated_context();
    let server = ctx
        .create_node(SERVER)
        .with_namespace("/robot")
        .build()
        .unwrap();
    let _service = server.create_parameter_service().build().unwrap();

    let node = ctx
        .create_node("test_remote_parameters")
        .with_namespace("/robot")
        .build()
        .unwrap();
    let client = node
        .create_parameters_client()
        .with_remote_node(SERVER)
        .build_sync()
        .unwrap();
    assert_eq!(client.remote_node(), "/robot/test_parameters_server");

    set_test_parameters(&client);
    for _ in 0..10 {
        verify_test_parameters(&client);
    }
}

#[test]
fn atomic_set_is_all_or_nothing() {
    let ctx = isolated_context();
    let server = node(&ctx, SERVER);
    server
        .declare_parameter_with_descriptor(
            "locked",
            "fixed",
            ParameterDescriptor::default().read_only(),
        )
        .unwrap();
    let _service = server.create_parameter_service().build().unwrap();

    let node = node(&ctx, "test_remote_atomic");
    let client = node
        .create_parameters_client()
        .with_remote_node(format!("/{SERVER}"))
        .build_sync()
        .unwrap();

    let result = client
        .set_parameters_atomically(vec![
            Parameter::new("speed", 1.5),
            Parameter::new("locked", "changed"),
        ])
        .unwrap();
    assert!(!result.successful);
    assert!(result.reason.contains("read-only"));
    assert!(!client.has_parameter("speed").unwrap());
    assert_eq!(client.get_parameter::<String>("locked").unwrap(), "fixed");

    // The non-atomic variant commits what it can.
    let results = client
        .set_parameters(vec![
            Parameter::new("speed", 1.5),
            Parameter::new("locked", "changed"),
        ])
        .unwrap();
    assert!(results[0].successful);
    assert!(!results[1].successful);
    assert_eq!(client.get_parameter::<f64>("speed").unwrap(), 1.5);

    let ok = client
        .set_parameters_atomically(vec![Parameter::new("speed", 2.5), Parameter::new("gain", 3)])
        .unwrap();
    assert!(ok.successful);
    assert_eq!(client.get_parameter::<i64>("gain").unwrap(), 3);
}

#[test]
fn describe_and_list_hierarchy() {
    let ctx = isolated_context();
    let server = node(&ctx, SERVER);
    server
        .declare_parameter_with_descriptor(
            "motor.gain",
            0.5,
            ParameterDescriptor::default().with_description("proportional gain"),
        )
        .unwrap();
    server.set_parameters(vec![
        Parameter::new("motor.limits.max", 1.0),
        Parameter::new("motor.limits.min", -1.0),
        Parameter::new("name", "r2"),
    ]);
    let _service = server.create_parameter_service().build().unwrap();

    let node = node(&ctx, "test_remote_describe");
    let client = node
        .create_parameters_client()
        .with_remote_node(SERVER)
        .build_sync()
        .unwrap();

    let descriptors = client
        .describe_parameters(&["motor.gain", "nothing"])
        .unwrap();
    assert_eq!(descriptors[0].type_, ParameterType::Double);
    assert_eq!(descriptors[0].description, "proportional gain");
    assert_eq!(descriptors[1].type_, ParameterType::NotSet);

    let motor = client.list_parameters(&["motor"], 1).unwrap();
    assert_eq!(motor.names, vec!["motor.gain".to_string()]);

    let all = client.list_parameters(&[], DEPTH_RECURSIVE).unwrap();
    assert_eq!(all.names.len(), 4);
    assert!(all.prefixes.contains(&"motor.limits".to_string()));

    // Deleting goes through a NotSet value.
    let results = client.set_parameters(vec![Parameter::unset("name")]).unwrap();
    assert!(results[0].successful);
    assert!(!client.has_parameter("name").unwrap());
}

#[test]
fn missing_server_fails_within_the_timeout() {
    let ctx = isolated_context();
    let node = node(&ctx, "test_remote_lonely");
    let client = node
        .create_parameters_client()
        .with_remote_node("nobody")
        .with_timeout(Duration::from_millis(300))
        .build_sync()
        .unwrap();

    assert!(!client.service_is_ready());
    let start = Instant::now();
    let err = client.get_parameter::<i64>("foo").unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(matches!(
        err,
        ParameterError::Service(ServiceError::NoResponse(_) | ServiceError::Timeout { .. })
    ));
}

#[test]
fn wait_for_service_sees_late_servers() {
    let ctx = isolated_context();
    let waiter = node(&ctx, "test_remote_waiter");
    let client = waiter
        .create_parameters_client()
        .with_remote_node(SERVER)
        .build_sync()
        .unwrap();
    assert!(!client.wait_for_service(Duration::from_millis(100)));

    let server = node(&ctx, SERVER);
    let _service = server.create_parameter_service().build().unwrap();
    assert!(client.wait_for_service(Duration::from_secs(5)));
    assert!(client.service_is_ready());
}

#[tokio::test(flavor = "multi_thread")]
async fn async_readiness_wait_yields_to_other_tasks() {
    let ctx = isolated_context();
    let waiter = node(&ctx, "test_remote_async_waiter");
    let client = waiter
        .create_parameters_client()
        .with_remote_node(SERVER)
        .build()
        .unwrap();

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = tokio::spawn({
        let ticks = ticks.clone();
        async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ticks.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    assert!(!client.wait_for_service(Duration::from_millis(300)).await);
    assert!(ticks.load(Ordering::Relaxed) > 5);

    let server = node(&ctx, SERVER);
    let _service = server.create_parameter_service().build().unwrap();
    assert!(client.wait_for_service(Duration::from_secs(5)).await);
    assert!(client.service_is_ready().await);
    ticker.abort();
}
