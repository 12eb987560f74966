use std::path::PathBuf;

use clap::Parser;
use ros_z_param::{
    Builder, Result,
    context::ZContextBuilder,
    parameter::{ParameterDescriptor, parameters_to_json},
};

#[derive(Debug, Parser)]
struct Args {
    #[arg(short, long, default_value = "test_parameters_server")]
    name: String,
    #[arg(long, default_value = "")]
    namespace: String,
    /// YAML parameter file applied before declaring defaults
    #[arg(short, long)]
    params_file: Option<PathBuf>,
    #[arg(short, long, default_value = "peer")]
    mode: String,
    #[arg(short, long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    zenoh::init_log_from_env_or("error");

    let mut builder = ZContextBuilder::default().with_mode(args.mode);
    if let Some(e) = args.endpoint {
        builder = builder.with_connect_endpoints([e]);
    }
    let ctx = builder.build()?;

    let mut node = ctx.create_node(&args.name).with_namespace(&args.namespace);
    if let Some(path) = args.params_file {
        node = node.with_parameter_file(path);
    }
    let node = node.build()?;

    node.declare_parameter("rate", 10)?;
    node.declare_parameter_with_descriptor(
        "robot_name",
        "r2",
        ParameterDescriptor::default()
            .with_description("set once at startup")
            .read_only(),
    )?;
    let _service = node.create_parameter_service().build()?;

    let (tx, rx) = flume::unbounded();
    let _events = node
        .create_parameters_client()
        .build()?
        .on_parameter_event(move |event| {
            let _ = tx.send(event);
        })?;

    println!("Serving parameters of {}", node.fqn());
    while let Ok(event) = rx.recv_async().await {
        let mut parameters = event.new_parameters;
        parameters.extend(event.changed_parameters);
        if !parameters.is_empty() {
            println!("Updated:>> {}", parameters_to_json(&parameters));
        }
        for deleted in event.deleted_parameters {
            println!("Deleted:>> {}", deleted.name);
        }
    }
    Ok(())
}
