use std::time::Duration;

use clap::{Parser, Subcommand};
use ros_z_param::{
    Builder, Result,
    context::ZContextBuilder,
    parameter::{DEPTH_RECURSIVE, Parameter, ParameterValue, parameters_to_json},
};

#[derive(Debug, Parser)]
struct Args {
    /// Node whose parameters are accessed
    #[arg(short, long, default_value = "/test_parameters_server")]
    remote: String,
    /// Request timeout in seconds
    #[arg(short, long, default_value = "5.0")]
    timeout: f64,
    #[arg(short, long, default_value = "peer")]
    mode: String,
    #[arg(short, long)]
    endpoint: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List parameter names
    List { prefixes: Vec<String> },
    /// Print parameters as JSON
    Get { names: Vec<String> },
    /// Set a parameter; the value is parsed as YAML (`3`, `1.5`, `true`, `[1, 2]`)
    Set { name: String, value: String },
    /// Delete a parameter
    Delete { name: String },
}

fn parse_value(name: &str, value: &str) -> Result<ParameterValue> {
    let params = ros_z_param::parameter::load_parameter_string(
        &format!("/**:\n  ros__parameters:\n    {name}: {value}\n"),
        "/",
    )?;
    Ok(params.get(name).cloned().unwrap_or_default())
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
    let node = ctx.create_node("param_client").build()?;
    let timeout = Duration::from_secs_f64(args.timeout);
    let client = node
        .create_parameters_client()
        .with_remote_node(&args.remote)
        .with_timeout(timeout)
        .build()?;

    if !client.wait_for_service(timeout).await {
        println!("Parameter services of {} are not available", args.remote);
        return Ok(());
    }

    match args.command {
        Command::List { prefixes } => {
            let prefixes: Vec<&str> = prefixes.iter().map(String::as_str).collect();
            let listed = client.list_parameters(&prefixes, DEPTH_RECURSIVE).await?;
            for name in listed.names {
                println!("{name}");
            }
        }
        Command::Get { names } => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let params = client.get_parameters(&names).await?;
            println!("{}", parameters_to_json(&params));
        }
        Command::Set { name, value } => {
            let value = parse_value(&name, &value)?;
            let results = client.set_parameters(vec![Parameter { name, value }]).await?;
            for result in results {
                if result.successful {
                    println!("Set parameter successful");
                } else {
                    println!("Setting parameter failed: {}", result.reason);
                }
            }
        }
        Command::Delete { name } => {
            let results = client.set_parameters(vec![Parameter::unset(name)]).await?;
            println!("Deleted: {}", results.iter().all(|r| r.successful));
        }
    }
    Ok(())
}
