//! # zmirror CLI
//!
//! Command-line utilities for inspecting topics and crafting command
//! payloads for the gateway's `set` topic.

use anyhow::{Context, Result};
use std::env;
use zmirror_core::ValueId;
use zmirror_proto::{encode_command, Command, StateTopic, TopicScheme};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "topic" => {
            if args.len() < 4 {
                eprintln!("Usage: zmirror topic <prefix> <topic>");
                std::process::exit(1);
            }
            let scheme = TopicScheme::new(args[2].clone());
            match scheme.parse(&args[3]) {
                Some(StateTopic::Node(node_id)) => println!("node {node_id}"),
                Some(StateTopic::Value(id)) => println!("value {id}"),
                None => {
                    eprintln!("Not a state topic under prefix '{}'", args[2]);
                    std::process::exit(1);
                }
            }
        }
        "on" => {
            let node_id = parse_node(&args, 2)?;
            print_command(&Command::On { node_id })?;
        }
        "off" => {
            let node_id = parse_node(&args, 2)?;
            print_command(&Command::Off { node_id })?;
        }
        "level" => {
            let node_id = parse_node(&args, 2)?;
            let value = arg(&args, 3, "zmirror level <node> <value>")?
                .parse()
                .context("Invalid level")?;
            print_command(&Command::Level { node_id, value })?;
        }
        "value" => {
            if args.len() < 7 {
                eprintln!("Usage: zmirror value <node> <class> <instance> <index> <value>");
                std::process::exit(1);
            }
            let id = ValueId::new(
                args[2].parse().context("Invalid node id")?,
                args[3].parse().context("Invalid class id")?,
                args[4].parse().context("Invalid instance")?,
                args[5].parse().context("Invalid index")?,
            );
            let scalar: serde_json::Value = serde_json::from_str(&args[6])
                .unwrap_or_else(|_| serde_json::Value::String(args[6].clone()));
            print_command(&Command::value(&id, scalar))?;
        }
        "name" => {
            let node_id = parse_node(&args, 2)?;
            let value = arg(&args, 3, "zmirror name <node> <name>")?.to_string();
            print_command(&Command::Name { node_id, value })?;
        }
        "location" => {
            let node_id = parse_node(&args, 2)?;
            let value = arg(&args, 3, "zmirror location <node> <location>")?.to_string();
            print_command(&Command::Location { node_id, value })?;
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn arg<'a>(args: &'a [String], position: usize, usage: &str) -> Result<&'a str> {
    args.get(position).map(String::as_str).with_context(|| format!("Usage: {usage}"))
}

fn parse_node(args: &[String], position: usize) -> Result<u16> {
    arg(args, position, "zmirror <command> <node> [...]")?
        .parse()
        .context("Invalid node id")
}

fn print_command(command: &Command) -> Result<()> {
    let payload = encode_command(command).context("Failed to encode command")?;
    println!("{}", String::from_utf8_lossy(&payload));
    Ok(())
}

fn print_help() {
    println!(
        r#"zmirror CLI

USAGE:
    zmirror <COMMAND> [OPTIONS]

COMMANDS:
    topic <prefix> <topic>                        Decode a mirror topic
    on <node>                                     Print an "on" command payload
    off <node>                                    Print an "off" command payload
    level <node> <value>                          Print a "level" command payload
    value <node> <class> <instance> <index> <v>   Print a "value" command payload
    name <node> <name>                            Print a "name" command payload
    location <node> <location>                    Print a "location" command payload
    help                                          Show this help message

EXAMPLES:
    zmirror topic zwave zwave/node3/value37-1-0
    zmirror on 3 | mosquitto_pub -t zwave/set -s
    zmirror level 4 80
"#
    );
}
