use std::fs;

use chrono::Utc;
use stratagem_engine::domain_knowledge::StaticKnowledgeBase;
use stratagem_engine::persistence::NullStore;
use stratagem_engine::service_endpoint::{
    EndpointContext, EndpointRoute, HttpMethod, handle,
};

fn main() {
    if let Err(error) = run(std::env::args().skip(1).collect()) {
        eprintln!("{error}");
        std::process::exit(2);
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    if args.is_empty() {
        return Err(usage());
    }

    let route = match args[0].as_str() {
        "sensitivity" => EndpointRoute::Sensitivity,
        "symmetry-mining" => EndpointRoute::SymmetryMining,
        "cross-domain-transfer" => EndpointRoute::CrossDomainTransfer,
        "dynamic-recalibration" => EndpointRoute::DynamicRecalibration,
        "help" | "--help" | "-h" => {
            println!("{}", usage());
            return Ok(());
        }
        other => return Err(format!("unknown subcommand '{other}'\n\n{}", usage())),
    };

    let mut input_path: Option<&str> = None;
    let mut seed: u64 = 0;
    let mut emit_events = false;

    let mut index = 1usize;
    while index < args.len() {
        match args[index].as_str() {
            "--input" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| "--input requires a path".to_string())?;
                input_path = Some(value);
            }
            "--seed" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| "--seed requires a u64".to_string())?;
                seed = value
                    .parse()
                    .map_err(|_| format!("invalid seed '{value}'"))?;
            }
            "--events" => emit_events = true,
            flag => return Err(format!("unknown flag: {flag}")),
        }
        index += 1;
    }

    let input_path = input_path.ok_or_else(|| "--input <path> is required".to_string())?;
    let body = fs::read_to_string(input_path)
        .map_err(|error| format!("cannot read '{input_path}': {error}"))?;

    let kb = StaticKnowledgeBase::builtin();
    let store = NullStore;
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: seed,
        now: Utc::now(),
    };

    let (reply, events) = handle(&ctx, route, HttpMethod::Post, &body);
    if emit_events {
        for event in &events {
            match serde_json::to_string(event) {
                Ok(line) => eprintln!("{line}"),
                Err(error) => eprintln!("event serialization failed: {error}"),
            }
        }
    }
    println!("{}", reply.body);
    if reply.status >= 400 {
        return Err(format!("request failed with status {}", reply.status));
    }
    Ok(())
}

fn usage() -> String {
    [
        "stratagem-analysis-runner usage:",
        "  stratagem-analysis-runner sensitivity --input <request.json> [--seed <u64>] [--events]",
        "  stratagem-analysis-runner symmetry-mining --input <request.json> [--events]",
        "  stratagem-analysis-runner cross-domain-transfer --input <request.json> [--events]",
        "  stratagem-analysis-runner dynamic-recalibration --input <request.json> [--events]",
    ]
    .join("\n")
}
