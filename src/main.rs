use clap::Parser;
use docsift::{
    DataDir,
    IndexService,
    error,
    service::TaskOutcome,
    tantivy_index::SearchHit,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

fn init_tracing(cli: &Cli) {
    let filter = std::env::var("DOCSIFT_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose > 0)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let service =
        IndexService::from_data_dir(&data_dir, cli.tasks_file.as_deref());

    match cli.command {
        Command::Build(args) => {
            let outcomes = service
                .trigger_build_all_tasks(args.topics.as_deref())
                .await?;
            if args.json {
                print_outcomes_json(&outcomes)?;
            } else {
                print_outcomes(&outcomes);
            }
            if outcomes.iter().any(|o| o.result.is_err()) {
                std::process::exit(1);
            }
        }
        Command::Refresh(args) => {
            let status = service.trigger_refresh_index().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!(
                    "Merged {} record(s) from {} task(s) into {}",
                    status.records,
                    status.tasks,
                    status.snapshot.display()
                );
            }
        }
        Command::Search(args) => {
            let engine = service.ensure_engine().await?;
            let limit = args.limit(engine.records().len());
            let hits = service.query(&args.terms, limit).await?;

            if args.json {
                let out = json!({
                    "terms": args.terms,
                    "result_count": hits.len(),
                    "results": hits,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_hits(&hits);
            }
        }
        Command::Tasks(args) => {
            let tasks = service.load_tasks().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("No tasks configured in {}", service.tasks_file().display());
            } else {
                for task in &tasks {
                    println!(
                        "{}\t{:?}\t{}\t{}",
                        task.topic,
                        task.kind,
                        task.root_path.display(),
                        task.target_file.display()
                    );
                }
            }
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn print_outcomes(outcomes: &[TaskOutcome]) {
    if outcomes.is_empty() {
        println!("No tasks matched.");
        return;
    }

    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                println!(
                    "{}: {} record(s) -> {}",
                    outcome.topic,
                    report.records,
                    outcome.target_file.display()
                );
                for skipped in &report.skipped {
                    println!(
                        "  skipped {}: {}",
                        skipped.path.display(),
                        skipped.reason
                    );
                }
            }
            Err(e) => println!("{}: FAILED: {e}", outcome.topic),
        }
    }
}

fn print_outcomes_json(outcomes: &[TaskOutcome]) -> error::Result<()> {
    let out: Vec<_> = outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(report) => json!({
                "topic": o.topic,
                "targetFile": o.target_file,
                "records": report.records,
                "skipped": report
                    .skipped
                    .iter()
                    .map(|s| json!({"path": s.path, "reason": s.reason}))
                    .collect::<Vec<_>>(),
            }),
            Err(e) => json!({
                "topic": o.topic,
                "targetFile": o.target_file,
                "error": e.to_string(),
            }),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results found.");
        return;
    }

    for hit in hits {
        let caption = if hit.caption.is_empty() {
            String::new()
        } else {
            format!(" / {}", hit.caption)
        };
        println!(
            "{:>3}. [{:.3}] {}{caption}: {}",
            hit.rank, hit.score, hit.topic, hit.title
        );
        println!("     {}", hit.url);
        let snippet = hit.snippet.split_whitespace().collect::<Vec<_>>().join(" ");
        if !snippet.is_empty() {
            println!("     {snippet}");
        }
    }
    println!("\n{} result(s)", hits.len());
}
