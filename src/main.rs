use std::path::PathBuf;

use lanes::prelude::*;
use tokio::io::{BufWriter, Stdout};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    CliApp::new("lanes")
        .run(move |writer| async move {
            let config_path = parse_args(args)?;
            run_pipeline(writer, config_path).await
        })
        .await
}

/// Parse and validate command-line arguments
fn parse_args(args: Vec<String>) -> Result<PathBuf, AppError> {
    if args.len() != 2 {
        return Err(AppError::InvalidArguments(
            "Usage: lanes <config.json>".to_string(),
        ));
    }
    Ok(PathBuf::from(&args[1]))
}

/// Stream stdin lines through the configured pipeline and write the results to stdout
async fn run_pipeline(writer: BufWriter<Stdout>, config_path: PathBuf) -> Result<(), AppError> {
    let config = Config::from_file(&config_path).await?;
    let registry = Registry::with_builtins();
    let mut pipeline = build_pipeline(&config, &registry)?;

    let (inbound, rx) = mpsc::channel(config.lanes());
    let results = pipeline.consume(rx)?;

    let input = LineBatchStream::new(tokio::io::stdin(), DEFAULT_MAX_BATCH);
    let feeder = tokio::spawn(feed(input, inbound));

    let written = drain_outbound(results, writer).await?;

    // A pipeline failure explains a closed input better than the feeder does
    pipeline.wait().await?;
    let batches = feeder.await??;

    info!(batches, messages = written, "Input drained");
    Ok(())
}
