use tracing::info;

use super::error::PipelineError;
use super::pool::Pool;
use super::single::DirectPipeline;
use super::traits::Pipeline;
use crate::config::Config;
use crate::engine::ChainExecutor;
use crate::processor::{BuildContext, ProcessorFactory};

/// Build one instance of the configured chain for `lane`
///
/// Fails on the first processor that cannot be built, naming its index
/// and type.
pub fn build_chain(
    config: &Config,
    factory: &dyn ProcessorFactory,
    lane: usize,
) -> Result<ChainExecutor, PipelineError> {
    let mut processors = Vec::with_capacity(config.processors.len());

    for (index, proc_conf) in config.processors.iter().enumerate() {
        let context = BuildContext::for_processor(lane, index);
        let processor =
            factory
                .build(proc_conf, &context)
                .map_err(|source| PipelineError::Build {
                    index,
                    kind: proc_conf.kind.clone(),
                    source,
                })?;
        processors.push(processor);
    }

    Ok(ChainExecutor::new(processors))
}

/// Build a pipeline from config
///
/// With fewer than two threads the chain is wired directly; otherwise every
/// lane gets its own chain, all built before anything runs. Nothing is
/// spawned until [`Pipeline::consume`] is called.
///
/// # Example
/// ```rust,ignore
/// let config = Config::from_file("pipeline.json").await?;
/// let mut pipeline = build_pipeline(&config, &Registry::with_builtins())?;
///
/// let (tx, rx) = mpsc::channel(16);
/// let mut results = pipeline.consume(rx)?;
/// ```
pub fn build_pipeline(
    config: &Config,
    factory: &dyn ProcessorFactory,
) -> Result<Box<dyn Pipeline>, PipelineError> {
    let lanes = config.lanes();

    if !config.is_pooled() {
        let executor = build_chain(config, factory, 0)?;
        info!(processors = executor.len(), "Built direct pipeline");
        return Ok(Box::new(DirectPipeline::new(executor)));
    }

    let executors = (0..lanes)
        .map(|lane| build_chain(config, factory, lane))
        .collect::<Result<Vec<_>, _>>()?;

    info!(lanes, processors = config.processors.len(), "Built pipeline pool");
    Ok(Box::new(Pool::new(executors)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use crate::domain::ProcessorError;
    use crate::processor::Registry;

    fn config(threads: i64, kinds: &[&str]) -> Config {
        Config::new(
            threads,
            kinds.iter().map(|k| ProcessorConfig::new(*k)).collect(),
        )
    }

    #[test]
    fn builds_chain_in_config_order() {
        let registry = Registry::with_builtins();
        let chain = build_chain(&config(1, &["uppercase", "noop"]), &registry, 0).unwrap();
        assert_eq!(chain.names(), vec!["uppercase", "noop"]);
    }

    #[test]
    fn failure_names_index_and_type() {
        let registry = Registry::with_builtins();
        let result = build_chain(&config(1, &["noop", "noop", "bogus"]), &registry, 0);

        match result {
            Err(PipelineError::Build {
                index,
                kind,
                source,
            }) => {
                assert_eq!(index, 2);
                assert_eq!(kind, "bogus");
                assert_eq!(source, ProcessorError::UnknownType("bogus".to_string()));
            }
            _ => panic!("Expected Build error"),
        }
    }

    #[tokio::test]
    async fn selects_direct_for_single_thread() {
        let registry = Registry::with_builtins();
        for threads in [-1, 0, 1] {
            let pipeline = build_pipeline(&config(threads, &["noop"]), &registry).unwrap();
            assert_eq!(pipeline.state(), crate::pipeline::PipelineState::Created);
        }
    }

    #[test]
    fn pooled_build_fails_before_anything_starts() {
        let registry = Registry::with_builtins();
        let result = build_pipeline(&config(4, &["noop", "bogus", "noop"]), &registry);

        assert!(matches!(
            result,
            Err(PipelineError::Build { index: 1, .. })
        ));
    }
}
