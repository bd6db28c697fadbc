//! Copy command implementation.

use super::{check_format, connect};
use crate::transport::ReqwestClient;
use catsync_engine::{
    render_plan, EconomyConfig, ReconcileConfig, Reconciler, RunReport, TracingSink,
};
use std::sync::Arc;
use tracing::info;

/// Options of one copy.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Delete and recreate every currency and item.
    pub full_recreate: bool,
    /// Print the plan instead of applying it.
    pub dry_run: bool,
    /// Maximum entities per create/delete call.
    pub batch_size: usize,
    /// Publish created items.
    pub publish: bool,
    /// Output format (text, json).
    pub format: String,
}

impl CopyOptions {
    /// Engine configuration for these options.
    pub fn reconcile_config(&self) -> ReconcileConfig {
        let config = ReconcileConfig::new().with_batch_size(self.batch_size);
        if self.full_recreate {
            config.full_recreate()
        } else {
            config
        }
    }
}

/// Runs the copy command.
pub fn run(
    http: &Arc<ReqwestClient>,
    source: (EconomyConfig, &str),
    target: (EconomyConfig, &str),
    options: &CopyOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    check_format(&options.format)?;

    let (source_config, source_secret) = source;
    let (target_config, target_secret) = target;
    if source_config.title_id == target_config.title_id {
        return Err("Source and target must be different titles".into());
    }

    info!(
        source = %source_config.title_id,
        target = %target_config.title_id,
        dry_run = options.dry_run,
        "copying catalog"
    );

    let source = connect(http, source_config, source_secret);
    let target = connect(http, target_config.with_publish(options.publish), target_secret);
    let mut reconciler = Reconciler::new(source, target, options.reconcile_config())
        .with_sink(Arc::new(TracingSink));

    if options.dry_run {
        let plan = reconciler.plan()?;
        if options.format == "json" {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            println!("(dry run - no changes will be made)");
            print!("{}", render_plan(&plan));
        }
        return Ok(());
    }

    let report = reconciler.run()?;
    print_report(&report, &options.format)?;

    if report.failed() > 0 {
        return Err(format!("{} entities could not be copied", report.failed()).into());
    }
    Ok(())
}

fn print_report(report: &RunReport, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catsync_model::DiffMode;

    fn options() -> CopyOptions {
        CopyOptions {
            full_recreate: false,
            dry_run: false,
            batch_size: 20,
            publish: true,
            format: "text".into(),
        }
    }

    #[test]
    fn options_map_to_engine_config() {
        let config = options().reconcile_config();
        assert_eq!(config.mode, DiffMode::Incremental);
        assert_eq!(config.batch_size, 20);

        let config = CopyOptions {
            full_recreate: true,
            batch_size: 0,
            ..options()
        }
        .reconcile_config();
        assert_eq!(config.mode, DiffMode::FullRecreate);
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn same_title_is_rejected() {
        let http = Arc::new(ReqwestClient::new(std::time::Duration::from_secs(1)).unwrap());
        let err = run(
            &http,
            (EconomyConfig::for_title("T1"), "a"),
            (EconomyConfig::for_title("T1"), "b"),
            &options(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("different titles"));
    }
}
