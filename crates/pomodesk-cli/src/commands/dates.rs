use pomodesk_core::clock::format_date;
use pomodesk_core::{EngineContext, NullNotifier, TimerRegistry};
use std::sync::Arc;

use super::{print_json, CmdResult, Workspace};

/// Days that have timers or tasks, plus today, newest first.
pub fn run() -> CmdResult {
    let ws = Workspace::open()?;
    let ctx = EngineContext {
        gateway: ws.db.clone(),
        notifier: Arc::new(NullNotifier),
        clock: ws.clock.clone(),
    };
    let registry = TimerRegistry::load(ctx, ws.config.engine_options())?;
    let dates: Vec<String> = registry
        .list_available_dates()?
        .into_iter()
        .map(format_date)
        .collect();
    print_json(&dates)
}
