use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use pomodesk_core::{DateRange, PersistenceGateway, StatsReport};

use super::{date_arg, print_json, CmdResult, Workspace};

#[derive(Clone, Copy, ValueEnum)]
pub enum Range {
    Today,
    /// Since Sunday
    Week,
    /// Since the 1st
    Month,
    All,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Predefined range
    #[arg(value_enum, default_value = "today")]
    range: Range,
    /// Custom range start (with --to)
    #[arg(long, value_parser = date_arg, requires = "to")]
    from: Option<NaiveDate>,
    /// Custom range end (with --from)
    #[arg(long, value_parser = date_arg, requires = "from")]
    to: Option<NaiveDate>,
}

pub fn run(args: StatsArgs) -> CmdResult {
    let ws = Workspace::open()?;
    let today = ws.day(None);

    let range = match (args.from, args.to) {
        (Some(from), Some(to)) => DateRange::between(from, to)?,
        _ => match args.range {
            Range::Today => DateRange::today(today),
            Range::Week => DateRange::this_week(today),
            Range::Month => DateRange::this_month(today),
            Range::All => DateRange::all_time(),
        },
    };

    let tasks = ws.db.query_task_stats(&range)?;
    let pomodoros = ws.db.query_pomodoro_stats(&range)?;
    print_json(&StatsReport::new(range, tasks, pomodoros))
}
