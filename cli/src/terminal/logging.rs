use colored::*;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::registry::LookupSpan;

pub struct ProbeFormatter;

impl<S, N> FormatEvent<S, N> for ProbeFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) =
            if meta.target() == "success" {
                ("[✓]", |s| s.green().bold())
            } else {
                match *meta.level() {
                    Level::TRACE => ("[ ]", |s| s.dimmed()),
                    Level::DEBUG => ("[?]", |s| s.blue()),
                    Level::INFO => ("[+]", |s| s.green().bold()),
                    Level::WARN => ("[*]", |s| s.yellow().bold()),
                    Level::ERROR => ("[-]", |s| s.red().bold()),
                }
            };

        write!(writer, "{} ", color_func(symbol.into()))?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(ProbeFormatter)
        .init();
}
