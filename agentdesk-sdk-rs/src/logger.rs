use chrono::Local;
use colored::*;
use tracing_subscriber::EnvFilter;

/// Initializes the global logging system with colorized output and environment-based level filtering.
///
/// The `RUST_LOG` environment variable controls the level (default: info).
/// Example: `RUST_LOG=agentdesk_sdk_rs=debug cargo run -p agentdesk-agent-server-rs`
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Same as [`init_logging`], with `default_level` used when `RUST_LOG` is unset.
/// Calling it twice is harmless.
pub fn init_logging_with_default(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Force colored output even if not a TTY
    colored::control::set_override(true);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_writer(std::io::stdout)
        .event_format(CustomFormatter)
        .try_init();
}

struct CustomFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for CustomFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
        let metadata = event.metadata();

        write!(
            writer,
            "{} {} {} ",
            now.dimmed(),
            level_badge(*metadata.level()),
            metadata.target().dimmed()
        )?;

        let mut line = FieldLine::default();
        event.record(&mut line);

        write!(writer, "{}", line.render())?;
        writeln!(writer)
    }
}

fn level_badge(level: tracing::Level) -> String {
    match level {
        tracing::Level::ERROR => "ERROR".red().bold().to_string(),
        tracing::Level::WARN => "WARN".yellow().bold().to_string(),
        tracing::Level::INFO => "INFO".green().bold().to_string(),
        tracing::Level::DEBUG => "DEBUG".blue().bold().to_string(),
        tracing::Level::TRACE => "TRACE".magenta().bold().to_string(),
    }
}

/// Collects the message unescaped, followed by the remaining fields as `key=value`.
#[derive(Default)]
struct FieldLine {
    message: String,
    fields: Vec<(String, String)>,
}

impl FieldLine {
    fn render(&self) -> String {
        let mut out = self.message.clone();
        for (key, value) in &self.fields {
            out.push_str(&format!(" {}={}", key.cyan(), value));
        }
        out
    }
}

impl tracing::field::Visit for FieldLine {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}
