//! Tracing setup for osnap.
//!
//! Everything is driven by environment variables so cron jobs can change
//! verbosity without touching the command line:
//!
//! | Variable           | Values                      | Default          |
//! |--------------------|-----------------------------|------------------|
//! | `OSNAP_LOG_LEVEL`  | any `EnvFilter` directive   | `info`           |
//! | `OSNAP_LOG_OUTPUT` | `console`, `file`, `both`   | `console`        |
//! | `OSNAP_LOG_FORMAT` | `human`, `json`             | `human`          |
//! | `OSNAP_LOG_FILE`   | path of the rolling log     | `/tmp/osnap.log` |
//! | `OSNAP_LOG_TAGS`   | `key:value,...` span fields | none             |
//!
//! `OSNAP_LOG_TAGS=vm:web01` keeps only events emitted inside a span whose
//! `vm` field contains `web01`. A value of `*` matches any value.

use std::{
    collections::HashMap,
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{field::Visit, span, subscriber::Interest, warn, Metadata, Subscriber};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::Directive,
    fmt::MakeWriter,
    layer::{Context, Layer},
    prelude::*,
    registry, EnvFilter,
};

const DEFAULT_LOG_FILE: &str = "/tmp/osnap.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub format: LogFormat,
    pub file_path: PathBuf,
    pub field_filters: Vec<FieldFilter>,
}

impl LogSettings {
    /// Reads the `OSNAP_LOG_*` variables. `debug` raises the default level
    /// but never overrides an explicit `OSNAP_LOG_LEVEL`.
    pub fn from_env(debug: bool) -> Self {
        Self::from_lookup(debug, |key| env::var(key).ok())
    }

    fn from_lookup(debug: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup("OSNAP_LOG_LEVEL").unwrap_or_default();
        let output = match lookup("OSNAP_LOG_OUTPUT").as_deref() {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            _ => LogOutput::Console,
        };
        let format = match lookup("OSNAP_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Human,
        };
        let file_path = lookup("OSNAP_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        let field_filters = lookup("OSNAP_LOG_TAGS")
            .map(|spec| parse_field_filters(&spec))
            .unwrap_or_default();

        let settings = Self {
            level,
            output,
            format,
            file_path,
            field_filters,
        };
        settings.with_default_level(if debug { "debug" } else { "info" })
    }

    fn with_default_level(mut self, level: &str) -> Self {
        if self.level.trim().is_empty() {
            self.level = level.to_string();
        }
        self
    }
}

/// Parses `key:value,key2:value2`. Malformed entries are skipped.
pub fn parse_field_filters(spec: &str) -> Vec<FieldFilter> {
    spec.split(',')
        .filter_map(|entry| {
            let (key, value) = entry.split_once(':')?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some(FieldFilter {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

// --- Tee writer: console and log file at once ---
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write_all(buf);
        let res_b = self.b.write_all(buf);
        res_a.or(res_b).map(|_| buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a>,
    B: MakeWriter<'a>,
{
    type Writer = Tee<A::Writer, B::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

// --- Span field filtering ---
struct FieldFilterLayer {
    filters: Vec<FieldFilter>,
}

type SpanFields = HashMap<String, String>;

impl<S> Layer<S> for FieldFilterLayer
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn register_callsite(&self, _meta: &'static Metadata<'static>) -> Interest {
        // The answer depends on the current span, so it cannot be cached.
        if self.filters.is_empty() {
            Interest::always()
        } else {
            Interest::sometimes()
        }
    }

    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(fields);
    }

    fn enabled(&self, meta: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        if self.filters.is_empty() || meta.is_span() {
            return true;
        }

        let Some(scope) = ctx.current_span().id().and_then(|id| ctx.span_scope(id)) else {
            return false;
        };

        let mut all_fields = SpanFields::new();
        for span_ref in scope {
            if let Some(fields) = span_ref.extensions().get::<SpanFields>() {
                for (k, v) in fields {
                    all_fields.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }

        matches_filters(&self.filters, &all_fields)
    }
}

fn matches_filters(filters: &[FieldFilter], fields: &SpanFields) -> bool {
    filters.iter().all(|filter| {
        fields
            .get(&filter.key)
            .is_some_and(|value| filter.value == "*" || value.contains(&filter.value))
    })
}

struct FieldVisitor<'a>(&'a mut SpanFields);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

fn build_env_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    for quiet in ["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"] {
        if let Ok(directive) = quiet.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

fn install<W>(writer: W, settings: &LogSettings)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let subscriber = registry()
        .with(build_env_filter(&settings.level))
        .with(FieldFilterLayer {
            filters: settings.field_filters.clone(),
        });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false);

    // A second initialisation (tests, embedding) keeps the first subscriber.
    let _ = match settings.format {
        LogFormat::Json => subscriber.with(fmt_layer.json()).try_init(),
        LogFormat::Human => subscriber.with(fmt_layer).try_init(),
    };
}

fn open_log_file(path: &Path) -> Result<RollingFileAppender, InitError> {
    let log_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("/tmp"));
    let log_filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("osnap.log");

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(log_filename)
        .build(log_dir)
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
///
/// A log file that cannot be opened falls back to console logging.
pub fn init_subscriber(settings: &LogSettings) -> Option<WorkerGuard> {
    if settings.output == LogOutput::Console {
        install(io::stderr, settings);
        return None;
    }

    let file_appender = match open_log_file(&settings.file_path) {
        Ok(appender) => appender,
        Err(e) => {
            install(io::stderr, settings);
            warn!(
                path = %settings.file_path.display(),
                error = %e,
                "Cannot open log file, logging to console"
            );
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    if settings.output == LogOutput::Both {
        install(
            MakeTee {
                make_a: io::stderr,
                make_b: non_blocking,
            },
            settings,
        );
    } else {
        install(non_blocking, settings);
    }
    Some(guard)
}
