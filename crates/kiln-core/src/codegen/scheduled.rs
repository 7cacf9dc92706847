//! Scheduled job generation.
//!
//! A `@SCHEDULE` cell registers a job with the `scheduler`. If the body
//! already defines a function, the decorator is spliced in directly above
//! it. Otherwise the body is wrapped in a synthesized
//! `async def scheduled_generated_func_<n>():`.

use crate::codegen::ir::{FunctionDef, Stmt, py_str};
use crate::compile::context::CompileContext;
use crate::compile::diagnostics::Diagnostics;
use crate::compile::introspect::{FunctionSignature, introspect};
use crate::compile::metadata::Metadata;

/// When the job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Six-field expression: second minute hour day month day_of_week
    Cron(String),
    /// `<int><s|m|h>`
    Interval(String),
}

/// Cron fields mapped positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronFields {
    pub second: String,
    pub minute: String,
    pub hour: String,
    pub day: String,
    pub month: String,
    pub day_of_week: String,
}

impl CronFields {
    /// Keyword arguments in positional order.
    fn kwargs(&self) -> [(&'static str, &str); 6] {
        [
            ("second", self.second.as_str()),
            ("minute", self.minute.as_str()),
            ("hour", self.hour.as_str()),
            ("day", self.day.as_str()),
            ("month", self.month.as_str()),
            ("day_of_week", self.day_of_week.as_str()),
        ]
    }
}

/// Parse a cron expression. Fewer than six fields is invalid; extra
/// fields are ignored with a warning.
pub fn parse_cron(expr: &str, diags: &mut Diagnostics) -> Option<CronFields> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    if parts.len() < 6 {
        diags.warn(format!(
            "invalid cron format `{expr}`: expected 6 fields (second minute hour day month day_of_week), found {}",
            parts.len()
        ));
        return None;
    }
    if parts.len() > 6 {
        diags.warn(format!(
            "cron `{expr}` has {} fields, ignoring everything after the sixth",
            parts.len()
        ));
    }

    Some(CronFields {
        second: parts[0].to_string(),
        minute: parts[1].to_string(),
        hour: parts[2].to_string(),
        day: parts[3].to_string(),
        month: parts[4].to_string(),
        day_of_week: parts[5].to_string(),
    })
}

/// Parse an interval into seconds.
pub fn parse_interval(expr: &str, diags: &mut Diagnostics) -> Option<u64> {
    let expr = expr.trim();
    let digits_end = expr
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(expr.len());
    let Ok(value) = expr[..digits_end].parse::<u64>() else {
        diags.warn(format!("invalid interval format `{expr}`"));
        return None;
    };

    let unit = expr[digits_end..].trim();
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "" => {
            diags.warn(format!("interval `{expr}` has no unit, assuming seconds"));
            1
        }
        other => {
            diags.warn(format!(
                "unsupported interval unit `{other}`, defaulting to seconds"
            ));
            1
        }
    };

    let seconds = value.checked_mul(multiplier);
    if seconds.is_none() {
        diags.warn(format!("interval `{expr}` is too large"));
    }
    seconds
}

/// A classified `@SCHEDULE` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub trigger: Trigger,
    pub source: String,
}

impl ScheduledJob {
    /// Build from parsed metadata. Returns `None` when neither `cron` nor
    /// `interval` is declared.
    pub fn from_metadata(
        meta: &Metadata,
        source: impl Into<String>,
        diags: &mut Diagnostics,
    ) -> Option<Self> {
        let cron = meta.get_str("cron");
        let interval = meta.get_str("interval");

        let trigger = match (cron, interval) {
            (Some(cron), Some(_)) => {
                diags.warn("both cron and interval declared, using cron");
                Trigger::Cron(cron)
            }
            (Some(cron), None) => Trigger::Cron(cron),
            (None, Some(interval)) => Trigger::Interval(interval),
            (None, None) => {
                diags.warn("scheduled cell declares neither cron nor interval, cell skipped");
                return None;
            }
        };

        Some(Self {
            trigger,
            source: source.into(),
        })
    }

    /// Generate the job. A malformed trigger renders as a comment.
    pub fn generate(&self, ctx: &mut CompileContext, diags: &mut Diagnostics) -> Vec<Stmt> {
        let sig = introspect(&self.source);
        let name = match &sig {
            Some(sig) => sig.name.clone(),
            None => ctx.next_generated_name(),
        };

        let decorator = match &self.trigger {
            Trigger::Cron(expr) => match parse_cron(expr, diags) {
                Some(fields) => cron_decorator(&name, &fields),
                None => return vec![Stmt::line("# Invalid cron format")],
            },
            Trigger::Interval(expr) => match parse_interval(expr, diags) {
                Some(seconds) => format!(
                    "scheduler.scheduled_job('interval', id={}, name={}, seconds={seconds})",
                    py_str(&format!("{name}_interval")),
                    py_str(&format!("{name}_interval_job")),
                ),
                None => return vec![Stmt::line("# Invalid interval format")],
            },
        };

        match sig {
            Some(sig) => vec![Stmt::Verbatim(decorate_existing(&self.source, &sig, &decorator))],
            None => vec![Stmt::Function(
                FunctionDef::new(format!("scheduled_{name}"))
                    .asynchronous()
                    .decorator(decorator)
                    .body(vec![Stmt::Verbatim(self.source.clone())]),
            )],
        }
    }
}

fn cron_decorator(name: &str, fields: &CronFields) -> String {
    let mut out = format!(
        "scheduler.scheduled_job('cron', id={}, name={}",
        py_str(&format!("{name}_cron")),
        py_str(&format!("{name}_cron_job")),
    );
    for (key, value) in fields.kwargs() {
        out.push_str(&format!(", {key}={}", py_str(value)));
    }
    out.push(')');
    out
}

/// Insert `@decorator` above the function and any decorators it has.
fn decorate_existing(source: &str, sig: &FunctionSignature, decorator: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();

    let mut insert_at = sig.line;
    while insert_at > 0 {
        let prev = lines[insert_at - 1];
        let prev_indent = prev.len() - prev.trim_start().len();
        if prev.trim_start().starts_with('@') && prev_indent == sig.indent {
            insert_at -= 1;
        } else {
            break;
        }
    }

    let indent = &lines[sig.line][..sig.indent];
    let mut out: Vec<String> = lines[..insert_at].iter().map(|l| l.to_string()).collect();
    out.push(format!("{indent}@{decorator}"));
    out.extend(lines[insert_at..].iter().map(|l| l.to_string()));
    out.join("\n")
}
