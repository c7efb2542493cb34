//! Text formatting of statements and parameters
//!
//! Everything here is pure string building; only the sink can fail.

use std::fmt::Write as _;

use crate::params::{ParamEntry, ParamValues, ParameterSet};

/// Significant digits of written floats
pub const FLOAT_PRECISION: usize = 8;

/// Spaces per nesting level
pub const INDENT_WIDTH: usize = 2;

/// Format a float like C's `%.8g`
///
/// Uses fixed notation when the decimal exponent lies in `-4..8` and
/// scientific notation (`1.5e+09`) otherwise; trailing zeros are removed.
pub fn format_float(value: f32) -> String {
    let v = f64::from(value);
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rounding to the target precision first gives the exponent %g decides on.
    let scientific = format!("{:.*e}", FLOAT_PRECISION - 1, v);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= FLOAT_PRECISION as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.unsigned_abs())
    } else {
        let decimals = usize::try_from(FLOAT_PRECISION as i32 - 1 - exponent).unwrap_or(0);
        trim_zeros(&format!("{v:.decimals$}")).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Quote a string
///
/// Backslashes and quotes are escaped; control characters become C-style
/// escapes so a value never spans more than one line.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\{:03o}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Space-separated floats
pub fn format_floats(values: &[f32]) -> String {
    values.iter().map(|&v| format_float(v)).collect::<Vec<_>>().join(" ")
}

fn indent(out: &mut String, level: usize) {
    out.extend(std::iter::repeat(' ').take(level * INDENT_WIDTH));
}

/// Each value of an entry as written
fn value_tokens(values: &ParamValues) -> Vec<String> {
    match values {
        ParamValues::Bool(v) => v.iter().map(|&b| quote(if b { "true" } else { "false" })).collect(),
        ParamValues::Int(v) => v.iter().map(ToString::to_string).collect(),
        ParamValues::Float(v) => v.iter().map(|&f| format_float(f)).collect(),
        ParamValues::Triple(v) => v.iter().map(|t| format_floats(t)).collect(),
        ParamValues::Text(v) => v.iter().map(|s| quote(s)).collect(),
        ParamValues::Index(v) => v.iter().map(|[a, b, c]| format!("{a} {b} {c}")).collect(),
    }
}

/// Append one parameter at nesting `level`
///
/// ```text
/// "float gain" [1.5]
/// "point P" [
///   0 0 0
///   1 0 0
/// ]
/// ```
pub fn write_param(out: &mut String, entry: &ParamEntry, level: usize) {
    let tokens = value_tokens(entry.values());
    indent(out, level);
    let _ = write!(out, "\"{} {}\" [", entry.param_type().keyword(), entry.name());
    if let [single] = tokens.as_slice() {
        let _ = writeln!(out, "{single}]");
        return;
    }
    out.push('\n');
    for token in &tokens {
        indent(out, level + 1);
        out.push_str(token);
        out.push('\n');
    }
    indent(out, level);
    out.push_str("]\n");
}

/// Append a statement line and its parameters at nesting `level`
pub fn write_statement(out: &mut String, keyword: &str, ids: &[&str], params: &ParameterSet, level: usize) {
    indent(out, level);
    out.push_str(keyword);
    for id in ids {
        out.push(' ');
        out.push_str(&quote(id));
    }
    out.push('\n');
    for entry in params {
        write_param(out, entry, level + 1);
    }
}

/// Append a statement followed by bare numbers in brackets
pub fn write_numeric(out: &mut String, keyword: &str, numbers: &[f32], bracketed: bool, level: usize) {
    indent(out, level);
    out.push_str(keyword);
    out.push(' ');
    if bracketed {
        let _ = writeln!(out, "[{}]", format_floats(numbers));
    } else {
        out.push_str(&format_floats(numbers));
        out.push('\n');
    }
}
