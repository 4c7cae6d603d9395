//! Fallback artifact generation.
//!
//! The last line of defense: a trivial component that renders a bounded
//! diagnostic. No capability calls, no timers, no I/O, and every
//! interpolated string escaped; this code must be statically incapable of
//! throwing under either contract version.

use crate::artifact::ContractVersion;

const DIAGNOSTIC_LIMIT: usize = 180;

/// Build complete executable fallback code for a unit, including the
/// contract glue; the regular wrapper never runs on fallback output.
pub fn generate_fallback(
    unit_id: &str,
    diagnostic: Option<&str>,
    token: &str,
    version: ContractVersion,
) -> String {
    // Suffixed with the unit token so fallbacks from different units can
    // be concatenated into one program like any other artifacts.
    let component = format!("__Fallback_{}", token);
    let id_text = escape_js_string(unit_id);

    let mut out = String::new();
    if version == ContractVersion::V1 {
        out.push_str("const React = window.React;\n");
    }

    out.push_str(&format!("function {}() {{\n", component));
    out.push_str(
        "  return React.createElement(\"div\", {\n    style: {\n      display: \"flex\",\n      flexDirection: \"column\",\n      alignItems: \"center\",\n      justifyContent: \"center\",\n      width: \"100%\",\n      height: \"100%\",\n      backgroundColor: \"#1e1e1e\",\n      color: \"#cccccc\",\n      fontFamily: \"monospace\",\n      fontSize: 14,\n      padding: 20,\n      textAlign: \"center\"\n    }\n  },\n",
    );
    out.push_str("  React.createElement(\"div\", { style: { fontSize: 18, marginBottom: 8 } }, \"Scene unavailable\"),\n");
    out.push_str(&format!(
        "  React.createElement(\"div\", {{ style: {{ opacity: 0.7 }} }}, \"unit {}\")",
        id_text
    ));

    if let Some(diag) = diagnostic {
        let truncated = truncate_chars(diag, DIAGNOSTIC_LIMIT);
        out.push_str(&format!(
            ",\n  React.createElement(\"div\", {{ style: {{ opacity: 0.5, marginTop: 8 }} }}, \"{}\")",
            escape_js_string(&truncated)
        ));
    }

    out.push_str(");\n}\n");
    out.push_str(&format!("return {};\n", component));
    out
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push('…');
    truncated
}

fn escape_js_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            // A closing paren pair in text could never break out of the
            // string literal, but line/paragraph separators would.
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}
