// Script sanitizer - static denylist scan for submitted code
//
// Defense in depth only. The primary boundary is the interactive policy
// gate; this scan rejects obviously dangerous constructs before any code
// reaches a subprocess. Matching is textual, not AST-based, so it can be
// defeated by obfuscation. It fails closed and never rewrites code.

use regex::Regex;
use std::sync::LazyLock;

/// Function-style calls that are never allowed in submitted code.
const DENIED_CALLS: &[&str] = &[
    "eval",
    "exec",
    "system",
    "passthru",
    "shell_exec",
    "proc_open",
    "popen",
    "pcntl_exec",
    "putenv",
    "ini_set",
    "ini_alter",
    "dl",
];

/// Identifier followed by an opening call parenthesis, case-insensitive.
static CALL_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    DENIED_CALLS
        .iter()
        .map(|name| {
            let re = Regex::new(&format!(r"(?i)\b{}\s*\(", regex::escape(name)))
                .expect("static call pattern");
            (re, *name)
        })
        .collect()
});

/// Structural patterns, each a distinct regex with its own issue message.
static STRUCTURAL_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"`[^`]+`", "backtick shell execution pattern"),
        (r"(?i)\bsudo\s", "privilege escalation pattern (sudo)"),
        (r"(?i)\bchmod\s+777\b", "privilege escalation pattern (chmod 777)"),
        (r"(?i)\bchown\s", "privilege escalation pattern (chown)"),
        (
            r"(?i)\b(curl|wget)\b[^\n]*\|\s*(ba|z|da)?sh\b",
            "pipe-to-shell download pattern",
        ),
        (
            r#"(?i)\b(unlink|file_put_contents|fopen|require|require_once|include|include_once)\s*\(\s*['"](/|~/)"#,
            "filesystem access pattern targeting an absolute or home path",
        ),
    ]
    .iter()
    .map(|(pat, msg)| (Regex::new(pat).expect("static structural pattern"), *msg))
    .collect()
});

/// Scan code for denylisted constructs. Empty report means the code passed.
///
/// Each denied call or structural pattern contributes at most one issue,
/// regardless of how many times it matches.
pub fn validate(code: &str) -> Vec<String> {
    let mut issues = Vec::new();

    for (re, name) in CALL_PATTERNS.iter() {
        if re.is_match(code) {
            issues.push(format!("disallowed function call: {}()", name));
        }
    }

    for (re, msg) in STRUCTURAL_PATTERNS.iter() {
        if re.is_match(code) {
            issues.push(format!("disallowed pattern: {}", msg));
        }
    }

    issues
}

/// True when `validate` reports no issues.
pub fn is_safe(code: &str) -> bool {
    validate(code).is_empty()
}
