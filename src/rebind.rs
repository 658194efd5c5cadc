//! Placeholder rebinding.

use std::fmt::Write;

/// Rewrite `?` placeholders to PostgreSQL's `$1`, `$2`, ... syntax.
///
/// The rewrite is purely syntactic, left to right; it does not parse the
/// query, so a `?` inside a string literal is rewritten too.
pub fn rebind(query: &str) -> String {
    // Room for a handful of parameter digits before reallocating.
    let mut out = String::with_capacity(query.len() + 10);
    let mut n = 0u32;

    for c in query.chars() {
        if c == '?' {
            n += 1;
            // Writing to a String cannot fail.
            let _ = write!(out, "${}", n);
        } else {
            out.push(c);
        }
    }

    out
}
