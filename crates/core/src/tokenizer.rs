//! Splits launch script and argument file lines into arguments.
//!
//! The dialect is the one the installer writes, not POSIX shell:
//! - a single space separates arguments; runs of spaces never yield empty ones
//! - `"` and `'` open a quoted run only at the start of an argument
//! - a backslash escapes a following quote and is otherwise kept verbatim,
//!   so Windows paths like `C:\jre\bin\java.exe` survive untouched

const ESCAPE: char = '\\';
const SPACE: char = ' ';
const QUOTES: char = '"';
const SINGLE_QUOTES: char = '\'';

fn is_quote(ch: char) -> bool {
    ch == QUOTES || ch == SINGLE_QUOTES
}

/// Tokenizes one line. Pure; an unterminated quoted run is dropped.
pub fn tokenize(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut args = Vec::new();
    let mut current: Option<String> = None;
    let mut enclosing: Option<char> = None;

    for (i, &ch) in chars.iter().enumerate() {
        let escaped = i > 0 && chars[i - 1] == ESCAPE;

        if ch == SPACE && enclosing.is_none() {
            if let Some(arg) = current.take() {
                args.push(arg);
            }
            continue;
        }

        if !escaped {
            if Some(ch) == enclosing {
                enclosing = None;
                continue;
            }
            if enclosing.is_none()
                && is_quote(ch)
                && current.as_deref().is_none_or(|s| s.trim().is_empty())
            {
                current = Some(String::new());
                enclosing = Some(ch);
                continue;
            }
        }

        // Only a backslash directly in front of a quote is an escape.
        let escapes_quote = ch == ESCAPE && chars.get(i + 1).copied().is_some_and(is_quote);
        if !escapes_quote {
            current.get_or_insert_with(String::new).push(ch);
        }
    }

    if enclosing.is_none() {
        if let Some(arg) = current {
            args.push(arg);
        }
    }

    args
}
