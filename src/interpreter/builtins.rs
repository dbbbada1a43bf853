//! Built-in functions and the console capability they write through.
//!
//! Built-ins are plain function pointers looked up by name before user
//! functions. All console traffic goes through the [`Console`] trait so
//! tests can substitute an in-memory console for stdin/stdout.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use super::error::RuntimeError;
use super::value::Value;

/// Console I/O capability used by the built-in functions.
pub trait Console {
    /// Write text without a trailing newline.
    fn print(&mut self, text: &str);

    /// Write text followed by a newline.
    fn println(&mut self, text: &str);

    /// Read one line from input, without the trailing newline. Returns
    /// `None` on end of input or a read fault.
    fn read_line(&mut self) -> Option<String>;
}

/// Console backed by the process stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    fn println(&mut self, text: &str) {
        println!("{}", text);
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line).ok()?;
        if read == 0 {
            return None;
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

/// Signature shared by all built-in handlers.
pub type NativeFn = fn(&mut dyn Console, &[Value]) -> Result<Option<Value>, RuntimeError>;

/// Name-to-handler table for the built-in functions.
pub struct NativeRegistry {
    handlers: HashMap<&'static str, NativeFn>,
}

impl Default for NativeRegistry {
    fn default() -> NativeRegistry {
        let mut handlers: HashMap<&'static str, NativeFn> = HashMap::new();
        handlers.insert("print", native_print);
        handlers.insert("printf", native_printf);
        handlers.insert("input", native_input);
        NativeRegistry { handlers }
    }
}

impl NativeRegistry {
    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.handlers.get(name).copied()
    }
}

/// `print(value)`: write the argument's string form and a newline.
fn native_print(console: &mut dyn Console, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
    let [value] = args else {
        return Err(RuntimeError::TooFewArguments {
            name: "print".to_string(),
            expected: 1,
            got: args.len(),
        });
    };

    console.println(&value.to_string());
    Ok(None)
}

/// `printf(format, args...)`: formatted output, no implicit newline.
fn native_printf(console: &mut dyn Console, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
    let Some((format, rest)) = args.split_first() else {
        return Err(RuntimeError::TooFewArguments {
            name: "printf".to_string(),
            expected: 1,
            got: 0,
        });
    };

    let text = format_values(&format.to_string(), rest)?;
    console.print(&text);
    Ok(None)
}

/// `input()` / `input(prompt)`: read one line from the console as a string.
fn native_input(console: &mut dyn Console, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
    if let Some(prompt) = args.first() {
        console.print(&prompt.to_string());
    }

    match console.read_line() {
        Some(line) => Ok(Some(Value::Str(line))),
        None => Err(RuntimeError::IoFailure),
    }
}

/// Expand `%`-conversions in a printf format string.
///
/// Supported conversions: `%s` (string form), `%d` (integer), `%f` (float,
/// six decimals), `%b` (boolean), `%%` (literal percent). Arguments are
/// consumed left to right; too few arguments or an unknown conversion is a
/// format error.
fn format_values(format: &str, args: &[Value]) -> Result<String, RuntimeError> {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars();
    let mut next_arg = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let conversion = chars
            .next()
            .ok_or_else(|| RuntimeError::FormatError("dangling '%' in format string".to_string()))?;

        if conversion == '%' {
            out.push('%');
            continue;
        }

        let value = next_arg.next().ok_or_else(|| {
            RuntimeError::FormatError(format!("missing argument for '%{}'", conversion))
        })?;

        match conversion {
            's' => out.push_str(&value.to_string()),
            'd' => out.push_str(&value.to_int().to_string()),
            'f' => out.push_str(&format!("{:.6}", value.to_float())),
            'b' => out.push_str(if value.to_boolean() { "true" } else { "false" }),
            other => {
                return Err(RuntimeError::FormatError(format!(
                    "unknown conversion '%{}'",
                    other
                )))
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_expands_conversions() {
        let args = [
            Value::Str("ada".to_string()),
            Value::Int(3),
            Value::Float(1.5),
            Value::Bool(true),
        ];
        let text = format_values("%s scored %d (%f, %b) 100%%\n", &args).unwrap();
        assert_eq!(text, "ada scored 3 (1.500000, true) 100%\n");
    }

    #[test]
    fn format_rejects_missing_argument() {
        let err = format_values("%s %s", &[Value::Int(1)]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::FormatError("missing argument for '%s'".to_string())
        );
    }

    #[test]
    fn format_rejects_unknown_conversion() {
        let err = format_values("%q", &[Value::Int(1)]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::FormatError("unknown conversion '%q'".to_string())
        );
    }

    #[test]
    fn format_conversions_coerce_their_argument() {
        let text = format_values("%d", &[Value::Str("12".to_string())]).unwrap();
        assert_eq!(text, "12");

        let text = format_values("%d", &[Value::Bool(true)]).unwrap();
        assert_eq!(text, "1");
    }
}
