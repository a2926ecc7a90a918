use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Where console output should go. Converted into an [`OutputMethod`] when a
/// configuration layer is applied.
pub enum OutputSpec {
    Stdout,
    Stderr,
    /// Append into a shared string buffer. The caller keeps a clone of the
    /// handle and can inspect the transcript afterwards.
    Buffer(Rc<RefCell<String>>),
    Writer(Box<dyn Write>),
    /// An already-built sink, passed through unchanged.
    Method(OutputMethod),
    /// Discard everything, silently.
    Null,
}

impl From<Rc<RefCell<String>>> for OutputSpec {
    fn from(buffer: Rc<RefCell<String>>) -> Self {
        OutputSpec::Buffer(buffer)
    }
}

impl From<Box<dyn Write>> for OutputSpec {
    fn from(writer: Box<dyn Write>) -> Self {
        OutputSpec::Writer(writer)
    }
}

impl From<OutputMethod> for OutputSpec {
    fn from(method: OutputMethod) -> Self {
        OutputSpec::Method(method)
    }
}

/// A text sink with a silence flag. Silenced writes are dropped without
/// erroring, so a quieted console behaves identically apart from producing
/// no output.
pub struct OutputMethod {
    target: Target,
    silenced: bool,
}

enum Target {
    Stdout,
    Stderr,
    Buffer(Rc<RefCell<String>>),
    Writer(Box<dyn Write>),
    Null,
}

impl OutputMethod {
    pub fn from_spec(spec: OutputSpec) -> Self {
        let target = match spec {
            OutputSpec::Stdout => Target::Stdout,
            OutputSpec::Stderr => Target::Stderr,
            OutputSpec::Buffer(buffer) => Target::Buffer(buffer),
            OutputSpec::Writer(writer) => Target::Writer(writer),
            OutputSpec::Null => Target::Null,
            OutputSpec::Method(method) => return method,
        };
        Self {
            target,
            silenced: false,
        }
    }

    pub fn null() -> Self {
        Self::from_spec(OutputSpec::Null)
    }

    pub fn silenced(&self) -> bool {
        self.silenced
    }

    pub fn set_silenced(&mut self, silenced: bool) {
        self.silenced = silenced;
    }

    pub fn print(&mut self, text: &str) {
        if self.silenced {
            return;
        }
        match &mut self.target {
            Target::Stdout => {
                let mut out = io::stdout();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            Target::Stderr => {
                let mut err = io::stderr();
                let _ = err.write_all(text.as_bytes());
                let _ = err.flush();
            }
            Target::Buffer(buffer) => buffer.borrow_mut().push_str(text),
            Target::Writer(writer) => {
                let _ = writer.write_all(text.as_bytes());
                let _ = writer.flush();
            }
            Target::Null => {}
        }
    }

    pub fn puts(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_capture() {
        let buffer = Rc::new(RefCell::new(String::new()));
        let mut output = OutputMethod::from_spec(OutputSpec::Buffer(Rc::clone(&buffer)));
        output.print("a");
        output.puts("b");
        assert_eq!(*buffer.borrow(), "ab\n");
    }

    #[test]
    fn test_silenced_drops_writes_without_error() {
        let buffer = Rc::new(RefCell::new(String::new()));
        let mut output = OutputMethod::from_spec(OutputSpec::Buffer(Rc::clone(&buffer)));
        output.set_silenced(true);
        output.puts("hidden");
        assert!(buffer.borrow().is_empty());

        output.set_silenced(false);
        output.puts("shown");
        assert_eq!(*buffer.borrow(), "shown\n");
    }

    #[test]
    fn test_null_discards() {
        let mut output = OutputMethod::null();
        output.puts("nowhere");
        assert!(!output.silenced());
    }

    #[test]
    fn test_method_spec_passes_through() {
        let mut inner = OutputMethod::null();
        inner.set_silenced(true);
        let output = OutputMethod::from_spec(OutputSpec::Method(inner));
        assert!(output.silenced());
    }
}
