use crate::error::{ConsoleError, ConsoleResult};
use crate::output::OutputMethod;
use reedline::{
    default_emacs_keybindings, ColumnarMenu, Completer, Emacs, FileBackedHistory, KeyCode,
    KeyModifiers, MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, Span, Suggestion,
};
use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, Cursor, IsTerminal};
use std::mem;
use std::path::{Path, PathBuf};

/// Source label used for anonymous, non-file input.
pub const STDIN_SOURCE_NAME: &str = "(line)";

const HISTORY_CAPACITY: usize = 1000;

/// A callback handed to line-editor-backed sources to produce completion
/// candidates for the text before the cursor.
pub type CompletionFn = Box<dyn Fn(&str) -> Vec<String>>;

/// A pull-based line source. `gets` blocks for the next physical line and
/// echoes the prompt (and, for non-interactive sources, the line itself) to
/// the attached sink, so a transcript run from a string reproduces what an
/// interactive session would have shown.
pub trait InputMethod {
    /// Pull the next line, or `None` at end of input. Returned lines always
    /// carry a trailing newline.
    fn gets(&mut self, prompt: &str, echo: &mut OutputMethod) -> ConsoleResult<Option<String>>;

    fn at_eof(&mut self) -> bool;

    /// Whether the source can be read again after reporting end of input;
    /// true for resumable, interactive-style sources, false for files.
    fn readable_after_eof(&self) -> bool {
        false
    }

    /// Number of lines pulled so far.
    fn line_number(&self) -> usize;

    fn source_name(&self) -> &str {
        STDIN_SOURCE_NAME
    }

    /// Install (or replace) the completion callback. Only meaningful for
    /// line-editor-backed sources; the default is a no-op.
    fn set_completion(&mut self, _callback: Option<CompletionFn>) {}
}

/// Where console input should come from. Converted into an [`InputMethod`]
/// when a configuration layer is applied; the enum makes the construction
/// dispatch total at compile time.
pub enum InputSpec {
    /// The process's standard input: line-editor-backed when attached to a
    /// terminal, buffered-stream-backed otherwise.
    Stdin,
    /// A fixed string of input lines.
    Text(String),
    /// A file opened at construction time.
    File(PathBuf),
    /// Any buffered reader.
    Reader(Box<dyn BufRead>),
    /// An already-built source, passed through unchanged.
    Method(Box<dyn InputMethod>),
}

impl From<&str> for InputSpec {
    fn from(text: &str) -> Self {
        InputSpec::Text(text.to_string())
    }
}

impl From<String> for InputSpec {
    fn from(text: String) -> Self {
        InputSpec::Text(text)
    }
}

impl From<PathBuf> for InputSpec {
    fn from(path: PathBuf) -> Self {
        InputSpec::File(path)
    }
}

impl From<&Path> for InputSpec {
    fn from(path: &Path) -> Self {
        InputSpec::File(path.to_path_buf())
    }
}

impl From<Box<dyn BufRead>> for InputSpec {
    fn from(reader: Box<dyn BufRead>) -> Self {
        InputSpec::Reader(reader)
    }
}

impl From<Box<dyn InputMethod>> for InputSpec {
    fn from(method: Box<dyn InputMethod>) -> Self {
        InputSpec::Method(method)
    }
}

pub fn from_spec(spec: InputSpec) -> ConsoleResult<Box<dyn InputMethod>> {
    Ok(match spec {
        InputSpec::Method(method) => method,
        InputSpec::Text(text) => Box::new(IoInput::new(Box::new(Cursor::new(text)))),
        InputSpec::Reader(reader) => Box::new(IoInput::new(reader)),
        InputSpec::File(path) => Box::new(FileInput::open(&path)?),
        InputSpec::Stdin => {
            if io::stdin().is_terminal() {
                Box::new(EditorInput::new())
            } else {
                Box::new(IoInput::new(Box::new(BufReader::new(io::stdin()))))
            }
        }
    })
}

/// Buffered-stream-backed input: strings, pipes, arbitrary readers.
pub struct IoInput {
    reader: Box<dyn BufRead>,
    line_number: usize,
    eof: bool,
}

impl IoInput {
    pub fn new(reader: Box<dyn BufRead>) -> Self {
        Self {
            reader,
            line_number: 0,
            eof: false,
        }
    }
}

impl InputMethod for IoInput {
    fn gets(&mut self, prompt: &str, echo: &mut OutputMethod) -> ConsoleResult<Option<String>> {
        echo.print(prompt);
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            self.eof = true;
            return Ok(None);
        }
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.line_number += 1;
        echo.print(&line);
        Ok(Some(line))
    }

    fn at_eof(&mut self) -> bool {
        if self.eof {
            return true;
        }
        match self.reader.fill_buf() {
            Ok(buffer) => buffer.is_empty(),
            Err(_) => true,
        }
    }

    fn readable_after_eof(&self) -> bool {
        true
    }

    fn line_number(&self) -> usize {
        self.line_number
    }
}

/// File-backed input. The handle is held for the lifetime of the source and
/// released on drop; diagnostics are labelled with the file path.
pub struct FileInput {
    inner: IoInput,
    name: String,
}

impl FileInput {
    pub fn open(path: &Path) -> ConsoleResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self {
            inner: IoInput::new(Box::new(BufReader::new(file))),
            name: path.display().to_string(),
        })
    }
}

impl InputMethod for FileInput {
    fn gets(&mut self, prompt: &str, echo: &mut OutputMethod) -> ConsoleResult<Option<String>> {
        self.inner.gets(prompt, echo)
    }

    fn at_eof(&mut self) -> bool {
        self.inner.at_eof()
    }

    fn line_number(&self) -> usize {
        self.inner.line_number()
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Line-editor-backed input over a real terminal: history, editing, and tab
/// completion via a registered callback. The terminal renders the prompt and
/// the typed line itself, so nothing is echoed to the sink.
pub struct EditorInput {
    editor: Reedline,
    prompt: EnginePrompt,
    line_number: usize,
    eof: bool,
}

struct EnginePrompt {
    text: String,
}

impl Prompt for EnginePrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed(&self.text)
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: PromptHistorySearch,
    ) -> Cow<str> {
        Cow::Borrowed("(search) ")
    }
}

struct CallbackCompleter {
    callback: CompletionFn,
}

impl Completer for CallbackCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let pos = pos.min(line.len());
        (self.callback)(&line[..pos])
            .into_iter()
            .map(|value| Suggestion {
                value,
                description: None,
                style: None,
                extra: None,
                span: Span::new(0, pos),
                append_whitespace: false,
            })
            .collect()
    }
}

impl EditorInput {
    pub fn new() -> Self {
        Self::with_history(None)
    }

    /// History persists to `path` when given; a history file that cannot be
    /// opened falls back to in-memory history.
    pub fn with_history(path: Option<PathBuf>) -> Self {
        let mut editor = Reedline::create();
        if let Some(path) = path {
            if let Ok(history) = FileBackedHistory::with_file(HISTORY_CAPACITY, path) {
                editor = editor.with_history(Box::new(history));
            }
        }
        Self {
            editor,
            prompt: EnginePrompt {
                text: String::new(),
            },
            line_number: 0,
            eof: false,
        }
    }
}

impl Default for EditorInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputMethod for EditorInput {
    fn gets(&mut self, prompt: &str, _echo: &mut OutputMethod) -> ConsoleResult<Option<String>> {
        self.prompt.text.clear();
        self.prompt.text.push_str(prompt);
        match self.editor.read_line(&self.prompt) {
            Ok(Signal::Success(mut line)) => {
                self.line_number += 1;
                if !line.ends_with('\n') {
                    line.push('\n');
                }
                Ok(Some(line))
            }
            Ok(Signal::CtrlD) => {
                self.eof = true;
                Ok(None)
            }
            Ok(Signal::CtrlC) => Err(ConsoleError::Interrupted),
            Err(err) => Err(ConsoleError::Io(err)),
        }
    }

    fn at_eof(&mut self) -> bool {
        self.eof
    }

    fn readable_after_eof(&self) -> bool {
        true
    }

    fn line_number(&self) -> usize {
        self.line_number
    }

    fn set_completion(&mut self, callback: Option<CompletionFn>) {
        let Some(callback) = callback else { return };
        let completion_menu = Box::new(ColumnarMenu::default().with_name("completion_menu"));
        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu("completion_menu".to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );
        let editor = mem::replace(&mut self.editor, Reedline::create());
        self.editor = editor
            .with_completer(Box::new(CallbackCompleter { callback }))
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(Box::new(Emacs::new(keybindings)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputSpec;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    fn buffer_output() -> (Rc<RefCell<String>>, OutputMethod) {
        let buffer = Rc::new(RefCell::new(String::new()));
        let output = OutputMethod::from_spec(OutputSpec::Buffer(Rc::clone(&buffer)));
        (buffer, output)
    }

    #[test]
    fn test_string_input_echoes_prompt_and_line() {
        let (buffer, mut output) = buffer_output();
        let mut input = from_spec(InputSpec::from("hello")).unwrap();
        let line = input.gets("> ", &mut output).unwrap();
        assert_eq!(line.as_deref(), Some("hello\n"));
        assert_eq!(*buffer.borrow(), "> hello\n");
    }

    #[test]
    fn test_missing_trailing_newline_is_repaired() {
        let (_, mut output) = buffer_output();
        let mut input = IoInput::new(Box::new(Cursor::new("no newline".to_string())));
        assert_eq!(
            input.gets("", &mut output).unwrap().as_deref(),
            Some("no newline\n")
        );
    }

    #[test]
    fn test_line_numbers_count_pulled_lines() {
        let (_, mut output) = buffer_output();
        let mut input = from_spec(InputSpec::from("a\nb\nc\n")).unwrap();
        assert_eq!(input.line_number(), 0);
        input.gets("", &mut output).unwrap();
        input.gets("", &mut output).unwrap();
        assert_eq!(input.line_number(), 2);
    }

    #[test]
    fn test_eof_still_prints_prompt() {
        let (buffer, mut output) = buffer_output();
        let mut input = from_spec(InputSpec::from("")).unwrap();
        assert!(input.gets("> ", &mut output).unwrap().is_none());
        assert_eq!(*buffer.borrow(), "> ");
        assert!(input.at_eof());
        assert!(input.readable_after_eof());
    }

    #[test]
    fn test_file_input_reads_and_releases_handle() {
        let (buffer, mut output) = buffer_output();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "1 + 1").unwrap();
        drop(file);

        let mut input = FileInput::open(&path).unwrap();
        assert!(!input.readable_after_eof());
        assert_eq!(input.source_name(), path.display().to_string());
        assert_eq!(
            input.gets("> ", &mut output).unwrap().as_deref(),
            Some("1 + 1\n")
        );
        assert!(input.at_eof());
        assert_eq!(*buffer.borrow(), "> 1 + 1\n");

        drop(input);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_a_construction_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.txt");
        assert!(matches!(
            FileInput::open(&missing),
            Err(ConsoleError::Io(_))
        ));
    }
}
