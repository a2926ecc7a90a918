use crate::accumulate::{Accumulator, StatementStatus};
use crate::complete::LineProcessor;
use crate::error::{ConsoleError, ConsoleResult, EvalError};
use crate::input::{self, CompletionFn, InputMethod, InputSpec};
use crate::kind::Kind;
use crate::namespace::Namespace;
use crate::options::Options;
use crate::output::{OutputMethod, OutputSpec};
use log::debug;
use std::rc::Rc;

/// The injected capability that actually understands statements. The engine
/// never parses input itself; it only asks the evaluator's lexing side
/// whether a buffered unit is finished, and hands finished units back for
/// execution against the current context.
pub trait Evaluator: 'static {
    /// What evaluated statements produce. Rendered with its `Debug`
    /// (diagnostic) representation.
    type Value: std::fmt::Debug + 'static;
    /// What statements run against.
    type Context: 'static;

    /// A fresh context for consoles that were not handed one.
    fn default_context(&self) -> Self::Context;

    /// Report whether `source` is a complete statement, needs more lines,
    /// or can never become valid.
    fn classify(&self, source: &str) -> StatementStatus;

    /// Execute one complete statement. `source_name` and `first_line`
    /// identify where the statement came from, for diagnostics.
    fn evaluate(
        &mut self,
        statement: &str,
        context: &mut Self::Context,
        source_name: &str,
        first_line: usize,
    ) -> Result<Self::Value, EvalError>;
}

/// The read–dispatch–print engine. Pulls lines from the input source, tries
/// the kind's command table first, falls back to accumulating and evaluating
/// a statement, renders the outcome, and loops until end of input or an
/// `exit` request.
pub struct Console<E: Evaluator> {
    pub(crate) kind: Rc<Kind<E>>,
    pub(crate) evaluator: E,
    pub(crate) input: Box<dyn InputMethod>,
    pub(crate) output: OutputMethod,
    pub(crate) namespace: Namespace<E::Context>,
    pub(crate) processor: Option<Rc<dyn LineProcessor<E::Context>>>,
    pub(crate) rescue_errors: bool,
    pub(crate) allow_fallback: bool,
    pub(crate) exit_requested: bool,
}

impl<E: Evaluator> Console<E> {
    /// Build a console of the given kind. `options` are applied over the
    /// kind-level defaults and stay in effect for the console's lifetime;
    /// per-run overrides go through [`Console::run`]. Construction never
    /// starts the read loop.
    pub fn new(kind: Rc<Kind<E>>, evaluator: E, options: Options<E>) -> ConsoleResult<Self> {
        let defaults = kind.defaults();
        let namespace = Namespace::new(evaluator.default_context());
        let mut output = OutputMethod::from_spec(OutputSpec::Stdout);
        output.set_silenced(defaults.silent);
        let mut console = Self {
            kind,
            evaluator,
            namespace,
            input: input::from_spec(InputSpec::Stdin)?,
            output,
            processor: None,
            rescue_errors: defaults.rescue_errors,
            allow_fallback: defaults.allow_fallback,
            exit_requested: false,
        };
        console.apply(options)?;
        Ok(console)
    }

    /// Build a console and immediately run it with its construction
    /// options.
    pub fn launch(kind: Rc<Kind<E>>, evaluator: E, options: Options<E>) -> ConsoleResult<Self> {
        let banner = options.banner;
        let mut console = Self::new(kind, evaluator, options)?;
        let mut layer = Options::new();
        layer.banner = banner;
        console.run(layer)?;
        Ok(console)
    }

    /// Run the read loop with `layer` applied for the duration of the run.
    /// Returns the last value a statement or command produced, if any. The
    /// prior configuration is restored on every exit path, so a command
    /// handler is free to call back into `run` with different options.
    pub fn run(&mut self, layer: Options<E>) -> ConsoleResult<Option<E::Value>> {
        let show_banner = layer.banner.unwrap_or_else(|| self.kind.defaults().banner);
        debug!("starting {} run", self.kind.name());
        self.run_with(layer, |console| {
            if show_banner {
                let banner = console.kind.banner();
                console.puts(&banner);
            }
            console.input_loop()
        })
    }

    fn input_loop(&mut self) -> ConsoleResult<Option<E::Value>> {
        self.exit_requested = false;
        let mut last = None;
        loop {
            if self.exit_requested {
                debug!("exit requested, winding down");
                break;
            }
            if !self.input.readable_after_eof() && self.input.at_eof() {
                break;
            }
            let prompt = self.kind.prompt();
            let line = {
                let Self { input, output, .. } = self;
                input.gets(&prompt, output)?
            };
            let Some(line) = line else { break };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            match self.handle_line(&line) {
                Ok(Some(value)) => last = Some(value),
                Ok(None) => {}
                Err(error) if self.rescue_errors && error.is_rescuable() => {
                    self.report_error(&error);
                }
                Err(error) => return Err(error),
            }
        }
        self.exit_requested = false;
        Ok(last)
    }

    /// Dispatch one stripped, non-empty line: command table first, then,
    /// when fallback is allowed, statement accumulation and evaluation.
    fn handle_line(&mut self, line: &str) -> ConsoleResult<Option<E::Value>> {
        if let Some((handler, args)) = self.kind.resolve_command(line) {
            let value = handler(self, &args).map_err(ConsoleError::Handler)?;
            if let Some(value) = &value {
                self.render_value(value);
            }
            return Ok(value);
        }
        if !self.allow_fallback {
            let word = line.split_whitespace().next().unwrap_or(line);
            let message = format!("I don't know the word \"{word}.\"");
            self.puts(&message);
            return Ok(None);
        }
        self.evaluate_statement(line)
    }

    fn evaluate_statement(&mut self, first_line: &str) -> ConsoleResult<Option<E::Value>> {
        let line_number = self.input.line_number().max(1);
        let continuation = self.kind.continuation_prompt();
        let statement = {
            let Self {
                input,
                output,
                evaluator,
                ..
            } = self;
            Accumulator::new(first_line, line_number).accumulate(
                |text| evaluator.classify(text),
                || input.gets(&continuation, output),
            )?
        };
        let source_name = self.input.source_name().to_string();
        let Self {
            evaluator,
            namespace,
            ..
        } = self;
        let value = namespace
            .with(|context| {
                evaluator.evaluate(
                    statement.text(),
                    context,
                    &source_name,
                    statement.first_line(),
                )
            })
            .map_err(ConsoleError::Eval)?;
        self.render_value(&value);
        Ok(Some(value))
    }

    fn render_value(&mut self, value: &E::Value) {
        let rendered = format!("  => {value:?}");
        self.puts(&rendered);
    }

    fn report_error(&mut self, error: &ConsoleError) {
        debug!("rescued: {error}");
        match error {
            ConsoleError::Eval(err) | ConsoleError::Handler(err) => {
                let heading = err.to_string();
                self.puts(&heading);
                for frame in &err.trace {
                    self.puts(&format!("\t{frame}"));
                }
            }
            other => {
                let text = other.to_string();
                self.puts(&text);
            }
        }
    }

    /// Produce completion candidates for a partial line against the current
    /// context. Without a configured processor this is always empty;
    /// otherwise the processor's answer is normalized to an ordered list.
    pub fn complete(&self, line: &str) -> Vec<String> {
        let Some(processor) = &self.processor else {
            return Vec::new();
        };
        self.namespace
            .with_ref(|context| processor.complete(line, context))
            .into_candidates()
    }

    /// Bridge the configured processor to the input source's completion
    /// callback. Only editor-backed sources care.
    pub(crate) fn install_completer(&mut self) {
        let Some(processor) = self.processor.clone() else {
            return;
        };
        let namespace = self.namespace.clone();
        let callback: CompletionFn = Box::new(move |line| {
            namespace
                .with_ref(|context| processor.complete(line, context))
                .into_candidates()
        });
        self.input.set_completion(Some(callback));
    }

    /// Ask the read loop to stop at the top of its next iteration. Used by
    /// the `exit` command; long-running handlers are not preempted.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn print(&mut self, text: &str) {
        self.output.print(text);
    }

    pub fn puts(&mut self, text: &str) {
        self.output.puts(text);
    }

    pub fn kind(&self) -> &Rc<Kind<E>> {
        &self.kind
    }

    pub fn namespace(&self) -> &Namespace<E::Context> {
        &self.namespace
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    pub fn silenced(&self) -> bool {
        self.output.silenced()
    }

    pub fn rescues_errors(&self) -> bool {
        self.rescue_errors
    }

    pub fn allows_fallback(&self) -> bool {
        self.allow_fallback
    }
}
