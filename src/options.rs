use crate::complete::LineProcessor;
use crate::console::{Console, Evaluator};
use crate::error::ConsoleResult;
use crate::input::{self, InputMethod, InputSpec};
use crate::output::{OutputMethod, OutputSpec};
use std::mem;
use std::rc::Rc;

/// A value that is either ready or produced on demand. Deferred producers
/// run exactly once, at the moment a layer carrying them is applied, never
/// at registration time.
pub enum LazyValue<T> {
    Immediate(T),
    Lazy(Box<dyn FnOnce() -> T>),
}

impl<T> LazyValue<T> {
    pub fn resolve(self) -> T {
        match self {
            LazyValue::Immediate(value) => value,
            LazyValue::Lazy(producer) => producer(),
        }
    }
}

impl<T> From<T> for LazyValue<T> {
    fn from(value: T) -> Self {
        LazyValue::Immediate(value)
    }
}

/// A partial configuration layer. Only present keys take effect when the
/// layer is applied; absent keys leave the previously effective value
/// untouched.
pub struct Options<E: Evaluator> {
    pub input: Option<InputSpec>,
    pub output: Option<OutputSpec>,
    pub silent: Option<bool>,
    pub banner: Option<bool>,
    pub namespace: Option<LazyValue<E::Context>>,
    pub processor: Option<Rc<dyn LineProcessor<E::Context>>>,
    pub rescue_errors: Option<bool>,
    pub allow_fallback: Option<bool>,
}

impl<E: Evaluator> Default for Options<E> {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            silent: None,
            banner: None,
            namespace: None,
            processor: None,
            rescue_errors: None,
            allow_fallback: None,
        }
    }
}

impl<E: Evaluator> Options<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: impl Into<InputSpec>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn output(mut self, output: impl Into<OutputSpec>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = Some(silent);
        self
    }

    /// Whether a banner is printed for the run this layer configures. An
    /// absent key falls back to the kind-level default; an explicit `false`
    /// suppresses it.
    pub fn banner(mut self, banner: bool) -> Self {
        self.banner = Some(banner);
        self
    }

    pub fn namespace(mut self, context: E::Context) -> Self {
        self.namespace = Some(LazyValue::Immediate(context));
        self
    }

    /// Defer construction of the execution context until the layer is
    /// applied.
    pub fn lazy_namespace<F>(mut self, producer: F) -> Self
    where
        F: FnOnce() -> E::Context + 'static,
    {
        self.namespace = Some(LazyValue::Lazy(Box::new(producer)));
        self
    }

    pub fn processor<P>(mut self, processor: P) -> Self
    where
        P: LineProcessor<E::Context> + 'static,
    {
        self.processor = Some(Rc::new(processor));
        self
    }

    pub fn rescue_errors(mut self, rescue: bool) -> Self {
        self.rescue_errors = Some(rescue);
        self
    }

    /// Whether input that matches no command may fall through to statement
    /// evaluation, or is rejected with an "unknown word" message.
    pub fn allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = Some(allow);
        self
    }
}

/// The displaced state of exactly the keys an applied layer touched. Input
/// and output capabilities move here rather than being copied; putting them
/// back is what makes nested runs hand borrowed streams back on every exit
/// path.
pub struct Saved<E: Evaluator> {
    input: Option<Box<dyn InputMethod>>,
    output: Option<OutputMethod>,
    silent: Option<bool>,
    namespace: Option<E::Context>,
    processor: Option<Option<Rc<dyn LineProcessor<E::Context>>>>,
    rescue_errors: Option<bool>,
    allow_fallback: Option<bool>,
}

impl<E: Evaluator> Default for Saved<E> {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            silent: None,
            namespace: None,
            processor: None,
            rescue_errors: None,
            allow_fallback: None,
        }
    }
}

impl<E: Evaluator> Console<E> {
    /// Merge `layer`'s present keys over the live configuration, resolving
    /// deferred values once and rebuilding the dependent input/output
    /// capabilities. Returns the displaced state for [`Console::restore`].
    pub fn apply(&mut self, layer: Options<E>) -> ConsoleResult<Saved<E>> {
        let mut saved = Saved::default();
        let Options {
            input,
            output,
            silent,
            banner: _,
            namespace,
            processor,
            rescue_errors,
            allow_fallback,
        } = layer;

        if let Some(spec) = input {
            let method = input::from_spec(spec)?;
            saved.input = Some(mem::replace(&mut self.input, method));
        }
        if let Some(spec) = output {
            let was_silenced = self.output.silenced();
            let mut method = OutputMethod::from_spec(spec);
            method.set_silenced(was_silenced);
            saved.output = Some(mem::replace(&mut self.output, method));
        }
        if let Some(silent) = silent {
            saved.silent = Some(self.output.silenced());
            self.output.set_silenced(silent);
        }
        if let Some(lazy) = namespace {
            let context = lazy.resolve();
            saved.namespace = Some(self.namespace.replace(context));
        }
        if let Some(processor) = processor {
            saved.processor = Some(self.processor.replace(processor));
        }
        if let Some(rescue) = rescue_errors {
            saved.rescue_errors = Some(mem::replace(&mut self.rescue_errors, rescue));
        }
        if let Some(allow) = allow_fallback {
            saved.allow_fallback = Some(mem::replace(&mut self.allow_fallback, allow));
        }

        self.install_completer();
        Ok(saved)
    }

    /// Put back everything [`Console::apply`] displaced.
    pub fn restore(&mut self, saved: Saved<E>) {
        let Saved {
            input,
            output,
            silent,
            namespace,
            processor,
            rescue_errors,
            allow_fallback,
        } = saved;

        if let Some(method) = input {
            self.input = method;
        }
        if let Some(method) = output {
            self.output = method;
        }
        if let Some(silent) = silent {
            self.output.set_silenced(silent);
        }
        if let Some(context) = namespace {
            self.namespace.replace(context);
        }
        if let Some(processor) = processor {
            self.processor = processor;
        }
        if let Some(rescue) = rescue_errors {
            self.rescue_errors = rescue;
        }
        if let Some(allow) = allow_fallback {
            self.allow_fallback = allow;
        }

        self.install_completer();
    }

    /// Apply `layer` for the duration of `body` and restore the prior state
    /// afterwards, whether `body` returns normally or with an error. Nested
    /// calls unwind strictly last-in, first-out.
    pub fn run_with<R>(
        &mut self,
        layer: Options<E>,
        body: impl FnOnce(&mut Self) -> ConsoleResult<R>,
    ) -> ConsoleResult<R> {
        let saved = self.apply(layer)?;
        let result = body(self);
        self.restore(saved);
        result
    }
}
