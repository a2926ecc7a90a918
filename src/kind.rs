use crate::commands::{CommandTable, HandlerFn};
use crate::console::{Console, Evaluator};
use crate::error::EvalError;
use std::cell::RefCell;
use std::rc::Rc;

/// Banner shown by kinds that never set their own.
pub const DEFAULT_BANNER: &str = ">> Interactive Console <<";

/// Option defaults carried at the kind level. A run's options are resolved
/// against these when a key is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDefaults {
    pub banner: bool,
    pub silent: bool,
    pub rescue_errors: bool,
    pub allow_fallback: bool,
}

impl Default for KindDefaults {
    fn default() -> Self {
        Self {
            banner: true,
            silent: false,
            rescue_errors: true,
            allow_fallback: true,
        }
    }
}

/// A console's "kind": the template identity shared by every instance built
/// from it. A kind carries a command table, banner and prompt strings, and
/// default options, and links to a parent kind; lookups walk the ancestor
/// chain so a derived kind sees everything its ancestors registered, with
/// its own entries shadowing inherited ones.
pub struct Kind<E: Evaluator> {
    name: String,
    parent: Option<Rc<Kind<E>>>,
    state: RefCell<KindState<E>>,
}

struct KindState<E: Evaluator> {
    banner: Option<String>,
    prompt: Option<String>,
    continuation_prompt: Option<String>,
    commands: CommandTable<E>,
    defaults: KindDefaults,
}

impl<E: Evaluator> Kind<E> {
    /// The root kind. Pre-registers the `exit` command, which asks the read
    /// loop to wind down instead of tearing the process down.
    pub fn base() -> Rc<Self> {
        let kind = Self::fresh("Console", None, KindDefaults::default());
        kind.command("exit", false, |console, _args| {
            console.request_exit();
            Ok(None)
        });
        kind
    }

    /// Derive a new kind from `parent`. It starts with no commands of its
    /// own and inherits the parent's effective defaults.
    pub fn derive(name: &str, parent: &Rc<Self>) -> Rc<Self> {
        Self::fresh(name, Some(Rc::clone(parent)), parent.defaults())
    }

    fn fresh(name: &str, parent: Option<Rc<Self>>, defaults: KindDefaults) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            parent,
            state: RefCell::new(KindState {
                banner: None,
                prompt: None,
                continuation_prompt: None,
                commands: CommandTable::new(),
                defaults,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a command on this kind. Instances of this kind and every
    /// kind derived from it will dispatch it.
    pub fn command<F>(&self, name: &str, case_sensitive: bool, handler: F)
    where
        F: Fn(&mut Console<E>, &[String]) -> Result<Option<E::Value>, EvalError> + 'static,
    {
        self.state
            .borrow_mut()
            .commands
            .register(name, case_sensitive, handler);
    }

    /// Resolve `line` against this kind's commands, then each ancestor's in
    /// turn. Own entries shadow inherited ones.
    pub fn resolve_command(&self, line: &str) -> Option<(Rc<HandlerFn<E>>, Vec<String>)> {
        let mut kind = Some(self);
        while let Some(current) = kind {
            if let Some(hit) = current.state.borrow().commands.resolve(line) {
                return Some(hit);
            }
            kind = current.parent.as_deref();
        }
        None
    }

    /// All command names visible from this kind, nearest registration first,
    /// without inherited duplicates.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut kind = Some(self);
        while let Some(current) = kind {
            for name in current.state.borrow().commands.names() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            kind = current.parent.as_deref();
        }
        names
    }

    pub fn banner(&self) -> String {
        self.inherited(|state| state.banner.clone())
            .unwrap_or_else(|| DEFAULT_BANNER.to_string())
    }

    pub fn set_banner(&self, banner: &str) {
        self.state.borrow_mut().banner = Some(banner.to_string());
    }

    /// The primary prompt; defaults to `"<kind name> > "`.
    pub fn prompt(&self) -> String {
        self.inherited(|state| state.prompt.clone())
            .unwrap_or_else(|| format!("{} > ", self.name))
    }

    pub fn set_prompt(&self, prompt: &str) {
        self.state.borrow_mut().prompt = Some(prompt.to_string());
    }

    /// The prompt used for continuation lines of a multi-line statement;
    /// defaults to the primary prompt.
    pub fn continuation_prompt(&self) -> String {
        self.inherited(|state| state.continuation_prompt.clone())
            .unwrap_or_else(|| self.prompt())
    }

    pub fn set_continuation_prompt(&self, prompt: &str) {
        self.state.borrow_mut().continuation_prompt = Some(prompt.to_string());
    }

    pub fn defaults(&self) -> KindDefaults {
        self.state.borrow().defaults
    }

    pub fn set_defaults(&self, defaults: KindDefaults) {
        self.state.borrow_mut().defaults = defaults;
    }

    fn inherited<T>(&self, pick: impl Fn(&KindState<E>) -> Option<T>) -> Option<T> {
        let mut kind = Some(self);
        while let Some(current) = kind {
            if let Some(value) = pick(&current.state.borrow()) {
                return Some(value);
            }
            kind = current.parent.as_deref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::CalcEvaluator;

    type CalcKind = Kind<CalcEvaluator>;

    #[test]
    fn test_base_kind_has_exit() {
        let base = CalcKind::base();
        assert!(base.resolve_command("exit").is_some());
        assert!(base.resolve_command("EXIT now").is_some());
    }

    #[test]
    fn test_derived_kind_sees_ancestor_commands() {
        let base = CalcKind::base();
        base.command("status", false, |_, _| Ok(None));
        let child = CalcKind::derive("Child", &base);
        let grandchild = CalcKind::derive("Grandchild", &child);
        assert!(grandchild.resolve_command("status").is_some());
        assert!(grandchild.resolve_command("exit").is_some());
    }

    #[test]
    fn test_derived_entries_shadow_inherited_ones() {
        let base = CalcKind::base();
        base.command("greet", false, |console, _| {
            console.puts("from base");
            Ok(None)
        });
        let child = CalcKind::derive("Child", &base);
        child.command("greet", true, |console, _| {
            console.puts("from child");
            Ok(None)
        });
        // The child registered case-sensitively, so only the exact word
        // resolves on the child's own table; other cases fall back to the
        // inherited entry.
        assert!(child.resolve_command("greet").is_some());
        assert!(child.resolve_command("GREET").is_some());
    }

    #[test]
    fn test_prompt_defaults_to_kind_name() {
        let base = CalcKind::base();
        assert_eq!(base.prompt(), "Console > ");
        let child = CalcKind::derive("Calc", &base);
        assert_eq!(child.prompt(), "Calc > ");
        child.set_prompt(">>> ");
        assert_eq!(child.prompt(), ">>> ");
    }

    #[test]
    fn test_banner_inherits_until_set() {
        let base = CalcKind::base();
        let child = CalcKind::derive("Calc", &base);
        assert_eq!(child.banner(), DEFAULT_BANNER);
        base.set_banner("hello from base");
        assert_eq!(child.banner(), "hello from base");
        child.set_banner("hello from child");
        assert_eq!(child.banner(), "hello from child");
        assert_eq!(base.banner(), "hello from base");
    }

    #[test]
    fn test_continuation_prompt_follows_primary() {
        let base = CalcKind::base();
        assert_eq!(base.continuation_prompt(), base.prompt());
        base.set_continuation_prompt(".. ");
        assert_eq!(base.continuation_prompt(), ".. ");
    }

    #[test]
    fn test_command_names_deduplicate_across_chain() {
        let base = CalcKind::base();
        base.command("greet", false, |_, _| Ok(None));
        let child = CalcKind::derive("Child", &base);
        child.command("greet", false, |_, _| Ok(None));
        child.command("extra", false, |_, _| Ok(None));
        let names = child.command_names();
        assert_eq!(
            names.iter().filter(|n| n.as_str() == "greet").count(),
            1
        );
        assert!(names.contains(&"exit".to_string()));
        assert!(names.contains(&"extra".to_string()));
    }
}
