pub mod accumulate;
pub mod commands;
pub mod complete;
pub mod config;
pub mod console;
pub mod error;
pub mod eval;
pub mod input;
pub mod kind;
pub mod namespace;
pub mod options;
pub mod output;

pub use accumulate::{Accumulator, Statement, StatementStatus};
pub use commands::{CommandEntry, CommandTable};
pub use complete::{Completion, LineProcessor};
pub use config::KilnConfig;
pub use console::{Console, Evaluator};
pub use error::{ConsoleError, ConsoleResult, EvalError};
pub use eval::{CalcCompleter, CalcEvaluator, Scope, Value};
pub use input::{EditorInput, FileInput, InputMethod, InputSpec, IoInput};
pub use kind::{Kind, KindDefaults};
pub use namespace::Namespace;
pub use options::{LazyValue, Options, Saved};
pub use output::{OutputMethod, OutputSpec};

/// Kiln version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix prepended to rendered statement results
pub const RESULT_PREFIX: &str = "  => ";
