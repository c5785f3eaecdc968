//! Runs scripts with failure containment

use super::command::CommandInterpreter;
use super::{ScriptApi, ScriptInterpreter, ScriptValue};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Output reported by a successful script that printed nothing
pub const SUCCESS_MESSAGE: &str = "Script executed successfully";

/// What a script run produced
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub return_value: Option<ScriptValue>,
}

impl ScriptOutcome {
    fn succeeded(output: String, return_value: Option<ScriptValue>) -> Self {
        let output = if output.is_empty() {
            SUCCESS_MESSAGE.to_string()
        } else {
            output
        };
        ScriptOutcome {
            success: true,
            output,
            error: None,
            return_value,
        }
    }

    fn failed(output: String, error: String) -> Self {
        ScriptOutcome {
            success: false,
            output,
            error: Some(error),
            return_value: None,
        }
    }
}

impl fmt::Display for ScriptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.output.is_empty() {
            writeln!(f, "{}", self.output)?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "error: {}", error)?;
        }
        if let Some(value) = &self.return_value {
            writeln!(f, "=> {}", value)?;
        }
        Ok(())
    }
}

/// Host for one interpreter
pub struct ScriptHost {
    interpreter: Box<dyn ScriptInterpreter>,
}

impl Default for ScriptHost {
    fn default() -> Self {
        ScriptHost::new(CommandInterpreter::new())
    }
}

impl fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptHost")
            .field("interpreter", &self.interpreter.name())
            .finish()
    }
}

impl ScriptHost {
    pub fn new(interpreter: impl ScriptInterpreter + 'static) -> Self {
        ScriptHost {
            interpreter: Box::new(interpreter),
        }
    }

    pub fn interpreter_name(&self) -> &str {
        self.interpreter.name()
    }

    /// Runs `code` against `api`.
    ///
    /// The output buffer is cleared first. Interpreter errors and panics
    /// both become a failed outcome carrying whatever was printed before.
    pub fn run(&self, code: &str, api: &mut ScriptApi) -> ScriptOutcome {
        api.clear_output();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.interpreter.execute(code, api)));
        let output = api.take_output();

        match result {
            Ok(Ok(return_value)) => {
                debug!(interpreter = self.interpreter.name(), "script finished");
                ScriptOutcome::succeeded(output, return_value)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "script failed");
                ScriptOutcome::failed(output, e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(panic = %message, "script panicked");
                ScriptOutcome::failed(output, format!("panic: {}", message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
