//! Command runner that shows a spinner while a child process runs

use apkforge_cli::progress;
use apkforge_core::error::Result;
use apkforge_core::process::{CommandResult, CommandRunner, CommandSpec};

pub struct SpinnerRunner<R> {
    inner: R,
    enabled: bool,
}

impl<R: CommandRunner> SpinnerRunner<R> {
    pub fn new(inner: R, enabled: bool) -> Self {
        Self { inner, enabled }
    }
}

impl<R: CommandRunner> CommandRunner for SpinnerRunner<R> {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        if !self.enabled {
            return self.inner.run(spec);
        }

        let display = spec.display();
        let label = match &spec.cwd {
            Some(dir) => format!("{} ({})", display, dir.display()),
            None => display.clone(),
        };

        let pb = progress::spinner(&label);
        let result = self.inner.run(spec);
        match &result {
            Ok(output) if output.success => progress::finish_success(&pb, &display),
            Ok(output) => progress::finish_error(&pb, &format!("{} exited with {}", display, output.exit_code)),
            Err(e) => progress::finish_error(&pb, &e.message),
        }
        result
    }
}
