use std::process::{Command, Output};

use anyhow::{anyhow, bail, Context, Error};
use log::trace;

use crate::crate_private::Sealed;

/// Extension for process results to check the exit status and turn failures
/// into errors carrying whatever the process printed.
pub trait OutputChecker: Sealed {
    fn is_success(&self) -> bool;

    fn exit_code(&self) -> Option<i32>;

    /// Stdout, lossily decoded.
    fn output(&self) -> String;

    /// Stderr, lossily decoded.
    fn error_output(&self) -> String;

    /// All captured output, for error reports and debugging.
    fn output_report(&self) -> String {
        let sections: Vec<String> = [("stdout", self.output()), ("stderr", self.error_output())]
            .into_iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(name, text)| format!("{name}:\n{text}\n"))
            .collect();
        sections.join("\n")
    }

    fn explain_exit(&self) -> String {
        match self.exit_code() {
            Some(code) => format!("process exited with status: {code}"),
            None => "process was terminated by a signal".into(),
        }
    }

    fn check(&self) -> Result<(), Error> {
        if self.is_success() {
            return Ok(());
        }

        Err(match self.output_report() {
            s if !s.is_empty() => anyhow!("Process output:\n{s}").context(self.explain_exit()),
            _ => anyhow!("(No output was captured)").context(self.explain_exit()),
        })
    }
}

impl Sealed for Output {}

impl OutputChecker for Output {
    fn is_success(&self) -> bool {
        self.status.success()
    }

    fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    fn output(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into()
    }

    fn error_output(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into()
    }
}

/// Runs a command, logging it at trace level, and fails unless it exits
/// successfully.
pub trait RunAndCheck: Sealed {
    fn run_and_check(&mut self) -> Result<(), Error>;
    fn output_and_check(&mut self) -> Result<String, Error>;
    fn render_command(&self) -> String;
}

impl Sealed for Command {}

impl RunAndCheck for Command {
    fn run_and_check(&mut self) -> Result<(), Error> {
        self.output_and_check().map(|_| ())
    }

    fn output_and_check(&mut self) -> Result<String, Error> {
        let rendered_command = self.render_command();
        trace!("Executing '{rendered_command}'");

        let output = match self.output() {
            Ok(output) => output,
            Err(e) => bail!("Failed to execute '{rendered_command}': {e}"),
        };
        trace!(
            "Executed '{rendered_command}': {}. Report:\n{}",
            output.explain_exit(),
            output.output_report(),
        );

        output
            .check()
            .with_context(|| format!("Error when running: {rendered_command}"))?;
        Ok(output.output())
    }

    fn render_command(&self) -> String {
        std::iter::once(self.get_program())
            .chain(self.get_args())
            .map(|arg| arg.to_string_lossy())
            .map(|arg| {
                if arg.contains(' ') {
                    format!("'{arg}'")
                } else {
                    arg.into()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_checker() {
        let output = Command::new("echo").arg("something").output().unwrap();
        assert!(output.is_success());
        assert_eq!(output.exit_code(), Some(0));
        assert_eq!(output.output(), "something\n");
        assert_eq!(output.output_report(), "stdout:\nsomething\n\n");
        output.check().unwrap();

        let output = Command::new("false").output().unwrap();
        assert!(!output.is_success());
        assert_eq!(output.explain_exit(), "process exited with status: 1");
        assert_eq!(
            output.check().unwrap_err().to_string(),
            "process exited with status: 1"
        );
    }

    #[test]
    fn test_run_and_check() {
        assert_eq!(
            Command::new("echo").arg("ok").output_and_check().unwrap(),
            "ok\n"
        );
        Command::new("nonexistent_command_1234")
            .run_and_check()
            .unwrap_err();
        Command::new("cat")
            .arg("/nonexistent_file_1234")
            .run_and_check()
            .unwrap_err();
    }

    #[test]
    fn test_render_command() {
        let mut cmd = Command::new("lsblk");
        assert_eq!(cmd.render_command(), "lsblk");

        cmd.arg("--json").arg("--output").arg("NAME,TYPE");
        assert_eq!(cmd.render_command(), "lsblk --json --output NAME,TYPE");

        let mut cmd = Command::new("echo");
        cmd.arg("something with spaces");
        assert_eq!(cmd.render_command(), "echo 'something with spaces'");
    }
}
