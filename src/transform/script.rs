//! Script down-levelling and minification.

use crate::build::TaskError;
use std::io::Write;
use std::process::{Command, Stdio};

/// Pipe `source` through an external transpiler (argv, stdin to stdout).
pub fn transpile(source: &str, command: &[String]) -> Result<String, TaskError> {
    let Some((program, args)) = command.split_first() else {
        return Ok(source.to_string());
    };
    let failure = |message: String| TaskError::Transpile { command: program.clone(), message };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| failure(format!("could not start: {}", e)))?;

    let output = std::thread::scope(|s| {
        let stdin = child.stdin.take();
        let writer = s.spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(source.as_bytes()),
            None => Ok(()),
        });
        let output = child.wait_with_output();
        (writer.join(), output)
    });

    let output = match output {
        (_, Err(e)) => return Err(failure(e.to_string())),
        (Err(_), _) => return Err(failure("stdin writer panicked".to_string())),
        (Ok(Err(e)), Ok(output)) if output.status.success() => {
            return Err(failure(format!("could not write input: {}", e)))
        }
        (Ok(_), Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failure(format!("{}: {}", output.status, stderr.trim())));
    }
    String::from_utf8(output.stdout).map_err(|e| failure(format!("output is not UTF-8: {}", e)))
}

/// Minify a script.
pub fn minify(source: &str) -> String {
    minifier::js::minify(source).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_command_is_identity() {
        assert_eq!(transpile("let a = 1;", &[]).unwrap(), "let a = 1;");
    }

    #[cfg(unix)]
    #[test]
    fn test_transpile_pipes_through_command() {
        let out = transpile("const a = 1;\n", &argv(&["tr", "c", "C"])).unwrap();
        assert_eq!(out, "Const a = 1;\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_transpile_failure_reports_stderr() {
        let err = transpile("x", &argv(&["sh", "-c", "cat >/dev/null; echo bad syntax >&2; exit 3"]))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("sh"));
        assert!(message.contains("bad syntax"));
    }

    #[test]
    fn test_transpile_missing_program() {
        let err = transpile("x", &argv(&["assetflow-no-such-transpiler"])).unwrap_err();
        assert!(matches!(err, TaskError::Transpile { .. }));
    }

    #[test]
    fn test_minify_shrinks_source() {
        let source = "function add(first, second) {\n    // sum\n    return first + second;\n}\n";
        let out = minify(source);
        assert!(out.len() < source.len());
        assert!(!out.contains("// sum"));
        assert!(out.contains("return"));
    }
}
