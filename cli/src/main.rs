use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use clap::Parser as ClapParser;
use rustyline::DefaultEditor;

use lox_core::{Error, Scanner};
use lox_interpreter::interpreter::Interpreter;
use lox_interpreter::parser::Parser;
use lox_interpreter::resolver::Resolver;

/// Exit code for static (scan/parse/resolution) errors.
const EX_DATAERR: i32 = 65;
/// Exit code for runtime errors.
const EX_SOFTWARE: i32 = 70;

#[derive(ClapParser)]
#[command(name = "lox")]
#[command(about = "A tree-walking interpreter for the Lox language")]
struct Cli {
    /// Script file to run (omit for REPL)
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.script {
        Some(path) => run_file(&path),
        None => run_prompt(),
    }
}

fn run_file(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)?;
    let stdout = Rc::new(RefCell::new(io::stdout()));
    let mut interpreter = Interpreter::new(stdout);

    match run(&source, &mut interpreter) {
        Ok(_) => Ok(()),
        Err(errors) => {
            for err in &errors {
                eprint!("{}", err.render(&source));
            }

            let code = if errors.iter().any(Error::is_runtime) {
                EX_SOFTWARE
            } else {
                EX_DATAERR
            };
            std::process::exit(code);
        }
    }
}

/// Runs the full pipeline over one chunk of source. Each stage only runs if
/// the previous one produced no errors.
fn run(source: &str, interpreter: &mut Interpreter) -> Result<Option<String>, Vec<Error>> {
    let tokens = Scanner::new(source).scan_tokens()?;
    let parsed = Parser::new(&tokens).parse()?;
    let resolved = {
        let mut resolver = Resolver::new(interpreter);
        resolver.resolve(parsed)?
    };
    interpreter.interpret(&resolved).map_err(|err| vec![err])
}

fn run_prompt() -> Result<()> {
    let stdout = Rc::new(RefCell::new(io::stdout()));
    let mut interpreter = Interpreter::new(stdout);

    let mut rl = DefaultEditor::new()?;
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "| " };

        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');

                if !is_complete(&buffer) {
                    continue;
                }

                if !buffer.trim().is_empty() {
                    let _ = rl.add_history_entry(buffer.trim());
                    match run(&buffer, &mut interpreter) {
                        // echo the value of an expression statement
                        Ok(Some(value)) => println!("{}", value),
                        Ok(None) => {}
                        Err(errors) => {
                            for err in &errors {
                                eprint!("{}", err.render(&buffer));
                            }
                        }
                    }
                }
                buffer.clear();
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                buffer.clear();
                println!("^C");
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// A line is held back while brackets are unbalanced or a string is open,
/// so multi-line definitions can be typed at the prompt.
fn is_complete(code: &str) -> bool {
    let mut depth: i32 = 0;
    let mut string_delim: Option<char> = None;
    let mut escaped = false;
    let mut iter = code.chars().peekable();

    while let Some(c) = iter.next() {
        if let Some(delim) = string_delim {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == delim {
                string_delim = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => string_delim = Some(c),
            '/' => {
                if iter.peek() == Some(&'/') {
                    while let Some(&next) = iter.peek() {
                        if next == '\n' {
                            break;
                        }
                        iter.next();
                    }
                }
            }
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && string_delim.is_none()
}

#[cfg(test)]
mod tests {
    use crate::is_complete;

    #[test]
    fn test_is_complete() {
        assert!(is_complete("print 1;"));
        assert!(!is_complete("fun f() {\n"));
        assert!(is_complete("fun f() {\nprint 1;\n}"));
        assert!(!is_complete("var s = \"open"));
        assert!(is_complete("var s = \"closed\";"));
        assert!(!is_complete("var l = [1,\n"));
        // a comment does not open anything
        assert!(is_complete("print 1; // { [ (\n"));
    }
}
