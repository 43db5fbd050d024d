use crate::environment::Environment;
use crate::interpreter;
use crate::types::Expression;
use ansi_term::Colour::Red;
use linefeed::{DefaultTerminal, Interface, ReadResult, Terminal};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Setup(interpreter::Error),
    /// The script given on the command line failed.
    Script(interpreter::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "terminal error: {}", e),
            Error::Setup(e) => write!(f, "failed to set up the environment: {}", e),
            Error::Script(e) => write!(f, "{}", format_error(e)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<interpreter::Error> for Error {
    fn from(e: interpreter::Error) -> Self {
        Self::Setup(e)
    }
}

pub fn setup() -> std::io::Result<Interface<DefaultTerminal>> {
    let interface = linefeed::Interface::new("tinylisp")?;
    interface.set_prompt("user> ")?;
    if let Some(path) = history_path() {
        interface.load_history(path).ok();
    };
    Ok(interface)
}

fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|mut path| {
        path.push(".tinylisp_history");
        path
    })
}

pub fn save_history<T: Terminal>(interface: &Interface<T>) -> std::io::Result<()> {
    match history_path() {
        Some(path) => interface.save_history(path),
        None => Ok(()),
    }
}

fn format_error(e: &interpreter::Error) -> String {
    let message = format!("Error: {}", e);
    if atty::is(atty::Stream::Stdout) {
        Red.paint(message).to_string()
    } else {
        message
    }
}

pub fn repl<T: Terminal>(interface: &Interface<T>, env: &Rc<Environment>) {
    loop {
        match interface.read_line() {
            Ok(ReadResult::Eof) => break,
            Ok(ReadResult::Signal(sig)) => {
                writeln!(interface, "Received signal {:?}", sig).ok();
            }
            Ok(ReadResult::Input(line)) => {
                interface.add_history_unique(line.clone());
                match interpreter::rep(&line, env) {
                    Ok(output) => writeln!(interface, "{}", output).ok(),
                    Err(e) if e.is_empty_input() => None,
                    Err(e) => writeln!(interface, "{}", format_error(&e)).ok(),
                };
            }
            Err(e) => {
                writeln!(interface, "Error: {}", e).ok();
                break;
            }
        }
    }
}

/// Runs the script named by `args[1]` if there is one, otherwise an interactive prompt.
/// Arguments after the script path are bound to `*ARGV*`.
pub fn launch(args: Vec<String>) -> Result<(), Error> {
    let argv = args.get(2..).unwrap_or(&[]);
    let env = interpreter::repl_env(argv)?;

    match args.get(1) {
        Some(script) => {
            let line = format!("(load-file {})", Expression::String(script.clone()));
            interpreter::rep(&line, &env).map_err(Error::Script)?;
            Ok(())
        }
        None => {
            let interface = setup()?;
            interpreter::rep(r#"(println (str "tinylisp [" *host-language* "]"))"#, &env)?;
            repl(&interface, &env);
            save_history(&interface)?;
            Ok(())
        }
    }
}
