//! Running a script from the command line.

use std::fs;
use std::path::{Path, PathBuf};
use tinylisp::cmdline::{self, Error};

fn write_script(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tinylisp-{}-{}.lisp", name, std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

fn launch_script(path: &Path, extra: &[&str]) -> Result<(), Error> {
    let mut args = vec!["tinylisp".to_string(), path.to_string_lossy().into_owned()];
    args.extend(extra.iter().map(|arg| arg.to_string()));
    let result = cmdline::launch(args);
    fs::remove_file(path).ok();
    result
}

#[test]
fn test_successful_script_returns_ok() {
    let path = write_script(
        "ok",
        "(def! expected \"go\")\n(if (= (first *ARGV*) expected) nil (throw \"bad argv\"))\n",
    );
    assert!(launch_script(&path, &["go"]).is_ok());
}

#[test]
fn test_failing_script_returns_an_error() {
    let path = write_script("throws", "(def! x 1)\n(throw \"boom\")\n");
    match launch_script(&path, &[]) {
        Err(Error::Script(e)) => assert!(e.to_string().contains("boom")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_missing_script_returns_an_error() {
    let path = std::env::temp_dir().join("tinylisp-no-such-script.lisp");
    assert!(matches!(launch_script(&path, &[]), Err(Error::Script(_))));
}
