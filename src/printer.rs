use crate::tokens::ESCAPES;
use crate::types::{Atom, Expression, HashKey};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrintMode {
    /// Strings are quoted and re-escaped so the output reads back in.
    ReadableRepresentation,
    /// Strings are written raw.
    Directly,
}

/// A string written as a quoted literal that reads back as the same string.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            match ESCAPES.get_by_right(&c) {
                Some(letter) => write!(f, "\\{}", letter)?,
                None => write!(f, "{}", c)?,
            }
        }
        f.write_str("\"")
    }
}

fn print_string(s: &str, mode: PrintMode) -> String {
    match mode {
        PrintMode::ReadableRepresentation => Escaped(s).to_string(),
        PrintMode::Directly => s.to_string(),
    }
}

fn print_key(key: &HashKey, mode: PrintMode) -> String {
    match key {
        HashKey::String(s) => print_string(s, mode),
        HashKey::Keyword(s) => format!(":{}", s),
    }
}

struct Printer {
    mode: PrintMode,
    // Atoms whose contents are being printed further up the stack.
    open_atoms: Vec<Atom>,
}

impl Printer {
    fn print(&mut self, object: &Expression) -> String {
        match object {
            Expression::Nil => String::from("nil"),
            Expression::Bool(b) => b.to_string(),
            Expression::Integer(value) => value.to_string(),
            Expression::String(s) => print_string(s, self.mode),
            Expression::Keyword(s) => format!(":{}", s),
            Expression::Symbol(name) => name.to_string(),
            Expression::List(elements) => format!("({})", self.print_all(elements)),
            Expression::Vector(elements) => format!("[{}]", self.print_all(elements)),
            Expression::Map(map) => {
                let mode = self.mode;
                let entries = map
                    .iter()
                    .map(|(k, v)| format!("{} {}", print_key(k, mode), self.print(v)))
                    .join(" ");
                format!("{{{}}}", entries)
            }
            Expression::Atom(atom) => self.print_atom(atom),
            Expression::Closure(c) if c.is_macro => String::from("#<macro>"),
            Expression::Closure(_) => String::from("#<function>"),
            Expression::Native(n) => format!("#<native {}>", n.name),
        }
    }

    fn print_all(&mut self, elements: &[Expression]) -> String {
        elements.iter().map(|obj| self.print(obj)).join(" ")
    }

    fn print_atom(&mut self, atom: &Atom) -> String {
        if self.open_atoms.iter().any(|open| open.ptr_eq(atom)) {
            return String::from("(atom ...)");
        }
        self.open_atoms.push(atom.clone());
        let inner = self.print(&*atom.borrow_payload());
        self.open_atoms.pop();
        format!("(atom {})", inner)
    }
}

/// An atom that (indirectly) holds itself prints as `(atom ...)` where it recurs.
pub fn pr_str(object: &Expression, mode: PrintMode) -> String {
    let mut printer = Printer {
        mode,
        open_atoms: Vec::new(),
    };
    printer.print(object)
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", pr_str(self, PrintMode::ReadableRepresentation))
    }
}
