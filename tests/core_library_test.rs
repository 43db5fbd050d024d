//! The natives installed by `core::install`.

#[macro_use]
mod common;

use common::*;

#[test]
fn test_arithmetic() {
    assert_rep!("(+ 1 2)", "3");
    assert_rep!("(- 10 4)", "6");
    assert_rep!("(- 5)", "-5");
    assert_rep!("(* 6 7)", "42");
    assert_rep!("(/ 7 2)", "3");
    assert_rep!("(/ -7 2)", "-3");
    assert_rep!("(% 7 3)", "1");
}

#[test]
fn test_integer_overflow_wraps() {
    assert_rep!("(+ 9223372036854775807 1)", "-9223372036854775808");
    assert_rep!("(- -9223372036854775808 1)", "9223372036854775807");
}

#[test]
fn test_division_by_zero() {
    assert_eval_err!("(/ 1 0)", EvalError::DivisionByZero);
    assert_eval_err!("(% 1 0)", EvalError::DivisionByZero);
}

#[test]
fn test_comparisons() {
    assert_rep!("(< 1 2)", "true");
    assert_rep!("(<= 2 2)", "true");
    assert_rep!("(> 1 2)", "false");
    assert_rep!("(>= 1 2)", "false");
}

#[test]
fn test_equality() {
    assert_rep!("(= [1 2] (list 1 2))", "true");
    assert_rep!("(= [1 [2]] '(1 (2)))", "true");
    assert_rep!("(= {:a 1 \"b\" [2]} {\"b\" '(2) :a 1})", "true");
    assert_rep!("(= {:a 1} {:a 2})", "false");
    assert_rep!("(= :a \"a\")", "false");
    assert_rep!("(= nil false)", "false");
    assert_rep!("(= (atom 1) (atom 1))", "false");
    assert_rep!("(let* (a (atom 1)) (= a a))", "true");
}

#[test]
fn test_printing_to_strings() {
    assert_rep!("(str \"a\" 1 :k nil)", "\"a1:knil\"");
    assert_rep!("(str)", "\"\"");
    assert_rep!("(pr-str \"a\" 1)", r#""\"a\" 1""#);
    assert_rep!("(pr-str \"line\\n\")", r#""\"line\\n\"""#);
}

#[test]
fn test_read_string() {
    assert_rep!("(read-string \"(+ 1 2)\")", "(+ 1 2)");
    assert_rep!("(read-string \"  ; nothing\")", "nil");
    assert_eval_err!("(read-string \"(1\")", EvalError::Read(_));
}

#[test]
fn test_list_functions() {
    assert_rep!("(list)", "()");
    assert_rep!("(cons 1 [2 3])", "(1 2 3)");
    assert_rep!("(concat [1] '(2) [])", "(1 2)");
    assert_rep!("(concat)", "()");
    assert_rep!("(vec '(1 2))", "[1 2]");
    assert_rep!("(nth [1 2 3] 1)", "2");
    assert_rep!("(first [])", "nil");
    assert_rep!("(first nil)", "nil");
    assert_rep!("(rest [1 2 3])", "(2 3)");
    assert_rep!("(rest nil)", "()");
    assert_rep!("(count [1 2])", "2");
    assert_rep!("(count nil)", "0");
    assert_rep!("(empty? ())", "true");
    assert_rep!("(empty? [1])", "false");
}

#[test]
fn test_nth_out_of_range() {
    assert_eval_err!("(nth [1 2] 5)", EvalError::IndexOutOfRange { .. });
    assert_eval_err!("(nth [1 2] -1)", EvalError::IndexOutOfRange { .. });
}

#[test]
fn test_higher_order_functions() {
    assert_rep!("(apply + 1 [2])", "3");
    assert_rep!("(apply list 1 2 [3 4])", "(1 2 3 4)");
    assert_rep!("(map (fn* (x) (* x x)) [1 2 3])", "(1 4 9)");
    assert_rep!("(map first [[1] [2]])", "(1 2)");
}

#[test]
fn test_seq_and_conj() {
    assert_rep!("(seq \"ab\")", "(\"a\" \"b\")");
    assert_rep!("(seq [])", "nil");
    assert_rep!("(seq [1 2])", "(1 2)");
    assert_rep!("(seq nil)", "nil");
    assert_rep!("(conj '(1) 2 3)", "(3 2 1)");
    assert_rep!("(conj [1] 2 3)", "[1 2 3]");
}

#[test]
fn test_hash_maps() {
    assert_rep!("(get (assoc {} :a 1) :a)", "1");
    assert_rep!("(get {:a 1} :b)", "nil");
    assert_rep!("(get nil :a)", "nil");
    assert_rep!("(contains? {\"k\" 1} \"k\")", "true");
    assert_rep!("(dissoc {:a 1 :b 2} :a)", "{:b 2}");
    assert_rep!("(keys {:a 1})", "(:a)");
    assert_rep!("(vals {:a 1})", "(1)");
    assert_rep!("(map? (hash-map :a 1))", "true");
}

#[test]
fn test_hash_map_construction_errors() {
    assert_eval_err!("(hash-map :a)", EvalError::WrongArity(_));
    assert_eval_err!("(assoc {} :a)", EvalError::WrongArity(_));
    assert_eval_err!("(hash-map 1 2)", EvalError::KeyTypeError(_));
}

#[test]
fn test_atoms() {
    let env = new_env();
    let result = rep_all(
        &env,
        &["(def! a (atom 1))", "(def! b a)", "(swap! a + 10)", "@b"],
    );
    assert_eq!(result.unwrap(), "11");
    assert_eq!(rep_all(&env, &["(reset! b 5)", "(deref a)"]).unwrap(), "5");
    assert_eq!(rep_all(&env, &["a"]).unwrap(), "(atom 5)");
    assert_eq!(
        rep_all(&env, &["(swap! a (fn* (x y z) (list x y z)) 6 7)"]).unwrap(),
        "(5 6 7)"
    );
}

#[test]
fn test_atom_holding_itself_prints() {
    let env = new_env();
    let result = rep_all(&env, &["(def! a (atom nil))", "(reset! a a)"]);
    assert_eq!(result.unwrap(), "(atom (atom ...))");
    assert_eq!(rep_all(&env, &["(str a)"]).unwrap(), "\"(atom (atom ...))\"");
    assert_eq!(rep_all(&env, &["(= @a a)"]).unwrap(), "true");
}

#[test]
fn test_type_predicates() {
    assert_rep!("(nil? nil)", "true");
    assert_rep!("(true? true)", "true");
    assert_rep!("(false? nil)", "false");
    assert_rep!("(symbol? 'a)", "true");
    assert_rep!("(keyword? :a)", "true");
    assert_rep!("(string? :a)", "false");
    assert_rep!("(number? (time-ms))", "true");
    assert_rep!("(list? [1])", "false");
    assert_rep!("(vector? [1])", "true");
    assert_rep!("(sequential? '(1))", "true");
    assert_rep!("(atom? (atom nil))", "true");
    assert_rep!("(fn? +)", "true");
    assert_rep!("(fn? cond)", "false");
    assert_rep!("(macro? cond)", "true");
}

#[test]
fn test_symbols_and_keywords() {
    assert_rep!("(symbol \"abc\")", "abc");
    assert_rep!("(keyword \"k\")", ":k");
    assert_rep!("(keyword :k)", ":k");
    assert_eval_err!("(keyword 1)", EvalError::TypeMismatch(_));
}

#[test]
fn test_slurp_missing_file() {
    assert_eval_err!(
        "(slurp \"/nonexistent/tinylisp/file.lisp\")",
        EvalError::Io(_)
    );
}
