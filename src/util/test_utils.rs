use crate::{
    ast::CompilationUnit,
    codegen,
    error::Error,
    options::Options,
    parser,
    token::Spanned,
    util::fmt::{tree, Context, Show},
};

pub fn format_errors(unit: &CompilationUnit, e: &[Spanned<Error>]) -> Vec<String> {
    let ctx = Context { unit };
    e.iter().map(|e| format!("{:#}", e.display(&ctx))).collect()
}

/// Each variant contains the input.
pub enum Test {
    /// Dumps the parsed unit.
    Parser(&'static str),
    /// Emits the parsed unit as C.
    Codegen(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let tokens_buf = &mut Vec::with_capacity(1024);
    let options = Options::default();

    let (Test::Parser(input) | Test::Codegen(input)) = test;
    let (unit, errors) = match parser::parse_unit(input, tokens_buf, &options) {
        Ok(unit) => (unit, vec![]),
        Err((unit, errors)) => (unit, errors),
    };
    let mut fmt_errors = format_errors(&unit, &errors);

    match test {
        Test::Parser(_) => (tree::print_unit_string(&unit), fmt_errors),
        Test::Codegen(_) => {
            let mut buf = Vec::with_capacity(1024);
            let errors = codegen::generate(&mut buf, &unit, options.word).unwrap();
            fmt_errors.extend(format_errors(&unit, &errors));
            (String::from_utf8(buf).unwrap(), fmt_errors)
        }
    }
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::TreeError(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let unit = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser), $source:expr) => {
        crate::util::test_utils::Test::Parser(::indoc::indoc! { $source })
    };
    (@@get_test(codegen), $source:expr) => {
        crate::util::test_utils::Test::Codegen(::indoc::indoc! { $source })
    };
}
pub(crate) use tree_tests;
