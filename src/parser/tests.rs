use crate::util::test_utils::tree_tests;

tree_tests!(
    use parser;

    fn test_unit() {
        let unit = "
            object 128 Counter;
            import Other;
            @public
            8 add(4 a, 4 b) {
                8 c = a + b;
                c = c * 2;
                return c;
            }
            8 decl(16 x, ...);
        ";
        let tree_ok = "
            object Counter (128 bits)
            import Other
            method add: 8 (public)
              param 4 a @ 0:0
              param 4 b @ 0:4
              local 8 c @ 0:0
              expr [a, b, +, c, =]
              expr [c, 2, *, c, =]
              return [c, add, =]
            method decl: 8 (private, var args, declaration)
              param 16 x @ 0:0
        ";
    }

    fn test_operator_precedence() {
        let unit = "
            object 8 A;
            8 f(8 a, 8 b, 8 c) {
                a = b = c;
                a = (b + c) * 2 - ~a;
                a = 16:b & c;
                a = b or c and 1;
                f(a, b + 1, c);
            }
        ";
        let tree_ok = "
            object A (8 bits)
            method f: 8 (private)
              param 8 a @ 0:0
              param 8 b @ 0:8
              param 8 c @ 0:16
              expr [c, b, =, a, =]
              expr [b, c, +, 2, *, a, ~, -, a, =]
              expr [16, b, :, c, &, a, =]
              expr [b, c, or, 1, and, a, =]
              expr [f([a], [b, 1, +], [c])]
        ";
    }

    fn test_empty_statements_and_bare_return() {
        let unit = "
            object 8 A;
            8 f() {
                ;;
                return;
            }
        ";
        let tree_ok = "
            object A (8 bits)
            method f: 8 (private)
              return
        ";
    }

    fn test_local_packing() {
        let unit = "
            object 8 A;
            8 f() {
                8 x;
                60 y;
                4 z;
            }
        ";
        let tree_ok = "
            object A (8 bits)
            method f: 8 (private)
              local 8 x @ 1:0
              local 60 y @ 0:0
              local 4 z @ 0:60
        ";
    }

    fn test_cast_targets() {
        let unit = "
            object 8 A;
            16 Bar get(8 Foo x);
        ";
        let tree_ok = "
            object A (8 bits)
            method get: 16 as Bar (private, declaration)
              param 8 Foo x @ 0:0
        ";
    }

    fn test_var_args_only() {
        let unit = "
            object 8 A;
            8 log(...);
        ";
        let tree_ok = "
            object A (8 bits)
            method log: 8 (private, var args, declaration)
        ";
    }

    fn test_comments() {
        let unit = "
            # header
            object 8 A; # trailing
            8 f(); # declaration only
        ";
        let tree_ok = "
            object A (8 bits)
            method f: 8 (private, declaration)
        ";
    }

    fn test_one_error_per_malformed_statement() {
        let unit = "
            object 8 A;
            8 f(8 a) {
                a = a + ;
                a = 1;
                a = a a;
                a = 2;
            }
        ";
        let tree_error = "
            object A (8 bits)
            method f: 8 (private)
              param 8 a @ 0:0
              expr [1, a, =]
              expr [2, a, =]
        ";
        let expected_errors = &[
            "35..36: illegal symbol sequence: operator followed by end of expression",
            "58..59: illegal symbol sequence: operand followed by 'a'",
        ];
    }

    fn test_undeclared_and_duplicate() {
        let unit = "
            object 8 A;
            8 f(8 a) {
                a = b + 1;
                a = 3;
                8 a;
            }
        ";
        let tree_error = "
            object A (8 bits)
            method f: 8 (private)
              param 8 a @ 0:0
              expr [3, a, =]
        ";
        let expected_errors = &[
            "31..32: b is not declared",
            "53..56: a is already declared in this scope",
        ];
    }

    fn test_annotations() {
        let unit = "
            object 8 A;
            @secret
            8 f();
            @ignore
            8 g();
        ";
        let tree_error = "
            object A (8 bits)
            method f: 8 (private, declaration)
            method g: 8 (ignored, declaration)
        ";
        let expected_errors = &["13..19: unknown annotation @secret"];
    }

    fn test_duplicate_method() {
        let unit = "
            object 8 A;
            8 f();
            8 f();
        ";
        let expected_errors = &["19..22: method f is already defined"];
    }

    fn test_zero_width() {
        let unit = "
            object 8 A;
            0 f(0 a);
        ";
        let tree_error = "
            object A (8 bits)
            method f: 1 (private, declaration)
              param 1 a @ 0:0
        ";
        let expected_errors = &[
            "12..15: variable f has zero width",
            "16..19: variable a has zero width",
        ];
    }

    fn test_allocation_error_stops_unit() {
        let unit = "
            object 8 A;
            8 f(65 a);
            8 g();
        ";
        let tree_error = "object A (8 bits)";
        let expected_errors = &["16..20: variable a: width 65 exceeds the 64-bit group width"];
    }

    fn test_return_wider_than_group() {
        let unit = "
            object 8 A;
            65 f();
        ";
        let expected_errors = &["12..16: variable f: width 65 exceeds the 64-bit group width"];
    }

    fn test_unexpected_char() {
        let unit = "
            object 8 A;
            8 f() { $; }
        ";
        let tree_error = "
            object A (8 bits)
            method f: 8 (private)
        ";
        let expected_errors = &["20..21: unexpected character '$'"];
    }

    fn test_parentheses_and_targets() {
        let unit = "
            object 8 A;
            8 f(8 a) {
                a = (a + 1;
                a = a + 1);
                a + 1 = 2;
            }
        ";
        let expected_errors = &[
            "37..38: unbalanced parentheses",
            "52..53: unbalanced parentheses",
            "65..66: assignment target must be a variable",
        ];
    }

    fn test_missing_header() {
        let unit = "
            8 f();
        ";
        let expected_errors = &["0..1: missing object header"];
    }
);

tree_tests!(
    use codegen;

    fn test_generated_unit() {
        let unit = "
            object 8 A;
            @public
            8 f() {
                8 x = 2 + 3;
                print(x);
            }
        ";
        let tree_ok = r#"
            #include <stdint.h>
            #include <stdio.h>

            typedef uint64_t Bitpack_t;

            Bitpack_t A_f(void *self, Bitpack_t *params) __asm__("_BP8C1AM1fPR8");

            Bitpack_t A_f(void *self, Bitpack_t *params)
            {
                (void)self;
                (void)params;
                Bitpack_t locals[1] = {0};
                Bitpack_t ret = 0;
                locals[0] &= ~(0xffULL << 56);
                locals[0] |= (5ULL & 0xffULL) << 56;
                printf("%llu\n", (unsigned long long)(((locals[0] >> 56) & 0xffULL)));
                return ret;
            }
        "#;
    }

    fn test_generation_errors() {
        let unit = "
            object 8 A;
            8 f() { return g(1) / 0; }
        ";
        let expected_errors = &[
            "27..31: method g is not defined",
            "20..35: division by zero in constant expression",
        ];
    }
);
