//! Tests for formulas.

crate::prelude!();

#[test]
fn display() {
    let f = formula!((and (<= 0 (x: R)) (not (= (x: R) 3))));
    assert_eq!(f.to_string(), "0 <= x & !(x = 3)");
    let f = formula!((=> (or (> (x: R) 1) (< (x: R) (-1))) (and (!= (y: R) 0) true)));
    assert_eq!(f.to_string(), "x > 1 | x < -1 -> y != 0 & true");
    let f = formula!((and (or (> (x: R) 1) false) (=> true false)));
    assert_eq!(f.to_string(), "(x > 1 | false) & (true -> false)");
    let f = formula!((=> (=> true false) true));
    assert_eq!(f.to_string(), "(true -> false) -> true");
    let f = formula!((logic (b: R)));
    assert_eq!(f.to_string(), "b != 0");
}

#[test]
fn smart_constructors() {
    assert_eq!(Formula::and(vec![]), Formula::True);
    assert_eq!(Formula::or(vec![]), Formula::False);
    let f = formula!((= (x: R) 0));
    assert_eq!(Formula::and(vec![f.clone()]), f);
}

#[test]
fn negation() {
    assert_eq!(Formula::True.negation(), Formula::False);
    assert_eq!(formula!((= (x: R) 0)).negation(), formula!((!= (x: R) 0)));
    assert_eq!(formula!((<= (x: R) 0)).negation(), formula!((> (x: R) 0)));
    let f = formula!((and true (= (x: R) 0)));
    assert_eq!(f.negation(), Formula::not(f.clone()));
    assert_eq!(f.negation().negation(), f);
}

#[test]
fn negation_of_logic_terms() {
    // Composite inner terms are negated.
    let f = Formula::logic(Term::formula(formula!((< (x: R) 1))));
    assert_eq!(f.negation(), Formula::not(formula!((< (x: R) 1))));
    let f = formula!((logic (+ (x: R) 1)));
    assert_eq!(f.negation(), Formula::not(formula!((!= (+ (x: R) 1) 0))));

    // Atomic inner terms are left as is.
    let f = formula!((logic (b: R)));
    assert_eq!(f.negation(), f);
    let f = formula!((logic 1));
    assert_eq!(f.negation(), f);
}

#[test]
fn substitution_into_logic_term() {
    let p = term!((p: R));

    // Formula replacement unwraps.
    let mut f = formula!((logic (p: R)));
    let res = f.replace_term_recursive(&p, &Term::formula(formula!((> (x: R) 0))));
    assert!(res.is_ok());
    assert_eq!(f, formula!((> (x: R) 0)));

    // Composite scalar replacement becomes a relation.
    let mut f = formula!((logic (p: R)));
    f.replace_term_recursive(&p, &term!((- (x: R) 1)));
    assert_eq!(f.to_string(), "x - 1 != 0");

    // Variable replacement stays a logic term.
    let mut f = formula!((logic (p: R)));
    f.replace_term_recursive(&p, &term!((q: R)));
    assert_eq!(f, formula!((logic (q: R))));
}

#[test]
fn substitution_of_formulas() {
    let target = Term::formula(formula!((= (x: R) 0)));
    let mut f = formula!((and (= (x: R) 0) (> (y: R) 0)));
    let res = f.replace_term_recursive(&target, &Term::formula(Formula::True));
    assert_eq!(res.count, 1);
    assert_eq!(f.to_string(), "true & y > 0");

    let mut f = formula!((not (= (x: R) 0)));
    f.replace_term_recursive(&target, &term!((b: R)));
    assert_eq!(f, Formula::not(formula!((logic (b: R)))));
}

#[test]
fn expanded_formulas() {
    let u = term!((u: R));
    let mut f = Term::formula(formula!((<= (u: R) 1))).expand(2);
    let res = f.replace_term_recursive(&u, &term!((vec (a: R) (b: R))));
    assert!(res.is_ok());
    assert_eq!(f.to_string(), "(a <= 1, b <= 1)");
}

#[test]
fn conjuncts() {
    let f = formula!((and (= (x: R) 0) (and true (> (y: R) 1)) (logic (b: R))));
    let conj: Vec<String> = f.conjuncts().iter().map(|f| f.to_string()).collect();
    assert_eq!(conj, vec!["x = 0", "y > 1", "b != 0"]);
    assert!(Formula::True.conjuncts().is_empty());
}

#[test]
fn eval() {
    let val = |var: &Var| match var.name() {
        "x" => Some(Rat::from_integer(2.into())),
        "b" => Some(Rat::zero()),
        _ => None,
    };
    assert_eq!(formula!((and (> (x: R) 1) (<= (x: R) 2))).eval(&val), Some(true));
    assert_eq!(formula!((logic (b: R))).eval(&val), Some(false));
    assert_eq!(formula!((=> (logic (b: R)) false)).eval(&val), Some(true));
    assert_eq!(formula!((> (y: R) 1)).eval(&val), None);
}

mod props {
    use super::*;
    use proptest::prelude::*;

    fn atom() -> impl Strategy<Value = Formula> {
        let cmp = prop_oneof![
            Just(Cmp::Eq),
            Just(Cmp::Ne),
            Just(Cmp::Lt),
            Just(Cmp::Le),
            Just(Cmp::Gt),
            Just(Cmp::Ge),
        ];
        prop_oneof![
            Just(Formula::True),
            Just(Formula::False),
            ("[x-z]", cmp, -5i64..5)
                .prop_map(|(v, cmp, n)| Formula::rel(Term::var(Var::real(v)), cmp, Term::int(n))),
        ]
    }

    fn val(var: &Var) -> Option<Rat> {
        let n = match var.name() {
            "x" => -1,
            "y" => 0,
            _ => 3,
        };
        Some(Rat::from_integer(n.into()))
    }

    proptest! {
        #[test]
        fn negation_flips_truth(f in atom()) {
            prop_assert_eq!(f.negation().eval(&val), f.eval(&val).map(|b| !b));
        }

        #[test]
        fn logic_var_negation_is_identity(name in "[a-z]{1,4}") {
            let f = Formula::logic(Term::var(Var::real(name)));
            prop_assert_eq!(f.negation(), f);
        }

        #[test]
        fn logic_formula_negation_flips_truth(f in atom()) {
            let wrapped = Formula::logic(Term::formula(f.clone()));
            prop_assert_eq!(wrapped.negation().eval(&val), f.eval(&val).map(|b| !b));
        }
    }
}
