//! Tests for hybrid programs.

crate::prelude!();

fn x() -> Var {
    Var::real("x")
}

#[test]
fn display() {
    let p = Program::seq(vec![
        Program::assign(x(), term!((+ (x: R) 1))),
        Program::assign_any(Var::real("u")),
        Program::test(formula!((>= (u: R) 0))),
    ]);
    assert_eq!(p.to_string(), "x := x + 1; u := *; ?u >= 0;");
    let p = Program::choice(vec![
        Program::assign(x(), 0),
        Program::assign(x(), 1),
    ]);
    assert_eq!(p.to_string(), "{ x := 0; ++ x := 1; }");
    let e = Evolution::new(
        vec![Ode::new(x(), term!((v: R))), Ode::new(Var::real("v"), term!(2))],
        formula!((>= (v: R) 0)),
    );
    assert_eq!(Program::from(e.clone()).to_string(), "{x' = v, v' = 2 & v >= 0}");
    let c = EvolutionContainer::new(e, formula!((<= (t: R) (h: const))));
    assert_eq!(Program::from(c).to_string(), "{x' = v, v' = 2 & v >= 0 & t <= h()}");
}

#[test]
fn subst_assigned_var() {
    let mut p = Program::assign(x(), term!((* 2 (x: R))));
    let res = p.replace_term_recursive(&term!((x: R)), &term!((y: R)));
    assert!(res.is_ok());
    assert_eq!(res.count, 2);
    assert_eq!(p.to_string(), "y := 2 * y;");

    let mut p = Program::assign_any(x());
    let res = p.replace_term_recursive(&term!((x: R)), &term!(3));
    assert_eq!(res.errors.len(), 1);
    assert_eq!(p, Program::assign_any(x()));
}

#[test]
fn subst_expanded_program() {
    let u = term!((u: R));
    let y = term!((y: R));
    let mut p = Term::program(Program::assign(Var::real("y"), term!((neg (u: R))))).expand(2);
    let res = p.replace_term_recursive(&u, &term!((vec (u1: R) (u2: R))));
    assert!(res.is_ok());
    let res = p.replace_term_recursive(&y, &term!((vec (y1: R) (y2: R))));
    assert!(res.is_ok());
    assert_eq!(p.to_string(), "(y1 := -u1;, y2 := -u2;)");
}

#[test]
fn container_members_are_swapped_whole() {
    let evolution = Evolution::new(vec![Ode::new(x(), term!(1))], Formula::True);
    let condition = formula!((<= (t: R) 1));
    let mut p = Program::from(EvolutionContainer::new(evolution.clone(), condition.clone()));

    let other = Evolution::new(vec![Ode::new(x(), term!(2))], Formula::True);
    let res = p.replace_term_recursive(
        &Term::program(Program::from(evolution)),
        &Term::program(Program::from(other.clone())),
    );
    assert!(res.is_ok());
    assert_eq!(res.count, 1);
    let res = p.replace_term_recursive(&Term::formula(condition), &Term::formula(Formula::True));
    assert_eq!(res.count, 1);
    assert_eq!(p, Program::from(EvolutionContainer::new(other, Formula::True)));

    // Other targets are searched inside both members.
    let res = p.replace_term_recursive(&term!(2), &term!(3));
    assert_eq!(res.count, 1);
    assert_eq!(p.to_string(), "{x' = 3}");
}

#[test]
fn contains_term() {
    let p = Program::repeat(Program::seq(vec![
        Program::assign(x(), term!((+ (x: R) (k: const)))),
        Program::test(formula!((> (y: R) 0))),
    ]));
    assert!(p.contains_term(&term!((k: const))));
    assert!(p.contains_term(&term!((y: R))));
    assert!(!p.contains_term(&term!((z: R))));
    let mut vars = IndexSet::new();
    p.collect_vars(&mut vars);
    let names: Vec<&str> = vars.iter().map(Var::name).collect();
    assert_eq!(names, vec!["x", "y"]);
}
