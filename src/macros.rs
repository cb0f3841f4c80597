//! Sldl's macros.

/// Imports sldl's prelude.
#[macro_export]
macro_rules! prelude {
    {} => { use $crate::prelude::*; };
    { pub } => { pub use $crate::prelude::*; };
}

/// Convenience macro, provides a DSL for writing terms.
///
/// - program variables are written `(var_name: R)`, without any quotes;
/// - constants (function symbols) are written `(cst_name: const)`.
///
/// # Examples
///
/// ```rust
/// let t = sldl::term!((+ (x: R) (* 2 (k: const))));
/// assert_eq!(t.to_string(), "x + 2 * k()");
/// ```
#[macro_export]
macro_rules! term {
    (@op +) => ( $crate::term::Op::Add );
    (@op -) => ( $crate::term::Op::Sub );
    (@op *) => ( $crate::term::Op::Mul );
    (@op /) => ( $crate::term::Op::Div );
    (@op ^) => ( $crate::term::Op::Pow );
    (@op neg) => ( $crate::term::Op::Neg );

    ( ($var:ident : R) ) => (
        $crate::term::Term::var($crate::term::Var::new(stringify!($var), $crate::term::Typ::Real))
    );
    ( ($cst:ident : const) ) => (
        $crate::term::Term::cst($crate::term::Constant::new(stringify!($cst)))
    );
    ( (vec $($args:tt)*) ) => (
        $crate::term::Term::vector(vec![ $($crate::term!($args)),* ])
    );
    ( ($op:tt $($args:tt)*) ) => (
        $crate::term::Term::app(
            $crate::term!(@op $op),
            vec![ $($crate::term!($args)),* ],
        )
    );

    ($lit:expr) => ( $crate::term::Term::from($lit) );
}

/// Convenience macro, provides a DSL for writing formulas.
///
/// Relation arguments use the [`term!`] syntax.
///
/// # Examples
///
/// ```rust
/// let f = sldl::formula!((and (<= 0 (x: R)) (not (= (x: R) 3))));
/// assert_eq!(f.to_string(), "0 <= x & !(x = 3)");
/// ```
#[macro_export]
macro_rules! formula {
    (true) => ( $crate::formula::Formula::True );
    (false) => ( $crate::formula::Formula::False );

    ( (and $($args:tt)*) ) => (
        $crate::formula::Formula::and(vec![ $($crate::formula!($args)),* ])
    );
    ( (or $($args:tt)*) ) => (
        $crate::formula::Formula::or(vec![ $($crate::formula!($args)),* ])
    );
    ( (not $arg:tt) ) => (
        $crate::formula::Formula::not($crate::formula!($arg))
    );
    ( (=> $lft:tt $rgt:tt) ) => (
        $crate::formula::Formula::implies($crate::formula!($lft), $crate::formula!($rgt))
    );
    ( (logic $arg:tt) ) => (
        $crate::formula::Formula::logic($crate::term!($arg))
    );
    ( ($cmp:tt $lft:tt $rgt:tt) ) => (
        $crate::formula::Formula::rel(
            $crate::term!($lft),
            $crate::formula!(@cmp $cmp),
            $crate::term!($rgt),
        )
    );

    (@cmp =) => ( $crate::formula::Cmp::Eq );
    (@cmp !=) => ( $crate::formula::Cmp::Ne );
    (@cmp <) => ( $crate::formula::Cmp::Lt );
    (@cmp <=) => ( $crate::formula::Cmp::Le );
    (@cmp >) => ( $crate::formula::Cmp::Gt );
    (@cmp >=) => ( $crate::formula::Cmp::Ge );
}
